//! Background scheduled tasks for the application.
//!
//! Recurring renewal charges, upcoming-payment reminders and overdue notices.
//! Call `spawn_all` once during startup to launch them.

use crate::config::RenewalConfig;
use crate::services::RenewalService;
use std::time::Duration;

/// Spawn all background tasks.
///
/// Notes
/// - Each job only touches installments that are still pending, so overlapping
///   runs with the admin trigger do not double charge a paid installment.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(renewal_service: RenewalService, config: RenewalConfig) {
    if !config.enabled {
        log::info!("Renewal jobs disabled");
        return;
    }

    // overdue card renewals
    {
        let svc = renewal_service.clone();
        let interval = Duration::from_secs(config.interval_secs.max(60));
        tokio::spawn(async move {
            loop {
                match svc.process_overdue_renewals().await {
                    Ok(r) if r.processed > 0 => log::info!(
                        "Renewal batch: {} processed, {} successful, {} failed",
                        r.processed,
                        r.successful,
                        r.failed
                    ),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to process renewals: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    // reminders and overdue notices
    {
        let svc = renewal_service;
        let interval = Duration::from_secs(config.reminder_interval_secs.max(60));
        let days_before = config.reminder_days_before;
        tokio::spawn(async move {
            loop {
                match svc.send_payment_reminders(days_before).await {
                    Ok(r) if r.checked > 0 => {
                        log::info!("Payment reminders: {} sent, {} failed", r.sent, r.failed)
                    }
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to send payment reminders: {e:?}"),
                }
                match svc.send_overdue_notifications().await {
                    Ok(r) if r.checked > 0 => {
                        log::info!("Overdue notices: {} sent, {} failed", r.sent, r.failed)
                    }
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to send overdue notices: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}

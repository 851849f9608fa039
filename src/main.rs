use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::{Context, anyhow};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use unipet_payments::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{CieloService, MailTransport, PaymentGateway, SmtpMailer},
    handlers,
    middlewares::{AuthMiddleware, CorrelationMiddleware, WebhookGate, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database connection pool")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    // external services
    let gateway: Arc<dyn PaymentGateway> = Arc::new(CieloService::new(config.cielo.clone()));
    let mail_transport: Option<Arc<dyn MailTransport>> = match SmtpMailer::from_config(&config.smtp)
    {
        Ok(Some(mailer)) => Some(Arc::new(mailer)),
        Ok(None) => {
            log::warn!("SMTP not configured, notifications will only be logged");
            None
        }
        Err(e) => {
            log::error!("SMTP transport unavailable: {e}");
            None
        }
    };

    // services
    let notification_service =
        NotificationService::new(mail_transport, config.app.public_url.clone());
    let coupon_service = CouponService::new(pool.clone());
    let pending_payment_service = PendingPaymentService::new(pool.clone());
    let processor_service = PaymentProcessorService::new(pool.clone(), coupon_service.clone());
    let checkout_service = CheckoutService::new(
        pool.clone(),
        gateway.clone(),
        pending_payment_service.clone(),
        processor_service.clone(),
        coupon_service,
    );
    let confirmation_service = PaymentConfirmationService::new(
        gateway.clone(),
        pending_payment_service.clone(),
        processor_service,
    );
    let renewal_service = RenewalService::new(pool.clone(), gateway, notification_service);
    let webhook_gate = WebhookGate::new(&config.cielo, &config.app);

    tasks::spawn_all(renewal_service.clone(), config.renewal.clone());

    log::info!(
        "Starting HTTP server at {}:{} ({})",
        config.server.host,
        config.server.port,
        config.app.environment
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(CorrelationMiddleware)
            .app_data(web::Data::new(checkout_service.clone()))
            .app_data(web::Data::new(confirmation_service.clone()))
            .app_data(web::Data::new(pending_payment_service.clone()))
            .app_data(web::Data::new(renewal_service.clone()))
            .app_data(web::Data::new(webhook_gate.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api")
                    .configure(handlers::checkout_config)
                    .configure(handlers::webhook_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}

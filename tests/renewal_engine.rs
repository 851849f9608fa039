use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use unipet_payments::entities::{
    ContractStatus, InstallmentStatus, PaymentMethod, contract_entity, installment_entity,
};
use unipet_payments::external::CieloStatus;

mod support;

use support::{
    init_context, seed_client, seed_contract, seed_installment, seed_plan, VALID_CPF,
};

const CPF_2: &str = "11144477735";

async fn installments_of(
    pool: &sea_orm::DatabaseConnection,
    contract_id: i32,
) -> Vec<installment_entity::Model> {
    installment_entity::Entity::find()
        .filter(installment_entity::Column::ContractId.eq(contract_id))
        .order_by_asc(installment_entity::Column::InstallmentNumber)
        .all(pool)
        .await
        .unwrap()
}

#[actix_web::test]
async fn overdue_installment_is_charged_and_next_period_opened() {
    let ctx = init_context().await;
    let now = Utc::now();
    let plan = seed_plan(&ctx.pool, "Plano BASIC", 99.90, true).await;
    let client = seed_client(&ctx.pool, "maria@example.com", VALID_CPF).await;
    let contract = seed_contract(
        &ctx.pool,
        client.id,
        plan.id,
        "UNP-2025-000001",
        PaymentMethod::CreditCard,
        ContractStatus::Suspended,
        Some("tok-1"),
    )
    .await;
    let due = now - Duration::days(2);
    seed_installment(&ctx.pool, contract.id, 1, due, InstallmentStatus::Pending).await;

    let batch = ctx.renewal.process_overdue_renewals_at(now).await.unwrap();
    assert_eq!(batch.processed, 1);
    assert_eq!(batch.successful, 1);
    assert_eq!(batch.failed, 0);
    assert!(batch.results[0].payment_id.is_some());

    let charges = ctx.gateway.token_charges.lock().unwrap().clone();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].card_token, "tok-1");
    assert_eq!(charges[0].amount_cents, 9990);

    let rows = installments_of(&ctx.pool, contract.id).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status, InstallmentStatus::Paid);
    assert!(rows[0].cielo_payment_id.is_some());
    assert_eq!(rows[1].installment_number, 2);
    assert_eq!(rows[1].status, InstallmentStatus::Pending);
    assert_eq!(rows[1].due_date, rows[0].period_end);
    assert_eq!(rows[1].period_end, rows[0].period_end + Duration::days(30));

    let contract = contract_entity::Entity::find_by_id(contract.id)
        .one(&ctx.pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contract.status, ContractStatus::Active);

    assert_eq!(
        ctx.mailer.subjects(),
        vec!["Renovação do seu plano confirmada".to_string()]
    );

    // nothing left to charge
    let again = ctx.renewal.process_overdue_renewals_at(now).await.unwrap();
    assert_eq!(again.processed, 0);
    assert_eq!(ctx.gateway.token_charges.lock().unwrap().len(), 1);
}

#[actix_web::test]
async fn contract_without_saved_card_fails_and_notifies() {
    let ctx = init_context().await;
    let now = Utc::now();
    let plan = seed_plan(&ctx.pool, "Plano BASIC", 99.90, true).await;
    let client = seed_client(&ctx.pool, "maria@example.com", VALID_CPF).await;
    let contract = seed_contract(
        &ctx.pool,
        client.id,
        plan.id,
        "UNP-2025-000002",
        PaymentMethod::CreditCard,
        ContractStatus::Active,
        None,
    )
    .await;
    seed_installment(
        &ctx.pool,
        contract.id,
        1,
        now - Duration::days(5),
        InstallmentStatus::Pending,
    )
    .await;

    let batch = ctx.renewal.process_overdue_renewals_at(now).await.unwrap();
    assert_eq!(batch.processed, 1);
    assert_eq!(batch.failed, 1);
    assert!(ctx.gateway.token_charges.lock().unwrap().is_empty());
    assert_eq!(
        ctx.mailer.subjects(),
        vec!["Não foi possível renovar seu plano".to_string()]
    );

    let rows = installments_of(&ctx.pool, contract.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, InstallmentStatus::Pending);
}

#[actix_web::test]
async fn declined_renewal_leaves_installment_open() {
    let ctx = init_context().await;
    let now = Utc::now();
    ctx.gateway.script_token(CieloStatus::Denied);
    let plan = seed_plan(&ctx.pool, "Plano BASIC", 99.90, true).await;
    let client = seed_client(&ctx.pool, "maria@example.com", VALID_CPF).await;
    let contract = seed_contract(
        &ctx.pool,
        client.id,
        plan.id,
        "UNP-2025-000003",
        PaymentMethod::CreditCard,
        ContractStatus::Active,
        Some("tok-3"),
    )
    .await;
    seed_installment(
        &ctx.pool,
        contract.id,
        1,
        now - Duration::days(1),
        InstallmentStatus::Pending,
    )
    .await;

    let batch = ctx.renewal.process_overdue_renewals_at(now).await.unwrap();
    assert_eq!(batch.failed, 1);
    assert_eq!(batch.results[0].message, "Not Authorized");

    let rows = installments_of(&ctx.pool, contract.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, InstallmentStatus::Pending);
    assert_eq!(ctx.mailer.subjects().len(), 1);
}

#[actix_web::test]
async fn failed_renewal_waits_a_day_before_retrying() {
    let ctx = init_context().await;
    let now = Utc::now();
    ctx.gateway.script_token(CieloStatus::Denied);
    let plan = seed_plan(&ctx.pool, "Plano BASIC", 99.90, true).await;
    let client = seed_client(&ctx.pool, "maria@example.com", VALID_CPF).await;
    let contract = seed_contract(
        &ctx.pool,
        client.id,
        plan.id,
        "UNP-2025-000008",
        PaymentMethod::CreditCard,
        ContractStatus::Active,
        Some("tok-8"),
    )
    .await;
    seed_installment(
        &ctx.pool,
        contract.id,
        1,
        now - Duration::days(2),
        InstallmentStatus::Pending,
    )
    .await;

    let first = ctx.renewal.process_overdue_renewals_at(now).await.unwrap();
    assert_eq!(first.failed, 1);

    let rows = installments_of(&ctx.pool, contract.id).await;
    assert_eq!(rows[0].attempt_count, 1);
    assert!(rows[0].last_attempt_at.is_some());

    // next scheduled batch the same day
    let second = ctx
        .renewal
        .process_overdue_renewals_at(now + Duration::hours(6))
        .await
        .unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(ctx.gateway.token_charges.lock().unwrap().len(), 1);
    assert_eq!(ctx.mailer.subjects().len(), 1);

    let next_day = ctx
        .renewal
        .process_overdue_renewals_at(now + Duration::hours(25))
        .await
        .unwrap();
    assert_eq!(next_day.processed, 1);
    assert_eq!(ctx.gateway.token_charges.lock().unwrap().len(), 2);
    assert_eq!(ctx.mailer.subjects().len(), 2);
    assert_eq!(installments_of(&ctx.pool, contract.id).await[0].attempt_count, 2);
}

#[actix_web::test]
async fn ineligible_contracts_are_skipped() {
    let ctx = init_context().await;
    let now = Utc::now();
    let plan = seed_plan(&ctx.pool, "Plano BASIC", 99.90, true).await;
    let client = seed_client(&ctx.pool, "maria@example.com", VALID_CPF).await;

    let cancelled = seed_contract(
        &ctx.pool,
        client.id,
        plan.id,
        "UNP-2025-000004",
        PaymentMethod::CreditCard,
        ContractStatus::Cancelled,
        Some("tok-4"),
    )
    .await;
    let pix = seed_contract(
        &ctx.pool,
        client.id,
        plan.id,
        "UNP-2025-000005",
        PaymentMethod::Pix,
        ContractStatus::Active,
        None,
    )
    .await;
    let overdue = now - Duration::days(3);
    seed_installment(&ctx.pool, cancelled.id, 1, overdue, InstallmentStatus::Pending).await;
    seed_installment(&ctx.pool, pix.id, 1, overdue, InstallmentStatus::Pending).await;

    // due today is not yet overdue
    let other = seed_client(&ctx.pool, "joao@example.com", CPF_2).await;
    let due_today = seed_contract(
        &ctx.pool,
        other.id,
        plan.id,
        "UNP-2025-000006",
        PaymentMethod::CreditCard,
        ContractStatus::Active,
        Some("tok-6"),
    )
    .await;
    seed_installment(&ctx.pool, due_today.id, 1, now, InstallmentStatus::Pending).await;

    let batch = ctx.renewal.process_overdue_renewals_at(now).await.unwrap();
    assert_eq!(batch.processed, 0);
    assert!(ctx.gateway.token_charges.lock().unwrap().is_empty());
    assert!(ctx.mailer.subjects().is_empty());
}

#[actix_web::test]
async fn reminders_and_overdue_notices_follow_schedule() {
    let ctx = init_context().await;
    let now = Utc::now();
    let plan = seed_plan(&ctx.pool, "Plano BASIC", 99.90, true).await;
    let client = seed_client(&ctx.pool, "maria@example.com", VALID_CPF).await;
    let contract = seed_contract(
        &ctx.pool,
        client.id,
        plan.id,
        "UNP-2025-000007",
        PaymentMethod::Pix,
        ContractStatus::Active,
        None,
    )
    .await;

    seed_installment(&ctx.pool, contract.id, 1, now - Duration::days(3), InstallmentStatus::Pending).await;
    seed_installment(&ctx.pool, contract.id, 2, now - Duration::days(2), InstallmentStatus::Pending).await;
    seed_installment(&ctx.pool, contract.id, 3, now + Duration::days(3), InstallmentStatus::Pending).await;
    seed_installment(&ctx.pool, contract.id, 4, now + Duration::days(5), InstallmentStatus::Pending).await;

    let reminders = ctx.renewal.send_payment_reminders_at(3, now).await.unwrap();
    assert_eq!(reminders.checked, 1);
    assert_eq!(reminders.sent, 1);

    let overdue = ctx.renewal.send_overdue_notifications_at(now).await.unwrap();
    assert_eq!(overdue.checked, 1);
    assert_eq!(overdue.sent, 1);

    let subjects = ctx.mailer.subjects();
    assert_eq!(subjects.len(), 2);
    assert!(subjects[0].starts_with("Lembrete"));
    assert!(subjects[1].contains("3 dia"));

    let sent = ctx.mailer.sent.lock().unwrap();
    assert!(sent.iter().all(|e| e.to == "maria@example.com"));
    assert!(sent[0].html.contains("https://unipet.test/cliente/financeiro"));
}

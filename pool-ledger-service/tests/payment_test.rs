//! Payment allocation and direct invoice payment integration tests.

mod common;

use common::{date, TestApp};
use pool_ledger_service::models::{InvoiceStatus, ServiceFrequency};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use service_core::error::AppError;

/// Customer 1 owing 50 (due Jan 8) and 30 (due Jan 15).
async fn app_with_two_invoices() -> (TestApp, i64, i64) {
    let app = TestApp::spawn().await;
    app.seed_customer(1, Some(ServiceFrequency::Weekly)).await;
    let first = app
        .seed_invoice(1, 50, date(2026, 1, 1), date(2026, 1, 8))
        .await;
    let second = app
        .seed_invoice(1, 30, date(2026, 1, 8), date(2026, 1, 15))
        .await;
    (app, first.invoice_id, second.invoice_id)
}

#[tokio::test]
async fn payment_spills_into_next_invoice() {
    let (app, first, second) = app_with_two_invoices().await;

    let response = app
        .post_json(
            "/payments",
            json!({ "customer_id": 1, "amount": 65, "payment_date": "2026-01-20" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["remaining"], 0.0);
    assert_eq!(body["applications"].as_array().unwrap().len(), 2);
    assert_eq!(body["applications"][0]["applied"], 50.0);
    assert_eq!(body["applications"][1]["applied"], 15.0);

    let first = app.db.get_invoice(first).await.unwrap().unwrap();
    assert_eq!(first.status, InvoiceStatus::Paid);
    assert_eq!(first.amount_paid, Decimal::new(50, 0));
    assert_eq!(first.last_payment_date, Some(date(2026, 1, 20)));

    let second = app.db.get_invoice(second).await.unwrap().unwrap();
    assert_eq!(second.status, InvoiceStatus::Pending);
    assert_eq!(second.owed(), Decimal::new(15, 0));

    assert_eq!(app.db.customer_owed(1).await.unwrap(), Decimal::new(15, 0));
}

#[tokio::test]
async fn overpayment_reports_remainder_without_keeping_credit() {
    let (app, _, _) = app_with_two_invoices().await;

    let allocation = app
        .db
        .allocate_customer_payment(1, Decimal::new(100, 0), date(2026, 1, 20))
        .await
        .expect("Failed to allocate");

    assert_eq!(allocation.remaining, Decimal::new(20, 0));
    assert!(allocation
        .applications
        .iter()
        .all(|a| a.status == InvoiceStatus::Paid));
    assert_eq!(app.db.customer_owed(1).await.unwrap(), Decimal::ZERO);

    // Nothing left to pay against, and the earlier remainder was not stored.
    let response = app
        .post_json("/payments", json!({ "customer_id": 1, "amount": 10 }))
        .await;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No outstanding invoices found");
}

#[tokio::test]
async fn customer_without_outstanding_invoices_is_not_found_and_untouched() {
    let app = TestApp::spawn().await;
    app.seed_customer(7, None).await;

    let response = app
        .post_json("/payments", json!({ "customer_id": 7, "amount": 25 }))
        .await;

    assert_eq!(response.status(), 404);
    assert_eq!(app.db.total_revenue().await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn unknown_customer_payment_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json("/payments", json!({ "customer_id": 404, "amount": 25 }))
        .await;

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Customer not found");
}

#[tokio::test]
async fn invalid_payment_amounts_are_rejected_before_mutation() {
    let (app, _, _) = app_with_two_invoices().await;

    for amount in [json!(0), json!(-5), json!(10.005)] {
        let response = app
            .post_json("/payments", json!({ "customer_id": 1, "amount": amount }))
            .await;
        assert_eq!(response.status(), 422, "amount {}", amount);
    }

    let response = app
        .post_json("/payments", json!({ "customer_id": 0, "amount": 10 }))
        .await;
    assert_eq!(response.status(), 422);

    let response = app.post_json("/payments", json!({ "amount": 10 })).await;
    assert_eq!(response.status(), 400);

    assert_eq!(app.db.total_revenue().await.unwrap(), Decimal::ZERO);
    assert_eq!(app.db.customer_owed(1).await.unwrap(), Decimal::new(80, 0));
}

#[tokio::test]
async fn paid_invoices_are_skipped_by_later_allocations() {
    let (app, first, second) = app_with_two_invoices().await;

    app.db
        .record_invoice_payment(first, Decimal::new(50, 0), date(2026, 1, 9))
        .await
        .expect("Failed to pay invoice");

    let allocation = app
        .db
        .allocate_customer_payment(1, Decimal::new(10, 0), date(2026, 1, 10))
        .await
        .expect("Failed to allocate");

    assert_eq!(allocation.applications.len(), 1);
    assert_eq!(allocation.applications[0].invoice_id, second);
    assert_eq!(allocation.applications[0].amount_paid, Decimal::new(10, 0));
}

#[tokio::test]
async fn single_invoice_payment_updates_status() {
    let (app, first, _) = app_with_two_invoices().await;

    let response = app
        .post_json(
            &format!("/invoices/{}/payments", first),
            json!({ "amount": "20.50", "payment_date": "2026-01-05" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["amount_paid"], 20.5);
    assert_eq!(body["status"], "pending");

    let response = app
        .post_json(
            &format!("/invoices/{}/payments", first),
            json!({ "amount": 29.5 }),
        )
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["amount_paid"], 50.0);
    assert_eq!(body["status"], "paid");
}

#[tokio::test]
async fn single_invoice_overpayment_is_not_capped() {
    let (app, _, second) = app_with_two_invoices().await;

    let application = app
        .db
        .record_invoice_payment(second, Decimal::new(45, 0), date(2026, 1, 10))
        .await
        .expect("Failed to pay invoice");

    assert_eq!(application.status, InvoiceStatus::Paid);
    assert_eq!(application.amount_paid, Decimal::new(45, 0));
    assert_eq!(app.db.total_revenue().await.unwrap(), Decimal::new(45, 0));
}

#[tokio::test]
async fn payment_to_unknown_invoice_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json("/invoices/12345/payments", json!({ "amount": 10 }))
        .await;

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invoice not found");
}

#[tokio::test]
async fn overdue_invoices_stay_overdue_until_fully_paid() {
    let (app, first, second) = app_with_two_invoices().await;

    let response = app
        .post_json("/invoices/mark-overdue", json!({ "as_of": "2026-01-10" }))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["updated"], 1);

    let allocation = app
        .db
        .allocate_customer_payment(1, Decimal::new(20, 0), date(2026, 1, 11))
        .await
        .expect("Failed to allocate");
    assert_eq!(allocation.applications[0].invoice_id, first);
    assert_eq!(allocation.applications[0].status, InvoiceStatus::Overdue);

    let allocation = app
        .db
        .allocate_customer_payment(1, Decimal::new(40, 0), date(2026, 1, 12))
        .await
        .expect("Failed to allocate");
    assert_eq!(allocation.applications[0].status, InvoiceStatus::Paid);
    assert_eq!(allocation.applications[1].invoice_id, second);
    assert_eq!(allocation.applications[1].status, InvoiceStatus::Pending);
    assert_eq!(allocation.remaining, Decimal::ZERO);
}

#[tokio::test]
async fn failed_write_rolls_back_the_whole_allocation() {
    let (app, first, second) = app_with_two_invoices().await;

    sqlx::query(&format!(
        "CREATE TRIGGER reject_second_credit BEFORE UPDATE ON invoices \
         WHEN NEW.invoice_id = {} \
         BEGIN SELECT RAISE(ABORT, 'write rejected'); END",
        second
    ))
    .execute(app.db.pool())
    .await
    .expect("Failed to create trigger");

    let result = app
        .db
        .allocate_customer_payment(1, Decimal::new(65, 0), date(2026, 1, 20))
        .await;
    assert!(matches!(result, Err(AppError::DatabaseError(_))));

    let first = app.db.get_invoice(first).await.unwrap().unwrap();
    assert_eq!(first.amount_paid, Decimal::ZERO);
    assert_eq!(first.status, InvoiceStatus::Pending);
    assert_eq!(first.last_payment_date, None);
    assert_eq!(app.db.total_revenue().await.unwrap(), Decimal::ZERO);
}

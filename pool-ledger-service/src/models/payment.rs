//! Payment application results.

use super::invoice::InvoiceStatus;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// The portion of a payment credited to one invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentApplication {
    pub invoice_id: i64,
    pub invoice_number: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub applied: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount_paid: Decimal,
    pub status: InvoiceStatus,
}

/// Result of spreading one customer payment across outstanding invoices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentAllocation {
    pub customer_id: i64,
    pub payment_date: NaiveDate,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    pub applications: Vec<PaymentApplication>,
    /// Unapplied part of the payment; reported, never kept as credit.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub remaining: Decimal,
}

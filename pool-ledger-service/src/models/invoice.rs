//! Invoice model for pool-ledger-service.

use super::money::from_cents;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            _ => InvoiceStatus::Pending,
        }
    }

    /// Still counts toward what the customer owes.
    pub fn is_outstanding(&self) -> bool {
        !matches!(self, InvoiceStatus::Paid)
    }
}

/// Billing record owed by one customer for one service cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub customer_id: i64,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount_due: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount_paid: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub last_payment_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
}

impl Invoice {
    /// Remaining balance, never negative.
    pub fn owed(&self) -> Decimal {
        (self.amount_due - self.amount_paid).max(Decimal::ZERO)
    }
}

/// Row shape of the `invoices` table; amounts in cents.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRecord {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub customer_id: i64,
    pub amount_due_cents: i64,
    pub amount_paid_cents: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub last_payment_date: Option<NaiveDate>,
    pub status: String,
}

impl From<InvoiceRecord> for Invoice {
    fn from(record: InvoiceRecord) -> Self {
        Self {
            invoice_id: record.invoice_id,
            invoice_number: record.invoice_number,
            customer_id: record.customer_id,
            amount_due: from_cents(record.amount_due_cents),
            amount_paid: from_cents(record.amount_paid_cents),
            issue_date: record.issue_date,
            due_date: record.due_date,
            last_payment_date: record.last_payment_date,
            status: InvoiceStatus::from_string(&record.status),
        }
    }
}

/// Prefix shared by every invoice number issued in `year`.
pub fn invoice_number_prefix(year: i32) -> String {
    format!("INV-{}-", year)
}

/// Next invoice number given how many already carry the year's prefix.
pub fn next_invoice_number(year: i32, existing: i64) -> String {
    format!("{}{:04}", invoice_number_prefix(year), existing + 1)
}

/// Input for inserting a generated invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub customer_id: i64,
    pub amount_due: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// One page of a customer's invoices, earliest due date first.
#[derive(Debug, Clone, Serialize)]
pub struct InvoicePage {
    pub invoices: Vec<Invoice>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_entries: i64,
}

/// A customer whose invoice could not be generated.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationFailure {
    pub customer_id: i64,
    pub error: String,
}

/// Outcome of one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub issue_date: NaiveDate,
    pub generated: Vec<Invoice>,
    pub failures: Vec<GenerationFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_pads_sequence() {
        assert_eq!(next_invoice_number(2026, 0), "INV-2026-0001");
        assert_eq!(next_invoice_number(2026, 41), "INV-2026-0042");
        assert_eq!(next_invoice_number(2027, 9999), "INV-2027-10000");
    }

    #[test]
    fn unknown_status_reads_as_pending() {
        assert_eq!(InvoiceStatus::from_string("draft"), InvoiceStatus::Pending);
        assert!(InvoiceStatus::Overdue.is_outstanding());
        assert!(!InvoiceStatus::Paid.is_outstanding());
    }

    #[test]
    fn record_converts_cents() {
        let invoice = Invoice::from(InvoiceRecord {
            invoice_id: 1,
            invoice_number: "INV-2026-0001".to_string(),
            customer_id: 9,
            amount_due_cents: 12_500,
            amount_paid_cents: 2_550,
            issue_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 5, 8).unwrap(),
            last_payment_date: None,
            status: "pending".to_string(),
        });
        assert_eq!(invoice.amount_due, Decimal::new(125, 0));
        assert_eq!(invoice.owed(), Decimal::new(9_950, 2));
    }

    #[test]
    fn serializes_amounts_as_numbers() {
        let invoice = Invoice {
            invoice_id: 1,
            invoice_number: "INV-2026-0001".to_string(),
            customer_id: 9,
            amount_due: Decimal::new(75, 0),
            amount_paid: Decimal::new(1_050, 2),
            issue_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            last_payment_date: None,
            status: InvoiceStatus::Pending,
        };
        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["amount_due"], serde_json::json!(75.0));
        assert_eq!(json["amount_paid"], serde_json::json!(10.5));
        assert_eq!(json["due_date"], "2026-06-01");
        assert_eq!(json["status"], "pending");
    }
}

//! Request and response bodies of the HTTP API.

use crate::models::money::{is_whole_cents, MAX_AMOUNT};
use crate::models::{Invoice, ServiceFrequency};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

fn amount_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Payment amounts must be positive, at most [`MAX_AMOUNT`], and whole cents.
pub fn validate_payment_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(amount_error("amount_not_positive", "Amount must be greater than zero"));
    }
    if *amount > MAX_AMOUNT {
        return Err(amount_error("amount_too_large", "Amount exceeds the maximum allowed"));
    }
    if !is_whole_cents(*amount) {
        return Err(amount_error("amount_precision", "Amount cannot have more than two decimal places"));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Invoices
// -----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Validate)]
pub struct GenerateInvoicesRequest {
    /// Defaults to today.
    pub issue_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct MarkOverdueRequest {
    /// Defaults to today.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct MarkOverdueResponse {
    pub as_of: NaiveDate,
    pub updated: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListInvoicesQuery {
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "page_size must be between 1 and 100"))]
    pub page_size: Option<i64>,
}

// -----------------------------------------------------------------------------
// Payments
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerPaymentRequest {
    #[validate(range(min = 1, message = "customer_id must be positive"))]
    pub customer_id: i64,
    #[validate(custom(function = "validate_payment_amount"))]
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InvoicePaymentRequest {
    #[validate(custom(function = "validate_payment_amount"))]
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
}

// -----------------------------------------------------------------------------
// Customers
// -----------------------------------------------------------------------------

fn default_active() -> bool {
    true
}

/// Directory sync body; the id comes from the path.
#[derive(Debug, Deserialize, Validate)]
pub struct SyncCustomerRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1 to 200 characters"))]
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignServicePlanRequest {
    pub service_frequency: ServiceFrequency,
}

#[derive(Debug, Serialize)]
pub struct OwedResponse {
    pub customer_id: i64,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub owed: Decimal,
}

// -----------------------------------------------------------------------------
// Service visits
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceVisitRequest {
    #[validate(range(min = 1, message = "customer_id must be positive"))]
    pub customer_id: i64,
    pub visit_date: NaiveDate,
    #[validate(length(max = 10000, message = "chemicals_added is too long"))]
    pub chemicals_added: Option<String>,
}

// -----------------------------------------------------------------------------
// Analytics
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_revenue: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_owed: Decimal,
    /// Pounds per chemical.
    pub chemicals_used: BTreeMap<String, f64>,
    pub invoices: Vec<Invoice>,
}

impl AnalyticsResponse {
    pub fn new(
        total_revenue: Decimal,
        total_owed: Decimal,
        chemicals: BTreeMap<String, Decimal>,
        invoices: Vec<Invoice>,
    ) -> Self {
        Self {
            total_revenue,
            total_owed,
            chemicals_used: chemicals
                .into_iter()
                .map(|(name, pounds)| (name, pounds.to_f64().unwrap_or_default()))
                .collect(),
            invoices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(amount: &str) -> CustomerPaymentRequest {
        serde_json::from_str(&format!(r#"{{"customer_id": 1, "amount": {}}}"#, amount)).unwrap()
    }

    #[test]
    fn accepts_positive_cent_amounts() {
        assert!(payment("65").validate().is_ok());
        assert!(payment("0.01").validate().is_ok());
        assert!(payment("12.50").validate().is_ok());
    }

    #[test]
    fn rejects_zero_negative_and_sub_cent_amounts() {
        assert!(payment("0").validate().is_err());
        assert!(payment("-5").validate().is_err());
        assert!(payment("1.005").validate().is_err());
        assert!(payment("2000000000").validate().is_err());
    }

    #[test]
    fn rejects_non_positive_customer_id() {
        let request: CustomerPaymentRequest =
            serde_json::from_str(r#"{"customer_id": 0, "amount": 10}"#).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("customer_id"));
    }

    #[test]
    fn amount_accepts_string_form() {
        let request: InvoicePaymentRequest =
            serde_json::from_str(r#"{"amount": "19.99", "payment_date": "2026-03-01"}"#).unwrap();
        assert_eq!(request.amount, Decimal::new(1999, 2));
        assert_eq!(request.payment_date, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn page_size_is_bounded() {
        let query = ListInvoicesQuery {
            page: Some(1),
            page_size: Some(500),
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn sync_customer_defaults_to_active_and_needs_a_name() {
        let request: SyncCustomerRequest = serde_json::from_str(r#"{"name": "Rivera"}"#).unwrap();
        assert!(request.active);
        assert!(request.validate().is_ok());

        let request: SyncCustomerRequest =
            serde_json::from_str(r#"{"name": "", "active": false}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn unknown_frequency_fails_to_parse() {
        assert!(
            serde_json::from_str::<AssignServicePlanRequest>(r#"{"service_frequency": "daily"}"#)
                .is_err()
        );
    }
}

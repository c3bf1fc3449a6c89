//! Periodic invoice generation from customer service plans.

use crate::models::{CreateInvoice, Customer, GenerationFailure, GenerationReport};
use crate::services::metrics::{
    ERRORS_TOTAL, INVOICES_GENERATED_TOTAL, INVOICE_GENERATION_FAILURES_TOTAL,
};
use crate::services::Database;
use chrono::NaiveDate;
use service_core::error::AppError;
use tracing::{error, info, instrument};

/// Issue one invoice per active customer with a plan.
///
/// A failure for one customer is logged and reported; the run carries on with
/// the rest. Customers without a plan, or marked inactive, are skipped.
#[instrument(skip(db, customers), fields(customers = customers.len(), issue_date = %issue_date))]
pub async fn generate_invoices(
    db: &Database,
    customers: &[Customer],
    issue_date: NaiveDate,
) -> GenerationReport {
    let mut generated = Vec::new();
    let mut failures = Vec::new();

    for customer in customers.iter().filter(|c| c.active) {
        let Some(frequency) = customer.service_frequency else {
            continue;
        };

        let result = match frequency.due_date(issue_date) {
            Some(due_date) => {
                db.create_invoice(&CreateInvoice {
                    customer_id: customer.customer_id,
                    amount_due: frequency.rate(),
                    issue_date,
                    due_date,
                })
                .await
            }
            None => Err(AppError::BadRequest(anyhow::anyhow!(
                "Due date out of range for issue date {}",
                issue_date
            ))),
        };

        match result {
            Ok(invoice) => {
                INVOICES_GENERATED_TOTAL
                    .with_label_values(&[frequency.as_str()])
                    .inc();
                generated.push(invoice);
            }
            Err(e) => {
                error!(
                    customer_id = customer.customer_id,
                    error = %e,
                    "Failed to generate invoice"
                );
                INVOICE_GENERATION_FAILURES_TOTAL
                    .with_label_values(&[e.kind()])
                    .inc();
                ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
                failures.push(GenerationFailure {
                    customer_id: customer.customer_id,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        generated = generated.len(),
        failed = failures.len(),
        "Invoice generation completed"
    );

    GenerationReport {
        issue_date,
        generated,
        failures,
    }
}

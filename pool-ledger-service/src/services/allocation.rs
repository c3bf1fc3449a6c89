//! Payment allocation across outstanding invoices.
//!
//! Pure planning only: the database layer loads the outstanding invoices,
//! asks for a plan and writes the credited invoices back in one transaction.

use crate::models::{Invoice, InvoiceStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Invoice state after a credit, and how much of the payment it took.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditedInvoice {
    pub invoice: Invoice,
    pub applied: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    pub credits: Vec<CreditedInvoice>,
    pub remaining: Decimal,
}

/// Credit `amount` to an invoice.
///
/// Shared by the single-invoice and the multi-invoice payment paths. The
/// invoice becomes paid once `amount_paid` reaches `amount_due`; otherwise it
/// keeps its current status. No cap is applied: crediting more than is owed
/// still marks the invoice paid and leaves `amount_paid` above `amount_due`.
pub fn credit_invoice(invoice: &Invoice, amount: Decimal, payment_date: NaiveDate) -> Invoice {
    let amount_paid = invoice.amount_paid + amount;
    let status = if amount_paid >= invoice.amount_due {
        InvoiceStatus::Paid
    } else {
        invoice.status
    };

    Invoice {
        amount_paid,
        status,
        last_payment_date: Some(payment_date),
        ..invoice.clone()
    }
}

/// Spread `amount` over `outstanding`, earliest due date first.
///
/// Ties on due date go to the lower invoice id. Paid invoices are ignored.
/// Whatever is left once every invoice is covered comes back as `remaining`.
pub fn plan_allocation(
    outstanding: &[Invoice],
    amount: Decimal,
    payment_date: NaiveDate,
) -> AllocationPlan {
    let mut ordered: Vec<&Invoice> = outstanding
        .iter()
        .filter(|invoice| invoice.status.is_outstanding())
        .collect();
    ordered.sort_by_key(|invoice| (invoice.due_date, invoice.invoice_id));

    let mut remaining = amount;
    let mut credits = Vec::with_capacity(ordered.len());

    for invoice in ordered {
        if remaining <= Decimal::ZERO {
            break;
        }

        let applied = remaining.min(invoice.owed());
        credits.push(CreditedInvoice {
            invoice: credit_invoice(invoice, applied, payment_date),
            applied,
        });
        remaining -= applied;
    }

    AllocationPlan {
        credits,
        remaining: remaining.max(Decimal::ZERO),
    }
}

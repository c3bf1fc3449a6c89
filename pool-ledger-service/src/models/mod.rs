//! Domain models for pool-ledger-service.

mod customer;
mod invoice;
pub mod money;
mod payment;
mod service_visit;

pub use customer::{Customer, CustomerRecord, ServiceFrequency, UpsertCustomer};
pub use invoice::{
    invoice_number_prefix, next_invoice_number, CreateInvoice, GenerationFailure,
    GenerationReport, Invoice, InvoicePage, InvoiceRecord, InvoiceStatus,
};
pub use payment::{PaymentAllocation, PaymentApplication};
pub use service_visit::{CreateServiceVisit, ServiceVisit};

//! Services module for pool-ledger-service.

pub mod allocation;
pub mod chemicals;
pub mod database;
pub mod generation;
pub mod metrics;

pub use database::Database;
pub use generation::generate_invoices;
pub use metrics::{get_metrics, init_metrics};

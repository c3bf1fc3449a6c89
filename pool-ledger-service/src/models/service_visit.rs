//! Service visit notes read by the chemical aggregation.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ServiceVisit {
    pub visit_id: i64,
    pub customer_id: i64,
    pub visit_date: NaiveDate,
    pub chemicals_added: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateServiceVisit {
    pub customer_id: i64,
    pub visit_date: NaiveDate,
    pub chemicals_added: Option<String>,
}

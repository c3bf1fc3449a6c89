//! Customer and service-plan models.

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Billing cadence of a customer's service plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceFrequency {
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "bi-weekly")]
    BiWeekly,
    #[serde(rename = "monthly")]
    Monthly,
}

impl ServiceFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceFrequency::Weekly => "weekly",
            ServiceFrequency::BiWeekly => "bi-weekly",
            ServiceFrequency::Monthly => "monthly",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(ServiceFrequency::Weekly),
            "bi-weekly" => Some(ServiceFrequency::BiWeekly),
            "monthly" => Some(ServiceFrequency::Monthly),
            _ => None,
        }
    }

    /// Amount billed per cycle.
    pub fn rate(&self) -> Decimal {
        match self {
            ServiceFrequency::Weekly => Decimal::new(125, 0),
            ServiceFrequency::BiWeekly => Decimal::new(100, 0),
            ServiceFrequency::Monthly => Decimal::new(75, 0),
        }
    }

    /// Due date for an invoice issued on `issue_date`.
    ///
    /// Monthly plans keep the day of month and let any excess over the next
    /// month's length spill into the month after, so Jan 31 becomes Mar 3
    /// (Mar 2 in a leap year). `None` only at the end of the calendar range.
    pub fn due_date(&self, issue_date: NaiveDate) -> Option<NaiveDate> {
        match self {
            ServiceFrequency::Weekly => issue_date.checked_add_days(Days::new(7)),
            ServiceFrequency::BiWeekly => issue_date.checked_add_days(Days::new(14)),
            ServiceFrequency::Monthly => issue_date
                .with_day(1)
                .and_then(|first| first.checked_add_months(Months::new(1)))
                .and_then(|next| next.checked_add_days(Days::new(u64::from(issue_date.day() - 1)))),
        }
    }
}

/// Customer as mirrored from the user directory, with its plan if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Customer {
    pub customer_id: i64,
    pub name: String,
    pub active: bool,
    pub service_frequency: Option<ServiceFrequency>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CustomerRecord {
    pub customer_id: i64,
    pub name: String,
    pub active: bool,
    pub service_frequency: Option<String>,
}

impl From<CustomerRecord> for Customer {
    fn from(record: CustomerRecord) -> Self {
        Self {
            customer_id: record.customer_id,
            name: record.name,
            active: record.active,
            service_frequency: record
                .service_frequency
                .as_deref()
                .and_then(ServiceFrequency::from_string),
        }
    }
}

/// Directory sync input.
#[derive(Debug, Clone)]
pub struct UpsertCustomer {
    pub customer_id: i64,
    pub name: String,
    pub active: bool,
}

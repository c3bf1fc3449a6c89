//! Common test utilities for pool-ledger-service integration tests.

use chrono::NaiveDate;
use pool_ledger_service::config::{DatabaseConfig, LedgerConfig, PaginationConfig};
use pool_ledger_service::models::{
    CreateInvoice, Customer, Invoice, ServiceFrequency, UpsertCustomer,
};
use pool_ledger_service::services::Database;
use pool_ledger_service::startup::Application;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde_json::Value;
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,pool_ledger_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Each app gets its own in-memory database.
fn test_config() -> LedgerConfig {
    LedgerConfig {
        common: CommonConfig { port: 0 },
        service_name: "pool-ledger-service".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        pagination: PaginationConfig {
            default_page_size: 20,
        },
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[allow(dead_code)]
pub struct TestApp {
    pub http_address: String,
    pub db: Arc<Database>,
    pub client: Client,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn spawn() -> Self {
        init_tracing();

        let app = Application::build(test_config())
            .await
            .expect("Failed to build application");

        let http_address = format!("http://127.0.0.1:{}", app.http_port());
        let db = app.db();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            http_address,
            db,
            client: Client::new(),
        }
    }

    pub async fn seed_customer(
        &self,
        customer_id: i64,
        frequency: Option<ServiceFrequency>,
    ) -> Customer {
        let customer = self
            .db
            .upsert_customer(&UpsertCustomer {
                customer_id,
                name: format!("Customer {}", customer_id),
                active: true,
            })
            .await
            .expect("Failed to seed customer");

        match frequency {
            Some(frequency) => self
                .db
                .assign_service_plan(customer_id, frequency)
                .await
                .expect("Failed to assign plan"),
            None => customer,
        }
    }

    /// Insert a pending invoice with an arbitrary amount.
    pub async fn seed_invoice(
        &self,
        customer_id: i64,
        amount_due: i64,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Invoice {
        self.db
            .create_invoice(&CreateInvoice {
                customer_id,
                amount_due: Decimal::new(amount_due, 0),
                issue_date,
                due_date,
            })
            .await
            .expect("Failed to seed invoice")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.http_address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Response {
        self.client
            .post(format!("{}{}", self.http_address, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_empty(&self, path: &str) -> Response {
        self.client
            .post(format!("{}{}", self.http_address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put_json(&self, path: &str, body: Value) -> Response {
        self.client
            .put(format!("{}{}", self.http_address, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

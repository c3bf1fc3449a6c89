//! Database service for pool-ledger-service.

use crate::models::money::{from_cents, to_cents};
use crate::models::{
    invoice_number_prefix, next_invoice_number, CreateInvoice, CreateServiceVisit, Customer,
    CustomerRecord, Invoice, InvoicePage, InvoiceRecord, PaymentAllocation, PaymentApplication,
    ServiceFrequency, ServiceVisit, UpsertCustomer,
};
use crate::services::allocation::{credit_invoice, plan_allocation};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "pool-ledger-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to SQLite"
        );

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("SQLite connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })
    }

    async fn commit(tx: Transaction<'static, Sqlite>) -> Result<(), AppError> {
        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })
    }

    // -------------------------------------------------------------------------
    // Customer Operations
    // -------------------------------------------------------------------------

    /// Insert or refresh a customer mirrored from the user directory.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn upsert_customer(&self, input: &UpsertCustomer) -> Result<Customer, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_customer"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO customers (customer_id, name, active)
            VALUES ($1, $2, $3)
            ON CONFLICT (customer_id) DO UPDATE
            SET name = excluded.name,
                active = excluded.active
            "#,
        )
        .bind(input.customer_id)
        .bind(&input.name)
        .bind(input.active)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to upsert customer: {}", e)))?;

        timer.observe_duration();

        self.get_customer(input.customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))
    }

    /// Get a customer with its service plan.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(&self, customer_id: i64) -> Result<Option<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_customer"])
            .start_timer();

        let record = sqlx::query_as::<_, CustomerRecord>(
            r#"
            SELECT c.customer_id, c.name, c.active, p.service_frequency
            FROM customers c
            LEFT JOIN service_plans p ON p.customer_id = c.customer_id
            WHERE c.customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get customer: {}", e)))?;

        timer.observe_duration();

        Ok(record.map(Customer::from))
    }

    /// List every customer with its service plan, in id order.
    #[instrument(skip(self))]
    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_customers"])
            .start_timer();

        let records = sqlx::query_as::<_, CustomerRecord>(
            r#"
            SELECT c.customer_id, c.name, c.active, p.service_frequency
            FROM customers c
            LEFT JOIN service_plans p ON p.customer_id = c.customer_id
            ORDER BY c.customer_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list customers: {}", e)))?;

        timer.observe_duration();

        Ok(records.into_iter().map(Customer::from).collect())
    }

    /// Assign or replace a customer's service frequency.
    #[instrument(skip(self), fields(customer_id = %customer_id, frequency = frequency.as_str()))]
    pub async fn assign_service_plan(
        &self,
        customer_id: i64,
        frequency: ServiceFrequency,
    ) -> Result<Customer, AppError> {
        if self.get_customer(customer_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["assign_service_plan"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO service_plans (customer_id, service_frequency)
            VALUES ($1, $2)
            ON CONFLICT (customer_id) DO UPDATE
            SET service_frequency = excluded.service_frequency
            "#,
        )
        .bind(customer_id)
        .bind(frequency.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to assign service plan: {}", e))
        })?;

        timer.observe_duration();

        info!("Service plan assigned");

        self.get_customer(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Insert a pending invoice, numbering it `INV-<year>-<n>` where `n`
    /// follows the count of invoices already carrying that year's prefix.
    ///
    /// Count and insert share a transaction; a colliding number still fails
    /// on the UNIQUE constraint and surfaces as a conflict.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let amount_due_cents = to_cents(input.amount_due).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Amount {} out of range", input.amount_due))
        })?;
        let year = input.issue_date.year();

        let mut tx = self.begin().await?;

        let existing: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM invoices
            WHERE invoice_number LIKE $1
            "#,
        )
        .bind(format!("{}%", invoice_number_prefix(year)))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e))
        })?;

        let invoice_number = next_invoice_number(year, existing);

        let record = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            INSERT INTO invoices (invoice_number, customer_id, amount_due_cents, issue_date, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING invoice_id, invoice_number, customer_id, amount_due_cents, amount_paid_cents,
                issue_date, due_date, last_payment_date, status
            "#,
        )
        .bind(&invoice_number)
        .bind(input.customer_id)
        .bind(amount_due_cents)
        .bind(input.issue_date)
        .bind(input.due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice number '{}' already exists",
                    invoice_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)),
        })?;

        Self::commit(tx).await?;

        timer.observe_duration();

        info!(
            invoice_id = record.invoice_id,
            invoice_number = %record.invoice_number,
            "Invoice created"
        );

        Ok(Invoice::from(record))
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: i64) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let record = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            SELECT invoice_id, invoice_number, customer_id, amount_due_cents, amount_paid_cents,
                issue_date, due_date, last_payment_date, status
            FROM invoices
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(record.map(Invoice::from))
    }

    /// One page of a customer's invoices, earliest due date first.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn list_customer_invoices(
        &self,
        customer_id: i64,
        page: i64,
        page_size: i64,
    ) -> Result<InvoicePage, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_customer_invoices"])
            .start_timer();

        let page = page.max(1);
        let limit = page_size.clamp(1, 100);
        let offset = (page - 1).saturating_mul(limit);

        let total_entries: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM invoices
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e))
        })?;

        let records = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            SELECT invoice_id, invoice_number, customer_id, amount_due_cents, amount_paid_cents,
                issue_date, due_date, last_payment_date, status
            FROM invoices
            WHERE customer_id = $1
            ORDER BY due_date ASC, invoice_id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(InvoicePage {
            invoices: records.into_iter().map(Invoice::from).collect(),
            current_page: page,
            total_pages: (total_entries + limit - 1) / limit,
            total_entries,
        })
    }

    /// Every invoice, most recently issued first.
    #[instrument(skip(self))]
    pub async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let records = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            SELECT invoice_id, invoice_number, customer_id, amount_due_cents, amount_paid_cents,
                issue_date, due_date, last_payment_date, status
            FROM invoices
            ORDER BY issue_date DESC, invoice_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(records.into_iter().map(Invoice::from).collect())
    }

    /// Move pending invoices whose due date is before `as_of` to overdue.
    #[instrument(skip(self), fields(as_of = %as_of))]
    pub async fn mark_overdue(&self, as_of: NaiveDate) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_overdue"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'overdue'
            WHERE status = 'pending' AND due_date < $1
            "#,
        )
        .bind(as_of)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark invoices overdue: {}", e))
        })?;

        timer.observe_duration();

        info!(updated = result.rows_affected(), "Overdue sweep completed");

        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Payment Operations
    // -------------------------------------------------------------------------

    async fn write_credit(
        tx: &mut Transaction<'static, Sqlite>,
        invoice: &Invoice,
    ) -> Result<(), AppError> {
        let amount_paid_cents = to_cents(invoice.amount_paid).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Amount paid {} out of range",
                invoice.amount_paid
            ))
        })?;

        sqlx::query(
            r#"
            UPDATE invoices
            SET amount_paid_cents = $1,
                last_payment_date = $2,
                status = $3
            WHERE invoice_id = $4
            "#,
        )
        .bind(amount_paid_cents)
        .bind(invoice.last_payment_date)
        .bind(invoice.status.as_str())
        .bind(invoice.invoice_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to credit invoice: {}", e))
        })?;

        Ok(())
    }

    /// Apply a payment directly to one invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, amount = %amount))]
    pub async fn record_invoice_payment(
        &self,
        invoice_id: i64,
        amount: Decimal,
        payment_date: NaiveDate,
    ) -> Result<PaymentApplication, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_invoice_payment"])
            .start_timer();

        let mut tx = self.begin().await?;

        let record = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            SELECT invoice_id, invoice_number, customer_id, amount_due_cents, amount_paid_cents,
                issue_date, due_date, last_payment_date, status
            FROM invoices
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        let credited = credit_invoice(&Invoice::from(record), amount, payment_date);
        Self::write_credit(&mut tx, &credited).await?;
        Self::commit(tx).await?;

        timer.observe_duration();

        info!(
            invoice_number = %credited.invoice_number,
            status = credited.status.as_str(),
            "Invoice payment recorded"
        );

        Ok(PaymentApplication {
            invoice_id: credited.invoice_id,
            invoice_number: credited.invoice_number,
            applied: amount,
            amount_paid: credited.amount_paid,
            status: credited.status,
        })
    }

    /// Spread a payment over the customer's outstanding invoices, earliest
    /// due date first, inside one transaction.
    #[instrument(skip(self), fields(customer_id = %customer_id, amount = %amount))]
    pub async fn allocate_customer_payment(
        &self,
        customer_id: i64,
        amount: Decimal,
        payment_date: NaiveDate,
    ) -> Result<PaymentAllocation, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["allocate_customer_payment"])
            .start_timer();

        let mut tx = self.begin().await?;

        let customer_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM customers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get customer: {}", e)))?;

        if customer_count == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
        }

        let records = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            SELECT invoice_id, invoice_number, customer_id, amount_due_cents, amount_paid_cents,
                issue_date, due_date, last_payment_date, status
            FROM invoices
            WHERE customer_id = $1 AND status != 'paid'
            ORDER BY due_date ASC, invoice_id ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load outstanding invoices: {}", e))
        })?;

        if records.is_empty() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "No outstanding invoices found"
            )));
        }

        let outstanding: Vec<Invoice> = records.into_iter().map(Invoice::from).collect();
        let plan = plan_allocation(&outstanding, amount, payment_date);

        for credit in &plan.credits {
            Self::write_credit(&mut tx, &credit.invoice).await?;
        }

        Self::commit(tx).await?;

        timer.observe_duration();

        info!(
            invoices_touched = plan.credits.len(),
            remaining = %plan.remaining,
            "Customer payment allocated"
        );

        Ok(PaymentAllocation {
            customer_id,
            payment_date,
            amount,
            applications: plan
                .credits
                .into_iter()
                .map(|credit| PaymentApplication {
                    invoice_id: credit.invoice.invoice_id,
                    invoice_number: credit.invoice.invoice_number,
                    applied: credit.applied,
                    amount_paid: credit.invoice.amount_paid,
                    status: credit.invoice.status,
                })
                .collect(),
            remaining: plan.remaining,
        })
    }

    // -------------------------------------------------------------------------
    // Ledger Queries
    // -------------------------------------------------------------------------

    /// Sum of amount paid across all invoices.
    #[instrument(skip(self))]
    pub async fn total_revenue(&self) -> Result<Decimal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["total_revenue"])
            .start_timer();

        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_paid_cents), 0)
            FROM invoices
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to calculate revenue: {}", e))
        })?;

        timer.observe_duration();

        Ok(from_cents(cents))
    }

    /// Balance still owed on every invoice that is not paid.
    #[instrument(skip(self))]
    pub async fn total_owed(&self) -> Result<Decimal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["total_owed"])
            .start_timer();

        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_due_cents - amount_paid_cents), 0)
            FROM invoices
            WHERE status != 'paid'
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to calculate total owed: {}", e))
        })?;

        timer.observe_duration();

        Ok(from_cents(cents))
    }

    /// Balance one customer still owes.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn customer_owed(&self, customer_id: i64) -> Result<Decimal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["customer_owed"])
            .start_timer();

        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_due_cents - amount_paid_cents), 0)
            FROM invoices
            WHERE customer_id = $1 AND status != 'paid'
            "#,
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to calculate customer owed: {}", e))
        })?;

        timer.observe_duration();

        Ok(from_cents(cents))
    }

    // -------------------------------------------------------------------------
    // Service Visit Operations
    // -------------------------------------------------------------------------

    /// Store the notes of a service visit.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn record_service_visit(
        &self,
        input: &CreateServiceVisit,
    ) -> Result<ServiceVisit, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_service_visit"])
            .start_timer();

        let visit = sqlx::query_as::<_, ServiceVisit>(
            r#"
            INSERT INTO service_visits (customer_id, visit_date, chemicals_added)
            VALUES ($1, $2, $3)
            RETURNING visit_id, customer_id, visit_date, chemicals_added
            "#,
        )
        .bind(input.customer_id)
        .bind(input.visit_date)
        .bind(&input.chemicals_added)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Customer not found"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to record service visit: {}", e)),
        })?;

        timer.observe_duration();

        info!(visit_id = visit.visit_id, "Service visit recorded");

        Ok(visit)
    }

    /// Chemical notes of every visit that has any.
    #[instrument(skip(self))]
    pub async fn list_chemical_notes(&self) -> Result<Vec<String>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_chemical_notes"])
            .start_timer();

        let notes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT chemicals_added
            FROM service_visits
            WHERE chemicals_added IS NOT NULL
            ORDER BY visit_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list chemical notes: {}", e))
        })?;

        timer.observe_duration();

        Ok(notes)
    }
}

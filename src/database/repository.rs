use async_trait::async_trait;
use sqlx::{postgres::PgRow, Executor, FromRow, PgPool, Row};
use uuid::Uuid;

use crate::database::models::{Category, Department, PurchaseRequest, PurchaseRequestStatus};
use crate::database::store::{PurchaseRequestFilter, Store, StoreError};

// Constraint names are spelled out so violations map onto
// `store::constraints`.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT categories_name_key UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS departments (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT departments_name_key UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS purchase_requests (
    id UUID PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    amount NUMERIC(14, 2) NOT NULL,
    status TEXT NOT NULL,
    requester_id UUID NOT NULL,
    category_id UUID NOT NULL,
    department_id UUID NOT NULL,
    approver_id UUID,
    decision_note TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT purchase_requests_category_id_fkey
        FOREIGN KEY (category_id) REFERENCES categories (id),
    CONSTRAINT purchase_requests_department_id_fkey
        FOREIGN KEY (department_id) REFERENCES departments (id)
);
"#;

const PURCHASE_REQUEST_COLUMNS: &str = "id, title, description, amount, status, requester_id, \
     category_id, department_id, approver_id, decision_note, created_at, updated_at";

impl<'r> FromRow<'r, PgRow> for PurchaseRequest {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<PurchaseRequestStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            amount: row.try_get("amount")?,
            status,
            requester_id: row.try_get("requester_id")?,
            category_id: row.try_get("category_id")?,
            department_id: row.try_get("department_id")?,
            approver_id: row.try_get("approver_id")?,
            decision_note: row.try_get("decision_note")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Postgres-backed [`Store`]
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables when missing. Safe to run on every start.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.pool.execute(SCHEMA).await?;
        tracing::info!("Database schema verified");
        Ok(())
    }
}

#[async_trait]
impl Store for PgRepository {
    async fn insert_category(&self, category: &Category) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO categories (id, name, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_category(&self, category: &Category) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, description = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_category(&self, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn insert_department(&self, department: &Department) -> Result<u64, StoreError> {
        let result = sqlx::query("INSERT INTO departments (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(department.id)
            .bind(&department.name)
            .bind(department.created_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_department(&self, id: Uuid) -> Result<Option<Department>, StoreError> {
        let department = sqlx::query_as::<_, Department>(
            "SELECT id, name, created_at FROM departments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(department)
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        let departments = sqlx::query_as::<_, Department>(
            "SELECT id, name, created_at FROM departments ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(departments)
    }

    async fn insert_purchase_request(&self, request: &PurchaseRequest) -> Result<u64, StoreError> {
        let query = format!(
            "INSERT INTO purchase_requests ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            PURCHASE_REQUEST_COLUMNS
        );
        let result = sqlx::query(&query)
            .bind(request.id)
            .bind(&request.title)
            .bind(&request.description)
            .bind(request.amount)
            .bind(request.status.as_str())
            .bind(request.requester_id)
            .bind(request.category_id)
            .bind(request.department_id)
            .bind(request.approver_id)
            .bind(&request.decision_note)
            .bind(request.created_at)
            .bind(request.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_purchase_request(
        &self,
        request: &PurchaseRequest,
        expected: PurchaseRequestStatus,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE purchase_requests SET title = $2, description = $3, amount = $4, status = $5, \
             category_id = $6, department_id = $7, approver_id = $8, decision_note = $9, \
             updated_at = $10 WHERE id = $1 AND status = $11",
        )
        .bind(request.id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.amount)
        .bind(request.status.as_str())
        .bind(request.category_id)
        .bind(request.department_id)
        .bind(request.approver_id)
        .bind(&request.decision_note)
        .bind(request.updated_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn find_purchase_request(&self, id: Uuid) -> Result<Option<PurchaseRequest>, StoreError> {
        let query = format!(
            "SELECT {} FROM purchase_requests WHERE id = $1",
            PURCHASE_REQUEST_COLUMNS
        );
        let request = sqlx::query_as::<_, PurchaseRequest>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(request)
    }

    async fn list_purchase_requests(
        &self,
        filter: &PurchaseRequestFilter,
    ) -> Result<Vec<PurchaseRequest>, StoreError> {
        let query = format!(
            "SELECT {} FROM purchase_requests \
             WHERE ($1::uuid IS NULL OR requester_id = $1) \
             AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC",
            PURCHASE_REQUEST_COLUMNS
        );
        let requests = sqlx::query_as::<_, PurchaseRequest>(&query)
            .bind(filter.requester_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(requests)
    }
}

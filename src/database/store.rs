use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Category, Department, PurchaseRequest, PurchaseRequestStatus};

/// Constraint names shared by every store implementation. They match the
/// names Postgres generates for the schema in `repository.rs`.
pub mod constraints {
    pub const CATEGORY_NAME_UNIQUE: &str = "categories_name_key";
    pub const DEPARTMENT_NAME_UNIQUE: &str = "departments_name_key";
    pub const PURCHASE_REQUEST_CATEGORY_FK: &str = "purchase_requests_category_id_fkey";
    pub const PURCHASE_REQUEST_DEPARTMENT_FK: &str = "purchase_requests_department_id_fkey";
}

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }

    pub fn is_foreign_key_violation(&self, name: &str) -> bool {
        matches!(self, StoreError::ForeignKeyViolation { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if let Some(constraint) = db.constraint() {
                let constraint = constraint.to_string();
                match db.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => {
                        return StoreError::UniqueViolation { constraint }
                    }
                    sqlx::error::ErrorKind::ForeignKeyViolation => {
                        return StoreError::ForeignKeyViolation { constraint }
                    }
                    _ => {}
                }
            }
        }
        StoreError::Sqlx(err)
    }
}

/// Optional narrowing for purchase request listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseRequestFilter {
    pub requester_id: Option<Uuid>,
    pub status: Option<PurchaseRequestStatus>,
}

impl PurchaseRequestFilter {
    pub fn matches(&self, request: &PurchaseRequest) -> bool {
        self.requester_id.map_or(true, |id| request.requester_id == id)
            && self.status.map_or(true, |status| request.status == status)
    }
}

/// Data-access collaborator used by feature handlers.
///
/// Writes report constraint violations through [`StoreError`] using the
/// names in [`constraints`]; mutating calls return the number of rows
/// affected.
///
/// `update_purchase_request` only writes when the stored status still equals
/// `expected`, so a transition decided on a stale read affects zero rows.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_category(&self, category: &Category) -> Result<u64, StoreError>;
    async fn update_category(&self, category: &Category) -> Result<u64, StoreError>;
    async fn delete_category(&self, id: Uuid) -> Result<u64, StoreError>;
    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn insert_department(&self, department: &Department) -> Result<u64, StoreError>;
    async fn find_department(&self, id: Uuid) -> Result<Option<Department>, StoreError>;
    async fn list_departments(&self) -> Result<Vec<Department>, StoreError>;

    async fn insert_purchase_request(&self, request: &PurchaseRequest) -> Result<u64, StoreError>;
    async fn update_purchase_request(
        &self,
        request: &PurchaseRequest,
        expected: PurchaseRequestStatus,
    ) -> Result<u64, StoreError>;
    async fn find_purchase_request(&self, id: Uuid) -> Result<Option<PurchaseRequest>, StoreError>;
    async fn list_purchase_requests(
        &self,
        filter: &PurchaseRequestFilter,
    ) -> Result<Vec<PurchaseRequest>, StoreError>;
}

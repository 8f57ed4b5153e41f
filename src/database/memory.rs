// In-process store used by tests and `procure serve --memory`
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{Category, Department, PurchaseRequest, PurchaseRequestStatus};
use crate::database::store::{constraints, PurchaseRequestFilter, Store, StoreError};

#[derive(Debug, Default)]
struct Tables {
    categories: HashMap<Uuid, Category>,
    departments: HashMap<Uuid, Department>,
    purchase_requests: HashMap<Uuid, PurchaseRequest>,
}

impl Tables {
    fn category_name_taken(&self, name: &str, except: Uuid) -> bool {
        self.categories.values().any(|c| c.name == name && c.id != except)
    }

    fn check_references(&self, request: &PurchaseRequest) -> Result<(), StoreError> {
        if !self.categories.contains_key(&request.category_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: constraints::PURCHASE_REQUEST_CATEGORY_FK.to_string(),
            });
        }
        if !self.departments.contains_key(&request.department_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: constraints::PURCHASE_REQUEST_DEPARTMENT_FK.to_string(),
            });
        }
        Ok(())
    }
}

/// Store enforcing the same named constraints as the Postgres schema
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_category(&self, category: &Category) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.category_name_taken(&category.name, category.id) {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::CATEGORY_NAME_UNIQUE.to_string(),
            });
        }
        tables.categories.insert(category.id, category.clone());
        Ok(1)
    }

    async fn update_category(&self, category: &Category) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&category.id) {
            return Ok(0);
        }
        if tables.category_name_taken(&category.name, category.id) {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::CATEGORY_NAME_UNIQUE.to_string(),
            });
        }
        tables.categories.insert(category.id, category.clone());
        Ok(1)
    }

    async fn delete_category(&self, id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.purchase_requests.values().any(|r| r.category_id == id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: constraints::PURCHASE_REQUEST_CATEGORY_FK.to_string(),
            });
        }
        Ok(tables.categories.remove(&id).map_or(0, |_| 1))
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.tables.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_department(&self, department: &Department) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.departments.values().any(|d| d.name == department.name) {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::DEPARTMENT_NAME_UNIQUE.to_string(),
            });
        }
        tables.departments.insert(department.id, department.clone());
        Ok(1)
    }

    async fn find_department(&self, id: Uuid) -> Result<Option<Department>, StoreError> {
        Ok(self.tables.read().await.departments.get(&id).cloned())
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        let mut departments: Vec<Department> = self.tables.read().await.departments.values().cloned().collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn insert_purchase_request(&self, request: &PurchaseRequest) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_references(request)?;
        tables.purchase_requests.insert(request.id, request.clone());
        Ok(1)
    }

    async fn update_purchase_request(
        &self,
        request: &PurchaseRequest,
        expected: PurchaseRequestStatus,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.purchase_requests.get(&request.id) {
            Some(stored) if stored.status == expected => {}
            _ => return Ok(0),
        }
        tables.check_references(request)?;
        tables.purchase_requests.insert(request.id, request.clone());
        Ok(1)
    }

    async fn find_purchase_request(&self, id: Uuid) -> Result<Option<PurchaseRequest>, StoreError> {
        Ok(self.tables.read().await.purchase_requests.get(&id).cloned())
    }

    async fn list_purchase_requests(
        &self,
        filter: &PurchaseRequestFilter,
    ) -> Result<Vec<PurchaseRequest>, StoreError> {
        let tables = self.tables.read().await;
        let mut requests: Vec<PurchaseRequest> = tables
            .purchase_requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }
}

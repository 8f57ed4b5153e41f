// Category management: admin-maintained lookup list for purchase requests
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::roles;
use crate::database::models::Category;
use crate::database::{constraints, Store};
use crate::pipeline::{
    Authorization, DispatchContext, Error, FieldErrors, Handler, Outcome, PipelineError, Request,
    Validator,
};

pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;

fn duplicate_name(name: &str) -> Error {
    Error::conflict(
        "Category.DuplicateName",
        format!("A category named '{}' already exists", name),
    )
    .with_field_error("Name", format!("Category name '{}' is already in use.", name))
}

fn not_found(id: Uuid) -> Error {
    Error::not_found("Category.NotFound", format!("Category {} was not found", id))
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Request for CreateCategory {
    type Response = Uuid;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::ADMIN]));
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCategory {
    #[serde(default)]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Request for UpdateCategory {
    type Response = ();
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::ADMIN]));
}

#[derive(Debug, Clone)]
pub struct DeleteCategory {
    pub id: Uuid,
}

impl Request for DeleteCategory {
    type Response = ();
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::ADMIN]));
}

#[derive(Debug, Clone)]
pub struct GetCategory {
    pub id: Uuid,
}

impl Request for GetCategory {
    type Response = Category;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::authenticated());
}

#[derive(Debug, Clone, Default)]
pub struct ListCategories;

impl Request for ListCategories {
    type Response = Vec<Category>;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::authenticated());
}

/// Shared name/description rules for create and update
pub struct CategoryValidator;

impl CategoryValidator {
    fn check(name: &str, description: Option<&str>, errors: &mut FieldErrors) {
        errors.required_text("Name", name, NAME_MAX_LEN);
        errors.optional_text("Description", description, DESCRIPTION_MAX_LEN);
    }
}

impl Validator<CreateCategory> for CategoryValidator {
    fn validate(&self, request: &CreateCategory, errors: &mut FieldErrors) {
        Self::check(&request.name, request.description.as_deref(), errors);
    }
}

impl Validator<UpdateCategory> for CategoryValidator {
    fn validate(&self, request: &UpdateCategory, errors: &mut FieldErrors) {
        Self::check(&request.name, request.description.as_deref(), errors);
    }
}

pub struct CreateCategoryHandler {
    store: Arc<dyn Store>,
}

impl CreateCategoryHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<CreateCategory> for CreateCategoryHandler {
    async fn handle(&self, request: CreateCategory, ctx: &DispatchContext) -> Result<Outcome<Uuid>, PipelineError> {
        let category = Category::new(request.name.trim(), request.description);

        match ctx.cancellation.run(self.store.insert_category(&category)).await? {
            Ok(_) => {
                tracing::info!("Created category '{}' ({})", category.name, category.id);
                Ok(Ok(category.id))
            }
            Err(e) if e.is_unique_violation(constraints::CATEGORY_NAME_UNIQUE) => {
                Ok(Err(duplicate_name(&category.name)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub struct UpdateCategoryHandler {
    store: Arc<dyn Store>,
}

impl UpdateCategoryHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<UpdateCategory> for UpdateCategoryHandler {
    async fn handle(&self, request: UpdateCategory, ctx: &DispatchContext) -> Result<Outcome, PipelineError> {
        let Some(mut category) = ctx.cancellation.run(self.store.find_category(request.id)).await?? else {
            return Ok(Err(not_found(request.id)));
        };

        category.rename(request.name.trim(), request.description);

        match ctx.cancellation.run(self.store.update_category(&category)).await? {
            Ok(0) => Ok(Err(not_found(request.id))),
            Ok(_) => Ok(Ok(())),
            Err(e) if e.is_unique_violation(constraints::CATEGORY_NAME_UNIQUE) => {
                Ok(Err(duplicate_name(&category.name)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub struct DeleteCategoryHandler {
    store: Arc<dyn Store>,
}

impl DeleteCategoryHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<DeleteCategory> for DeleteCategoryHandler {
    async fn handle(&self, request: DeleteCategory, ctx: &DispatchContext) -> Result<Outcome, PipelineError> {
        match ctx.cancellation.run(self.store.delete_category(request.id)).await? {
            Ok(0) => Ok(Err(not_found(request.id))),
            Ok(_) => {
                tracing::info!("Deleted category {}", request.id);
                Ok(Ok(()))
            }
            Err(e) if e.is_foreign_key_violation(constraints::PURCHASE_REQUEST_CATEGORY_FK) => {
                Ok(Err(Error::conflict(
                    "Category.InUse",
                    "The category is referenced by purchase requests and cannot be deleted",
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub struct GetCategoryHandler {
    store: Arc<dyn Store>,
}

impl GetCategoryHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<GetCategory> for GetCategoryHandler {
    async fn handle(&self, request: GetCategory, ctx: &DispatchContext) -> Result<Outcome<Category>, PipelineError> {
        let category = ctx.cancellation.run(self.store.find_category(request.id)).await??;
        Ok(category.ok_or_else(|| not_found(request.id)))
    }
}

pub struct ListCategoriesHandler {
    store: Arc<dyn Store>,
}

impl ListCategoriesHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<ListCategories> for ListCategoriesHandler {
    async fn handle(&self, _request: ListCategories, ctx: &DispatchContext) -> Result<Outcome<Vec<Category>>, PipelineError> {
        let categories = ctx.cancellation.run(self.store.list_categories()).await??;
        Ok(Ok(categories))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorType;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn create_then_duplicate_name() {
        let test = TestContext::new();

        let id = test
            .send_as_admin(CreateCategory {
                name: "Office Supplies".into(),
                description: None,
            })
            .await
            .unwrap();
        assert_ne!(id, Uuid::nil());

        let error = test
            .send_as_admin(CreateCategory {
                name: "Office Supplies".into(),
                description: None,
            })
            .await
            .unwrap_err();
        assert_eq!(error.code, "Category.DuplicateName");
        assert_eq!(error.error_type, ErrorType::Conflict);
        assert!(error.field_errors("Name")[0].contains("Office Supplies"));
    }

    #[tokio::test]
    async fn blank_name_is_a_validation_error() {
        let test = TestContext::new();
        let error = test
            .send_as_admin(CreateCategory {
                name: "  ".into(),
                description: Some("x".repeat(DESCRIPTION_MAX_LEN + 1)),
            })
            .await
            .unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.field_errors("Name").len(), 1);
        assert_eq!(error.field_errors("Description").len(), 1);
    }

    #[tokio::test]
    async fn rename_to_existing_name_conflicts() {
        let test = TestContext::new();
        test.send_as_admin(CreateCategory { name: "Hardware".into(), description: None })
            .await
            .unwrap();
        let id = test
            .send_as_admin(CreateCategory { name: "Software".into(), description: None })
            .await
            .unwrap();

        let error = test
            .send_as_admin(UpdateCategory { id, name: "Hardware".into(), description: None })
            .await
            .unwrap_err();
        assert_eq!(error.code, "Category.DuplicateName");

        test.send_as_admin(UpdateCategory { id, name: "Licences".into(), description: None })
            .await
            .unwrap();
        let category = test.send_as_requester(GetCategory { id }).await.unwrap();
        assert_eq!(category.name, "Licences");
    }

    #[tokio::test]
    async fn missing_category_is_not_found() {
        let test = TestContext::new();
        let id = Uuid::new_v4();

        let error = test.send_as_requester(GetCategory { id }).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);

        let error = test.send_as_admin(DeleteCategory { id }).await.unwrap_err();
        assert_eq!(error.code, "Category.NotFound");
    }

    #[tokio::test]
    async fn requesters_cannot_manage_categories() {
        let test = TestContext::new();
        let error = test
            .send_as_requester(CreateCategory { name: "Travel".into(), description: None })
            .await
            .unwrap_err();
        assert!(error.is_forbidden());

        let listed = test.send_as_requester(ListCategories).await.unwrap();
        assert!(listed.is_empty());
    }
}

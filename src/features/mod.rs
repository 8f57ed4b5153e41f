pub mod categories;
pub mod departments;
pub mod purchase_requests;

use std::sync::Arc;

use crate::database::Store;
use crate::pipeline::{CurrentUser, DispatchContext, Dispatcher, PipelineError, PipelineRegistry};

use categories::*;
use departments::*;
use purchase_requests::*;

/// Build the dispatcher with every request handler in the application.
///
/// Fails at startup if a request type lacks authorization metadata or is
/// registered twice.
pub fn register_all(store: Arc<dyn Store>) -> Result<Dispatcher, PipelineError> {
    let purchase_requests = PurchaseRequestHandler::new(store.clone());

    let registry = PipelineRegistry::new()
        // Categories
        .register_validated::<CreateCategory, _, _>(CreateCategoryHandler::new(store.clone()), CategoryValidator)?
        .register_validated::<UpdateCategory, _, _>(UpdateCategoryHandler::new(store.clone()), CategoryValidator)?
        .register::<DeleteCategory, _>(DeleteCategoryHandler::new(store.clone()))?
        .register::<GetCategory, _>(GetCategoryHandler::new(store.clone()))?
        .register::<ListCategories, _>(ListCategoriesHandler::new(store.clone()))?
        // Departments
        .register_validated::<CreateDepartment, _, _>(
            CreateDepartmentHandler::new(store.clone()),
            CreateDepartmentValidator,
        )?
        .register::<GetDepartment, _>(GetDepartmentHandler::new(store.clone()))?
        .register::<ListDepartments, _>(ListDepartmentsHandler::new(store))?
        // Purchase requests
        .register_validated::<CreatePurchaseRequest, _, _>(purchase_requests.clone(), PurchaseRequestValidator)?
        .register_validated::<UpdatePurchaseRequest, _, _>(purchase_requests.clone(), PurchaseRequestValidator)?
        .register::<SubmitPurchaseRequest, _>(purchase_requests.clone())?
        .register_validated::<ApprovePurchaseRequest, _, _>(purchase_requests.clone(), DecisionValidator)?
        .register_validated::<RejectPurchaseRequest, _, _>(purchase_requests.clone(), DecisionValidator)?
        .register::<GetPurchaseRequest, _>(purchase_requests.clone())?
        .register::<ListPurchaseRequests, _>(purchase_requests)?;

    Ok(registry.build())
}

/// Resolve the caller for handlers that act on their identity
pub(crate) async fn current_user(ctx: &DispatchContext) -> Result<CurrentUser, PipelineError> {
    ctx.cancellation.run(ctx.user.current_user()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[test]
    fn every_request_is_registered() {
        let dispatcher = register_all(Arc::new(MemoryStore::new())).unwrap();
        assert_eq!(dispatcher.len(), 15);
        assert!(dispatcher.is_registered::<CreateCategory>());
        assert!(dispatcher.is_registered::<UpdatePurchaseRequest>());
        assert!(dispatcher.is_registered::<ListPurchaseRequests>());
    }
}

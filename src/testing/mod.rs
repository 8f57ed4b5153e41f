use std::sync::Arc;
use uuid::Uuid;

use crate::auth::roles;
use crate::database::MemoryStore;
use crate::features::{self, categories::CreateCategory, departments::CreateDepartment};
use crate::pipeline::{CurrentUser, DispatchContext, Dispatcher, Outcome, Request};

/// Dispatcher over a fresh in-memory store plus a fixed cast of callers
pub struct TestContext {
    pub dispatcher: Dispatcher,
    pub store: Arc<MemoryStore>,
    pub admin: CurrentUser,
    pub requester: CurrentUser,
    pub other_requester: CurrentUser,
    pub approver: CurrentUser,
    /// Set by [`TestContext::seeded`], nil otherwise
    pub category_id: Uuid,
    pub department_id: Uuid,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = features::register_all(store.clone()).expect("handlers register");

        Self {
            dispatcher,
            store,
            admin: CurrentUser::authenticated(Uuid::new_v4(), "admin", &[roles::ADMIN]),
            requester: CurrentUser::authenticated(Uuid::new_v4(), "rita", &[roles::REQUESTER]),
            other_requester: CurrentUser::authenticated(Uuid::new_v4(), "ravi", &[roles::REQUESTER]),
            approver: CurrentUser::authenticated(Uuid::new_v4(), "alex", &[roles::APPROVER]),
            category_id: Uuid::nil(),
            department_id: Uuid::nil(),
        }
    }

    /// New context with one category and one department already present
    pub async fn seeded() -> Self {
        let mut test = Self::new();
        test.category_id = test
            .send_as_admin(CreateCategory {
                name: "Office Supplies".into(),
                description: None,
            })
            .await
            .expect("seed category");
        test.department_id = test
            .send_as_admin(CreateDepartment { name: "Operations".into() })
            .await
            .expect("seed department");
        test
    }

    pub async fn send_as<R: Request>(&self, user: &CurrentUser, request: R) -> Outcome<R::Response> {
        let ctx = DispatchContext::for_user(user.clone());
        self.dispatcher
            .send(request, &ctx)
            .await
            .expect("dispatch should not abort")
    }

    pub async fn send_as_admin<R: Request>(&self, request: R) -> Outcome<R::Response> {
        self.send_as(&self.admin, request).await
    }

    pub async fn send_as_requester<R: Request>(&self, request: R) -> Outcome<R::Response> {
        self.send_as(&self.requester, request).await
    }

    pub async fn send_as_approver<R: Request>(&self, request: R) -> Outcome<R::Response> {
        self.send_as(&self.approver, request).await
    }
}

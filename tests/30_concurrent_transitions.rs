mod common;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Barrier;
use uuid::Uuid;

use procure_api::database::models::{
    Category, Department, PurchaseRequest, PurchaseRequestDraft, PurchaseRequestStatus,
};
use procure_api::database::{MemoryStore, PurchaseRequestFilter, Store, StoreError};
use procure_api::features::purchase_requests::{
    ApprovePurchaseRequest, RejectPurchaseRequest, SubmitPurchaseRequest, UpdatePurchaseRequest,
};
use procure_api::features::register_all;
use procure_api::pipeline::{CurrentUser, Dispatcher, ErrorType};

/// Holds every purchase request read until two readers have it, so both
/// transitions are decided on the same snapshot before either writes.
struct LockstepReads {
    inner: MemoryStore,
    readers: Barrier,
}

#[async_trait]
impl Store for LockstepReads {
    async fn insert_category(&self, category: &Category) -> Result<u64, StoreError> {
        self.inner.insert_category(category).await
    }

    async fn update_category(&self, category: &Category) -> Result<u64, StoreError> {
        self.inner.update_category(category).await
    }

    async fn delete_category(&self, id: Uuid) -> Result<u64, StoreError> {
        self.inner.delete_category(id).await
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        self.inner.find_category(id).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.inner.list_categories().await
    }

    async fn insert_department(&self, department: &Department) -> Result<u64, StoreError> {
        self.inner.insert_department(department).await
    }

    async fn find_department(&self, id: Uuid) -> Result<Option<Department>, StoreError> {
        self.inner.find_department(id).await
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        self.inner.list_departments().await
    }

    async fn insert_purchase_request(&self, request: &PurchaseRequest) -> Result<u64, StoreError> {
        self.inner.insert_purchase_request(request).await
    }

    async fn update_purchase_request(
        &self,
        request: &PurchaseRequest,
        expected: PurchaseRequestStatus,
    ) -> Result<u64, StoreError> {
        self.inner.update_purchase_request(request, expected).await
    }

    async fn find_purchase_request(&self, id: Uuid) -> Result<Option<PurchaseRequest>, StoreError> {
        let found = self.inner.find_purchase_request(id).await;
        self.readers.wait().await;
        found
    }

    async fn list_purchase_requests(
        &self,
        filter: &PurchaseRequestFilter,
    ) -> Result<Vec<PurchaseRequest>, StoreError> {
        self.inner.list_purchase_requests(filter).await
    }
}

struct Race {
    dispatcher: Dispatcher,
    store: Arc<LockstepReads>,
    requester: CurrentUser,
    request_id: Uuid,
    draft: PurchaseRequestDraft,
}

/// One purchase request written straight to the store in `status`, so no
/// reads happen before the race starts
async fn race_on(status: PurchaseRequestStatus) -> Race {
    let store = Arc::new(LockstepReads {
        inner: MemoryStore::new(),
        readers: Barrier::new(2),
    });

    let category = Category::new("Hardware", None);
    let department = Department::new("IT");
    store.insert_category(&category).await.unwrap();
    store.insert_department(&department).await.unwrap();

    let requester = common::requester();
    let draft = PurchaseRequestDraft {
        title: "Laptops".into(),
        description: None,
        amount: Decimal::new(2_400, 0),
        category_id: category.id,
        department_id: department.id,
    };
    let mut request = PurchaseRequest::new(requester.user_id.unwrap(), draft.clone());
    if status == PurchaseRequestStatus::Pending {
        request.submit().unwrap();
    }
    store.insert_purchase_request(&request).await.unwrap();

    let dispatcher = register_all(store.clone()).unwrap();
    Race {
        dispatcher,
        store,
        requester,
        request_id: request.id,
        draft,
    }
}

#[tokio::test]
async fn simultaneous_approve_and_reject_let_exactly_one_win() {
    let race = race_on(PurchaseRequestStatus::Pending).await;
    let id = race.request_id;
    let (first, second) = (common::approver(), common::approver());

    let (approved, rejected) = tokio::join!(
        common::send(&race.dispatcher, &first, ApprovePurchaseRequest { id, note: None }),
        common::send(&race.dispatcher, &second, RejectPurchaseRequest {
            id,
            reason: "Over budget".into(),
        }),
    );

    assert!(approved.is_ok() != rejected.is_ok(), "exactly one decision may succeed");
    let loser = approved.as_ref().err().or(rejected.as_ref().err()).unwrap();
    assert_eq!(loser.code, "PurchaseRequest.ConcurrentUpdate");
    assert_eq!(loser.error_type, ErrorType::Conflict);

    let stored = race.store.inner.find_purchase_request(id).await.unwrap().unwrap();
    let expected = if approved.is_ok() {
        PurchaseRequestStatus::Approved
    } else {
        PurchaseRequestStatus::Rejected
    };
    assert_eq!(stored.status, expected);
}

#[tokio::test]
async fn stale_draft_update_cannot_undo_a_submit() {
    let race = race_on(PurchaseRequestStatus::Draft).await;
    let id = race.request_id;
    let mut draft = race.draft.clone();
    draft.title = "More laptops".into();

    let (submitted, updated) = tokio::join!(
        common::send(&race.dispatcher, &race.requester, SubmitPurchaseRequest { id }),
        common::send(&race.dispatcher, &race.requester, UpdatePurchaseRequest { id, draft }),
    );

    assert!(submitted.is_ok() != updated.is_ok(), "exactly one write may succeed");
    let stored = race.store.inner.find_purchase_request(id).await.unwrap().unwrap();
    if submitted.is_ok() {
        assert_eq!(updated.unwrap_err().code, "PurchaseRequest.ConcurrentUpdate");
        assert_eq!(stored.status, PurchaseRequestStatus::Pending);
        assert_eq!(stored.title, "Laptops");
    } else {
        assert_eq!(submitted.unwrap_err().code, "PurchaseRequest.ConcurrentUpdate");
        assert_eq!(stored.status, PurchaseRequestStatus::Draft);
        assert_eq!(stored.title, "More laptops");
    }
}

mod common;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use procure_api::auth::roles;
use procure_api::database::models::{PurchaseRequest, PurchaseRequestDraft};
use procure_api::features::categories::{CreateCategory, ListCategories};
use procure_api::features::departments::CreateDepartment;
use procure_api::features::purchase_requests::{
    ApprovePurchaseRequest, CreatePurchaseRequest, SubmitPurchaseRequest, UpdatePurchaseRequest,
};
use procure_api::pipeline::{
    Authorization, DispatchContext, ErrorType, Handler, Outcome, PipelineError, PipelineRegistry,
    Request,
};

#[tokio::test]
async fn duplicate_category_name_is_reported_on_the_name_field() {
    let dispatcher = common::dispatcher();
    let admin = common::admin();

    let first = common::send(&dispatcher, &admin, CreateCategory {
        name: "Office Supplies".into(),
        description: None,
    })
    .await;
    assert!(first.is_ok());

    let error = common::send(&dispatcher, &admin, CreateCategory {
        name: "Office Supplies".into(),
        description: None,
    })
    .await
    .unwrap_err();

    assert_eq!(error.code, "Category.DuplicateName");
    let name_errors = error.validation_errors.as_ref().unwrap().get("Name").unwrap();
    assert!(name_errors.iter().any(|m| m.contains("Office Supplies")));
}

#[tokio::test]
async fn update_without_requester_role_is_forbidden_for_any_payload() {
    let dispatcher = common::dispatcher();

    let payloads = [
        PurchaseRequestDraft {
            title: String::new(),
            description: None,
            amount: Decimal::ZERO,
            category_id: Uuid::nil(),
            department_id: Uuid::nil(),
        },
        PurchaseRequestDraft {
            title: "Monitors".into(),
            description: Some("Two 27 inch".into()),
            amount: Decimal::new(45_000, 2),
            category_id: Uuid::new_v4(),
            department_id: Uuid::new_v4(),
        },
    ];

    for caller in [common::approver(), common::admin(), common::user(&[])] {
        for draft in payloads.clone() {
            let error = common::send(&dispatcher, &caller, UpdatePurchaseRequest {
                id: Uuid::new_v4(),
                draft,
            })
            .await
            .unwrap_err();
            assert!(error.is_forbidden(), "expected Forbidden, got {}", error);
            assert_eq!(error.error_type, ErrorType::Unauthorized);
        }
    }
}

#[tokio::test]
async fn invalid_requests_never_reach_the_handler() {
    let dispatcher = common::dispatcher();
    let admin = common::admin();

    let error = common::send(&dispatcher, &admin, CreateCategory {
        name: " ".into(),
        description: Some("d".repeat(501)),
    })
    .await
    .unwrap_err();
    assert_eq!(error.error_type, ErrorType::Validation);
    let fields: Vec<&str> = error
        .validation_errors
        .as_ref()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(fields, vec!["Description", "Name"]);

    let listed = common::send(&dispatcher, &admin, ListCategories).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn anonymous_callers_are_unauthenticated() {
    let dispatcher = common::dispatcher();
    let error = dispatcher
        .send(ListCategories, &DispatchContext::anonymous())
        .await
        .unwrap()
        .unwrap_err();
    assert!(error.is_unauthenticated());
}

#[tokio::test]
async fn approved_request_refuses_updates_draft_accepts_them() {
    let dispatcher = common::dispatcher();
    let admin = common::admin();
    let requester = common::requester();
    let approver = common::approver();

    let category_id = common::send(&dispatcher, &admin, CreateCategory {
        name: "Hardware".into(),
        description: None,
    })
    .await
    .unwrap();
    let department_id = common::send(&dispatcher, &admin, CreateDepartment { name: "IT".into() })
        .await
        .unwrap();

    let draft = PurchaseRequestDraft {
        title: "Docking stations".into(),
        description: None,
        amount: Decimal::new(19_900, 2),
        category_id,
        department_id,
    };
    let id = common::send(&dispatcher, &requester, CreatePurchaseRequest { draft: draft.clone() })
        .await
        .unwrap();

    // Draft: updates go through
    common::send(&dispatcher, &requester, UpdatePurchaseRequest { id, draft: draft.clone() })
        .await
        .unwrap();

    common::send(&dispatcher, &requester, SubmitPurchaseRequest { id }).await.unwrap();
    common::send(&dispatcher, &approver, ApprovePurchaseRequest { id, note: None })
        .await
        .unwrap();

    let error = common::send(&dispatcher, &requester, UpdatePurchaseRequest { id, draft })
        .await
        .unwrap_err();
    assert_eq!(error.code, "PurchaseRequest.NotDraft");
    assert!(error.message.contains("not a draft"));
}

#[test]
fn can_update_depends_only_on_status() {
    let mut request = PurchaseRequest::new(
        Uuid::new_v4(),
        PurchaseRequestDraft {
            title: "Paper".into(),
            description: None,
            amount: Decimal::ONE,
            category_id: Uuid::new_v4(),
            department_id: Uuid::new_v4(),
        },
    );
    assert!(request.can_update().is_ok());

    request.submit().unwrap();
    request.approve(Uuid::new_v4(), None).unwrap();
    assert_eq!(request.can_update().unwrap_err().error_type, ErrorType::Conflict);
}

#[tokio::test]
async fn concurrent_dispatch_matches_sequential_results() {
    let dispatcher = common::dispatcher();
    let admin = common::admin();
    for name in ["Travel", "Software", "Furniture"] {
        common::send(&dispatcher, &admin, CreateCategory { name: name.into(), description: None })
            .await
            .unwrap();
    }

    let first: Vec<String> = common::send(&dispatcher, &admin, ListCategories)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let dispatcher = dispatcher.clone();
        let admin = admin.clone();
        tasks.push(tokio::spawn(async move {
            common::send(&dispatcher, &admin, ListCategories).await
        }));
    }

    for task in tasks {
        let names: Vec<String> = task.await.unwrap().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, first);
    }
    assert_eq!(first, vec!["Furniture", "Software", "Travel"]);
}

// Request types used only to probe registration rules

struct Unmarked;

impl Request for Unmarked {
    type Response = ();
}

struct Marked;

impl Request for Marked {
    type Response = u8;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::ADMIN]));
}

struct Fixed(u8);

#[async_trait]
impl Handler<Unmarked> for Fixed {
    async fn handle(&self, _request: Unmarked, _ctx: &DispatchContext) -> Result<Outcome<()>, PipelineError> {
        Ok(Ok(()))
    }
}

#[async_trait]
impl Handler<Marked> for Fixed {
    async fn handle(&self, _request: Marked, _ctx: &DispatchContext) -> Result<Outcome<u8>, PipelineError> {
        Ok(Ok(self.0))
    }
}

#[test]
fn request_without_authorization_metadata_fails_registration() {
    let result = PipelineRegistry::new().register::<Unmarked, _>(Fixed(0));
    let error = result.err().unwrap();
    assert!(matches!(error, PipelineError::MissingAuthorizationMetadata { request: "Unmarked" }));
    assert!(error.is_configuration());
}

#[test]
fn second_handler_for_a_request_fails_registration() {
    let result = PipelineRegistry::new()
        .register::<Marked, _>(Fixed(1))
        .and_then(|registry| registry.register::<Marked, _>(Fixed(2)));
    assert!(matches!(result.err(), Some(PipelineError::DuplicateHandler { request: "Marked" })));
}

#[tokio::test]
async fn unregistered_request_is_a_fatal_error() {
    let dispatcher = PipelineRegistry::new().register::<Marked, _>(Fixed(3)).unwrap().build();
    let ctx = DispatchContext::for_user(common::admin());

    assert_eq!(dispatcher.send(Marked, &ctx).await.unwrap().unwrap(), 3);
    let error = dispatcher.send(Unmarked, &ctx).await.unwrap_err();
    assert!(matches!(error, PipelineError::HandlerNotFound { request: "Unmarked" }));
}

#[tokio::test]
async fn cancelled_context_never_reaches_the_store() {
    let dispatcher = common::dispatcher();
    let ctx = DispatchContext::for_user(common::admin());
    ctx.cancellation.cancel();

    let result = dispatcher
        .send(CreateCategory { name: "Ghost".into(), description: None }, &ctx)
        .await;
    assert!(matches!(result, Err(PipelineError::Cancelled)));

    let listed = common::send(&dispatcher, &common::admin(), ListCategories).await.unwrap();
    assert!(listed.is_empty());
}

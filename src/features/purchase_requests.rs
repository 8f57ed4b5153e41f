// Purchase request lifecycle: draft, submit, approve or reject
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::roles;
use crate::database::models::{PurchaseRequest, PurchaseRequestDraft, PurchaseRequestStatus};
use crate::database::{constraints, PurchaseRequestFilter, Store, StoreError};
use crate::features::current_user;
use crate::pipeline::{
    Authorization, CurrentUser, DispatchContext, Error, FieldErrors, Handler, Outcome,
    PipelineError, Request, Validator,
};

pub const TITLE_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 2000;
pub const NOTE_MAX_LEN: usize = 1000;

fn not_found(id: Uuid) -> Error {
    Error::not_found(
        "PurchaseRequest.NotFound",
        format!("Purchase request {} was not found", id),
    )
}

fn concurrent_update(id: Uuid) -> Error {
    Error::conflict(
        "PurchaseRequest.ConcurrentUpdate",
        format!("Purchase request {} was changed by another request; reload and retry", id),
    )
}

fn not_owner() -> Error {
    Error::unauthorized(
        "PurchaseRequest.NotOwner",
        "Only the requester may change this purchase request",
    )
}

/// Approvers and admins see every request, everyone else only their own
fn sees_all(user: &CurrentUser) -> bool {
    user.is_in_role(roles::APPROVER) || user.is_in_role(roles::ADMIN)
}

/// Map reference constraint violations onto field errors; anything else is
/// not expected here and propagates.
fn reference_failure(error: StoreError, draft: &PurchaseRequestDraft) -> Result<Error, PipelineError> {
    if error.is_foreign_key_violation(constraints::PURCHASE_REQUEST_CATEGORY_FK) {
        return Ok(Error::not_found(
            "Category.NotFound",
            format!("Category {} was not found", draft.category_id),
        )
        .with_field_error("CategoryId", "The selected category does not exist."));
    }
    if error.is_foreign_key_violation(constraints::PURCHASE_REQUEST_DEPARTMENT_FK) {
        return Ok(Error::not_found(
            "Department.NotFound",
            format!("Department {} was not found", draft.department_id),
        )
        .with_field_error("DepartmentId", "The selected department does not exist."));
    }
    Err(error.into())
}

fn check_draft(draft: &PurchaseRequestDraft, errors: &mut FieldErrors) {
    errors.required_text("Title", &draft.title, TITLE_MAX_LEN);
    errors.optional_text("Description", draft.description.as_deref(), DESCRIPTION_MAX_LEN);
    errors.ensure(draft.amount > Decimal::ZERO, "Amount", "'Amount' must be greater than 0.");
    errors.ensure(draft.category_id != Uuid::nil(), "CategoryId", "'CategoryId' must be set.");
    errors.ensure(draft.department_id != Uuid::nil(), "DepartmentId", "'DepartmentId' must be set.");
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchaseRequest {
    #[serde(flatten)]
    pub draft: PurchaseRequestDraft,
}

impl Request for CreatePurchaseRequest {
    type Response = Uuid;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::REQUESTER]));
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePurchaseRequest {
    #[serde(default)]
    pub id: Uuid,
    #[serde(flatten)]
    pub draft: PurchaseRequestDraft,
}

impl Request for UpdatePurchaseRequest {
    type Response = ();
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::REQUESTER]));
}

#[derive(Debug, Clone)]
pub struct SubmitPurchaseRequest {
    pub id: Uuid,
}

impl Request for SubmitPurchaseRequest {
    type Response = ();
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::REQUESTER]));
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovePurchaseRequest {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub note: Option<String>,
}

impl Request for ApprovePurchaseRequest {
    type Response = ();
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::APPROVER]));
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectPurchaseRequest {
    #[serde(default)]
    pub id: Uuid,
    pub reason: String,
}

impl Request for RejectPurchaseRequest {
    type Response = ();
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::APPROVER]));
}

#[derive(Debug, Clone)]
pub struct GetPurchaseRequest {
    pub id: Uuid,
}

impl Request for GetPurchaseRequest {
    type Response = PurchaseRequest;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::authenticated());
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPurchaseRequests {
    #[serde(default)]
    pub status: Option<PurchaseRequestStatus>,
    #[serde(default)]
    pub mine: bool,
}

impl Request for ListPurchaseRequests {
    type Response = Vec<PurchaseRequest>;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::authenticated());
}

pub struct PurchaseRequestValidator;

impl Validator<CreatePurchaseRequest> for PurchaseRequestValidator {
    fn validate(&self, request: &CreatePurchaseRequest, errors: &mut FieldErrors) {
        check_draft(&request.draft, errors);
    }
}

impl Validator<UpdatePurchaseRequest> for PurchaseRequestValidator {
    fn validate(&self, request: &UpdatePurchaseRequest, errors: &mut FieldErrors) {
        check_draft(&request.draft, errors);
    }
}

pub struct DecisionValidator;

impl Validator<ApprovePurchaseRequest> for DecisionValidator {
    fn validate(&self, request: &ApprovePurchaseRequest, errors: &mut FieldErrors) {
        errors.optional_text("Note", request.note.as_deref(), NOTE_MAX_LEN);
    }
}

impl Validator<RejectPurchaseRequest> for DecisionValidator {
    fn validate(&self, request: &RejectPurchaseRequest, errors: &mut FieldErrors) {
        errors.required_text("Reason", &request.reason, NOTE_MAX_LEN);
    }
}

/// Shared access to the store for every purchase request handler
#[derive(Clone)]
pub struct PurchaseRequestHandler {
    store: Arc<dyn Store>,
}

impl PurchaseRequestHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load(&self, id: Uuid, ctx: &DispatchContext) -> Result<Outcome<PurchaseRequest>, PipelineError> {
        let found = ctx.cancellation.run(self.store.find_purchase_request(id)).await??;
        Ok(found.ok_or_else(|| not_found(id)))
    }

    /// Write back a transition decided while the request was `loaded`
    async fn save(
        &self,
        request: &PurchaseRequest,
        loaded: PurchaseRequestStatus,
        ctx: &DispatchContext,
    ) -> Result<Outcome, PipelineError> {
        match ctx.cancellation.run(self.store.update_purchase_request(request, loaded)).await?? {
            0 => Ok(Err(concurrent_update(request.id))),
            _ => Ok(Ok(())),
        }
    }

    /// Load a request the caller owns, in a state the caller may change
    async fn load_owned(&self, id: Uuid, ctx: &DispatchContext) -> Result<Outcome<PurchaseRequest>, PipelineError> {
        let user = current_user(ctx).await?;
        let request = match self.load(id, ctx).await? {
            Ok(request) => request,
            Err(error) => return Ok(Err(error)),
        };

        match user.user_id {
            Some(user_id) if request.is_owned_by(user_id) => Ok(Ok(request)),
            Some(_) => Ok(Err(not_owner())),
            None => Ok(Err(Error::unauthenticated())),
        }
    }

    /// Approval and rejection share loading and the no-self-approval rule
    async fn decide<F>(&self, id: Uuid, ctx: &DispatchContext, apply: F) -> Result<Outcome, PipelineError>
    where
        F: FnOnce(&mut PurchaseRequest, Uuid) -> Outcome + Send,
    {
        let user = current_user(ctx).await?;
        let Some(approver_id) = user.user_id else {
            return Ok(Err(Error::unauthenticated()));
        };

        let mut request = match self.load(id, ctx).await? {
            Ok(request) => request,
            Err(error) => return Ok(Err(error)),
        };

        if request.is_owned_by(approver_id) {
            return Ok(Err(Error::unauthorized(
                "PurchaseRequest.SelfApproval",
                "Requesters cannot decide on their own purchase requests",
            )));
        }

        let loaded = request.status;
        if let Err(error) = apply(&mut request, approver_id) {
            return Ok(Err(error));
        }

        tracing::info!(
            "Purchase request {} moved to {} by {}",
            request.id,
            request.status,
            approver_id
        );
        self.save(&request, loaded, ctx).await
    }
}

#[async_trait]
impl Handler<CreatePurchaseRequest> for PurchaseRequestHandler {
    async fn handle(&self, request: CreatePurchaseRequest, ctx: &DispatchContext) -> Result<Outcome<Uuid>, PipelineError> {
        let user = current_user(ctx).await?;
        let Some(requester_id) = user.user_id else {
            return Ok(Err(Error::unauthenticated()));
        };

        let draft = request.draft;
        let purchase_request = PurchaseRequest::new(requester_id, draft.clone());

        match ctx.cancellation.run(self.store.insert_purchase_request(&purchase_request)).await? {
            Ok(_) => {
                tracing::info!(
                    "Created purchase request {} for {} by {}",
                    purchase_request.id,
                    purchase_request.amount,
                    requester_id
                );
                Ok(Ok(purchase_request.id))
            }
            Err(e) => Ok(Err(reference_failure(e, &draft)?)),
        }
    }
}

#[async_trait]
impl Handler<UpdatePurchaseRequest> for PurchaseRequestHandler {
    async fn handle(&self, request: UpdatePurchaseRequest, ctx: &DispatchContext) -> Result<Outcome, PipelineError> {
        let mut purchase_request = match self.load_owned(request.id, ctx).await? {
            Ok(purchase_request) => purchase_request,
            Err(error) => return Ok(Err(error)),
        };

        let loaded = purchase_request.status;
        if let Err(error) = purchase_request.update(request.draft.clone()) {
            return Ok(Err(error));
        }

        let saved = self.store.update_purchase_request(&purchase_request, loaded);
        match ctx.cancellation.run(saved).await? {
            Ok(0) => Ok(Err(concurrent_update(request.id))),
            Ok(_) => Ok(Ok(())),
            Err(e) => Ok(Err(reference_failure(e, &request.draft)?)),
        }
    }
}

#[async_trait]
impl Handler<SubmitPurchaseRequest> for PurchaseRequestHandler {
    async fn handle(&self, request: SubmitPurchaseRequest, ctx: &DispatchContext) -> Result<Outcome, PipelineError> {
        let mut purchase_request = match self.load_owned(request.id, ctx).await? {
            Ok(purchase_request) => purchase_request,
            Err(error) => return Ok(Err(error)),
        };

        let loaded = purchase_request.status;
        if let Err(error) = purchase_request.submit() {
            return Ok(Err(error));
        }

        self.save(&purchase_request, loaded, ctx).await
    }
}

#[async_trait]
impl Handler<ApprovePurchaseRequest> for PurchaseRequestHandler {
    async fn handle(&self, request: ApprovePurchaseRequest, ctx: &DispatchContext) -> Result<Outcome, PipelineError> {
        let note = request.note;
        self.decide(request.id, ctx, move |purchase_request, approver_id| {
            purchase_request.approve(approver_id, note)
        })
        .await
    }
}

#[async_trait]
impl Handler<RejectPurchaseRequest> for PurchaseRequestHandler {
    async fn handle(&self, request: RejectPurchaseRequest, ctx: &DispatchContext) -> Result<Outcome, PipelineError> {
        let reason = request.reason.trim().to_string();
        self.decide(request.id, ctx, move |purchase_request, approver_id| {
            purchase_request.reject(approver_id, reason)
        })
        .await
    }
}

#[async_trait]
impl Handler<GetPurchaseRequest> for PurchaseRequestHandler {
    async fn handle(&self, request: GetPurchaseRequest, ctx: &DispatchContext) -> Result<Outcome<PurchaseRequest>, PipelineError> {
        let user = current_user(ctx).await?;
        let purchase_request = match self.load(request.id, ctx).await? {
            Ok(purchase_request) => purchase_request,
            Err(error) => return Ok(Err(error)),
        };

        // Hidden requests look missing rather than forbidden
        let visible = sees_all(&user)
            || user.user_id.map_or(false, |id| purchase_request.is_owned_by(id));
        if visible {
            Ok(Ok(purchase_request))
        } else {
            Ok(Err(not_found(request.id)))
        }
    }
}

#[async_trait]
impl Handler<ListPurchaseRequests> for PurchaseRequestHandler {
    async fn handle(&self, request: ListPurchaseRequests, ctx: &DispatchContext) -> Result<Outcome<Vec<PurchaseRequest>>, PipelineError> {
        let user = current_user(ctx).await?;

        let requester_id = if request.mine || !sees_all(&user) {
            user.user_id
        } else {
            None
        };
        let filter = PurchaseRequestFilter {
            requester_id,
            status: request.status,
        };

        let requests = ctx.cancellation.run(self.store.list_purchase_requests(&filter)).await??;
        Ok(Ok(requests))
    }
}

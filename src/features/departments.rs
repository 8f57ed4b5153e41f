use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::roles;
use crate::database::models::Department;
use crate::database::{constraints, Store};
use crate::pipeline::{
    Authorization, DispatchContext, Error, FieldErrors, Handler, Outcome, PipelineError, Request,
    Validator,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDepartment {
    pub name: String,
}

impl Request for CreateDepartment {
    type Response = Uuid;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::roles(&[roles::ADMIN]));
}

#[derive(Debug, Clone)]
pub struct GetDepartment {
    pub id: Uuid,
}

impl Request for GetDepartment {
    type Response = Department;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::authenticated());
}

#[derive(Debug, Clone, Default)]
pub struct ListDepartments;

impl Request for ListDepartments {
    type Response = Vec<Department>;
    const AUTHORIZATION: Option<Authorization> = Some(Authorization::authenticated());
}

pub struct CreateDepartmentValidator;

impl Validator<CreateDepartment> for CreateDepartmentValidator {
    fn validate(&self, request: &CreateDepartment, errors: &mut FieldErrors) {
        errors.required_text("Name", &request.name, 100);
    }
}

pub struct CreateDepartmentHandler {
    store: Arc<dyn Store>,
}

impl CreateDepartmentHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<CreateDepartment> for CreateDepartmentHandler {
    async fn handle(&self, request: CreateDepartment, ctx: &DispatchContext) -> Result<Outcome<Uuid>, PipelineError> {
        let department = Department::new(request.name.trim());

        match ctx.cancellation.run(self.store.insert_department(&department)).await? {
            Ok(_) => {
                tracing::info!("Created department '{}' ({})", department.name, department.id);
                Ok(Ok(department.id))
            }
            Err(e) if e.is_unique_violation(constraints::DEPARTMENT_NAME_UNIQUE) => Ok(Err(Error::conflict(
                "Department.DuplicateName",
                format!("A department named '{}' already exists", department.name),
            )
            .with_field_error("Name", format!("Department name '{}' is already in use.", department.name)))),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct GetDepartmentHandler {
    store: Arc<dyn Store>,
}

impl GetDepartmentHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<GetDepartment> for GetDepartmentHandler {
    async fn handle(&self, request: GetDepartment, ctx: &DispatchContext) -> Result<Outcome<Department>, PipelineError> {
        let department = ctx.cancellation.run(self.store.find_department(request.id)).await??;
        Ok(department.ok_or_else(|| {
            Error::not_found("Department.NotFound", format!("Department {} was not found", request.id))
        }))
    }
}

pub struct ListDepartmentsHandler {
    store: Arc<dyn Store>,
}

impl ListDepartmentsHandler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<ListDepartments> for ListDepartmentsHandler {
    async fn handle(&self, _request: ListDepartments, ctx: &DispatchContext) -> Result<Outcome<Vec<Department>>, PipelineError> {
        Ok(Ok(ctx.cancellation.run(self.store.list_departments()).await??))
    }
}

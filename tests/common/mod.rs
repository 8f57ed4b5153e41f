#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use procure_api::auth::{generate_jwt, roles, Claims};
use procure_api::config::AppConfig;
use procure_api::database::MemoryStore;
use procure_api::features::register_all;
use procure_api::handlers::{app, AppState};
use procure_api::pipeline::{CurrentUser, DispatchContext, Dispatcher, Outcome, Request as PipelineRequest};

/// A dispatcher over a fresh in-memory store
pub fn dispatcher() -> Dispatcher {
    register_all(Arc::new(MemoryStore::new())).expect("handlers register")
}

pub fn user(roles: &[&str]) -> CurrentUser {
    CurrentUser::authenticated(Uuid::new_v4(), "test-user", roles)
}

pub fn admin() -> CurrentUser {
    user(&[roles::ADMIN])
}

pub fn requester() -> CurrentUser {
    user(&[roles::REQUESTER])
}

pub fn approver() -> CurrentUser {
    user(&[roles::APPROVER])
}

pub async fn send<R: PipelineRequest>(
    dispatcher: &Dispatcher,
    user: &CurrentUser,
    request: R,
) -> Outcome<R::Response> {
    dispatcher
        .send(request, &DispatchContext::for_user(user.clone()))
        .await
        .expect("dispatch should not abort")
}

/// The HTTP app in development configuration over an in-memory store
pub struct TestApp {
    router: Router,
    secret: String,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig::development();
        let secret = config.security.jwt_secret.clone();
        let router = app(AppState::new(dispatcher(), config, None));
        Self { router, secret }
    }

    /// Signed bearer token for `user`
    pub fn token(&self, user: &CurrentUser) -> String {
        let claims = Claims::new(
            user.user_id.expect("authenticated user"),
            user.name.clone().unwrap_or_default(),
            user.roles.clone(),
            1,
        );
        generate_jwt(&claims, &self.secret).expect("sign token")
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }
}

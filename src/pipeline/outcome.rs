// Outcome model shared by every handler in the system
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field name -> messages. Ordered so error bodies render deterministically.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

/// Result of a single request: success value or a business [`Error`].
/// `Outcome<()>` is the value-less variant.
pub type Outcome<T = ()> = Result<T, Error>;

/// Classification used by the transport layer to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    Validation,
    NotFound,
    Conflict,
    Failure,
    Unauthorized,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Validation => "Validation",
            ErrorType::NotFound => "NotFound",
            ErrorType::Conflict => "Conflict",
            ErrorType::Failure => "Failure",
            ErrorType::Unauthorized => "Unauthorized",
        }
    }

    /// Transport status for this kind of failure. `Unauthorized` maps to 403;
    /// [`Error::status_code`] narrows unauthenticated callers to 401.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::Validation => StatusCode::BAD_REQUEST,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::Failure => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::Unauthorized => StatusCode::FORBIDDEN,
        }
    }
}

/// Business failure returned inside an [`Outcome`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub code: String,
    pub message: String,
    pub error_type: ErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<ValidationErrors>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_roles: Vec<String>,
}

impl Error {
    pub const UNAUTHENTICATED: &'static str = "Auth.Unauthenticated";
    pub const FORBIDDEN: &'static str = "Auth.Forbidden";

    fn new(code: impl Into<String>, message: impl Into<String>, error_type: ErrorType) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            error_type,
            validation_errors: None,
            required_roles: Vec::new(),
        }
    }

    /// Bad input with per-field messages
    pub fn validation(
        code: impl Into<String>,
        message: impl Into<String>,
        errors: ValidationErrors,
    ) -> Self {
        Self::new(code, message, ErrorType::Validation).with_validation_errors(errors)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorType::NotFound)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorType::Conflict)
    }

    /// Unexpected failure. Only produced when an unmapped infrastructure
    /// error has to cross the transport boundary.
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorType::Failure)
    }

    /// Caller is known but may not act on this particular entity
    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorType::Unauthorized)
    }

    /// Caller has no resolvable identity
    pub fn unauthenticated() -> Self {
        Self::new(
            Self::UNAUTHENTICATED,
            "Authentication is required to perform this operation",
            ErrorType::Unauthorized,
        )
    }

    /// Caller is authenticated but holds none of `roles`
    pub fn forbidden<S: AsRef<str>>(roles: &[S]) -> Self {
        let roles: Vec<String> = roles.iter().map(|r| r.as_ref().to_string()).collect();
        let mut error = Self::new(
            Self::FORBIDDEN,
            format!("This operation requires one of the roles: {}", roles.join(", ")),
            ErrorType::Unauthorized,
        );
        error.required_roles = roles;
        error
    }

    pub fn with_validation_errors(mut self, errors: ValidationErrors) -> Self {
        self.validation_errors = Some(errors);
        self
    }

    /// Attach a single field message, keeping any already present
    pub fn with_field_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.validation_errors
            .get_or_insert_with(BTreeMap::new)
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    pub fn is_forbidden(&self) -> bool {
        self.error_type == ErrorType::Unauthorized && self.code == Self::FORBIDDEN
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.error_type == ErrorType::Unauthorized && self.code == Self::UNAUTHENTICATED
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_unauthenticated() {
            StatusCode::UNAUTHORIZED
        } else {
            self.error_type.status_code()
        }
    }

    /// Messages recorded for `field`, empty when none
    pub fn field_errors(&self, field: &str) -> &[String] {
        self.validation_errors
            .as_ref()
            .and_then(|errors| errors.get(field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.error_type.as_str(), self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_exposes_value() {
        let outcome: Outcome<u32> = Ok(42);
        assert_eq!(outcome.clone().unwrap(), 42);
        assert!(outcome.is_ok());
    }

    #[test]
    #[should_panic]
    fn value_of_failure_is_a_contract_violation() {
        let outcome: Outcome<u32> = Err(Error::not_found("Thing.NotFound", "missing"));
        outcome.unwrap();
    }

    #[test]
    #[should_panic]
    fn error_of_success_is_a_contract_violation() {
        let outcome: Outcome = Ok(());
        outcome.unwrap_err();
    }

    #[test]
    fn status_codes_follow_error_type() {
        assert_eq!(ErrorType::Validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorType::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorType::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorType::Failure.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::forbidden(&["Admin"]).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::unauthenticated().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn match_invokes_exactly_one_branch() {
        let outcomes: Vec<Outcome<&str>> = vec![Ok("ok"), Err(Error::conflict("X.Conflict", "taken"))];
        let mut calls = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(value) => calls.push(format!("success:{}", value)),
                Err(error) => calls.push(format!("failure:{}", error.code)),
            }
        }
        assert_eq!(calls, vec!["success:ok", "failure:X.Conflict"]);
    }

    #[test]
    fn forbidden_carries_required_roles() {
        let error = Error::forbidden(&["Admin", "Approver"]);
        assert!(error.is_forbidden());
        assert_eq!(error.error_type, ErrorType::Unauthorized);
        assert_eq!(error.required_roles, vec!["Admin".to_string(), "Approver".to_string()]);
        assert!(error.message.contains("Admin, Approver"));
    }

    #[test]
    fn field_errors_accumulate_per_field() {
        let error = Error::conflict("Category.DuplicateName", "duplicate")
            .with_field_error("Name", "first")
            .with_field_error("Name", "second");
        assert_eq!(error.field_errors("Name").to_vec(), vec!["first".to_string(), "second".to_string()]);
        assert!(error.field_errors("Description").is_empty());
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let value = serde_json::to_value(Error::not_found("Category.NotFound", "gone")).unwrap();
        assert_eq!(value["error_type"], "NotFound");
        assert!(value.get("validation_errors").is_none());
        assert!(value.get("required_roles").is_none());
    }
}

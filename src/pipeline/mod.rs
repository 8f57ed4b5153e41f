// Request pipeline: every operation in the system is a Request sent through
// the Dispatcher, wrapped Authorization -> Validation -> Handler.

pub mod authorization;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod outcome;
pub mod request;
pub mod validation;

// Re-export core types
pub use authorization::{Authorization, AuthorizationBehavior};
pub use context::{Cancellation, CurrentUser, DispatchContext, UserContext};
pub use dispatcher::{Dispatcher, PipelineRegistry};
pub use error::PipelineError;
pub use outcome::{Error, ErrorType, Outcome, ValidationErrors};
pub use request::{Handler, Request};
pub use validation::{FieldErrors, ValidationBehavior, Validator};

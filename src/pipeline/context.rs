// Per-dispatch context: caller identity and cancellation
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::pipeline::error::PipelineError;

/// Identity of whoever issued the request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: Uuid, name: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            user_id: Some(user_id),
            name: Some(name.into()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Resolves the current caller. Implementations may do I/O (session or
/// user-table lookups), so resolution is async.
#[async_trait]
pub trait UserContext: Send + Sync {
    async fn current_user(&self) -> CurrentUser;
}

#[async_trait]
impl UserContext for CurrentUser {
    async fn current_user(&self) -> CurrentUser {
        self.clone()
    }
}

/// Cooperative cancellation signal shared by a dispatch and everything it
/// awaits. Clones observe the same signal.
#[derive(Debug, Clone)]
pub struct Cancellation {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes once `cancel` has been called on any clone
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of self, so wait_for only
        // returns Err if every handle is gone.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Drive `future` unless cancellation arrives first
    pub async fn run<F, T>(&self, future: F) -> Result<T, PipelineError>
    where
        F: Future<Output = T>,
    {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(PipelineError::Cancelled),
            output = future => Ok(output),
        }
    }

    /// Fail fast between steps of a handler
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a pipeline needs besides the request itself
#[derive(Clone)]
pub struct DispatchContext {
    pub user: Arc<dyn UserContext>,
    pub cancellation: Cancellation,
}

impl DispatchContext {
    pub fn new(user: Arc<dyn UserContext>, cancellation: Cancellation) -> Self {
        Self { user, cancellation }
    }

    /// Context for a caller whose identity is already known
    pub fn for_user(user: CurrentUser) -> Self {
        Self::new(Arc::new(user), Cancellation::new())
    }

    pub fn anonymous() -> Self {
        Self::for_user(CurrentUser::anonymous())
    }
}

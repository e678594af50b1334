// src/safety/authorization.rs

//! One-time approval of dangerous operation categories.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::sync::lock;

/// Categories of host operations that need explicit user approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    /// Typing arbitrary text into whatever window has focus.
    TextInjection,
    /// Any input issued while the run is sped up past the rapid threshold.
    RapidInput,
}

impl fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationCategory::TextInjection => "text_injection",
            OperationCategory::RapidInput => "rapid_input",
        };
        f.write_str(s)
    }
}

impl FromStr for OperationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text_injection" => Ok(OperationCategory::TextInjection),
            "rapid_input" => Ok(OperationCategory::RapidInput),
            other => Err(format!(
                "unknown operation category: {other} (expected text_injection or rapid_input)"
            )),
        }
    }
}

/// What the caller is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub category: OperationCategory,
    /// Human-readable context, e.g. the script name.
    pub context: String,
}

/// Surface that decides on authorization requests (usually the UI).
pub trait AuthorizationHandler: Send + Sync {
    /// Return `true` to approve. Called on the session's worker thread.
    fn authorize(&self, request: &AuthorizationRequest) -> bool;
}

impl<F> AuthorizationHandler for F
where
    F: Fn(&AuthorizationRequest) -> bool + Send + Sync,
{
    fn authorize(&self, request: &AuthorizationRequest) -> bool {
        self(request)
    }
}

/// Approved categories for the lifetime of the process, plus the handler
/// used to ask for new approvals.
#[derive(Default)]
pub struct Authorizations {
    approved: Mutex<HashSet<OperationCategory>>,
    handler: Mutex<Option<Arc<dyn AuthorizationHandler>>>,
}

impl fmt::Debug for Authorizations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizations")
            .field("approved", &*lock(&self.approved))
            .field("has_handler", &lock(&self.handler).is_some())
            .finish()
    }
}

impl Authorizations {
    pub fn set_handler(&self, handler: Arc<dyn AuthorizationHandler>) {
        *lock(&self.handler) = Some(handler);
    }

    pub fn preauthorize(&self, category: OperationCategory) {
        debug!(%category, "category pre-authorized");
        lock(&self.approved).insert(category);
    }

    pub fn is_authorized(&self, category: OperationCategory) -> bool {
        lock(&self.approved).contains(&category)
    }

    /// Return the cached approval, or ask the handler.
    ///
    /// Approvals are cached; denials are not, so the user can be asked again.
    /// With no handler installed every uncached request is denied.
    pub fn request(&self, category: OperationCategory, context: &str) -> bool {
        if self.is_authorized(category) {
            return true;
        }

        let handler = lock(&self.handler).clone();
        let Some(handler) = handler else {
            warn!(%category, context, "no authorization handler installed; denying");
            return false;
        };

        let request = AuthorizationRequest {
            category,
            context: context.to_string(),
        };

        let mut approved = false;
        crate::sync::call_isolated("authorization handler", || {
            approved = handler.authorize(&request);
        });

        if approved {
            info!(%category, context, "operation category authorized");
            lock(&self.approved).insert(category);
        } else {
            warn!(%category, context, "operation category denied");
        }

        approved
    }
}

// src/safety/mod.rs

//! Safety subsystem shared by every session.
//!
//! - [`kill_switch`] holds the process-wide emergency stop.
//! - [`limits`] is the pure operation-count / duration check.
//! - [`authorization`] tracks which dangerous categories were approved.
//!
//! [`SafetyService`] bundles them. It has no dependency on the engine; the
//! execution service subscribes to kill-switch activation to wake parked
//! sessions.

pub mod authorization;
pub mod kill_switch;
pub mod limits;

use std::sync::Arc;
use std::time::Duration;

pub use authorization::{
    AuthorizationHandler, AuthorizationRequest, Authorizations, OperationCategory,
};
pub use kill_switch::{KillSwitch, KillSwitchListener, KillSwitchRecord};
pub use limits::{ExecutionLimits, LimitViolation, check_execution_limits};

#[derive(Debug, Default)]
pub struct SafetyService {
    kill_switch: KillSwitch,
    authorizations: Authorizations,
}

impl SafetyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service that asks `handler` for authorization decisions.
    pub fn with_handler(handler: Arc<dyn AuthorizationHandler>) -> Self {
        let service = Self::default();
        service.authorizations.set_handler(handler);
        service
    }

    pub fn activate_kill_switch(&self, reason: impl Into<String>) -> bool {
        self.kill_switch.activate(reason)
    }

    pub fn deactivate_kill_switch(&self) -> bool {
        self.kill_switch.deactivate()
    }

    pub fn is_kill_switch_active(&self) -> bool {
        self.kill_switch.is_active()
    }

    pub fn kill_switch_record(&self) -> Option<KillSwitchRecord> {
        self.kill_switch.record()
    }

    pub fn subscribe_kill_switch(&self, listener: KillSwitchListener) {
        self.kill_switch.subscribe(listener);
    }

    pub fn check_execution_limits(
        &self,
        operation_index: u64,
        elapsed: Duration,
        limits: &ExecutionLimits,
    ) -> Option<LimitViolation> {
        check_execution_limits(operation_index, elapsed, limits)
    }

    pub fn set_authorization_handler(&self, handler: Arc<dyn AuthorizationHandler>) {
        self.authorizations.set_handler(handler);
    }

    pub fn preauthorize(&self, category: OperationCategory) {
        self.authorizations.preauthorize(category);
    }

    pub fn is_authorized(&self, category: OperationCategory) -> bool {
        self.authorizations.is_authorized(category)
    }

    pub fn request_authorization(&self, category: OperationCategory, context: &str) -> bool {
        self.authorizations.request(category, context)
    }
}

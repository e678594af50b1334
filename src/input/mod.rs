// src/input/mod.rs

//! Input backend layer.
//!
//! - [`backend`] defines the `InputBackend` contract and the provider that
//!   picks a backend from the session's `InputMode`.
//! - [`simulated`] is the in-process backend that models a virtual device.

pub mod backend;
pub mod simulated;

pub use backend::{
    BackendError, BackendResult, ButtonPhase, FixedBackendProvider, InputBackend,
    InputBackendProvider, MouseButton, Point,
};
pub use simulated::{SimulatedBackend, SimulatedBackendProvider};

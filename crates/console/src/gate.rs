//! Per-capability render decision for gated UI elements.

use crate::permissions::PermissionState;
use crm_core::{Action, Module};

/// Outcome of evaluating a gate against the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Permissions not loaded yet. Render neither branch.
    Pending,
    Allow,
    Deny,
}

/// Guards one element behind a `(module, action)` permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionGate {
    pub module: Module,
    pub action: Action,
}

impl PermissionGate {
    pub fn new(module: Module, action: Action) -> Self {
        Self { module, action }
    }

    pub fn read(module: Module) -> Self {
        Self::new(module, Action::Read)
    }

    pub fn decide(&self, state: &PermissionState) -> GateDecision {
        match state {
            PermissionState::Uninitialized | PermissionState::Loading => GateDecision::Pending,
            PermissionState::Ready(set) if set.allows(self.module, self.action) => GateDecision::Allow,
            PermissionState::Ready(_) => GateDecision::Deny,
        }
    }

    /// Build the authorized content when allowed. Denied elements render
    /// nothing, same as pending ones.
    pub fn render<T>(&self, state: &PermissionState, authorized: impl FnOnce() -> T) -> Option<T> {
        match self.decide(state) {
            GateDecision::Allow => Some(authorized()),
            GateDecision::Pending | GateDecision::Deny => None,
        }
    }

    /// Like [`render`](Self::render) but builds `fallback` on deny. While
    /// pending neither closure runs, so nothing flashes before the
    /// permissions resolve.
    pub fn render_or<T>(
        &self,
        state: &PermissionState,
        authorized: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> Option<T> {
        match self.decide(state) {
            GateDecision::Pending => None,
            GateDecision::Allow => Some(authorized()),
            GateDecision::Deny => Some(fallback()),
        }
    }
}

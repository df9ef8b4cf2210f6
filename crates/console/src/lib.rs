//! Client-side state layer of the consultancy CRM console. Composes the REST
//! client and entity DTOs into what the dashboard views consume.
//!
//! # Modules
//!
//! - [`permissions`] — Permission set decoding and the session-scoped context
//! - [`gate`] — Per-capability render decision
//! - [`navigation`] — Fixed sidebar menu filtered by read access
//! - [`notifications`] — Notification list/unread reconciliation and its async driver
//! - [`cache`] — Query cache with per-resource invalidation
//! - [`toast`] — Transient user-facing messages
//! - [`mutation`] — Validate → request → invalidate → toast pipeline
//! - [`resources`] — List/detail/edit view model for any resource family
//! - [`actions`] — Domain actions beyond CRUD (convert, cancel, publish, ...)
//! - [`dashboard`] — Overview cards filtered by permission

pub mod actions;
pub mod cache;
pub mod dashboard;
pub mod gate;
pub mod mutation;
pub mod navigation;
pub mod notifications;
pub mod permissions;
pub mod resources;
pub mod toast;

pub use actions::DomainActions;
pub use cache::QueryCache;
pub use dashboard::{load_overview, Overview, OverviewCard};
pub use gate::{GateDecision, PermissionGate};
pub use mutation::{Mutation, MutationRunner};
pub use navigation::{visible_entries, NavEntry, MENU};
pub use notifications::{NotificationState, NotificationSync, SyncOptions};
pub use permissions::{PermissionSet, PermissionState, SessionContext};
pub use resources::{Capabilities, LoadState, ResourceView};
pub use toast::{CaptureToasts, LogToasts, Toast, ToastKind, ToastSink};

//! Shared foundation for the consultancy CRM console: configuration, error
//! taxonomy, wire types, permission vocabulary and validation.

pub mod config;
pub mod error;
pub mod permission;
pub mod resource;
pub mod types;
pub mod validation;

pub use config::AppConfig;
pub use error::{CrmError, CrmResult};
pub use permission::{Action, Module};
pub use resource::Resource;
pub use types::{CurrentUser, ListQuery, Notification, Page, PageMeta, SortOrder};
pub use validation::{FieldErrors, Validate};

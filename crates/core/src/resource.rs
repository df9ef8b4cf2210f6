//! Binding between a REST resource family and its DTOs.

use crate::permission::Module;
use crate::validation::Validate;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A REST resource family mounted at `/{PATH}`.
///
/// `Create` is the POST body; `Update` is the PATCH body with every field
/// optional.
pub trait Resource: Send + Sync + 'static {
    /// Path segment, e.g. `visa-types`.
    const PATH: &'static str;
    /// Human label used in toasts, e.g. `Visa type`.
    const LABEL: &'static str;
    /// Permission module that gates this resource.
    const MODULE: Module;

    type Entity: DeserializeOwned + Serialize + Clone + Send + Sync + 'static;
    type Create: Serialize + Validate + Send + Sync;
    type Update: Serialize + Validate + Send + Sync;

    fn id(entity: &Self::Entity) -> &str;
}

//! Permission set decoding and the session-scoped permission context.
//!
//! The authenticated user's permissions are fetched once per session from
//! `GET /auth/me` and kept read-only until logout. Everything that gates UI
//! consults the shared [`SessionContext`] rather than re-fetching.

use crm_client::AuthApi;
use crm_core::permission::parse_permission;
use crm_core::types::CurrentUser;
use crm_core::{Action, Module};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Set of `(module, action)` grants held by the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    granted: HashSet<(Module, Action)>,
}

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode `module:action` strings. Unknown modules or actions are
    /// skipped; the server may know capabilities this build does not.
    pub fn from_strings<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut granted = HashSet::new();
        for entry in raw {
            let entry = entry.as_ref();
            match parse_permission(entry) {
                Some(pair) => {
                    granted.insert(pair);
                }
                None => debug!(permission = %entry, "Skipping unrecognised permission"),
            }
        }
        Self { granted }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Module, Action)>) -> Self {
        Self {
            granted: pairs.into_iter().collect(),
        }
    }

    /// Membership test. Holds no hierarchy: `update` does not imply `read`.
    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.granted.contains(&(module, action))
    }

    /// Modules with at least one grant, in declaration order.
    pub fn modules(&self) -> BTreeSet<Module> {
        self.granted.iter().map(|(m, _)| *m).collect()
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }
}

/// Lifecycle of the session's permission set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionState {
    /// No load attempted yet, or the user logged out.
    Uninitialized,
    /// `GET /auth/me` is in flight.
    Loading,
    /// Permissions known. A failed load lands here with an empty set.
    Ready(Arc<PermissionSet>),
}

impl PermissionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, PermissionState::Uninitialized | PermissionState::Loading)
    }

    pub fn permissions(&self) -> Option<&PermissionSet> {
        match self {
            PermissionState::Ready(set) => Some(set),
            _ => None,
        }
    }

    /// `false` until the set is ready.
    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.permissions().is_some_and(|set| set.allows(module, action))
    }
}

struct Inner {
    state: PermissionState,
    user: Option<CurrentUser>,
}

/// Session-scoped holder of the current user and their permissions. Cheap to
/// share behind an `Arc`; readers never block each other.
pub struct SessionContext {
    inner: RwLock<Inner>,
    /// Bumped by every load and logout so a stale load cannot overwrite a
    /// newer session.
    generation: AtomicU64,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: PermissionState::Uninitialized,
                user: None,
            }),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> PermissionState {
        self.inner.read().state.clone()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.inner.read().user.clone()
    }

    pub fn can(&self, module: Module, action: Action) -> bool {
        self.inner.read().state.allows(module, action)
    }

    /// Fetch the current user and install their permissions. A failed fetch
    /// is logged and leaves the session ready with no permissions, so every
    /// gated element resolves to its fallback.
    pub async fn load(&self, api: &dyn AuthApi) -> PermissionState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.write().state = PermissionState::Loading;

        let result = api.current_user().await;

        let mut inner = self.inner.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding superseded permission load");
            return inner.state.clone();
        }
        match result {
            Ok(user) => {
                let set = PermissionSet::from_strings(&user.permissions);
                info!(
                    user_id = %user.id,
                    role = %user.role,
                    granted = set.len(),
                    "Session permissions loaded"
                );
                inner.state = PermissionState::Ready(Arc::new(set));
                inner.user = Some(user);
            }
            Err(e) => {
                warn!(error = %e, "Failed to load session permissions");
                inner.state = PermissionState::Ready(Arc::new(PermissionSet::empty()));
                inner.user = None;
            }
        }
        inner.state.clone()
    }

    /// Forget the user and their permissions.
    pub fn logout(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write();
        if let Some(user) = inner.user.take() {
            info!(user_id = %user.id, "Session ended");
        }
        inner.state = PermissionState::Uninitialized;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crm_core::{CrmError, CrmResult};
    use tokio::sync::Notify;

    struct FixedUser(Vec<&'static str>);

    #[async_trait]
    impl AuthApi for FixedUser {
        async fn current_user(&self) -> CrmResult<CurrentUser> {
            Ok(CurrentUser {
                id: "u1".into(),
                email: "admin@example.com".into(),
                name: "Admin".into(),
                tenant_id: "t1".into(),
                role_id: "r1".into(),
                role: "Admin".into(),
                permissions: self.0.iter().map(|p| p.to_string()).collect(),
            })
        }
    }

    struct Unreachable;

    #[async_trait]
    impl AuthApi for Unreachable {
        async fn current_user(&self) -> CrmResult<CurrentUser> {
            Err(CrmError::Transport("connection refused".into()))
        }
    }

    /// Blocks until released, so tests can observe the loading state.
    struct Gated {
        release: Arc<Notify>,
        inner: FixedUser,
    }

    #[async_trait]
    impl AuthApi for Gated {
        async fn current_user(&self) -> CrmResult<CurrentUser> {
            self.release.notified().await;
            self.inner.current_user().await
        }
    }

    #[test]
    fn test_from_strings_skips_unknown() {
        let set = PermissionSet::from_strings(["leads:read", "leads:create", "rockets:launch", "garbage"]);
        assert_eq!(set.len(), 2);
        assert!(set.allows(Module::Leads, Action::Read));
        assert!(set.allows(Module::Leads, Action::Create));
        assert!(!set.allows(Module::Leads, Action::Delete));
    }

    #[test]
    fn test_no_implied_permissions() {
        let set = PermissionSet::from_pairs([(Module::Students, Action::Update)]);
        assert!(!set.allows(Module::Students, Action::Read));
        assert_eq!(set.modules().into_iter().collect::<Vec<_>>(), vec![Module::Students]);
    }

    #[test]
    fn test_state_denies_until_ready() {
        assert!(!PermissionState::Loading.allows(Module::Leads, Action::Read));
        assert!(PermissionState::Uninitialized.is_loading());
        let ready = PermissionState::Ready(Arc::new(PermissionSet::from_pairs([(Module::Leads, Action::Read)])));
        assert!(!ready.is_loading());
        assert!(ready.allows(Module::Leads, Action::Read));
    }

    #[tokio::test]
    async fn test_load_and_logout() {
        let session = SessionContext::new();
        assert_eq!(session.state(), PermissionState::Uninitialized);

        let state = session.load(&FixedUser(vec!["tasks:read", "tasks:update"])).await;
        assert!(matches!(state, PermissionState::Ready(ref set) if set.len() == 2));
        assert!(session.can(Module::Tasks, Action::Update));
        assert_eq!(session.current_user().unwrap().id, "u1");

        session.logout();
        assert_eq!(session.state(), PermissionState::Uninitialized);
        assert!(session.current_user().is_none());
        assert!(!session.can(Module::Tasks, Action::Update));
    }

    #[tokio::test]
    async fn test_failed_load_is_ready_and_empty() {
        let session = SessionContext::new();
        let state = session.load(&Unreachable).await;
        assert_eq!(state, PermissionState::Ready(Arc::new(PermissionSet::empty())));
        assert!(!session.can(Module::Leads, Action::Read));
    }

    #[tokio::test]
    async fn test_loading_visible_while_in_flight() {
        let session = Arc::new(SessionContext::new());
        let release = Arc::new(Notify::new());
        let api = Gated {
            release: release.clone(),
            inner: FixedUser(vec!["faqs:read"]),
        };

        let loader = {
            let session = session.clone();
            tokio::spawn(async move { session.load(&api).await })
        };
        while session.state() != PermissionState::Loading {
            tokio::task::yield_now().await;
        }
        release.notify_one();
        loader.await.unwrap();
        assert!(session.can(Module::Faqs, Action::Read));
    }

    #[tokio::test]
    async fn test_logout_during_load_wins() {
        let session = Arc::new(SessionContext::new());
        let release = Arc::new(Notify::new());
        let api = Gated {
            release: release.clone(),
            inner: FixedUser(vec!["faqs:read"]),
        };

        let loader = {
            let session = session.clone();
            tokio::spawn(async move { session.load(&api).await })
        };
        while session.state() != PermissionState::Loading {
            tokio::task::yield_now().await;
        }
        session.logout();
        release.notify_one();
        loader.await.unwrap();

        assert_eq!(session.state(), PermissionState::Uninitialized);
        assert!(session.current_user().is_none());
    }
}

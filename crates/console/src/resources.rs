//! List/detail/edit view model shared by every resource family.

use crate::gate::{GateDecision, PermissionGate};
use crate::mutation::{Mutation, MutationRunner};
use crate::permissions::PermissionState;
use crm_client::ApiClient;
use crm_core::types::{ListQuery, Page};
use crm_core::{Action, CrmError, CrmResult, Resource};
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

/// Read-path state of a view. Errors are kept as the message the view shows
/// in place of the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Which affordances a view shows for the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub read: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Capabilities {
    pub fn for_module(module: crm_core::Module, state: &PermissionState) -> Self {
        let allowed = |action| PermissionGate::new(module, action).decide(state) == GateDecision::Allow;
        Self {
            read: allowed(Action::Read),
            create: allowed(Action::Create),
            update: allowed(Action::Update),
            delete: allowed(Action::Delete),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> CrmResult<T> {
    serde_json::from_value(value).map_err(|e| CrmError::Decode(e.to_string()))
}

pub struct ResourceView<R: Resource> {
    client: ApiClient,
    runner: Arc<MutationRunner>,
    query: ListQuery,
    list: LoadState<Page<R::Entity>>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ResourceView<R> {
    pub fn new(client: ApiClient, runner: Arc<MutationRunner>) -> Self {
        Self {
            client,
            runner,
            query: ListQuery::new(),
            list: LoadState::Idle,
            _resource: PhantomData,
        }
    }

    pub fn capabilities(state: &PermissionState) -> Capabilities {
        Capabilities::for_module(R::MODULE, state)
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn list_state(&self) -> &LoadState<Page<R::Entity>> {
        &self.list
    }

    /// Load one page through the query cache. Failures land in
    /// [`LoadState::Failed`] instead of being returned.
    pub async fn load(&mut self, query: ListQuery) -> &LoadState<Page<R::Entity>> {
        self.query = query;
        self.list = LoadState::Loading;

        let client = &self.client;
        let query = &self.query;
        let result = self
            .runner
            .cache()
            .get_or_fetch(R::PATH, &query.cache_key(), move || client.list_value(R::PATH, query))
            .await
            .and_then(decode::<Page<R::Entity>>);

        self.list = match result {
            Ok(page) => LoadState::Loaded(page),
            Err(e) => {
                warn!(resource = R::PATH, error = %e, "Failed to load list");
                LoadState::Failed(e.user_message())
            }
        };
        &self.list
    }

    /// Re-run the current query. Serves from the cache unless a mutation
    /// invalidated it.
    pub async fn reload(&mut self) -> &LoadState<Page<R::Entity>> {
        let query = self.query.clone();
        self.load(query).await
    }

    pub async fn detail(&self, id: &str) -> CrmResult<R::Entity> {
        let client = &self.client;
        let value = self
            .runner
            .cache()
            .get_or_fetch(&format!("{}/{}", R::PATH, id), "", move || client.get_value(R::PATH, id))
            .await?;
        decode(value)
    }

    pub async fn create(&self, input: &R::Create) -> CrmResult<R::Entity> {
        let mutation = Mutation::new(R::PATH, format!("{} created", R::LABEL));
        self.runner
            .submit(mutation, input, self.client.create::<R>(input))
            .await
    }

    pub async fn update(&self, id: &str, input: &R::Update) -> CrmResult<R::Entity> {
        let mutation = Mutation::new(R::PATH, format!("{} updated", R::LABEL));
        self.runner
            .submit(mutation, input, self.client.update::<R>(id, input))
            .await
    }

    pub async fn delete(&self, id: &str) -> CrmResult<()> {
        let mutation = Mutation::new(R::PATH, format!("{} deleted", R::LABEL));
        self.runner
            .execute(mutation, self.client.delete::<R>(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryCache;
    use crate::permissions::PermissionSet;
    use crate::toast::{CaptureToasts, Toast};
    use crm_core::Module;
    use crm_entities::content::{CreateFaq, Faqs};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn faq(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "question": "Do I need IELTS?",
            "answer": "Most universities require it.",
            "category": "Admissions",
            "order": 1,
            "isPublished": true,
            "createdAt": "2026-01-05T10:00:00Z",
            "updatedAt": "2026-01-05T10:00:00Z"
        })
    }

    fn page(items: Vec<serde_json::Value>) -> serde_json::Value {
        let total = items.len();
        json!({ "data": items, "meta": { "total": total, "page": 1, "limit": 10, "totalPages": 1 } })
    }

    fn view(server: &MockServer) -> (ResourceView<Faqs>, Arc<CaptureToasts>) {
        let toasts = Arc::new(CaptureToasts::new());
        let runner = Arc::new(MutationRunner::new(Arc::new(QueryCache::new()), toasts.clone()));
        let client = ApiClient::with_http(&server.uri(), None, reqwest::Client::new());
        (ResourceView::new(client, runner), toasts)
    }

    #[tokio::test]
    async fn test_list_cached_until_mutation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/faqs"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![faq("f1")])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/faqs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(faq("f2")))
            .expect(1)
            .mount(&server)
            .await;

        let (mut view, toasts) = view(&server);
        let state = view.load(ListQuery::new().page(1)).await;
        assert_eq!(state.loaded().unwrap().data.len(), 1);
        view.reload().await;

        let created = view
            .create(&CreateFaq {
                question: "Can I work while studying?".into(),
                answer: "Up to 20 hours a week in most countries.".into(),
                category: None,
                order: 0,
                is_published: false,
            })
            .await
            .unwrap();
        assert_eq!(created.id, "f2");
        assert_eq!(toasts.last(), Some(Toast::success("FAQ created")));

        // Invalidated: this one reaches the server again.
        view.reload().await;
    }

    #[tokio::test]
    async fn test_list_failure_becomes_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/faqs"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "Database unavailable" })))
            .mount(&server)
            .await;

        let (mut view, toasts) = view(&server);
        let state = view.load(ListQuery::new()).await;
        assert_eq!(state.error(), Some("Database unavailable"));
        assert_eq!(toasts.count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_create_never_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/faqs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(faq("f9")))
            .expect(0)
            .mount(&server)
            .await;

        let (view, _toasts) = view(&server);
        let err = view
            .create(&CreateFaq {
                question: String::new(),
                answer: "x".into(),
                category: None,
                order: 0,
                is_published: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
    }

    #[tokio::test]
    async fn test_detail_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/faqs/f1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(faq("f1")))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/faqs/f1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let (view, toasts) = view(&server);
        assert_eq!(view.detail("f1").await.unwrap().id, "f1");
        assert_eq!(view.detail("f1").await.unwrap().id, "f1");
        view.delete("f1").await.unwrap();
        assert_eq!(toasts.last(), Some(Toast::success("FAQ deleted")));
        view.detail("f1").await.unwrap();
    }

    #[test]
    fn test_capabilities() {
        let state = PermissionState::Ready(Arc::new(PermissionSet::from_strings(["faqs:read", "faqs:update"])));
        let caps = ResourceView::<Faqs>::capabilities(&state);
        assert_eq!(
            caps,
            Capabilities {
                read: true,
                create: false,
                update: true,
                delete: false
            }
        );
        assert_eq!(Capabilities::for_module(Module::Faqs, &PermissionState::Loading), Capabilities::default());
    }
}

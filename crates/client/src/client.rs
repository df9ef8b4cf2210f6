use crm_core::config::ApiConfig;
use crm_core::types::{ApiErrorBody, CurrentUser, ListResponse, Notification, UnreadCount};
use crm_core::{CrmError, CrmResult, ListQuery, Page, Resource};
use crm_entities::DashboardStats;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// HTTP client bound to one API base URL and (optionally) one bearer token.
#[derive(Clone)]
pub struct ApiClient {
    base: String,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> CrmResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CrmError::Config(format!("http client: {e}")))?;
        Ok(Self::with_http(&config.base_url, config.token.clone(), http))
    }

    pub fn with_http(base: &str, token: Option<String>, http: Client) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            token,
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// `{base}/{path}` followed by `segments`, each percent-encoded so ids
    /// containing `/`, `?` or `#` stay one path segment.
    pub fn record_url(&self, path: &str, segments: &[&str]) -> CrmResult<Url> {
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| CrmError::Config(format!("invalid API URL {}: {e}", self.base)))?;
        url.path_segments_mut()
            .map_err(|_| CrmError::Config(format!("API base URL cannot carry a path: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(method = %method, url = %url, "API request");
        self.with_auth(self.http.request(method, url))
    }

    fn record_request(&self, method: Method, path: &str, segments: &[&str]) -> CrmResult<RequestBuilder> {
        let url = self.record_url(path, segments)?;
        debug!(method = %method, url = %url, "API request");
        Ok(self.with_auth(self.http.request(method, url)))
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> CrmResult<Response> {
        let resp = builder.send().await.map_err(transport)?;
        check_status(resp).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> CrmResult<T> {
        let resp = self.send(builder).await?;
        let bytes = resp.bytes().await.map_err(transport)?;
        serde_json::from_slice(&bytes).map_err(|e| CrmError::Decode(e.to_string()))
    }

    async fn send_ack(&self, builder: RequestBuilder) -> CrmResult<()> {
        self.send(builder).await.map(|_| ())
    }

    // ─── Generic CRUD ──────────────────────────────────────────────────────

    pub async fn list<R: Resource>(&self, query: &ListQuery) -> CrmResult<Page<R::Entity>> {
        self.send_json(self.request(Method::GET, R::PATH).query(&query.to_pairs()))
            .await
    }

    pub async fn get<R: Resource>(&self, id: &str) -> CrmResult<R::Entity> {
        self.send_json(self.record_request(Method::GET, R::PATH, &[id])?)
            .await
    }

    pub async fn create<R: Resource>(&self, body: &R::Create) -> CrmResult<R::Entity> {
        self.send_json(self.request(Method::POST, R::PATH).json(body))
            .await
    }

    pub async fn update<R: Resource>(&self, id: &str, body: &R::Update) -> CrmResult<R::Entity> {
        self.send_json(
            self.record_request(Method::PATCH, R::PATH, &[id])?
                .json(body),
        )
        .await
    }

    pub async fn delete<R: Resource>(&self, id: &str) -> CrmResult<()> {
        self.send_ack(self.record_request(Method::DELETE, R::PATH, &[id])?)
            .await
    }

    /// `POST /{resource}/{id}/{action}` returning a typed body.
    pub async fn action<R, B, T>(&self, id: &str, action: &str, body: &B) -> CrmResult<T>
    where
        R: Resource,
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(
            self.record_request(Method::POST, R::PATH, &[id, action])?
                .json(body),
        )
        .await
    }

    /// Untyped list, used by the CLI and the query cache.
    pub async fn list_value(&self, path: &str, query: &ListQuery) -> CrmResult<serde_json::Value> {
        self.send_json(self.request(Method::GET, path).query(&query.to_pairs()))
            .await
    }

    pub async fn get_value(&self, path: &str, id: &str) -> CrmResult<serde_json::Value> {
        self.send_json(self.record_request(Method::GET, path, &[id])?)
            .await
    }

    pub async fn delete_path(&self, path: &str, id: &str) -> CrmResult<()> {
        self.send_ack(self.record_request(Method::DELETE, path, &[id])?)
            .await
    }

    // ─── Auth / dashboard ──────────────────────────────────────────────────

    pub async fn current_user(&self) -> CrmResult<CurrentUser> {
        self.send_json(self.request(Method::GET, "auth/me")).await
    }

    pub async fn dashboard_stats(&self) -> CrmResult<DashboardStats> {
        self.send_json(self.request(Method::GET, "dashboard/stats"))
            .await
    }

    // ─── Notifications ─────────────────────────────────────────────────────

    pub async fn recent_notifications(&self, limit: u32) -> CrmResult<Vec<Notification>> {
        let list: ListResponse<Notification> = self
            .send_json(
                self.request(Method::GET, "notifications")
                    .query(&[("limit", limit.to_string())]),
            )
            .await?;
        Ok(list.into_items())
    }

    pub async fn notification_unread_count(&self) -> CrmResult<u64> {
        let body: UnreadCount = self
            .send_json(self.request(Method::GET, "notifications/unread-count"))
            .await?;
        Ok(body.count)
    }

    pub async fn mark_notification_read(&self, id: &str) -> CrmResult<()> {
        self.send_ack(self.record_request(Method::POST, "notifications", &[id, "read"])?)
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> CrmResult<()> {
        self.send_ack(self.request(Method::POST, "notifications/mark-all-read"))
            .await
    }
}

pub(crate) fn transport(err: reqwest::Error) -> CrmError {
    if err.is_decode() {
        CrmError::Decode(err.to_string())
    } else {
        CrmError::Transport(err.to_string())
    }
}

/// Turn a non-2xx response into [`CrmError::Api`], keeping the server's
/// message when the body carries one.
pub(crate) async fn check_status(resp: Response) -> CrmResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .or_else(|| {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
    debug!(status = status.as_u16(), message = %message, "API error response");
    Err(CrmError::Api {
        status: status.as_u16(),
        message,
    })
}

//! Wire types shared by the client and the console layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Pagination ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// One page of a list endpoint: `{ data, meta }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.meta.page < self.meta.total_pages
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Endpoints that answer with either a bare array or a page.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Paged(Page<T>),
    Plain(Vec<T>),
}

impl<T> ListResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Paged(page) => page.data,
            ListResponse::Plain(items) => items,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page.max(1));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit.max(1));
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = Some(order);
        self
    }

    /// Blank searches are dropped rather than sent as `search=`.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        let trimmed = term.trim();
        self.search = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Query pairs in wire order: `page, limit, sortBy, sortOrder, search`.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sortBy", sort_by.clone()));
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sortOrder", order.as_str().to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }

    /// Stable key used by the query cache.
    pub fn cache_key(&self) -> String {
        self.to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

// ─── Notifications ─────────────────────────────────────────────────────────

/// A server-created notification. The client only ever sets `read_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: u64,
}

// ─── Session ───────────────────────────────────────────────────────────────

/// Payload of `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub tenant_id: String,
    pub role_id: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

// ─── Errors on the wire ────────────────────────────────────────────────────

/// Error body returned by the API. `message` may be a string or a list of
/// validation messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<ErrorMessage>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        match self.message {
            Some(ErrorMessage::One(m)) if !m.is_empty() => Some(m),
            Some(ErrorMessage::Many(list)) if !list.is_empty() => Some(list.join("; ")),
            _ => self.error,
        }
    }
}

/// Acknowledgement body some mutation endpoints return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_pairs() {
        let q = ListQuery::new()
            .page(2)
            .limit(25)
            .sort("createdAt", SortOrder::Desc)
            .search("  toronto ");
        assert_eq!(
            q.to_pairs(),
            vec![
                ("page", "2".to_string()),
                ("limit", "25".to_string()),
                ("sortBy", "createdAt".to_string()),
                ("sortOrder", "desc".to_string()),
                ("search", "toronto".to_string()),
            ]
        );
        assert_eq!(
            q.cache_key(),
            "page=2&limit=25&sortBy=createdAt&sortOrder=desc&search=toronto"
        );
    }

    #[test]
    fn test_blank_search_dropped() {
        let q = ListQuery::new().search("   ");
        assert!(q.search.is_none());
        assert!(q.to_pairs().is_empty());
    }

    #[test]
    fn test_notification_wire_shape() {
        let json = serde_json::json!({
            "id": "n1",
            "type": "LeadCreated",
            "message": "New lead from the Canada landing page",
            "createdAt": "2026-03-01T10:00:00Z",
            "readAt": null
        });
        let n: Notification = serde_json::from_value(json).unwrap();
        assert_eq!(n.kind, "LeadCreated");
        assert!(!n.is_read());

        let back = serde_json::to_value(&n).unwrap();
        assert_eq!(back["type"], "LeadCreated");
        assert!(back["readAt"].is_null());
    }

    #[test]
    fn test_list_response_accepts_both_shapes() {
        let plain: ListResponse<UnreadCount> =
            serde_json::from_str(r#"[{"count":1},{"count":2}]"#).unwrap();
        assert_eq!(plain.into_items().len(), 2);

        let paged: ListResponse<UnreadCount> = serde_json::from_str(
            r#"{"data":[{"count":1}],"meta":{"total":1,"page":1,"limit":5,"totalPages":1}}"#,
        )
        .unwrap();
        assert_eq!(paged.into_items(), vec![UnreadCount { count: 1 }]);
    }

    #[test]
    fn test_error_body_message_forms() {
        let one: ApiErrorBody =
            serde_json::from_str(r#"{"message":"Lead not found","statusCode":404}"#).unwrap();
        assert_eq!(one.into_message().as_deref(), Some("Lead not found"));

        let many: ApiErrorBody = serde_json::from_str(
            r#"{"message":["email must be an email","phone should not be empty"],"error":"Bad Request"}"#,
        )
        .unwrap();
        assert_eq!(
            many.into_message().as_deref(),
            Some("email must be an email; phone should not be empty")
        );

        let bare: ApiErrorBody = serde_json::from_str(r#"{"error":"Conflict"}"#).unwrap();
        assert_eq!(bare.into_message().as_deref(), Some("Conflict"));
    }

    #[test]
    fn test_page_has_next() {
        let page = Page::<u32> {
            data: vec![1, 2],
            meta: PageMeta {
                total: 12,
                page: 1,
                limit: 10,
                total_pages: 2,
            },
        };
        assert!(page.has_next());
    }
}

//! The narrow API surface the console state layer depends on. [`ApiClient`]
//! implements both traits; tests substitute in-memory fakes.

use crate::client::ApiClient;
use async_trait::async_trait;
use crm_core::types::{CurrentUser, Notification};
use crm_core::CrmResult;

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `GET /auth/me`.
    async fn current_user(&self) -> CrmResult<CurrentUser>;
}

#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// `GET /notifications?limit=N`, newest first.
    async fn recent(&self, limit: u32) -> CrmResult<Vec<Notification>>;
    /// `GET /notifications/unread-count`.
    async fn unread_count(&self) -> CrmResult<u64>;
    /// `POST /notifications/{id}/read`.
    async fn mark_read(&self, id: &str) -> CrmResult<()>;
    /// `POST /notifications/mark-all-read`.
    async fn mark_all_read(&self) -> CrmResult<()>;
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn current_user(&self) -> CrmResult<CurrentUser> {
        ApiClient::current_user(self).await
    }
}

#[async_trait]
impl NotificationApi for ApiClient {
    async fn recent(&self, limit: u32) -> CrmResult<Vec<Notification>> {
        self.recent_notifications(limit).await
    }

    async fn unread_count(&self) -> CrmResult<u64> {
        self.notification_unread_count().await
    }

    async fn mark_read(&self, id: &str) -> CrmResult<()> {
        self.mark_notification_read(id).await
    }

    async fn mark_all_read(&self) -> CrmResult<()> {
        self.mark_all_notifications_read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_behind_trait_objects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "u1",
                "email": "counsellor@example.com",
                "name": "Jo Park",
                "tenantId": "t1",
                "roleId": "r2",
                "role": "Counsellor",
                "permissions": ["leads:read", "leads:create"]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/notifications/n1/read"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/notifications/mark-all-read"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::with_http(&server.uri(), None, reqwest::Client::new());
        let auth: Arc<dyn AuthApi> = Arc::new(client.clone());
        let notifications: Arc<dyn NotificationApi> = Arc::new(client);

        let me = auth.current_user().await.unwrap();
        assert_eq!(me.role, "Counsellor");
        assert_eq!(me.permissions.len(), 2);

        notifications.mark_read("n1").await.unwrap();
        notifications.mark_all_read().await.unwrap();
    }
}

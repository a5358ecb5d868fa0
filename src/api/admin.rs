use crate::api::models::{Ack, ChartData, LogEntry, Policy, SystemStats, User};
use crate::error::Result;
use crate::transport::TransportClient;
use serde::Serialize;

/// Administration surface. Pure adapter; no client-side state machine sits
/// on top of these.
pub struct AdminApi {
    transport: TransportClient,
}

#[derive(Serialize)]
pub struct UserUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Serialize)]
pub struct PolicyUpsert<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub enabled: bool,
}

impl AdminApi {
    pub fn new(transport: TransportClient) -> Self {
        Self { transport }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.transport.get_json("admin/users", &[]).await
    }

    pub async fn update_user(&self, user_id: &str, update: &UserUpdate<'_>) -> Result<User> {
        self.transport
            .patch_json(&format!("admin/users/{}", user_id), update)
            .await
    }

    pub async fn list_policies(&self) -> Result<Vec<Policy>> {
        self.transport.get_json("admin/policies", &[]).await
    }

    pub async fn create_policy(&self, policy: &PolicyUpsert<'_>) -> Result<Policy> {
        self.transport.post_json("admin/policies", policy).await
    }

    pub async fn update_policy(
        &self,
        policy_id: &str,
        policy: &PolicyUpsert<'_>,
    ) -> Result<Policy> {
        self.transport
            .put_json(&format!("admin/policies/{}", policy_id), policy)
            .await
    }

    pub async fn delete_policy(&self, policy_id: &str) -> Result<()> {
        let _: Ack = self
            .transport
            .delete_json(&format!("admin/policies/{}", policy_id))
            .await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<SystemStats> {
        self.transport.get_json("admin/stats", &[]).await
    }

    pub async fn logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.transport
            .get_json("admin/logs", &[("limit", limit.to_string())])
            .await
    }

    pub async fn usage_chart(&self, metric: &str) -> Result<ChartData> {
        self.transport
            .get_json("admin/stats/chart", &[("metric", metric.to_string())])
            .await
    }
}

use crate::api::models::{Ack, HistoryItem, ShareLink, TagsResponse};
use crate::error::Result;
use crate::history::{HistoryBackend, HistoryFilter};
use crate::transport::TransportClient;
use async_trait::async_trait;
use serde::Serialize;

pub struct HistoryApi {
    transport: TransportClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteRequest<'a> {
    history_id: &'a str,
    favorite: bool,
}

#[derive(Serialize)]
struct TagsRequest<'a> {
    tags: &'a [String],
}

#[derive(Serialize)]
struct NotesRequest<'a> {
    notes: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateShareRequest<'a> {
    history_id: &'a str,
    expires_in_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_users: Option<&'a [String]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateShareRequest<'a> {
    expires_in_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_users: Option<&'a [String]>,
}

impl HistoryApi {
    pub fn new(transport: TransportClient) -> Self {
        Self { transport }
    }

    fn filter_params(filter: &HistoryFilter) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = filter.start_date {
            params.push(("start_date", start.to_rfc3339()));
        }
        if let Some(end) = filter.end_date {
            params.push(("end_date", end.to_rfc3339()));
        }
        if filter.favorite_only {
            params.push(("favorite_only", "true".to_string()));
        }
        for tag in &filter.tags {
            params.push(("tags", tag.clone()));
        }
        if !filter.search.is_empty() {
            params.push(("search", filter.search.clone()));
        }
        params
    }
}

#[async_trait]
impl HistoryBackend for HistoryApi {
    async fn list(&self, filter: &HistoryFilter) -> Result<Vec<HistoryItem>> {
        self.transport
            .get_json("query-history", &Self::filter_params(filter))
            .await
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        let response: TagsResponse = self.transport.get_json("query-history/tags", &[]).await?;
        Ok(response.tags)
    }

    async fn set_favorite(&self, history_id: &str, favorite: bool) -> Result<HistoryItem> {
        self.transport
            .post_json(
                "query-history/favorite",
                &FavoriteRequest {
                    history_id,
                    favorite,
                },
            )
            .await
    }

    async fn delete_item(&self, history_id: &str) -> Result<()> {
        let _: Ack = self
            .transport
            .delete_json(&format!("query-history/{}", history_id))
            .await?;
        Ok(())
    }

    async fn replace_tags(&self, history_id: &str, tags: &[String]) -> Result<HistoryItem> {
        self.transport
            .put_json(
                &format!("query-history/{}/tags", history_id),
                &TagsRequest { tags },
            )
            .await
    }

    async fn set_notes(&self, history_id: &str, notes: &str) -> Result<HistoryItem> {
        self.transport
            .put_json(
                &format!("query-history/{}/notes", history_id),
                &NotesRequest { notes },
            )
            .await
    }

    async fn create_share_link(
        &self,
        history_id: &str,
        expires_in_days: u32,
        allowed_users: Option<&[String]>,
    ) -> Result<ShareLink> {
        self.transport
            .post_json(
                "query-history/share",
                &CreateShareRequest {
                    history_id,
                    expires_in_days,
                    allowed_users,
                },
            )
            .await
    }

    async fn update_share_link(
        &self,
        share_id: &str,
        expires_in_days: u32,
        allowed_users: Option<&[String]>,
    ) -> Result<ShareLink> {
        self.transport
            .put_json(
                &format!("query-history/share/{}", share_id),
                &UpdateShareRequest {
                    expires_in_days,
                    allowed_users,
                },
            )
            .await
    }

    async fn delete_share_link(&self, share_id: &str) -> Result<()> {
        let _: Ack = self
            .transport
            .delete_json(&format!("query-history/share/{}", share_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filter_params_serialization() {
        let filter = HistoryFilter {
            start_date: Some(chrono::Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            end_date: None,
            favorite_only: true,
            tags: vec!["sales".to_string(), "monthly".to_string()],
            search: "users".to_string(),
        };

        let params = HistoryApi::filter_params(&filter);
        assert!(params.iter().any(|(k, _)| *k == "start_date"));
        assert!(!params.iter().any(|(k, _)| *k == "end_date"));
        assert_eq!(
            params.iter().filter(|(k, _)| *k == "tags").count(),
            2,
            "each selected tag is sent as its own parameter"
        );
        assert!(params.contains(&("favorite_only", "true".to_string())));
        assert!(params.contains(&("search", "users".to_string())));
    }

    #[test]
    fn test_empty_filter_sends_no_params() {
        assert!(HistoryApi::filter_params(&HistoryFilter::default()).is_empty());
    }
}

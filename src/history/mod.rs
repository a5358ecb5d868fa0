//! History & sharing synchronization.
//!
//! Keeps a local projection of the server-side query history consistent
//! under user mutations. Favorite, delete, tag, and notes edits are applied
//! optimistically and rolled back to the exact prior value if the backend
//! rejects them; share-link operations are request-then-reconcile because
//! the link's authoritative content (the URL) is server-determined.

pub mod optimistic;

use crate::api::models::{HistoryItem, ShareLink};
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use optimistic::{ItemSnapshot, capture, restore};

/// Filter applied to history retrieval. Replacing it re-triggers a fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    /// Inclusive start of the date range
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive end of the date range
    pub end_date: Option<DateTime<Utc>>,
    pub favorite_only: bool,
    /// Selected tag subset; every tag must match (assumed AND contract,
    /// enforced backend-side)
    pub tags: Vec<String>,
    pub search: String,
}

/// Backend capability consumed by the synchronizer
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    async fn list(&self, filter: &HistoryFilter) -> Result<Vec<HistoryItem>>;
    async fn list_tags(&self) -> Result<Vec<String>>;
    async fn set_favorite(&self, history_id: &str, favorite: bool) -> Result<HistoryItem>;
    async fn delete_item(&self, history_id: &str) -> Result<()>;
    async fn replace_tags(&self, history_id: &str, tags: &[String]) -> Result<HistoryItem>;
    async fn set_notes(&self, history_id: &str, notes: &str) -> Result<HistoryItem>;
    async fn create_share_link(
        &self,
        history_id: &str,
        expires_in_days: u32,
        allowed_users: Option<&[String]>,
    ) -> Result<ShareLink>;
    async fn update_share_link(
        &self,
        share_id: &str,
        expires_in_days: u32,
        allowed_users: Option<&[String]>,
    ) -> Result<ShareLink>;
    async fn delete_share_link(&self, share_id: &str) -> Result<()>;
}

struct SyncInner {
    items: Vec<HistoryItem>,
    filter: HistoryFilter,
    /// Item opened in the detail view; tag and notes edits apply to it
    selected: Option<String>,
}

/// Local cache of past queries plus the active filter, kept consistent with
/// the backend through explicit mutations only.
pub struct HistorySync {
    backend: Arc<dyn HistoryBackend>,
    inner: Mutex<SyncInner>,
}

impl HistorySync {
    pub fn new(backend: Arc<dyn HistoryBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(SyncInner {
                items: Vec::new(),
                filter: HistoryFilter::default(),
                selected: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SyncInner> {
        self.inner.lock().expect("history lock poisoned")
    }

    /// Server-provided order, typically recency
    pub fn items(&self) -> Vec<HistoryItem> {
        self.lock().items.clone()
    }

    pub fn filter(&self) -> HistoryFilter {
        self.lock().filter.clone()
    }

    pub fn selected_item(&self) -> Option<HistoryItem> {
        let inner = self.lock();
        let id = inner.selected.as_deref()?;
        inner.items.iter().find(|item| item.id == id).cloned()
    }

    /// Opens a cached item in the detail view
    pub fn select_item(&self, history_id: &str) -> Result<()> {
        let mut inner = self.lock();
        if !inner.items.iter().any(|item| item.id == history_id) {
            return Err(ApiError::sync(format!(
                "history item {} is not in the cache",
                history_id
            )));
        }
        inner.selected = Some(history_id.to_string());
        Ok(())
    }

    pub fn clear_selection(&self) {
        self.lock().selected = None;
    }

    /// Re-fetches the list for the current filter, replacing the cache
    pub async fn refresh(&self) -> Result<()> {
        let filter = self.filter();
        let items = self
            .backend
            .list(&filter)
            .await
            .map_err(|e| ApiError::sync(e.to_string()))?;
        info!("History refreshed: {} items", items.len());
        self.lock().items = items;
        Ok(())
    }

    /// Replaces the filter value object and re-fetches
    pub async fn set_filters(&self, filter: HistoryFilter) -> Result<()> {
        self.lock().filter = filter;
        self.refresh().await
    }

    /// Returns the filter to its defaults (no favorite-only, no tags, no
    /// date range, empty search) and re-fetches
    pub async fn reset_filters(&self) -> Result<()> {
        self.set_filters(HistoryFilter::default()).await
    }

    pub async fn available_tags(&self) -> Result<Vec<String>> {
        self.backend
            .list_tags()
            .await
            .map_err(|e| ApiError::sync(e.to_string()))
    }

    /// Optimistically flips the favorite flag; on rejection the exact prior
    /// value is restored (not merely negated again).
    pub async fn toggle_favorite(&self, history_id: &str, favorite: bool) -> Result<()> {
        let snapshot = {
            let mut inner = self.lock();
            let snapshot = capture(&inner.items, |item| item.id == history_id)
                .ok_or_else(|| ApiError::sync(format!("unknown history item {}", history_id)))?;
            if let Some(item) = inner.items.iter_mut().find(|item| item.id == history_id) {
                item.favorite = favorite;
            }
            snapshot
        };

        match self.backend.set_favorite(history_id, favorite).await {
            Ok(updated) => {
                self.reconcile_item(updated);
                Ok(())
            }
            Err(e) => {
                debug!("Favorite toggle for {} rejected, rolling back", history_id);
                self.rollback(snapshot, history_id);
                Err(ApiError::sync(e.to_string()))
            }
        }
    }

    /// Optimistically removes the item; on rejection it is re-inserted at
    /// its original position.
    pub async fn delete_item(&self, history_id: &str) -> Result<()> {
        let snapshot = {
            let mut inner = self.lock();
            let snapshot = capture(&inner.items, |item| item.id == history_id)
                .ok_or_else(|| ApiError::sync(format!("unknown history item {}", history_id)))?;
            inner.items.retain(|item| item.id != history_id);
            snapshot
        };

        match self.backend.delete_item(history_id).await {
            Ok(()) => {
                let mut inner = self.lock();
                if inner.selected.as_deref() == Some(history_id) {
                    inner.selected = None;
                }
                Ok(())
            }
            Err(e) => {
                debug!("Delete of {} rejected, re-inserting", history_id);
                self.rollback(snapshot, history_id);
                Err(ApiError::sync(e.to_string()))
            }
        }
    }

    /// Replaces the selected item's full tag set. Partial add/remove is not
    /// supported at this layer; callers submit the resulting set.
    pub async fn replace_tags(&self, tags: Vec<String>) -> Result<()> {
        let history_id = self.selected_id()?;
        let snapshot = {
            let mut inner = self.lock();
            let snapshot = capture(&inner.items, |item| item.id == history_id)
                .ok_or_else(|| ApiError::sync(format!("unknown history item {}", history_id)))?;
            if let Some(item) = inner.items.iter_mut().find(|item| item.id == history_id) {
                item.tags = tags.clone();
            }
            snapshot
        };

        match self.backend.replace_tags(&history_id, &tags).await {
            Ok(updated) => {
                self.reconcile_item(updated);
                Ok(())
            }
            Err(e) => {
                debug!("Tag replacement for {} rejected, rolling back", history_id);
                self.rollback(snapshot, &history_id);
                Err(ApiError::sync(e.to_string()))
            }
        }
    }

    /// Replaces the selected item's free-text notes
    pub async fn set_notes(&self, notes: &str) -> Result<()> {
        let history_id = self.selected_id()?;
        let snapshot = {
            let mut inner = self.lock();
            let snapshot = capture(&inner.items, |item| item.id == history_id)
                .ok_or_else(|| ApiError::sync(format!("unknown history item {}", history_id)))?;
            if let Some(item) = inner.items.iter_mut().find(|item| item.id == history_id) {
                item.notes = Some(notes.to_string());
            }
            snapshot
        };

        match self.backend.set_notes(&history_id, notes).await {
            Ok(updated) => {
                self.reconcile_item(updated);
                Ok(())
            }
            Err(e) => {
                self.rollback(snapshot, &history_id);
                Err(ApiError::sync(e.to_string()))
            }
        }
    }

    /// Creates a share link for `history_id`. The cache is updated only
    /// after the backend confirms, since the URL is server-issued.
    pub async fn create_share_link(
        &self,
        history_id: &str,
        expires_in_days: u32,
        allowed_users: Option<&[String]>,
    ) -> Result<ShareLink> {
        let link = self
            .backend
            .create_share_link(history_id, expires_in_days, allowed_users)
            .await
            .map_err(|e| ApiError::sync(e.to_string()))?;

        let mut inner = self.lock();
        if let Some(item) = inner.items.iter_mut().find(|item| item.id == history_id) {
            item.share_link = Some(link.clone());
        }
        Ok(link)
    }

    pub async fn update_share_link(
        &self,
        share_id: &str,
        expires_in_days: u32,
        allowed_users: Option<&[String]>,
    ) -> Result<ShareLink> {
        let link = self
            .backend
            .update_share_link(share_id, expires_in_days, allowed_users)
            .await
            .map_err(|e| ApiError::sync(e.to_string()))?;

        let mut inner = self.lock();
        if let Some(item) = inner.items.iter_mut().find(|item| {
            item.share_link
                .as_ref()
                .is_some_and(|existing| existing.id == share_id)
        }) {
            item.share_link = Some(link.clone());
        }
        Ok(link)
    }

    /// Deletes the share link and clears the owning item's reference
    pub async fn delete_share_link(&self, share_id: &str) -> Result<()> {
        self.backend
            .delete_share_link(share_id)
            .await
            .map_err(|e| ApiError::sync(e.to_string()))?;

        let mut inner = self.lock();
        if let Some(item) = inner.items.iter_mut().find(|item| {
            item.share_link
                .as_ref()
                .is_some_and(|existing| existing.id == share_id)
        }) {
            item.share_link = None;
        }
        Ok(())
    }

    fn selected_id(&self) -> Result<String> {
        self.lock()
            .selected
            .clone()
            .ok_or_else(|| ApiError::invalid_state("no history item selected".to_string()))
    }

    fn reconcile_item(&self, updated: HistoryItem) {
        let mut inner = self.lock();
        if let Some(item) = inner.items.iter_mut().find(|item| item.id == updated.id) {
            *item = updated;
        }
    }

    fn rollback(&self, snapshot: ItemSnapshot<HistoryItem>, history_id: &str) {
        let mut inner = self.lock();
        restore(&mut inner.items, snapshot, |item| item.id == history_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn item(id: &str, favorite: bool) -> HistoryItem {
        HistoryItem {
            id: id.to_string(),
            query_id: format!("q-{}", id),
            created_at: Utc::now(),
            question: Some("question".to_string()),
            sql: Some("SELECT 1".to_string()),
            favorite,
            tags: vec![],
            notes: None,
            share_link: None,
        }
    }

    fn share_link(id: &str, url: &str) -> ShareLink {
        ShareLink {
            id: id.to_string(),
            url: url.to_string(),
            expires_at: None,
            allowed_users: vec![],
        }
    }

    #[derive(Default)]
    struct ScriptedHistoryBackend {
        lists: Mutex<VecDeque<Result<Vec<HistoryItem>>>>,
        favorites: Mutex<VecDeque<Result<HistoryItem>>>,
        deletes: Mutex<VecDeque<Result<()>>>,
        tag_updates: Mutex<VecDeque<Result<HistoryItem>>>,
        note_updates: Mutex<VecDeque<Result<HistoryItem>>>,
        share_creates: Mutex<VecDeque<Result<ShareLink>>>,
        share_updates: Mutex<VecDeque<Result<ShareLink>>>,
        share_deletes: Mutex<VecDeque<Result<()>>>,
        seen_filters: Mutex<Vec<HistoryFilter>>,
    }

    #[async_trait]
    impl HistoryBackend for ScriptedHistoryBackend {
        async fn list(&self, filter: &HistoryFilter) -> Result<Vec<HistoryItem>> {
            self.seen_filters.lock().unwrap().push(filter.clone());
            self.lists
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(vec![]))
        }

        async fn list_tags(&self) -> Result<Vec<String>> {
            Ok(vec!["sales".to_string(), "monthly".to_string()])
        }

        async fn set_favorite(&self, _id: &str, _favorite: bool) -> Result<HistoryItem> {
            self.favorites
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted set_favorite")
        }

        async fn delete_item(&self, _id: &str) -> Result<()> {
            self.deletes
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted delete_item")
        }

        async fn replace_tags(&self, _id: &str, _tags: &[String]) -> Result<HistoryItem> {
            self.tag_updates
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted replace_tags")
        }

        async fn set_notes(&self, _id: &str, _notes: &str) -> Result<HistoryItem> {
            self.note_updates
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted set_notes")
        }

        async fn create_share_link(
            &self,
            _history_id: &str,
            _expires_in_days: u32,
            _allowed_users: Option<&[String]>,
        ) -> Result<ShareLink> {
            self.share_creates
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted create_share_link")
        }

        async fn update_share_link(
            &self,
            _share_id: &str,
            _expires_in_days: u32,
            _allowed_users: Option<&[String]>,
        ) -> Result<ShareLink> {
            self.share_updates
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted update_share_link")
        }

        async fn delete_share_link(&self, _share_id: &str) -> Result<()> {
            self.share_deletes
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted delete_share_link")
        }
    }

    async fn seeded_sync(items: Vec<HistoryItem>) -> (Arc<ScriptedHistoryBackend>, HistorySync) {
        let backend = Arc::new(ScriptedHistoryBackend::default());
        backend.lists.lock().unwrap().push_back(Ok(items));
        let sync = HistorySync::new(Arc::clone(&backend) as Arc<dyn HistoryBackend>);
        sync.refresh().await.unwrap();
        (backend, sync)
    }

    #[tokio::test]
    async fn test_favorite_rollback_restores_exact_prior_value() {
        let (backend, sync) = seeded_sync(vec![item("123", true)]).await;
        backend.favorites.lock().unwrap().push_back(Err(ApiError::Http {
            status: 500,
            message: "rejected".to_string(),
        }));

        // Prior value is true; a naive re-negate after the failed
        // toggle-to-true would land on false
        let err = sync.toggle_favorite("123", true).await.unwrap_err();
        assert!(matches!(err, ApiError::Sync(_)));
        assert!(sync.items()[0].favorite);
    }

    #[tokio::test]
    async fn test_favorite_applies_optimistically_and_reconciles() {
        let (backend, sync) = seeded_sync(vec![item("123", false)]).await;
        let mut confirmed = item("123", true);
        confirmed.tags = vec!["from-server".to_string()];
        backend.favorites.lock().unwrap().push_back(Ok(confirmed));

        sync.toggle_favorite("123", true).await.unwrap();
        let cached = &sync.items()[0];
        assert!(cached.favorite);
        // Server-confirmed item replaces the optimistic one wholesale
        assert_eq!(cached.tags, vec!["from-server".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_rollback_reinserts_at_original_position() {
        let (backend, sync) =
            seeded_sync(vec![item("a", false), item("b", false), item("c", false)]).await;
        backend.deletes.lock().unwrap().push_back(Err(ApiError::Http {
            status: 500,
            message: "nope".to_string(),
        }));

        assert!(sync.delete_item("b").await.is_err());
        let ids: Vec<String> = sync.items().iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_delete_success_removes_and_clears_selection() {
        let (backend, sync) = seeded_sync(vec![item("a", false), item("b", false)]).await;
        backend.deletes.lock().unwrap().push_back(Ok(()));

        sync.select_item("b").unwrap();
        sync.delete_item("b").await.unwrap();

        assert_eq!(sync.items().len(), 1);
        assert!(sync.selected_item().is_none());
    }

    #[tokio::test]
    async fn test_filter_roundtrip_returns_to_default() {
        let (_backend, sync) = seeded_sync(vec![]).await;
        let filter = HistoryFilter {
            favorite_only: true,
            tags: vec!["sales".to_string()],
            search: "user".to_string(),
            ..Default::default()
        };
        sync.set_filters(filter.clone()).await.unwrap();
        assert_eq!(sync.filter(), filter);

        sync.reset_filters().await.unwrap();
        assert_eq!(sync.filter(), HistoryFilter::default());
    }

    #[tokio::test]
    async fn test_set_filters_triggers_retrieval_with_that_filter() {
        let (backend, sync) = seeded_sync(vec![]).await;
        let filter = HistoryFilter {
            favorite_only: true,
            ..Default::default()
        };
        sync.set_filters(filter.clone()).await.unwrap();

        let seen = backend.seen_filters.lock().unwrap();
        assert_eq!(seen.last().unwrap(), &filter);
    }

    #[tokio::test]
    async fn test_create_share_link_attaches_to_item() {
        let (backend, sync) = seeded_sync(vec![item("123", false)]).await;
        backend
            .share_creates
            .lock()
            .unwrap()
            .push_back(Ok(share_link("789", "https://example.com/share/789")));

        let link = sync.create_share_link("123", 7, None).await.unwrap();
        assert_eq!(link.id, "789");

        let cached = sync.items()[0].share_link.clone().unwrap();
        assert_eq!(cached.id, "789");
        assert_eq!(cached.url, "https://example.com/share/789");
    }

    #[tokio::test]
    async fn test_create_share_link_failure_leaves_cache_untouched() {
        let (backend, sync) = seeded_sync(vec![item("123", false)]).await;
        backend.share_creates.lock().unwrap().push_back(Err(ApiError::Http {
            status: 500,
            message: "cannot share".to_string(),
        }));

        assert!(sync.create_share_link("123", 7, None).await.is_err());
        assert!(sync.items()[0].share_link.is_none());
    }

    #[tokio::test]
    async fn test_delete_share_link_clears_reference() {
        let mut shared = item("123", false);
        shared.share_link = Some(share_link("789", "https://example.com/share/789"));
        let (backend, sync) = seeded_sync(vec![shared]).await;
        backend.share_deletes.lock().unwrap().push_back(Ok(()));

        sync.delete_share_link("789").await.unwrap();
        assert!(sync.items()[0].share_link.is_none());
    }

    #[tokio::test]
    async fn test_replace_tags_requires_selection() {
        let (_backend, sync) = seeded_sync(vec![item("123", false)]).await;
        let err = sync.replace_tags(vec!["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_set_notes_rolls_back_to_exact_prior_value() {
        let mut noted = item("123", false);
        noted.notes = Some("original note".to_string());
        let (backend, sync) = seeded_sync(vec![noted]).await;
        backend.note_updates.lock().unwrap().push_back(Err(ApiError::Http {
            status: 500,
            message: "notes service down".to_string(),
        }));

        sync.select_item("123").unwrap();
        let err = sync.set_notes("replacement note").await.unwrap_err();
        assert!(matches!(err, ApiError::Sync(_)));
        assert_eq!(sync.items()[0].notes.as_deref(), Some("original note"));
    }

    #[tokio::test]
    async fn test_set_notes_reconciles_with_server_item() {
        let (backend, sync) = seeded_sync(vec![item("123", false)]).await;
        let mut confirmed = item("123", false);
        confirmed.notes = Some("checked monthly".to_string());
        backend.note_updates.lock().unwrap().push_back(Ok(confirmed));

        sync.select_item("123").unwrap();
        sync.set_notes("checked monthly").await.unwrap();
        assert_eq!(sync.items()[0].notes.as_deref(), Some("checked monthly"));
    }

    #[tokio::test]
    async fn test_update_share_link_replaces_matching_link() {
        let mut shared = item("123", false);
        shared.share_link = Some(share_link("789", "https://example.com/share/789"));
        let (backend, sync) = seeded_sync(vec![shared, item("456", false)]).await;
        backend
            .share_updates
            .lock()
            .unwrap()
            .push_back(Ok(share_link("789", "https://example.com/share/789-v2")));

        let link = sync.update_share_link("789", 30, None).await.unwrap();
        assert_eq!(link.url, "https://example.com/share/789-v2");

        // The item holding share id 789 carries the refreshed link; the
        // unrelated item stays linkless
        let items = sync.items();
        let cached = items[0].share_link.clone().unwrap();
        assert_eq!(cached.id, "789");
        assert_eq!(cached.url, "https://example.com/share/789-v2");
        assert!(items[1].share_link.is_none());
    }

    #[tokio::test]
    async fn test_update_share_link_failure_leaves_cache_untouched() {
        let mut shared = item("123", false);
        shared.share_link = Some(share_link("789", "https://example.com/share/789"));
        let (backend, sync) = seeded_sync(vec![shared]).await;
        backend.share_updates.lock().unwrap().push_back(Err(ApiError::Http {
            status: 500,
            message: "cannot update".to_string(),
        }));

        assert!(sync.update_share_link("789", 30, None).await.is_err());
        let cached = sync.items()[0].share_link.clone().unwrap();
        assert_eq!(cached.url, "https://example.com/share/789");
    }

    #[tokio::test]
    async fn test_replace_tags_rolls_back_on_failure() {
        let mut tagged = item("123", false);
        tagged.tags = vec!["original".to_string()];
        let (backend, sync) = seeded_sync(vec![tagged]).await;
        backend.tag_updates.lock().unwrap().push_back(Err(ApiError::Http {
            status: 500,
            message: "tag service down".to_string(),
        }));

        sync.select_item("123").unwrap();
        let err = sync
            .replace_tags(vec!["new-a".to_string(), "new-b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Sync(_)));
        assert_eq!(sync.items()[0].tags, vec!["original".to_string()]);
    }
}

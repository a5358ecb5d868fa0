//! Paginated view over a server-held result set.
//!
//! The canonical rows live server-side under an opaque result id; every page
//! is fetched independently, never sliced out of a previously fetched page.
//! Rapid page navigation can put several fetches in flight at once, so each
//! request carries a monotonic sequence number and only the response for the
//! most recently issued request is applied.

use crate::api::models::{ColumnDescriptor, ExecutionResponse};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Backend capability for paged result retrieval
#[async_trait]
pub trait ResultBackend: Send + Sync {
    async fn fetch_page(
        &self,
        result_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<ExecutionResponse>;
}

/// The page currently held by the projection
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub result_id: String,
    pub page: u32,
    pub page_size: usize,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
    pub total_row_count: Option<u64>,
    pub truncated: bool,
}

struct ProjectionInner {
    seq: u64,
    current: Option<LoadedPage>,
}

pub struct ResultProjection {
    backend: Arc<dyn ResultBackend>,
    inner: Mutex<ProjectionInner>,
}

impl ResultProjection {
    pub fn new(backend: Arc<dyn ResultBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(ProjectionInner {
                seq: 0,
                current: None,
            }),
        }
    }

    pub fn current_page(&self) -> Option<LoadedPage> {
        self.inner
            .lock()
            .expect("projection lock poisoned")
            .current
            .clone()
    }

    /// Fetches one page and applies it if no newer request was issued in the
    /// meantime. Returns `Ok(true)` when the page was applied, `Ok(false)`
    /// when the response arrived stale and was discarded.
    pub async fn load_page(
        &self,
        result_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<bool> {
        let seq = {
            let mut inner = self.inner.lock().expect("projection lock poisoned");
            inner.seq += 1;
            inner.seq
        };

        let outcome = self.backend.fetch_page(result_id, page, page_size).await;

        let mut inner = self.inner.lock().expect("projection lock poisoned");
        if inner.seq != seq {
            debug!("Discarding stale response for page {} (seq {})", page, seq);
            return Ok(false);
        }

        let response = outcome?;
        inner.current = Some(LoadedPage {
            result_id: result_id.to_string(),
            page,
            page_size,
            columns: response.columns,
            rows: response.rows,
            row_count: response.row_count,
            total_row_count: response.total_row_count,
            truncated: response.truncated,
        });
        Ok(true)
    }

    /// Drops the held page, e.g. when the owning result set is superseded
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("projection lock poisoned");
        inner.seq += 1;
        inner.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn page_response(marker: i64) -> ExecutionResponse {
        ExecutionResponse {
            columns: vec![ColumnDescriptor {
                name: "id".to_string(),
                data_type: "INTEGER".to_string(),
            }],
            rows: vec![vec![serde_json::json!(marker)]],
            row_count: 1,
            execution_time: 0.0,
            truncated: false,
            result_id: Some("res-1".to_string()),
            total_row_count: Some(300),
        }
    }

    /// Each page's response is parked behind a channel keyed by page number,
    /// letting tests resolve them out of order.
    struct GatedResultBackend {
        gates: Mutex<HashMap<u32, oneshot::Receiver<Result<ExecutionResponse>>>>,
    }

    #[async_trait]
    impl ResultBackend for GatedResultBackend {
        async fn fetch_page(
            &self,
            _result_id: &str,
            page: u32,
            _page_size: usize,
        ) -> Result<ExecutionResponse> {
            let rx = self
                .gates
                .lock()
                .unwrap()
                .remove(&page)
                .expect("page gate not armed");
            rx.await.expect("gate sender dropped")
        }
    }

    struct ImmediateBackend;

    #[async_trait]
    impl ResultBackend for ImmediateBackend {
        async fn fetch_page(
            &self,
            _result_id: &str,
            page: u32,
            _page_size: usize,
        ) -> Result<ExecutionResponse> {
            Ok(page_response(page as i64))
        }
    }

    #[tokio::test]
    async fn test_load_page_applies_response() {
        let projection = ResultProjection::new(Arc::new(ImmediateBackend));
        let applied = projection.load_page("res-1", 2, 50).await.unwrap();
        assert!(applied);

        let page = projection.current_page().unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.total_row_count, Some(300));
        assert_eq!(page.rows[0][0], serde_json::json!(2));
    }

    #[tokio::test]
    async fn test_out_of_order_response_is_discarded() {
        let (tx2, rx2) = oneshot::channel();
        let (tx3, rx3) = oneshot::channel();
        let backend = Arc::new(GatedResultBackend {
            gates: Mutex::new(HashMap::from([(2, rx2), (3, rx3)])),
        });

        let projection = Arc::new(ResultProjection::new(backend));

        let load2 = {
            let projection = Arc::clone(&projection);
            tokio::spawn(async move { projection.load_page("res-1", 2, 50).await })
        };
        // Make sure page 2's request is issued before page 3's
        tokio::task::yield_now().await;
        let load3 = {
            let projection = Arc::clone(&projection);
            tokio::spawn(async move { projection.load_page("res-1", 3, 50).await })
        };
        tokio::task::yield_now().await;

        // Page 3 resolves first, then page 2 arrives late
        tx3.send(Ok(page_response(3))).unwrap();
        assert!(load3.await.unwrap().unwrap());

        tx2.send(Ok(page_response(2))).unwrap();
        let applied = load2.await.unwrap().unwrap();
        assert!(!applied);

        // The projection shows page 3's data, not page 2's
        let page = projection.current_page().unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.rows[0][0], serde_json::json!(3));
    }

    #[tokio::test]
    async fn test_stale_error_is_swallowed() {
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let backend = Arc::new(GatedResultBackend {
            gates: Mutex::new(HashMap::from([(1, rx1), (2, rx2)])),
        });

        let projection = Arc::new(ResultProjection::new(backend));
        let load1 = {
            let projection = Arc::clone(&projection);
            tokio::spawn(async move { projection.load_page("res-1", 1, 50).await })
        };
        tokio::task::yield_now().await;
        let load2 = {
            let projection = Arc::clone(&projection);
            tokio::spawn(async move { projection.load_page("res-1", 2, 50).await })
        };
        tokio::task::yield_now().await;

        tx2.send(Ok(page_response(2))).unwrap();
        assert!(load2.await.unwrap().unwrap());

        // A failure for the superseded request must not surface or clobber
        tx1.send(Err(crate::error::ApiError::network("timeout"))).unwrap();
        assert!(!load1.await.unwrap().unwrap());
        assert_eq!(projection.current_page().unwrap().page, 2);
    }

    #[tokio::test]
    async fn test_clear_invalidates_in_flight_request() {
        let (tx, rx) = oneshot::channel();
        let backend = Arc::new(GatedResultBackend {
            gates: Mutex::new(HashMap::from([(1, rx)])),
        });

        let projection = Arc::new(ResultProjection::new(backend));
        let load = {
            let projection = Arc::clone(&projection);
            tokio::spawn(async move { projection.load_page("res-1", 1, 50).await })
        };
        tokio::task::yield_now().await;

        projection.clear();
        tx.send(Ok(page_response(1))).unwrap();
        assert!(!load.await.unwrap().unwrap());
        assert!(projection.current_page().is_none());
    }
}

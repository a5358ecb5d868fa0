use crate::api::models::{Ack, ExecutionResponse, GeneratedQuery, QueryStatusResponse};
use crate::error::Result;
use crate::lifecycle::QueryBackend;
use crate::transport::TransportClient;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

pub struct QueryApi {
    transport: TransportClient,
}

#[derive(Serialize)]
struct NaturalQueryRequest<'a> {
    db_id: &'a str,
    query: &'a str,
    use_rag: bool,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    db_id: &'a str,
    sql: &'a str,
}

impl QueryApi {
    pub fn new(transport: TransportClient) -> Self {
        Self { transport }
    }

    pub async fn generate(
        &self,
        db_id: &str,
        question: &str,
        use_rag: bool,
    ) -> Result<GeneratedQuery> {
        self.transport
            .post_json(
                "query/natural",
                &NaturalQueryRequest {
                    db_id,
                    query: question,
                    use_rag,
                },
            )
            .await
    }

    pub async fn execute(&self, db_id: &str, sql: &str) -> Result<ExecutionResponse> {
        self.transport
            .post_json("query/execute", &ExecuteRequest { db_id, sql })
            .await
    }

    pub async fn status(&self, query_id: &str) -> Result<QueryStatusResponse> {
        self.transport
            .get_json(&format!("query/status/{}", query_id), &[])
            .await
    }

    pub async fn cancel(&self, query_id: &str) -> Result<()> {
        let ack: Ack = self
            .transport
            .post_empty(&format!("query/cancel/{}", query_id))
            .await?;
        debug!("Cancel of {} acknowledged: {}", query_id, ack.success);
        Ok(())
    }
}

#[async_trait]
impl QueryBackend for QueryApi {
    async fn generate_sql(
        &self,
        db_id: &str,
        question: &str,
        use_rag: bool,
    ) -> Result<GeneratedQuery> {
        self.generate(db_id, question, use_rag).await
    }

    async fn execute_sql(&self, db_id: &str, sql: &str) -> Result<ExecutionResponse> {
        self.execute(db_id, sql).await
    }

    async fn cancel_query(&self, query_id: &str) -> Result<()> {
        self.cancel(query_id).await
    }
}

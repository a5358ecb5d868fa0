use crate::api::models::{ExecutionResponse, Report};
use crate::error::Result;
use crate::lifecycle::projection::ResultBackend;
use crate::report::ReportBackend;
use crate::transport::TransportClient;
use async_trait::async_trait;
use serde::Serialize;

pub struct ResultApi {
    transport: TransportClient,
}

#[derive(Serialize)]
struct ReportRequest<'a> {
    result_id: &'a str,
    visualization_types: &'a [String],
    include_insights: bool,
}

impl ResultApi {
    pub fn new(transport: TransportClient) -> Self {
        Self { transport }
    }

    pub async fn page(
        &self,
        result_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<ExecutionResponse> {
        self.transport
            .get_json(
                &format!("result/{}", result_id),
                &[
                    ("page", page.to_string()),
                    ("page_size", page_size.to_string()),
                ],
            )
            .await
    }

    pub async fn generate_report(
        &self,
        result_id: &str,
        visualization_types: &[String],
        include_insights: bool,
    ) -> Result<Report> {
        self.transport
            .post_json(
                "result/report",
                &ReportRequest {
                    result_id,
                    visualization_types,
                    include_insights,
                },
            )
            .await
    }

    pub async fn report(&self, report_id: &str) -> Result<Report> {
        self.transport
            .get_json(&format!("result/report/{}", report_id), &[])
            .await
    }
}

#[async_trait]
impl ResultBackend for ResultApi {
    async fn fetch_page(
        &self,
        result_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<ExecutionResponse> {
        self.page(result_id, page, page_size).await
    }
}

#[async_trait]
impl ReportBackend for ResultApi {
    async fn generate_report(
        &self,
        result_id: &str,
        visualization_types: &[String],
        include_insights: bool,
    ) -> Result<Report> {
        ResultApi::generate_report(self, result_id, visualization_types, include_insights).await
    }

    async fn fetch_report(&self, report_id: &str) -> Result<Report> {
        self.report(report_id).await
    }
}

use crate::api::models::{Database, Table};
use crate::error::Result;
use crate::transport::TransportClient;
use serde::Serialize;

pub struct DbApi {
    transport: TransportClient,
}

#[derive(Serialize)]
struct ConnectRequest<'a> {
    db_id: &'a str,
}

impl DbApi {
    pub fn new(transport: TransportClient) -> Self {
        Self { transport }
    }

    pub async fn list(&self) -> Result<Vec<Database>> {
        self.transport.get_json("db/list", &[]).await
    }

    pub async fn connect(&self, db_id: &str) -> Result<Database> {
        self.transport
            .post_json("db/connect", &ConnectRequest { db_id })
            .await
    }

    pub async fn schema(&self, db_id: &str) -> Result<Vec<Table>> {
        self.transport
            .get_json("db/schema", &[("db_id", db_id.to_string())])
            .await
    }
}

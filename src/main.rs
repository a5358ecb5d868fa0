use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use nl_console::api::auth::AuthApi;
use nl_console::api::db::DbApi;
use nl_console::api::history::HistoryApi;
use nl_console::api::query::QueryApi;
use nl_console::api::result::ResultApi;
use nl_console::config::{CliArgs, ClientConfig};
use nl_console::util::logging::init_tracing;
use nl_console::{
    AuthContext, HistorySync, QueryLifecycle, ReportFlow, ResultProjection, TransportClient,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match ClientConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Connecting to backend at {}", config.server.base_url);
    let auth = Arc::new(AuthContext::new(config.server.base_url.clone()));
    auth.set_unauthorized_hook(|| {
        error!("Session expired, please log in again");
    });

    let transport = TransportClient::new(
        Arc::clone(&auth),
        Duration::from_secs(config.server.timeout_secs),
    )?;

    let auth_api = AuthApi::new(transport.clone());
    let db_api = DbApi::new(transport.clone());

    // Establish the credential when login details were provided
    if let (Some(username), Some(password)) = (&args.username, &args.password) {
        auth_api.login(username, password).await?;
    }

    let databases = db_api.list().await?;
    if databases.is_empty() {
        println!("No databases available.");
        return Ok(());
    }

    println!("Available databases:");
    for db in &databases {
        println!(
            "  {} - {}{}",
            db.id,
            db.name,
            if db.connected { " (connected)" } else { "" }
        );
    }

    // Without a question there is nothing more to drive
    let Some(question) = &args.question else {
        return Ok(());
    };

    let db_id = args
        .database
        .clone()
        .unwrap_or_else(|| databases[0].id.clone());
    db_api.connect(&db_id).await?;

    let query_api = Arc::new(QueryApi::new(transport.clone()));
    let result_api = Arc::new(ResultApi::new(transport.clone()));
    let lifecycle = QueryLifecycle::new(query_api);
    let projection = ResultProjection::new(Arc::<ResultApi>::clone(&result_api));

    info!("Submitting question to db '{}'", db_id);
    lifecycle.submit(&db_id, question, args.use_rag).await?;

    let sql = lifecycle
        .query()
        .and_then(|q| q.sql)
        .unwrap_or_default();
    println!("\nGenerated SQL:\n{}\n", sql);

    let result = lifecycle.execute(&db_id, &sql).await?;
    println!(
        "{} rows in {:.3}s{}",
        result.row_count,
        result.execution_time,
        if result.truncated { " (truncated)" } else { "" }
    );

    let header: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join(" | "));
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(value_to_cell).collect();
        println!("{}", cells.join(" | "));
    }

    // Demonstrate paged retrieval when the backend stored the result set
    if let Some(result_id) = &result.result_id {
        if projection
            .load_page(result_id, 1, config.results.page_size)
            .await?
        {
            let page = projection.current_page().expect("page was just applied");
            info!(
                "Page {} holds {} of {} total rows",
                page.page,
                page.row_count,
                page.total_row_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string())
            );
        }

        if args.report {
            let report_flow = ReportFlow::new(Arc::<ResultApi>::clone(&result_api));
            let report = report_flow
                .generate(result_id, &["bar".to_string(), "line".to_string()], true)
                .await?;
            println!("\nReport {} ({} visualizations):", report.id, report.visualizations.len());
            for insight in &report.insights {
                println!("  - {}", insight);
            }
        }
    }

    // Show the freshly recorded history entry alongside recent ones
    let history = HistorySync::new(Arc::new(HistoryApi::new(transport.clone())));
    match history.refresh().await {
        Ok(()) => {
            let items = history.items();
            if !items.is_empty() {
                println!("\nRecent queries:");
                for item in items.iter().take(5) {
                    println!(
                        "  [{}] {}{}",
                        item.created_at.format("%Y-%m-%d %H:%M"),
                        item.question.as_deref().unwrap_or("(no question)"),
                        if item.favorite { " ★" } else { "" }
                    );
                }
            }
        }
        Err(e) => error!("Could not fetch query history: {}", e),
    }

    Ok(())
}

fn value_to_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

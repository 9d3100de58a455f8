// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Interactive walkthrough of the upload-and-query pipeline: load a CSV,
//! print its statistics and an optional narrative insight, then answer
//! natural-language chart queries on stdin.

use anyhow::{Context, Result};
use clap::Parser;
use datavue::{
    stats, Dataset, DatavueError, GenerationSettings, InsightGenerator, QueryInterpreter, Session,
};
use datavue_llm::{ApiClient, GroqClient};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "datavue-demo", about = "Query a CSV with natural language")]
struct Args {
    /// CSV file to load (first record is the header row).
    file: PathBuf,

    /// Chat completion model to use.
    #[arg(long)]
    model: Option<String>,

    /// Override the API endpoint (for compatible providers or proxies).
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let dataset = load_csv(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    info!(
        "Loaded {}: {} rows, {} columns",
        args.file.display(),
        dataset.row_count(),
        dataset.column_count()
    );

    let mut session = Session::new();
    session.load_dataset(dataset);

    let statistics = session.statistics()?;
    if statistics.is_empty() {
        println!("No numeric columns found.");
    } else {
        println!("{}", stats::describe(&statistics));
    }

    let client = match build_client(args.endpoint.clone()) {
        Ok(client) => client,
        Err(e) => {
            warn!("No usable API configuration ({}); query loop disabled", e);
            println!("\nSet DATAVUE_API_KEY (or GROQ_API_KEY) to enable queries.");
            return Ok(());
        }
    };

    let mut settings = GenerationSettings::default();
    if let Some(model) = args.model {
        settings.model = model;
    }

    let insight = InsightGenerator::new(Arc::clone(&client), settings.clone())
        .generate(&statistics)
        .await;
    if let Some(text) = insight {
        println!("\n{text}");
    }

    let interpreter = QueryInterpreter::new(client, settings);
    query_loop(&mut session, &interpreter).await
}

async fn query_loop(session: &mut Session, interpreter: &QueryInterpreter) -> Result<()> {
    let stdin = io::stdin();
    loop {
        print!("\nquery> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let query = line.trim();
        if query.is_empty() || query == "quit" || query == "exit" {
            return Ok(());
        }

        if let Err(e) = run_query(session, interpreter, query).await {
            println!("{}", e.user_message());
        }
    }
}

async fn run_query(
    session: &mut Session,
    interpreter: &QueryInterpreter,
    query: &str,
) -> std::result::Result<(), DatavueError> {
    let headers = session.begin_query()?.headers.clone();

    match interpreter.interpret(query, &headers).await {
        Ok(config) => session.finish_query(config),
        Err(e) => {
            session.abort_query();
            return Err(e.into());
        }
    }

    let request = session.render_request()?;
    println!(
        "{} chart \"{}\" ({} vs {}), {} rows",
        request.chart_type.as_str(),
        request.title,
        request.x_axis,
        request.y_axis,
        request.rows.len()
    );
    let caption = session.caption();
    if !caption.is_empty() {
        println!("{caption}");
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&request)
            .unwrap_or_else(|e| format!("<serialisation failed: {e}>"))
    );
    Ok(())
}

fn build_client(endpoint: Option<String>) -> Result<Arc<dyn ApiClient>> {
    let api_key = std::env::var("DATAVUE_API_KEY")
        .or_else(|_| std::env::var("GROQ_API_KEY"))
        .unwrap_or_default();
    let endpoint = endpoint.or_else(|| std::env::var("DATAVUE_API_ENDPOINT").ok());

    let client = GroqClient::new(api_key, endpoint, None, None)?;
    Ok(Arc::new(client))
}

fn load_csv(path: &PathBuf) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(|v| v.to_string()).collect());
    }

    Ok(Dataset::from_parsed(headers, records)?)
}

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for breaker-proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:12345")]
    url: String,

    /// Bearer token, when the control plane requires one.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register or replace an app from a JSON file
    Register {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Show an app's configuration and backend breaker state
    Inspect { name: String },
    /// List registered apps
    Apps,
    /// Check proxy system status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    let res = match cli.command {
        Commands::Register { file } => {
            let body = std::fs::read(&file)?;
            client
                .post(format!("{}/app", cli.url))
                .headers(headers)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?
        }
        Commands::Inspect { name } => {
            client
                .get(format!("{}/inspect/{}", cli.url, name))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Apps => client.get(format!("{}/apps", cli.url)).headers(headers).send().await?,
        Commands::Status => client.get(format!("{}/status", cli.url)).headers(headers).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: control API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

use clap::{Parser, Subcommand};
use reqwest::header::COOKIE;
use reqwest::Client;
use serde_json::json;
use std::error::Error;

#[derive(Parser)]
#[command(name = "versefind-cli")]
#[command(about = "Versefind CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3001")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a session for a catalog access token
    Session {
        #[arg(short, long, env = "VERSEFIND_ACCESS_TOKEN")]
        token: String,
    },

    /// Search the tracks indexed for a session
    Search {
        #[arg(short, long)]
        session: String,

        #[arg(short, long, default_value = "")]
        q: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,

        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    /// Show the indexing progress of a session
    Progress {
        #[arg(short, long)]
        session: String,
    },

    /// End a session, halting its indexing run
    Logout {
        #[arg(short, long)]
        session: String,
    },

    /// Check server health
    Health,
}

fn session_cookie(session: &str) -> String {
    format!("session={}", session)
}

async fn print_body(response: reqwest::Response) -> Result<(), Box<dyn Error>> {
    let status = response.status();
    if status == reqwest::StatusCode::NO_CONTENT {
        println!("{}", status);
        return Ok(());
    }

    let body: serde_json::Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Session { token } => {
            let response = client
                .post(format!("{}/api/session", cli.endpoint))
                .json(&json!({ "access_token": token }))
                .send()
                .await?;

            print_body(response).await?;
        }

        Commands::Search {
            session,
            q,
            limit,
            offset,
        } => {
            let response = client
                .get(format!("{}/api/search", cli.endpoint))
                .header(COOKIE, session_cookie(&session))
                .query(&[
                    ("q", q),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ])
                .send()
                .await?;

            print_body(response).await?;
        }

        Commands::Progress { session } => {
            let response = client
                .get(format!("{}/api/progress", cli.endpoint))
                .header(COOKIE, session_cookie(&session))
                .send()
                .await?;

            print_body(response).await?;
        }

        Commands::Logout { session } => {
            let response = client
                .delete(format!("{}/api/session", cli.endpoint))
                .header(COOKIE, session_cookie(&session))
                .send()
                .await?;

            print_body(response).await?;
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            print_body(response).await?;
        }
    }

    Ok(())
}

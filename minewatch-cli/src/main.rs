//! minewatch-cli — terminal client for the Minewatch chat transcript
//!
//! # Subcommands
//! - `send <content> [--role user|assistant] [--json]` — submit a turn
//! - `history [--limit N] [--recent N] [--json]`       — print the transcript
//! - `status`                                          — show server health

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "minewatch-cli",
    version,
    about = "Minewatch mining-safety assistant — chat from the terminal"
)]
struct Cli {
    /// Minewatch HTTP server URL (overrides MINEWATCH_HTTP_URL env var)
    #[arg(long, env = "MINEWATCH_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    User,
    Assistant,
}

impl RoleArg {
    fn as_str(self) -> &'static str {
        match self {
            RoleArg::User => "user",
            RoleArg::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit a chat turn
    Send {
        /// Message text
        content: String,

        /// Author of the turn
        #[arg(long, value_enum, default_value_t = RoleArg::User)]
        role: RoleArg,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Print the chat transcript
    History {
        /// Only the most recent N messages
        #[arg(long)]
        recent: Option<usize>,

        /// At most N messages
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show Minewatch server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

/// Response body of POST /api/chat
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub user: ChatMessage,
    pub assistant: Option<ChatMessage>,
}

/// One transcript line: `[2025-11-03 06:42:00] user: text`
pub fn format_message(m: &ChatMessage) -> String {
    // "2025-11-03T06:42:00.123456Z" → "2025-11-03 06:42:00"
    let ts: String = m.timestamp.replacen('T', " ", 1).chars().take(19).collect();
    format!("[{}] {}: {}", ts, m.role, m.content)
}

/// Query string for GET /api/chat; empty when no paging was asked for.
pub fn history_query(recent: Option<usize>, limit: Option<usize>) -> String {
    let mut params = Vec::new();
    if let Some(n) = recent {
        params.push(format!("recent={}", n));
    }
    if let Some(n) = limit {
        params.push(format!("limit={}", n));
    }
    if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    }
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

fn fail_on_status(resp: reqwest::blocking::Response) -> reqwest::blocking::Response {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("minewatch-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }
    resp
}

/// Submit a turn via POST /api/chat.
fn do_send(server: &str, content: &str, role: RoleArg, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/api/chat", server);
    let body = serde_json::json!({
        "role": role.as_str(),
        "content": content,
    });

    let resp = match client(30)?.post(&url).json(&body).send() {
        Ok(r) => fail_on_status(r),
        Err(e) => {
            eprintln!("minewatch-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if json_output {
        let raw: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let submitted: SubmitResponse = resp.json()?;
    println!("{}", format_message(&submitted.user));
    if let Some(reply) = &submitted.assistant {
        println!("{}", format_message(reply));
    }
    Ok(())
}

/// Print the transcript via GET /api/chat.
fn do_history(
    server: &str,
    recent: Option<usize>,
    limit: Option<usize>,
    json_output: bool,
) -> anyhow::Result<()> {
    let url = format!("{}/api/chat{}", server, history_query(recent, limit));

    let resp = match client(30)?.get(&url).send() {
        Ok(r) => fail_on_status(r),
        Err(e) => {
            eprintln!("minewatch-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let raw: serde_json::Value = resp.json()?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let messages: Vec<ChatMessage> = serde_json::from_value(raw)?;
    if messages.is_empty() {
        eprintln!("No messages yet");
    } else {
        for m in &messages {
            println!("{}", format_message(m));
        }
    }
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);

    match client(10)?.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Minewatch server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:          {}", body["version"].as_str().unwrap_or("?"));
            println!("Backend:          {}", body["backend"].as_str().unwrap_or("?"));
            println!("Messages:         {}", body["messages"].as_u64().unwrap_or(0));
        }
        Ok(r) => {
            eprintln!("minewatch-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("minewatch-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Send { content, role, json } => do_send(&server, &content, role, json),
        Commands::History { recent, limit, json } => do_history(&server, recent, limit, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("minewatch-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

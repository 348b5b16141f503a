use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docqa::server::{
    AnswerResponse, BookStatusResponse, ErrorBody, HealthResponse, MessageResponse,
    QuestionRequest, UploadResponse,
};
use docqa::ProviderKind;
use reqwest::blocking::{multipart, Client, Response};
use reqwest::StatusCode;

#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    about = "Upload PDFs to a running docqa-server and ask questions about them"
)]
struct Cli {
    /// Base URL of the docqa server
    #[arg(long, env = "DOCQA_SERVER_URL", default_value = "http://127.0.0.1:8000")]
    server_url: String,

    /// Seconds before requests to the server time out (uploads embed the whole document)
    #[arg(long, default_value_t = 600)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a question about the loaded document
    Ask {
        /// Question to answer
        #[arg(long)]
        question: String,
    },
    /// Upload a PDF, replacing the loaded document
    Upload {
        /// Path to the PDF
        path: PathBuf,
    },
    /// Show server health and default book state
    Status,
    /// Remove every stored chunk
    Clear,
    /// Report which provider credentials are visible to this shell
    CheckEnv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let base = cli.server_url.trim_end_matches('/');
    let timeout = Duration::from_secs(cli.timeout_secs.max(1));

    match cli.command {
        Command::CheckEnv => check_env(),
        Command::Ask { question } => {
            let resp = build_client(timeout)?
                .post(format!("{base}/ask"))
                .json(&QuestionRequest { question })
                .send()
                .with_context(|| format!("failed to call {base}/ask"))?;
            let parsed: AnswerResponse = parse(resp)?;
            println!("--- Answer ---\n{}\n", parsed.answer);
            if !parsed.sources.is_empty() {
                println!("--- Sources ---");
                for source in &parsed.sources {
                    println!(
                        "[chunk {} | page ~{}] {}",
                        source.chunk_id, source.page, source.text
                    );
                }
            }
        }
        Command::Upload { path } => {
            let form = multipart::Form::new()
                .file("file", &path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let resp = build_client(timeout)?
                .post(format!("{base}/upload"))
                .multipart(form)
                .send()
                .with_context(|| format!("failed to call {base}/upload"))?;
            let parsed: UploadResponse = parse(resp)?;
            println!(
                "{}: {} ({} pages, {} chunks)",
                parsed.message, parsed.filename, parsed.pages, parsed.chunks
            );
        }
        Command::Status => {
            let client = build_client(timeout)?;
            let health: HealthResponse = parse(
                client
                    .get(format!("{base}/health"))
                    .send()
                    .with_context(|| format!("failed to call {base}/health"))?,
            )?;
            let book: BookStatusResponse = parse(
                client
                    .get(format!("{base}/book-status"))
                    .send()
                    .with_context(|| format!("failed to call {base}/book-status"))?,
            )?;
            println!("status:        {}", health.status);
            println!("model:         {}", health.model);
            println!("chunks stored: {}", health.documents_count);
            println!(
                "default book:  {}",
                book.default_book_name.as_deref().unwrap_or("(none)")
            );
        }
        Command::Clear => {
            let resp = build_client(timeout)?
                .delete(format!("{base}/clear"))
                .send()
                .with_context(|| format!("failed to call {base}/clear"))?;
            let parsed: MessageResponse = parse(resp)?;
            println!("{}", parsed.message);
        }
    }
    Ok(())
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}

fn parse<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp
            .text()
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        bail!("{}", describe_failure(status, &body));
    }
    resp.json().context("failed to parse server response")
}

/// Prefers the server's `detail` message over the raw body.
fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|err| err.detail)
        .unwrap_or_else(|_| body.to_string());
    format!("server returned {status}: {detail}")
}

fn check_env() {
    let groq = std::env::var("GROQ_API_KEY").ok();
    let gemini = std::env::var("GEMINI_API_KEY").ok();
    println!("GROQ_API_KEY:   {}", describe_key(groq.as_deref()));
    println!("GEMINI_API_KEY: {}", describe_key(gemini.as_deref()));
    match ProviderKind::select(groq.as_deref(), gemini.as_deref()) {
        Some(ProviderKind::Groq) => println!("groq will be used"),
        Some(ProviderKind::Gemini) => println!("only gemini available"),
        None => println!("no API keys found; set GROQ_API_KEY or GEMINI_API_KEY"),
    }
}

fn describe_key(key: Option<&str>) -> String {
    match key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(k) => {
            let prefix: String = k.chars().take(8).collect();
            format!("set ({prefix}...)")
        }
        None => "not set".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_show_the_server_detail() {
        let message = describe_failure(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"question must not be empty"}"#,
        );
        assert_eq!(
            message,
            "server returned 400 Bad Request: question must not be empty"
        );
    }

    #[test]
    fn non_json_failures_show_the_raw_body() {
        let message = describe_failure(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(message, "server returned 502 Bad Gateway: upstream down");
    }

    #[test]
    fn keys_are_masked() {
        assert_eq!(describe_key(Some("gsk_abcdefghijkl")), "set (gsk_abcd...)");
        assert_eq!(describe_key(Some("  ")), "not set");
        assert_eq!(describe_key(None), "not set");
    }
}

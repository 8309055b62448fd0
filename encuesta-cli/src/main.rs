//! encuesta-cli: command-line client for an Encuesta server
//!
//! # Subcommands
//! - `vote --group <g> --presentation <n> --proposal <n> [--comment <c>]`: submit a vote
//! - `results [--group <g>] [--json]`: averages and responses
//! - `export [--group <g>] [--output <path>]`: download the CSV export
//! - `share-link`: the link behind the landing page's QR code
//! - `status`: show server health

use chrono::Utc;
use clap::{Parser, Subcommand};
use encuesta_core::export::export_filename;
use encuesta_core::{FormError, GroupFilter, VoteForm};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "encuesta-cli",
    version,
    about = "Encuesta presentation feedback: vote, results and CSV export"
)]
struct Cli {
    /// Encuesta HTTP server URL (overrides ENCUESTA_HTTP_URL env var)
    #[arg(long, env = "ENCUESTA_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit one vote
    Vote {
        /// Group label, e.g. "Grupo 1"
        #[arg(long)]
        group: String,

        /// Presentation rating, 1 to 5
        #[arg(long)]
        presentation: u8,

        /// Proposal rating, 1 to 5
        #[arg(long)]
        proposal: u8,

        /// What should we improve?
        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Show averages and responses
    Results {
        /// Only responses from this group ("all" for every group)
        #[arg(long)]
        group: Option<String>,

        /// Print the raw results JSON
        #[arg(long)]
        json: bool,
    },

    /// Download the responses as CSV
    Export {
        /// Only responses from this group ("all" for every group)
        #[arg(long)]
        group: Option<String>,

        /// Output path; defaults to the server-suggested filename
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print the vote link to share or encode as a QR code
    ShareLink,

    /// Show Encuesta server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

/// One row of the results dashboard
#[derive(Debug, Deserialize)]
pub struct ResponseRow {
    pub group: String,
    pub date: String,
    pub presentation_rating: Option<i64>,
    pub proposal_rating: Option<i64>,
    pub comment: Option<String>,
}

/// Body of GET /resultados
#[derive(Debug, Deserialize)]
pub struct ResultsBody {
    pub filter: String,
    pub total: usize,
    pub groups: Vec<String>,
    /// `0` when there is nothing to average, otherwise a two-decimal string
    pub presentation_average: serde_json::Value,
    pub presentation_stars: u8,
    pub proposal_average: serde_json::Value,
    pub proposal_stars: u8,
    pub responses: Vec<ResponseRow>,
}

/// Average as the dashboard shows it.
pub fn average_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => "0".to_string(),
    }
}

/// Five-star bar with `lit` stars filled in.
pub fn star_bar(lit: u8) -> String {
    let lit = lit.min(5) as usize;
    format!("{}{}", "★".repeat(lit), "☆".repeat(5 - lit))
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<Client> {
    Ok(Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// GET `url`, narrowed to one group unless the selector is `all`.
pub fn group_request(client: &Client, url: &str, group: Option<&str>) -> RequestBuilder {
    let request = client.get(url);
    match GroupFilter::from_selector(group) {
        GroupFilter::All => request,
        GroupFilter::Group(g) => request.query(&[("group", g)]),
    }
}

/// Server error body as the user should see it.
fn error_message(resp: reqwest::blocking::Response) -> String {
    let status = resp.status();
    let body: serde_json::Value = resp.json().unwrap_or_default();
    match body["error"].as_str() {
        Some(msg) => msg.to_string(),
        None => format!("server returned {}", status),
    }
}

/// Validate locally, then POST /votar.
fn do_vote(
    server: &str,
    group: String,
    presentation: u8,
    proposal: u8,
    comment: String,
) -> anyhow::Result<()> {
    let mut form = VoteForm::new();
    form.set_group(group);
    form.set_presentation_rating(presentation);
    form.set_proposal_rating(proposal);
    form.set_comment(comment);

    let input = match form.begin_submit(Utc::now()) {
        Ok(input) => input,
        Err(FormError::Invalid(e)) => {
            eprintln!("encuesta-cli: {}", e.user_message());
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let url = format!("{}/votar", server);
    let resp = match client(30)?.post(&url).json(&input).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("encuesta-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        eprintln!("encuesta-cli: {}", error_message(resp));
        std::process::exit(1);
    }

    let body: serde_json::Value = resp.json()?;
    println!(
        "{}",
        body["message"].as_str().unwrap_or("¡Gracias por tu feedback!")
    );
    Ok(())
}

/// Print the dashboard for a group selector.
fn do_results(server: &str, group: Option<&str>, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/resultados", server);
    let resp = match group_request(&client(30)?, &url, group).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("encuesta-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        eprintln!("encuesta-cli: {}", error_message(resp));
        std::process::exit(1);
    }

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let body: ResultsBody = resp.json()?;
    print!("{}", render_results(&body));
    Ok(())
}

/// Human-readable dashboard.
pub fn render_results(body: &ResultsBody) -> String {
    let mut out = String::new();
    out.push_str(&format!("Grupo:        {}\n", body.filter));
    out.push_str(&format!("Respuestas:   {}\n", body.total));
    out.push_str(&format!(
        "Presentación: {} {}\n",
        average_text(&body.presentation_average),
        star_bar(body.presentation_stars)
    ));
    out.push_str(&format!(
        "Licitación:   {} {}\n",
        average_text(&body.proposal_average),
        star_bar(body.proposal_stars)
    ));
    if !body.groups.is_empty() {
        out.push_str(&format!("Grupos:       {}\n", body.groups.join(", ")));
    }

    if body.responses.is_empty() {
        out.push_str("\nNo hay respuestas todavía\n");
        return out;
    }

    for r in &body.responses {
        let rating = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "\n{} · {}\n  Presentación: {}  Licitación: {}\n",
            r.group,
            r.date,
            rating(r.presentation_rating),
            rating(r.proposal_rating)
        ));
        if let Some(comment) = &r.comment {
            out.push_str(&format!("  Mejorar: {}\n", comment));
        }
    }
    out
}

/// Download the CSV and write it to disk.
fn do_export(server: &str, group: Option<&str>, output: Option<String>) -> anyhow::Result<()> {
    let url = format!("{}/resultados/export", server);
    let resp = match group_request(&client(60)?, &url, group).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("encuesta-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        eprintln!("encuesta-cli: {}", error_message(resp));
        std::process::exit(1);
    }

    // same UTC-dated name the server puts in Content-Disposition
    let path = output.unwrap_or_else(|| export_filename(Utc::now().date_naive()));

    let csv = resp.text()?;
    std::fs::write(&path, csv.as_bytes())?;
    println!("{} ({} filas)", path, csv.lines().count().saturating_sub(1));
    Ok(())
}

/// Print the share link from GET /.
fn do_share_link(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/", server);
    let resp = match client(10)?.get(&url).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("encuesta-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let body: serde_json::Value = resp.error_for_status()?.json()?;
    match body["share_link"].as_str() {
        Some(link) => println!("{}", link),
        None => anyhow::bail!("server did not return a share link"),
    }
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(10)?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Encuesta server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!("Backend:         {}", body["backend"].as_str().unwrap_or("?"));
            println!("Responses:       {}", body["responses"]);
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("encuesta-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("encuesta-cli: cannot reach {}: {}", url, e);
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
        Commands::Vote {
            group,
            presentation,
            proposal,
            comment,
        } => do_vote(&server, group, presentation, proposal, comment),
        Commands::Results { group, json } => do_results(&server, group.as_deref(), json),
        Commands::Export { group, output } => do_export(&server, group.as_deref(), output),
        Commands::ShareLink => do_share_link(&server),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("encuesta-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_request_encodes_selector() {
        let client = Client::new();
        let url = "http://127.0.0.1:8080/resultados";

        let all = group_request(&client, url, None).build().unwrap();
        assert_eq!(all.url().query(), None);
        let all = group_request(&client, url, Some("all")).build().unwrap();
        assert_eq!(all.url().query(), None);

        let one = group_request(&client, url, Some("Grupo 1")).build().unwrap();
        assert_eq!(one.url().path(), "/resultados");
        assert_eq!(one.url().query(), Some("group=Grupo+1"));

        let odd = group_request(&client, url, Some("Año&B")).build().unwrap();
        let pairs: Vec<(String, String)> = odd.url().query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("group".to_string(), "Año&B".to_string())]);
    }

    #[test]
    fn test_average_text_accepts_both_shapes() {
        assert_eq!(average_text(&json!(0)), "0");
        assert_eq!(average_text(&json!("3.67")), "3.67");
        assert_eq!(average_text(&serde_json::Value::Null), "0");
    }

    #[test]
    fn test_star_bar() {
        assert_eq!(star_bar(0), "☆☆☆☆☆");
        assert_eq!(star_bar(4), "★★★★☆");
        assert_eq!(star_bar(9), "★★★★★");
    }

    #[test]
    fn test_render_results_from_server_body() {
        let body: ResultsBody = serde_json::from_value(json!({
            "filter": "Grupo 1",
            "total": 1,
            "groups": ["Grupo 1", "Grupo 2"],
            "presentation_average": "4.00",
            "presentation_stars": 4,
            "proposal_average": "5.00",
            "proposal_stars": 5,
            "responses": [{
                "id": "abc",
                "group": "Grupo 1",
                "date": "17/11/2025, 10:00:00",
                "presentation_rating": 4,
                "proposal_rating": 5,
                "comment": "Más ejemplos"
            }]
        }))
        .unwrap();

        let text = render_results(&body);
        assert!(text.contains("Respuestas:   1"));
        assert!(text.contains("Presentación: 4.00 ★★★★☆"));
        assert!(text.contains("Grupos:       Grupo 1, Grupo 2"));
        assert!(text.contains("Mejorar: Más ejemplos"));
    }

    #[test]
    fn test_render_results_empty() {
        let body: ResultsBody = serde_json::from_value(json!({
            "filter": "all",
            "total": 0,
            "groups": [],
            "presentation_average": 0,
            "presentation_stars": 0,
            "proposal_average": 0,
            "proposal_stars": 0,
            "responses": []
        }))
        .unwrap();

        let text = render_results(&body);
        assert!(text.contains("Presentación: 0 ☆☆☆☆☆"));
        assert!(text.contains("No hay respuestas todavía"));
    }

    #[test]
    fn test_cli_parses_vote() {
        let cli = Cli::try_parse_from([
            "encuesta-cli",
            "--server",
            "http://localhost:9000",
            "vote",
            "--group",
            "Grupo 3",
            "--presentation",
            "5",
            "--proposal",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.server, "http://localhost:9000");
        match cli.command {
            Commands::Vote { group, presentation, proposal, comment } => {
                assert_eq!(group, "Grupo 3");
                assert_eq!((presentation, proposal), (5, 4));
                assert!(comment.is_empty());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

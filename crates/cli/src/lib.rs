use anyhow::{Context as AnyhowContext, Result};
use axum::{
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use command::{CommandAction, CommandContext, CommandHandler, CommandRequest, CommandResponse};
use config::HuilerieConfig;
use huilerie_protocol::{error_codes, serialize_json};
use serde_json::json;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

mod cache;
mod command;
mod config;
mod http_api;
mod report;
mod server_security;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "huilerie")]
#[command(about = "Back office for an olive-oil mill: boxes, sessions, payments, collectors and staff", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML config file (default: ./huilerie.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config and HUILERIE_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a JSON Command API request
    Command(CommandArgs),

    /// Serve Command API over HTTP (POST /command)
    ServeHttp(ServeArgs),

    /// Create the database and seed the numbered box inventory
    Init(InitArgs),

    /// Render a farmer statement or a session receipt as Markdown
    Statement(StatementArgs),
}

#[derive(Args)]
struct CommandArgs {
    /// Inline JSON request (mutually exclusive with --file)
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Path to file containing the JSON request
    #[arg(long)]
    file: Option<PathBuf>,

    /// Pretty-print JSON response
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:7800
    #[arg(long, default_value = "127.0.0.1:7800")]
    bind: String,

    /// Allow binding to non-loopback addresses (requires an auth token)
    #[arg(long)]
    public: bool,

    /// Require Authorization: Bearer <token> on all requests (env: HUILERIE_AUTH_TOKEN)
    #[arg(long)]
    auth_token: Option<String>,
}

#[derive(Args)]
struct InitArgs {
    /// Inventory size (defaults to inventory.box_count from the config)
    #[arg(long)]
    box_count: Option<u32>,
}

#[derive(Args)]
struct StatementArgs {
    /// Farmer id for a period statement
    #[arg(long, conflicts_with = "session", required_unless_present = "session")]
    farmer: Option<i64>,

    /// Session id for a single receipt
    #[arg(long)]
    session: Option<i64>,

    /// First day of the period (YYYY-MM-DD)
    #[arg(long, requires = "farmer")]
    from: Option<NaiveDate>,

    /// Last day of the period (YYYY-MM-DD)
    #[arg(long, requires = "farmer")]
    to: Option<NaiveDate>,

    /// Write the Markdown to a file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // stdout carries JSON for `command`, keep it free of chatter
    if matches!(cli.command, Commands::Command(_)) {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = HuilerieConfig::resolve(cli.config.as_deref(), cli.db.as_deref())?;
    log::debug!("Using database {}", config.database.path.display());
    let ctx = CommandContext::open(config)?;
    let handler = CommandHandler::new(ctx);

    match cli.command {
        Commands::Command(args) => run_command(args, &handler).await?,
        Commands::ServeHttp(args) => serve_http(args, handler).await?,
        Commands::Init(args) => run_init(args, &handler).await?,
        Commands::Statement(args) => run_statement(args, &handler).await?,
    }

    Ok(())
}

async fn run_command(args: CommandArgs, handler: &CommandHandler) -> Result<()> {
    let raw = read_payload(&args)?;
    let response = match serde_json::from_str::<CommandRequest>(&raw) {
        Ok(request) => handler.execute(request).await,
        Err(err) => {
            let err = anyhow::Error::new(err).context("Invalid JSON passed to --json/--file");
            CommandResponse::from_error(&err, None)
        }
    };
    emit_response(&response, args.pretty)
}

fn emit_response(response: &CommandResponse, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serialize_json(response)?
    };
    print_stdout(&output)?;

    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn read_payload(args: &CommandArgs) -> Result<String> {
    if let Some(raw) = &args.json {
        return Ok(raw.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON from {}", path.display()));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read JSON from stdin")?;

    if buffer.trim().is_empty() {
        anyhow::bail!("Command request is empty. Provide --json, --file, or pipe JSON via stdin.");
    }

    Ok(buffer)
}

async fn run_init(args: InitArgs, handler: &CommandHandler) -> Result<()> {
    let payload = match args.box_count {
        Some(box_count) => json!({ "box_count": box_count }),
        None => json!({}),
    };
    let response = handler
        .execute(CommandRequest::new(CommandAction::BoxSeed, payload))
        .await;
    if !response.is_error() {
        log::info!(
            "Inventory ready: {} new boxes",
            response.data.get("inserted").and_then(|v| v.as_u64()).unwrap_or(0)
        );
    }
    emit_response(&response, true)
}

async fn run_statement(args: StatementArgs, handler: &CommandHandler) -> Result<()> {
    let request = match (args.farmer, args.session) {
        (Some(farmer_id), _) => CommandRequest::new(
            CommandAction::FarmerStatement,
            json!({ "farmer_id": farmer_id, "from": args.from, "to": args.to }),
        ),
        (None, Some(session_id)) => CommandRequest::new(
            CommandAction::SessionReceipt,
            json!({ "session_id": session_id }),
        ),
        (None, None) => anyhow::bail!("Pass --farmer <id> or --session <id>"),
    };

    let response = handler.execute(request).await;
    if response.is_error() {
        return emit_response(&response, true);
    }
    let markdown = response
        .data
        .get("markdown")
        .and_then(|v| v.as_str())
        .context("Statement response carried no markdown")?;

    match args.out {
        Some(path) => {
            fs::write(&path, markdown)
                .with_context(|| format!("Failed to write statement to {}", path.display()))?;
            log::info!("Statement written to {}", path.display());
        }
        None => print_stdout(markdown.trim_end())?,
    }
    Ok(())
}

struct HttpState {
    handler: CommandHandler,
    auth_token: Option<server_security::AuthToken>,
}

async fn serve_http(args: ServeArgs, handler: CommandHandler) -> Result<()> {
    let addrs = server_security::resolve_guarded_bind_addrs(&args.bind, args.public).await?;
    let auth_token = server_security::resolve_auth_token(args.auth_token.as_deref(), args.public)?;

    let state = Arc::new(HttpState {
        handler,
        auth_token,
    });
    let app = Router::new()
        .route(
            "/command",
            post({
                let state = state.clone();
                move |headers, body| http_handler(headers, body, state.clone())
            }),
        )
        .route(
            "/health",
            get({
                let state = state.clone();
                move |headers| http_health(headers, state.clone())
            }),
        );

    let addr = server_security::choose_preferred_bind_addr(&addrs).with_context(|| {
        format!("Bind address resolved to no socket addresses: {}", args.bind)
    })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    print_stdout(&format!("Serving Command API: {base_url}/command"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    if state.auth_token.is_some() {
        print_stdout(&format!(
            "Auth enabled: add header 'Authorization: Bearer ${}'",
            server_security::AUTH_TOKEN_ENV
        ))?;
    }
    if args.public {
        let addrs = addrs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        print_stdout(&format!(
            "Public bind enabled (--public). Resolved addresses: {addrs}"
        ))?;
    }
    print_stdout(&format!(
        "Try: curl -X POST {base_url}/command -H 'Content-Type: application/json' -d '{{\"action\":\"dashboard\"}}'"
    ))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            log::info!("Shutting down HTTP server");
        })
        .await?;
    Ok(())
}

async fn http_handler(
    headers: HeaderMap,
    body: axum::body::Bytes,
    state: Arc<HttpState>,
) -> Result<Response, StatusCode> {
    if !http_api::is_authorized(&headers, state.auth_token.as_ref()) {
        return http_api::unauthorized();
    }

    let request: CommandRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            let response = http_api::error_response(
                error_codes::INVALID_REQUEST,
                format!("Invalid JSON request: {err}"),
            );
            return http_api::build_response(StatusCode::BAD_REQUEST, &response);
        }
    };
    let response = state.handler.execute(request).await;
    http_api::build_response(StatusCode::OK, &response)
}

async fn http_health(headers: HeaderMap, state: Arc<HttpState>) -> Result<Response, StatusCode> {
    if !http_api::is_authorized(&headers, state.auth_token.as_ref()) {
        return http_api::unauthorized();
    }
    http_api::build_response(
        StatusCode::OK,
        &json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "schema_version": huilerie_store::SCHEMA_VERSION,
        }),
    )
}

use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use orgchart_graph::ChartGraph;
use orgchart_protocol::{request_schemas, serialize_json, ConnectionsRequest};
use serde::Serialize;
use service::{OrgChartService, Reply};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

pub mod http_api;
mod server_security;
pub mod service;

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
#[command(name = "orgchart")]
#[command(about = "Org chart hierarchy resolution over an identity directory", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory snapshot (JSON)
    #[arg(long, global = true, default_value = "directory.json")]
    directory: PathBuf,

    /// Org chart settings (TOML)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Nodes around a record: reports, managers up to the root, peers
    Tree(IdArgs),

    /// Direct reports and owned workgroups of a record
    Children(IdArgs),

    /// Detail panel of a record
    Details(IdArgs),

    /// Connections between the given records under the configured rule
    Connections(ConnectionsArgs),

    /// Display labels of the node types
    #[command(name = "node-types")]
    NodeTypes,

    /// Stored preferences of an identity
    Preference(PreferenceArgs),

    /// Indented text outline of the tree around a record
    Render(IdArgs),

    /// JSON schemas of the request bodies
    Schema,

    /// Serve the org chart routes over HTTP
    ServeHttp(ServeArgs),
}

#[derive(Args)]
struct IdArgs {
    /// Record id
    id: String,
}

#[derive(Args)]
struct ConnectionsArgs {
    /// Record ids currently shown on the chart
    ids: Vec<String>,
}

#[derive(Args)]
struct PreferenceArgs {
    /// Identity name
    name: String,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:7700
    #[arg(long, default_value = "127.0.0.1:7700")]
    bind: String,

    /// Allow binding to non-loopback addresses
    #[arg(long)]
    public: bool,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    if let Commands::Schema = cli.command {
        return print_stdout(&serialize_json(&request_schemas()?, true)?);
    }

    let service = OrgChartService::load(&cli.directory, cli.settings.as_deref())?;
    let pretty = cli.pretty || service.settings().pretty_json;

    match cli.command {
        Commands::Tree(args) => print_reply(service.tree(&args.id), pretty)?,
        Commands::Children(args) => print_reply(service.children(&args.id), pretty)?,
        Commands::Details(args) => print_reply(service.details(&args.id), pretty)?,
        Commands::Connections(args) => {
            let request = ConnectionsRequest {
                all_node_ids: Some(args.ids),
                ..Default::default()
            };
            print_reply(service.connections(&request), pretty)?
        }
        Commands::NodeTypes => print_stdout(&serialize_json(&service.node_types(), pretty)?)?,
        Commands::Preference(args) => {
            let reply = service.preference(&args.name);
            match reply.body {
                Some(body) => print_stdout(&serialize_json(&body, pretty)?)?,
                None => {
                    eprintln!("Error: Can not find identity object: {}", args.name);
                    std::process::exit(1);
                }
            }
        }
        Commands::Render(args) => run_render(&service, &args.id)?,
        Commands::ServeHttp(args) => serve_http(args, service).await?,
        Commands::Schema => {}
    }

    Ok(())
}

fn print_reply<T: Serialize>(reply: Reply<T>, pretty: bool) -> Result<()> {
    print_stdout(&serialize_json(&reply.body, pretty)?)?;
    if !reply.status.is_success() {
        if let Some(error) = reply.error {
            eprintln!("Error [{}]: {}", error.code, error.message);
            if let Some(hint) = error.hint {
                eprintln!("Hint: {hint}");
            }
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_render(service: &OrgChartService, id: &str) -> Result<()> {
    let reply = service.tree(id);
    let Some(nodes) = reply.body.nodes else {
        eprintln!(
            "Error: {}",
            reply.body.message.unwrap_or_else(|| "tree unavailable".into())
        );
        std::process::exit(1);
    };
    let outline = ChartGraph::new(&nodes).render();
    print_stdout(outline.trim_end())?;
    if !reply.body.skipped.is_empty() {
        log::warn!("Skipped unresolved records: {}", reply.body.skipped.join(", "));
    }
    Ok(())
}

async fn serve_http(args: ServeArgs, service: OrgChartService) -> Result<()> {
    let addrs = server_security::resolve_guarded_bind_addrs(&args.bind, args.public).await?;

    let app = http_api::router(Arc::new(service));
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    print_stdout(&format!("Serving org chart: {base_url}/orgchart/<id>"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
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
        "Try: curl -X POST {base_url}/orgchart/connections -H 'Content-Type: application/json' -d '{{\"allNodeIds\": []}}'"
    ))?;
    axum::serve(listener, app).await?;
    Ok(())
}

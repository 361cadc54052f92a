//! webdesk VFS host binary.
//!
//! Usage:
//!   # One request, reply printed as JSON
//!   webdesk-vfs --config vfs.toml call --user amy ls /User
//!   webdesk-vfs call --user amy mv '{"source": "/User/a", "destination": "/User/b"}'
//!
//!   # JSON-lines requests on stdin, replies on stdout
//!   webdesk-vfs --config vfs.toml serve

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use webdesk_types::User;
use webdesk_vfs::{Gateway, Vfs, VfsConfig};

/// Per-user sandboxed virtual filesystem gateway.
#[derive(Parser, Debug)]
#[command(name = "webdesk-vfs")]
#[command(about = "Per-user sandboxed virtual filesystem gateway")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one method and print its reply
    Call {
        /// User the request runs as
        #[arg(short, long)]
        user: String,

        /// User language
        #[arg(long, default_value = "en_EN")]
        lang: String,

        /// Method name, e.g. ls, cat, mv
        method: String,

        /// Arguments as JSON; anything that is not JSON is taken as a path
        args: Option<String>,
    },
    /// Serve JSON-lines requests on stdin
    Serve,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => VfsConfig::load(path)?,
        None => VfsConfig::default(),
    };
    tracing::info!(
        home = %config.home_root.display(),
        public = %config.public_root.display(),
        "vfs configured"
    );
    let gateway = Gateway::new(Arc::new(Vfs::new(config)));

    match args.command {
        Command::Call {
            user,
            lang,
            method,
            args,
        } => {
            let user = User::new(user, lang);
            let args = parse_args(args.as_deref());
            let Some(reply) = gateway.dispatch(&user, &method, args).await else {
                eprintln!("unknown method: {method}");
                return Ok(ExitCode::from(2));
            };
            let text = serde_json::to_string_pretty(&reply).context("failed to encode reply")?;
            println!("{text}");
            Ok(if reply.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Serve => {
            tracing::info!("serving JSON-lines requests on stdin");
            let stdin = BufReader::new(tokio::io::stdin());
            webdesk_server::serve(gateway, stdin, tokio::io::stdout()).await?;
            tracing::info!("input closed, shutting down");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// JSON if it parses, otherwise a bare path string.
fn parse_args(raw: Option<&str>) -> serde_json::Value {
    match raw {
        None => serde_json::Value::String("/".to_string()),
        Some(raw) => serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string())),
    }
}

//! # ember
//!
//! Serves a document root of static files and `.tmpl` templates, with
//! cookie-backed sessions.
//!
//! ```bash
//! ember --config ember.toml
//! ember --root ./www --port 8080 --threads 4
//! RUST_LOG=debug ember
//! ```

use std::path::PathBuf;

use clap::Parser;
use ember_core::{ServerBuilder, ServerConfig};
use ember_transport::EmberServer;

#[derive(Parser, Debug)]
#[command(name = "ember", version, about = "Template and static file web server")]
struct Args {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Worker threads serving connections
    #[arg(short, long)]
    threads: Option<usize>,

    /// Document root for files and templates
    #[arg(short, long)]
    root: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> ember_core::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(root) = self.root {
            config.document_root = root;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Args::parse().into_config()?;
    tracing::info!(
        "serving {} with {} workers",
        config.document_root.display(),
        config.threads
    );

    let mut builder = ServerBuilder::new().with_config(config);
    builder.registry.route_fn("/health", |ctx, _| {
        ctx.set_mime_type("text/plain")?;
        ctx.write_str("ok\n")
    });
    builder.registry.worker_fn("visits", |ctx, _| {
        let visits = ctx
            .persistent_parameter("visits")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        ctx.set_persistent_parameter("visits", visits.to_string());
        ctx.set_mime_type("text/plain")?;
        ctx.write_str(&format!("visits: {}\n", visits))
    });

    EmberServer::from_builder(builder).start().await?;
    Ok(())
}

//! Tessera admission webhook

use clap::{CommandFactory, Parser, Subcommand};
use kube::CustomResourceExt;

use tessera_common::crd::TesseraDB;
use tessera_common::telemetry::{init_telemetry, TelemetryConfig};
use tessera_webhook::config::ServeArgs;
use tessera_webhook::server::start_server;

/// Tessera - admission webhook for TesseraDB resources
#[derive(Parser, Debug)]
#[command(name = "tessera-webhook", version, about, long_about = None)]
struct Cli {
    /// Print the TesseraDB CRD manifest and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve /mutate and /validate over HTTPS
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&TesseraDB::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    let Some(Commands::Serve(args)) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        anyhow::bail!("failed to install crypto provider: {e:?}");
    }

    init_telemetry(TelemetryConfig {
        service_name: "tessera-webhook".to_string(),
        format: args.log_format,
    })?;

    let config = args.load().await?;
    start_server(config).await?;
    Ok(())
}

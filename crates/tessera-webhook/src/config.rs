//! Process configuration for the `serve` command

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Args;
use tessera_common::telemetry::LogFormat;

use crate::error::WebhookError;

/// Default listen address
pub const DEFAULT_ADDR: &str = "0.0.0.0:9443";

/// Certificate location used by the webhook Deployment
pub const DEFAULT_TLS_CERT: &str = "/etc/tessera/webhook/tls.crt";

/// Private key location used by the webhook Deployment
pub const DEFAULT_TLS_KEY: &str = "/etc/tessera/webhook/tls.key";

/// Flags of the `serve` command; every flag can also come from the environment
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind the HTTPS listener
    #[arg(long, env = "TESSERA_WEBHOOK_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: SocketAddr,

    /// PEM certificate presented to the API server
    #[arg(long, env = "TESSERA_WEBHOOK_TLS_CERT", default_value = DEFAULT_TLS_CERT)]
    pub tls_cert: PathBuf,

    /// PEM private key of the certificate
    #[arg(long, env = "TESSERA_WEBHOOK_TLS_KEY", default_value = DEFAULT_TLS_KEY)]
    pub tls_key: PathBuf,

    /// Log output format (json or plain)
    #[arg(long, env = "TESSERA_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

/// Server configuration with the key material loaded
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the server
    pub addr: SocketAddr,
    /// TLS certificate PEM
    pub cert_pem: Vec<u8>,
    /// TLS private key PEM
    pub key_pem: Vec<u8>,
}

impl ServeArgs {
    /// Read the certificate and key from disk
    pub async fn load(&self) -> Result<ServerConfig, WebhookError> {
        Ok(ServerConfig {
            addr: self.addr,
            cert_pem: read_pem(&self.tls_cert).await?,
            key_pem: read_pem(&self.tls_key).await?,
        })
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, WebhookError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| WebhookError::Config(format!("cannot read {}: {e}", path.display())))?;
    if bytes.is_empty() {
        return Err(WebhookError::Config(format!("{} is empty", path.display())));
    }
    Ok(bytes)
}

//! HTTPS admission server

use axum::routing::{get, post};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::WebhookError;
use crate::handlers::{mutate_handler, validate_handler};

/// Routes served to the API server
pub fn router() -> Router {
    Router::new()
        .route("/mutate", post(mutate_handler))
        .route("/validate", post(validate_handler))
        .route("/healthz", get(|| async { "ok" }))
}

/// Serve admission reviews until the listener fails
pub async fn start_server(config: ServerConfig) -> Result<(), WebhookError> {
    let tls_config = RustlsConfig::from_pem(config.cert_pem, config.key_pem)
        .await
        .map_err(|e| WebhookError::Config(format!("TLS config error: {e}")))?;

    info!(addr = %config.addr, "starting admission webhook");

    axum_server::bind_rustls(config.addr, tls_config)
        .serve(router().into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_healthz() {
        let response = router()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_review_is_rejected() {
        let response = router()
            .oneshot(
                Request::post("/validate")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"apiVersion":"admission.k8s.io/v1","kind":"AdmissionReview"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_pem_is_a_config_error() {
        let config = ServerConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
            cert_pem: b"not a certificate".to_vec(),
            key_pem: b"not a key".to_vec(),
        };
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        assert!(matches!(
            start_server(config).await,
            Err(WebhookError::Config(_))
        ));
    }
}

//! TLS certificates for the listener.
//!
//! Certificates are loaded once at startup. A reloaded configuration re-reads
//! the PEM files into the same `RustlsConfig`, so rotated certificates apply
//! to new connections without a restart.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::schema::TlsConfig;

/// Load the listener certificate and key.
pub async fn load_tls(config: &TlsConfig) -> io::Result<RustlsConfig> {
    require_files(config)?;
    let rustls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path).await?;
    tracing::info!(cert = %config.cert_path, "TLS certificate loaded");
    Ok(rustls)
}

/// Re-read the PEM files into a live `RustlsConfig`. On error the previous
/// certificate stays in use.
pub async fn reload_tls(rustls: &RustlsConfig, config: &TlsConfig) -> io::Result<()> {
    require_files(config)?;
    rustls
        .reload_from_pem_file(&config.cert_path, &config.key_path)
        .await?;
    tracing::info!(cert = %config.cert_path, "TLS certificate reloaded");
    Ok(())
}

/// Report every missing PEM file in one error.
fn require_files(config: &TlsConfig) -> io::Result<()> {
    let missing: Vec<String> = [("certificate", &config.cert_path), ("private key", &config.key_path)]
        .into_iter()
        .filter(|(_, path)| !Path::new(path.as_str()).exists())
        .map(|(what, path)| format!("{} '{}'", what, path))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("TLS files not found: {}", missing.join(", ")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_files_are_all_reported() {
        let config = TlsConfig {
            cert_path: "missing-cert.pem".to_string(),
            key_path: "missing-key.pem".to_string(),
        };
        let err = load_tls(&config).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let message = err.to_string();
        assert!(message.contains("certificate 'missing-cert.pem'"));
        assert!(message.contains("private key 'missing-key.pem'"));
    }

    #[test]
    fn test_only_missing_key_is_reported() {
        let cert = std::env::temp_dir().join("purchase-verifier-tls-test-cert.pem");
        std::fs::write(&cert, "placeholder").unwrap();
        let config = TlsConfig {
            cert_path: cert.to_string_lossy().into_owned(),
            key_path: "missing-key.pem".to_string(),
        };

        let message = require_files(&config).unwrap_err().to_string();
        assert!(!message.contains("certificate"));
        assert!(message.contains("private key 'missing-key.pem'"));

        let _ = std::fs::remove_file(cert);
    }
}

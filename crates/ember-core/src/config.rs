use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ServerError};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Size of the connection worker pool.
    pub threads: usize,
    /// Used as the session owner when a request carries no `Host` header.
    pub default_domain: String,
    pub document_root: PathBuf,
    pub script_extension: String,
    pub index_file: String,
    pub session_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub encoding: String,
    pub default_mime: String,
    pub mime_types: HashMap<String, String>,
    /// Paths under this prefix are reachable only through internal dispatch.
    pub private_prefix: String,
    /// Paths under this prefix name a worker registered by name.
    pub worker_prefix: String,
    pub max_header_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            threads: num_cpus::get(),
            default_domain: "localhost".to_string(),
            document_root: PathBuf::from("www"),
            script_extension: "tmpl".to_string(),
            index_file: "index.html".to_string(),
            session_timeout_secs: 30 * 60,
            sweep_interval_secs: 60,
            encoding: "UTF-8".to_string(),
            default_mime: "application/octet-stream".to_string(),
            mime_types: default_mime_types(),
            private_prefix: "/private/".to_string(),
            worker_prefix: "/workers/".to_string(),
            max_header_bytes: 16 * 1024,
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document; omitted keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: ServerConfig =
            toml::from_str(source).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(ServerError::Config("threads must be at least 1".into()));
        }
        for (key, prefix) in [
            ("private_prefix", &self.private_prefix),
            ("worker_prefix", &self.worker_prefix),
        ] {
            if !prefix.starts_with('/') || !prefix.ends_with('/') {
                return Err(ServerError::Config(format!(
                    "{} must start and end with '/', got '{}'",
                    key, prefix
                )));
            }
        }
        if self.max_header_bytes == 0 {
            return Err(ServerError::Config("max_header_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ServerError::Config(format!("bad listen address: {}", e)))
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn default_mime_types() -> HashMap<String, String> {
    [
        ("html", "text/html"),
        ("htm", "text/html"),
        ("txt", "text/plain"),
        ("css", "text/css"),
        ("csv", "text/csv"),
        ("js", "application/javascript"),
        ("json", "application/json"),
        ("xml", "application/xml"),
        ("pdf", "application/pdf"),
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("svg", "image/svg+xml"),
        ("ico", "image/x-icon"),
        ("xls", "application/vnd.ms-excel"),
    ]
    .into_iter()
    .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
    .collect()
}

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

// =============================================================================
// Unified config (figment-deserialized from defaults / castr.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   castr.toml:      [server]
//                    port = 9000
//
//   env var:         CASTR_SERVER__PORT=9000   (double underscore = nesting)
//
//   (single underscore stays within field names: CASTR_RECEIVER__INITIAL_TITLE)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub receiver: ReceiverFileConfig,
}

/// Listen settings (lives under `[server]` in castr.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Receiver presentation settings (lives under `[receiver]` in castr.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceiverFileConfig {
    #[serde(default = "default_application_name")]
    pub application_name: String,
    #[serde(default = "default_initial_title")]
    pub initial_title: String,
}

impl Default for ReceiverFileConfig {
    fn default() -> Self {
        Self {
            application_name: default_application_name(),
            initial_title: default_initial_title(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

// The local control port casting devices traditionally expose.
fn default_port() -> u16 {
    8008
}

fn default_application_name() -> String {
    "Cast Receiver".to_string()
}

fn default_initial_title() -> String {
    "Ready".to_string()
}

/// Build a figment that layers: defaults → castr.toml → CASTR_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `CASTR_SERVER__PORT=9000`  →  `server.port = 9000`
///   `CASTR_RECEIVER__APPLICATION_NAME=Den`  →  `receiver.application_name = "Den"`
pub fn load_config(config_path: Option<&Path>) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    let toml_path = config_path.unwrap_or_else(|| Path::new("castr.toml"));

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(toml_path))
        .merge(Env::prefixed("CASTR_").split("__"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address {addr}: {source}")]
    ListenAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

// =============================================================================
// Runtime config structs (derived from FileConfig, used throughout the server)
// =============================================================================

/// Where the receiver listens (runtime view).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_file(fc: &ServerFileConfig) -> Self {
        Self {
            host: fc.host.clone(),
            port: fc.port,
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|source| ConfigError::ListenAddr {
            addr: addr.clone(),
            source,
        })
    }
}

/// Receiver presentation configuration (runtime view).
#[derive(Clone, Debug)]
pub struct ReceiverConfig {
    /// Name shown on the status page header.
    pub application_name: String,
    /// Title displayed before any sender has cast.
    pub initial_title: String,
}

impl ReceiverConfig {
    pub fn from_file(fc: &ReceiverFileConfig) -> Self {
        Self {
            application_name: fc.application_name.clone(),
            initial_title: fc.initial_title.clone(),
        }
    }
}

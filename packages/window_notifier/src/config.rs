use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::error::NotifierError;

// =============================================================================
// File config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
//   config.toml:     [server]
//                    ws_port = 9000
//
//   env var:         WINDOW_SERVER__WS_PORT=9000   (double underscore = nesting)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub notifier: NotifierFileConfig,
}

/// Listener settings (lives under `[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            control_port: default_control_port(),
            ws_port: default_ws_port(),
        }
    }
}

/// Per-sink delivery knobs (lives under `[notifier]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotifierFileConfig {
    /// Frames a sink may have queued before it counts as too slow.
    #[serde(default = "default_sink_buffer")]
    pub sink_buffer: usize,
    /// Budget for writing one frame to a socket.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for NotifierFileConfig {
    fn default() -> Self {
        Self {
            sink_buffer: default_sink_buffer(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_control_port() -> u16 {
    5000
}
fn default_ws_port() -> u16 {
    8765
}
fn default_sink_buffer() -> usize {
    16
}
fn default_send_timeout_ms() -> u64 {
    2000
}

/// Build a figment that layers: defaults → config.toml (if given) → WINDOW_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `WINDOW_SERVER__CONTROL_PORT=8080`  →  `server.control_port = 8080`
///   `WINDOW_NOTIFIER__SINK_BUFFER=32`  →  `notifier.sink_buffer = 32`
pub fn load_config(config_file: Option<&Path>) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    let mut figment = Figment::from(Serialized::defaults(FileConfig::default()));
    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(Env::prefixed("WINDOW_").split("__"))
}

/// Command-line values that win over every other layer.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub control_port: Option<u16>,
    pub ws_port: Option<u16>,
}

// =============================================================================
// Runtime config (derived from FileConfig, used throughout the server)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub control_addr: SocketAddr,
    pub ws_addr: SocketAddr,
    pub ws: WsSettings,
}

#[derive(Clone, Copy, Debug)]
pub struct WsSettings {
    /// Outbox capacity per sink
    pub sink_buffer: usize,
    /// Per-frame write budget
    pub send_timeout: Duration,
}

impl WsSettings {
    pub fn from_file(fc: &NotifierFileConfig) -> Self {
        Self {
            sink_buffer: fc.sink_buffer.max(1),
            send_timeout: Duration::from_millis(fc.send_timeout_ms),
        }
    }
}

impl ServerConfig {
    pub fn from_file(fc: &FileConfig, overrides: &CliOverrides) -> Result<Self, NotifierError> {
        let host = overrides.host.as_deref().unwrap_or(&fc.server.host);
        let ip: IpAddr = host
            .parse()
            .map_err(|_| NotifierError::InvalidAddress(host.to_string()))?;
        let control_port = overrides.control_port.unwrap_or(fc.server.control_port);
        let ws_port = overrides.ws_port.unwrap_or(fc.server.ws_port);

        Ok(Self {
            control_addr: SocketAddr::new(ip, control_port),
            ws_addr: SocketAddr::new(ip, ws_port),
            ws: WsSettings::from_file(&fc.notifier),
        })
    }

    /// Load every layer and resolve it.
    pub fn load(config_file: Option<&Path>, overrides: &CliOverrides) -> Result<Self, NotifierError> {
        let fc: FileConfig = load_config(config_file)
            .extract()
            .map_err(|e| NotifierError::Config(Box::new(e)))?;
        Self::from_file(&fc, overrides)
    }
}

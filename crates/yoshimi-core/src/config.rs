//! Configuration types for the yoshimi server.
//!
//! Configuration is assembled once at startup: defaults, then an optional
//! YAML file, then environment overrides. It is read-only afterwards and
//! shared between sessions behind an `Arc`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener and process settings
    pub server: ServerSettings,
    /// Secret gate settings
    pub gate: GateSettings,
    /// External script settings
    pub script: ScriptSettings,
    /// Optional session features
    pub features: FeatureSet,
    /// Menu action settings
    pub menu: MenuSettings,
    /// Widget sizing
    pub terminal: TerminalSettings,
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// The result is not validated; secrets usually arrive later from the
    /// environment.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Recognised names: `HOST`, `PORT`, `HOST_KEY`, `CORRECT_PHRASE`,
    /// `SCRIPT_PATH`, `SCRIPT_TIMEOUT`, `MAX_SESSIONS`, `YOSHIMI_MENU`,
    /// `YOSHIMI_MULTILINE_BODY`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = parse_number("PORT", &port)?;
        }
        if let Some(path) = get("HOST_KEY") {
            self.server.host_key = PathBuf::from(path);
        }
        if let Some(max) = get("MAX_SESSIONS") {
            self.server.max_sessions = parse_number("MAX_SESSIONS", &max)?;
        }
        if let Some(secret) = get("CORRECT_PHRASE") {
            self.gate.secret = secret;
        }
        if let Some(path) = get("SCRIPT_PATH") {
            self.script.path = PathBuf::from(path);
        }
        if let Some(secs) = get("SCRIPT_TIMEOUT") {
            self.script.timeout_secs = parse_number("SCRIPT_TIMEOUT", &secs)?;
        }
        if let Some(flag) = get("YOSHIMI_MENU") {
            self.features.has_menu = parse_flag("YOSHIMI_MENU", &flag)?;
        }
        if let Some(flag) = get("YOSHIMI_MULTILINE_BODY") {
            self.features.multiline_body = parse_flag("YOSHIMI_MULTILINE_BODY", &flag)?;
        }

        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be > 0".to_string()));
        }

        if self.server.max_sessions == 0 {
            return Err(Error::Config("server.max_sessions must be > 0".to_string()));
        }

        if self.gate.secret.is_empty() {
            return Err(Error::Config(
                "gate.secret must not be empty (set CORRECT_PHRASE)".to_string(),
            ));
        }

        if self.script.path.as_os_str().is_empty() {
            return Err(Error::Config(
                "script.path must not be empty (set SCRIPT_PATH)".to_string(),
            ));
        }

        let t = &self.terminal;
        if t.secret_width == 0 || t.secret_box_width == 0 || t.field_width == 0 {
            return Err(Error::Config("terminal widths must be > 0".to_string()));
        }

        Ok(())
    }

    /// Address string the listener binds to.
    pub fn bind_address(&self) -> String {
        if self.server.host.contains(':') {
            format!("[{}]:{}", self.server.host, self.server.port)
        } else {
            format!("{}:{}", self.server.host, self.server.port)
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name}: not a number: {value}")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{name}: not a boolean: {value}"))),
    }
}

/// Listener and process settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to listen on
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Path to the host private key
    pub host_key: PathBuf,
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,
    /// Graceful shutdown bound in seconds
    pub shutdown_timeout_secs: u64,
    /// Idle connection timeout in seconds (0 = no timeout)
    pub inactivity_timeout_secs: u64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl ServerSettings {
    /// Graceful shutdown bound.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Idle connection timeout, if any.
    pub fn inactivity_timeout(&self) -> Option<Duration> {
        (self.inactivity_timeout_secs > 0).then(|| Duration::from_secs(self.inactivity_timeout_secs))
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 23234,
            host_key: PathBuf::from(".ssh/id_ed25519"),
            max_sessions: 64,
            shutdown_timeout_secs: 30,
            inactivity_timeout_secs: 3600,
            log_level: "info".to_string(),
        }
    }
}

/// Secret gate settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    /// Phrase compared verbatim against user input
    pub secret: String,
}

/// External script settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Executable invoked as `path title body`
    pub path: PathBuf,
    /// Per-invocation bound in seconds (0 = wait forever)
    pub timeout_secs: u64,
}

impl ScriptSettings {
    /// Per-invocation bound, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Optional session features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeatureSet {
    /// Show the action menu between the gate and the form
    pub has_menu: bool,
    /// Let the body field hold several lines
    pub multiline_body: bool,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            has_menu: true,
            multiline_body: false,
        }
    }
}

/// Menu action settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MenuSettings {
    /// Public key shown by the `ssh key` action (defaults to `~/.ssh/id_ed25519.pub`)
    pub public_key_path: Option<PathBuf>,
    /// Command run by the `typing` action
    pub typing_command: String,
}

impl MenuSettings {
    /// Resolved public key path, if one can be determined.
    pub fn public_key_path(&self) -> Option<PathBuf> {
        self.public_key_path
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".ssh").join("id_ed25519.pub")))
    }
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            public_key_path: None,
            typing_command: "thokr".to_string(),
        }
    }
}

/// Widget sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    /// Visible width of the secret input
    pub secret_width: u16,
    /// Width of the box the secret input is centered in
    pub secret_box_width: u16,
    /// Visible width of the title and body fields
    pub field_width: u16,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            secret_width: 32,
            secret_box_width: 40,
            field_width: 50,
        }
    }
}

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use shared::domain::{parse_address, Address, TOKEN_DECIMALS};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub rpc_url: String,
    pub contract_address: Address,
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
    pub request_timeout: Duration,
    pub token_decimals: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:1248".into(),
            contract_address: Address::ZERO,
            poll_interval: Duration::from_millis(4000),
            receipt_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            token_decimals: TOKEN_DECIMALS,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse settings file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid contract address '{value}'")]
    InvalidAddress { value: String },
    #[error("invalid rpc url '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },
    #[error("invalid value '{value}' for {key}")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    rpc_url: Option<String>,
    contract_address: Option<String>,
    poll_interval_ms: Option<u64>,
    receipt_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    token_decimals: Option<u8>,
}

/// Loads settings from `path` (or `dashboard.toml` in the working directory)
/// and applies environment overrides on top.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &path, &raw)?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {}
        Err(source) => return Err(SettingsError::Io { path, source }),
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    validate(&settings)?;

    if settings.contract_address == Address::ZERO {
        warn!("settings: contract address is unset; reads will target the zero address");
    }
    Ok(settings)
}

fn apply_file(settings: &mut Settings, path: &Path, raw: &str) -> Result<(), SettingsError> {
    let file_cfg: FileSettings = toml::from_str(raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(v) = file_cfg.rpc_url {
        settings.rpc_url = v;
    }
    if let Some(v) = file_cfg.contract_address {
        settings.contract_address = parse_contract_address(&v)?;
    }
    if let Some(v) = file_cfg.poll_interval_ms {
        settings.poll_interval = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.receipt_timeout_secs {
        settings.receipt_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.token_decimals {
        settings.token_decimals = v;
    }
    Ok(())
}

/// Later keys in each list win, so the `APP__` form overrides the bare one.
pub(crate) fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), SettingsError> {
    let last = |keys: &[&str]| keys.iter().filter_map(|&key| lookup(key)).last();

    if let Some(v) = last(&["RPC_URL", "APP__RPC_URL"]) {
        settings.rpc_url = v;
    }
    if let Some(v) = last(&["CONTRACT_ADDRESS", "APP__CONTRACT_ADDRESS"]) {
        settings.contract_address = parse_contract_address(&v)?;
    }
    if let Some(v) = last(&["APP__POLL_INTERVAL_MS"]) {
        settings.poll_interval = Duration::from_millis(parse_number("poll_interval_ms", &v)?);
    }
    if let Some(v) = last(&["APP__RECEIPT_TIMEOUT_SECS"]) {
        settings.receipt_timeout =
            Duration::from_secs(parse_number("receipt_timeout_secs", &v)?);
    }
    if let Some(v) = last(&["APP__REQUEST_TIMEOUT_SECS"]) {
        settings.request_timeout =
            Duration::from_secs(parse_number("request_timeout_secs", &v)?);
    }
    if let Some(v) = last(&["APP__TOKEN_DECIMALS"]) {
        settings.token_decimals = v
            .trim()
            .parse::<u8>()
            .map_err(|_| SettingsError::InvalidNumber {
                key: "token_decimals",
                value: v.clone(),
            })?;
    }
    Ok(())
}

pub fn parse_contract_address(raw: &str) -> Result<Address, SettingsError> {
    parse_address(raw).map_err(|err| SettingsError::InvalidAddress { value: err.value })
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, SettingsError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| SettingsError::InvalidNumber {
            key,
            value: raw.to_string(),
        })
}

pub fn validate(settings: &Settings) -> Result<(), SettingsError> {
    let url = url::Url::parse(&settings.rpc_url).map_err(|err| SettingsError::InvalidUrl {
        value: settings.rpc_url.clone(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SettingsError::InvalidUrl {
            value: settings.rpc_url.clone(),
            reason: "rpc url must start with http:// or https://".to_string(),
        });
    }
    if settings.token_decimals > 77 {
        return Err(SettingsError::InvalidNumber {
            key: "token_decimals",
            value: settings.token_decimals.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            Path::new("dashboard.toml"),
            r#"
                rpc_url = "http://10.0.0.2:8545"
                contract_address = "0x00000000000000000000000000000000000000aa"
                poll_interval_ms = 250
            "#,
        )
        .expect("file settings");
        assert_eq!(settings.rpc_url, "http://10.0.0.2:8545");
        assert_eq!(settings.poll_interval, Duration::from_millis(250));

        apply_env_overrides(
            &mut settings,
            lookup_from(&[
                ("RPC_URL", "http://bare:8545"),
                ("APP__RPC_URL", "http://prefixed:8545"),
                ("APP__RECEIPT_TIMEOUT_SECS", "12"),
            ]),
        )
        .expect("env overrides");
        assert_eq!(settings.rpc_url, "http://prefixed:8545");
        assert_eq!(settings.receipt_timeout, Duration::from_secs(12));
        assert_eq!(
            settings.contract_address,
            parse_contract_address("0x00000000000000000000000000000000000000AA").expect("addr")
        );
    }

    #[test]
    fn rejects_invalid_contract_address() {
        let mut settings = Settings::default();
        let err = apply_env_overrides(
            &mut settings,
            lookup_from(&[("CONTRACT_ADDRESS", "0x1234")]),
        )
        .expect_err("short address");
        assert!(matches!(err, SettingsError::InvalidAddress { .. }));
    }

    #[test]
    fn rejects_non_http_rpc_url() {
        let settings = Settings {
            rpc_url: "ws://127.0.0.1:8546".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            validate(&settings),
            Err(SettingsError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn loads_explicit_settings_file() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("token_dashboard_settings_{suffix}.toml"));
        fs::write(&path, "request_timeout_secs = 5\ntoken_decimals = 6\n").expect("write");

        let settings = load_settings(Some(&path)).expect("load settings");
        assert_eq!(settings.token_decimals, 6);
        assert_eq!(settings.request_timeout, Duration::from_secs(5));

        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_settings(Some(Path::new("/definitely/not/here.toml")))
            .expect_err("missing file");
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}

use std::{env, path::PathBuf, str::FromStr, time::Duration};
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/fleet.json";
const DEFAULT_RELOAD_SECS: u64 = 2;
const DEFAULT_VIEW_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    /// `None` disables watching the data file.
    pub reload_interval: Option<Duration>,
    pub view_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let reload_secs = parse_or(&lookup, "FLEETX_RELOAD_SECS", DEFAULT_RELOAD_SECS);
        Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            data_path: lookup("FLEETX_DATA_PATH")
                .filter(|path| !path.trim().is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_PATH), PathBuf::from),
            reload_interval: (reload_secs > 0).then(|| Duration::from_secs(reload_secs)),
            view_timeout: Duration::from_millis(parse_or(
                &lookup,
                "FLEETX_VIEW_TIMEOUT_MS",
                DEFAULT_VIEW_TIMEOUT_MS,
            )),
        }
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_env() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_path, PathBuf::from("data/fleet.json"));
        assert_eq!(config.reload_interval, Some(Duration::from_secs(2)));
        assert_eq!(config.view_timeout, Duration::from_millis(3000));
    }

    #[test]
    fn env_overrides_and_disables_reload() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("FLEETX_DATA_PATH", "/tmp/fleet.json"),
            ("FLEETX_RELOAD_SECS", "0"),
            ("FLEETX_VIEW_TIMEOUT_MS", "250"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_path, PathBuf::from("/tmp/fleet.json"));
        assert_eq!(config.reload_interval, None);
        assert_eq!(config.view_timeout, Duration::from_millis(250));
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = config_from(&[("PORT", "eighty"), ("FLEETX_RELOAD_SECS", "-1")]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.reload_interval, Some(Duration::from_secs(2)));
    }
}

use std::str::FromStr;
use std::time::Duration;

use crate::model::Ms;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub resource_count: u32,
    pub label_prefix: String,
    pub sweep_interval: Duration,
    pub start_grace_ms: Ms,
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.key, self.value)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sweep_secs: u64 = parse_or(&lookup, "CLUBSLOT_SWEEP_INTERVAL_SECS", 5)?;
        let grace_secs: i64 = parse_or(&lookup, "CLUBSLOT_START_GRACE_SECS", 300)?;
        if sweep_secs == 0 {
            return Err(ConfigError {
                key: "CLUBSLOT_SWEEP_INTERVAL_SECS",
                value: "0".into(),
            });
        }
        if grace_secs < 0 {
            return Err(ConfigError {
                key: "CLUBSLOT_START_GRACE_SECS",
                value: grace_secs.to_string(),
            });
        }

        Ok(Self {
            bind: lookup("CLUBSLOT_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "CLUBSLOT_PORT", 5000)?,
            resource_count: parse_or(&lookup, "CLUBSLOT_RESOURCE_COUNT", 12)?,
            label_prefix: lookup("CLUBSLOT_LABEL_PREFIX").unwrap_or_else(|| "PC-".into()),
            sweep_interval: Duration::from_secs(sweep_secs),
            start_grace_ms: grace_secs * 1000,
            metrics_port: parse_opt(&lookup, "CLUBSLOT_METRICS_PORT")?,
        })
    }
}

fn parse_opt<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { key, value: raw }),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0");
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.resource_count, 12);
        assert_eq!(cfg.label_prefix, "PC-");
        assert_eq!(cfg.sweep_interval, Duration::from_secs(5));
        assert_eq!(cfg.start_grace_ms, 300_000);
        assert_eq!(cfg.metrics_port, None);
    }

    #[test]
    fn overrides() {
        let cfg = from_pairs(&[
            ("CLUBSLOT_PORT", "8080"),
            ("CLUBSLOT_RESOURCE_COUNT", " 20 "),
            ("CLUBSLOT_LABEL_PREFIX", "Seat "),
            ("CLUBSLOT_METRICS_PORT", "9100"),
            ("CLUBSLOT_START_GRACE_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.resource_count, 20);
        assert_eq!(cfg.label_prefix, "Seat ");
        assert_eq!(cfg.metrics_port, Some(9100));
        assert_eq!(cfg.start_grace_ms, 60_000);
    }

    #[test]
    fn bad_values_are_errors() {
        let err = from_pairs(&[("CLUBSLOT_PORT", "eighty")]).unwrap_err();
        assert_eq!(err.key, "CLUBSLOT_PORT");
        assert!(err.to_string().contains("eighty"));

        assert!(from_pairs(&[("CLUBSLOT_SWEEP_INTERVAL_SECS", "0")]).is_err());
        assert!(from_pairs(&[("CLUBSLOT_START_GRACE_SECS", "-1")]).is_err());
    }
}

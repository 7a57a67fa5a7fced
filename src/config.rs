//! Server configuration from environment variables.
//!
//! | Variable                  | Default   |
//! |---------------------------|-----------|
//! | `BIND_ADDR`               | `0.0.0.0` |
//! | `PORT`                    | `3000`    |
//! | `CLIENT_CHANNEL_CAPACITY` | `256`     |
//!
//! A `.env` file is loaded by `main` before this runs. A variable that is set
//! but unparsable (or not valid unicode) is an error rather than a silent
//! fallback.

use std::env::VarError;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Outbound messages buffered per session before drops start.
    pub client_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0".into(), port: 3000, client_channel_capacity: 256 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key: &str| std::env::var(key))
    }

    /// Read configuration through a `std::env::var`-shaped lookup (tests pass
    /// a map).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Result<String, VarError>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let bind_addr = env_string(&lookup, "BIND_ADDR")?.unwrap_or(defaults.bind_addr);
        let port = env_parse(&lookup, "PORT", defaults.port)?;
        let client_channel_capacity = env_parse(&lookup, "CLIENT_CHANNEL_CAPACITY", defaults.client_channel_capacity)?;
        if client_channel_capacity == 0 {
            return Err(ConfigError::Invalid { key: "CLIENT_CHANNEL_CAPACITY", value: "0".into() });
        }
        Ok(Self { bind_addr, port, client_channel_capacity })
    }

    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn env_string(
    lookup: &impl Fn(&str) -> Result<String, VarError>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match lookup(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(ConfigError::Invalid { key, value: raw.to_string_lossy().into_owned() }),
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Result<String, VarError>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match env_string(lookup, key)? {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn variables_override_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1"),
            ("PORT", " 8080 "),
            ("CLIENT_CHANNEL_CAPACITY", "32"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.client_channel_capacity, 32);
    }

    #[test]
    fn unparsable_port_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
        assert_eq!(err.to_string(), "invalid value for PORT: \"eighty\"");
    }

    #[test]
    fn non_unicode_value_is_an_error() {
        use std::ffi::OsString;

        let lookup = |key: &str| -> Result<String, VarError> {
            if key == "BIND_ADDR" {
                Err(VarError::NotUnicode(OsString::from("bad-addr")))
            } else {
                Err(VarError::NotPresent)
            }
        };
        let err = ServerConfig::from_lookup(lookup).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BIND_ADDR", .. }));
    }

    #[test]
    fn zero_capacity_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[("CLIENT_CHANNEL_CAPACITY", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CLIENT_CHANNEL_CAPACITY", .. }));
    }
}

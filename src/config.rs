//! Server configuration
//!
//! Defaults, overridden by environment variables, overridden by the first
//! command-line argument (a full bind address).

use std::collections::HashMap;

use crate::error::ConfigError;

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port
pub const DEFAULT_PORT: u16 = 2000;

/// Default per-client output channel size
pub const DEFAULT_SINK_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the listener binds to
    pub addr: String,
    /// Lines buffered per client before senders wait
    pub sink_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: format!("{DEFAULT_HOST}:{DEFAULT_PORT}"),
            sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }
}

impl Config {
    /// Build from the process environment and arguments
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(std::env::vars().collect(), std::env::args().nth(1))
    }

    /// Build from explicit variables and an optional address argument
    ///
    /// Reads `IP_ADDRESS`, `PORT` and `CHAT_SINK_CAPACITY`.
    pub fn from_sources(
        vars: HashMap<String, String>,
        addr_arg: Option<String>,
    ) -> Result<Self, ConfigError> {
        let host = vars
            .get("IP_ADDRESS")
            .filter(|host| !host.is_empty())
            .map_or(DEFAULT_HOST, String::as_str);

        let port = match vars.get("PORT").filter(|port| !port.is_empty()) {
            Some(port) => port.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: port.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let sink_capacity = match vars.get("CHAT_SINK_CAPACITY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "CHAT_SINK_CAPACITY",
                        value: raw.clone(),
                    })
                }
            },
            None => DEFAULT_SINK_CAPACITY,
        };

        let addr = addr_arg.unwrap_or_else(|| format!("{host}:{port}"));

        Ok(Self {
            addr,
            sink_capacity,
        })
    }
}

//! Server configuration parsed from environment variables.

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_ROOM_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_MAX_STROKE_POINTS: usize = crate::room::staging::DEFAULT_MAX_STROKE_POINTS;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?} (expected {expected})")]
    Invalid { var: &'static str, value: String, expected: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Outbound frame queue per connection. Frames past this are dropped.
    pub client_channel_capacity: usize,
    /// Inbound command queue per room actor.
    pub room_queue_capacity: usize,
    /// Points one open stroke may stage before further points are dropped.
    pub max_stroke_points: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
            room_queue_capacity: DEFAULT_ROOM_QUEUE_CAPACITY,
            max_stroke_points: DEFAULT_MAX_STROKE_POINTS,
        }
    }
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `HOST`: bind address, default `0.0.0.0`
    /// - `PORT`: default 3000
    /// - `CLIENT_CHANNEL_CAPACITY`: default 256
    /// - `ROOM_QUEUE_CAPACITY`: default 1024
    /// - `MAX_STROKE_POINTS`: default 10000
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but does not parse
    /// as a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = env_parse_positive("PORT", DEFAULT_PORT)?;
        let client_channel_capacity = env_parse_positive("CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY)?;
        let room_queue_capacity = env_parse_positive("ROOM_QUEUE_CAPACITY", DEFAULT_ROOM_QUEUE_CAPACITY)?;
        let max_stroke_points = env_parse_positive("MAX_STROKE_POINTS", DEFAULT_MAX_STROKE_POINTS)?;

        Ok(Self { host, port, client_channel_capacity, room_queue_capacity, max_stroke_points })
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse_positive<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Ok(raw) = std::env::var(var) else {
        return Ok(default);
    };
    parse_positive(var, &raw)
}

fn parse_positive<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ConfigError::Invalid { var, value: raw.to_string(), expected: "a positive integer" }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use crate::model::Basket;
use crate::session::SessionConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub game: GameConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            game: GameConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
    max_sessions: usize,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "BASKET_PUZZLE_API_HOST";
    const PORT_VAR: &'static str = "BASKET_PUZZLE_API_PORT";
    const MAX_SESSIONS_VAR: &'static str = "BASKET_PUZZLE_MAX_SESSIONS";
    pub const DEFAULT_MAX_SESSIONS: usize = 256;

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = load_with_warning(
            Self::PORT_VAR,
            Self::DEFAULT_PORT,
            |value| value != 0,
            "must not be 0",
        );

        let max_sessions = load_with_warning(
            Self::MAX_SESSIONS_VAR,
            Self::DEFAULT_MAX_SESSIONS,
            |value| value > 0,
            "must be greater than 0",
        );

        Self {
            bind_ip,
            display_host,
            port,
            max_sessions,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of sessions kept in memory before the least recently used one is evicted.
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Round and basket settings shared by every session the server creates.
#[derive(Clone, Debug)]
pub struct GameConfig {
    session: SessionConfig,
}

impl GameConfig {
    const ROUND_SECONDS_VAR: &'static str = "BASKET_PUZZLE_ROUND_SECONDS";
    const MAX_STOCK_VAR: &'static str = "BASKET_PUZZLE_MAX_STOCK";
    const BASKET_WIDTH_VAR: &'static str = "BASKET_PUZZLE_BASKET_WIDTH";
    const BASKET_DEPTH_VAR: &'static str = "BASKET_PUZZLE_BASKET_DEPTH";
    const BASKET_HEIGHT_VAR: &'static str = "BASKET_PUZZLE_BASKET_HEIGHT";
    const MAX_STOCK_LIMIT: usize = 32;

    fn from_env() -> Self {
        let round_seconds = load_with_warning(
            Self::ROUND_SECONDS_VAR,
            SessionConfig::DEFAULT_ROUND_DURATION_MS / 1000,
            |value| value > 0,
            "must be greater than 0",
        );

        let max_stock = load_with_warning(
            Self::MAX_STOCK_VAR,
            SessionConfig::DEFAULT_MAX_STOCK,
            |value| value <= Self::MAX_STOCK_LIMIT,
            "must be between 0 and 32",
        );

        let width = load_dimension(Self::BASKET_WIDTH_VAR, Basket::DEFAULT_WIDTH);
        let depth = load_dimension(Self::BASKET_DEPTH_VAR, Basket::DEFAULT_DEPTH);
        let height = load_dimension(Self::BASKET_HEIGHT_VAR, Basket::DEFAULT_HEIGHT);
        let basket = Basket::new(width, height, depth).unwrap_or_else(|err| {
            eprintln!("⚠️ Invalid basket configuration: {}. Using defaults.", err);
            Basket::default()
        });

        Self::new(
            SessionConfig::builder()
                .basket(basket)
                .round_duration_ms(round_seconds.saturating_mul(1000))
                .max_stock(max_stock)
                .build(),
        )
    }

    pub fn new(session: SessionConfig) -> Self {
        Self { session }
    }

    /// Returns the configured SessionConfig.
    pub fn session_config(&self) -> SessionConfig {
        self.session
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn load_dimension(var_name: &str, default: f64) -> f64 {
    let value = load_with_warning(
        var_name,
        default,
        |value: f64| value.is_finite() && value > 0.0,
        "must be greater than 0",
    );
    if (value - default).abs() > f64::EPSILON {
        println!(
            "⚠️ Warning: Adjusted basket size changes scoring and the item fit ({} = {}).",
            var_name, value
        );
    }
    value
}

fn load_with_warning<T>(
    var_name: &str,
    default: T,
    validator: impl Fn(T) -> bool,
    invalid_hint: &str,
) -> T
where
    T: FromStr + Copy + Display,
    T::Err: Display,
{
    match env_string(var_name) {
        Some(raw) => parse_with_warning(var_name, &raw, default, validator, invalid_hint),
        None => default,
    }
}

fn parse_with_warning<T>(
    var_name: &str,
    raw: &str,
    default: T,
    validator: impl Fn(T) -> bool,
    invalid_hint: &str,
) -> T
where
    T: FromStr + Copy + Display,
    T::Err: Display,
{
    match raw.parse::<T>() {
        Ok(value) if validator(value) => value,
        Ok(_) => {
            eprintln!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            eprintln!(
                "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_valid_values() {
        assert_eq!(parse_with_warning("TEST_VAR", "9090", 8080u16, |v| v != 0, "hint"), 9090);
        assert_eq!(parse_with_warning("TEST_VAR", "2.5", 12.0, |v| v > 0.0, "hint"), 2.5);
        assert_eq!(parse_with_warning("TEST_VAR", "0", 7usize, |v| v <= 32, "hint"), 0);
    }

    #[test]
    fn test_parse_falls_back_on_invalid_values() {
        assert_eq!(parse_with_warning("TEST_VAR", "0", 8080u16, |v| v != 0, "hint"), 8080);
        assert_eq!(parse_with_warning("TEST_VAR", "-3", 12.0, |v| v > 0.0, "hint"), 12.0);
        assert_eq!(parse_with_warning("TEST_VAR", "33", 7usize, |v| v <= 32, "hint"), 7);
    }

    #[test]
    fn test_parse_falls_back_on_garbage() {
        assert_eq!(parse_with_warning("TEST_VAR", "abc", 8080u16, |_| true, "hint"), 8080);
        assert_eq!(parse_with_warning("TEST_VAR", "12cm", 12.0, |_| true, "hint"), 12.0);
        assert_eq!(parse_with_warning("TEST_VAR", "-1", 7usize, |_| true, "hint"), 7);
    }

    #[test]
    fn test_missing_variable_uses_default() {
        assert_eq!(
            load_with_warning("BASKET_PUZZLE_TEST_UNSET_VARIABLE", 42u64, |_| true, "hint"),
            42
        );
        assert_eq!(
            load_dimension("BASKET_PUZZLE_TEST_UNSET_DIMENSION", Basket::DEFAULT_DEPTH),
            9.0
        );
    }

    #[test]
    fn test_session_limit_rejects_zero() {
        assert_eq!(
            parse_with_warning(
                ApiConfig::MAX_SESSIONS_VAR,
                "0",
                ApiConfig::DEFAULT_MAX_SESSIONS,
                |v| v > 0,
                "hint"
            ),
            256
        );
        assert_eq!(
            load_with_warning(
                "BASKET_PUZZLE_TEST_UNSET_SESSIONS",
                ApiConfig::DEFAULT_MAX_SESSIONS,
                |v| v > 0,
                "hint"
            ),
            256
        );
    }

    #[test]
    fn test_default_game_config_matches_session_defaults() {
        let config = GameConfig::default().session_config();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.round_duration_ms, 180_000);
        assert_eq!(config.basket, Basket::default());
    }
}

use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use crate::loader::XDistributionConfig;
use crate::model::Trailer;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub loader: LoaderConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            loader: LoaderConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const HOST_VAR: &'static str = "TRAILER_LOADER_API_HOST";
    const PORT_VAR: &'static str = "TRAILER_LOADER_API_PORT";
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        Self::from_values(env_string(Self::HOST_VAR), env_string(Self::PORT_VAR))
    }

    fn from_values(host: Option<String>, port: Option<String>) -> Self {
        let host_value = host.unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                tracing::warn!(
                    var = Self::HOST_VAR,
                    value = %host_value,
                    %err,
                    "could not parse host, using {}",
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match port {
            Some(raw) => parse_value(
                Self::PORT_VAR,
                &raw,
                Self::DEFAULT_PORT,
                |value| *value != 0,
                "must not be 0",
            ),
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
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

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Service-wide defaults for loading requests.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    strategy: XDistributionConfig,
    trailer: Trailer,
}

impl LoaderConfig {
    const ZONES_VAR: &'static str = "TRAILER_LOADER_ZONES";
    const BALANCING_FACTOR_VAR: &'static str = "TRAILER_LOADER_BALANCING_FACTOR";
    const GRID_GRANULARITY_VAR: &'static str = "TRAILER_LOADER_GRID_GRANULARITY";
    const TRAILER_LENGTH_VAR: &'static str = "TRAILER_LOADER_TRAILER_LENGTH";
    const TRAILER_WIDTH_VAR: &'static str = "TRAILER_LOADER_TRAILER_WIDTH";
    const TRAILER_HEIGHT_VAR: &'static str = "TRAILER_LOADER_TRAILER_HEIGHT";
    const TRAILER_MAX_WEIGHT_VAR: &'static str = "TRAILER_LOADER_TRAILER_MAX_WEIGHT";

    fn from_env() -> Self {
        let zones = load_with_warning(
            Self::ZONES_VAR,
            XDistributionConfig::DEFAULT_ZONES,
            |value| (1..=XDistributionConfig::MAX_ZONES).contains(value),
            "must be between 1 and 1000",
        );
        let balancing_factor = load_with_warning(
            Self::BALANCING_FACTOR_VAR,
            XDistributionConfig::DEFAULT_BALANCING_FACTOR,
            |value| value.is_finite() && *value >= 0.0,
            "must be 0 or greater",
        );
        let grid_granularity = load_with_warning(
            Self::GRID_GRANULARITY_VAR,
            XDistributionConfig::DEFAULT_GRID_GRANULARITY,
            |value| value.is_finite() && *value > 0.0,
            "must be greater than 0",
        );

        let strategy = XDistributionConfig::builder()
            .zones(zones)
            .balancing_factor(balancing_factor)
            .grid_granularity(grid_granularity)
            .build();

        let positive = |var: &str, default: f64| {
            load_with_warning(
                var,
                default,
                |value: &f64| value.is_finite() && *value > 0.0,
                "must be greater than 0",
            )
        };
        let dims = (
            positive(Self::TRAILER_LENGTH_VAR, Trailer::STANDARD_LENGTH),
            positive(Self::TRAILER_WIDTH_VAR, Trailer::STANDARD_WIDTH),
            positive(Self::TRAILER_HEIGHT_VAR, Trailer::STANDARD_HEIGHT),
        );
        let max_weight = positive(Self::TRAILER_MAX_WEIGHT_VAR, Trailer::STANDARD_MAX_WEIGHT);
        let trailer = Trailer::new(dims, max_weight).unwrap_or_else(|err| {
            tracing::warn!(%err, "invalid default trailer, using the standard trailer");
            Trailer::standard()
        });

        Self { strategy, trailer }
    }

    /// Strategy configuration used when a request does not override it.
    pub fn strategy(&self) -> XDistributionConfig {
        self.strategy
    }

    /// Empty trailer used when a request does not describe one.
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            strategy: XDistributionConfig::default(),
            trailer: Trailer::standard(),
        }
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
            tracing::warn!(var = name, %err, "environment access failed, using default value");
            None
        }
    }
}

fn load_with_warning<T>(
    var_name: &str,
    default: T,
    validator: impl Fn(&T) -> bool,
    invalid_hint: &str,
) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env_string(var_name) {
        Some(raw) => parse_value(var_name, &raw, default, validator, invalid_hint),
        None => default,
    }
}

fn parse_value<T>(
    var_name: &str,
    raw: &str,
    default: T,
    validator: impl Fn(&T) -> bool,
    invalid_hint: &str,
) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(value) if validator(&value) => {
            tracing::info!(var = var_name, %value, "using configured value");
            value
        }
        Ok(_) => {
            tracing::warn!(
                var = var_name,
                value = raw,
                "invalid value: {}, using {}",
                invalid_hint,
                default
            );
            default
        }
        Err(err) => {
            tracing::warn!(
                var = var_name,
                value = raw,
                %err,
                "could not parse value, using {}",
                default
            );
            default
        }
    }
}

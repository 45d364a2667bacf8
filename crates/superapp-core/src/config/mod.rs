use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::payroll::{IncentiveCurve, IncentiveTier, PayrollError, PayrollRates};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub payroll: PayrollRates,
}

const DEFAULT_PPN_RATE: &str = "0.11";
const DEFAULT_PPH21_RATE: &str = "0.05";
const DEFAULT_INCENTIVE_POOL_PERCENT: &str = "0.10";
const DEFAULT_PENSION_WAGE_CAP: i64 = 10_042_300;

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            payroll: load_payroll_rates()?,
        })
    }
}

fn load_payroll_rates() -> Result<PayrollRates, ConfigError> {
    let ppn_rate = decimal_var("APP_PPN_RATE", DEFAULT_PPN_RATE)?;
    let pph21_rate = decimal_var("APP_PPH21_RATE", DEFAULT_PPH21_RATE)?;

    let pension_wage_cap = match env::var("APP_PENSION_WAGE_CAP") {
        Ok(raw) => {
            let cap = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "APP_PENSION_WAGE_CAP",
                    value: raw.clone(),
                })?;
            (cap > 0).then_some(cap)
        }
        Err(_) => Some(DEFAULT_PENSION_WAGE_CAP),
    };

    let incentive = match env::var("APP_INCENTIVE_TIERS") {
        Ok(raw) if !raw.trim().is_empty() => IncentiveCurve::Tiered {
            tiers: parse_tiers(&raw)?,
        },
        _ => IncentiveCurve::Linear {
            pool_percent: decimal_var(
                "APP_INCENTIVE_POOL_PERCENT",
                DEFAULT_INCENTIVE_POOL_PERCENT,
            )?,
        },
    };

    let rates = PayrollRates {
        pph21_rate,
        ppn_rate,
        pension_wage_cap,
        incentive,
    };
    rates.validate().map_err(ConfigError::Payroll)?;
    Ok(rates)
}

fn decimal_var(name: &'static str, default: &str) -> Result<Decimal, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    Decimal::from_str(raw.trim()).map_err(|_| ConfigError::InvalidValue { name, value: raw })
}

/// Parses `min_score:percent` pairs separated by commas, e.g. `60:0.05,90:0.15`.
fn parse_tiers(raw: &str) -> Result<Vec<IncentiveTier>, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        name: "APP_INCENTIVE_TIERS",
        value: raw.to_string(),
    };
    raw.split(',')
        .map(|pair| -> Result<IncentiveTier, ConfigError> {
            let (score, percent) = pair.split_once(':').ok_or_else(invalid)?;
            Ok(IncentiveTier {
                min_score: Decimal::from_str(score.trim()).map_err(|_| invalid())?,
                percent_of_base: Decimal::from_str(percent.trim()).map_err(|_| invalid())?,
            })
        })
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Full,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" | "verbose" => Self::Full,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
    Payroll(PayrollError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an unparseable value '{value}'")
            }
            ConfigError::Payroll(err) => write!(f, "payroll settings rejected: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Payroll(err) => Some(err),
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "APP_PPN_RATE",
            "APP_PPH21_RATE",
            "APP_INCENTIVE_POOL_PERCENT",
            "APP_INCENTIVE_TIERS",
            "APP_PENSION_WAGE_CAP",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert_eq!(config.payroll.ppn_rate, Decimal::new(11, 2));
        assert_eq!(config.payroll.pph21_rate, Decimal::new(5, 2));
        assert_eq!(config.payroll.pension_wage_cap, Some(DEFAULT_PENSION_WAGE_CAP));
        assert_eq!(
            config.payroll.incentive,
            IncentiveCurve::Linear {
                pool_percent: Decimal::new(10, 2)
            }
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn out_of_range_tax_rate_is_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PPH21_RATE", "1.5");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(
            result,
            Err(ConfigError::Payroll(PayrollError::InvalidRates(_)))
        ));
    }

    #[test]
    fn unparseable_rate_names_the_variable() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PPN_RATE", "eleven percent");
        let result = AppConfig::load();
        reset_env();
        match result {
            Err(ConfigError::InvalidValue { name, .. }) => assert_eq!(name, "APP_PPN_RATE"),
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn tiered_incentives_and_disabled_pension_cap() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_INCENTIVE_TIERS", "60:0.05, 90:0.15");
        env::set_var("APP_PENSION_WAGE_CAP", "0");
        let config = AppConfig::load().expect("config loads");
        reset_env();
        assert_eq!(config.payroll.pension_wage_cap, None);
        match config.payroll.incentive {
            IncentiveCurve::Tiered { tiers } => {
                assert_eq!(tiers.len(), 2);
                assert_eq!(tiers[1].min_score, Decimal::from(90));
            }
            other => panic!("expected tiered curve, got {other:?}"),
        }
    }
}

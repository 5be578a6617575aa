use std::env;
use std::time::Duration;

use crate::engine::dispatch::DispatchSettings;
use crate::engine::reschedule::DEFAULT_MAX_RESCHEDULES;
use crate::error::AppError;
use crate::models::job::JobDefaults;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub notification_queue_size: usize,
    pub payment_timeout_secs: u64,
    pub payment_currency: String,
    pub payment_simulator: bool,
    pub default_max_reschedules: u32,
    pub default_delivery_range_km: f64,
    pub obfuscation_radius_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            notification_queue_size: 1024,
            payment_timeout_secs: 15,
            payment_currency: "eur".to_string(),
            payment_simulator: false,
            default_max_reschedules: DEFAULT_MAX_RESCHEDULES,
            default_delivery_range_km: 20.0,
            obfuscation_radius_m: 300.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            notification_queue_size: parse_or_default(
                "NOTIFICATION_QUEUE_SIZE",
                defaults.notification_queue_size,
            )?,
            payment_timeout_secs: parse_or_default(
                "PAYMENT_TIMEOUT_SECS",
                defaults.payment_timeout_secs,
            )?,
            payment_currency: env::var("PAYMENT_CURRENCY").unwrap_or(defaults.payment_currency),
            payment_simulator: parse_or_default("PAYMENT_SIMULATOR", defaults.payment_simulator)?,
            default_max_reschedules: parse_or_default(
                "DEFAULT_MAX_RESCHEDULES",
                defaults.default_max_reschedules,
            )?,
            default_delivery_range_km: parse_or_default(
                "DEFAULT_DELIVERY_RANGE_KM",
                defaults.default_delivery_range_km,
            )?,
            obfuscation_radius_m: parse_or_default(
                "OBFUSCATION_RADIUS_M",
                defaults.obfuscation_radius_m,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.default_max_reschedules == 0 {
            return Err(AppError::Internal(
                "DEFAULT_MAX_RESCHEDULES must be > 0".to_string(),
            ));
        }
        if !self.default_delivery_range_km.is_finite() || self.default_delivery_range_km <= 0.0 {
            return Err(AppError::Internal(
                "DEFAULT_DELIVERY_RANGE_KM must be > 0".to_string(),
            ));
        }
        if !self.obfuscation_radius_m.is_finite() || self.obfuscation_radius_m < 0.0 {
            return Err(AppError::Internal(
                "OBFUSCATION_RADIUS_M must be >= 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            job_defaults: JobDefaults {
                max_reschedules: self.default_max_reschedules,
                obfuscation_radius_m: self.obfuscation_radius_m,
            },
            default_delivery_range_km: self.default_delivery_range_km,
            payment_timeout: Duration::from_secs(self.payment_timeout_secs),
            currency: self.payment_currency.clone(),
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Config;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        config.validate().unwrap();

        let settings = config.dispatch_settings();
        assert_eq!(settings.job_defaults.max_reschedules, 2);
        assert_eq!(settings.payment_timeout, Duration::from_secs(15));
        assert_eq!(settings.default_delivery_range_km, 20.0);
    }

    #[test]
    fn zero_reschedules_is_rejected() {
        let config = Config {
            default_max_reschedules: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}

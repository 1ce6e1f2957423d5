use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub asap_offer_expiry_minutes: i64,
    pub asap_eta_minutes: i64,
    pub driver_max_active_orders: usize,
    pub slot_window_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            asap_offer_expiry_minutes: 10,
            asap_eta_minutes: 30,
            driver_max_active_orders: 3,
            slot_window_minutes: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            asap_offer_expiry_minutes: parse_or_default(
                "ASAP_OFFER_EXPIRY_MINUTES",
                defaults.asap_offer_expiry_minutes,
            )?,
            asap_eta_minutes: parse_or_default("ASAP_ETA_MINUTES", defaults.asap_eta_minutes)?,
            driver_max_active_orders: parse_or_default(
                "DRIVER_MAX_ACTIVE_ORDERS",
                defaults.driver_max_active_orders,
            )?,
            slot_window_minutes: parse_or_default(
                "SLOT_WINDOW_MINUTES",
                defaults.slot_window_minutes,
            )?,
        }
        .validated()
    }

    fn validated(self) -> Result<Self, AppError> {
        if self.slot_window_minutes <= 0 {
            return Err(AppError::Internal(
                "SLOT_WINDOW_MINUTES must be positive".to_string(),
            ));
        }
        if self.asap_offer_expiry_minutes <= 0 {
            return Err(AppError::Internal(
                "ASAP_OFFER_EXPIRY_MINUTES must be positive".to_string(),
            ));
        }
        Ok(self)
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

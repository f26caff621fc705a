use serde::Deserialize;

use crate::timestamps::DisplayOptions;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TOP_N: usize = 5;
const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Ranked entries returned when a request does not pass `limit`.
    pub default_top_n: usize,
    /// Upper bound on request bodies.
    pub max_body_bytes: usize,
    /// Offset from UTC, in minutes, used to display lead timestamps.
    pub display_utc_offset_minutes: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_top_n: DEFAULT_TOP_N,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            display_utc_offset_minutes: 0,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            default_top_n: std::env::var("DEFAULT_TOP_N")
                .unwrap_or_else(|_| DEFAULT_TOP_N.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DEFAULT_TOP_N must be a non-negative integer"))?,
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| DEFAULT_MAX_BODY_BYTES.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a positive integer"))
                .and_then(|bytes: usize| {
                    if bytes == 0 {
                        anyhow::bail!("MAX_BODY_BYTES cannot be zero");
                    }
                    Ok(bytes)
                })?,
            display_utc_offset_minutes: std::env::var("DISPLAY_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DISPLAY_UTC_OFFSET_MINUTES must be an integer"))
                .and_then(|minutes: i32| {
                    if minutes.abs() > MAX_OFFSET_MINUTES {
                        anyhow::bail!("DISPLAY_UTC_OFFSET_MINUTES must be within ±{}", MAX_OFFSET_MINUTES);
                    }
                    Ok(minutes)
                })?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Default top-N: {}", config.default_top_n);
        tracing::debug!("Max body bytes: {}", config.max_body_bytes);
        tracing::debug!(
            "Display UTC offset: {} minute(s)",
            config.display_utc_offset_minutes
        );

        Ok(config)
    }

    /// Display options derived from the configured offset.
    pub fn display_options(&self) -> anyhow::Result<DisplayOptions> {
        DisplayOptions::from_offset_minutes(self.display_utc_offset_minutes).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid display offset: {} minute(s)",
                self.display_utc_offset_minutes
            )
        })
    }
}

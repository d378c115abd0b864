use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
    #[serde(default)]
    pub business_hours: BusinessHoursConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret_key: String,
    pub webhook_secret: String,
    /// Outbound request timeout in seconds. Timed-out calls are reported as
    /// failed, never retried here.
    #[serde(default = "default_gateway_timeout")]
    pub request_timeout_secs: u64,
}

fn default_gateway_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub webhook_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    pub points_per_dollar: i64,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            points_per_dollar: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayHours {
    #[serde(default)]
    pub open: String,
    #[serde(default)]
    pub close: String,
    #[serde(default)]
    pub closed: bool,
}

impl DayHours {
    fn open_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        if self.closed {
            return None;
        }
        let open = NaiveTime::parse_from_str(&self.open, "%H:%M").ok()?;
        let close = NaiveTime::parse_from_str(&self.close, "%H:%M").ok()?;
        Some((open, close))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHoursConfig {
    pub monday: DayHours,
    pub tuesday: DayHours,
    pub wednesday: DayHours,
    pub thursday: DayHours,
    pub friday: DayHours,
    pub saturday: DayHours,
    pub sunday: DayHours,
}

impl Default for BusinessHoursConfig {
    fn default() -> Self {
        let weekday = || DayHours {
            open: "09:00".to_string(),
            close: "17:00".to_string(),
            closed: false,
        };
        let closed = || DayHours {
            open: String::new(),
            close: String::new(),
            closed: true,
        };
        Self {
            monday: weekday(),
            tuesday: weekday(),
            wednesday: weekday(),
            thursday: weekday(),
            friday: weekday(),
            saturday: weekday(),
            sunday: closed(),
        }
    }
}

impl BusinessHoursConfig {
    /// Open/close window for a weekday, `None` when the day is marked closed
    /// or the configured times fail to parse.
    pub fn window_for(&self, weekday: Weekday) -> Option<(NaiveTime, NaiveTime)> {
        let day = match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        };
        day.open_window()
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse {config_path}: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // Without a config file the database URL must come from the
                // environment.
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    gateway: GatewayConfig {
                        base_url: get_env("GATEWAY_BASE_URL")
                            .unwrap_or_else(|| "https://api.payments.example.com".to_string()),
                        secret_key: get_env("GATEWAY_SECRET_KEY").unwrap_or_default(),
                        webhook_secret: get_env("GATEWAY_WEBHOOK_SECRET").unwrap_or_default(),
                        request_timeout_secs: get_env_parse(
                            "GATEWAY_REQUEST_TIMEOUT_SECS",
                            default_gateway_timeout(),
                        ),
                    },
                    notifications: NotificationConfig {
                        enabled: get_env_parse("NOTIFICATIONS_ENABLED", false),
                        webhook_url: get_env("NOTIFICATIONS_WEBHOOK_URL").unwrap_or_default(),
                    },
                    loyalty: LoyaltyConfig {
                        points_per_dollar: get_env_parse("LOYALTY_POINTS_PER_DOLLAR", 1i64),
                    },
                    business_hours: BusinessHoursConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment overrides apply even when the file exists.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(p) = v.parse() {
                config.server.port = p;
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(mc) = v.parse() {
                config.database.max_connections = mc;
            }
        }
        if let Ok(v) = env::var("GATEWAY_BASE_URL") {
            config.gateway.base_url = v;
        }
        if let Ok(v) = env::var("GATEWAY_SECRET_KEY") {
            config.gateway.secret_key = v;
        }
        if let Ok(v) = env::var("GATEWAY_WEBHOOK_SECRET") {
            config.gateway.webhook_secret = v;
        }
        if let Ok(v) = env::var("GATEWAY_REQUEST_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                config.gateway.request_timeout_secs = n;
            }
        }
        if let Ok(v) = env::var("NOTIFICATIONS_WEBHOOK_URL") {
            config.notifications.webhook_url = v;
            config.notifications.enabled = true;
        }
        if let Ok(v) = env::var("LOYALTY_POINTS_PER_DOLLAR") {
            if let Ok(n) = v.parse() {
                config.loyalty.points_per_dollar = n;
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hours_weekday_open() {
        let hours = BusinessHoursConfig::default();
        let (open, close) = hours.window_for(Weekday::Mon).unwrap();
        assert_eq!(open, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(close, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
    }

    #[test]
    fn default_hours_sunday_closed() {
        let hours = BusinessHoursConfig::default();
        assert!(hours.window_for(Weekday::Sun).is_none());
    }

    #[test]
    fn unparseable_times_treated_as_closed() {
        let day = DayHours {
            open: "9am".to_string(),
            close: "5pm".to_string(),
            closed: false,
        };
        assert!(day.open_window().is_none());
    }
}

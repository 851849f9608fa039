use serde::{Deserialize, Serialize};
use std::env;

/// Default webhook source ranges. Deployments set the list published by the
/// gateway through `CIELO_WEBHOOK_ALLOWED_IPS` (comma separated CIDRs).
pub const DEFAULT_CIELO_WEBHOOK_RANGES: &[&str] = &[
    "209.134.48.0/24",
    "209.134.49.0/24",
    "209.134.50.0/24",
    "209.134.51.0/24",
    "200.155.128.0/20",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub cielo: CieloConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub renewal: RenewalConfig,
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
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CieloConfig {
    pub merchant_id: String,
    pub merchant_key: String,
    #[serde(default = "default_cielo_api_url")]
    pub api_url: String,
    #[serde(default = "default_cielo_query_url")]
    pub query_url: String,
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_webhook_ranges")]
    pub webhook_allowed_ips: Vec<String>,
    #[serde(default = "default_soft_descriptor")]
    pub soft_descriptor: String,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

/// SMTP is optional: with no host configured notifications are simulated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub from_name: Option<String>,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        self.host.as_deref().is_some_and(|h| !h.is_empty())
            && self.user.as_deref().is_some_and(|u| !u.is_empty())
            && self.pass.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn from_header(&self) -> String {
        let email = self
            .from_email
            .clone()
            .or_else(|| self.user.clone())
            .unwrap_or_else(|| "noreply@unipetplan.com.br".to_string());
        let name = self
            .from_name
            .clone()
            .unwrap_or_else(|| "UNIPET PLAN".to_string());
        format!("{name} <{email}>")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// `production`, `staging`, `development`...
    pub environment: String,
    /// Base URL used in email call-to-action links.
    pub public_url: String,
    /// Honour `x-forwarded-for` / `x-real-ip` when resolving client IPs.
    pub trust_proxy: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            public_url: "https://unipetplan.com.br".to_string(),
            trust_proxy: true,
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub reminder_interval_secs: u64,
    pub reminder_days_before: i64,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 6 * 3600,
            reminder_interval_secs: 24 * 3600,
            reminder_days_before: 3,
        }
    }
}

fn default_cielo_api_url() -> String {
    "https://apisandbox.cieloecommerce.cielo.com.br".to_string()
}

fn default_cielo_query_url() -> String {
    "https://apiquerysandbox.cieloecommerce.cielo.com.br".to_string()
}

fn default_webhook_ranges() -> Vec<String> {
    DEFAULT_CIELO_WEBHOOK_RANGES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_soft_descriptor() -> String {
    "UNIPETPLAN".to_string()
}

fn default_gateway_timeout() -> u64 {
    30
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => toml::from_str(&config_str)
                .map_err(|e| format!("Failed to parse config file: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env()?,
            Err(e) => {
                return Err(format!("Cannot read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Builds the configuration from environment variables and defaults only.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let database_url = get_env("DATABASE_URL")
            .ok_or("DATABASE_URL is not set and no config.toml was found")?;

        Ok(Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET")
                    .unwrap_or_else(|| "change-me-in-production".to_string()),
                access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
            },
            cielo: CieloConfig {
                merchant_id: get_env("CIELO_MERCHANT_ID").unwrap_or_default(),
                merchant_key: get_env("CIELO_MERCHANT_KEY").unwrap_or_default(),
                api_url: get_env("CIELO_API_URL").unwrap_or_else(default_cielo_api_url),
                query_url: get_env("CIELO_QUERY_URL").unwrap_or_else(default_cielo_query_url),
                webhook_secret: get_env("CIELO_WEBHOOK_SECRET"),
                webhook_allowed_ips: get_env("CIELO_WEBHOOK_ALLOWED_IPS")
                    .map(|v| split_list(&v))
                    .unwrap_or_else(default_webhook_ranges),
                soft_descriptor: get_env("CIELO_SOFT_DESCRIPTOR")
                    .unwrap_or_else(default_soft_descriptor),
                timeout_secs: get_env_parse("CIELO_TIMEOUT_SECS", default_gateway_timeout()),
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST"),
                port: get_env("SMTP_PORT").and_then(|v| v.parse().ok()),
                user: get_env("SMTP_USER"),
                pass: get_env("SMTP_PASS"),
                from_email: get_env("SMTP_FROM_EMAIL"),
                from_name: get_env("SMTP_FROM_NAME"),
            },
            app: AppConfig {
                environment: get_env("APP_ENV")
                    .or_else(|| get_env("NODE_ENV"))
                    .unwrap_or_else(|| "development".to_string()),
                public_url: get_env("PUBLIC_URL")
                    .unwrap_or_else(|| AppConfig::default().public_url),
                trust_proxy: get_env_parse("TRUST_PROXY", true),
            },
            renewal: RenewalConfig {
                enabled: get_env_parse("RENEWAL_ENABLED", true),
                interval_secs: get_env_parse("RENEWAL_INTERVAL_SECS", 6 * 3600u64),
                reminder_interval_secs: get_env_parse("REMINDER_INTERVAL_SECS", 24 * 3600u64),
                reminder_days_before: get_env_parse("REMINDER_DAYS_BEFORE", 3i64),
            },
        })
    }

    // Environment variables win over the file, even when the file exists.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get_env("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get_env("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(v) = get_env("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(v) = get_env("CIELO_MERCHANT_ID") {
            self.cielo.merchant_id = v;
        }
        if let Some(v) = get_env("CIELO_MERCHANT_KEY") {
            self.cielo.merchant_key = v;
        }
        if let Some(v) = get_env("CIELO_API_URL") {
            self.cielo.api_url = v;
        }
        if let Some(v) = get_env("CIELO_QUERY_URL") {
            self.cielo.query_url = v;
        }
        if let Some(v) = get_env("CIELO_WEBHOOK_SECRET") {
            self.cielo.webhook_secret = Some(v);
        }
        if let Some(v) = get_env("CIELO_WEBHOOK_ALLOWED_IPS") {
            self.cielo.webhook_allowed_ips = split_list(&v);
        }
        if let Some(v) = get_env("SMTP_HOST") {
            self.smtp.host = Some(v);
        }
        if let Some(v) = get_env("SMTP_PORT")
            && let Ok(p) = v.parse()
        {
            self.smtp.port = Some(p);
        }
        if let Some(v) = get_env("SMTP_USER") {
            self.smtp.user = Some(v);
        }
        if let Some(v) = get_env("SMTP_PASS") {
            self.smtp.pass = Some(v);
        }
        if let Some(v) = get_env("SMTP_FROM_EMAIL") {
            self.smtp.from_email = Some(v);
        }
        if let Some(v) = get_env("APP_ENV").or_else(|| get_env("NODE_ENV")) {
            self.app.environment = v;
        }
        if let Some(v) = get_env("PUBLIC_URL") {
            self.app.public_url = v;
        }
    }
}

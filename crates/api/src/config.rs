use cruisemall_core::margin::DEFAULT_CARD_FEE_BPS;
use cruisemall_core::passport::DEFAULT_LINK_TTL_DAYS;
use cruisemall_core::schedule::DEFAULT_DISPATCH_INTERVAL_SECS;
use cruisemall_core::types::Bps;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the JWT
/// secret.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Grace period for background jobs to stop after the server drains.
    pub shutdown_timeout_secs: u64,
    /// Base URL customers see in passport links and message bodies.
    pub public_base_url: String,
    /// Shared secret for payment webhook signatures. Webhooks are refused
    /// while unset.
    pub payment_webhook_secret: Option<String>,
    pub passport_link_ttl_days: i64,
    /// Card processing fee used by the margin calculator when the request
    /// does not give one.
    pub card_fee_bps: Bps,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `HOST`                   | `0.0.0.0`                  |
    /// | `PORT`                   | `3000`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `30`                       |
    /// | `PUBLIC_BASE_URL`        | `http://localhost:5173`    |
    /// | `PAYMENT_WEBHOOK_SECRET` | unset                      |
    /// | `PASSPORT_LINK_TTL_DAYS` | `14`                       |
    /// | `CARD_FEE_BPS`           | `250`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let payment_webhook_secret = std::env::var("PAYMENT_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let passport_link_ttl_days: i64 = std::env::var("PASSPORT_LINK_TTL_DAYS")
            .unwrap_or_else(|_| DEFAULT_LINK_TTL_DAYS.to_string())
            .parse()
            .expect("PASSPORT_LINK_TTL_DAYS must be a valid i64");

        let card_fee_bps: Bps = std::env::var("CARD_FEE_BPS")
            .unwrap_or_else(|_| DEFAULT_CARD_FEE_BPS.to_string())
            .parse()
            .expect("CARD_FEE_BPS must be a valid i64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            public_base_url,
            payment_webhook_secret,
            passport_link_ttl_days,
            card_fee_bps,
            jwt: JwtConfig::from_env(),
        }
    }

    /// Public link for a passport submission token.
    pub fn passport_link(&self, token: &str) -> String {
        format!("{}/passport/{token}", self.public_base_url)
    }
}

/// Settings for the funnel / scheduled message dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub enabled: bool,
    /// Seconds between ticks; also the width of the due window.
    pub interval_secs: u64,
}

impl DispatchConfig {
    /// | Env Var                          | Default |
    /// |----------------------------------|---------|
    /// | `MESSAGE_DISPATCH_ENABLED`       | `true`  |
    /// | `MESSAGE_DISPATCH_INTERVAL_SECS` | `300`   |
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("MESSAGE_DISPATCH_ENABLED", true),
            interval_secs: std::env::var("MESSAGE_DISPATCH_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_DISPATCH_INTERVAL_SECS.to_string())
                .parse()
                .expect("MESSAGE_DISPATCH_INTERVAL_SECS must be a valid u64"),
        }
    }
}

/// Where backups go and when the daily run happens.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub enabled: bool,
    /// Local directory sink, used when no upload URL is configured.
    pub dir: String,
    /// Upload endpoint; takes precedence over `dir`.
    pub upload_url: Option<String>,
    pub upload_token: Option<String>,
    /// Hour of day (KST, 0-23) at which the scheduled backup runs.
    pub hour_kst: u32,
}

impl BackupConfig {
    /// | Env Var               | Default      |
    /// |-----------------------|--------------|
    /// | `BACKUP_ENABLED`      | `true`       |
    /// | `BACKUP_DIR`          | `./backups`  |
    /// | `BACKUP_UPLOAD_URL`   | unset        |
    /// | `BACKUP_UPLOAD_TOKEN` | unset        |
    /// | `BACKUP_HOUR_KST`     | `3`          |
    pub fn from_env() -> Self {
        let hour_kst: u32 = std::env::var("BACKUP_HOUR_KST")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("BACKUP_HOUR_KST must be a valid u32");
        assert!(hour_kst < 24, "BACKUP_HOUR_KST must be between 0 and 23");

        Self {
            enabled: env_flag("BACKUP_ENABLED", true),
            dir: std::env::var("BACKUP_DIR").unwrap_or_else(|_| "./backups".into()),
            upload_url: std::env::var("BACKUP_UPLOAD_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            upload_token: std::env::var("BACKUP_UPLOAD_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            hour_kst,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

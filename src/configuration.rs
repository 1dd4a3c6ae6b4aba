use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
    pub documents_dir: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing settings. The secret and algorithm tag are process-wide
/// configuration, never per-token.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub algorithm: String,
    pub access_token_expiry: i64,  // seconds (1800 = 30 minutes)
    pub refresh_token_expiry: i64, // seconds (604800 = 7 days)
}

/// Per-route request throttles, requests per minute keyed by client address.
/// `enabled: false` turns every limiter into a pass-through for test runs.
#[derive(serde::Deserialize, Clone)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub login_per_minute: u32,
    pub registration_per_minute: u32,
    pub health_per_minute: u32,
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.port", 8000_i64)?
        .set_default("application.documents_dir", "documents")?
        .set_default("jwt.algorithm", "HS256")?
        .set_default("jwt.access_token_expiry", 1800_i64)?
        .set_default("jwt.refresh_token_expiry", 604800_i64)?
        .set_default("rate_limit.enabled", true)?
        .set_default("rate_limit.login_per_minute", 60_i64)?
        .set_default("rate_limit.registration_per_minute", 10_i64)?
        .set_default("rate_limit.health_per_minute", 60_i64)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}

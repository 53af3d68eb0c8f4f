use config::ConfigError;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 9999;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_TOKEN_MAX_CONNECTIONS: u32 = 10;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub token: TokenSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    /// Size of the catalog pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Size of the separate token ledger pool. A rotating request holds one
    /// of these for its lease while its catalog write borrows from the
    /// catalog pool, so the two can never starve each other.
    #[serde(default = "default_token_max_connections")]
    pub token_max_connections: u32,
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

/// Bearer token settings
#[derive(serde::Deserialize, Clone)]
pub struct TokenSettings {
    /// Symmetric HS256 signing key shared by the whole process
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// Lifetime of every issued token, in seconds
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: i64,
}

fn default_ttl_seconds() -> i64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_token_max_connections() -> u32 {
    DEFAULT_TOKEN_MAX_CONNECTIONS
}

/// Load settings from `configuration.*` (optional) overlaid by `APP__*`
/// environment variables, e.g. `APP_TOKEN__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

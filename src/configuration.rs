use crate::auth::{Keypair, DEFAULT_ISSUER};
use crate::error::ConfigError;
use crate::middleware::CorsPolicy;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub cors: CorsSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// JWT signing settings
///
/// Key material is PEM, either inline or read from a file. A path wins over
/// the inline value when both are set.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    #[serde(default)]
    pub private_key_pem: String,
    #[serde(default)]
    pub public_key_pem: String,
    pub private_key_path: Option<String>,
    pub public_key_path: Option<String>,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

impl JwtSettings {
    /// Resolve and parse the configured keypair.
    pub fn keypair(&self) -> Result<Keypair, ConfigError> {
        let private_pem = resolve_pem(
            "jwt.private_key",
            &self.private_key_pem,
            self.private_key_path.as_deref(),
        )?;
        let public_pem = resolve_pem(
            "jwt.public_key",
            &self.public_key_pem,
            self.public_key_path.as_deref(),
        )?;

        Keypair::from_pem(&private_pem, &public_pem)
            .map_err(|e| ConfigError::InvalidValue(format!("jwt keys: {}", e)))
    }
}

fn resolve_pem(name: &str, inline: &str, path: Option<&str>) -> Result<String, ConfigError> {
    match path.filter(|p| !p.is_empty()) {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidValue(format!("{}: cannot read {}: {}", name, path, e))),
        None if inline.trim().is_empty() => Err(ConfigError::MissingRequired(name.to_string())),
        None => Ok(inline.to_string()),
    }
}

/// Origin allow-list: comma separated origins, or `*`
#[derive(serde::Deserialize, Clone, Default)]
pub struct CorsSettings {
    #[serde(default)]
    pub allowed_origins: String,
}

impl CorsSettings {
    pub fn policy(&self) -> CorsPolicy {
        CorsPolicy::parse(&self.allowed_origins)
    }
}

/// Session store selection
///
/// With `redis_url` set, sessions live in Redis; otherwise they are kept in
/// process and lost on restart.
#[derive(serde::Deserialize, Clone, Default)]
pub struct StoreSettings {
    pub redis_url: Option<String>,
}

impl StoreSettings {
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

/// Load settings from an optional `configuration.yaml` and `APP_*`
/// environment variables, e.g. `APP_APPLICATION__PORT=9000`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
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

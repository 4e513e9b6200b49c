use config::{Config, Environment};
use once_cell::sync::Lazy;
use serde::Deserialize;

pub static CONFIG: Lazy<QuizcastConfig> =
    Lazy::new(|| QuizcastConfig::from_env().unwrap_or_else(|e| panic!("Invalid config: {}", e)));

#[derive(Debug, Deserialize)]
pub struct QuizcastConfig {
    pub database_url: String,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl QuizcastConfig {
    fn from_env() -> Result<Self, config::ConfigError> {
        Config::builder()
            .set_default("server.address", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(
                Environment::with_prefix("QUIZCAST")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

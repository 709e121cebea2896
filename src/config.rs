use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub database_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("database_url", "postgresql://localhost/usage_metering")?
            .set_default("port", 3000)?
            .set_default("database_max_connections", 20)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

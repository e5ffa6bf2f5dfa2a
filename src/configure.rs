use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub listen_addr: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub token_address: String,
    pub mnemonic: String,
    pub recaptcha_secret: String,
    /// Decimal ether string, e.g. "25.0".
    pub token_per_request: String,
    /// Decimal ether string; balance ceiling per account.
    pub max_token: String,
    pub queue_size: usize,
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file: String,
}

fn builder_with_defaults(
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("listen_addr", "0.0.0.0:3000")?
        .set_default("rpc_url", "https://data-seed-prebsc-1-s3.binance.org:8545")?
        .set_default("chain_id", 97)?
        .set_default("token_address", "")?
        .set_default("mnemonic", "")?
        .set_default("recaptcha_secret", "")?
        .set_default("token_per_request", "25.0")?
        .set_default("max_token", "50.0")?
        .set_default("queue_size", 10)?
        .set_default("log_level", "info")?
        .set_default("log_to_file", false)?
        .set_default("log_file", "log/faucet.log")
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    let s = builder_with_defaults()?
        // Add configuration from a file, if present
        .add_source(File::with_name("config/config.yaml").required(false))
        // Add configuration from environment variables
        .add_source(config::Environment::with_prefix("FAUCET"))
        .build()?;

    s.try_deserialize()
}

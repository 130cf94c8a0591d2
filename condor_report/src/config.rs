use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/condor_report";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub readable: bool,
    pub pretty: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path = env::var("CONDOR_REPORT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

        let builder = Config::builder()
            .set_default("readable", false)?
            .set_default("pretty", true)?
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("condor_report"))
            .build()?;

        builder.try_deserialize()
    }
}

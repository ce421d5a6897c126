pub mod cli;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_url, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/BoliviaMaes/bolivia-maes/main/bolivia-maes.json";

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "maes-etl")]
#[command(about = "Consolidates the Bolivia MAEs dataset into a single queryable table")]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    pub source_url: String,

    #[arg(long, default_value = "data")]
    pub output_path: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ConfigProvider for CliConfig {
    fn source_url(&self) -> &str {
        &self.source_url
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("source_url", &self.source_url)?;
        validate_path("output_path", &self.output_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CliConfig::parse_from(["maes-etl"]);
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(config.output_path, "data");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_source_url_fails_validation() {
        let config = CliConfig::parse_from(["maes-etl", "--source-url", "not-a-url"]);
        assert!(config.validate().is_err());
    }
}

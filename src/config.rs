use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::domain::TariffPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tariff: TariffPolicy,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/solar_roi".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub path: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            path: "readings.csv".to_string(),
        }
    }
}

impl Config {
    /// Load `config/default.toml` when present, then environment overrides
    /// prefixed with `SOLAR_ROI__`. Every section has defaults, so a missing
    /// file is fine.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("SOLAR_ROI__").split("__"));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file_or_env() {
        figment::Jail::expect_with(|_| {
            let cfg = Config::load().expect("load");
            assert!((cfg.tariff.low_rate - 0.1).abs() < 1e-12);
            assert_eq!(cfg.tariff.low_start_hour, 23);
            assert_eq!(cfg.import.path, "readings.csv");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/default.toml",
                r#"
                [tariff]
                low_rate = 0.2
                high_rate = 0.4
                low_start_hour = 22
                low_end_hour = 7

                [import]
                path = "seed.csv"
                "#,
            )?;
            jail.set_env("SOLAR_ROI__TARIFF__LOW_RATE", "0.25");

            let cfg = Config::load().expect("load");
            assert!((cfg.tariff.low_rate - 0.25).abs() < 1e-12);
            assert!((cfg.tariff.high_rate - 0.4).abs() < 1e-12);
            assert_eq!(cfg.tariff.low_start_hour, 22);
            assert_eq!(cfg.import.path, "seed.csv");
            Ok(())
        });
    }
}

use super::{
    backtesting::BacktestingConfig,
    evolution::EvolutionConfig,
    strategy::StrategySettings,
    traits::ConfigSection,
};
use crate::error::EvotradeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Prefix of environment overrides, e.g. `EVOTRADE__EVOLUTION__SEED=7`
pub const ENV_PREFIX: &str = "EVOTRADE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub output_dir: PathBuf,
    pub write_csv: bool,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("results"),
            write_csv: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub backtesting: BacktestingConfig,
    pub strategy: StrategySettings,
    pub reporting: ReportingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), EvotradeError> {
        self.evolution.validate().map_err(section_error::<EvolutionConfig>)?;
        self.backtesting.validate().map_err(section_error::<BacktestingConfig>)?;
        self.strategy.validate().map_err(section_error::<StrategySettings>)?;
        Ok(())
    }
}

fn section_error<S: ConfigSection>(error: EvotradeError) -> EvotradeError {
    match error {
        EvotradeError::Configuration(msg) => {
            EvotradeError::Configuration(format!("[{}] {}", S::section_name(), msg))
        }
        other => other,
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvotradeError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EvotradeError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;

        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    /// Defaults, then the optional TOML file, then `EVOTRADE__SECTION__KEY` variables
    pub fn load_layered(&self, path: Option<&Path>) -> Result<(), EvotradeError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }

        let config: AppConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;

        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvotradeError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| EvotradeError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| EvotradeError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply a change; it is kept only if the result validates
    pub fn update<F>(&self, f: F) -> Result<(), EvotradeError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}

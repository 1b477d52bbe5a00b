use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Bounds and defaults mirror the original desktop client's sliders.
pub const MAX_TOKENS_RANGE: (u32, u32) = (10, 1024);
pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 1.0);
pub const DEFAULT_MAX_TOKENS: u32 = 128;
pub const DEFAULT_TEMPERATURE: f64 = 0.9;

/// Tunable generation parameters, always kept within the endpoint's
/// accepted ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenParams {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl GenParams {
    pub fn clamped(max_tokens: u32, temperature: f64) -> Self {
        Self {
            max_tokens: max_tokens.clamp(MAX_TOKENS_RANGE.0, MAX_TOKENS_RANGE.1),
            temperature: temperature.clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1),
        }
    }

    pub fn nudge_max_tokens(&mut self, delta: i64) {
        let next = self.max_tokens as i64 + delta;
        self.max_tokens = next.clamp(MAX_TOKENS_RANGE.0 as i64, MAX_TOKENS_RANGE.1 as i64) as u32;
    }

    pub fn nudge_temperature(&mut self, delta: f64) {
        self.temperature = (self.temperature + delta).clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1);
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    pub default_model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn get_config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "parley", "parley")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    /// Generation parameters from config, clamped, with slider defaults
    /// where unset.
    pub fn gen_params(&self) -> GenParams {
        GenParams::clamped(
            self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        )
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.default_model {
            Some(model) => println!("  default-model: {model}"),
            None => println!("  default-model: (unset)"),
        }
        match self.max_tokens {
            Some(value) => println!("  max-tokens: {value}"),
            None => println!("  max-tokens: (unset, default {DEFAULT_MAX_TOKENS})"),
        }
        match self.temperature {
            Some(value) => println!("  temperature: {value}"),
            None => println!("  temperature: (unset, default {DEFAULT_TEMPERATURE})"),
        }
    }
}

use std::error::Error;

use crate::core::config::Config;
use crate::core::models::load_builtin_models;

/// Print the built-in model catalog, marking the configured default.
pub fn list_models() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let models = load_builtin_models();

    println!("Available models:");
    for (index, model) in models.iter().enumerate() {
        let marker = match &config.default_model {
            Some(default) if *default == model.id => " (default)",
            None if index == 0 => " (default)",
            _ => "",
        };
        println!("  {} - {}{}", model.id, model.display_name, marker);
    }

    Ok(())
}

//! Built-in model catalog
//!
//! The selectable models ship embedded in the binary; the first catalog
//! entry is the default when config names none.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinModel {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BuiltinModelsConfig {
    models: Vec<BuiltinModel>,
}

/// Load the embedded model catalog.
pub fn load_builtin_models() -> Vec<BuiltinModel> {
    const CONFIG_CONTENT: &str = include_str!("../builtin_models.toml");

    let config: BuiltinModelsConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_models.toml");

    config.models
}

/// Find a catalog model by id (case-insensitive).
pub fn find_builtin_model(id: &str) -> Option<BuiltinModel> {
    load_builtin_models()
        .into_iter()
        .find(|m| m.id.eq_ignore_ascii_case(id))
}

/// The catalog default: the first entry.
pub fn default_model() -> BuiltinModel {
    load_builtin_models()
        .into_iter()
        .next()
        .expect("builtin_models.toml must list at least one model")
}

/// The catalog entry following `current`, wrapping at the end. Unknown ids
/// land on the first entry.
pub fn next_model(current: &str) -> BuiltinModel {
    let models = load_builtin_models();
    let position = models.iter().position(|m| m.id == current);
    match position {
        Some(index) => models[(index + 1) % models.len()].clone(),
        None => models[0].clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_nonempty_and_default_is_first() {
        let models = load_builtin_models();
        assert!(!models.is_empty());
        assert_eq!(default_model().id, models[0].id);
        assert_eq!(default_model().id, "meta-llama/Llama-2-13b-chat-hf");
    }

    #[test]
    fn find_is_case_insensitive() {
        assert!(find_builtin_model("META-LLAMA/LLAMA-2-13B-CHAT-HF").is_some());
        assert!(find_builtin_model("no-such-model").is_none());
    }

    #[test]
    fn next_model_cycles_through_catalog() {
        let models = load_builtin_models();
        let mut current = models[0].id.clone();
        for expected in models.iter().cycle().skip(1).take(models.len()) {
            let next = next_model(&current);
            assert_eq!(next.id, expected.id);
            current = next.id;
        }
        assert_eq!(current, models[0].id, "cycle wraps back to the start");
    }

    #[test]
    fn unknown_model_falls_back_to_first_entry() {
        assert_eq!(next_model("no-such-model").id, load_builtin_models()[0].id);
    }
}

use std::collections::HashMap;
use std::env;

/// Scoped environment-variable override for tests. Restores the previous
/// values on drop so tests do not leak state into each other.
pub struct TestEnvVarGuard {
    saved: HashMap<String, Option<String>>,
}

impl TestEnvVarGuard {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            saved: HashMap::new(),
        }
    }

    pub fn set_var(&mut self, key: &str, value: &str) {
        self.save(key);
        env::set_var(key, value);
    }

    pub fn remove_var(&mut self, key: &str) {
        self.save(key);
        env::remove_var(key);
    }

    fn save(&mut self, key: &str) {
        self.saved
            .entry(key.to_string())
            .or_insert_with(|| env::var(key).ok());
    }
}

impl Drop for TestEnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain() {
            match value {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    }
}

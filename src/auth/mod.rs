use keyring::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

pub mod ui;

use self::ui::{prompt_deauth_menu, prompt_provider_menu, prompt_secret, UiError};

const KEYRING_SERVICE: &str = "parley";

/// The two credential slots the client knows about. Telnyx authenticates
/// the request itself; the OpenAI key is optional and forwarded in the
/// request body for models that proxy to OpenAI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Telnyx,
    Openai,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Telnyx, Provider::Openai];

    pub fn id(self) -> &'static str {
        match self {
            Provider::Telnyx => "telnyx",
            Provider::Openai => "openai",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Telnyx => "Telnyx",
            Provider::Openai => "OpenAI",
        }
    }

    fn env_var(self) -> &'static str {
        match self {
            Provider::Telnyx => "TELNYX_API_KEY",
            Provider::Openai => "OPENAI_API_KEY",
        }
    }

    pub fn from_id(id: &str) -> Option<Provider> {
        Provider::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(id))
    }
}

#[derive(Clone, Debug)]
enum SecretCacheEntry {
    Present(String),
    Missing,
}

/// Per-provider secrets in the OS keyring, with a process-wide lookup cache
/// so each secret is fetched at most once per run. Environment variables
/// are a fallback for keyring-less environments; `with_keyring(false)`
/// restricts lookups to the environment (useful for tests).
pub struct CredentialStore {
    use_keyring: bool,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::with_keyring(true)
    }

    pub fn with_keyring(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    /// Look up a provider's secret: cache, then keyring, then environment.
    pub fn get(&self, provider: Provider) -> Result<Option<String>, Box<dyn std::error::Error>> {
        if self.use_keyring {
            if let Some(cached) = get_cached_entry(provider.id()) {
                return Ok(match cached {
                    SecretCacheEntry::Present(secret) => Some(secret),
                    SecretCacheEntry::Missing => self.env_fallback(provider),
                });
            }

            let entry = Entry::new(KEYRING_SERVICE, provider.id())?;
            match entry.get_password() {
                Ok(secret) => {
                    cache_lookup(provider.id(), SecretCacheEntry::Present(secret.clone()));
                    return Ok(Some(secret));
                }
                Err(keyring::Error::NoEntry) => {
                    cache_lookup(provider.id(), SecretCacheEntry::Missing);
                }
                Err(e) => return Err(Box::new(e)),
            }
        }

        Ok(self.env_fallback(provider))
    }

    fn env_fallback(&self, provider: Provider) -> Option<String> {
        std::env::var(provider.env_var())
            .ok()
            .filter(|value| !value.is_empty())
    }

    pub fn set(
        &self,
        provider: Provider,
        secret: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, provider.id())?;
        entry.set_password(secret)?;
        cache_lookup(provider.id(), SecretCacheEntry::Present(secret.to_string()));
        Ok(())
    }

    pub fn remove(&self, provider: Provider) -> Result<(), Box<dyn std::error::Error>> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, provider.id())?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                cache_lookup(provider.id(), SecretCacheEntry::Missing);
                Ok(())
            }
            Err(e) => Err(Box::new(e)),
        }
    }

    /// Interactive `parley auth`: pick a provider, enter its key masked.
    pub fn interactive_auth(&self) -> Result<(), Box<dyn std::error::Error>> {
        let mut configured = Vec::new();
        for provider in Provider::ALL {
            configured.push(self.get(provider)?.is_some());
        }

        let Some(index) = map_ui_result(prompt_provider_menu(&configured))? else {
            println!("Cancelled.");
            return Ok(());
        };

        let provider = Provider::ALL[index];
        let secret = map_ui_result(prompt_secret(provider.display_name()))?;
        if secret.is_empty() {
            return Err("API key cannot be empty".into());
        }
        self.set(provider, &secret)?;
        println!("✓ API key stored for {}", provider.display_name());
        Ok(())
    }

    /// Interactive `parley deauth`, or direct removal when a provider name
    /// was given on the command line.
    pub fn interactive_deauth(
        &self,
        provider: Option<String>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let target = match provider {
            Some(name) => Provider::from_id(&name)
                .ok_or_else(|| format!("Unknown provider '{name}'. Known: telnyx, openai."))?,
            None => {
                let mut configured = Vec::new();
                for candidate in Provider::ALL {
                    if self.get(candidate)?.is_some() {
                        configured.push(candidate);
                    }
                }
                if configured.is_empty() {
                    println!("No credentials configured.");
                    return Ok(());
                }
                match map_ui_result(prompt_deauth_menu(&configured))? {
                    Some(provider) => provider,
                    None => {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }
            }
        };

        self.remove(target)?;
        println!("✓ Credential removed for {}", target.display_name());
        Ok(())
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

fn map_ui_result<T>(result: Result<T, UiError>) -> Result<T, Box<dyn std::error::Error>> {
    result.map_err(|err| Box::new(err) as Box<dyn std::error::Error>)
}

fn cache_lookup(provider_id: &'static str, entry: SecretCacheEntry) {
    if let Ok(mut cache) = secret_cache().lock() {
        cache.insert(provider_id, entry);
    }
}

fn get_cached_entry(provider_id: &str) -> Option<SecretCacheEntry> {
    let cache = secret_cache().lock().ok()?;
    cache.get(provider_id).cloned()
}

fn secret_cache() -> &'static Mutex<HashMap<&'static str, SecretCacheEntry>> {
    static SECRET_CACHE: OnceLock<Mutex<HashMap<&'static str, SecretCacheEntry>>> = OnceLock::new();
    SECRET_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

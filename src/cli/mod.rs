//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

pub mod model_list;

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::auth::CredentialStore;
use crate::cli::model_list::list_models;
use crate::core::config::{Config, MAX_TOKENS_RANGE, TEMPERATURE_RANGE};
use crate::core::models::find_builtin_model;
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "A terminal chat client that streams completions from the Telnyx inference API")]
#[command(
    long_about = "Parley is a full-screen terminal chat client for the Telnyx inference API. \
Responses stream token by token into the scrollback while you pick a model and tune \
generation parameters.\n\n\
Authentication:\n\
  Use 'parley auth' to store API keys in your system keyring.\n\
  TELNYX_API_KEY / OPENAI_API_KEY environment variables work as a fallback.\n\n\
Controls:\n\
  Enter             Send the message (Alt+Enter inserts a newline)\n\
  Esc               Stop the streaming response\n\
  F2                Cycle the active model\n\
  F3/F4             Decrease/increase max_tokens\n\
  F5/F6             Decrease/increase temperature\n\
  Up/Down/Mouse     Scroll through the chat history\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat, or list available models if no model specified
    #[arg(short = 'm', long, global = true, value_name = "MODEL", num_args = 0..=1, default_missing_value = "")]
    pub model: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store an API key in the system keyring
    Auth,
    /// Remove a stored API key
    Deauth {
        /// Provider to remove (telnyx or openai); interactive menu if omitted
        provider: Option<String>,
    },
    /// Start the chat interface (default)
    Chat,
    /// Set configuration values
    Set {
        /// Configuration key to set (default-model, max-tokens, temperature)
        key: String,
        /// Value to set for the key
        value: Option<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Auth => {
            let store = CredentialStore::new();
            if let Err(e) = store.interactive_auth() {
                eprintln!("❌ Authentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Deauth { provider } => {
            let store = CredentialStore::new();
            if let Err(e) = store.interactive_deauth(provider) {
                eprintln!("❌ Deauthentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Set { key, value } => set_config_value(&key, value),
        Commands::Unset { key } => unset_config_value(&key),
        Commands::Chat => match args.model.as_deref() {
            // -m without a value lists the catalog instead of chatting.
            Some("") => list_models(),
            Some(model) => run_chat(model.to_string()).await,
            None => run_chat("default".to_string()).await,
        },
    }
}

fn set_config_value(key: &str, value: Option<String>) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    let Some(value) = value else {
        config.print_all();
        return Ok(());
    };

    match key {
        "default-model" => {
            if find_builtin_model(&value).is_none() {
                eprintln!("❌ Unknown model: {value}");
                eprintln!("Run `parley -m` to list available models.");
                std::process::exit(1);
            }
            config.default_model = Some(value.clone());
            config.save()?;
            println!("✅ Set default-model to: {value}");
        }
        "max-tokens" => {
            let parsed: u32 = value
                .parse()
                .map_err(|_| format!("max-tokens must be an integer, got '{value}'"))?;
            let (lo, hi) = MAX_TOKENS_RANGE;
            if !(lo..=hi).contains(&parsed) {
                return Err(format!("max-tokens must be within {lo}-{hi}").into());
            }
            config.max_tokens = Some(parsed);
            config.save()?;
            println!("✅ Set max-tokens to: {parsed}");
        }
        "temperature" => {
            let parsed: f64 = value
                .parse()
                .map_err(|_| format!("temperature must be a number, got '{value}'"))?;
            let (lo, hi) = TEMPERATURE_RANGE;
            if !(lo..=hi).contains(&parsed) {
                return Err(format!("temperature must be within {lo}-{hi}").into());
            }
            config.temperature = Some(parsed);
            config.save()?;
            println!("✅ Set temperature to: {parsed}");
        }
        _ => {
            eprintln!("❌ Unknown config key: {key}");
            std::process::exit(1);
        }
    }
    Ok(())
}

fn unset_config_value(key: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    match key {
        "default-model" => config.default_model = None,
        "max-tokens" => config.max_tokens = None,
        "temperature" => config.temperature = None,
        _ => {
            eprintln!("❌ Unknown config key: {key}");
            std::process::exit(1);
        }
    }
    config.save()?;
    println!("✅ Unset {key}");
    Ok(())
}

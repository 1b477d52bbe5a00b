use std::fmt;
use std::io::{self, Write};

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::auth::Provider;

#[derive(Debug, Clone)]
pub struct UiError {
    message: String,
}

impl UiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UiError {}

/// Numbered provider menu for `parley auth`. Returns the selected index,
/// or None when the user backed out.
pub fn prompt_provider_menu(configured: &[bool]) -> Result<Option<usize>, UiError> {
    println!("🔐 Parley Authentication Setup");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Available providers:");
    for (index, provider) in Provider::ALL.iter().enumerate() {
        let status = if configured.get(index).copied().unwrap_or(false) {
            "✓ configured"
        } else {
            "not configured"
        };
        println!(
            "  {}. {} ({}) - {}",
            index + 1,
            provider.display_name(),
            provider.id(),
            status
        );
    }
    println!();
    print!("Select a provider (1-{}, blank to cancel): ", Provider::ALL.len());
    flush_stdout()?;

    let input = read_trimmed_line()?;
    parse_menu_selection(&input, Provider::ALL.len())
}

/// Menu of configured providers for `parley deauth`.
pub fn prompt_deauth_menu(configured: &[Provider]) -> Result<Option<Provider>, UiError> {
    println!("Configured providers:");
    for (index, provider) in configured.iter().enumerate() {
        println!("  {}. {}", index + 1, provider.display_name());
    }
    println!();
    print!("Remove which credential (1-{}, blank to cancel): ", configured.len());
    flush_stdout()?;

    let input = read_trimmed_line()?;
    Ok(parse_menu_selection(&input, configured.len())?.map(|index| configured[index]))
}

/// Read an API key without echoing it.
pub fn prompt_secret(display_name: &str) -> Result<String, UiError> {
    print!("Enter your {display_name} API key (input hidden): ");
    flush_stdout()?;

    enable_raw_mode().map_err(|err| UiError::new(err.to_string()))?;
    let result = read_masked_input();
    disable_raw_mode().map_err(|err| UiError::new(err.to_string()))?;
    println!();
    result
}

fn read_masked_input() -> Result<String, UiError> {
    let mut secret = String::new();
    loop {
        let event = event::read().map_err(|err| UiError::new(err.to_string()))?;
        let Event::Key(key) = event else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(UiError::new("interrupted"));
            }
            KeyCode::Char(c) => secret.push(c),
            _ => {}
        }
    }
}

fn parse_menu_selection(input: &str, item_count: usize) -> Result<Option<usize>, UiError> {
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<usize>() {
        Ok(choice) if (1..=item_count).contains(&choice) => Ok(Some(choice - 1)),
        _ => Err(UiError::new(format!(
            "Invalid choice '{input}' (expected 1-{item_count})"
        ))),
    }
}

fn flush_stdout() -> Result<(), UiError> {
    io::stdout()
        .flush()
        .map_err(|err| UiError::new(err.to_string()))
}

fn read_trimmed_line() -> Result<String, UiError> {
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|err| UiError::new(err.to_string()))?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_selection_accepts_in_range_numbers() {
        assert_eq!(parse_menu_selection("1", 2).expect("valid"), Some(0));
        assert_eq!(parse_menu_selection("2", 2).expect("valid"), Some(1));
    }

    #[test]
    fn menu_selection_blank_cancels() {
        assert_eq!(parse_menu_selection("", 2).expect("valid"), None);
    }

    #[test]
    fn menu_selection_rejects_out_of_range_and_garbage() {
        assert!(parse_menu_selection("0", 2).is_err());
        assert!(parse_menu_selection("3", 2).is_err());
        assert!(parse_menu_selection("abc", 2).is_err());
    }
}

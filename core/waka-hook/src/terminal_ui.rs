//! Terminal implementation of the settings prompt.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use waka_core::{SaveCallback, Settings, SettingsUi};

/// Typing this at the URL prompt clears the custom endpoint.
const CLEAR_MARKER: &str = "-";

pub struct TerminalUi<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl<R: BufRead, W: Write> TerminalUi<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    /// `None` when input ends before both answers were given.
    fn prompt(&self, current: &Settings) -> io::Result<Option<Settings>> {
        let key_hint = if current.api_key.is_empty() {
            "none".to_string()
        } else {
            mask_key(&current.api_key)
        };
        let url_hint = if current.api_url.is_empty() {
            "default"
        } else {
            current.api_url.as_str()
        };

        let Some(api_key) = self.ask(&format!("API key [{}]: ", key_hint))? else {
            return Ok(None);
        };
        let Some(api_url) = self.ask(&format!(
            "API url [{}] ('{}' clears): ",
            url_hint, CLEAR_MARKER
        ))?
        else {
            return Ok(None);
        };

        Ok(Some(Settings {
            api_key: if api_key.is_empty() {
                current.api_key.clone()
            } else {
                api_key
            },
            api_url: match api_url.as_str() {
                "" => current.api_url.clone(),
                CLEAR_MARKER => String::new(),
                _ => api_url,
            },
        }))
    }

    fn ask(&self, question: &str) -> io::Result<Option<String>> {
        {
            let mut out = self.output.borrow_mut();
            out.write_all(question.as_bytes())?;
            out.flush()?;
        }
        let mut line = String::new();
        if self.input.borrow_mut().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> SettingsUi for TerminalUi<R, W> {
    fn show(&self, current: &Settings, on_save: SaveCallback) {
        match self.prompt(current) {
            Ok(Some(settings)) => on_save(settings),
            Ok(None) => tracing::info!("Settings prompt dismissed"),
            Err(e) => tracing::warn!(error = %e, "Settings prompt failed"),
        }
    }
}

/// Keeps the last four characters so users can tell keys apart.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    fn run(input: &str, current: &Settings) -> (Option<Settings>, String) {
        let ui = TerminalUi::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let saved = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&saved);
        ui.show(
            current,
            Box::new(move |s| {
                *slot.lock().unwrap() = Some(s);
            }),
        );
        let output = String::from_utf8(ui.output.into_inner()).unwrap();
        let saved = saved.lock().unwrap().clone();
        (saved, output)
    }

    fn current() -> Settings {
        Settings {
            api_key: "waka_0123456789".to_string(),
            api_url: "https://example.test/api".to_string(),
        }
    }

    #[test]
    fn test_blank_answers_keep_current_values() {
        let (saved, output) = run("\n\n", &current());
        assert_eq!(saved, Some(current()));
        assert!(output.contains("***6789"));
        assert!(!output.contains("waka_0123456789"));
    }

    #[test]
    fn test_new_values_replace_current() {
        let (saved, _) = run("waka_new\nhttps://other.test\n", &current());
        let saved = saved.unwrap();
        assert_eq!(saved.api_key, "waka_new");
        assert_eq!(saved.api_url, "https://other.test");
    }

    #[test]
    fn test_clear_marker_empties_url() {
        let (saved, _) = run("\n-\n", &current());
        assert_eq!(saved.unwrap().api_url, "");
    }

    #[test]
    fn test_eof_dismisses_without_saving() {
        let (saved, _) = run("waka_new\n", &current());
        assert!(saved.is_none());
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("abc"), "***");
        assert_eq!(mask_key("abcdefgh"), "****efgh");
        assert_eq!(mask_key(""), "");
    }
}

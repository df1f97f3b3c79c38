//! # Output Configuration
//!
//! Decides whether the run summary uses color and symbols or plain text.
//!
//! `--color=always|never` wins outright. With `--color=auto` the usual
//! conventions are honored: `NO_COLOR` (any value), `CLICOLOR=0` and
//! `TERM=dumb` turn color off, `CLICOLOR_FORCE` turns it on even when stdout
//! is not a terminal, and otherwise the terminal's own capabilities decide.

use std::env;

/// Whether the summary is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Builds the configuration from the `--color` flag value and the
    /// environment. Unknown flag values behave like `auto`.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_ascii_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| !v.is_empty() && v != "0") {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    /// Makes `console::style` follow this configuration.
    pub fn apply(&self) {
        console::set_colors_enabled(self.use_color);
    }

    /// The symbol when styled, the plain marker otherwise.
    pub fn symbol<'a>(&self, styled: &'a str, plain: &'a str) -> &'a str {
        if self.use_color {
            styled
        } else {
            plain
        }
    }
}

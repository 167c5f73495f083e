// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal syntax highlighting for JSON bodies and header blocks.

use std::sync::OnceLock;

use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

const RESET: &str = "\x1b[0m";

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

/// What the highlighted text is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Json,
    Yaml,
}

impl Lang {
    fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

pub fn theme_exists(name: &str) -> bool {
    theme_set().themes.contains_key(name)
}

/// Theme names accepted by the `theme` preference, sorted.
pub fn available_themes() -> Vec<&'static str> {
    theme_set().themes.keys().map(String::as_str).collect()
}

/// Colorize `text` with the named theme.
///
/// Unknown themes and highlighting failures give back the text unchanged.
pub fn highlight(text: &str, lang: Lang, theme: &str) -> String {
    let ss = syntax_set();
    let (Some(syntax), Some(theme)) =
        (ss.find_syntax_by_extension(lang.extension()), theme_set().themes.get(theme))
    else {
        return text.to_owned();
    };

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut out = String::with_capacity(text.len() * 2);
    for line in LinesWithEndings::from(text) {
        match highlighter.highlight_line(line, ss) {
            Ok(ranges) => out.push_str(&as_24_bit_terminal_escaped(&ranges, false)),
            Err(_) => return text.to_owned(),
        }
    }
    out.push_str(RESET);
    out
}

#[cfg(test)]
#[path = "highlight_tests.rs"]
mod tests;

use crate::token::Category;
use crate::{DeobfuscateError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Characters the obfuscator builds its identifiers from.
    pub alphabet: String,
    pub min_literal_len: usize,
    pub variable_marker: char,
    pub quote_char: char,
    /// A marker preceded by an odd run of this character is literal text.
    pub escape_char: Option<char>,
    /// Variable references starting with one of these are interpreter
    /// built-ins (`%A_ScriptDir%`) and never become tokens.
    pub preserved_prefixes: Vec<String>,
    /// Characters kept on each side of an occurrence.
    pub context_window: usize,
    /// Occurrences per token counted for classification; `None` counts all.
    pub sample_limit: Option<usize>,
    pub conditional_keywords: Vec<String>,
    pub hotkey_keywords: Vec<String>,
    pub label_keywords: Vec<String>,
    /// Checked in order; the first needle found wins.
    pub command_names: Vec<CommandName>,
    pub precedence: Vec<Category>,
    pub removal_markers: Vec<String>,
    pub removal_keywords: Vec<String>,
    pub open_brace: char,
    pub close_brace: char,
    pub drop_declarations: bool,
    pub annotate_obfuscated_calls: bool,
    pub emit_header: bool,
    pub counter_width: usize,
    pub eol: String,
    pub mode: Mode,
    pub report_format: ReportFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandName {
    pub needle: String,
    pub name: String,
}

impl CommandName {
    pub fn new(needle: &str, name: &str) -> Self {
        Self {
            needle: needle.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Whole,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    Text,
    Json,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for Options {
    fn default() -> Self {
        Self {
            alphabet: "@#fk".to_string(),
            min_literal_len: 8,
            variable_marker: '%',
            quote_char: '"',
            escape_char: Some('`'),
            preserved_prefixes: strings(&["A_"]),
            context_window: 50,
            sample_limit: None,
            conditional_keywords: strings(&["if", "else if", "while", "until"]),
            hotkey_keywords: strings(&["hotkey"]),
            label_keywords: strings(&["goto", "gosub"]),
            command_names: vec![
                CommandName::new("pixelsearch", "PixelSearch"),
                CommandName::new("mouseclick", "MouseClick"),
                CommandName::new("winactivate", "WinActivate"),
                CommandName::new("send", "Send"),
                CommandName::new("sleep", "Sleep"),
                CommandName::new("random", "Random"),
                CommandName::new("click", "Click"),
                CommandName::new("key", "SendKey"),
            ],
            precedence: Category::DEFAULT_PRECEDENCE.to_vec(),
            removal_markers: strings(&["Check_ForUpdate"]),
            removal_keywords: strings(&[
                "obf_copyright",
                "sammichscripts.com",
                "ping.exe",
                "urldownloadtofile",
                "net connection",
            ]),
            open_brace: '{',
            close_brace: '}',
            drop_declarations: true,
            annotate_obfuscated_calls: false,
            emit_header: false,
            counter_width: 3,
            eol: "\n".to_string(),
            mode: Mode::Whole,
            report_format: ReportFormat::Text,
        }
    }
}

impl Options {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|source| DeobfuscateError::io(path, source))?;
        let options: Self =
            serde_json::from_str(&text).map_err(|source| DeobfuscateError::Config {
                path: path.to_path_buf(),
                source,
            })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.alphabet.is_empty() {
            return Err(DeobfuscateError::InvalidOption(
                "alphabet must not be empty".to_string(),
            ));
        }
        if self.min_literal_len == 0 {
            return Err(DeobfuscateError::InvalidOption(
                "min_literal_len must be at least 1".to_string(),
            ));
        }
        if self.variable_marker == self.quote_char {
            return Err(DeobfuscateError::InvalidOption(
                "variable_marker and quote_char must differ".to_string(),
            ));
        }
        if self.variable_marker.is_whitespace() {
            return Err(DeobfuscateError::InvalidOption(
                "variable_marker must not be whitespace".to_string(),
            ));
        }
        if self
            .escape_char
            .is_some_and(|c| c == self.variable_marker || c == self.quote_char)
        {
            return Err(DeobfuscateError::InvalidOption(
                "escape_char must differ from variable_marker and quote_char".to_string(),
            ));
        }
        if self.open_brace == self.close_brace {
            return Err(DeobfuscateError::InvalidOption(
                "open_brace and close_brace must differ".to_string(),
            ));
        }
        if self.sample_limit == Some(0) {
            return Err(DeobfuscateError::InvalidOption(
                "sample_limit must be at least 1".to_string(),
            ));
        }
        if self.eol.is_empty() {
            return Err(DeobfuscateError::InvalidOption(
                "eol must not be empty".to_string(),
            ));
        }

        for category in Category::FLAGGED {
            let count = self.precedence.iter().filter(|c| **c == category).count();
            if count != 1 {
                return Err(DeobfuscateError::InvalidOption(format!(
                    "precedence must list {category} exactly once (found {count})"
                )));
            }
        }
        if self
            .precedence
            .iter()
            .filter(|c| **c == Category::Generic)
            .count()
            > 1
        {
            return Err(DeobfuscateError::InvalidOption(
                "precedence lists generic more than once".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(Options::default().validate().is_ok());
    }

    #[test]
    fn test_precedence_must_cover_every_category() {
        let mut options = Options::default();
        options.precedence.retain(|c| *c != Category::Color);

        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("color"));
    }

    #[test]
    fn test_duplicate_precedence_rejected() {
        let mut options = Options::default();
        options.precedence.push(Category::Hotkey);

        assert!(options.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "alphabet": "xyz", "mode": "streaming", "precedence": [
            "color", "coordinate", "function-call", "control-label",
            "hotkey", "quoted-string", "generic"
        ] }"#;
        let options: Options = serde_json::from_str(json).unwrap();

        assert_eq!(options.alphabet, "xyz");
        assert_eq!(options.mode, Mode::Streaming);
        assert_eq!(options.precedence[0], Category::Color);
        assert_eq!(options.min_literal_len, 8);
        assert_eq!(options.removal_markers, vec!["Check_ForUpdate".to_string()]);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_from_json_file_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Options::from_json_file(&path).unwrap_err();
        assert!(matches!(err, DeobfuscateError::Config { .. }));
    }

    #[test]
    fn test_escape_char_must_not_be_a_delimiter() {
        let options = Options {
            escape_char: Some('%'),
            ..Options::default()
        };
        assert!(options.validate().is_err());

        let options: Options = serde_json::from_str(r#"{ "escape_char": null }"#).unwrap();
        assert_eq!(options.escape_char, None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_empty_alphabet_rejected() {
        let options = Options {
            alphabet: String::new(),
            ..Options::default()
        };
        assert!(matches!(
            options.validate(),
            Err(DeobfuscateError::InvalidOption(_))
        ));
    }
}

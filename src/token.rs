use crate::options::Options;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    FunctionCall,
    ControlLabel,
    Hotkey,
    Coordinate,
    Color,
    QuotedString,
    Generic,
}

impl Category {
    pub const DEFAULT_PRECEDENCE: [Self; 7] = [
        Self::FunctionCall,
        Self::ControlLabel,
        Self::Hotkey,
        Self::Coordinate,
        Self::Color,
        Self::QuotedString,
        Self::Generic,
    ];

    /// Categories backed by an occurrence flag. `Generic` is the fallback.
    pub const FLAGGED: [Self; 6] = [
        Self::FunctionCall,
        Self::ControlLabel,
        Self::Hotkey,
        Self::Coordinate,
        Self::Color,
        Self::QuotedString,
    ];

    pub const fn prefix(self) -> &'static str {
        match self {
            Self::FunctionCall => "Function",
            Self::ControlLabel => "Label",
            Self::Hotkey => "HotkeyFunc",
            Self::Coordinate => "CoordVar",
            Self::Color => "ColorVar",
            Self::QuotedString => "StringVar",
            Self::Generic => "Var",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FunctionCall => "function-call",
            Self::ControlLabel => "control-label",
            Self::Hotkey => "hotkey",
            Self::Coordinate => "coordinate",
            Self::Color => "color",
            Self::QuotedString => "quoted-string",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a token is delimited in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenForm {
    /// `%raw%`
    Variable,
    /// `"raw"`
    Literal,
}

impl TokenForm {
    pub fn delimit(self, raw: &str, options: &Options) -> String {
        match self {
            Self::Variable => format!("{m}{raw}{m}", m = options.variable_marker),
            Self::Literal => format!("{q}{raw}{q}", q = options.quote_char),
        }
    }

    /// Text written in place of the delimited form. Literals stay literals.
    pub fn replacement(self, name: &str, options: &Options) -> String {
        match self {
            Self::Variable => name.to_string(),
            Self::Literal => format!("{q}{name}{q}", q = options.quote_char),
        }
    }
}

/// Byte range of one delimited token inside a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub form: TokenForm,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContextFlags {
    pub function_call: bool,
    pub conditional: bool,
    pub coordinate: bool,
    pub color: bool,
    pub hotkey: bool,
    pub label: bool,
    pub quoted: bool,
}

impl ContextFlags {
    pub const fn votes_for(&self, category: Category) -> bool {
        match category {
            Category::FunctionCall => self.function_call,
            Category::ControlLabel => self.label,
            Category::Hotkey => self.hotkey,
            Category::Coordinate => self.coordinate,
            Category::Color => self.color,
            Category::QuotedString => self.quoted || self.conditional,
            Category::Generic => false,
        }
    }

    pub const fn any(&self) -> bool {
        self.function_call
            || self.conditional
            || self.coordinate
            || self.color
            || self.hotkey
            || self.label
            || self.quoted
    }
}

/// One appearance of a token. Borrows its line, so nothing here outlives
/// the line being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence<'l> {
    pub line: usize,
    pub text: &'l str,
    pub before: &'l str,
    pub after: &'l str,
    pub form: TokenForm,
    pub flags: ContextFlags,
    /// Index of the first `command_names` entry found on the line.
    pub command: Option<usize>,
}

/// Vote counts over a token's sampled occurrences. Fixed size, so a token
/// costs the same however often it appears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub sampled: usize,
    votes: [usize; 6],
    /// Lowest command index seen on any sampled line.
    pub command: Option<usize>,
}

impl Tally {
    pub fn add(&mut self, flags: ContextFlags, command: Option<usize>) {
        self.sampled += 1;
        for (slot, category) in self.votes.iter_mut().zip(Category::FLAGGED) {
            if flags.votes_for(category) {
                *slot += 1;
            }
        }
        if let Some(index) = command {
            self.command = Some(self.command.map_or(index, |seen| seen.min(index)));
        }
    }

    pub fn votes(&self, category: Category) -> usize {
        Category::FLAGGED
            .iter()
            .position(|c| *c == category)
            .map_or(0, |i| self.votes[i])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenForms {
    pub variable: bool,
    pub literal: bool,
}

impl TokenForms {
    pub fn insert(&mut self, form: TokenForm) {
        match form {
            TokenForm::Variable => self.variable = true,
            TokenForm::Literal => self.literal = true,
        }
    }

    pub fn iter(self) -> impl Iterator<Item = TokenForm> {
        [
            self.variable.then_some(TokenForm::Variable),
            self.literal.then_some(TokenForm::Literal),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub raw: String,
    pub forms: TokenForms,
    /// Every occurrence seen, including ones past the sample limit.
    pub total_occurrences: usize,
    pub tally: Tally,
}

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            forms: TokenForms::default(),
            total_occurrences: 0,
            tally: Tally::default(),
        }
    }

    pub fn record(&mut self, occurrence: &Occurrence<'_>, sample_limit: Option<usize>) {
        self.forms.insert(occurrence.form);
        self.total_occurrences += 1;
        if sample_limit.is_none_or(|limit| self.tally.sampled < limit) {
            self.tally.add(occurrence.flags, occurrence.command);
        }
    }
}

/// A line consisting only of obfuscation-alphabet characters and a colon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub line: usize,
    pub name: String,
}

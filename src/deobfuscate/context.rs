use crate::options::Options;
use crate::token::{ContextFlags, Occurrence, Site, TokenForm};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref COORDINATE_RE: Regex = Regex::new(r"\b\d{2,4}\s*,\s*\d{2,4}\b").unwrap();
    static ref COLOR_RE: Regex = Regex::new(r"\b0[xX][0-9a-fA-F]{6}\b").unwrap();
}

/// Computes the per-occurrence flags the classifier votes with. Only the
/// occurrence's own line is inspected.
pub struct ContextCollector<'o> {
    options: &'o Options,
    conditional_keywords: Vec<String>,
    hotkey_keywords: Vec<String>,
    label_keywords: Vec<String>,
    /// Lowercased needles with their index in `command_names`.
    commands: Vec<(usize, String)>,
}

/// Facts that depend only on the line, shared by every token on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineContext {
    conditional: bool,
    coordinate: bool,
    color: bool,
    hotkey: bool,
    label: bool,
    pub command: Option<usize>,
}

fn lowered(words: &[String]) -> Vec<String> {
    words
        .iter()
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword).is_some_and(|rest| {
        rest.chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
    })
}

impl<'o> ContextCollector<'o> {
    pub fn new(options: &'o Options) -> Self {
        let commands = options
            .command_names
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.needle.is_empty())
            .map(|(i, c)| (i, c.needle.to_lowercase()))
            .collect();

        Self {
            options,
            conditional_keywords: lowered(&options.conditional_keywords),
            hotkey_keywords: lowered(&options.hotkey_keywords),
            label_keywords: lowered(&options.label_keywords),
            commands,
        }
    }

    pub fn line_context(&self, line: &str) -> LineContext {
        let lower = line.to_lowercase();
        let trimmed = lower.trim_start();

        LineContext {
            conditional: self
                .conditional_keywords
                .iter()
                .any(|kw| starts_with_keyword(trimmed, kw)),
            coordinate: COORDINATE_RE.is_match(line),
            color: COLOR_RE.is_match(line),
            hotkey: self.hotkey_keywords.iter().any(|kw| lower.contains(kw)),
            label: self.label_keywords.iter().any(|kw| lower.contains(kw)),
            command: self
                .commands
                .iter()
                .find(|(_, needle)| lower.contains(needle.as_str()))
                .map(|(i, _)| *i),
        }
    }

    pub fn occurrence<'l>(
        &self,
        line: &'l str,
        context: &LineContext,
        site: &Site,
    ) -> Occurrence<'l> {
        let quoted = match site.form {
            TokenForm::Literal => true,
            TokenForm::Variable => {
                line[..site.start]
                    .matches(self.options.quote_char)
                    .count()
                    % 2
                    == 1
            }
        };

        Occurrence {
            line: site.line,
            text: line,
            before: window_before(line, site.start, self.options.context_window),
            after: window_after(line, site.end, self.options.context_window),
            form: site.form,
            flags: ContextFlags {
                function_call: line[site.end..].starts_with('('),
                conditional: context.conditional,
                coordinate: context.coordinate,
                color: context.color,
                hotkey: context.hotkey,
                label: context.label,
                quoted,
            },
            command: context.command,
        }
    }
}

fn window_before(line: &str, end: usize, chars: usize) -> &str {
    let head = &line[..end];
    let start = head
        .char_indices()
        .rev()
        .nth(chars.saturating_sub(1))
        .map_or(0, |(i, _)| i);
    if chars == 0 { "" } else { &head[start..] }
}

fn window_after(line: &str, start: usize, chars: usize) -> &str {
    let tail = &line[start..];
    let end = tail.char_indices().nth(chars).map_or(tail.len(), |(i, _)| i);
    &tail[..end]
}

use super::scanner::is_escaped;
use crate::Result;
use crate::mapping::Mapping;
use crate::options::Options;
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use tracing::debug;

const PATTERN_SIZE_LIMIT: usize = 256 * (1 << 20);

/// Replaces every delimited token form with its generated name in one pass
/// per line. Alternatives are ordered longest first, so at any position the
/// longest mapped form wins and a replacement is never rescanned. A form
/// opening on an escaped marker is skipped.
pub struct Substitution {
    pattern: Option<Regex>,
    replacements: FxHashMap<String, String>,
    marker: char,
    escape: Option<char>,
}

impl Substitution {
    pub fn new(mapping: &Mapping, options: &Options) -> Result<Self> {
        let mut replacements: FxHashMap<String, String> = FxHashMap::default();
        for entry in mapping.entries() {
            for form in entry.forms.iter() {
                replacements.insert(
                    form.delimit(&entry.raw, options),
                    form.replacement(&entry.name, options),
                );
            }
        }

        let mut forms: Vec<&String> = replacements.keys().collect();
        forms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if forms.is_empty() {
            None
        } else {
            let alternation = forms
                .iter()
                .map(|f| regex::escape(f))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                RegexBuilder::new(&alternation)
                    .size_limit(PATTERN_SIZE_LIMIT)
                    .dfa_size_limit(PATTERN_SIZE_LIMIT)
                    .build()?,
            )
        };

        debug!(forms = replacements.len(), "substitution table built");
        Ok(Self {
            pattern,
            replacements,
            marker: options.variable_marker,
            escape: options.escape_char,
        })
    }

    pub fn rewrite<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let Some(pattern) = &self.pattern else {
            return Cow::Borrowed(line);
        };

        let mut out = String::new();
        let mut copied = 0;
        let mut at = 0;
        while let Some(found) = pattern.find_at(line, at) {
            let start = found.start();
            if line[start..].starts_with(self.marker) && is_escaped(line, start, self.escape) {
                at = start + self.marker.len_utf8();
                continue;
            }
            let matched = found.as_str();
            out.push_str(&line[copied..start]);
            out.push_str(self.replacements.get(matched).map_or(matched, String::as_str));
            copied = found.end();
            at = copied;
        }

        if copied == 0 {
            return Cow::Borrowed(line);
        }
        out.push_str(&line[copied..]);
        Cow::Owned(out)
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

use super::section_filter::{Decision, FilterSummary, SectionFilter};
use super::substitution::Substitution;
use crate::Result;
use crate::mapping::Mapping;
use crate::options::Options;
use regex::Regex;

const CALL_ANNOTATION: &str = "; OBFUSCATED FUNCTION CALL: ";

/// Second pass: drops excluded lines and substitutes names into the rest.
/// Driven one line at a time so whole-document and streaming modes share it.
pub struct Rewriter<'o> {
    filter: SectionFilter<'o>,
    substitution: Substitution,
    call_re: Option<Regex>,
    kept: usize,
}

impl<'o> Rewriter<'o> {
    pub fn new(options: &'o Options, mapping: &Mapping) -> Result<Self> {
        let call_re = if options.annotate_obfuscated_calls {
            let mut chars: String = options.alphabet.clone();
            chars.push(options.variable_marker);
            let class: String = chars
                .chars()
                .map(|c| regex::escape(&c.to_string()))
                .collect();
            Some(Regex::new(&format!(r"^[{class}]+\([^)]*\)\s*$"))?)
        } else {
            None
        };

        Ok(Self {
            filter: SectionFilter::new(options)?,
            substitution: Substitution::new(mapping, options)?,
            call_re,
            kept: 0,
        })
    }

    pub fn rewrite_line(&mut self, index: usize, line: &str) -> Option<String> {
        if self.filter.feed(index, line) == Decision::Drop {
            return None;
        }
        self.kept += 1;

        let rewritten = self.substitution.rewrite(line);
        match &self.call_re {
            Some(re) if re.is_match(line.trim()) => Some(format!("{CALL_ANNOTATION}{rewritten}")),
            _ => Some(rewritten.into_owned()),
        }
    }

    pub const fn kept(&self) -> usize {
        self.kept
    }

    pub fn finish(self) -> FilterSummary {
        self.filter.finish()
    }
}

/// Comment banner placed above the output when `emit_header` is set.
pub fn header(source: Option<&str>, mapping: &Mapping, input_lines: usize) -> Vec<String> {
    let rule = format!("; {}", "=".repeat(69));
    vec![
        rule.clone(),
        format!("; Deobfuscated from: {}", source.unwrap_or("<input>")),
        format!("; Tokens mapped: {}", mapping.len()),
        format!("; Original lines: {input_lines}"),
        "; Names are heuristic guesses; manual review required".to_string(),
        rule,
        String::new(),
    ]
}

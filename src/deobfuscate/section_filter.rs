use super::scanner::declaration_regex;
use crate::Result;
use crate::document::Document;
use crate::options::Options;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpanReason {
    RemovalMarker,
    Keyword,
    Declaration,
}

/// Inclusive line range dropped from the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedSpan {
    pub start: usize,
    pub end: usize,
    pub reason: SpanReason,
    pub trigger: String,
    pub terminated: bool,
}

impl ExcludedSpan {
    pub const fn line_count(&self) -> usize {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    UnterminatedSpan { trigger: String, start_line: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedSpan {
                trigger,
                start_line,
            } => write!(
                f,
                "braces never balanced after `{trigger}` (line {}); removed through end of document",
                start_line + 1
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Drop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub spans: Vec<ExcludedSpan>,
    pub warnings: Vec<Warning>,
    pub dropped_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Outside,
    /// Trigger line opened no brace; waiting to see if the body follows.
    Pending,
    Skipping { depth: i64 },
}

/// Forward-only line filter. Feed every line in order, then `finish`.
pub struct SectionFilter<'o> {
    options: &'o Options,
    keywords: Vec<String>,
    declaration_re: Option<Regex>,
    state: State,
    summary: FilterSummary,
    last_line: Option<usize>,
}

impl<'o> SectionFilter<'o> {
    pub fn new(options: &'o Options) -> Result<Self> {
        let declaration_re = if options.drop_declarations {
            Some(declaration_regex(options)?)
        } else {
            None
        };

        Ok(Self {
            options,
            keywords: options
                .removal_keywords
                .iter()
                .filter(|k| !k.is_empty())
                .map(|k| k.to_lowercase())
                .collect(),
            declaration_re,
            state: State::Outside,
            summary: FilterSummary::default(),
            last_line: None,
        })
    }

    pub fn feed(&mut self, index: usize, line: &str) -> Decision {
        self.last_line = Some(index);
        let decision = self.decide(index, line);
        if decision == Decision::Drop {
            self.summary.dropped_lines += 1;
        }
        decision
    }

    fn decide(&mut self, index: usize, line: &str) -> Decision {
        match self.state {
            State::Skipping { depth } => {
                let depth = depth + self.brace_delta(line);
                self.extend_current(index);
                if depth <= 0 {
                    self.state = State::Outside;
                } else {
                    self.state = State::Skipping { depth };
                }
                return Decision::Drop;
            }
            State::Pending => {
                let trimmed = line.trim_start();
                if trimmed.is_empty() {
                    self.extend_current(index);
                    return Decision::Drop;
                }
                if trimmed.starts_with(self.options.open_brace) {
                    self.extend_current(index);
                    let depth = self.brace_delta(line);
                    self.state = if depth <= 0 {
                        State::Outside
                    } else {
                        State::Skipping { depth }
                    };
                    return Decision::Drop;
                }
                self.state = State::Outside;
            }
            State::Outside => {}
        }

        if let Some(marker) = self.matching_marker(line) {
            self.open_span(index, SpanReason::RemovalMarker, marker);
            let opens = line.matches(self.options.open_brace).count();
            let depth = self.brace_delta(line);
            self.state = if opens == 0 {
                State::Pending
            } else if depth <= 0 {
                State::Outside
            } else {
                State::Skipping { depth }
            };
            return Decision::Drop;
        }

        let lower = line.to_lowercase();
        if let Some(keyword) = self.keywords.iter().find(|k| lower.contains(k.as_str())) {
            let keyword = keyword.clone();
            self.merge_or_open(index, SpanReason::Keyword, keyword);
            return Decision::Drop;
        }

        if let Some(re) = &self.declaration_re
            && re.is_match(line.trim())
        {
            let name = line.trim().to_string();
            self.merge_or_open(index, SpanReason::Declaration, name);
            return Decision::Drop;
        }

        Decision::Keep
    }

    fn matching_marker(&self, line: &str) -> Option<String> {
        self.options
            .removal_markers
            .iter()
            .find(|m| !m.is_empty() && line.contains(m.as_str()))
            .cloned()
    }

    fn brace_delta(&self, line: &str) -> i64 {
        let opens = line.matches(self.options.open_brace).count() as i64;
        let closes = line.matches(self.options.close_brace).count() as i64;
        opens - closes
    }

    fn open_span(&mut self, index: usize, reason: SpanReason, trigger: String) {
        debug!(line = index, %trigger, ?reason, "removal span opened");
        self.summary.spans.push(ExcludedSpan {
            start: index,
            end: index,
            reason,
            trigger,
            terminated: true,
        });
    }

    fn merge_or_open(&mut self, index: usize, reason: SpanReason, trigger: String) {
        if let Some(last) = self.summary.spans.last_mut()
            && last.reason == reason
            && last.end + 1 == index
        {
            last.end = index;
            return;
        }
        self.open_span(index, reason, trigger);
    }

    fn extend_current(&mut self, index: usize) {
        if let Some(last) = self.summary.spans.last_mut() {
            last.end = index;
        }
    }

    pub fn finish(mut self) -> FilterSummary {
        if let State::Skipping { .. } = self.state
            && let Some(span) = self.summary.spans.last_mut()
        {
            if let Some(last) = self.last_line {
                span.end = last;
            }
            span.terminated = false;
            warn!(
                trigger = %span.trigger,
                start = span.start,
                "removal span never closed; dropped through end of document"
            );
            self.summary.warnings.push(Warning::UnterminatedSpan {
                trigger: span.trigger.clone(),
                start_line: span.start,
            });
        }
        self.summary
    }
}

/// Lines that survived filtering, tagged with their original index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    pub kept: Vec<(usize, String)>,
    pub summary: FilterSummary,
}

impl Filtered {
    pub fn kept_lines(&self) -> Vec<String> {
        self.kept.iter().map(|(_, l)| l.clone()).collect()
    }
}

pub fn filter_document(document: &Document, options: &Options) -> Result<Filtered> {
    let mut filter = SectionFilter::new(options)?;
    let mut kept = Vec::new();

    for (index, line) in document.lines().iter().enumerate() {
        if filter.feed(index, line) == Decision::Keep {
            kept.push((index, line.clone()));
        }
    }

    Ok(Filtered {
        kept,
        summary: filter.finish(),
    })
}

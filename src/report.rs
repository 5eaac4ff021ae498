use crate::deobfuscate::section_filter::{ExcludedSpan, FilterSummary, SpanReason, Warning};
use crate::mapping::{Mapping, MappingEntry};
use crate::options::{Mode, ReportFormat};
use crate::{DeobfuscateError, Result};
use serde::Serialize;
use std::fmt::Write as _;

/// Everything needed to audit one run: the full mapping, what was removed
/// and why, and a digest of the input it was computed from.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub input_md5: String,
    pub mode: Mode,
    pub input_lines: usize,
    pub output_lines: usize,
    pub declarations: usize,
    pub dropped_lines: usize,
    /// Sorted by raw token text.
    pub entries: Vec<MappingEntry>,
    pub spans: Vec<ExcludedSpan>,
    pub warnings: Vec<Warning>,
}

pub(crate) struct ReportInputs<'a> {
    pub source: Option<&'a str>,
    pub input_md5: String,
    pub mode: Mode,
    pub input_lines: usize,
    pub output_lines: usize,
    pub declarations: usize,
}

impl Report {
    pub(crate) fn build(
        inputs: ReportInputs<'_>,
        mapping: &Mapping,
        summary: FilterSummary,
    ) -> Self {
        Self {
            source: inputs.source.map(str::to_string),
            input_md5: inputs.input_md5,
            mode: inputs.mode,
            input_lines: inputs.input_lines,
            output_lines: inputs.output_lines,
            declarations: inputs.declarations,
            dropped_lines: summary.dropped_lines,
            entries: mapping.sorted_by_raw().into_iter().cloned().collect(),
            spans: summary.spans,
            warnings: summary.warnings,
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => self.to_json(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(DeobfuscateError::ReportSerialization)
    }

    pub fn to_text(&self) -> String {
        let rule = format!("; {}", "=".repeat(69));
        let mut out = String::new();

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "; DEOBFUSCATION REPORT");
        let _ = writeln!(out, "{rule}");
        if let Some(source) = &self.source {
            let _ = writeln!(out, "; Source: {source}");
        }
        let _ = writeln!(out, "; Input MD5: {}", self.input_md5);
        let _ = writeln!(out, "; Input lines: {}", self.input_lines);
        let _ = writeln!(out, "; Output lines: {}", self.output_lines);
        let _ = writeln!(out, "; Lines removed: {}", self.dropped_lines);
        let _ = writeln!(out, "; Declarations found: {}", self.declarations);
        let _ = writeln!(out, "; Tokens mapped: {}", self.entries.len());
        let _ = writeln!(out, ";");

        let _ = writeln!(out, "; === MAPPINGS ===");
        for entry in &self.entries {
            let _ = write!(
                out,
                "; {} -> {} [{} {:.2}, {} uses",
                entry.raw, entry.name, entry.category, entry.confidence, entry.occurrences
            );
            if let Some(refinement) = &entry.refinement {
                let _ = write!(out, ", looks like {refinement}");
            }
            if let Some(hint) = &entry.decoded_hint {
                let _ = write!(out, ", decodes to \"{hint}\"");
            }
            let _ = writeln!(out, "]");
        }

        let _ = writeln!(out, ";");
        let _ = writeln!(out, "; === REMOVED SECTIONS ===");
        for span in &self.spans {
            let reason = match span.reason {
                SpanReason::RemovalMarker => "removal marker",
                SpanReason::Keyword => "keyword",
                SpanReason::Declaration => "declaration",
            };
            let _ = writeln!(
                out,
                "; lines {}-{} ({reason} `{}`){}",
                span.start + 1,
                span.end + 1,
                span.trigger,
                if span.terminated { "" } else { " UNTERMINATED" }
            );
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out, ";");
            let _ = writeln!(out, "; === WARNINGS ===");
            for warning in &self.warnings {
                let _ = writeln!(out, "; WARNING: {warning}");
            }
        }

        let _ = writeln!(out, "{rule}");
        out
    }
}

pub(crate) fn digest_hex(digest: md5::Digest) -> String {
    format!("{digest:x}")
}

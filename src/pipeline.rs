use crate::deobfuscate::DeobfuscateContext;
use crate::deobfuscate::rewriter::{self, Rewriter};
use crate::document::Document;
use crate::mapping::Mapping;
use crate::options::{Mode, Options};
use crate::report::{Report, ReportInputs, digest_hex};
use crate::streaming;
use crate::{DeobfuscateError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of a whole-document run.
#[derive(Debug, Clone)]
pub struct Deobfuscation {
    pub output: String,
    pub mapping: Mapping,
    pub report: Report,
}

pub fn deobfuscate(source: &str, options: &Options) -> Result<Deobfuscation> {
    deobfuscate_named(source, None, options)
}

pub fn deobfuscate_named(
    source: &str,
    name: Option<&str>,
    options: &Options,
) -> Result<Deobfuscation> {
    let document = Document::parse(source);

    let mut ctx = DeobfuscateContext::new(options)?;
    ctx.analyze(&document);
    let mapping = ctx.build_mapping();

    let mut rewriter = Rewriter::new(options, &mapping)?;
    let mut lines = if options.emit_header {
        rewriter::header(name, &mapping, document.len())
    } else {
        Vec::new()
    };
    for (index, line) in document.lines().iter().enumerate() {
        if let Some(rewritten) = rewriter.rewrite_line(index, line) {
            lines.push(rewritten);
        }
    }
    let summary = rewriter.finish();

    let output = document.render(&lines, &options.eol);
    let report = Report::build(
        ReportInputs {
            source: name,
            input_md5: digest_hex(md5::compute(source.as_bytes())),
            mode: Mode::Whole,
            input_lines: document.len(),
            output_lines: lines.len(),
            declarations: ctx.declarations().len(),
        },
        &mapping,
        summary,
    );

    info!(
        tokens = mapping.len(),
        input_lines = report.input_lines,
        output_lines = report.output_lines,
        "deobfuscation complete"
    );

    Ok(Deobfuscation {
        output,
        mapping,
        report,
    })
}

/// Reads `input`, writes the transformed document to `output` and, when
/// given, the rendered report to `report_path`. Nothing is written unless
/// the whole run succeeds.
pub fn deobfuscate_file(
    input: &Path,
    output: &Path,
    report_path: Option<&Path>,
    options: &Options,
) -> Result<Report> {
    options.validate()?;

    let report = match options.mode {
        Mode::Whole => {
            let source = read_source(input)?;
            let name = input.file_name().and_then(|n| n.to_str());
            let result = deobfuscate_named(&source, name, options)?;
            write_atomic(output, result.output.as_bytes())?;
            result.report
        }
        Mode::Streaming => streaming::deobfuscate_stream(input, output, options)?,
    };

    if let Some(path) = report_path {
        let rendered = report.render(options.report_format)?;
        write_atomic(path, rendered.as_bytes())?;
    }

    Ok(report)
}

/// Reads a whole script, keeping the path in the error.
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| DeobfuscateError::io(path, source))
}

pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = partial_path(path);
    if let Err(source) = fs::write(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(DeobfuscateError::io(&tmp, source));
    }
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        DeobfuscateError::io(path, source)
    })
}

use crate::deobfuscate::DeobfuscateContext;
use crate::deobfuscate::rewriter::{self, Rewriter};
use crate::deobfuscate::section_filter::FilterSummary;
use crate::document::strip_cr;
use crate::mapping::Mapping;
use crate::options::{Mode, Options};
use crate::pipeline::partial_path;
use crate::report::{Report, ReportInputs, digest_hex};
use crate::{DeobfuscateError, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Two passes over `input` with only one line held at a time. The first pass
/// builds the mapping, the second filters and rewrites into `output`. The
/// bytes written match what [`crate::deobfuscate`] produces for the same text.
pub fn deobfuscate_stream(input: &Path, output: &Path, options: &Options) -> Result<Report> {
    let mut ctx = DeobfuscateContext::new(options)?;
    let mut digest = md5::Context::new();
    let mut trailing_newline = false;

    let mut index = 0;
    for_each_line(input, |line, raw| {
        digest.consume(raw.as_bytes());
        trailing_newline = raw.ends_with('\n');
        ctx.observe_line(index, line);
        index += 1;
        Ok(())
    })?;
    let input_lines = index;
    let mapping = ctx.build_mapping();
    debug!(lines = input_lines, tokens = mapping.len(), "first pass complete");

    let tmp = partial_path(output);
    let written = write_pass(input, &tmp, options, &mapping, input_lines, trailing_newline);
    let (output_lines, summary) = match written {
        Ok(done) => done,
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
    };
    fs::rename(&tmp, output).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        DeobfuscateError::io(output, source)
    })?;

    let report = Report::build(
        ReportInputs {
            source: input.file_name().and_then(|n| n.to_str()),
            input_md5: digest_hex(digest.compute()),
            mode: Mode::Streaming,
            input_lines,
            output_lines,
            declarations: ctx.declarations().len(),
        },
        &mapping,
        summary,
    );

    info!(
        tokens = mapping.len(),
        input_lines,
        output_lines,
        "streaming deobfuscation complete"
    );
    Ok(report)
}

fn write_pass(
    input: &Path,
    tmp: &Path,
    options: &Options,
    mapping: &Mapping,
    input_lines: usize,
    trailing_newline: bool,
) -> Result<(usize, FilterSummary)> {
    let file = File::create(tmp).map_err(|source| DeobfuscateError::io(tmp, source))?;
    let mut writer = LineWriter {
        out: BufWriter::new(file),
        eol: &options.eol,
        written: 0,
        path: tmp,
    };

    if options.emit_header {
        let name = input.file_name().and_then(|n| n.to_str());
        for line in rewriter::header(name, mapping, input_lines) {
            writer.line(&line)?;
        }
    }

    let mut rewriter = Rewriter::new(options, mapping)?;
    let mut index = 0;
    for_each_line(input, |line, _| {
        if let Some(rewritten) = rewriter.rewrite_line(index, line) {
            writer.line(&rewritten)?;
        }
        index += 1;
        Ok(())
    })?;

    let written = writer.finish(trailing_newline)?;
    Ok((written, rewriter.finish()))
}

/// Calls `f` with each line (newline and carriage return removed) and the
/// raw text it came from.
fn for_each_line<F>(path: &Path, mut f: F) -> Result<()>
where
    F: FnMut(&str, &str) -> Result<()>,
{
    let file = File::open(path).map_err(|source| DeobfuscateError::io(path, source))?;
    let mut reader = BufReader::new(file);
    let mut raw = String::new();

    loop {
        raw.clear();
        let n = reader
            .read_line(&mut raw)
            .map_err(|source| DeobfuscateError::io(path, source))?;
        if n == 0 {
            return Ok(());
        }
        let line = raw.strip_suffix('\n').unwrap_or(&raw);
        f(strip_cr(line), &raw)?;
    }
}

/// Writes lines separated by `eol`, matching `Document::render`.
struct LineWriter<'a> {
    out: BufWriter<File>,
    eol: &'a str,
    written: usize,
    path: &'a Path,
}

impl LineWriter<'_> {
    fn line(&mut self, line: &str) -> Result<()> {
        let eol = self.eol;
        if self.written > 0 {
            self.write(eol.as_bytes())?;
        }
        self.write(line.as_bytes())?;
        self.written += 1;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.out
            .write_all(bytes)
            .map_err(|source| DeobfuscateError::io(self.path, source))
    }

    fn finish(mut self, trailing_newline: bool) -> Result<usize> {
        let eol = self.eol;
        if trailing_newline && self.written > 0 {
            self.write(eol.as_bytes())?;
        }
        self.out
            .flush()
            .map_err(|source| DeobfuscateError::io(self.path, source))?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::deobfuscate;

    fn run(text: &str, options: &Options) -> (String, Report) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ahk");
        let output = dir.path().join("out.ahk");
        fs::write(&input, text).unwrap();

        let report = deobfuscate_stream(&input, &output, options).unwrap();
        (fs::read_to_string(&output).unwrap(), report)
    }

    #[test]
    fn test_matches_whole_mode() {
        let text = "kf@#:\n%kf%(1)\nCheck_ForUpdate() {\n  ping.exe\n}\nx := \"@k#@k#@k#\"\r\n%kf%(2)";
        let options = Options::default();

        let (streamed, report) = run(text, &options);
        let whole = deobfuscate(text, &options).unwrap();

        assert_eq!(streamed, whole.output);
        assert_eq!(report.input_md5, whole.report.input_md5);
        assert_eq!(report.output_lines, whole.report.output_lines);
        assert_eq!(report.dropped_lines, whole.report.dropped_lines);
        assert_eq!(report.mode, Mode::Streaming);
    }

    #[test]
    fn test_header_counts_as_output() {
        let options = Options {
            emit_header: true,
            ..Options::default()
        };

        let (streamed, report) = run("%kf%()\n", &options);

        assert!(streamed.contains("; Deobfuscated from: in.ahk"));
        assert!(streamed.ends_with("Function_001()\n"));
        assert_eq!(report.output_lines, 8);
    }

    #[test]
    fn test_empty_input() {
        let (streamed, report) = run("", &Options::default());

        assert_eq!(streamed, "");
        assert_eq!(report.input_lines, 0);
        assert_eq!(report.input_md5, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_missing_input_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.ahk");

        let err =
            deobfuscate_stream(&dir.path().join("nope.ahk"), &output, &Options::default())
                .unwrap_err();

        assert!(matches!(err, DeobfuscateError::Io { .. }));
        assert!(!output.exists());
        assert!(!partial_path(&output).exists());
    }
}

use ahk_deobfuscate_rs::pipeline::{deobfuscate_named, read_source, write_atomic};
use ahk_deobfuscate_rs::{Mode, Options, Report, ReportFormat, deobfuscate_file};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ahkdeob")]
#[command(about = "Recover readable names from obfuscated AutoHotkey scripts", long_about = None)]
#[command(version)]
struct Cli {
    /// Script to deobfuscate, or `-` for stdin
    input: String,

    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the mapping report here instead of stderr
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// JSON options file; unset fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Two passes over the file without loading it whole (needs a path and -o)
    #[arg(long)]
    streaming: bool,

    #[arg(long, value_enum)]
    report_format: Option<Format>,

    /// Prepend a comment banner to the output
    #[arg(long)]
    header: bool,

    /// Comment-tag lines that are nothing but an obfuscated call
    #[arg(long)]
    annotate_calls: bool,

    /// Keep `name:` declaration lines instead of dropping them
    #[arg(long)]
    keep_declarations: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl Cli {
    fn options(&self) -> ahk_deobfuscate_rs::Result<Options> {
        let mut options = match &self.config {
            Some(path) => Options::from_json_file(path)?,
            None => Options::default(),
        };

        if self.streaming {
            options.mode = Mode::Streaming;
        }
        if let Some(format) = self.report_format {
            options.report_format = match format {
                Format::Text => ReportFormat::Text,
                Format::Json => ReportFormat::Json,
            };
        }
        options.emit_header |= self.header;
        options.annotate_obfuscated_calls |= self.annotate_calls;
        if self.keep_declarations {
            options.drop_declarations = false;
        }

        options.validate()?;
        Ok(options)
    }

    fn input_path(&self) -> Option<&Path> {
        (self.input != "-").then(|| Path::new(&self.input))
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ahk_deobfuscate_rs={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let options = cli.options()?;

    if let (Some(input), Some(output)) = (cli.input_path(), &cli.output) {
        let report = deobfuscate_file(input, output, cli.report.as_deref(), &options)?;
        if cli.report.is_none() {
            eprint!("{}", report.render(options.report_format)?);
        }
        return Ok(());
    }

    if options.mode == Mode::Streaming {
        return Err("--streaming needs an input file and -o".into());
    }

    let (source, name) = match cli.input_path() {
        Some(path) => (
            read_source(path)?,
            path.file_name().and_then(|n| n.to_str()),
        ),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            (buffer, None)
        }
    };

    let result = deobfuscate_named(&source, name, &options)?;
    match &cli.output {
        Some(path) => write_atomic(path, result.output.as_bytes())?,
        None => print!("{}", result.output),
    }
    emit_report(&result.report, cli.report.as_deref(), options.report_format)?;

    Ok(())
}

fn emit_report(
    report: &Report,
    path: Option<&Path>,
    format: ReportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let rendered = report.render(format)?;
    match path {
        Some(path) => write_atomic(path, rendered.as_bytes())?,
        None => eprint!("{rendered}"),
    }
    Ok(())
}

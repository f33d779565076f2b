use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use namemap::table::crc32;
use tracing_subscriber::EnvFilter;
use namemap::{
    DatasetConfig, DirectoryProvider, EmbeddedProvider, LookupError, MAX_CODEPOINT, NameMap,
};

#[derive(Parser, Debug)]
#[command(name = "namemap", about = "Unicode character name lookups", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Dataset profile (TOML) to use instead of the embedded Unicode 14.0.0 one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the compressed table
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up names for hex codepoints and codepoints for names
    Lookup {
        /// `20A8`, `U+20A8` or `RUPEE SIGN`
        #[arg(required = true)]
        args: Vec<String>,
    },

    /// Build a compressed table from UnicodeData.txt
    Build {
        #[arg(long)]
        unicode_data: PathBuf,

        /// Extra `CODE;NAME` alias lines
        #[arg(long)]
        aliases: Option<PathBuf>,

        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` directives when set and valid, otherwise `warn`.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => DatasetConfig::from_path(path)
            .with_context(|| format!("reading profile {}", path.display()))?,
        None => DatasetConfig::default(),
    };

    match cli.command {
        Command::Lookup { args } => {
            let map = match &cli.data_dir {
                Some(dir) => NameMap::from_config(&config, DirectoryProvider::new(dir)),
                None => NameMap::from_config(&config, EmbeddedProvider),
            };
            Ok(lookup(&map, &args))
        }
        Command::Build {
            unicode_data,
            aliases,
            output,
        } => {
            build(&config, &unicode_data, aliases.as_deref(), &output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn lookup(map: &NameMap, args: &[String]) -> ExitCode {
    let mut failed = false;
    for arg in args {
        let result = match parse_codepoint(arg) {
            Some(code) => lookup_name(map, code),
            None => map.code(arg).map(|code| format!("{code:04X}")),
        };
        match result {
            Ok(line) => println!("{line}"),
            Err(err) => {
                eprintln!("{arg}: {err}");
                failed = true;
            }
        }
    }
    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn lookup_name(map: &NameMap, code: i64) -> Result<String, LookupError> {
    match u32::try_from(code) {
        Ok(code) if code <= MAX_CODEPOINT => map.name(code),
        _ => Err(LookupError::InvalidCodepoint(code)),
    }
}

/// Reads `20A8`, `U+20A8`, `0x20A8` or `-1` as a codepoint; anything else is
/// a name. Values too large for `i64` saturate.
fn parse_codepoint(arg: &str) -> Option<i64> {
    let (negative, digits) = match arg.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, arg),
    };
    let digits = digits
        .strip_prefix("U+")
        .or_else(|| digits.strip_prefix("0x"))
        .unwrap_or(digits);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = i64::from_str_radix(digits, 16).unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

fn build(
    config: &DatasetConfig,
    unicode_data: &Path,
    aliases: Option<&Path>,
    output: &Path,
) -> anyhow::Result<()> {
    let file = File::open(unicode_data)
        .with_context(|| format!("opening {}", unicode_data.display()))?;
    let mut builder = namemap::ucd::import_unicode_data(BufReader::new(file), &config.rules())
        .with_context(|| format!("importing {}", unicode_data.display()))?;

    if let Some(path) = aliases {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let added = namemap::ucd::import_aliases(BufReader::new(file), &mut builder)
            .with_context(|| format!("importing {}", path.display()))?;
        tracing::info!(added, path = %path.display(), "Imported aliases");
    }

    let blob = builder.build()?;
    std::fs::write(output, &blob).with_context(|| format!("writing {}", output.display()))?;
    println!(
        "wrote {} ({} codepoints); table_len = {}, table_crc32 = {:#010X}",
        output.display(),
        builder.len(),
        blob.len(),
        crc32(&blob)
    );
    Ok(())
}

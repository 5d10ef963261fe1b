use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mapsheet::upgrade::{UpgradeOptions, upgrade_file};

#[derive(Parser, Debug)]
#[command(name = "upgrade-map-xml")]
#[command(version, about = "Upgrade a pre-0.7.2 map stylesheet to the current XML schema")]
struct Args {
    /// Stylesheet to read
    input: PathBuf,

    /// Where to write the upgraded stylesheet (must differ from input)
    output: PathBuf,

    /// Keep the original whitespace instead of re-indenting
    #[arg(long)]
    no_indent: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let options = UpgradeOptions {
        indent: !args.no_indent,
    };
    match upgrade_file(&args.input, &args.output, &options) {
        Ok(report) => {
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

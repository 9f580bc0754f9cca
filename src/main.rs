use brogains::run_server;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Account registration, login and a session gated dashboard.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path of the JSON configuration file. A template is written if missing.
    #[arg(long, default_value = "./config.json")]
    config: PathBuf,
    /// Path of the log file. Its directory must exist.
    #[arg(long, default_value = "./logfile.log")]
    logfile: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run_server(&args.config, &args.logfile).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

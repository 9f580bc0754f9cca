use brogains::create_account;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Adds an account to the brogains database.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path of the JSON configuration file.
    #[arg(long, default_value = "./config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match create_account(&args.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

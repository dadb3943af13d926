use anyhow::Result;
use clap::Parser;
use contract_analyzer::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials are commonly kept in a local .env file.
    let _ = dotenvy::dotenv();
    let args = cli::Cli::parse();

    if args.is_interactive() {
        // stderr belongs to the terminal UI.
        if let Some(path) = args.log_file.clone().or_else(logging::default_log_file) {
            if let Err(e) = logging::init_file(&path, &args.log_level) {
                eprintln!("warning: logging disabled: {e:#}");
            }
        }
    } else {
        logging::init_stderr(&args.log_level);
    }

    cli::run(args).await
}

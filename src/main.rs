use anyhow::Result;
use clap::Parser;
use secure_file_tool::cli::{self, RunStatus};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_silent = args.silent;
    let is_non_tui = !args.is_interactive();

    let quiet_logs = is_silent || args.is_interactive();
    secure_file_tool::telemetry::init_logging(args.verbose, quiet_logs)?;

    match cli::run(args).await {
        Ok(RunStatus::Succeeded) => {
            // Explicitly exit so abandoned engine tasks do not hold the runtime open.
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Ok(RunStatus::Failed) => std::process::exit(1),
        Err(e) => {
            if is_silent {
                eprintln!("{}", e);
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}

mod cli;
mod engine;
mod fixture_io;
mod scenario;

use cli::{CliError, CliOptions};
use engine::run_eval;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    if options.mode == cli::EvalMode::Live {
        if let Err(err) = navigator::load_dotenv() {
            eprintln!("failed to load .env: {err}");
            std::process::exit(2);
        }
    }

    match run_eval(&options).await {
        Ok(summary) => {
            summary.print();
            if summary.has_failures() {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("failed to run chat eval harness: {err}");
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: cargo run -p chat-eval -- [--mode mocked|live] [--scenario <id>]\n\
         \n\
         Modes:\n\
         - mocked (default): replays fixture conversations through a scripted gateway\n\
         - live: smoke-runs include_in_live_smoke scenarios against OpenAI (structural checks only)\n\
         \n\
         Options:\n\
         - --scenario  Run a single scenario by id\n\
         - --help      Show this help text"
    );
}

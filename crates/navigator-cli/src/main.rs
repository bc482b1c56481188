mod cli;
mod repl;

use std::io::Write;

use cli::{CliError, CliOptions};
use navigator::{
    Navigator, NavigatorConfig, SessionSettings, SessionState, TurnKind, load_dotenv,
};
use repl::{FragmentEcho, ReplCommand, help_text, unprinted_tail, workflow_details};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "navigator=warn,wellnav=info".to_string()),
        )
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

    if let Err(err) = load_dotenv() {
        error!("{err}");
        std::process::exit(1);
    }

    let config = match NavigatorConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load navigator config: {err}");
            std::process::exit(1);
        }
    };

    let navigator = match Navigator::from_config(&config) {
        Ok(navigator) => navigator,
        Err(err) => {
            error!("failed to initialize completion gateway: {err}");
            std::process::exit(1);
        }
    };

    let mut settings = config.default_settings;
    if let Some(model) = options.model {
        settings.set_model(model);
    }
    if let Some(temperature) = options.temperature {
        if let Err(err) = settings.set_temperature(temperature) {
            error!("{err}");
            std::process::exit(2);
        }
    }

    if !navigator.has_credential() {
        warn!("OPENAI_API_KEY is not set; messages will not reach the model");
    }
    info!(
        model = settings.model().as_str(),
        temperature = settings.temperature(),
        workflows_enabled = navigator.workflows_enabled(),
        "wellnav started"
    );

    if let Err(err) = run_repl(&navigator, &mut settings).await {
        error!("terminal i/o failed: {err}");
        std::process::exit(1);
    }
}

async fn run_repl(navigator: &Navigator, settings: &mut SessionSettings) -> std::io::Result<()> {
    let mut session = SessionState::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
        if let Some(welcome) = session.ensure_welcome() {
            writeln!(stdout, "\n{welcome}\n")?;
        }
        write!(stdout, "you> ")?;
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(stdout)?;
            return Ok(());
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => return Ok(()),
            ReplCommand::Help => writeln!(stdout, "{}", help_text())?,
            ReplCommand::Reset => {
                session.reset();
                writeln!(stdout, "Conversation cleared.")?;
            }
            ReplCommand::Model(model) => {
                settings.set_model(model);
                writeln!(stdout, "Model set to {model}.")?;
            }
            ReplCommand::Temperature(temperature) => match settings.set_temperature(temperature) {
                Ok(()) => writeln!(stdout, "Temperature set to {temperature}.")?,
                Err(err) => writeln!(stdout, "{err}")?,
            },
            ReplCommand::Invalid(message) => writeln!(stdout, "{message}")?,
            ReplCommand::Message(message) => {
                run_turn(navigator, &mut session, settings, &message, &mut stdout).await?;
            }
        }
    }
}

async fn run_turn(
    navigator: &Navigator,
    session: &mut SessionState,
    settings: &SessionSettings,
    message: &str,
    stdout: &mut std::io::Stdout,
) -> std::io::Result<()> {
    write!(stdout, "\nwellnav> ")?;
    stdout.flush()?;

    let mut echo = FragmentEcho::new(std::io::stdout());
    let result = navigator
        .submit_turn(session, settings, message, |progress| {
            echo.push(progress.fragment);
        })
        .await;
    let streamed = echo.finish()?;

    match result {
        Ok(outcome) => {
            if outcome.reply_failed() && !streamed.is_empty() {
                writeln!(stdout)?;
            }
            if let (TurnKind::Workflow(workflow), Some(result)) =
                (outcome.kind, outcome.workflow_result.as_ref())
            {
                for line in workflow_details(workflow, result) {
                    writeln!(stdout, "{line}")?;
                }
                writeln!(stdout)?;
            }
            let tail = match outcome.kind {
                TurnKind::Chat if !outcome.reply_failed() => {
                    unprinted_tail(&outcome.assistant_message, &streamed)
                }
                _ => outcome.assistant_message.as_str(),
            };
            writeln!(stdout, "{tail}\n")?;
        }
        Err(err) => writeln!(stdout, "{err}\n")?,
    }

    Ok(())
}

fn print_usage() {
    eprintln!(
        "Usage: wellnav [--model gpt-4o-mini|gpt-4o|gpt-3.5-turbo] [--temperature <0..1>]\n\
         \n\
         Options:\n\
         - --model         Chat model for replies (default from NAVIGATOR_DEFAULT_MODEL)\n\
         - --temperature   Reply temperature between 0 and 1\n\
         - --help          Show this help text\n\
         \n\
         Environment:\n\
         - OPENAI_API_KEY  Required for model replies; loaded from .env when present"
    );
}

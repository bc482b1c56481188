use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    Mocked,
    Live,
}

impl EvalMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mocked => "mocked",
            Self::Live => "live",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub mode: EvalMode,
    pub scenario: Option<String>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("invalid --mode value: {0}")]
    InvalidMode(String),
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut mode = EvalMode::Mocked;
        let mut scenario = None;

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--mode" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    mode = parse_mode(&value)?;
                }
                "--scenario" => {
                    scenario = Some(iter.next().ok_or(CliError::MissingValue(arg.clone()))?);
                }
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        Ok(Self { mode, scenario })
    }
}

fn parse_mode(value: &str) -> Result<EvalMode, CliError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "mocked" => Ok(EvalMode::Mocked),
        "live" => Ok(EvalMode::Live),
        _ => Err(CliError::InvalidMode(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, CliOptions, EvalMode};

    #[test]
    fn mocked_mode_is_default() {
        let options = CliOptions::parse(Vec::new()).expect("empty args should parse");
        assert_eq!(options.mode, EvalMode::Mocked);
        assert!(options.scenario.is_none());
    }

    #[test]
    fn parses_mode_and_scenario_filter() {
        let options = CliOptions::parse(
            ["--mode", "LIVE", "--scenario", "reply_failure_apology"]
                .into_iter()
                .map(String::from),
        )
        .expect("args should parse");

        assert_eq!(options.mode, EvalMode::Live);
        assert_eq!(options.scenario.as_deref(), Some("reply_failure_apology"));
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = CliOptions::parse(["--mode", "replay"].into_iter().map(String::from))
            .expect_err("unknown mode should fail");
        assert!(matches!(err, CliError::InvalidMode(value) if value == "replay"));
    }
}

use navigator::ChatModel;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub model: Option<ChatModel>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("invalid --model value: {0}")]
    InvalidModel(String),
    #[error("invalid --temperature value: {0} (expected a number between 0 and 1)")]
    InvalidTemperature(String),
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--model" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    options.model = Some(
                        value
                            .parse::<ChatModel>()
                            .map_err(|_| CliError::InvalidModel(value.clone()))?,
                    );
                }
                "--temperature" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    options.temperature = Some(parse_temperature(&value)?);
                }
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        Ok(options)
    }
}

pub fn parse_temperature(value: &str) -> Result<f32, CliError> {
    match value.trim().parse::<f32>() {
        Ok(temperature) if (0.0..=1.0).contains(&temperature) => Ok(temperature),
        _ => Err(CliError::InvalidTemperature(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use navigator::ChatModel;

    use super::{CliError, CliOptions};

    fn parse(args: &[&str]) -> Result<CliOptions, CliError> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn defaults_leave_settings_to_config() {
        assert_eq!(parse(&[]), Ok(CliOptions::default()));
    }

    #[test]
    fn parses_model_and_temperature() {
        let options = parse(&["--model", "gpt-4o", "--temperature", "0.2"]).expect("valid args");

        assert_eq!(options.model, Some(ChatModel::Gpt4o));
        assert_eq!(options.temperature, Some(0.2));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            parse(&["--model", "gpt-5"]),
            Err(CliError::InvalidModel("gpt-5".to_string()))
        );
        assert_eq!(
            parse(&["--temperature", "1.2"]),
            Err(CliError::InvalidTemperature("1.2".to_string()))
        );
        assert_eq!(
            parse(&["--temperature"]),
            Err(CliError::MissingValue("--temperature".to_string()))
        );
        assert_eq!(
            parse(&["--verbose"]),
            Err(CliError::UnknownArgument("--verbose".to_string()))
        );
        assert_eq!(parse(&["-h"]), Err(CliError::HelpRequested));
    }
}

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::scenario::ScenarioFixture;

#[derive(Debug, Error)]
pub enum FixtureIoError {
    #[error("failed to read fixtures directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read fixture file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("fixture file {path} is not valid JSON: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_scenarios() -> Result<Vec<ScenarioFixture>, FixtureIoError> {
    let mut files = list_scenario_files()?;
    files.sort();

    let mut scenarios = Vec::with_capacity(files.len());
    for file in files {
        let raw = fs::read_to_string(&file).map_err(|source| FixtureIoError::ReadFile {
            path: file.display().to_string(),
            source,
        })?;
        let scenario = serde_json::from_str::<ScenarioFixture>(&raw).map_err(|source| {
            FixtureIoError::ParseJson {
                path: file.display().to_string(),
                source,
            }
        })?;
        scenarios.push(scenario);
    }

    Ok(scenarios)
}

fn list_scenario_files() -> Result<Vec<PathBuf>, FixtureIoError> {
    let scenarios_dir = fixture_root().join("scenarios");
    let entries = fs::read_dir(&scenarios_dir).map_err(|source| FixtureIoError::ReadDir {
        path: scenarios_dir.display().to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| FixtureIoError::ReadDir {
            path: scenarios_dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }

    Ok(files)
}

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

#[cfg(test)]
mod tests {
    use super::load_scenarios;

    #[test]
    fn bundled_scenarios_parse_with_unique_ids() {
        let scenarios = load_scenarios().expect("fixtures should load");
        assert!(!scenarios.is_empty());

        let mut ids = scenarios
            .iter()
            .map(|scenario| scenario.scenario_id.as_str())
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), scenarios.len());
        assert!(scenarios.iter().any(|scenario| scenario.include_in_live_smoke));
        assert!(scenarios.iter().all(|scenario| !scenario.turns.is_empty()));
    }
}

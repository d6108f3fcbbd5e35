use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::dataset;
use crate::standings::{DEFAULT_TOP_N, TieBreak};

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";
pub const DEFAULT_LOG_FILTER: &str = "bundesliga_dashboard=info";
pub const DEFAULT_SCORERS_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    /// Falls back to the newest season stored when unset.
    pub season: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub tie_break: TieBreak,
    #[serde(default)]
    pub carry_forward: bool,
    #[serde(default = "default_scorers_limit")]
    pub scorers_limit: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            tie_break: TieBreak::default(),
            carry_forward: false,
            scorers_limit: DEFAULT_SCORERS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_scorers_limit() -> usize {
    DEFAULT_SCORERS_LIMIT
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl DashboardConfig {
    /// Missing file means defaults; a present but invalid file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        Ok(config)
    }

    /// Load `.env` into the process environment (real env vars take precedence).
    pub fn load_env_file() {
        let _ = dotenvy::dotenv();
    }

    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = non_empty(lookup("DASHBOARD_DB")) {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(season) = non_empty(lookup("DASHBOARD_SEASON")) {
            self.database.season = Some(season);
        }
        if let Some(raw) = non_empty(lookup("DASHBOARD_TOP_N")) {
            self.selection.top_n = raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("DASHBOARD_TOP_N is not a count: {raw}"))?;
        }
        if let Some(raw) = non_empty(lookup("DASHBOARD_TIE_BREAK")) {
            self.selection.tie_break = TieBreak::parse(&raw)
                .ok_or_else(|| anyhow!("DASHBOARD_TIE_BREAK not recognised: {raw}"))?;
        }
        Ok(())
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.database.path.clone().or_else(dataset::default_db_path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = DashboardConfig::from_toml("").expect("empty config parses");
        assert_eq!(config.selection.top_n, 4);
        assert_eq!(config.selection.tie_break, TieBreak::TeamIdAscending);
        assert!(!config.selection.carry_forward);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn toml_sections_are_read() {
        let raw = r#"
            [database]
            path = "/tmp/fd.sqlite"
            season = "2023"

            [selection]
            top_n = 6
            tie_break = "insertion"
            carry_forward = true
        "#;
        let config = DashboardConfig::from_toml(raw).expect("config parses");
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/fd.sqlite")));
        assert_eq!(config.database.season.as_deref(), Some("2023"));
        assert_eq!(config.selection.top_n, 6);
        assert_eq!(config.selection.tie_break, TieBreak::FirstSeen);
        assert!(config.selection.carry_forward);
        assert_eq!(config.selection.scorers_limit, DEFAULT_SCORERS_LIMIT);

        let hyphenated = DashboardConfig::from_toml("[selection]\ntie_break = \"team-id\"\n")
            .expect("hyphenated alias parses");
        assert_eq!(hyphenated.selection.tie_break, TieBreak::TeamIdAscending);
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DASHBOARD_SEASON", "2024"),
            ("DASHBOARD_TOP_N", "2"),
            ("DASHBOARD_TIE_BREAK", "first-seen"),
            ("DASHBOARD_DB", "  "),
        ]);
        let mut config = DashboardConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .expect("overrides apply");
        assert_eq!(config.database.season.as_deref(), Some("2024"));
        assert_eq!(config.selection.top_n, 2);
        assert_eq!(config.selection.tie_break, TieBreak::FirstSeen);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn bad_top_n_is_an_error() {
        let mut config = DashboardConfig::default();
        let err = config
            .apply_env(|key| (key == "DASHBOARD_TOP_N").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("DASHBOARD_TOP_N"));
    }
}

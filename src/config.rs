//! Run settings
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional `javafix.toml`, and command-line flags.

use crate::collect::DumpFilter;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Line terminator written to rewritten files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Cr,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::CrLf => "\r\n",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LineEnding::Lf => "lf",
            LineEnding::Cr => "cr",
            LineEnding::CrLf => "crlf",
        }
    }
}

/// What a run does with the discovered files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Rewrite every file in place
    #[default]
    Fix,
    /// Record symbols into the store, touching no source file
    Dump(DumpFilter),
}

/// Contents of `javafix.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub symbols: Option<PathBuf>,
    pub line_ending: Option<LineEnding>,
    pub rename_locals: Option<bool>,
}

/// Values given on the command line; `None` defers to the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub paths: Vec<PathBuf>,
    pub symbols: Option<PathBuf>,
    pub line_ending: Option<LineEnding>,
    pub rename_locals: bool,
    pub mode: RunMode,
}

/// Fully resolved settings of one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub paths: Vec<PathBuf>,
    pub symbols: PathBuf,
    pub line_ending: LineEnding,
    pub mode: RunMode,
    pub rename_locals: bool,
}

impl Settings {
    /// Merge command-line values over the config file over defaults
    pub fn resolve(file: Option<FileConfig>, overrides: Overrides) -> Self {
        let file = file.unwrap_or_default();
        Self {
            paths: overrides.paths,
            symbols: overrides
                .symbols
                .or(file.symbols)
                .unwrap_or_else(default_symbols_path),
            line_ending: overrides.line_ending.or(file.line_ending).unwrap_or_default(),
            mode: overrides.mode,
            rename_locals: overrides.rename_locals || file.rename_locals.unwrap_or(false),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("javafix.toml")
}

/// `symbols.json` next to the running executable
pub fn default_symbols_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("symbols.json")))
        .unwrap_or_else(|| PathBuf::from("symbols.json"))
}

/// Load the config file; an explicitly named file must exist
pub fn load_config(path: Option<&Path>) -> Result<Option<FileConfig>> {
    let explicit = path.is_some();
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        if explicit {
            return Err(Error::Config(format!("config file {} not found", path.display())));
        }
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let config: FileConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_line_ending_terminators() {
        assert_eq!(LineEnding::default(), LineEnding::Lf);
        assert_eq!(LineEnding::Cr.as_str(), "\r");
        assert_eq!(LineEnding::CrLf.as_str(), "\r\n");
        assert_eq!(LineEnding::CrLf.name(), "crlf");
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("javafix.toml");
        std::fs::write(
            &path,
            "symbols = \"names.json\"\nline_ending = \"crlf\"\nrename_locals = true\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.symbols, Some(PathBuf::from("names.json")));
        assert_eq!(config.line_ending, Some(LineEnding::CrLf));
        assert_eq!(config.rename_locals, Some(true));
    }

    #[test]
    fn test_bad_or_missing_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("javafix.toml");
        assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));

        std::fs::write(&path, "line_ending = \"dos\"\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));

        std::fs::write(&path, "colour = true\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig {
            symbols: Some(PathBuf::from("from-file.json")),
            line_ending: Some(LineEnding::Cr),
            rename_locals: Some(true),
        };
        let settings = Settings::resolve(
            Some(file.clone()),
            Overrides {
                line_ending: Some(LineEnding::CrLf),
                ..Overrides::default()
            },
        );
        assert_eq!(settings.symbols, PathBuf::from("from-file.json"));
        assert_eq!(settings.line_ending, LineEnding::CrLf);
        assert!(settings.rename_locals);

        let settings = Settings::resolve(
            Some(file),
            Overrides {
                symbols: Some(PathBuf::from("cli.json")),
                mode: RunMode::Dump(DumpFilter::Missing),
                ..Overrides::default()
            },
        );
        assert_eq!(settings.symbols, PathBuf::from("cli.json"));
        assert_eq!(settings.line_ending, LineEnding::Cr);
        assert_eq!(settings.mode, RunMode::Dump(DumpFilter::Missing));
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::resolve(None, Overrides::default());
        assert_eq!(settings.line_ending, LineEnding::Lf);
        assert_eq!(settings.mode, RunMode::Fix);
        assert!(!settings.rename_locals);
        assert!(settings.symbols.ends_with("symbols.json"));
    }
}

//! Doctor command - verify system requirements and configuration.

use crate::artifact::format_size;
use crate::catalog::{schema::SCHEMA_VERSION, Catalog};
use crate::cli::Output;
use crate::config::{GenerationProvider, Settings};
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("vidscribe doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let sections: Vec<(&str, Vec<CheckResult>)> = vec![
        (
            "External Tools",
            vec![check_tool("ffmpeg"), check_tool("ffprobe")],
        ),
        ("API Configuration", vec![check_openai_api_key(settings)]),
        ("Directories", check_directories(settings)),
        ("Catalog", check_catalog(settings)),
        ("Configuration", vec![check_config_file()]),
    ];

    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
        }
        println!();
    }

    let checks: Vec<&CheckResult> = sections.iter().flat_map(|(_, c)| c).collect();
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before running vidscribe.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! vidscribe is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> CheckResult {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            let version_display = match version.char_indices().nth(50) {
                Some((idx, _)) => format!("{}...", &version[..idx]),
                None => version,
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", install_hint_ffmpeg()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", install_hint_ffmpeg())
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), install_hint_ffmpeg()),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key(settings: &Settings) -> CheckResult {
    let usage = match settings.generation.provider {
        GenerationProvider::OpenAI => "transcription and generation",
        GenerationProvider::Heuristic => "transcription",
    };

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok(
                "OPENAI_API_KEY",
                &format!("configured ({}), used for {}", masked, usage),
            )
        }
        Ok(key) if key.trim().is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check library and output directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let input_dir = settings.input_dir();
    if input_dir.is_dir() {
        results.push(CheckResult::ok(
            "Library directory",
            &input_dir.display().to_string(),
        ));
    } else {
        results.push(CheckResult::error(
            "Library directory",
            &format!("{} (not found)", input_dir.display()),
            "Set library.input_dir in the config file",
        ));
    }

    for (name, dir) in [
        ("Transcripts directory", settings.transcripts_dir()),
        ("Data directory", settings.data_dir()),
    ] {
        if dir.exists() {
            results.push(CheckResult::ok(name, &dir.display().to_string()));
        } else {
            results.push(CheckResult::warning(
                name,
                &format!("{} (will be created)", dir.display()),
                "Directory will be created on first use",
            ));
        }
    }

    results
}

/// Check the catalog database, its schema version and its consistency.
fn check_catalog(settings: &Settings) -> Vec<CheckResult> {
    let db_path = settings.database_path();
    if !db_path.exists() {
        return vec![CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first run",
        )];
    }

    let size = std::fs::metadata(&db_path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "unknown size".to_string());
    let mut results = vec![CheckResult::ok(
        "Database",
        &format!("{} ({})", db_path.display(), size),
    )];

    let catalog = match Catalog::open(&db_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            results.push(CheckResult::error(
                "Schema",
                &e.to_string(),
                "Restore a backup or upgrade vidscribe",
            ));
            return results;
        }
    };

    match catalog.schema_version() {
        Ok(version) => results.push(CheckResult::ok(
            "Schema",
            &format!("version {} of {}", version, SCHEMA_VERSION),
        )),
        Err(e) => results.push(CheckResult::error("Schema", &e.to_string(), "Run: vidscribe migrate")),
    }

    match catalog.consistency_issues() {
        Ok(issues) if issues.is_empty() => {
            results.push(CheckResult::ok("Consistency", "no issues"))
        }
        Ok(issues) => {
            for issue in issues {
                results.push(CheckResult::warning(
                    "Consistency",
                    &issue,
                    "Re-run transcription for the affected video",
                ));
            }
        }
        Err(e) => results.push(CheckResult::error("Consistency", &e.to_string(), "Run: vidscribe migrate")),
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: vidscribe config init",
        )
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_missing_library_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.library.input_dir = dir.path().join("nope").to_string_lossy().into_owned();

        let results = check_directories(&settings);
        assert_eq!(results[0].status, CheckStatus::Error);
    }

    #[test]
    fn test_catalog_check_reports_schema_version() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.database.path = dir.path().join("catalog.db").to_string_lossy().into_owned();

        assert_eq!(check_catalog(&settings)[0].status, CheckStatus::Warning);

        Catalog::open(&settings.database_path()).unwrap();
        let results = check_catalog(&settings);
        assert!(results.iter().all(|r| r.status == CheckStatus::Ok));
        assert!(results[1].message.starts_with(&format!("version {}", SCHEMA_VERSION)));
    }
}

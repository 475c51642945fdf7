//! Command-line interface for stacklens.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::analysis::Analyzer;
use crate::features::{Document, GapReport};
use crate::report;
use crate::settings::Settings;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Stack detection and structural fact extraction for source trees.
///
/// Stacklens classifies a tree by language and framework, then pulls out
/// its routes, models, controllers, UI components and services using
/// extractors chosen for that stack.
#[derive(Parser)]
#[command(name = "stacklens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log extraction details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect the stack and extract every fact category
    Analyze(AnalyzeArgs),
    /// Print the detected language and framework
    Detect(DetectArgs),
    /// List features missing from a set of documents
    Gaps(GapsArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Directory to analyze
    pub path: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Path to settings YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Sample records shown per category in pretty output
    #[arg(long, default_value_t = report::DEFAULT_SAMPLES)]
    pub samples: usize,
}

/// Arguments for the detect command.
#[derive(Parser)]
pub struct DetectArgs {
    /// Directory to classify
    pub path: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Path to settings YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the gaps command.
#[derive(Parser)]
pub struct GapsArgs {
    /// Directory to analyze
    pub path: PathBuf,

    /// JSON file holding an array of documents ({"title", "content", "source"})
    #[arg(short, long)]
    pub docs: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Path to settings YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Exit with status 1 when any gap is found
    #[arg(long)]
    pub fail_on_gaps: bool,
}

fn check_format(format: &str) -> bool {
    if format != "pretty" && format != "json" {
        eprintln!("Error: invalid format {:?}, must be 'pretty' or 'json'", format);
        return false;
    }
    true
}

/// Settings from `explicit`, else a discovered file, else defaults.
pub fn load_settings(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Settings> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match Settings::discover(root) {
            Some(p) => p,
            None => return Ok(Settings::default()),
        },
    };
    tracing::debug!(path = %path.display(), "loading settings");
    Settings::parse_file(&path)
        .map_err(|e| anyhow::anyhow!("invalid settings file {}: {}", path.display(), e))
}

/// Build an analyzer for `root`, printing the error on failure.
fn analyzer_for(root: &Path, config: Option<&Path>) -> Option<Analyzer> {
    let settings = match load_settings(root, config) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("{}", e);
            eprintln!("Error: {}", e);
            return None;
        }
    };
    match Analyzer::with_settings(settings) {
        Ok(a) => Some(a),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

/// Resolve `path` to an existing directory.
fn check_dir(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(m) if m.is_dir() => true,
        Ok(_) => {
            eprintln!("Error: not a directory: {}", path.display());
            false
        }
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", path, e);
            false
        }
    }
}

/// Parse a documents file: a JSON array of documents.
pub fn load_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
    let content = std::fs::read_to_string(path)?;
    let documents: Vec<Document> = serde_json::from_str(&content)?;
    Ok(documents)
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) || !check_dir(&args.path) {
        return Ok(EXIT_ERROR);
    }
    let Some(analyzer) = analyzer_for(&args.path, args.config.as_deref()) else {
        return Ok(EXIT_ERROR);
    };

    let path_str = args.path.to_string_lossy().to_string();
    let analysis = analyzer.analyze(&path_str)?;

    match args.format.as_str() {
        "json" => report::write_json(&analysis)?,
        _ => report::write_analysis_pretty(&analysis, args.samples),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the detect command.
pub fn run_detect(args: &DetectArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) || !check_dir(&args.path) {
        return Ok(EXIT_ERROR);
    }
    let Some(analyzer) = analyzer_for(&args.path, args.config.as_deref()) else {
        return Ok(EXIT_ERROR);
    };

    let path_str = args.path.to_string_lossy().to_string();
    let stack = analyzer.detect_stack(&path_str)?;

    match args.format.as_str() {
        "json" => report::write_json(&stack)?,
        _ => report::write_stack_pretty(&path_str, &stack),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the gaps command.
pub fn run_gaps(args: &GapsArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) || !check_dir(&args.path) {
        return Ok(EXIT_ERROR);
    }

    let documents = match load_documents(&args.docs) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading documents {}: {}", args.docs.display(), e);
            return Ok(EXIT_ERROR);
        }
    };

    let Some(analyzer) = analyzer_for(&args.path, args.config.as_deref()) else {
        return Ok(EXIT_ERROR);
    };

    let path_str = args.path.to_string_lossy().to_string();
    let analysis = analyzer.analyze(&path_str)?;
    let gaps = GapReport::new(&analysis, &documents);

    match args.format.as_str() {
        "json" => report::write_json(&gaps)?,
        _ => report::write_gaps_pretty(&path_str, &gaps),
    }

    if args.fail_on_gaps && !gaps.gaps.is_empty() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["stacklens", "analyze", ".", "-f", "json", "--samples", "2"]);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.format, "json");
                assert_eq!(args.samples, 2);
                assert!(args.config.is_none());
            }
            _ => panic!("expected analyze"),
        }

        let cli = Cli::parse_from(["stacklens", "gaps", "app", "--docs", "docs.json", "--fail-on-gaps", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Gaps(args) => {
                assert_eq!(args.docs, PathBuf::from("docs.json"));
                assert!(args.fail_on_gaps);
            }
            _ => panic!("expected gaps"),
        }
    }

    #[test]
    fn test_load_settings_discovers_file() {
        let temp = TempDir::new().unwrap();
        assert!(load_settings(temp.path(), None).unwrap().parallel);

        fs::write(temp.path().join("stacklens.yaml"), "parallel: false\n").unwrap();
        assert!(!load_settings(temp.path(), None).unwrap().parallel);

        let explicit = temp.path().join("other.yaml");
        fs::write(&explicit, "max_file_bytes: 0\n").unwrap();
        assert!(load_settings(temp.path(), Some(explicit.as_path())).is_err());
    }

    #[test]
    fn test_load_documents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("docs.json");
        fs::write(&path, r#"[{"title": "Getting started"}, {"title": "Billing", "source": "wiki"}]"#).unwrap();
        let docs = load_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].source, "wiki");
        assert!(docs[0].content.is_empty());

        fs::write(&path, "{}").unwrap();
        assert!(load_documents(&path).is_err());
    }

    #[test]
    fn test_gaps_exit_codes() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("requirements.txt"), "flask\n").unwrap();
        fs::write(
            temp.path().join("app.py"),
            "@app.route('/invoices')\ndef invoices():\n    pass\n",
        )
        .unwrap();
        let docs = temp.path().join("docs.json");
        fs::write(&docs, "[]").unwrap();

        let mut args = GapsArgs {
            path: temp.path().to_path_buf(),
            docs: docs.clone(),
            format: "json".to_string(),
            config: None,
            fail_on_gaps: true,
        };
        assert_eq!(run_gaps(&args).unwrap(), EXIT_FAILED);

        fs::write(&docs, r#"[{"title": "Invoices"}]"#).unwrap();
        assert_eq!(run_gaps(&args).unwrap(), EXIT_SUCCESS);

        args.format = "xml".to_string();
        assert_eq!(run_gaps(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_missing_path_is_error() {
        let temp = TempDir::new().unwrap();
        let args = DetectArgs {
            path: temp.path().join("missing"),
            format: "pretty".to_string(),
            config: None,
        };
        assert_eq!(run_detect(&args).unwrap(), EXIT_ERROR);
    }
}

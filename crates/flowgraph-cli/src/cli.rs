//! Command-line interface for the flowgraph utility
//!
//! Inspects, validates and edits flow-chart documents stored as JSON.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::script::{parse_script, run_script};
use crate::settings::{parse_assignments, UiSettings};
use flowgraph::core::logging::{init_logging, LOG_FORMAT_ENV, LOG_LEVEL_ENV};
use flowgraph::{Database, Document, EditorConfig, EditorSession, Endpoint, StencilRegistry};

/// Default settings file, relative to the working directory
const DEFAULT_SETTINGS_FILE: &str = "flowgraph-settings.json";

/// Flowgraph - inspect and edit flow-chart documents
#[derive(Parser)]
#[command(name = "flowgraph")]
#[command(about = "Validate, inspect and script flow-chart canvas documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Editor configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a document for structural problems
    Validate {
        /// Document file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Summarize a document
    Stats {
        /// Document file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the stencil palette
    Shapes {
        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Ask whether two endpoints may be connected
    CheckConnection {
        /// Document file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Source endpoint as NODE or NODE:PORT
        #[arg(long)]
        source: String,

        /// Target endpoint as NODE or NODE:PORT
        #[arg(long)]
        target: String,
    },

    /// Replay an operation script and write the resulting document
    Apply {
        /// Starting document (omit for an empty canvas)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// JSON array of operations
        #[arg(short, long)]
        script: PathBuf,

        /// Output file for the document (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or update UI settings
    Settings {
        /// Settings file
        #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
        file: PathBuf,

        /// Assignment to merge, e.g. zen_mode=true (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },
}

/// Document counts reported by `stats`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DocumentStats {
    pub nodes: usize,
    pub edges: usize,
    pub groups: usize,
    pub collapsed_groups: usize,
    pub hidden: usize,
}

impl DocumentStats {
    pub fn of(doc: &Document) -> Self {
        Self {
            nodes: doc.node_count(),
            edges: doc.edge_count(),
            groups: doc.nodes().filter(|n| n.group).count(),
            collapsed_groups: doc.nodes().filter(|n| n.group && n.collapsed).count(),
            hidden: doc.hidden_count(),
        }
    }
}

/// Main CLI application
pub struct FlowgraphApp {
    config: EditorConfig,
}

impl FlowgraphApp {
    /// Create an application with the default editor configuration
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self { config }
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over flags
        let log_level = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| cli.log_level.as_str().to_string());
        let log_format = std::env::var(LOG_FORMAT_ENV)
            .unwrap_or_else(|_| cli.log_format.as_str().to_string());

        if let Err(e) = init_logging(Some(&log_level), Some(&log_format)) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Flowgraph v{}", env!("CARGO_PKG_VERSION"));
        }

        if let Some(path) = &cli.config {
            self.config = load_config(path)?;
            if cli.verbose {
                eprintln!("Loaded editor config from {}", path.display());
            }
        }

        match cli.command {
            Commands::Validate { input } => self.validate_command(input, cli.verbose),
            Commands::Stats { input, json } => self.stats_command(input, json),
            Commands::Shapes { json } => self.shapes_command(json),
            Commands::CheckConnection {
                input,
                source,
                target,
            } => self.check_connection_command(input, &source, &target),
            Commands::Apply {
                input,
                script,
                output,
            } => self.apply_command(input, &script, output, cli.verbose),
            Commands::Settings { file, assignments } => {
                self.settings_command(&file, &assignments)
            }
        }
    }

    fn open_session(&self, input: Option<PathBuf>) -> Result<EditorSession> {
        let content = self.read_input(input)?;
        let mut session = EditorSession::with_config(self.config.clone());
        session.from_json_str(&content)?;
        Ok(session)
    }

    /// Handle the validate command
    fn validate_command(&self, input: Option<PathBuf>, verbose: bool) -> Result<()> {
        let content = self.read_input(input)?;

        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        match Document::from_json_str(&content) {
            Ok(doc) => {
                println!(
                    "✓ Valid document: {} nodes, {} edges",
                    doc.node_count(),
                    doc.edge_count()
                );
                Ok(())
            }
            Err(e) => {
                println!("✗ Invalid document: {}", e);
                Err(e.into())
            }
        }
    }

    /// Handle the stats command
    fn stats_command(&self, input: Option<PathBuf>, json: bool) -> Result<()> {
        let session = self.open_session(input)?;
        let stats = DocumentStats::of(session.document());

        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Nodes:            {}", stats.nodes);
            println!("Edges:            {}", stats.edges);
            println!("Groups:           {}", stats.groups);
            println!("Collapsed groups: {}", stats.collapsed_groups);
            println!("Hidden nodes:     {}", stats.hidden);
        }
        Ok(())
    }

    /// Handle the shapes command
    fn shapes_command(&self, json: bool) -> Result<()> {
        let registry = StencilRegistry::with_defaults();

        if json {
            let templates: Vec<_> = registry.templates().collect();
            let palette = serde_json::json!({
                "groups": registry.groups(),
                "templates": templates,
            });
            println!("{}", serde_json::to_string_pretty(&palette)?);
            return Ok(());
        }

        for group in registry.groups() {
            println!("{} ({}):", group.title, group.name);
            for name in &group.templates {
                if let Some(template) = registry.get(name) {
                    let shape = template
                        .spec
                        .shape
                        .map(|s| s.to_string())
                        .unwrap_or_default();
                    println!("  {:<14} {:<16} {}", template.name, shape, template.title);
                }
            }
        }
        println!();
        println!("Total: {} templates", registry.len());
        Ok(())
    }

    /// Handle the check-connection command
    fn check_connection_command(
        &self,
        input: Option<PathBuf>,
        source: &str,
        target: &str,
    ) -> Result<()> {
        let source: Endpoint = source
            .parse()
            .with_context(|| format!("Bad source endpoint '{}'", source))?;
        let target: Endpoint = target
            .parse()
            .with_context(|| format!("Bad target endpoint '{}'", target))?;
        let session = self.open_session(input)?;

        match session.check_connection(&source, &target) {
            Ok(()) => {
                println!("✓ {} -> {} may be connected", source, target);
                Ok(())
            }
            Err(reason) => {
                println!("✗ {} -> {} refused: {}", source, target, reason);
                Err(anyhow!("Connection refused: {}", reason))
            }
        }
    }

    /// Handle the apply command
    fn apply_command(
        &self,
        input: Option<PathBuf>,
        script: &Path,
        output: Option<PathBuf>,
        verbose: bool,
    ) -> Result<()> {
        let mut session = match input {
            Some(_) => self.open_session(input)?,
            None => EditorSession::with_config(self.config.clone()),
        };
        let text = fs::read_to_string(script)
            .with_context(|| format!("Failed to read script '{}'", script.display()))?;
        let ops = parse_script(&text)?;
        let applied = run_script(&mut session, &ops)?;

        if verbose {
            eprintln!("Applied {} operations", applied);
        }

        self.write_output(output, &session.to_json_string()?)
    }

    /// Handle the settings command
    fn settings_command(&self, file: &Path, assignments: &[String]) -> Result<()> {
        let mut settings = UiSettings::load(file)?;
        if !assignments.is_empty() {
            let patch = parse_assignments(assignments)?;
            settings.merge(&patch)?;
            settings.save(file)?;
        }
        println!("{}", serde_json::to_string_pretty(&settings)?);
        Ok(())
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                if content.ends_with('\n') {
                    print!("{}", content);
                } else {
                    println!("{}", content);
                }
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

impl Default for FlowgraphApp {
    fn default() -> Self {
        Self::new()
    }
}

fn load_config(path: &Path) -> Result<EditorConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    EditorConfig::from_json_str(&text)
        .with_context(|| format!("Invalid config file '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DOC: &str = r#"{
        "nodes": [
            {"id": "g", "shape": "group-node", "group": true, "collapsed": true},
            {"id": "a", "shape": "flow-chart-rect", "parent": "g",
             "ports": [{"id": "out", "group": "bottom"}]},
            {"id": "b", "shape": "flow-chart-rect",
             "ports": [{"id": "in", "group": "top"}]}
        ],
        "edges": [
            {"id": "e", "source": {"cell": "a", "port": "out"}, "target": {"cell": "b", "port": "in"}}
        ]
    }"#;

    #[test]
    fn test_cli_parsing_check_connection() {
        let args = vec![
            "flowgraph",
            "check-connection",
            "--input",
            "doc.json",
            "--source",
            "a:out",
            "--target",
            "b",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::CheckConnection {
                input,
                source,
                target,
            } => {
                assert_eq!(input.unwrap().to_string_lossy(), "doc.json");
                assert_eq!(source, "a:out");
                assert_eq!(target, "b");
            }
            _ => panic!("Expected CheckConnection command"),
        }
    }

    #[test]
    fn test_cli_parsing_apply_requires_script() {
        assert!(Cli::try_parse_from(vec!["flowgraph", "apply"]).is_err());
        let cli =
            Cli::try_parse_from(vec!["flowgraph", "apply", "-s", "ops.json", "-o", "-"]).unwrap();
        match cli.command {
            Commands::Apply {
                input,
                script,
                output,
            } => {
                assert!(input.is_none());
                assert_eq!(script.to_string_lossy(), "ops.json");
                assert_eq!(output.unwrap().to_string_lossy(), "-");
            }
            _ => panic!("Expected Apply command"),
        }
    }

    #[test]
    fn test_cli_parsing_settings_assignments() {
        let cli = Cli::try_parse_from(vec![
            "flowgraph",
            "settings",
            "--set",
            "zen_mode=true",
            "--set",
            "open_node_rich_text=false",
        ])
        .unwrap();
        match cli.command {
            Commands::Settings { file, assignments } => {
                assert_eq!(file.to_string_lossy(), DEFAULT_SETTINGS_FILE);
                assert_eq!(assignments.len(), 2);
            }
            _ => panic!("Expected Settings command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(vec![
            "flowgraph",
            "--verbose",
            "--log-level",
            "debug",
            "shapes",
            "--config",
            "editor.json",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.config.unwrap().to_string_lossy(), "editor.json");
    }

    #[test]
    fn test_stats_of_document() {
        let doc = Document::from_json_str(DOC).unwrap();
        let stats = DocumentStats::of(&doc);
        assert_eq!(
            stats,
            DocumentStats {
                nodes: 3,
                edges: 1,
                groups: 1,
                collapsed_groups: 1,
                hidden: 1,
            }
        );
    }

    #[test]
    fn test_validate_and_stats_commands() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, DOC).unwrap();

        let app = FlowgraphApp::new();
        assert!(app.validate_command(Some(path.clone()), false).is_ok());
        assert!(app.stats_command(Some(path), true).is_ok());
    }

    #[test]
    fn test_validate_command_rejects_cycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(
            &path,
            r#"{"nodes": [
                {"id": "x", "shape": "group-node", "group": true, "parent": "y"},
                {"id": "y", "shape": "group-node", "group": true, "parent": "x"}
            ]}"#,
        )
        .unwrap();

        let app = FlowgraphApp::new();
        assert!(app.validate_command(Some(path), false).is_err());
    }

    #[test]
    fn test_check_connection_command() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, DOC).unwrap();

        let app = FlowgraphApp::new();
        assert!(app
            .check_connection_command(Some(path.clone()), "b:in", "a:out")
            .is_ok());
        assert!(app
            .check_connection_command(Some(path), "a:out", "a:out")
            .is_err());
    }

    #[test]
    fn test_apply_command_writes_document() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("ops.json");
        let output = dir.path().join("out.json");
        fs::write(
            &script,
            r#"[
                {"op": "create", "template": "start", "id": "a"},
                {"op": "create", "template": "process", "id": "b", "y": 100},
                {"op": "connect", "source": "a:bottom", "target": "b:top"}
            ]"#,
        )
        .unwrap();

        let app = FlowgraphApp::new();
        app.apply_command(None, &script, Some(output.clone()), false)
            .unwrap();

        let doc = Document::from_json_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(doc.node_count(), 2);
        assert_eq!(doc.edge_count(), 1);
    }

    #[test]
    fn test_settings_command_persists() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("settings.json");

        let app = FlowgraphApp::new();
        app.settings_command(&file, &["zen_mode=true".to_string()])
            .unwrap();
        assert!(UiSettings::load(&file).unwrap().zen_mode);
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("editor.json");
        fs::write(&path, r#"{"history_limit": 5}"#).unwrap();
        assert_eq!(load_config(&path).unwrap().history_limit, 5);
    }

    #[test]
    fn test_read_write_roundtrip() {
        let app = FlowgraphApp::new();
        let dir = tempdir().unwrap();
        let path = dir.path().join("copy.json");

        app.write_output(Some(path.clone()), DOC).unwrap();
        assert_eq!(app.read_input(Some(path)).unwrap(), DOC);
    }
}

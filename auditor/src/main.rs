//! Smart-contract auditor CLI.
//!
//! `auditor analyze` runs one repair-and-verify analysis against the Foundry
//! project in the current directory (or `--project`). `auditor init` writes a
//! default `auditor.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use auditor::analyze::{AnalysisOutcome, run_analysis};
use auditor::core::types::{AnalysisRequest, PASS_DETAILS, PASS_RESULT, Verdict};
use auditor::exit_codes;
use auditor::io::config::{AuditorConfig, CONFIG_FILE_NAME, load_config, write_config};
use auditor::io::oracle::OpenAiOracle;
use auditor::io::toolchain::CommandToolchain;
use auditor::io::workspace::RunWorkspace;
use auditor::logging;
use auditor::notify::ConsoleNotifier;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "auditor",
    version,
    about = "Generate, repair and run Foundry tests to probe a contract for vulnerabilities"
)]
struct Cli {
    /// Foundry project root (defaults to the current directory).
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,
    /// Config file (defaults to `<project>/auditor.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `auditor.toml`.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Analyze one contract against a question.
    Analyze {
        /// Question about the contract's behavior.
        #[arg(short, long)]
        question: String,
        /// Path to the contract source.
        #[arg(short, long)]
        source: PathBuf,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.project.join(CONFIG_FILE_NAME));
    match cli.command {
        Command::Init { force } => cmd_init(&config_path, force),
        Command::Analyze { question, source } => {
            cmd_analyze(&cli.project, &config_path, question, &source)
        }
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", config_path.display());
        return Ok(exit_codes::OK);
    }
    write_config(config_path, &AuditorConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_analyze(project: &Path, config_path: &Path, question: String, source: &Path) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let source_code =
        fs::read_to_string(source).with_context(|| format!("read {}", source.display()))?;
    let request = AnalysisRequest {
        question,
        source_code,
    };
    request.validate()?;

    let oracle = OpenAiOracle::from_config(&cfg.oracle)?;
    let toolchain = CommandToolchain::from_config(&cfg.toolchain);
    let notifier = ConsoleNotifier { echo: true };

    let workspace = RunWorkspace::open(project, &cfg)?;
    let result = run_analysis(
        &workspace,
        &request,
        &oracle,
        &toolchain,
        &notifier,
        &cfg.repair,
    );
    let finished = workspace.finish();
    let outcome = result?;
    finished?;

    println!("{}", summary_line(&outcome));
    println!();
    let code = match &outcome.verdict {
        Verdict::Passed => {
            println!("{PASS_RESULT}\n{PASS_DETAILS}");
            exit_codes::OK
        }
        Verdict::Vulnerable { analysis } => {
            println!("{analysis}");
            exit_codes::VULNERABLE
        }
        Verdict::Unrepairable {
            stage,
            reason,
            last_output,
        } => {
            println!("unrepairable at {}: {reason}\n\n{last_output}", stage.as_str());
            exit_codes::UNREPAIRABLE
        }
    };
    Ok(code)
}

fn summary_line(outcome: &AnalysisOutcome) -> String {
    let verdict = match &outcome.verdict {
        Verdict::Passed => "passed".to_string(),
        Verdict::Vulnerable { .. } => "vulnerable".to_string(),
        Verdict::Unrepairable { stage, .. } => format!("unrepairable stage={}", stage.as_str()),
    };
    format!(
        "contract={} verdict={verdict} build_repairs={} import_repairs={} test_repairs={} archived={}",
        outcome.identity.name,
        outcome.repairs.build,
        outcome.repairs.import_path,
        outcome.repairs.test,
        outcome.archived.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditor::core::types::{ContractIdentity, RepairCounts, RepairStage};

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["auditor", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.project, PathBuf::from("."));
    }

    #[test]
    fn parse_analyze_with_global_flags() {
        let cli = Cli::parse_from([
            "auditor",
            "analyze",
            "--question",
            "Can shares be inflated?",
            "--source",
            "Vault.sol",
            "--project",
            "/tmp/proj",
            "--config",
            "custom.toml",
        ]);
        assert_eq!(cli.project, PathBuf::from("/tmp/proj"));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Command::Analyze { question, source } => {
                assert_eq!(question, "Can shares be inflated?");
                assert_eq!(source, PathBuf::from("Vault.sol"));
            }
            Command::Init { .. } => panic!("expected analyze"),
        }
    }

    #[test]
    fn summary_line_reports_counts() {
        let outcome = AnalysisOutcome {
            identity: ContractIdentity {
                name: "Vault".to_string(),
            },
            verdict: Verdict::Unrepairable {
                stage: RepairStage::ImportPath,
                reason: "budget".to_string(),
                last_output: String::new(),
            },
            repairs: RepairCounts {
                build: 1,
                import_path: 3,
                test: 0,
            },
            archived: Vec::new(),
        };
        assert_eq!(
            summary_line(&outcome),
            "contract=Vault verdict=unrepairable stage=import_path build_repairs=1 import_repairs=3 test_repairs=0 archived=0"
        );
    }
}

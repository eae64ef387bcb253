//! Orchestration for one `analyze` run.
//!
//! The run writes the submitted contract, asks the oracle for a Foundry test,
//! repairs the test (or the contract's imports) until the project builds, runs
//! the tests and turns the results into a [`Verdict`]. Completed runs archive
//! their artifacts; unrepairable or failed runs only clear the working roots.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::budget::{RepairBudget, RepairStop};
use crate::core::classifier::{
    BuildDiagnosis, TestDiagnosis, build_has_errors, classify_build, classify_test,
};
use crate::core::naming::resolve_identity;
use crate::core::sanitize::sanitize_code;
use crate::core::types::{
    AnalysisRequest, ContractIdentity, PASS_RESULT, RepairCounts, RepairStage, ToolchainOutput,
    Verdict,
};
use crate::io::config::RepairConfig;
use crate::io::oracle::{Message, Oracle};
use crate::io::prompt::PromptBook;
use crate::io::store::{clear_directory, list_project_files, move_files, write_artifact};
use crate::io::toolchain::Toolchain;
use crate::io::workspace::RunWorkspace;
use crate::notify::Notifier;

/// Result of a single analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub identity: ContractIdentity,
    pub verdict: Verdict,
    /// Oracle repairs requested per loop.
    pub repairs: RepairCounts,
    /// Archive paths of the artifacts moved at the end of a completed run.
    pub archived: Vec<PathBuf>,
}

/// Run the full analysis loop for `request` inside `workspace`.
///
/// Oracle and toolchain failures abort the run and propagate; the working roots
/// are cleared first. Loops that cannot make the project build or run end with
/// [`Verdict::Unrepairable`] instead.
#[instrument(skip_all, fields(root = %workspace.root().display()))]
pub fn run_analysis<O: Oracle, T: Toolchain>(
    workspace: &RunWorkspace,
    request: &AnalysisRequest,
    oracle: &O,
    toolchain: &T,
    notifier: &dyn Notifier,
    limits: &RepairConfig,
) -> Result<AnalysisOutcome> {
    request.validate()?;
    let identity = resolve_identity(&request.source_code);
    info!(contract = %identity.name, "starting analysis");

    let mut session = Session {
        workspace,
        oracle,
        toolchain,
        notifier,
        limits: *limits,
        prompts: PromptBook::new(),
        source_path: workspace.source_path(&identity),
        source_ref: workspace.relative_source_path(&identity),
        test_path: workspace.test_path(&identity),
        source: request.source_code.clone(),
        test: String::new(),
        repairs: RepairCounts::default(),
    };

    let verdict = match session.drive(request) {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "analysis aborted");
            session.discard();
            return Err(err);
        }
    };

    let archived = match &verdict {
        Verdict::Passed => {
            let archived = session.archive();
            notifier.emit(PASS_RESULT);
            archived
        }
        Verdict::Vulnerable { analysis } => {
            let archived = session.archive();
            notifier.emit(analysis);
            archived
        }
        Verdict::Unrepairable { stage, reason, .. } => {
            warn!(stage = stage.as_str(), %reason, "analysis unrepairable");
            session.discard();
            Vec::new()
        }
    };

    info!(
        contract = %identity.name,
        repairs = session.repairs.total(),
        archived = archived.len(),
        "analysis finished"
    );
    Ok(AnalysisOutcome {
        identity,
        verdict,
        repairs: session.repairs,
        archived,
    })
}

/// Mutable state of one run: the canonical working source and test.
struct Session<'a, O, T> {
    workspace: &'a RunWorkspace,
    oracle: &'a O,
    toolchain: &'a T,
    notifier: &'a dyn Notifier,
    limits: RepairConfig,
    prompts: PromptBook,
    source_path: PathBuf,
    /// Root-relative source path the generated test should import.
    source_ref: String,
    test_path: PathBuf,
    source: String,
    test: String,
    repairs: RepairCounts,
}

impl<O: Oracle, T: Toolchain> Session<'_, O, T> {
    fn drive(&mut self, request: &AnalysisRequest) -> Result<Verdict> {
        write_artifact(&self.source_path, &self.source, self.notifier)?;

        let refined_question = self
            .ask(self.prompts.refine_question(&request.question, &self.source)?)?
            .trim()
            .to_string();
        self.notifier.emit(&refined_question);

        let generated = self.ask(self.prompts.generate_test(
            &refined_question,
            &self.source,
            &self.source_ref,
        )?)?;
        self.notifier.emit(&format!("Generated Test:\n{generated}"));

        let refined = self.ask(self.prompts.refine_test(&generated, &refined_question)?)?;
        self.test = sanitize_code(&refined);
        self.notifier.emit(&format!("Refined Test:\n{}", self.test));
        write_artifact(&self.test_path, &self.test, self.notifier)?;

        if let Some(verdict) = self.build_until_clean()? {
            return Ok(verdict);
        }
        if let Some(verdict) = self.verify_build()? {
            return Ok(verdict);
        }
        self.run_tests(&request.question)
    }

    /// Build and repair until the build output is clean.
    fn build_until_clean(&mut self) -> Result<Option<Verdict>> {
        let mut test_budget = RepairBudget::new(self.limits.max_build_repairs, &self.test);
        let mut import_budget = RepairBudget::new(self.limits.max_import_repairs, &self.source);

        loop {
            let output = self.toolchain.build(self.workspace.root())?;
            match classify_build(&output) {
                BuildDiagnosis::Clean => {
                    self.notifier
                        .emit("Build Successful. No further fixes required.");
                    return Ok(None);
                }
                BuildDiagnosis::CodeDefect => {
                    self.notifier
                        .emit("Build Error Detected. Attempting to Fix...");
                    self.notifier.emit(&output.text);
                    if let Err(stop) = test_budget.check() {
                        return Ok(Some(unrepairable(RepairStage::Build, &stop, output)));
                    }
                    self.repairs.build += 1;
                    let repaired = self.repair_test(&output.text)?;
                    if let Err(stop) = test_budget.record(&repaired) {
                        return Ok(Some(unrepairable(RepairStage::Build, &stop, output)));
                    }
                    self.replace_test(repaired)?;
                }
                BuildDiagnosis::MissingImport => {
                    self.notifier
                        .emit("Build Error Detected. Attempting to Fix...");
                    self.notifier.emit(&output.text);
                    if let Err(stop) = import_budget.check() {
                        return Ok(Some(unrepairable(RepairStage::ImportPath, &stop, output)));
                    }
                    self.repairs.import_path += 1;
                    let repaired = self.repair_imports(&output.text)?;
                    if let Err(stop) = import_budget.record(&repaired) {
                        return Ok(Some(unrepairable(RepairStage::ImportPath, &stop, output)));
                    }
                    self.replace_source(repaired)?;
                }
            }
        }
    }

    /// Re-check the build once; leftover errors are not repaired again.
    fn verify_build(&mut self) -> Result<Option<Verdict>> {
        let output = self.toolchain.build(self.workspace.root())?;
        if !build_has_errors(&output) {
            return Ok(None);
        }
        self.notifier
            .emit(&format!("Build Error Detected:{}", output.text));
        Ok(Some(Verdict::Unrepairable {
            stage: RepairStage::VerifyBuild,
            reason: "build still reports errors after the repair loop".to_string(),
            last_output: output.text,
        }))
    }

    /// Run the tests, repairing the test script while its failures look self-inflicted.
    fn run_tests(&mut self, question: &str) -> Result<Verdict> {
        let mut output = self.toolchain.test(self.workspace.root())?;
        self.notifier
            .emit(&format!("Forge Test Results:\n{}", output.text));
        if classify_test(&output.text) == TestDiagnosis::Passed {
            return Ok(Verdict::Passed);
        }

        let mut budget = RepairBudget::new(self.limits.max_test_repairs, &self.test);
        while classify_test(&output.text) == TestDiagnosis::Repairable {
            self.notifier
                .emit("Test Script Error Detected. Attempting to Fix...");
            if let Err(stop) = budget.check() {
                return Ok(unrepairable(RepairStage::Test, &stop, output));
            }
            self.repairs.test += 1;
            let repaired = self.repair_test(&output.text)?;
            if let Err(stop) = budget.record(&repaired) {
                return Ok(unrepairable(RepairStage::Test, &stop, output));
            }
            self.replace_test(repaired)?;

            output = self.toolchain.test(self.workspace.root())?;
            self.notifier
                .emit(&format!("Re-run Forge Test Results:\n{}", output.text));
            if classify_test(&output.text) == TestDiagnosis::Passed {
                return Ok(Verdict::Passed);
            }
        }

        let analysis = self.ask(self.prompts.analyze_failure(
            &output.text,
            question,
            &self.test,
            &self.source,
        )?)?;
        Ok(Verdict::Vulnerable {
            analysis: analysis.trim().to_string(),
        })
    }

    fn ask(&self, messages: Vec<Message>) -> Result<String> {
        self.oracle.complete(&messages)
    }

    fn repair_test(&self, error_output: &str) -> Result<String> {
        let reply = self.ask(self.prompts.repair_test(error_output, &self.test)?)?;
        Ok(sanitize_code(&reply))
    }

    fn repair_imports(&self, error_output: &str) -> Result<String> {
        let listing = list_project_files(self.workspace.root());
        let reply = self.ask(
            self.prompts
                .repair_imports(error_output, &listing, &self.source)?,
        )?;
        Ok(sanitize_code(&reply))
    }

    fn replace_test(&mut self, repaired: String) -> Result<()> {
        self.test = repaired;
        write_artifact(&self.test_path, &self.test, self.notifier)?;
        self.notifier.emit("Fixed Test Code Written to File");
        Ok(())
    }

    fn replace_source(&mut self, repaired: String) -> Result<()> {
        self.source = repaired;
        write_artifact(&self.source_path, &self.source, self.notifier)?;
        self.notifier.emit(&format!(
            "Updated import paths in {}",
            self.source_path.display()
        ));
        self.notifier.emit(&self.source);
        self.notifier.emit("Fixed Source Code Written to File");
        Ok(())
    }

    /// Move source and test artifacts into the archive root, then clear both roots.
    fn archive(&self) -> Vec<PathBuf> {
        let ws = self.workspace;
        let ext = ws.source_extension();
        let mut archived = move_files(ws.src_dir(), ws.archive_dir(), ext, self.notifier).moved;
        archived.extend(move_files(ws.test_dir(), ws.archive_dir(), ext, self.notifier).moved);
        self.discard();
        archived
    }

    fn discard(&self) {
        clear_directory(self.workspace.src_dir(), self.notifier);
        clear_directory(self.workspace.test_dir(), self.notifier);
    }
}

fn unrepairable(stage: RepairStage, stop: &RepairStop, output: ToolchainOutput) -> Verdict {
    Verdict::Unrepairable {
        stage,
        reason: stop.to_string(),
        last_output: output.text,
    }
}

// src/engine/core.rs

//! Pure per-cycle state machine.
//!
//! [`CycleCore`] consumes [`CycleEvent`]s (a cycle started, a toolchain phase
//! finished) and answers with the [`CycleCommand`]s the IO shell should carry
//! out next. It never touches processes, channels or the filesystem, so the
//! gating rules (tests suppress restarts, verification builds are
//! informational, repeated compile errors are printed once) are unit-testable
//! in isolation.

use tracing::debug;

use crate::toolchain::BuildOutcome;

/// Which optional phases run each cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOptions {
    pub run_tests: bool,
    pub verify_build: bool,
    pub never_run: bool,
}

/// Input to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    /// A new cycle begins (initial pass or after a change).
    Start,
    Compiled(BuildOutcome),
    Tested(BuildOutcome),
    Verified(BuildOutcome),
}

/// What the developer should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Toolchain output, printed verbatim.
    Diagnostics(String),
    /// Short status line.
    Notice(String),
}

/// Instruction for the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleCommand {
    Compile,
    RunTests,
    VerifyBuild,
    Report(Report),
    Restart,
    Finish,
}

/// Commands produced by a single [`CycleCore::step`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStep {
    pub commands: Vec<CycleCommand>,
}

/// What happened during the most recent cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub compiled: bool,
    /// `None` when tests were not run this cycle.
    pub tests_passed: Option<bool>,
    /// `None` when no verification build ran this cycle.
    pub build_passed: Option<bool>,
    pub restarted: bool,
    /// The compile failed with the same diagnostics as the previous failure.
    pub diagnostics_repeated: bool,
}

#[derive(Debug)]
pub struct CycleCore {
    options: CycleOptions,
    /// Diagnostics of the last failed compile, reset by a successful one.
    last_compile_error: Option<String>,
    failed_compiles: u64,
    summary: CycleSummary,
}

impl CycleCore {
    pub fn new(options: CycleOptions) -> Self {
        Self {
            options,
            last_compile_error: None,
            failed_compiles: 0,
            summary: CycleSummary::default(),
        }
    }

    pub fn options(&self) -> CycleOptions {
        self.options
    }

    /// Summary of the current (or most recently finished) cycle.
    pub fn summary(&self) -> &CycleSummary {
        &self.summary
    }

    /// Failed compiles seen so far, including ones not re-printed.
    pub fn failed_compiles(&self) -> u64 {
        self.failed_compiles
    }

    pub fn step(&mut self, event: CycleEvent) -> CycleStep {
        let commands = match event {
            CycleEvent::Start => {
                self.summary = CycleSummary::default();
                vec![CycleCommand::Compile]
            }
            CycleEvent::Compiled(outcome) => self.handle_compiled(outcome),
            CycleEvent::Tested(outcome) => self.handle_tested(outcome),
            CycleEvent::Verified(outcome) => self.handle_verified(outcome),
        };
        CycleStep { commands }
    }

    fn handle_compiled(&mut self, mut outcome: BuildOutcome) -> Vec<CycleCommand> {
        if outcome.success {
            self.last_compile_error = None;
            self.summary.compiled = true;

            let mut commands = Vec::new();
            if !outcome.is_silent() {
                commands.push(CycleCommand::Report(Report::Diagnostics(outcome.diagnostics)));
            }
            commands.extend(self.after_compile());
            return commands;
        }

        self.failed_compiles += 1;
        outcome.repeated = self.last_compile_error.as_deref() == Some(outcome.diagnostics.as_str());
        self.summary.diagnostics_repeated = outcome.repeated;

        let mut commands = Vec::new();
        if outcome.repeated {
            debug!("compile failed again with identical diagnostics; not re-printing");
        } else {
            commands.push(CycleCommand::Report(Report::Diagnostics(
                outcome.diagnostics.clone(),
            )));
        }
        self.last_compile_error = Some(outcome.diagnostics);
        commands.push(CycleCommand::Finish);
        commands
    }

    fn handle_tested(&mut self, outcome: BuildOutcome) -> Vec<CycleCommand> {
        self.summary.tests_passed = Some(outcome.success);

        if !outcome.success {
            // A failing suite suppresses this cycle's restart.
            return vec![
                CycleCommand::Report(Report::Diagnostics(outcome.diagnostics)),
                CycleCommand::Finish,
            ];
        }

        let mut commands = vec![CycleCommand::Report(Report::Notice(
            "tests passed".to_string(),
        ))];
        commands.extend(self.after_tests());
        commands
    }

    fn handle_verified(&mut self, outcome: BuildOutcome) -> Vec<CycleCommand> {
        self.summary.build_passed = Some(outcome.success);

        // Informational only: a failed verification build never blocks the
        // restart.
        let mut commands = vec![if outcome.success {
            CycleCommand::Report(Report::Notice("build passed".to_string()))
        } else {
            CycleCommand::Report(Report::Diagnostics(outcome.diagnostics))
        }];
        commands.extend(self.after_verify());
        commands
    }

    fn after_compile(&mut self) -> Vec<CycleCommand> {
        if self.options.run_tests {
            vec![CycleCommand::RunTests]
        } else {
            self.after_tests()
        }
    }

    fn after_tests(&mut self) -> Vec<CycleCommand> {
        if self.options.verify_build {
            vec![CycleCommand::VerifyBuild]
        } else {
            self.after_verify()
        }
    }

    fn after_verify(&mut self) -> Vec<CycleCommand> {
        if self.options.never_run {
            return vec![CycleCommand::Finish];
        }
        self.summary.restarted = true;
        vec![CycleCommand::Restart, CycleCommand::Finish]
    }
}

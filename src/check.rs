//! The link-matrix check and the scenario runner.
//!
//! ## Reporter trait
//!
//! The runner reports per-case results through a [`Reporter`] trait so that
//! output format is separated from execution; [`ConsoleReporter`] is the
//! default pass/fail console format.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::cmake::{BuildTool, CmakeError};
use crate::component::{Component, LinkCase, LinkType, Outcome, LINK_MATRIX};
use crate::scenario::{Dirs, Scenario, ScenarioEnv, ScenarioKind};

/// Run one entry of the link matrix: clean, reconfigure the probe project
/// against `link` with source written for `code`, build, and run the test.
/// A `None` selection links (or compiles for) all components.
///
/// The outcome is `Failure` if any step exits non-zero; configuration,
/// compile, link, and runtime failures are deliberately not distinguished.
/// Spawn errors (the build tool missing entirely) abort the run instead.
pub fn check(
    tool: &dyn BuildTool,
    dirs: &Dirs,
    env: &ScenarioEnv,
    link: Option<Component>,
    code: Option<Component>,
    link_type: LinkType,
) -> Result<Outcome, CmakeError> {
    let build_dir = dirs.scratch_build_dir();
    fs::create_dir_all(&build_dir)?;
    let tool_env = env.tool_env();

    // Clean is idempotent; a never-built tree makes it fail harmlessly.
    let _ = tool.build(&build_dir, Some("clean"), &tool_env)?;

    // The scratch tree has no cached generator, so the probe configure is
    // the one place that selects it.
    let defines = configure_defines(link, code, link_type);
    if !tool.configure(&build_dir, Path::new(".."), &defines, true, &tool_env)? {
        return Ok(Outcome::Failure);
    }
    if !tool.build(&build_dir, None, &tool_env)? {
        return Ok(Outcome::Failure);
    }
    if !tool.ctest(&build_dir, &tool_env)? {
        return Ok(Outcome::Failure);
    }
    Ok(Outcome::Success)
}

fn component_value(selection: Option<Component>) -> String {
    selection.map(|c| c.as_str().to_string()).unwrap_or_default()
}

fn configure_defines(
    link: Option<Component>,
    code: Option<Component>,
    link_type: LinkType,
) -> Vec<(String, String)> {
    let mut defines = vec![
        ("EVENT__LINK_COMPONENT".to_string(), component_value(link)),
        ("EVENT__CODE_COMPONENT".to_string(), component_value(code)),
    ];
    if link_type == LinkType::Static {
        defines.push(("LIBEVENT_STATIC_LINK".to_string(), "1".to_string()));
    }
    defines
}

/// Result of evaluating one case against its expectation.
#[derive(Debug)]
pub enum CaseStatus {
    Passed(Duration),
    Failed {
        duration: Duration,
        expected: Outcome,
        observed: Outcome,
    },
    Skipped(&'static str),
}

/// Summary of a full run across all selected scenarios.
#[derive(Debug)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

/// Trait for reporting check results.
///
/// Implement this to customize output format.
pub trait Reporter {
    /// Called before a scenario's checks begin.
    fn on_scenario_start(&mut self, kind: ScenarioKind, case_count: usize);

    /// Called after each case completes (or is skipped).
    fn on_case_complete(&mut self, case: &LinkCase, status: &CaseStatus);

    /// Called once after every scenario has finished.
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Default console reporter: one line per case, colored status, and a final
/// `N passed, M failed` footer.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn on_scenario_start(&mut self, kind: ScenarioKind, case_count: usize) {
        println!();
        println!("[export-check] test for {}", kind.label());
        println!("collected {} case(s)", case_count);
    }

    fn on_case_complete(&mut self, case: &LinkCase, status: &CaseStatus) {
        match status {
            CaseStatus::Passed(d) => {
                println!(
                    "{} \x1b[32mPASSED\x1b[0m ({:.0}ms)",
                    case.name(),
                    d.as_millis()
                );
            }
            CaseStatus::Failed {
                duration,
                expected,
                observed,
            } => {
                println!(
                    "{} \x1b[31mFAILED\x1b[0m (expected {}, got {}, {:.0}ms)",
                    case.name(),
                    expected,
                    observed,
                    duration.as_millis()
                );
            }
            CaseStatus::Skipped(reason) => {
                println!("{} \x1b[33mSKIPPED\x1b[0m ({})", case.name(), reason);
            }
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        println!();
        let color = if summary.failed > 0 {
            "\x1b[1;31m"
        } else {
            "\x1b[1;32m"
        };

        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("{} passed", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed));
        }
        if summary.skipped > 0 {
            parts.push(format!("{} skipped", summary.skipped));
        }
        if parts.is_empty() {
            parts.push("no cases evaluated".to_string());
        }

        println!(
            "{}====== {} in {:.2}s ======\x1b[0m",
            color,
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
    }
}

/// Drives the link matrix across the selected scenarios, strictly
/// sequentially, one subprocess at a time.
pub struct Runner<'a> {
    pub tool: &'a dyn BuildTool,
    pub dirs: &'a Dirs,
    pub link_type: LinkType,
    /// Evaluate the normally-disabled lattice cases as well.
    pub all_cases: bool,
}

impl Runner<'_> {
    /// Run every selected case under every selected scenario.
    ///
    /// Returns the aggregate summary; the caller decides the process exit
    /// code from `summary.failed`.
    pub fn run(
        &self,
        scenarios: &[ScenarioKind],
        reporter: &mut dyn Reporter,
    ) -> Result<RunSummary, CmakeError> {
        let start = Instant::now();

        // Discard any scratch tree left over from a previous run.
        let _ = fs::remove_dir_all(self.dirs.scratch_build_dir());

        let cases: Vec<&LinkCase> = LINK_MATRIX
            .iter()
            .filter(|c| c.enabled || self.all_cases)
            .collect();

        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for &kind in scenarios {
            reporter.on_scenario_start(kind, cases.len());
            let scenario = Scenario::set_up(kind, self.dirs, self.tool, self.link_type)?;

            for case in &cases {
                if !case.runs_on_this_platform() {
                    skipped += 1;
                    reporter.on_case_complete(case, &CaseStatus::Skipped("not supported on Windows"));
                    continue;
                }

                let case_start = Instant::now();
                let observed = check(
                    self.tool,
                    self.dirs,
                    &scenario.env,
                    case.link,
                    case.code,
                    self.link_type,
                )?;
                let duration = case_start.elapsed();

                let status = if observed == case.expected {
                    passed += 1;
                    CaseStatus::Passed(duration)
                } else {
                    failed += 1;
                    CaseStatus::Failed {
                        duration,
                        expected: case.expected,
                        observed,
                    }
                };
                reporter.on_case_complete(case, &status);
            }

            scenario.tear_down(self.dirs, self.tool)?;
        }

        let summary = RunSummary {
            passed,
            failed,
            skipped,
            duration: start.elapsed(),
        };
        reporter.on_run_complete(&summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_link_adds_the_static_directive() {
        let defines = configure_defines(
            Some(Component::Core),
            Some(Component::Core),
            LinkType::Static,
        );
        assert!(defines.contains(&("LIBEVENT_STATIC_LINK".to_string(), "1".to_string())));
    }

    #[test]
    fn shared_link_omits_the_static_directive() {
        let defines = configure_defines(
            Some(Component::Core),
            Some(Component::Extra),
            LinkType::Shared,
        );
        assert_eq!(
            defines,
            vec![
                ("EVENT__LINK_COMPONENT".to_string(), "core".to_string()),
                ("EVENT__CODE_COMPONENT".to_string(), "extra".to_string()),
            ]
        );
    }

    #[test]
    fn all_components_selection_is_an_empty_directive() {
        let defines = configure_defines(None, None, LinkType::Shared);
        assert_eq!(
            defines,
            vec![
                ("EVENT__LINK_COMPONENT".to_string(), String::new()),
                ("EVENT__CODE_COMPONENT".to_string(), String::new()),
            ]
        );
    }
}

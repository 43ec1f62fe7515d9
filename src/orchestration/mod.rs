//! Build orchestration
//!
//! Assembles a solve request from parsed options, runs the engine call and
//! the status consumers as one task group, and reports a single outcome.

mod engine;
mod factory;
mod group;
mod process;
mod solve;

pub use engine::{BuildEngine, SolveRequest, SolveResponse};
pub use factory::create_engine;
pub use group::TaskGroup;
pub use process::ProcessEngine;
pub use solve::{execute, prepare, run_build, BuildOptions, PreparedBuild};

/// Max number of output lines to include in engine error messages.
const ENGINE_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of engine output for error diagnostics.
///
/// Returns the last `ENGINE_ERROR_TAIL_LINES` lines so error messages are
/// actionable without being overwhelming.
pub(crate) fn engine_error_output(lines: &[String]) -> String {
    let total = lines.len();
    let tail = if total > ENGINE_ERROR_TAIL_LINES {
        &lines[total - ENGINE_ERROR_TAIL_LINES..]
    } else {
        lines
    };
    tail.join("\n")
}

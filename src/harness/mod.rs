//! Regression harness for the diagram engine's HTTP API.
//!
//! A scenario is a fixed, linear sequence of named steps. Each step is
//! recorded in a [`StepLog`]; the first failing step ends the scenario and
//! [`run_test`] turns the log into a [`TestReport`] and an exit code.
//!
//! ```text
//! run_test ──▶ scenario(ctx) ──▶ ctx.check(step, api call) ──▶ StepLog
//!     │                                                          │
//!     └──────────────────── TestReport ◀─────────────────────────┘
//! ```

pub mod context;
pub mod error;
pub mod runner;
pub mod scenarios;
pub mod step;

pub use context::ScenarioContext;
pub use error::{ensure, HarnessError, HarnessResult};
pub use runner::{run_test, RunOptions, TestReport};
pub use step::{StepLog, StepRecord, StepStatus, StepTracker};

//! Application layer containing the experiment's orchestration.
//!
//! `PayoffEngine` holds the decision and payoff rules. `ExperimentSession`
//! drives every participant through the page sequence on its own `tokio` task
//! and meets them at the wait page before results are shown.

pub mod engine;
pub mod script;
pub mod session;

//! Test execution engine
//!
//! Attempts run under a timeout, retries with exponential backoff, and a
//! scheduler that bounds how many test cases are in flight.

mod attempt;
mod collector;
mod policy;
mod retry;
mod scheduler;

#[cfg(test)]
mod stubs;

pub use attempt::AttemptRunner;
pub use collector::split;
pub use policy::ExecutionPolicy;
pub use retry::RetryController;
pub use scheduler::Scheduler;

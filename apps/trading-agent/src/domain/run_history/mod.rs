//! Run History Bounded Context
//!
//! One [`RunRecord`] per evaluation cycle, opened when the cycle starts and
//! closed exactly once.

mod run_record;

pub use run_record::{RunOutcome, RunRecord};

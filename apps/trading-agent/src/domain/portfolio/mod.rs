//! Portfolio Bounded Context
//!
//! Account risk configuration and signed positions. Both are owned by the
//! ledger; the agent only reads them and proposes deltas.

mod account;
mod position;

pub use account::Account;
pub use position::{Position, PositionDelta};

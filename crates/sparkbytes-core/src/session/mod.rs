//! Session gating: the per-page check and the shared session context.

mod context;
mod gate;

pub use context::SessionContext;
pub use gate::{SessionGate, Verdict};

#[cfg(test)]
mod tests;

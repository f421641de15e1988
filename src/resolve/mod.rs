// Conflict resolution
// Modified Voltage Potential kernel, pair coordination and fleet aggregation

pub mod mvp;
pub mod strategy;
pub mod fleet;

pub use mvp::{resolve_pair, resolve_conflict};
pub use strategy::{CoordinationStrategy, Independent, Share, Symmetric, strategy_for};
pub use fleet::{resolve_fleet, ResolutionSummary};

pub mod components;
pub mod listeners;
pub mod scorer;

pub use components::{ScoreInputs, ELITE_COMPOSITE_THRESHOLD};
pub use listeners::ScoreRefreshListener;
pub use scorer::{ReliabilityScorer, ReviewRequest};

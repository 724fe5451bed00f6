pub mod goal;
pub mod inserter;
pub mod parallel;
pub mod policy;
pub mod types;

pub use goal::{strategy_for, DemandSupplyGoal, GoalStrategy, MinWaitTimeGoal, SearchSide};
pub use inserter::RuleBasedInserter;
pub use policy::{score_candidate, ScoreComponents, ZoneBalance};
pub use types::{Assignment, Candidate, Proposal};

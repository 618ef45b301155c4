//! C5: the active-matching engine (§4.5) and its graph-free inventory state.

pub mod engine;
pub mod inventory;
pub mod pair_finder;

pub use engine::MatchingEngine;

//! Journey tracking — the authoritative touchpoint/journey store, the
//! session-window stitcher, and the query façade serving journeys and mined
//! insight collections.

pub mod engine;
pub mod seed;
pub mod stitcher;
pub mod store;

pub use engine::JourneyEngine;
pub use stitcher::JourneyStitcher;
pub use store::{JourneyStore, MemoryJourneyStore};

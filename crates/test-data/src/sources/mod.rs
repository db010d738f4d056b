//! Synthetic track sources.

mod procedural;

pub use procedural::{ProceduralGenerator, TrackConfig};

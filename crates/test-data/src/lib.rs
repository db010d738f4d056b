//! Test data generation for track-metrics.
//!
//! Produces synthetic GPS tracks and renders them as GPX so the pipeline can
//! be exercised through the same parser path as real uploads.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_data::prelude::*;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let file = ProceduralGenerator::new()
//!     .with_speed(25.0)
//!     .generate_segmented(2, 300, 0.01, 120.0, &mut rng);
//! let bytes = generate_gpx(&file, "Lunch Ride");
//! ```

pub mod gpx;
pub mod sources;

pub use track_metrics::models::{ParsedFile, ParsedSegment, ParsedTrack, TrackPointData};

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::gpx::generate_gpx;
    pub use crate::sources::{ProceduralGenerator, TrackConfig};
    pub use crate::{ParsedFile, ParsedSegment, ParsedTrack, TrackPointData};
    pub use rand::{SeedableRng, rngs::StdRng};
}

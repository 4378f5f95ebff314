//! Geographic reference data and the territory partitioner
//!
//! Counties are loaded once and never mutated. Teams carry the seed points
//! the partitioner measures against.

pub mod color;
pub mod county;
pub mod metric;
pub mod partition;
pub mod team;

pub use color::Color;
pub use county::{County, CountyAtlas};
pub use metric::DistanceMetric;
pub use partition::{partition, GeometryIssue, Partition};
pub use team::Team;

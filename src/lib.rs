//! Temporal migration matrix of a location-annotated phylogeny.
//!
//! Every branch of the tree is placed on an integer calendar and counted, for
//! each year it spans, under the ordered pair of its parent's location and
//! its own location.

pub mod attributes;
pub mod calendar;
pub mod error;
pub mod matrix;
pub mod node_numbers;
pub mod pipeline;
pub mod placement;
pub mod tree;

pub use attributes::{AttributeTable, NodeAttributes};
pub use calendar::Calendar;
pub use error::{MigrationError, Result};
pub use matrix::MigrationMatrix;
pub use pipeline::{build_matrix, MigrationRun, Settings, Summary};
pub use placement::{place_branch, LocationSet, Placement};
pub use tree::Tree;

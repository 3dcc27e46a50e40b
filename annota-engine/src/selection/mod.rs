//! Hierarchical label path selection
//!
//! [`PathState`] is the pure navigation/label-path state machine;
//! [`TaxonomyPathSelector`] fetches nodes for it.

pub mod path_selector;
pub mod path_state;

pub use path_selector::{LevelListing, SearchSettings, TaxonomyPathSelector, EMPTY_LEVEL_HINT};
pub use path_state::{BreadcrumbEntry, NavState, PathError, PathState, Position};

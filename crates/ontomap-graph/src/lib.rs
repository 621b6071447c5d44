//! Ontomap graph layer
//!
//! The fact store that mapping specifications, source data and derived target
//! data all live in:
//!
//! ```text
//!   spec graph ─┐
//!   libraries ──┼──► UnionView (read-only, non-distinct) ──► rules
//!   source ─────┤
//!   target ─────┘                                  writes ──► target Graph
//! ```
//!
//! ## Module Organization
//!
//! - `term`: RDF terms and triples
//! - `graph`: indexed in-memory store and the `GraphRead` trait
//! - `view`: union views over several graphs
//! - `schema`: class hierarchy and individual classification
//! - `io`: N-Triples / Turtle / RDF-XML reading, N-Triples writing
//! - `vocab`: RDF, OWL and mapping vocabulary

pub mod graph;
pub mod io;
pub mod schema;
pub mod term;
pub mod view;
pub mod vocab;

// Re-export key types
pub use graph::{Graph, GraphRead};
pub use schema::ClassHierarchy;
pub use term::{local_name, Literal, Term, Triple};
pub use view::UnionView;

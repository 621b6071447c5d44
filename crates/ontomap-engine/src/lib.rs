//! # ontomap-engine
//!
//! Rule selection, call building and fixpoint inference for mappings between
//! graphs. The mapping specification is itself a graph: Contexts bind a
//! source class to a target class, PropertyBridges bind source properties to
//! a target property, and both are parameterized by function calls stored as
//! facts.
//!
//! ```text
//!   CallBuilder ──build──► Call ──write──► specification graph
//!                                                │
//!                                      select_rules (BTreeSet<Rule>)
//!                                                │
//!   source graph ──► InferenceEngine ◄── QueryAssembler (merged views)
//!                         │
//!                         ▼
//!                    target graph
//! ```
//!
//! ## Example
//!
//! ```
//! use ontomap_engine::{MapManager, MapResult};
//! use ontomap_graph::{Graph, GraphRead, Term, Triple};
//!
//! fn main() -> MapResult<()> {
//!     let manager = MapManager::default();
//!     let mut model = manager.create_model();
//!     let ctx = model.create_context("http://ex.org/map#person", "http://ex.org/A", "http://ex.org/B");
//!     model.set_target(&ctx, &manager.builder("self")?.build()?)?;
//!
//!     let mut source = Graph::new();
//!     source.insert(Triple::typed(Term::iri("http://ex.org/x"), Term::iri("http://ex.org/A")));
//!     let mut target = Graph::new();
//!     manager.run(&model, &source, &mut target)?;
//!     assert!(target.contains(&Triple::typed(Term::iri("http://ex.org/x"), Term::iri("http://ex.org/B"))));
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod call;
pub mod config;
pub mod derive;
pub mod error;
pub mod function;
pub mod infer;
pub mod manager;
pub mod model;
pub mod rule;

pub use assemble::QueryAssembler;
pub use call::{BuiltCall, Call, CallBuilder, CallValue};
pub use config::MapConfig;
pub use derive::{Bindings, CallDerivation, Derivation};
pub use error::{ErrorKey, ErrorKind, MapError, MapResult};
pub use function::{ArgDescriptor, FunctionDescriptor, FunctionRegistry};
pub use infer::{InferenceEngine, InferenceStats};
pub use manager::{MapManager, SharedModel};
pub use model::MappingModel;
pub use rule::{select_rules, Rule, RuleBody, RuleHead, RuleKind};

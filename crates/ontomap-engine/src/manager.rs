//! Mapping manager: owns configuration, the function registry and the
//! support library, and hands out builders, models and inference runs.
//!
//! A manager is `Send + Sync`. Specifications shared between threads go in a
//! [`SharedModel`]: runs take the read lock, edits take the write lock. Runs
//! never write to the shared registry. Each evaluates with a private fork
//! holding its specification's custom functions, so runs over different
//! specifications may share one manager.

use anyhow::{Context as _, Result};
use ontomap_graph::io::{read_graph, write_graph};
use ontomap_graph::Graph;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::call::CallBuilder;
use crate::config::MapConfig;
use crate::error::MapResult;
use crate::function::FunctionRegistry;
use crate::infer::{InferenceEngine, InferenceStats};
use crate::model::MappingModel;
use crate::rule::Rule;

/// A specification shared between threads.
pub type SharedModel = Arc<RwLock<MappingModel>>;

#[derive(Debug)]
pub struct MapManager {
    config: MapConfig,
    functions: Arc<FunctionRegistry>,
    library: Graph,
}

impl MapManager {
    /// A manager with the built-in function library.
    pub fn new(config: MapConfig) -> Self {
        Self::with_registry(config, Arc::new(FunctionRegistry::with_builtins()))
    }

    pub fn with_registry(config: MapConfig, functions: Arc<FunctionRegistry>) -> Self {
        let library = functions.to_library_graph();
        Self {
            config,
            functions,
            library,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Function declarations and mapping vocabulary, as facts.
    pub fn library(&self) -> &Graph {
        &self.library
    }

    /// Rebuild the library graph after functions were registered.
    pub fn refresh_library(&mut self) {
        self.library = self.functions.to_library_graph();
    }

    pub fn create_model(&self) -> MappingModel {
        MappingModel::new()
    }

    pub fn share(model: MappingModel) -> SharedModel {
        Arc::new(RwLock::new(model))
    }

    /// A builder for a call to `function`, strict when configured so.
    pub fn builder(&self, function: &str) -> MapResult<CallBuilder> {
        let builder = self.functions.builder(function)?;
        builder.strict(self.config.strict_optional_args);
        Ok(builder)
    }

    pub fn engine<'a>(&'a self, model: &'a MappingModel) -> InferenceEngine<'a> {
        InferenceEngine::new(model.graph(), &self.library, &self.functions, &self.config)
    }

    pub fn select_rules(&self, model: &MappingModel) -> MapResult<BTreeSet<Rule>> {
        self.engine(model).select_rules()
    }

    pub fn run(&self, model: &MappingModel, source: &Graph, target: &mut Graph) -> MapResult<InferenceStats> {
        self.engine(model).run(source, target)
    }

    pub fn run_in_place(&self, model: &MappingModel, graph: &mut Graph) -> MapResult<InferenceStats> {
        self.engine(model).run_in_place(graph)
    }

    /// Run against a shared specification, holding its read lock for the run.
    pub fn run_shared(
        &self,
        model: &SharedModel,
        source: &Graph,
        target: &mut Graph,
    ) -> MapResult<InferenceStats> {
        let model = model.read();
        self.run(&model, source, target)
    }

    /// Read `source_path`, map it into the graph at `target_path` (created if
    /// missing) and write the target back as N-Triples.
    pub fn run_files(
        &self,
        model: &MappingModel,
        source_path: &Path,
        target_path: &Path,
    ) -> Result<InferenceStats> {
        let source = read_graph(source_path)?;
        let mut target = if target_path.exists() {
            read_graph(target_path)?
        } else {
            Graph::new()
        };
        let stats = self
            .run(model, &source, &mut target)
            .with_context(|| format!("mapping {} failed", source_path.display()))?;
        write_graph(&target, target_path)?;
        info!(
            source = %source_path.display(),
            target = %target_path.display(),
            facts = target.len(),
            "wrote target graph"
        );
        Ok(stats)
    }
}

impl Default for MapManager {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

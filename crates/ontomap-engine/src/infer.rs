//! Inference executor: the worklist engine that applies rules to individuals.
//!
//! ```text
//!   select rules ─► direct pass over source individuals ─┐
//!                       │ (frontier > threshold)          │
//!                       ▼                                 ▼
//!                   eager drain ◄───────────────────── final drain ─► done
//! ```
//!
//! Every derived `rdf:type` fact puts its subject on the frontier, because the
//! new type may match rules the individual was not considered for yet. The
//! processed record guarantees each (individual, rule) pair runs at most once
//! per run, which is also what makes the drain terminate.

use ahash::{AHashMap, AHashSet};
use ontomap_graph::{vocab, ClassHierarchy, Graph, GraphRead, Term};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::assemble::QueryAssembler;
use crate::config::MapConfig;
use crate::derive::{CallDerivation, Derivation};
use crate::error::{ErrorKey, ErrorKind, MapError, MapResult};
use crate::function::FunctionRegistry;
use crate::model::register_custom_functions;
use crate::rule::{select_rules, Rule};

/// Counters reported by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InferenceStats {
    /// Source individuals classified in the direct pass
    pub individuals: usize,
    pub rule_executions: usize,
    /// Facts that were not already in the target
    pub facts_written: usize,
    /// Eager frontier drains triggered by the threshold
    pub flushes: usize,
}

// ============================================================================
// Per-run state
// ============================================================================

/// Super-class lookups memoized per class.
struct ClassCache {
    hierarchy: ClassHierarchy,
    supers: AHashMap<Term, BTreeSet<Term>>,
}

impl ClassCache {
    fn new(hierarchy: ClassHierarchy) -> Self {
        Self {
            hierarchy,
            supers: AHashMap::new(),
        }
    }

    /// Swap in a rebuilt hierarchy and forget everything memoized from the old one.
    fn reset(&mut self, hierarchy: ClassHierarchy) {
        self.hierarchy = hierarchy;
        self.supers.clear();
    }

    fn classes_of(&mut self, graph: &dyn GraphRead, individual: &Term) -> BTreeSet<Term> {
        let hierarchy = &self.hierarchy;
        let mut out = BTreeSet::new();
        for class in graph.objects(individual, vocab::RDF_TYPE) {
            let supers = self
                .supers
                .entry(class.clone())
                .or_insert_with(|| hierarchy.super_classes(&class));
            out.extend(supers.iter().cloned());
            out.insert(class);
        }
        out
    }

    fn len(&self) -> usize {
        self.supers.len()
    }

    fn clear(&mut self) {
        self.supers.clear();
    }
}

struct RunState {
    rules: Vec<Rule>,
    /// Subject class -> rule indices, ascending
    by_class: AHashMap<Term, Vec<usize>>,
    processed: AHashMap<Term, AHashSet<usize>>,
    frontier: VecDeque<Term>,
    pending: AHashSet<Term>,
    /// Set when a derived `rdfs:subClassOf` fact invalidates the target hierarchy
    target_schema_changed: bool,
    stats: InferenceStats,
}

impl RunState {
    fn new(rules: BTreeSet<Rule>) -> Self {
        let rules: Vec<Rule> = rules.into_iter().collect();
        let mut by_class: AHashMap<Term, Vec<usize>> = AHashMap::new();
        for (index, rule) in rules.iter().enumerate() {
            by_class
                .entry(rule.subject_class().clone())
                .or_default()
                .push(index);
        }
        Self {
            rules,
            by_class,
            processed: AHashMap::new(),
            frontier: VecDeque::new(),
            pending: AHashSet::new(),
            target_schema_changed: false,
            stats: InferenceStats::default(),
        }
    }

    /// Indices of rules applicable to any of `classes`, in rule order.
    fn matching(&self, classes: &BTreeSet<Term>) -> BTreeSet<usize> {
        classes
            .iter()
            .filter_map(|class| self.by_class.get(class))
            .flatten()
            .copied()
            .collect()
    }

    fn enqueue(&mut self, individual: Term) {
        if self.pending.insert(individual.clone()) {
            self.frontier.push_back(individual);
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Applies the rules of one specification to source graphs.
///
/// The engine evaluates with its own fork of the registry it is built from.
/// Custom functions declared by the specification are registered into that
/// fork only, so engines over different specifications never see each
/// other's declarations, and later registrations on the shared registry do
/// not reach a run in progress.
pub struct InferenceEngine<'a> {
    assembler: QueryAssembler<'a>,
    functions: Arc<FunctionRegistry>,
    config: &'a MapConfig,
    derivation: Box<dyn Derivation + 'a>,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(
        spec: &'a Graph,
        library: &'a Graph,
        registry: &FunctionRegistry,
        config: &'a MapConfig,
    ) -> Self {
        let functions = Arc::new(registry.fork());
        Self {
            assembler: QueryAssembler::new(spec, library),
            derivation: Box::new(CallDerivation::new(functions.clone())),
            functions,
            config,
        }
    }

    /// Replace the derivation primitive used by generic rules.
    pub fn with_derivation(mut self, derivation: Box<dyn Derivation + 'a>) -> Self {
        self.derivation = derivation;
        self
    }

    pub fn assembler(&self) -> &QueryAssembler<'a> {
        &self.assembler
    }

    /// The engine's own registry. A replacement derivation should evaluate
    /// through this one to see the specification's custom functions.
    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Re-register the specification's custom functions and select its rules.
    pub fn select_rules(&self) -> MapResult<BTreeSet<Rule>> {
        let view = self.assembler.spec_view();
        register_custom_functions(&view, &self.functions)?;
        select_rules(&view, &self.functions, self.config)
    }

    /// Map `source` into `target`.
    pub fn run(&self, source: &Graph, target: &mut Graph) -> MapResult<InferenceStats> {
        self.execute(Some(source), target)
    }

    /// Map a graph onto itself; source individuals are snapshotted before
    /// any fact is written.
    pub fn run_in_place(&self, graph: &mut Graph) -> MapResult<InferenceStats> {
        self.execute(None, graph)
    }

    fn execute(&self, source: Option<&Graph>, target: &mut Graph) -> MapResult<InferenceStats> {
        let rules = self.select_rules()?;
        if rules.is_empty() {
            return Err(MapError::new(ErrorKind::NoRules));
        }
        let mut state = RunState::new(rules);

        let (individuals, source_hierarchy) = {
            let source_graph: &Graph = source.unwrap_or(&*target);
            (
                direct_individuals(source_graph),
                self.assembler.source_hierarchy(source_graph, &*target),
            )
        };
        if individuals.is_empty() {
            warn!("no classifiable individuals in source");
            return Ok(state.stats);
        }
        let mut source_classes = ClassCache::new(source_hierarchy);
        let mut target_classes = ClassCache::new(self.assembler.target_hierarchy(&*target));
        let threshold = self.config.frontier_threshold;

        for individual in &individuals {
            let classes = {
                let source_graph: &Graph = source.unwrap_or(&*target);
                source_classes.classes_of(source_graph, individual)
            };
            self.apply(&mut state, individual, &classes, source, target)?;
            state.stats.individuals += 1;

            if state.frontier.len() > threshold {
                debug!(frontier = state.frontier.len(), threshold, "eager frontier drain");
                state.stats.flushes += 1;
                self.drain(&mut state, &mut target_classes, source, target)?;
            }
            if source_classes.len() > threshold {
                source_classes.clear();
            }
            if target_classes.len() > threshold {
                target_classes.clear();
            }
        }
        self.drain(&mut state, &mut target_classes, source, target)?;

        info!(
            rules = state.rules.len(),
            individuals = state.stats.individuals,
            rule_executions = state.stats.rule_executions,
            facts_written = state.stats.facts_written,
            flushes = state.stats.flushes,
            "inference complete"
        );
        Ok(state.stats)
    }

    /// Process the frontier until it is empty. Individuals derived while
    /// draining join the same queue.
    fn drain(
        &self,
        state: &mut RunState,
        target_classes: &mut ClassCache,
        source: Option<&Graph>,
        target: &mut Graph,
    ) -> MapResult<()> {
        while let Some(individual) = state.frontier.pop_front() {
            state.pending.remove(&individual);
            if std::mem::take(&mut state.target_schema_changed) {
                debug!("rebuilding target class hierarchy");
                target_classes.reset(self.assembler.target_hierarchy(&*target));
            }
            let classes = target_classes.classes_of(&*target, &individual);
            self.apply(state, &individual, &classes, source, target)?;
        }
        Ok(())
    }

    /// Run every not yet processed rule matching `classes` for `individual`
    /// and write the derived facts into `target`.
    fn apply(
        &self,
        state: &mut RunState,
        individual: &Term,
        classes: &BTreeSet<Term>,
        source: Option<&Graph>,
        target: &mut Graph,
    ) -> MapResult<()> {
        for index in state.matching(classes) {
            if !state
                .processed
                .entry(individual.clone())
                .or_default()
                .insert(index)
            {
                continue;
            }
            let rule = &state.rules[index];
            let facts = {
                let view = self
                    .assembler
                    .view(source.map(|g| g as &dyn GraphRead), &*target);
                rule.run(individual, &view, self.derivation.as_ref())
            }
            .map_err(|cause| {
                MapError::new(ErrorKind::RuleExecutionFail)
                    .with(ErrorKey::Rule, rule)
                    .with(ErrorKey::Instance, individual)
                    .with(ErrorKey::Context, rule.context())
                    .with_cause(cause)
            })?;
            state.stats.rule_executions += 1;

            for fact in facts {
                let derived_type = fact.is_type_assertion().then(|| fact.subject.clone());
                let subclass = fact.predicate.as_iri() == Some(vocab::RDFS_SUBCLASS_OF);
                if target.insert(fact) {
                    state.stats.facts_written += 1;
                    state.target_schema_changed |= subclass;
                }
                if let Some(subject) = derived_type {
                    state.enqueue(subject);
                }
            }
        }
        Ok(())
    }
}

/// Typed subjects of `graph` that are not schema classes.
fn direct_individuals(graph: &Graph) -> Vec<Term> {
    graph
        .typed_subjects()
        .into_iter()
        .filter(|subject| {
            !graph
                .objects(subject, vocab::RDF_TYPE)
                .iter()
                .any(|class| class.as_iri().is_some_and(vocab::is_schema_class))
        })
        .collect()
}

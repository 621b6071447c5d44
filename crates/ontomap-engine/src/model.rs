//! Mapping model: Contexts, PropertyBridges and custom functions stored as
//! facts in a specification graph.
//!
//! ```text
//! ctx  rdf:type map:Context ; map:sourceClass S ; map:targetClass T ;
//!      map:target <call> [; map:filter <call>]
//! _:pb rdf:type map:PropertyBridge ; map:context ctx ;
//!      map:sourceProperty1 p1 ... ; map:targetProperty P ;
//!      map:expression <call> [; map:filter <call>]
//! f    rdf:type map:CustomFunction ; map:body <call>
//! ```
//!
//! The read side (`read_contexts`, `read_bridges`, `read_custom_functions`)
//! works on any [`GraphRead`], so rule selection can scan a merged view.

use ontomap_graph::{vocab, Graph, GraphRead, Term, Triple};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::call::{read_call, remove_call, write_call, Call};
use crate::error::{ErrorKey, ErrorKind, MapError, MapResult};
use crate::function::{FunctionDescriptor, FunctionRegistry};

// ============================================================================
// Read side
// ============================================================================

/// A Context as found in a graph. Fields are `None` when the fact is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSpec {
    pub iri: Term,
    pub source_class: Option<Term>,
    pub target_class: Option<Term>,
    pub target: Option<Term>,
    pub filter: Option<Term>,
}

/// A PropertyBridge as found in a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSpec {
    pub node: Term,
    pub context: Term,
    /// `map:sourcePropertyK` objects keyed by K. Indices need not be contiguous.
    pub sources: BTreeMap<usize, Term>,
    pub target_property: Option<Term>,
    pub expression: Option<Term>,
    pub filter: Option<Term>,
}

/// A custom function declaration: its IRI and the root of its body call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFunctionSpec {
    pub iri: Term,
    pub body: Term,
}

/// All Contexts in `graph`, sorted by IRI.
pub fn read_contexts(graph: &dyn GraphRead) -> Vec<ContextSpec> {
    graph
        .subjects(vocab::RDF_TYPE, &Term::iri(vocab::MAP_CONTEXT))
        .into_iter()
        .map(|iri| ContextSpec {
            source_class: single_object(graph, &iri, vocab::MAP_SOURCE_CLASS),
            target_class: single_object(graph, &iri, vocab::MAP_TARGET_CLASS),
            target: single_object(graph, &iri, vocab::MAP_TARGET),
            filter: single_object(graph, &iri, vocab::MAP_FILTER),
            iri,
        })
        .collect()
}

/// The first object of `subject predicate ?o` in term order. More than one is
/// an authoring error; the first wins so selection stays deterministic.
fn single_object(graph: &dyn GraphRead, subject: &Term, predicate: &str) -> Option<Term> {
    let objects = graph.objects(subject, predicate);
    if objects.len() > 1 {
        warn!(
            subject = %subject,
            predicate,
            count = objects.len(),
            using = %objects[0],
            "several values for a single-valued property"
        );
    }
    objects.into_iter().next()
}

/// PropertyBridges owned by `context`.
pub fn read_bridges(graph: &dyn GraphRead, context: &Term) -> Vec<BridgeSpec> {
    graph
        .subjects(vocab::MAP_CONTEXT_REF, context)
        .into_iter()
        .map(|node| {
            let mut indexed: Vec<(usize, Term)> = graph
                .find(Some(&node), None, None)
                .filter_map(|t| {
                    let index = t.predicate.as_iri().and_then(vocab::source_property_index)?;
                    Some((index, t.object))
                })
                .collect();
            indexed.sort();
            indexed.dedup();
            let mut sources = BTreeMap::new();
            for (index, property) in indexed {
                if let Some(kept) = sources.get(&index) {
                    warn!(bridge = %node, index, kept = %kept, ignored = %property, "duplicate source property index");
                    continue;
                }
                sources.insert(index, property);
            }
            BridgeSpec {
                context: context.clone(),
                sources,
                target_property: single_object(graph, &node, vocab::MAP_TARGET_PROPERTY),
                expression: single_object(graph, &node, vocab::MAP_EXPRESSION),
                filter: single_object(graph, &node, vocab::MAP_FILTER),
                node,
            }
        })
        .collect()
}

/// Custom function declarations with a body.
pub fn read_custom_functions(graph: &dyn GraphRead) -> Vec<CustomFunctionSpec> {
    graph
        .subjects(vocab::RDF_TYPE, &Term::iri(vocab::MAP_CUSTOM_FUNCTION))
        .into_iter()
        .filter_map(|iri| {
            let body = graph.object(&iri, vocab::MAP_BODY)?;
            Some(CustomFunctionSpec { iri, body })
        })
        .collect()
}

/// Register every custom function declared in `graph`. Returns how many were
/// (re-)registered.
///
/// Bodies may call other custom functions, so declarations whose body refers
/// to a function not yet registered are retried until a pass makes no progress.
pub fn register_custom_functions(
    graph: &dyn GraphRead,
    registry: &FunctionRegistry,
) -> MapResult<usize> {
    let mut pending = read_custom_functions(graph);
    let mut registered = 0;
    loop {
        let before = pending.len();
        let mut unresolved = Vec::new();
        let mut last_error = None;
        for spec in pending {
            let result = read_call(graph, &spec.body, registry)
                .and_then(|body| registry.register_composite(spec.iri.lexical(), &body));
            match result {
                Ok(_) => registered += 1,
                Err(e) if e.kind() == ErrorKind::FunctionNotFound => {
                    last_error = Some(e);
                    unresolved.push(spec);
                }
                Err(e) => return Err(e),
            }
        }
        match last_error {
            None => return Ok(registered),
            Some(err) if unresolved.len() == before => {
                return Err(MapError::new(ErrorKind::CustomFunctionMalformed)
                    .with(ErrorKey::Message, "unresolvable function reference in body")
                    .with_cause(err))
            }
            Some(_) => pending = unresolved,
        }
    }
}

// ============================================================================
// Mapping model
// ============================================================================

/// Editable mapping specification.
#[derive(Debug, Clone, Default)]
pub struct MappingModel {
    graph: Graph,
}

impl MappingModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing specification graph.
    pub fn from_graph(graph: Graph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Create a Context, or re-bind the classes of an existing one.
    pub fn create_context(&mut self, iri: &str, source_class: &str, target_class: &str) -> Term {
        let ctx = Term::iri(iri);
        self.graph
            .insert(Triple::typed(ctx.clone(), Term::iri(vocab::MAP_CONTEXT)));
        for (predicate, class) in [
            (vocab::MAP_SOURCE_CLASS, source_class),
            (vocab::MAP_TARGET_CLASS, target_class),
        ] {
            self.graph
                .remove_matching(Some(&ctx), Some(&Term::iri(predicate)), None);
            self.graph.add(ctx.clone(), predicate, Term::iri(class));
        }
        ctx
    }

    fn require_context(&self, ctx: &Term) -> MapResult<()> {
        if self
            .graph
            .contains(&Triple::typed(ctx.clone(), Term::iri(vocab::MAP_CONTEXT)))
        {
            Ok(())
        } else {
            Err(MapError::new(ErrorKind::ContextNotFound).with(ErrorKey::Context, ctx))
        }
    }

    /// Replace the call stored under `subject predicate` (or clear it).
    fn replace_call(&mut self, subject: &Term, predicate: &str, call: Option<&Call>) {
        for old in self.graph.objects(subject, predicate) {
            remove_call(&mut self.graph, &old);
        }
        let predicate = Term::iri(predicate);
        self.graph
            .remove_matching(Some(subject), Some(&predicate), None);
        if let Some(call) = call {
            let node = write_call(&mut self.graph, call);
            self.graph
                .insert(Triple::new(subject.clone(), predicate, node));
        }
    }

    /// Set the call that produces the target individual of `ctx`.
    pub fn set_target(&mut self, ctx: &Term, call: &Call) -> MapResult<()> {
        self.require_context(ctx)?;
        if !call.is_target() {
            return Err(MapError::new(ErrorKind::ContextRequiresTargetFunction)
                .with(ErrorKey::Context, ctx)
                .with(ErrorKey::Function, call.function().short_name()));
        }
        self.replace_call(ctx, vocab::MAP_TARGET, Some(call));
        Ok(())
    }

    /// Set or clear the boolean filter applied to every rule of `ctx`.
    pub fn set_context_filter(&mut self, ctx: &Term, filter: Option<&Call>) -> MapResult<()> {
        self.require_context(ctx)?;
        if let Some(filter) = filter {
            require_boolean(filter)?;
        }
        self.replace_call(ctx, vocab::MAP_FILTER, filter);
        Ok(())
    }

    /// Add a PropertyBridge to `ctx` and return its node.
    pub fn add_property_bridge(
        &mut self,
        ctx: &Term,
        sources: &[&str],
        target_property: &str,
        expression: &Call,
        filter: Option<&Call>,
    ) -> MapResult<Term> {
        self.require_context(ctx)?;
        if sources.is_empty() {
            return Err(MapError::new(ErrorKind::BridgeRequiresSourceProperty)
                .with(ErrorKey::Context, ctx)
                .with(ErrorKey::Property, target_property));
        }
        if expression.is_target() {
            return Err(MapError::new(ErrorKind::BridgeRequiresNonTargetFunction)
                .with(ErrorKey::Context, ctx)
                .with(ErrorKey::Function, expression.function().short_name()));
        }
        for call in std::iter::once(expression).chain(filter) {
            if call.max_source_property_index() > sources.len() {
                return Err(MapError::new(ErrorKind::MalformedCall)
                    .with(ErrorKey::Context, ctx)
                    .with(ErrorKey::Property, target_property)
                    .with(
                        ErrorKey::Message,
                        format!("refers to source property {} of {}", call.max_source_property_index(), sources.len()),
                    ));
            }
        }
        if let Some(filter) = filter {
            require_boolean(filter)?;
        }

        let node = self.graph.fresh_blank("pb");
        self.graph.insert(Triple::typed(
            node.clone(),
            Term::iri(vocab::MAP_PROPERTY_BRIDGE),
        ));
        self.graph
            .add(node.clone(), vocab::MAP_CONTEXT_REF, ctx.clone());
        for (i, source) in sources.iter().enumerate() {
            self.graph
                .add(node.clone(), &vocab::source_property(i + 1), Term::iri(*source));
        }
        self.graph.add(
            node.clone(),
            vocab::MAP_TARGET_PROPERTY,
            Term::iri(target_property),
        );
        self.replace_call(&node, vocab::MAP_EXPRESSION, Some(expression));
        self.replace_call(&node, vocab::MAP_FILTER, filter);
        Ok(node)
    }

    /// Remove one PropertyBridge and its calls.
    pub fn remove_property_bridge(&mut self, bridge: &Term) -> bool {
        self.replace_call(bridge, vocab::MAP_EXPRESSION, None);
        self.replace_call(bridge, vocab::MAP_FILTER, None);
        self.graph.remove_matching(Some(bridge), None, None) > 0
    }

    /// Remove `ctx`, its bridges and every call they own.
    pub fn remove_context(&mut self, ctx: &Term) -> MapResult<()> {
        self.require_context(ctx)?;
        for bridge in read_bridges(&self.graph, ctx) {
            self.remove_property_bridge(&bridge.node);
        }
        self.replace_call(ctx, vocab::MAP_TARGET, None);
        self.replace_call(ctx, vocab::MAP_FILTER, None);
        self.graph.remove_matching(Some(ctx), None, None);
        Ok(())
    }

    pub fn contexts(&self) -> Vec<ContextSpec> {
        read_contexts(&self.graph)
    }

    pub fn context(&self, ctx: &Term) -> MapResult<ContextSpec> {
        self.require_context(ctx)?;
        self.contexts()
            .into_iter()
            .find(|c| c.iri == *ctx)
            .ok_or_else(|| MapError::new(ErrorKind::ContextNotFound).with(ErrorKey::Context, ctx))
    }

    pub fn bridges(&self, ctx: &Term) -> MapResult<Vec<BridgeSpec>> {
        self.require_context(ctx)?;
        Ok(read_bridges(&self.graph, ctx))
    }

    /// Declare a custom function backed by `body` and register it immediately.
    pub fn declare_function(
        &mut self,
        registry: &FunctionRegistry,
        iri: &str,
        body: &Call,
    ) -> MapResult<Arc<FunctionDescriptor>> {
        let descriptor = registry.register_composite(iri, body)?;
        let f = Term::iri(descriptor.name());
        self.graph
            .insert(Triple::typed(f.clone(), Term::iri(vocab::MAP_CUSTOM_FUNCTION)));
        self.replace_call(&f, vocab::MAP_BODY, Some(body));
        Ok(descriptor)
    }
}

fn require_boolean(filter: &Call) -> MapResult<()> {
    if filter.is_boolean() {
        Ok(())
    } else {
        Err(MapError::new(ErrorKind::FilterRequiresBooleanFunction)
            .with(ErrorKey::Function, filter.function().short_name()))
    }
}

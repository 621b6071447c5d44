//! Calls as facts.
//!
//! A call is a blank node with one `map:function` fact and one `arg:<name>`
//! fact per argument; a nested call is another such node.

use ontomap_graph::{vocab, Graph, GraphRead, Term};
use std::collections::BTreeMap;

use super::{Call, CallValue};
use crate::error::{ErrorKey, ErrorKind, MapError, MapResult};
use crate::function::FunctionRegistry;

/// Write `call` into `graph` under a fresh blank node and return that node.
pub fn write_call(graph: &mut Graph, call: &Call) -> Term {
    let node = graph.fresh_blank("call");
    graph.add(node.clone(), vocab::MAP_FUNCTION_REF, Term::iri(call.name()));
    for (name, value) in call.args() {
        let object = match value {
            CallValue::Term(t) => t.clone(),
            CallValue::Call(nested) => write_call(graph, nested),
        };
        graph.add(node.clone(), &vocab::arg_predicate(name), object);
    }
    node
}

/// True if `node` is the root of an encoded call.
pub fn is_call_node(graph: &dyn GraphRead, node: &Term) -> bool {
    !node.is_literal() && graph.object(node, vocab::MAP_FUNCTION_REF).is_some()
}

/// Decode the call rooted at `node`, resolving functions through `registry`.
pub fn read_call(graph: &dyn GraphRead, node: &Term, registry: &FunctionRegistry) -> MapResult<Call> {
    let mut path = Vec::new();
    read_inner(graph, node, registry, &mut path)
}

fn malformed(node: &Term, message: &str) -> MapError {
    MapError::new(ErrorKind::MalformedCall)
        .with(ErrorKey::ArgValue, node)
        .with(ErrorKey::Message, message)
}

fn read_inner(
    graph: &dyn GraphRead,
    node: &Term,
    registry: &FunctionRegistry,
    path: &mut Vec<Term>,
) -> MapResult<Call> {
    if path.contains(node) {
        return Err(malformed(node, "call contains itself"));
    }
    let functions = graph.objects(node, vocab::MAP_FUNCTION_REF);
    let [function] = functions.as_slice() else {
        return Err(malformed(node, "expected exactly one map:function"));
    };
    let Some(function) = function.as_iri() else {
        return Err(malformed(node, "map:function must be an IRI"));
    };
    let descriptor = registry.descriptor(function)?;

    let mut values: BTreeMap<String, Term> = BTreeMap::new();
    for t in graph.find(Some(node), None, None) {
        let Some(name) = t.predicate.as_iri().and_then(vocab::arg_name) else {
            continue;
        };
        if descriptor.resolve_arg(name).is_none() {
            return Err(MapError::new(ErrorKind::NonexistentArg)
                .with(ErrorKey::Function, descriptor.short_name())
                .with(ErrorKey::Arg, name));
        }
        match values.get(name) {
            Some(existing) if *existing != t.object => {
                return Err(malformed(node, "argument has several values")
                    .with(ErrorKey::Function, descriptor.short_name())
                    .with(ErrorKey::Arg, name));
            }
            Some(_) => {}
            None => {
                values.insert(name.to_string(), t.object);
            }
        }
    }

    path.push(node.clone());
    let mut args = Vec::with_capacity(values.len());
    for (name, object) in values {
        let value = if is_call_node(graph, &object) {
            CallValue::Call(Box::new(read_inner(graph, &object, registry, path)?))
        } else {
            CallValue::Term(object)
        };
        args.push((name, value));
    }
    path.pop();

    Ok(Call::from_parts(descriptor, args))
}

/// Remove the call rooted at `node` and its nested calls. Returns the number
/// of facts removed.
pub fn remove_call(graph: &mut Graph, node: &Term) -> usize {
    let nested: Vec<Term> = {
        let view: &Graph = graph;
        view.find(Some(node), None, None)
            .filter(|t| t.predicate.as_iri().and_then(vocab::arg_name).is_some())
            .map(|t| t.object)
            .filter(|o| is_call_node(view, o))
            .collect()
    };
    let mut removed = graph.remove_matching(Some(node), None, None);
    for child in nested {
        removed += remove_call(graph, &child);
    }
    removed
}

//! Class hierarchy: the narrow slice of an ontology model the engine needs.
//!
//! Only `rdfs:subClassOf` and class declarations are interpreted; everything
//! else (domains, ranges, restrictions) is out of scope.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::{Graph, GraphRead};
use crate::term::{Term, Triple};
use crate::vocab;

/// `rdfs:subClassOf` closure over one or more graphs.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    direct_supers: BTreeMap<Term, BTreeSet<Term>>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `rdfs:subClassOf` facts from `graph`.
    pub fn from_graph(graph: &dyn GraphRead) -> Self {
        let mut out = Self::new();
        out.add_graph(graph);
        out
    }

    pub fn add_graph(&mut self, graph: &dyn GraphRead) {
        let sub_class_of = Term::iri(vocab::RDFS_SUBCLASS_OF);
        for t in graph.find(None, Some(&sub_class_of), None) {
            if t.subject != t.object {
                self.direct_supers
                    .entry(t.subject)
                    .or_default()
                    .insert(t.object);
            }
        }
    }

    /// Number of classes with at least one declared super class.
    pub fn len(&self) -> usize {
        self.direct_supers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct_supers.is_empty()
    }

    /// Transitive super classes of `class`, excluding `class` itself.
    /// Terminates on cyclic hierarchies.
    pub fn super_classes(&self, class: &Term) -> BTreeSet<Term> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&Term> = vec![class];
        while let Some(current) = stack.pop() {
            let Some(supers) = self.direct_supers.get(current) else {
                continue;
            };
            for sup in supers {
                if sup != class && seen.insert(sup.clone()) {
                    stack.push(sup);
                }
            }
        }
        seen
    }

    /// Declared classes of `individual` in `graph` plus all their super classes.
    pub fn classes_of(&self, graph: &dyn GraphRead, individual: &Term) -> BTreeSet<Term> {
        let mut out = BTreeSet::new();
        for class in graph.objects(individual, vocab::RDF_TYPE) {
            out.extend(self.super_classes(&class));
            out.insert(class);
        }
        out
    }
}

/// True if the graph carries its own schema: a class declaration or a
/// `rdfs:subClassOf` fact.
pub fn is_self_describing(graph: &dyn GraphRead) -> bool {
    let rdf_type = Term::iri(vocab::RDF_TYPE);
    let declares_class = [vocab::OWL_CLASS, vocab::RDFS_CLASS].iter().any(|c| {
        graph
            .find(None, Some(&rdf_type), Some(&Term::iri(*c)))
            .next()
            .is_some()
    });
    declares_class
        || graph
            .find(None, Some(&Term::iri(vocab::RDFS_SUBCLASS_OF)), None)
            .next()
            .is_some()
}

/// The schema part of `graph`: class declarations and `rdfs:subClassOf` facts.
pub fn schema_fragment(graph: &dyn GraphRead) -> Graph {
    let rdf_type = Term::iri(vocab::RDF_TYPE);
    let mut out = Graph::new();
    for class in [vocab::OWL_CLASS, vocab::RDFS_CLASS] {
        out.extend(graph.find(None, Some(&rdf_type), Some(&Term::iri(class))));
    }
    out.extend(graph.find(None, Some(&Term::iri(vocab::RDFS_SUBCLASS_OF)), None));
    out
}

/// Triples of `fragment` that are not already in `exclude`.
pub fn difference(fragment: &Graph, exclude: &dyn GraphRead) -> Graph {
    fragment
        .iter()
        .filter(|t: &Triple| !exclude.contains(t))
        .collect()
}

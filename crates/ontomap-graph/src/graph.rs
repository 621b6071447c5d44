//! Indexed in-memory triple store.
//!
//! Three ordered indexes (SPO, POS, OSP) answer every triple pattern with a
//! prefix range scan, so lookups never walk the whole graph unless the pattern
//! is fully unbound.

use std::collections::BTreeSet;
use std::ops::Bound;

use crate::term::{Term, Triple};
use crate::vocab;

type Key = (Term, Term, Term);

// ============================================================================
// Read interface
// ============================================================================

/// Read access to a set of triples.
///
/// Object safe so that stores and views can be mixed behind `&dyn GraphRead`.
pub trait GraphRead {
    /// All triples matching the pattern; `None` is a wildcard.
    fn find(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Box<dyn Iterator<Item = Triple> + '_>;

    fn contains(&self, triple: &Triple) -> bool {
        self.find(
            Some(&triple.subject),
            Some(&triple.predicate),
            Some(&triple.object),
        )
        .next()
        .is_some()
    }

    /// Objects of `subject predicate ?o`, sorted and deduplicated.
    fn objects(&self, subject: &Term, predicate: &str) -> Vec<Term> {
        let predicate = Term::iri(predicate);
        let set: BTreeSet<Term> = self
            .find(Some(subject), Some(&predicate), None)
            .map(|t| t.object)
            .collect();
        set.into_iter().collect()
    }

    /// First object (in term order) of `subject predicate ?o`.
    fn object(&self, subject: &Term, predicate: &str) -> Option<Term> {
        self.objects(subject, predicate).into_iter().next()
    }

    /// Subjects of `?s predicate object`, sorted and deduplicated.
    fn subjects(&self, predicate: &str, object: &Term) -> Vec<Term> {
        let predicate = Term::iri(predicate);
        let set: BTreeSet<Term> = self
            .find(None, Some(&predicate), Some(object))
            .map(|t| t.subject)
            .collect();
        set.into_iter().collect()
    }

    /// True if the term occurs anywhere in the graph.
    fn mentions(&self, term: &Term) -> bool {
        self.find(Some(term), None, None).next().is_some()
            || self.find(None, None, Some(term)).next().is_some()
    }
}

// ============================================================================
// Graph store
// ============================================================================

/// A set of triples with SPO/POS/OSP indexes.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    spo: BTreeSet<Key>,
    pos: BTreeSet<Key>,
    osp: BTreeSet<Key>,
    next_blank: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spo.is_empty()
    }

    /// Add a triple; returns `true` if it was not present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        let Triple {
            subject: s,
            predicate: p,
            object: o,
        } = triple;
        if !self.spo.insert((s.clone(), p.clone(), o.clone())) {
            return false;
        }
        self.pos.insert((p.clone(), o.clone(), s.clone()));
        self.osp.insert((o, s, p));
        true
    }

    /// Convenience for `insert(Triple::new(..))`.
    pub fn add(&mut self, subject: Term, predicate: &str, object: Term) -> bool {
        self.insert(Triple::new(subject, Term::iri(predicate), object))
    }

    /// Remove a triple; returns `true` if it was present.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        let (s, p, o) = (&triple.subject, &triple.predicate, &triple.object);
        if !self.spo.remove(&(s.clone(), p.clone(), o.clone())) {
            return false;
        }
        self.pos.remove(&(p.clone(), o.clone(), s.clone()));
        self.osp.remove(&(o.clone(), s.clone(), p.clone()));
        true
    }

    /// Remove every triple matching the pattern; returns how many were removed.
    pub fn remove_matching(
        &mut self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> usize {
        let doomed: Vec<Triple> = self.find(subject, predicate, object).collect();
        for t in &doomed {
            self.remove(t);
        }
        doomed.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Triple> + '_ {
        self.spo
            .iter()
            .map(|(s, p, o)| Triple::new(s.clone(), p.clone(), o.clone()))
    }

    /// Add all triples of `other`.
    pub fn merge(&mut self, other: &Graph) {
        self.extend(other.iter());
    }

    /// Distinct subjects that have at least one `rdf:type` fact.
    pub fn typed_subjects(&self) -> Vec<Term> {
        let rdf_type = Term::iri(vocab::RDF_TYPE);
        let set: BTreeSet<Term> = self
            .find(None, Some(&rdf_type), None)
            .map(|t| t.subject)
            .collect();
        set.into_iter().collect()
    }

    /// Allocate a blank node whose label is not used in this graph.
    pub fn fresh_blank(&mut self, prefix: &str) -> Term {
        loop {
            self.next_blank += 1;
            let candidate = Term::blank(format!("{prefix}{}", self.next_blank));
            if !self.mentions(&candidate) {
                return candidate;
            }
        }
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        for t in iter {
            self.insert(t);
        }
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut g = Graph::new();
        g.extend(iter);
        g
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.spo == other.spo
    }
}

impl Eq for Graph {}

/// Scan `index` for keys starting with `first` (and `second`, if given).
fn scan<'a>(
    index: &'a BTreeSet<Key>,
    first: &Term,
    second: Option<&Term>,
) -> Box<dyn Iterator<Item = &'a Key> + 'a> {
    let first = first.clone();
    match second {
        Some(second) => {
            let second = second.clone();
            let lower = (first.clone(), second.clone(), Term::min());
            Box::new(
                index
                    .range((Bound::Included(lower), Bound::Unbounded))
                    .take_while(move |(a, b, _)| *a == first && *b == second),
            )
        }
        None => {
            let lower = (first.clone(), Term::min(), Term::min());
            Box::new(
                index
                    .range((Bound::Included(lower), Bound::Unbounded))
                    .take_while(move |(a, _, _)| *a == first),
            )
        }
    }
}

impl GraphRead for Graph {
    fn find(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Box<dyn Iterator<Item = Triple> + '_> {
        match (subject, predicate, object) {
            (Some(s), Some(p), Some(o)) => {
                let key = (s.clone(), p.clone(), o.clone());
                if self.spo.contains(&key) {
                    Box::new(std::iter::once(Triple::new(key.0, key.1, key.2)))
                } else {
                    Box::new(std::iter::empty())
                }
            }
            (Some(s), p, None) => Box::new(
                scan(&self.spo, s, p)
                    .map(|(s, p, o)| Triple::new(s.clone(), p.clone(), o.clone())),
            ),
            (Some(s), None, Some(o)) => Box::new(
                scan(&self.osp, o, Some(s))
                    .map(|(o, s, p)| Triple::new(s.clone(), p.clone(), o.clone())),
            ),
            (None, Some(p), o) => Box::new(
                scan(&self.pos, p, o)
                    .map(|(p, o, s)| Triple::new(s.clone(), p.clone(), o.clone())),
            ),
            (None, None, Some(o)) => Box::new(
                scan(&self.osp, o, None)
                    .map(|(o, s, p)| Triple::new(s.clone(), p.clone(), o.clone())),
            ),
            (None, None, None) => Box::new(self.iter()),
        }
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.spo.contains(&(
            triple.subject.clone(),
            triple.predicate.clone(),
            triple.object.clone(),
        ))
    }
}

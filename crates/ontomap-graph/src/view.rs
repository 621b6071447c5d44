//! Read-only union of several graphs.

use crate::graph::GraphRead;
use crate::term::{Term, Triple};

/// A non-distinct union view.
///
/// Each part is queried in order and its matches are chained; a triple stored in
/// two parts is yielded twice. Callers that need set semantics deduplicate
/// themselves (the `GraphRead` helpers `objects`/`subjects` already do).
#[derive(Default, Clone)]
pub struct UnionView<'a> {
    parts: Vec<&'a dyn GraphRead>,
}

impl<'a> UnionView<'a> {
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    pub fn with(mut self, part: &'a dyn GraphRead) -> Self {
        self.parts.push(part);
        self
    }

    pub fn push(&mut self, part: &'a dyn GraphRead) {
        self.parts.push(part);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl<'a> FromIterator<&'a dyn GraphRead> for UnionView<'a> {
    fn from_iter<I: IntoIterator<Item = &'a dyn GraphRead>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

impl GraphRead for UnionView<'_> {
    fn find(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Box<dyn Iterator<Item = Triple> + '_> {
        let (s, p, o) = (subject.cloned(), predicate.cloned(), object.cloned());
        Box::new(
            self.parts
                .iter()
                .copied()
                .flat_map(move |g| g.find(s.as_ref(), p.as_ref(), o.as_ref())),
        )
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.parts.iter().any(|g| g.contains(triple))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Graph;

    #[test]
    fn union_is_not_distinct() {
        let x = Term::iri("x");
        let mut a = Graph::new();
        a.add(x.clone(), "p", Term::literal("1"));
        let mut b = Graph::new();
        b.add(x.clone(), "p", Term::literal("1"));
        b.add(x.clone(), "p", Term::literal("2"));

        let view = UnionView::new().with(&a).with(&b);
        assert_eq!(view.find(Some(&x), None, None).count(), 3);
        // helpers deduplicate
        assert_eq!(view.objects(&x, "p").len(), 2);
        assert!(view.contains(&Triple::new(
            x.clone(),
            Term::iri("p"),
            Term::literal("2")
        )));
    }

    #[test]
    fn empty_view_finds_nothing() {
        let view = UnionView::new();
        assert!(view.is_empty());
        assert_eq!(view.find(None, None, None).count(), 0);
    }
}

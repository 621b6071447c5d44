//! Query assembly: the merged read views rules execute against, and the class
//! hierarchies used to classify source and target individuals.
//!
//! Views are non-distinct unions; nothing here assumes the source and target
//! are different stores.

use ontomap_graph::schema::{difference, is_self_describing, schema_fragment};
use ontomap_graph::{ClassHierarchy, Graph, GraphRead, UnionView};

/// Assembles views over a specification graph and its support library.
#[derive(Clone, Copy)]
pub struct QueryAssembler<'a> {
    spec: &'a Graph,
    library: &'a Graph,
}

impl<'a> QueryAssembler<'a> {
    pub fn new(spec: &'a Graph, library: &'a Graph) -> Self {
        Self { spec, library }
    }

    pub fn spec(&self) -> &'a Graph {
        self.spec
    }

    pub fn library(&self) -> &'a Graph {
        self.library
    }

    /// Specification plus library.
    pub fn spec_view(&self) -> UnionView<'a> {
        UnionView::new().with(self.spec).with(self.library)
    }

    /// Specification, library, source (when distinct from the target) and target.
    pub fn view<'b>(
        &self,
        source: Option<&'b dyn GraphRead>,
        target: &'b dyn GraphRead,
    ) -> UnionView<'b>
    where
        'a: 'b,
    {
        let mut view = UnionView::new().with(self.spec).with(self.library);
        if let Some(source) = source {
            view.push(source);
        }
        view.push(target);
        view
    }

    /// Schema facts a source without its own schema borrows: class
    /// declarations and `rdfs:subClassOf` facts of the specification view
    /// that are neither library facts nor already in the target.
    ///
    /// Empty for a self-describing source.
    pub fn borrowed_schema(&self, source: &dyn GraphRead, target: &dyn GraphRead) -> Graph {
        if is_self_describing(source) {
            return Graph::new();
        }
        let fragment = schema_fragment(&self.spec_view());
        difference(&difference(&fragment, self.library), target)
    }

    /// Hierarchy used to classify source individuals.
    pub fn source_hierarchy(&self, source: &dyn GraphRead, target: &dyn GraphRead) -> ClassHierarchy {
        let mut hierarchy = ClassHierarchy::from_graph(source);
        hierarchy.add_graph(&self.borrowed_schema(source, target));
        hierarchy
    }

    /// Hierarchy used to classify individuals derived into the target.
    pub fn target_hierarchy(&self, target: &dyn GraphRead) -> ClassHierarchy {
        ClassHierarchy::from_graph(&self.view(None, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontomap_graph::{vocab, Term, Triple};

    fn sub(g: &mut Graph, a: &str, b: &str) {
        g.add(Term::iri(a), vocab::RDFS_SUBCLASS_OF, Term::iri(b));
    }

    #[test]
    fn view_counts_shared_facts_per_part() {
        let mut spec = Graph::new();
        sub(&mut spec, "http://ex.org/A", "http://ex.org/Top");
        let library = Graph::new();
        let assembler = QueryAssembler::new(&spec, &library);

        let same = spec.clone();
        let view = assembler.view(Some(&same), &same);
        assert_eq!(view.len(), 4);
        assert_eq!(view.find(None, None, None).count(), 3);
    }

    #[test]
    fn plain_source_borrows_spec_schema() {
        let mut spec = Graph::new();
        sub(&mut spec, "http://ex.org/A", "http://ex.org/Top");
        sub(&mut spec, "http://ex.org/B", "http://ex.org/Top");
        let mut library = Graph::new();
        sub(&mut library, "http://ex.org/B", "http://ex.org/Top");
        let assembler = QueryAssembler::new(&spec, &library);

        let mut source = Graph::new();
        source.insert(Triple::typed(Term::iri("http://ex.org/x"), Term::iri("http://ex.org/A")));
        let target = Graph::new();

        let borrowed = assembler.borrowed_schema(&source, &target);
        assert_eq!(borrowed.len(), 1);
        let hierarchy = assembler.source_hierarchy(&source, &target);
        assert!(hierarchy
            .super_classes(&Term::iri("http://ex.org/A"))
            .contains(&Term::iri("http://ex.org/Top")));
    }

    #[test]
    fn self_describing_source_is_used_as_is() {
        let mut spec = Graph::new();
        sub(&mut spec, "http://ex.org/A", "http://ex.org/Top");
        let library = Graph::new();
        let assembler = QueryAssembler::new(&spec, &library);

        let mut source = Graph::new();
        sub(&mut source, "http://ex.org/A", "http://ex.org/Other");
        let hierarchy = assembler.source_hierarchy(&source, &Graph::new());
        let supers = hierarchy.super_classes(&Term::iri("http://ex.org/A"));
        assert!(supers.contains(&Term::iri("http://ex.org/Other")));
        assert!(!supers.contains(&Term::iri("http://ex.org/Top")));
    }
}

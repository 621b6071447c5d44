use ontomap_graph::{Graph, GraphRead, Term, Triple};
use proptest::prelude::*;

fn term(kind: u8, n: u8) -> Term {
    match kind % 3 {
        0 => Term::iri(format!("http://ex.org/n{n}")),
        1 => Term::blank(format!("b{n}")),
        _ => Term::literal(format!("v{n}")),
    }
}

fn triple_strategy() -> impl Strategy<Value = Triple> {
    (0u8..2, 0u8..4, 0u8..3, 0u8..3, 0u8..4).prop_map(|(sk, s, p, ok, o)| {
        Triple::new(
            term(sk, s),
            Term::iri(format!("http://ex.org/p{p}")),
            term(ok, o),
        )
    })
}

fn naive(all: &[Triple], s: Option<&Term>, p: Option<&Term>, o: Option<&Term>) -> Vec<Triple> {
    let mut out: Vec<Triple> = all
        .iter()
        .filter(|t| s.map_or(true, |s| *s == t.subject))
        .filter(|t| p.map_or(true, |p| *p == t.predicate))
        .filter(|t| o.map_or(true, |o| *o == t.object))
        .cloned()
        .collect();
    out.sort();
    out.dedup();
    out
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn indexed_find_matches_naive_scan(
        inserted in prop::collection::vec(triple_strategy(), 0..=24),
        removed in prop::collection::vec(triple_strategy(), 0..=8),
        probe in triple_strategy(),
        mask in 0u8..8,
    ) {
        let mut g: Graph = inserted.iter().cloned().collect();
        for t in &removed {
            g.remove(t);
        }
        let live: Vec<Triple> = inserted
            .iter()
            .filter(|t| !removed.contains(t))
            .cloned()
            .collect();

        let s = (mask & 1 != 0).then_some(&probe.subject);
        let p = (mask & 2 != 0).then_some(&probe.predicate);
        let o = (mask & 4 != 0).then_some(&probe.object);

        let mut actual: Vec<Triple> = g.find(s, p, o).collect();
        actual.sort();
        prop_assert_eq!(actual, naive(&live, s, p, o));
        prop_assert_eq!(g.len(), naive(&live, None, None, None).len());
    }
}

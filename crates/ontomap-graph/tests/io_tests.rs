use anyhow::Result;
use ontomap_graph::io::{read_graph, write_graph};
use ontomap_graph::schema::{is_self_describing, schema_fragment};
use ontomap_graph::{vocab, ClassHierarchy, GraphRead, Term};

const ONTOLOGY_TTL: &str = r#"
@prefix ex: <http://ex.org/> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

ex:Animal a owl:Class .
ex:Dog a owl:Class ; rdfs:subClassOf ex:Animal .
ex:rex a ex:Dog ; ex:name "Rex" .
"#;

#[test]
fn turtle_file_round_trips_through_ntriples() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ttl = dir.path().join("animals.ttl");
    std::fs::write(&ttl, ONTOLOGY_TTL)?;

    let g = read_graph(&ttl)?;
    assert_eq!(g.len(), 5);
    assert!(is_self_describing(&g));
    assert_eq!(schema_fragment(&g).len(), 3);

    let rex = Term::iri("http://ex.org/rex");
    let classes = ClassHierarchy::from_graph(&g).classes_of(&g, &rex);
    assert!(classes.contains(&Term::iri("http://ex.org/Animal")));

    let nt = dir.path().join("animals.nt");
    write_graph(&g, &nt)?;
    let again = read_graph(&nt)?;
    assert_eq!(g, again);
    assert_eq!(
        again.object(&rex, "http://ex.org/name"),
        Some(Term::literal("Rex"))
    );
    assert_eq!(
        again.objects(&rex, vocab::RDF_TYPE),
        vec![Term::iri("http://ex.org/Dog")]
    );
    Ok(())
}

#[test]
fn unknown_extension_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    std::fs::write(&path, "{}")?;
    let err = read_graph(&path).err().map(|e| e.to_string()).unwrap_or_default();
    assert!(err.contains("unsupported RDF file extension"));
    Ok(())
}

#[test]
fn malformed_ntriples_names_the_format() {
    let err = ontomap_graph::io::parse_ntriples("<http://ex.org/a> <http://ex.org/p> .\n")
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default();
    assert!(err.contains("N-Triples"), "{err}");
}

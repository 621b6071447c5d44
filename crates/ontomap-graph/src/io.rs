//! RDF text I/O.
//!
//! Parsing goes through **Sophia** (N-Triples, Turtle, RDF/XML). Sophia terms
//! are converted via their N-Triples display form, so this module does not
//! depend on Sophia's term types beyond `Display`. Sophia's traits are imported
//! anonymously because their names collide with [`Term`] and [`Triple`].
//!
//! Writing always produces sorted N-Triples so that serialised graphs diff
//! cleanly.

use anyhow::{anyhow, Result};
use sophia::api::source::TripleSource as _;
use sophia::api::triple::Triple as _;
use std::path::Path;

use crate::graph::Graph;
use crate::term::{Literal, Term, Triple};
use crate::vocab;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
    RdfXml,
}

impl RdfFormat {
    /// Guess the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "nt" | "ntriples" => Some(RdfFormat::NTriples),
            "ttl" | "turtle" => Some(RdfFormat::Turtle),
            "rdf" | "owl" | "xml" => Some(RdfFormat::RdfXml),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            RdfFormat::NTriples => "N-Triples",
            RdfFormat::Turtle => "Turtle",
            RdfFormat::RdfXml => "RDF/XML",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct GraphSinkError {
    message: String,
}

impl From<anyhow::Error> for GraphSinkError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

// ============================================================================
// Term conversion (display form -> Term)
// ============================================================================

fn unescape_rdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parse one term in N-Triples display form (`<iri>`, `_:b`, `"lit"^^<dt>`, `"lit"@en`).
pub fn parse_term(term: &str) -> Result<Term> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Term::iri(rest));
    }

    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(Term::blank(rest));
    }

    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if ch == '"' && !escaped {
                end_quote = Some(i);
                break;
            }
            escaped = ch == '\\' && !escaped;
        }
        let Some(end) = end_quote else {
            return Err(anyhow!("invalid literal term (missing closing quote): {s}"));
        };

        let lexical = unescape_rdf_string(&s[1..end]);
        let rest = s[end + 1..].trim();

        if let Some(lang) = rest.strip_prefix('@') {
            return Ok(Term::lang(lexical, lang));
        }
        if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            let dt = dt
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(dt);
            return Ok(Term::typed(lexical, dt));
        }
        return Ok(Term::Literal(Literal {
            lexical,
            datatype: None,
            language: None,
        }));
    }

    Err(anyhow!("unsupported RDF term form: {s}"))
}

fn push_parsed(out: &mut Graph, s: String, p: String, o: String) -> Result<()> {
    let subject = parse_term(&s)?;
    if subject.is_literal() {
        return Err(anyhow!("literal in subject position: {s}"));
    }
    let predicate = parse_term(&p)?;
    if !predicate.is_iri() {
        return Err(anyhow!("predicate must be an IRI: {p}"));
    }
    let object = parse_term(&o)?;
    out.insert(Triple::new(subject, predicate, object));
    Ok(())
}

// ============================================================================
// Reading
// ============================================================================

/// Parse RDF text in the given format.
pub fn parse_graph(bytes: &[u8], format: RdfFormat) -> Result<Graph> {
    let cursor = std::io::Cursor::new(bytes);
    let reader = std::io::BufReader::new(cursor);
    let mut out = Graph::new();

    match format {
        RdfFormat::NTriples => {
            let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), GraphSinkError> {
                    push_parsed(
                        &mut out,
                        t.s().to_string(),
                        t.p().to_string(),
                        t.o().to_string(),
                    )
                    .map_err(GraphSinkError::from)
                })
                .map_err(|e| anyhow!("failed to parse {}: {e}", format.name()))?;
        }
        RdfFormat::Turtle => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), GraphSinkError> {
                    push_parsed(
                        &mut out,
                        t.s().to_string(),
                        t.p().to_string(),
                        t.o().to_string(),
                    )
                    .map_err(GraphSinkError::from)
                })
                .map_err(|e| anyhow!("failed to parse {}: {e}", format.name()))?;
        }
        RdfFormat::RdfXml => {
            let mut parser = sophia::xml::parser::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), GraphSinkError> {
                    push_parsed(
                        &mut out,
                        t.s().to_string(),
                        t.p().to_string(),
                        t.o().to_string(),
                    )
                    .map_err(GraphSinkError::from)
                })
                .map_err(|e| anyhow!("failed to parse {}: {e}", format.name()))?;
        }
    }

    tracing::debug!(format = format.name(), triples = out.len(), "parsed graph");
    Ok(out)
}

/// Parse N-Triples text.
pub fn parse_ntriples(text: &str) -> Result<Graph> {
    parse_graph(text.as_bytes(), RdfFormat::NTriples)
}

/// Parse Turtle text.
pub fn parse_turtle(text: &str) -> Result<Graph> {
    parse_graph(text.as_bytes(), RdfFormat::Turtle)
}

/// Read a graph file, choosing the parser from the file extension.
pub fn read_graph(path: &Path) -> Result<Graph> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let format = RdfFormat::from_extension(ext)
        .ok_or_else(|| anyhow!("unsupported RDF file extension: {}", path.display()))?;
    let bytes = std::fs::read(path)?;
    parse_graph(&bytes, format)
}

// ============================================================================
// Writing
// ============================================================================

/// Serialise as N-Triples, one triple per line, sorted.
pub fn write_ntriples(graph: &Graph) -> String {
    let mut out = String::new();
    for t in graph.iter() {
        let object = match &t.object {
            // Plain literals are written without a datatype.
            Term::Literal(lit) if lit.datatype.as_deref() == Some(vocab::XSD_STRING) => {
                Term::literal(lit.lexical.clone())
            }
            other => other.clone(),
        };
        out.push_str(&format!("{} {} {} .\n", t.subject, t.predicate, object));
    }
    out
}

/// Write a graph as N-Triples to `path`.
pub fn write_graph(graph: &Graph, path: &Path) -> Result<()> {
    std::fs::write(path, write_ntriples(graph))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GraphRead;

    #[test]
    fn parses_display_forms() -> Result<()> {
        assert_eq!(parse_term("<http://ex.org/a>")?, Term::iri("http://ex.org/a"));
        assert_eq!(parse_term("_:b0")?, Term::blank("b0"));
        assert_eq!(parse_term("\"v\"")?, Term::literal("v"));
        assert_eq!(parse_term("\"chat\"@fr")?, Term::lang("chat", "fr"));
        assert_eq!(
            parse_term(&format!("\"1\"^^<{}>", vocab::XSD_DOUBLE))?,
            Term::typed("1", vocab::XSD_DOUBLE)
        );
        assert_eq!(
            parse_term(&format!("\"v\"^^<{}>", vocab::XSD_STRING))?,
            Term::literal("v")
        );
        assert_eq!(parse_term("\"a\\\"b\"")?, Term::literal("a\"b"));
        assert!(parse_term("\"unterminated").is_err());
        assert!(parse_term("bare").is_err());
        Ok(())
    }

    #[test]
    fn ntriples_round_trip() -> Result<()> {
        let text = r#"<http://ex.org/x> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://ex.org/A> .
<http://ex.org/x> <http://ex.org/p1> "v" .
"#;
        let g = parse_ntriples(text)?;
        assert_eq!(g.len(), 2);
        let written = write_ntriples(&g);
        let again = parse_ntriples(&written)?;
        assert_eq!(g, again);
        Ok(())
    }

    #[test]
    fn parses_turtle() -> Result<()> {
        let text = r#"
@prefix ex: <http://ex.org/> .
ex:x a ex:A ; ex:p1 "v" .
"#;
        let g = parse_turtle(text)?;
        let x = Term::iri("http://ex.org/x");
        assert_eq!(g.objects(&x, "http://ex.org/p1"), vec![Term::literal("v")]);
        assert_eq!(
            g.objects(&x, vocab::RDF_TYPE),
            vec![Term::iri("http://ex.org/A")]
        );
        Ok(())
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(RdfFormat::from_extension("TTL"), Some(RdfFormat::Turtle));
        assert_eq!(RdfFormat::from_extension("owl"), Some(RdfFormat::RdfXml));
        assert_eq!(RdfFormat::from_extension("json"), None);
    }
}

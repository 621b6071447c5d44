//! RDF term and triple model.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vocab;

// ============================================================================
// Terms
// ============================================================================

/// A literal value: lexical form plus optional datatype or language tag.
///
/// Plain literals and `xsd:string` literals are the same value; the datatype is
/// stored as `None` for both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

/// An RDF node: IRI, blank node or literal.
///
/// Variant order matters: `Term::min()` (the empty IRI) sorts before every
/// other term, which the range scans in [`crate::Graph`] rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::Blank(label.into())
    }

    /// Plain (string) literal.
    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        })
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Term::Literal(Literal {
            lexical: lexical.into(),
            datatype: (datatype != vocab::XSD_STRING).then_some(datatype),
            language: None,
        })
    }

    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        })
    }

    pub fn boolean(value: bool) -> Self {
        Term::typed(value.to_string(), vocab::XSD_BOOLEAN)
    }

    pub fn double(value: f64) -> Self {
        Term::typed(value.to_string(), vocab::XSD_DOUBLE)
    }

    /// Smallest term in the total order.
    pub(crate) fn min() -> Self {
        Term::Iri(String::new())
    }

    /// Parse a user-supplied value string.
    ///
    /// `<...>`, `http://`, `https://` and `urn:` forms are IRIs, `_:x` is a
    /// blank node, anything else is a plain literal.
    pub fn parse_value(value: &str) -> Self {
        if let Some(iri) = value.strip_prefix('<').and_then(|v| v.strip_suffix('>')) {
            return Term::iri(iri);
        }
        if let Some(label) = value.strip_prefix("_:") {
            if !label.is_empty() {
                return Term::blank(label);
            }
        }
        if value.starts_with("http://") || value.starts_with("https://") || value.starts_with("urn:")
        {
            return Term::iri(value);
        }
        Term::literal(value)
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Lexical form for literals, IRI text for IRIs, label for blank nodes.
    pub fn lexical(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Blank(label) => label,
            Term::Literal(lit) => &lit.lexical,
        }
    }

    /// Truth value of a boolean-ish literal (`true` / `1`).
    pub fn is_true(&self) -> bool {
        match self {
            Term::Literal(lit) => matches!(lit.lexical.trim(), "true" | "1"),
            _ => false,
        }
    }

    /// True if this term is the IRI `iri`.
    pub fn is(&self, iri: &str) -> bool {
        self.as_iri() == Some(iri)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Blank(label) => write!(f, "_:{label}"),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", escape_literal(&lit.lexical))?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Suffix of an IRI after its last `#` or `/`.
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

// ============================================================================
// Triples
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// `subject rdf:type class`.
    pub fn typed(subject: Term, class: Term) -> Self {
        Self::new(subject, Term::iri(vocab::RDF_TYPE), class)
    }

    pub fn is_type_assertion(&self) -> bool {
        self.predicate.is(vocab::RDF_TYPE)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

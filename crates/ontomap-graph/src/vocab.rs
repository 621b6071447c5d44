//! Vocabulary constants.
//!
//! Standard RDF/RDFS/OWL/XSD terms plus the mapping vocabulary that encodes
//! Contexts, PropertyBridges and Calls as ordinary facts.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
pub const RDFS_RESOURCE: &str = "http://www.w3.org/2000/01/rdf-schema#Resource";

pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const OWL_NAMED_INDIVIDUAL: &str = "http://www.w3.org/2002/07/owl#NamedIndividual";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

// ============================================================================
// Mapping vocabulary
// ============================================================================

pub const MAP_NS: &str = "http://ontomap.dev/map#";
/// Namespace of call-argument predicates (`arg:<name>`).
pub const ARG_NS: &str = "http://ontomap.dev/arg#";

pub const MAP_CONTEXT: &str = "http://ontomap.dev/map#Context";
pub const MAP_PROPERTY_BRIDGE: &str = "http://ontomap.dev/map#PropertyBridge";
pub const MAP_CUSTOM_FUNCTION: &str = "http://ontomap.dev/map#CustomFunction";
pub const MAP_FUNCTION: &str = "http://ontomap.dev/map#Function";

pub const MAP_SOURCE_CLASS: &str = "http://ontomap.dev/map#sourceClass";
pub const MAP_TARGET_CLASS: &str = "http://ontomap.dev/map#targetClass";
pub const MAP_TARGET: &str = "http://ontomap.dev/map#target";
pub const MAP_FILTER: &str = "http://ontomap.dev/map#filter";
pub const MAP_CONTEXT_REF: &str = "http://ontomap.dev/map#context";
pub const MAP_TARGET_PROPERTY: &str = "http://ontomap.dev/map#targetProperty";
pub const MAP_EXPRESSION: &str = "http://ontomap.dev/map#expression";
pub const MAP_FUNCTION_REF: &str = "http://ontomap.dev/map#function";
pub const MAP_BODY: &str = "http://ontomap.dev/map#body";

/// Placeholder for "the individual currently being mapped".
pub const MAP_THIS: &str = "http://ontomap.dev/map#_this";

const SOURCE_PROPERTY_PREFIX: &str = "http://ontomap.dev/map#sourceProperty";
const PARAM_PREFIX: &str = "http://ontomap.dev/map#param";

/// `map:sourcePropertyN` (1-based).
pub fn source_property(index: usize) -> String {
    format!("{SOURCE_PROPERTY_PREFIX}{index}")
}

/// Inverse of [`source_property`].
pub fn source_property_index(iri: &str) -> Option<usize> {
    parse_indexed(iri, SOURCE_PROPERTY_PREFIX)
}

/// `map:paramN` (1-based).
pub fn param(index: usize) -> String {
    format!("{PARAM_PREFIX}{index}")
}

/// Inverse of [`param`].
pub fn param_index(iri: &str) -> Option<usize> {
    parse_indexed(iri, PARAM_PREFIX)
}

/// `arg:<name>` predicate for a call argument.
pub fn arg_predicate(name: &str) -> String {
    format!("{ARG_NS}{name}")
}

/// Inverse of [`arg_predicate`].
pub fn arg_name(predicate: &str) -> Option<&str> {
    predicate.strip_prefix(ARG_NS).filter(|n| !n.is_empty())
}

fn parse_indexed(iri: &str, prefix: &str) -> Option<usize> {
    let digits = iri.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().filter(|i| *i > 0)
}

/// Classes whose instances are schema declarations rather than data individuals.
pub fn is_schema_class(iri: &str) -> bool {
    matches!(iri, OWL_CLASS | RDFS_CLASS)
}

//! Rules: executable units derived from Contexts and PropertyBridges.
//!
//! A rule is a value object. Its identity is (governing context, declaration
//! flag, text) and the text is built from the rule's content, so two copies of
//! the same specification entry collapse into one element of a `BTreeSet`.
//!
//! ```text
//!   Context ──► declaration rule      (asserts the target class)
//!           ──► named-individual rule (optional, asserts owl:NamedIndividual)
//!   Bridge  ──► bridge rule           (asserts the target property)
//! ```

pub mod catalog;

pub use catalog::select_rules;

use ontomap_graph::{vocab, GraphRead, Term, Triple};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::call::Call;
use crate::derive::{Bindings, Derivation};
use crate::error::MapResult;

/// How a rule is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind {
    /// Runs the derivation primitive over the rule body.
    Generic,
    /// Synthesizes `individual rdf:type T` directly.
    TypeDeclaration,
    /// Synthesizes `individual rdf:type owl:NamedIndividual`; no-op for blank nodes.
    NamedIndividual,
}

/// What a rule asserts for each target individual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleHead {
    Declare {
        class: Term,
    },
    DeclareNamed,
    Bridge {
        /// Source properties keyed by their `map:sourcePropertyK` index
        sources: BTreeMap<usize, Term>,
        property: Term,
        expression: Call,
        filter: Option<Call>,
    },
}

/// The calls a rule evaluates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBody {
    /// Target call of the governing context
    pub target: Call,
    pub context_filter: Option<Call>,
    pub head: RuleHead,
}

impl RuleBody {
    pub fn is_declaration(&self) -> bool {
        !matches!(self.head, RuleHead::Bridge { .. })
    }

    /// Class asserted by a declaration body.
    pub fn declared_class(&self) -> Option<Term> {
        match &self.head {
            RuleHead::Declare { class } => Some(class.clone()),
            RuleHead::DeclareNamed => Some(Term::iri(vocab::OWL_NAMED_INDIVIDUAL)),
            RuleHead::Bridge { .. } => None,
        }
    }
}

// ============================================================================
// Rule
// ============================================================================

#[derive(Debug, Clone)]
pub struct Rule {
    context: Term,
    subject_class: Term,
    kind: RuleKind,
    text: String,
    body: Arc<RuleBody>,
}

impl Rule {
    pub fn new(context: Term, subject_class: Term, kind: RuleKind, body: RuleBody) -> Self {
        let text = describe(&context, &subject_class, &body);
        Self {
            context,
            subject_class,
            kind,
            text,
            body: Arc::new(body),
        }
    }

    pub fn context(&self) -> &Term {
        &self.context
    }

    /// Source class whose individuals this rule applies to.
    pub fn subject_class(&self) -> &Term {
        &self.subject_class
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn is_declaration(&self) -> bool {
        self.body.is_declaration()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn body(&self) -> &RuleBody {
        &self.body
    }

    /// Facts this rule derives for `individual`.
    pub fn run(
        &self,
        individual: &Term,
        view: &dyn GraphRead,
        derivation: &dyn Derivation,
    ) -> MapResult<Vec<Triple>> {
        match self.kind {
            RuleKind::Generic => derivation.derive(&self.body, &Bindings::new(individual.clone()), view),
            RuleKind::NamedIndividual if individual.is_blank() => Ok(Vec::new()),
            RuleKind::TypeDeclaration | RuleKind::NamedIndividual => Ok(self
                .body
                .declared_class()
                .map(|class| Triple::typed(individual.clone(), class))
                .into_iter()
                .collect()),
        }
    }

    fn sort_key(&self) -> (String, bool, &str) {
        (self.context.to_string(), !self.is_declaration(), &self.text)
    }
}

fn describe(context: &Term, subject_class: &Term, body: &RuleBody) -> String {
    let mut text = match &body.head {
        RuleHead::Declare { class } => {
            format!("{context} declare {class} for {subject_class} via {}", body.target)
        }
        RuleHead::DeclareNamed => format!(
            "{context} declare <{}> for {subject_class} via {}",
            vocab::OWL_NAMED_INDIVIDUAL,
            body.target
        ),
        RuleHead::Bridge {
            sources,
            property,
            expression,
            filter,
        } => {
            let sources: Vec<String> = sources.iter().map(|(k, p)| format!("{k}={p}")).collect();
            let mut text = format!(
                "{context} bridge {property} <- [{}] = {expression} via {}",
                sources.join(", "),
                body.target
            );
            if let Some(filter) = filter {
                text.push_str(&format!(" if {filter}"));
            }
            text
        }
    };
    if let Some(filter) = &body.context_filter {
        text.push_str(&format!(" where {filter}"));
    }
    text
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rule {}

impl PartialOrd for Rule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Context first, declaration rules before the others of the same context,
/// then the rule text.
impl Ord for Rule {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

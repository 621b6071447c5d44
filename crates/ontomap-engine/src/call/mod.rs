//! Function calls: immutable expression trees over the function catalog.

pub mod builder;
pub mod codec;

pub use builder::{BuiltCall, CallBuilder};
pub use codec::{read_call, remove_call, write_call};

use ontomap_graph::{vocab, Term};
use std::fmt;
use std::sync::Arc;

use crate::function::FunctionDescriptor;

/// An argument value: a term (literal, IRI, placeholder token) or a nested call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallValue {
    Term(Term),
    Call(Box<Call>),
}

impl CallValue {
    pub fn as_term(&self) -> Option<&Term> {
        match self {
            CallValue::Term(t) => Some(t),
            CallValue::Call(_) => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            CallValue::Call(c) => Some(c),
            CallValue::Term(_) => None,
        }
    }
}

/// A validated call. Arguments are kept in positional order.
#[derive(Debug, Clone)]
pub struct Call {
    function: Arc<FunctionDescriptor>,
    args: Vec<(String, CallValue)>,
}

impl Call {
    /// Arguments are sorted into positional order; names unknown to the
    /// descriptor sort last.
    pub(crate) fn from_parts(
        function: Arc<FunctionDescriptor>,
        mut args: Vec<(String, CallValue)>,
    ) -> Self {
        args.sort_by_key(|(name, _)| {
            (
                function.arg_order(name).unwrap_or((usize::MAX, usize::MAX)),
                name.clone(),
            )
        });
        Self { function, args }
    }

    pub fn function(&self) -> &Arc<FunctionDescriptor> {
        &self.function
    }

    pub fn name(&self) -> &str {
        self.function.name()
    }

    pub fn args(&self) -> &[(String, CallValue)] {
        &self.args
    }

    pub fn get(&self, name: &str) -> Option<&CallValue> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn is_target(&self) -> bool {
        self.function.is_target()
    }

    pub fn is_boolean(&self) -> bool {
        self.function.is_boolean()
    }

    /// Direct nested calls.
    pub fn nested(&self) -> impl Iterator<Item = &Call> {
        self.args.iter().filter_map(|(_, v)| v.as_call())
    }

    /// Every term value in this call and its nested calls.
    pub fn terms(&self) -> Vec<&Term> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(call) = stack.pop() {
            for (_, value) in &call.args {
                match value {
                    CallValue::Term(t) => out.push(t),
                    CallValue::Call(c) => stack.push(c),
                }
            }
        }
        out
    }

    /// Highest `map:paramK` index referenced anywhere in the tree.
    pub fn max_param_index(&self) -> usize {
        self.terms()
            .into_iter()
            .filter_map(|t| t.as_iri().and_then(vocab::param_index))
            .max()
            .unwrap_or(0)
    }

    /// Highest `map:sourcePropertyK` index referenced anywhere in the tree.
    pub fn max_source_property_index(&self) -> usize {
        self.terms()
            .into_iter()
            .filter_map(|t| t.as_iri().and_then(vocab::source_property_index))
            .max()
            .unwrap_or(0)
    }
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        self.function.name() == other.function.name() && self.args == other.args
    }
}

impl Eq for Call {}

/// Compact form of a term for call display.
fn display_term(term: &Term) -> String {
    match term.as_iri() {
        Some(iri) => match iri.strip_prefix(vocab::MAP_NS) {
            Some(rest) => format!("map:{rest}"),
            None => term.to_string(),
        },
        None => term.to_string(),
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.short_name())?;
        for (i, (name, value)) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                CallValue::Term(t) => write!(f, "{name}={}", display_term(t))?,
                CallValue::Call(c) => write!(f, "{name}={c}")?,
            }
        }
        f.write_str(")")
    }
}

//! Function catalog.
//!
//! A [`FunctionDescriptor`] is the immutable, shared contract of a named
//! function: its return type, its ordered arguments and the flags that decide
//! where a call to it may appear. Bodies are opaque [`FunctionBody`] units
//! resolved through the [`FunctionRegistry`].

pub mod builtin;
pub mod registry;

pub use registry::{FunctionEntry, FunctionImpl, FunctionRegistry};

use ontomap_graph::{vocab, Term};
use serde::Serialize;
use std::collections::HashSet;

use crate::error::{ErrorKey, ErrorKind, MapError, MapResult};

/// Namespace of the built-in function library.
pub const FN_NS: &str = "http://ontomap.dev/fn#";

/// Resolve the short forms `concat` and `fn:concat` to the full function IRI.
pub fn canonical_name(name: &str) -> String {
    if let Some(rest) = name.strip_prefix("fn:") {
        return format!("{FN_NS}{rest}");
    }
    if name.contains(':') {
        return name.to_string();
    }
    format!("{FN_NS}{name}")
}

/// Display form of a function IRI, `fn:` prefixed inside the built-in namespace.
pub fn short_name(name: &str) -> String {
    match name.strip_prefix(FN_NS) {
        Some(rest) => format!("fn:{rest}"),
        None => format!("<{name}>"),
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// One declared argument of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgDescriptor {
    pub name: String,
    /// Datatype or class IRI of accepted values
    pub arg_type: String,
    pub default: Option<Term>,
    pub optional: bool,
    pub vararg: bool,
    /// Allowed lexical values; empty means unconstrained
    pub one_of: Vec<String>,
    pub assignable: bool,
}

impl ArgDescriptor {
    /// A required, assignable argument accepting any value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_type: vocab::RDFS_RESOURCE.to_string(),
            default: None,
            optional: false,
            vararg: false,
            one_of: Vec::new(),
            assignable: true,
        }
    }

    pub fn of_type(mut self, arg_type: impl Into<String>) -> Self {
        self.arg_type = arg_type.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, value: Term) -> Self {
        self.default = Some(value);
        self
    }

    pub fn vararg(mut self) -> Self {
        self.vararg = true;
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn not_assignable(mut self) -> Self {
        self.assignable = false;
        self
    }

    /// Name without its trailing digits (`arg1` -> `arg`).
    pub fn vararg_prefix(&self) -> &str {
        self.name.trim_end_matches(|c: char| c.is_ascii_digit())
    }

    /// Vararg index encoded in `name`, when `name` belongs to this vararg family.
    pub fn vararg_index(&self, name: &str) -> Option<usize> {
        if !self.vararg {
            return None;
        }
        let digits = name.strip_prefix(self.vararg_prefix())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn allows(&self, value: &Term) -> bool {
        self.one_of.is_empty() || self.one_of.iter().any(|v| v == value.lexical())
    }
}

/// Immutable description of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDescriptor {
    name: String,
    return_type: String,
    args: Vec<ArgDescriptor>,
    is_target: bool,
    is_boolean: bool,
    can_have_nested: bool,
    can_be_nested: bool,
    comment: Option<String>,
}

impl FunctionDescriptor {
    /// Validate the argument list and create a descriptor.
    ///
    /// Argument names must be unique; at most one vararg is allowed, it must
    /// come last and its name must end in a digit.
    pub fn new(
        name: impl Into<String>,
        return_type: impl Into<String>,
        args: Vec<ArgDescriptor>,
    ) -> MapResult<Self> {
        let name = canonical_name(&name.into());
        let return_type = return_type.into();
        let illegal = |message: String| {
            MapError::new(ErrorKind::IllegalDescriptor)
                .with(ErrorKey::Function, short_name(&name))
                .with(ErrorKey::Message, message)
        };

        let mut seen = HashSet::new();
        for arg in &args {
            if !seen.insert(arg.name.as_str()) {
                return Err(illegal(format!("duplicate argument `{}`", arg.name)));
            }
        }

        let varargs: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| a.vararg)
            .map(|(i, _)| i)
            .collect();
        if varargs.len() > 1 {
            return Err(illegal("more than one vararg".to_string()));
        }
        if let Some(&pos) = varargs.first() {
            let arg = &args[pos];
            if pos + 1 != args.len() {
                return Err(MapError::new(ErrorKind::VarargNotLast)
                    .with(ErrorKey::Function, short_name(&name))
                    .with(ErrorKey::Arg, &arg.name));
            }
            if arg.vararg_index(&arg.name).is_none() {
                return Err(illegal(format!(
                    "vararg `{}` must end with an index",
                    arg.name
                )));
            }
            // A fixed argument that looks like a member of the vararg family
            // would make synthesized names ambiguous.
            if let Some(clash) = args[..pos]
                .iter()
                .find(|a| arg.vararg_index(&a.name).is_some())
            {
                return Err(illegal(format!(
                    "argument `{}` collides with vararg `{}`",
                    clash.name, arg.name
                )));
            }
        }

        Ok(Self::trusted(name, return_type, args))
    }

    /// Skip argument validation; for the built-in library, which is checked in tests.
    pub(crate) fn trusted(
        name: impl Into<String>,
        return_type: impl Into<String>,
        args: Vec<ArgDescriptor>,
    ) -> Self {
        let return_type = return_type.into();
        Self {
            name: canonical_name(&name.into()),
            is_boolean: return_type == vocab::XSD_BOOLEAN,
            return_type,
            args,
            is_target: false,
            can_have_nested: true,
            can_be_nested: true,
            comment: None,
        }
    }

    /// Mark as a target function. Target functions are never nestable.
    pub fn target(mut self) -> Self {
        self.is_target = true;
        self.can_be_nested = false;
        self
    }

    /// Forbid nested calls as argument values.
    pub fn leaf(mut self) -> Self {
        self.can_have_nested = false;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> String {
        short_name(&self.name)
    }

    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    pub fn args(&self) -> &[ArgDescriptor] {
        &self.args
    }

    pub fn arg(&self, name: &str) -> Option<&ArgDescriptor> {
        self.args.iter().find(|a| a.name == name)
    }

    pub fn vararg(&self) -> Option<&ArgDescriptor> {
        self.args.last().filter(|a| a.vararg)
    }

    /// Descriptor governing `name`: an exact match or the vararg family it belongs to.
    pub fn resolve_arg(&self, name: &str) -> Option<&ArgDescriptor> {
        self.arg(name)
            .or_else(|| self.vararg().filter(|v| v.vararg_index(name).is_some()))
    }

    /// Positional sort key of an argument name: (slot position, vararg index).
    pub fn arg_order(&self, name: &str) -> Option<(usize, usize)> {
        if let Some(pos) = self.args.iter().position(|a| a.name == name) {
            let index = self.args[pos].vararg_index(name).unwrap_or(0);
            return Some((pos, index));
        }
        let vararg = self.vararg()?;
        Some((self.args.len() - 1, vararg.vararg_index(name)?))
    }

    pub fn is_target(&self) -> bool {
        self.is_target
    }

    pub fn is_boolean(&self) -> bool {
        self.is_boolean
    }

    pub fn can_have_nested(&self) -> bool {
        self.can_have_nested
    }

    pub fn can_be_nested(&self) -> bool {
        self.can_be_nested
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Resolved argument values handed to a function body, in positional order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgValues {
    function: String,
    values: Vec<(String, Term)>,
}

impl ArgValues {
    pub fn new(function: impl Into<String>, values: Vec<(String, Term)>) -> Self {
        Self {
            function: function.into(),
            values,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Like [`ArgValues::get`], failing with `FUNCTION_INVOCATION` when absent.
    pub fn require(&self, name: &str) -> MapResult<&Term> {
        self.get(name).ok_or_else(|| {
            self.error("missing argument value")
                .with(ErrorKey::Arg, name)
        })
    }

    /// Values of every argument named `<prefix><digits>`, in index order.
    pub fn family(&self, prefix: &str) -> Vec<&Term> {
        let mut indexed: Vec<(usize, &Term)> = self
            .values
            .iter()
            .filter_map(|(n, v)| {
                let digits = n.strip_prefix(prefix)?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                Some((digits.parse().ok()?, v))
            })
            .collect();
        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, v)| v).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A `FUNCTION_INVOCATION` error for this call.
    pub fn error(&self, message: impl Into<String>) -> MapError {
        MapError::new(ErrorKind::FunctionInvocation)
            .with(ErrorKey::Function, short_name(&self.function))
            .with(ErrorKey::Message, message.into())
    }
}

/// An opaque function implementation.
///
/// `Ok(None)` means "no value" (the derivation yields nothing for this
/// combination); errors abort the inference run.
pub trait FunctionBody: Send + Sync {
    fn invoke(&self, args: &ArgValues) -> MapResult<Option<Term>>;
}

impl<F> FunctionBody for F
where
    F: Fn(&ArgValues) -> MapResult<Option<Term>> + Send + Sync,
{
    fn invoke(&self, args: &ArgValues) -> MapResult<Option<Term>> {
        self(args)
    }
}

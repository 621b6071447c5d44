//! Call builder.
//!
//! Accumulates `argument -> value` assignments and produces a validated
//! [`Call`]. Builders are shared handles: nesting builder B inside builder A
//! keeps a reference to B, so later edits to B are seen when A is built, and
//! a cycle (A inside B inside A) is caught at the moment it is wired up.
//!
//! ## Build protocol
//!
//! 1. Nested builders are built first; their failures are collected, not
//!    returned early.
//! 2. Target functions get their `source` argument bound to `map:_this`.
//! 3. One ordered pass over the declared arguments checks, per argument:
//!    optional arguments filled contiguously (`BUILD_MISSED_OPTIONAL_ARG`,
//!    a warning), `oneOf` membership (`BUILD_MUST_BE_ONE_OF`), defaults, and
//!    required arguments (`BUILD_NO_REQUIRED_ARG`).
//! 4. No errors: the call. One error: that error. Several: `BUILD_FAIL` with
//!    all of them suppressed.
//!
//! Warnings are returned next to the call by [`CallBuilder::build_with_warnings`].
//! They become errors in strict mode, and are folded into any failure.

use ontomap_graph::{vocab, Term};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use super::{Call, CallValue};
use crate::error::{ErrorKey, ErrorKind, MapError, MapResult};
use crate::function::builtin::SOURCE_ARG;
use crate::function::{ArgDescriptor, FunctionDescriptor};

#[derive(Clone)]
enum Assigned {
    Term(Term),
    Nested(CallBuilder),
}

struct BuilderState {
    function: Arc<FunctionDescriptor>,
    values: Vec<(String, Assigned)>,
    strict: bool,
}

/// A successfully built call plus the advisory warnings raised on the way.
#[derive(Debug, Clone)]
pub struct BuiltCall {
    pub call: Call,
    pub warnings: Vec<MapError>,
}

/// Shared, mutable builder for one call.
#[derive(Clone)]
pub struct CallBuilder {
    state: Rc<RefCell<BuilderState>>,
}

impl fmt::Debug for CallBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        let names: Vec<&str> = state.values.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("CallBuilder")
            .field("function", &state.function.short_name())
            .field("assigned", &names)
            .field("strict", &state.strict)
            .finish()
    }
}

impl CallBuilder {
    pub fn new(function: Arc<FunctionDescriptor>) -> Self {
        Self {
            state: Rc::new(RefCell::new(BuilderState {
                function,
                values: Vec::new(),
                strict: false,
            })),
        }
    }

    pub fn function(&self) -> Arc<FunctionDescriptor> {
        self.state.borrow().function.clone()
    }

    /// Strict builders treat warnings as errors.
    pub fn strict(&self, strict: bool) -> &Self {
        self.state.borrow_mut().strict = strict;
        self
    }

    pub fn is_assigned(&self, name: &str) -> bool {
        self.state.borrow().values.iter().any(|(n, _)| n == name)
    }

    /// Assigned argument names, in assignment order.
    pub fn assigned_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .values
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// True if both handles refer to the same builder.
    pub fn ptr_eq(&self, other: &CallBuilder) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Assign a value given as text (see [`Term::parse_value`]).
    pub fn add(&self, name: &str, value: &str) -> MapResult<&Self> {
        self.add_term(name, Term::parse_value(value))
    }

    pub fn add_term(&self, name: &str, value: Term) -> MapResult<&Self> {
        let (_, slot) = self.slot_for(name)?;
        self.assign(slot, Assigned::Term(value));
        Ok(self)
    }

    /// Assign a nested call.
    pub fn add_call(&self, name: &str, nested: &CallBuilder) -> MapResult<&Self> {
        let (arg, slot) = self.slot_for(name)?;
        let function = self.function();
        let nested_function = nested.function();
        let error = |kind: ErrorKind| {
            MapError::new(kind)
                .with(ErrorKey::Function, function.short_name())
                .with(ErrorKey::Arg, &arg.name)
                .with(ErrorKey::ArgValue, nested_function.short_name())
        };

        if self.ptr_eq(nested) || nested.reaches(self) {
            return Err(error(ErrorKind::ArgSelfRef));
        }
        if !function.can_have_nested() {
            return Err(error(ErrorKind::ArgCannotHaveNested));
        }
        if !nested_function.can_be_nested() {
            return Err(error(ErrorKind::ArgCannotBeNested));
        }

        self.assign(slot, Assigned::Nested(nested.clone()));
        Ok(self)
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.values.len();
        state.values.retain(|(n, _)| n != name);
        state.values.len() != before
    }

    pub fn clear(&self) {
        self.state.borrow_mut().values.clear();
    }

    /// Resolve the descriptor for `name` and the slot the value goes into.
    fn slot_for(&self, name: &str) -> MapResult<(ArgDescriptor, String)> {
        let state = self.state.borrow();
        let Some(arg) = state.function.resolve_arg(name) else {
            return Err(MapError::new(ErrorKind::NonexistentArg)
                .with(ErrorKey::Function, state.function.short_name())
                .with(ErrorKey::Arg, name));
        };
        if !arg.assignable {
            return Err(MapError::new(ErrorKind::ArgNotAssignable)
                .with(ErrorKey::Function, state.function.short_name())
                .with(ErrorKey::Arg, &arg.name)
                .with(ErrorKey::ArgType, &arg.arg_type));
        }

        let taken = state.values.iter().any(|(n, _)| n == name);
        let slot = if arg.vararg && name == arg.name && taken {
            next_vararg_name(&state, arg)?
        } else {
            name.to_string()
        };
        Ok((arg.clone(), slot))
    }

    fn assign(&self, slot: String, value: Assigned) {
        let mut state = self.state.borrow_mut();
        match state.values.iter_mut().find(|(n, _)| *n == slot) {
            Some(existing) => existing.1 = value,
            None => state.values.push((slot, value)),
        }
    }

    fn nested_builders(&self) -> Vec<CallBuilder> {
        self.state
            .borrow()
            .values
            .iter()
            .filter_map(|(_, v)| match v {
                Assigned::Nested(b) => Some(b.clone()),
                Assigned::Term(_) => None,
            })
            .collect()
    }

    /// True if `target` is reachable through this builder's nested builders.
    fn reaches(&self, target: &CallBuilder) -> bool {
        let mut visited: Vec<CallBuilder> = vec![self.clone()];
        let mut stack = vec![self.clone()];
        while let Some(current) = stack.pop() {
            for child in current.nested_builders() {
                if child.ptr_eq(target) {
                    return true;
                }
                if !visited.iter().any(|v| v.ptr_eq(&child)) {
                    visited.push(child.clone());
                    stack.push(child);
                }
            }
        }
        false
    }

    // ========================================================================
    // Build
    // ========================================================================

    pub fn build(&self) -> MapResult<Call> {
        self.build_with_warnings().map(|built| built.call)
    }

    pub fn build_with_warnings(&self) -> MapResult<BuiltCall> {
        let (function, values, strict) = {
            let state = self.state.borrow();
            (state.function.clone(), state.values.clone(), state.strict)
        };
        let mut issues = Vec::new();
        let mut assigned: HashSet<String> = values.iter().map(|(n, _)| n.clone()).collect();
        let mut resolved: Vec<(String, CallValue)> = Vec::with_capacity(values.len());

        for (name, value) in values {
            match value {
                Assigned::Term(t) => resolved.push((name, CallValue::Term(t))),
                Assigned::Nested(nested) => match nested.build_with_warnings() {
                    Ok(built) => {
                        issues.extend(built.warnings);
                        resolved.push((name, CallValue::Call(Box::new(built.call))));
                    }
                    Err(e) => issues.push(e),
                },
            }
        }

        if function.is_target()
            && function.arg(SOURCE_ARG).is_some()
            && assigned.insert(SOURCE_ARG.to_string())
        {
            resolved.push((
                SOURCE_ARG.to_string(),
                CallValue::Term(Term::iri(vocab::MAP_THIS)),
            ));
        }

        let args = function.args();
        for (i, arg) in args.iter().enumerate() {
            let detail = |kind: ErrorKind| {
                MapError::new(kind)
                    .with(ErrorKey::Function, function.short_name())
                    .with(ErrorKey::Arg, &arg.name)
                    .with(ErrorKey::ArgType, &arg.arg_type)
            };

            if arg.vararg && i + 1 != args.len() {
                issues.push(detail(ErrorKind::VarargNotLast));
            }

            let slot_values: Vec<&CallValue> = resolved
                .iter()
                .filter(|(n, _)| {
                    *n == arg.name || (arg.vararg && arg.vararg_index(n).is_some())
                })
                .map(|(_, v)| v)
                .collect();
            let is_assigned = assigned.iter().any(|n| {
                *n == arg.name || (arg.vararg && arg.vararg_index(n).is_some())
            });

            if is_assigned {
                if let Some(prev) = i.checked_sub(1).map(|p| &args[p]) {
                    if prev.optional && !assigned.contains(&prev.name) {
                        issues.push(
                            MapError::new(ErrorKind::MissedOptionalArg)
                                .with(ErrorKey::Function, function.short_name())
                                .with(ErrorKey::Arg, &prev.name)
                                .with(
                                    ErrorKey::Message,
                                    format!("`{}` is set but `{}` before it is not", arg.name, prev.name),
                                ),
                        );
                    }
                }
                for value in slot_values.iter().filter_map(|v| v.as_term()) {
                    if !arg.allows(value) {
                        issues.push(
                            detail(ErrorKind::MustBeOneOf)
                                .with(ErrorKey::ArgValue, value.lexical())
                                .with(
                                    ErrorKey::Message,
                                    format!("expected one of {}", arg.one_of.join(", ")),
                                ),
                        );
                    }
                }
            } else if let Some(default) = &arg.default {
                resolved.push((arg.name.clone(), CallValue::Term(default.clone())));
            } else if !arg.optional {
                issues.push(detail(ErrorKind::NoRequiredArg));
            }
        }

        let (mut errors, mut warnings): (Vec<MapError>, Vec<MapError>) =
            issues.into_iter().partition(|e| !e.kind().is_warning());
        if strict || !errors.is_empty() {
            errors.append(&mut warnings);
        }
        MapError::aggregate(errors)?;

        Ok(BuiltCall {
            call: Call::from_parts(function, resolved),
            warnings,
        })
    }
}

fn next_vararg_name(state: &BuilderState, vararg: &ArgDescriptor) -> MapResult<String> {
    let max = state
        .function
        .args()
        .iter()
        .map(|a| a.name.as_str())
        .chain(state.values.iter().map(|(n, _)| n.as_str()))
        .filter_map(|n| vararg.vararg_index(n))
        .max()
        .unwrap_or(0);
    let next = max.checked_add(1).ok_or_else(|| {
        MapError::new(ErrorKind::NonexistentArg)
            .with(ErrorKey::Function, state.function.short_name())
            .with(ErrorKey::Arg, &vararg.name)
            .with(ErrorKey::Message, "no vararg slot left after the highest index")
    })?;
    Ok(format!("{}{}", vararg.vararg_prefix(), next))
}

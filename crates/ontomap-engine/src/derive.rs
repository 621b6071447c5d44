//! Derivation primitive: evaluate a rule body for one bound individual.
//!
//! Evaluation is pure. The individual is passed in as a binding and the rule
//! body is never rewritten, so one body can be evaluated for any number of
//! individuals without exclusive access.
//!
//! Argument tokens resolve as follows:
//!
//! | token                 | values                                            |
//! |-----------------------|---------------------------------------------------|
//! | `map:_this`           | the bound individual                              |
//! | `map:sourcePropertyK` | objects of `individual <K-th source property> ?o` |
//! | `map:paramK`          | K-th parameter of the enclosing custom function   |
//! | anything else         | itself                                            |
//!
//! An argument with several values fans out into one invocation per
//! combination; an argument with no value produces no result.

use ahash::AHashSet;
use ontomap_graph::{vocab, GraphRead, Term, Triple};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::call::{Call, CallValue};
use crate::error::{ErrorKey, ErrorKind, MapError, MapResult};
use crate::function::{short_name, ArgValues, FunctionImpl, FunctionRegistry};
use crate::rule::{RuleBody, RuleHead};

/// Custom functions may call each other; deeper chains than this are rejected.
pub const MAX_CUSTOM_DEPTH: usize = 64;

/// Variable bindings for one rule execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    this: Term,
}

impl Bindings {
    pub fn new(this: Term) -> Self {
        Self { this }
    }

    /// The individual being mapped.
    pub fn this(&self) -> &Term {
        &self.this
    }
}

/// Runs a rule body bound to one individual and returns the derived facts.
pub trait Derivation {
    fn derive(
        &self,
        body: &RuleBody,
        bindings: &Bindings,
        view: &dyn GraphRead,
    ) -> MapResult<Vec<Triple>>;
}

// ============================================================================
// Call evaluation
// ============================================================================

/// The default derivation: evaluates calls through a function registry.
pub struct CallDerivation {
    registry: Arc<FunctionRegistry>,
}

struct Env<'e> {
    view: &'e dyn GraphRead,
    this: &'e Term,
    /// Source properties keyed by their `map:sourcePropertyK` index
    sources: &'e BTreeMap<usize, Term>,
    params: &'e [(String, Term)],
    depth: usize,
}

impl CallDerivation {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    /// Every value `call` produces for `this`, without source properties.
    pub fn evaluate(&self, call: &Call, this: &Term, view: &dyn GraphRead) -> MapResult<Vec<Term>> {
        let sources = BTreeMap::new();
        let env = Env {
            view,
            this,
            sources: &sources,
            params: &[],
            depth: 0,
        };
        self.eval(call, &env)
    }

    fn resolve(&self, term: &Term, env: &Env<'_>) -> Vec<Term> {
        let Some(iri) = term.as_iri() else {
            return vec![term.clone()];
        };
        if iri == vocab::MAP_THIS {
            return vec![env.this.clone()];
        }
        if let Some(k) = vocab::source_property_index(iri) {
            return match env.sources.get(&k).and_then(Term::as_iri) {
                Some(property) => env.view.objects(env.this, property),
                None => Vec::new(),
            };
        }
        if let Some(k) = vocab::param_index(iri) {
            let name = format!("param{k}");
            return env
                .params
                .iter()
                .filter(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .collect();
        }
        vec![term.clone()]
    }

    fn eval(&self, call: &Call, env: &Env<'_>) -> MapResult<Vec<Term>> {
        let mut columns: Vec<(&str, Vec<Term>)> = Vec::with_capacity(call.args().len());
        for (name, value) in call.args() {
            let values = match value {
                CallValue::Term(t) => self.resolve(t, env),
                CallValue::Call(nested) => self.eval(nested, env)?,
            };
            if values.is_empty() {
                return Ok(Vec::new());
            }
            columns.push((name.as_str(), values));
        }

        let entry = self.registry.lookup(call.name())?;
        let mut out = Vec::new();
        for row in combinations(&columns) {
            match &entry.implementation {
                FunctionImpl::Native(body) => {
                    if let Some(value) = body.invoke(&ArgValues::new(call.name(), row))? {
                        out.push(value);
                    }
                }
                FunctionImpl::Composite(body) => {
                    if env.depth >= MAX_CUSTOM_DEPTH {
                        return Err(MapError::new(ErrorKind::CustomFunctionMalformed)
                            .with(ErrorKey::Function, short_name(call.name()))
                            .with(ErrorKey::Message, "custom function nesting too deep"));
                    }
                    let inner = Env {
                        view: env.view,
                        this: env.this,
                        sources: env.sources,
                        params: &row,
                        depth: env.depth + 1,
                    };
                    out.extend(self.eval(body, &inner)?);
                }
            }
        }
        Ok(dedup(out))
    }

    /// True if any evaluation of `filter` is true.
    fn passes(&self, filter: &Call, env: &Env<'_>) -> MapResult<bool> {
        Ok(self.eval(filter, env)?.iter().any(Term::is_true))
    }
}

impl Derivation for CallDerivation {
    fn derive(
        &self,
        body: &RuleBody,
        bindings: &Bindings,
        view: &dyn GraphRead,
    ) -> MapResult<Vec<Triple>> {
        let none = BTreeMap::new();
        let sources = match &body.head {
            RuleHead::Bridge { sources, .. } => sources,
            _ => &none,
        };
        let env = Env {
            view,
            this: bindings.this(),
            sources,
            params: &[],
            depth: 0,
        };

        if let Some(filter) = &body.context_filter {
            if !self.passes(filter, &env)? {
                return Ok(Vec::new());
            }
        }
        if let RuleHead::Bridge {
            filter: Some(filter),
            ..
        } = &body.head
        {
            if !self.passes(filter, &env)? {
                return Ok(Vec::new());
            }
        }

        let targets: Vec<Term> = self
            .eval(&body.target, &env)?
            .into_iter()
            .filter(|t| !t.is_literal())
            .collect();
        let mut out = Vec::new();
        match &body.head {
            RuleHead::Declare { class } => {
                out.extend(targets.into_iter().map(|t| Triple::typed(t, class.clone())));
            }
            RuleHead::DeclareNamed => {
                let named = Term::iri(vocab::OWL_NAMED_INDIVIDUAL);
                out.extend(
                    targets
                        .into_iter()
                        .filter(Term::is_iri)
                        .map(|t| Triple::typed(t, named.clone())),
                );
            }
            RuleHead::Bridge {
                property,
                expression,
                ..
            } => {
                if targets.is_empty() {
                    return Ok(out);
                }
                let values = self.eval(expression, &env)?;
                for target in &targets {
                    for value in &values {
                        out.push(Triple::new(target.clone(), property.clone(), value.clone()));
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Cartesian product of the argument columns, one row per combination.
fn combinations(columns: &[(&str, Vec<Term>)]) -> Vec<Vec<(String, Term)>> {
    let mut rows: Vec<Vec<(String, Term)>> = vec![Vec::with_capacity(columns.len())];
    for (name, values) in columns {
        let mut next = Vec::with_capacity(rows.len() * values.len());
        for row in &rows {
            for value in values {
                let mut extended = row.clone();
                extended.push((name.to_string(), value.clone()));
                next.push(extended);
            }
        }
        rows = next;
    }
    rows
}

fn dedup(values: Vec<Term>) -> Vec<Term> {
    let mut seen = AHashSet::with_capacity(values.len());
    values.into_iter().filter(|v| seen.insert(v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontomap_graph::Graph;

    fn person() -> (Graph, Term) {
        let x = Term::iri("http://ex.org/x");
        let mut g = Graph::new();
        g.add(x.clone(), "http://ex.org/first", Term::literal("Ada"));
        g.add(x.clone(), "http://ex.org/nick", Term::literal("a"));
        g.add(x.clone(), "http://ex.org/nick", Term::literal("b"));
        (g, x)
    }

    fn bridge_body(reg: &FunctionRegistry, expression: Call, filter: Option<Call>) -> MapResult<RuleBody> {
        Ok(RuleBody {
            target: reg.builder("self")?.build()?,
            context_filter: None,
            head: RuleHead::Bridge {
                sources: BTreeMap::from([
                    (1, Term::iri("http://ex.org/first")),
                    (2, Term::iri("http://ex.org/nick")),
                ]),
                property: Term::iri("http://ex.org/label"),
                expression,
                filter,
            },
        })
    }

    #[test]
    fn multi_valued_arguments_fan_out() -> MapResult<()> {
        let reg = Arc::new(FunctionRegistry::with_builtins());
        let (g, x) = person();
        let concat = reg.builder("concat")?;
        concat
            .add("separator", "-")?
            .add("arg1", &vocab::source_property(1))?
            .add("arg1", &vocab::source_property(2))?;
        let body = bridge_body(&reg, concat.build()?, None)?;

        let mut facts = CallDerivation::new(reg.clone()).derive(&body, &Bindings::new(x.clone()), &g)?;
        facts.sort();
        let label = Term::iri("http://ex.org/label");
        assert_eq!(
            facts,
            vec![
                Triple::new(x.clone(), label.clone(), Term::literal("Ada-a")),
                Triple::new(x, label, Term::literal("Ada-b")),
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_source_value_yields_nothing() -> MapResult<()> {
        let reg = Arc::new(FunctionRegistry::with_builtins());
        let (g, _) = person();
        let expr = reg.builder("equals")?;
        expr.add("arg1", &vocab::source_property(1))?;
        let body = bridge_body(&reg, expr.build()?, None)?;
        let other = Term::iri("http://ex.org/nobody");
        assert!(CallDerivation::new(reg.clone())
            .derive(&body, &Bindings::new(other), &g)?
            .is_empty());
        Ok(())
    }

    #[test]
    fn source_tokens_resolve_by_declared_index() -> MapResult<()> {
        let reg = Arc::new(FunctionRegistry::with_builtins());
        let (g, x) = person();
        let expr = reg.builder("equals")?;
        expr.add("arg1", &vocab::source_property(3))?;
        let mut body = bridge_body(&reg, expr.build()?, None)?;
        if let RuleHead::Bridge { sources, .. } = &mut body.head {
            *sources = BTreeMap::from([
                (1, Term::iri("http://ex.org/first")),
                (3, Term::iri("http://ex.org/nick")),
            ]);
        }
        let derivation = CallDerivation::new(reg.clone());
        let mut facts = derivation.derive(&body, &Bindings::new(x.clone()), &g)?;
        facts.sort();
        let values: Vec<Term> = facts.into_iter().map(|t| t.object).collect();
        assert_eq!(values, vec![Term::literal("a"), Term::literal("b")]);

        // Index 2 is not declared, so nothing resolves.
        let gap = reg.builder("equals")?;
        gap.add("arg1", &vocab::source_property(2))?;
        if let RuleHead::Bridge { expression, .. } = &mut body.head {
            *expression = gap.build()?;
        }
        assert!(derivation.derive(&body, &Bindings::new(x), &g)?.is_empty());
        Ok(())
    }

    #[test]
    fn failing_filter_blocks_the_bridge() -> MapResult<()> {
        let reg = Arc::new(FunctionRegistry::with_builtins());
        let (g, x) = person();
        let expr = reg.builder("equals")?;
        expr.add("arg1", &vocab::source_property(1))?;
        let filter = reg.builder("eq")?;
        filter
            .add("arg1", &vocab::source_property(1))?
            .add("arg2", "Grace")?;
        let body = bridge_body(&reg, expr.build()?, Some(filter.build()?))?;
        assert!(CallDerivation::new(reg.clone())
            .derive(&body, &Bindings::new(x), &g)?
            .is_empty());
        Ok(())
    }

    #[test]
    fn custom_functions_bind_params() -> MapResult<()> {
        let reg = Arc::new(FunctionRegistry::with_builtins());
        let body = reg.builder("toUpperCase")?;
        body.add("arg1", &vocab::param(1))?;
        reg.register_composite("http://ex.org/fn#shout", &body.build()?)?;

        let call = reg.builder("http://ex.org/fn#shout")?;
        call.add("param1", "hey")?;
        let (g, x) = person();
        let values = CallDerivation::new(reg.clone()).evaluate(&call.build()?, &x, &g)?;
        assert_eq!(values, vec![Term::literal("HEY")]);
        Ok(())
    }

    #[test]
    fn function_errors_propagate() -> MapResult<()> {
        let reg = Arc::new(FunctionRegistry::with_builtins());
        let call = reg.builder("convertLength")?;
        call.add("arg1", "far")?;
        let (g, x) = person();
        let err = CallDerivation::new(reg.clone()).evaluate(&call.build()?, &x, &g);
        assert_eq!(err.err().map(|e| e.kind()), Some(ErrorKind::FunctionInvocation));
        Ok(())
    }
}

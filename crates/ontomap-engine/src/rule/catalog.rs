//! Rule selection: scan a specification view for Contexts and PropertyBridges
//! and turn each into rules.

use ontomap_graph::{vocab, GraphRead, Term};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::{Rule, RuleBody, RuleHead, RuleKind};
use crate::call::{read_call, Call, CallValue};
use crate::config::MapConfig;
use crate::error::{ErrorKey, ErrorKind, MapError, MapResult};
use crate::function::builtin;
use crate::function::FunctionRegistry;
use crate::model::{read_bridges, read_contexts, ContextSpec};

/// Select every rule encoded in `view`, in rule order.
///
/// Incomplete Contexts and PropertyBridges are skipped with a warning;
/// malformed calls and calls in the wrong role are errors. An empty result is
/// not an error here: the executor decides what an empty rule set means.
pub fn select_rules(
    view: &dyn GraphRead,
    registry: &FunctionRegistry,
    config: &MapConfig,
) -> MapResult<BTreeSet<Rule>> {
    let mut rules = BTreeSet::new();
    for context in read_contexts(view) {
        let before = rules.len();
        select_for_context(view, registry, config, &context, &mut rules)?;
        debug!(context = %context.iri, rules = rules.len() - before, "selected rules");
    }
    Ok(rules)
}

fn select_for_context(
    view: &dyn GraphRead,
    registry: &FunctionRegistry,
    config: &MapConfig,
    context: &ContextSpec,
    rules: &mut BTreeSet<Rule>,
) -> MapResult<()> {
    let (Some(source_class), Some(target_class), Some(target)) =
        (&context.source_class, &context.target_class, &context.target)
    else {
        warn!(context = %context.iri, "skipping incomplete context");
        return Ok(());
    };

    let target = read_call(view, target, registry)?;
    if !target.is_target() {
        return Err(MapError::new(ErrorKind::ContextRequiresTargetFunction)
            .with(ErrorKey::Context, &context.iri)
            .with(ErrorKey::Function, target.function().short_name()));
    }
    let context_filter = read_filter(view, registry, context.filter.as_ref(), &context.iri)?;

    let optimizable = config.optimize_queries && context_filter.is_none() && is_identity(&target);
    let declaration_kind = |optimized: RuleKind| {
        if optimizable {
            optimized
        } else {
            RuleKind::Generic
        }
    };

    rules.insert(Rule::new(
        context.iri.clone(),
        source_class.clone(),
        declaration_kind(RuleKind::TypeDeclaration),
        RuleBody {
            target: target.clone(),
            context_filter: context_filter.clone(),
            head: RuleHead::Declare {
                class: target_class.clone(),
            },
        },
    ));
    if config.declare_named_individuals {
        rules.insert(Rule::new(
            context.iri.clone(),
            source_class.clone(),
            declaration_kind(RuleKind::NamedIndividual),
            RuleBody {
                target: target.clone(),
                context_filter: context_filter.clone(),
                head: RuleHead::DeclareNamed,
            },
        ));
    }

    for bridge in read_bridges(view, &context.iri) {
        let (Some(property), Some(expression)) = (&bridge.target_property, &bridge.expression) else {
            warn!(context = %context.iri, bridge = %bridge.node, "skipping incomplete property bridge");
            continue;
        };
        if bridge.sources.is_empty() {
            warn!(context = %context.iri, bridge = %bridge.node, "skipping property bridge without source properties");
            continue;
        }
        let expression = read_call(view, expression, registry)?;
        if expression.is_target() {
            return Err(MapError::new(ErrorKind::BridgeRequiresNonTargetFunction)
                .with(ErrorKey::Context, &context.iri)
                .with(ErrorKey::Property, property)
                .with(ErrorKey::Function, expression.function().short_name()));
        }
        let filter = read_filter(view, registry, bridge.filter.as_ref(), &context.iri)?;
        rules.insert(Rule::new(
            context.iri.clone(),
            source_class.clone(),
            RuleKind::Generic,
            RuleBody {
                target: target.clone(),
                context_filter: context_filter.clone(),
                head: RuleHead::Bridge {
                    sources: bridge.sources.clone(),
                    property: property.clone(),
                    expression,
                    filter,
                },
            },
        ));
    }
    Ok(())
}

fn read_filter(
    view: &dyn GraphRead,
    registry: &FunctionRegistry,
    node: Option<&Term>,
    context: &Term,
) -> MapResult<Option<Call>> {
    let Some(node) = node else {
        return Ok(None);
    };
    let filter = read_call(view, node, registry)?;
    if !filter.is_boolean() {
        return Err(MapError::new(ErrorKind::FilterRequiresBooleanFunction)
            .with(ErrorKey::Context, context)
            .with(ErrorKey::Function, filter.function().short_name()));
    }
    Ok(Some(filter))
}

/// `fn:self(source=map:_this)`: the target individual is the mapped one.
fn is_identity(target: &Call) -> bool {
    target.name() == builtin::SELF
        && matches!(
            target.get(builtin::SOURCE_ARG),
            Some(CallValue::Term(t)) if t.is(vocab::MAP_THIS)
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MappingModel;

    fn model_with_bridge(reg: &FunctionRegistry) -> MapResult<MappingModel> {
        let mut model = MappingModel::new();
        let ctx = model.create_context("http://ex.org/map#ctx", "http://ex.org/A", "http://ex.org/B");
        model.set_target(&ctx, &reg.builder("self")?.build()?)?;
        let expr = reg.builder("equals")?;
        expr.add("arg1", &vocab::source_property(1))?;
        model.add_property_bridge(&ctx, &["http://ex.org/p1"], "http://ex.org/p2", &expr.build()?, None)?;
        Ok(model)
    }

    #[test]
    fn one_declaration_and_one_bridge_rule() -> MapResult<()> {
        let reg = FunctionRegistry::with_builtins();
        let model = model_with_bridge(&reg)?;
        let rules: Vec<Rule> = select_rules(model.graph(), &reg, &MapConfig::default())?
            .into_iter()
            .collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].kind(), RuleKind::TypeDeclaration);
        assert!(rules[0].is_declaration());
        assert_eq!(rules[1].kind(), RuleKind::Generic);
        assert_eq!(rules[1].subject_class(), &Term::iri("http://ex.org/A"));
        Ok(())
    }

    #[test]
    fn optimization_switch_only_changes_kinds() -> MapResult<()> {
        let reg = FunctionRegistry::with_builtins();
        let model = model_with_bridge(&reg)?;
        let config = MapConfig {
            optimize_queries: false,
            declare_named_individuals: true,
            ..MapConfig::default()
        };
        let slow = select_rules(model.graph(), &reg, &config)?;
        assert!(slow.iter().all(|r| r.kind() == RuleKind::Generic));

        let fast = select_rules(
            model.graph(),
            &reg,
            &MapConfig {
                declare_named_individuals: true,
                ..MapConfig::default()
            },
        )?;
        let texts = |rules: &BTreeSet<Rule>| rules.iter().map(|r| r.text().to_string()).collect::<Vec<_>>();
        assert_eq!(texts(&slow), texts(&fast));
        assert!(fast.iter().any(|r| r.kind() == RuleKind::NamedIndividual));
        Ok(())
    }

    #[test]
    fn incomplete_context_is_skipped() -> MapResult<()> {
        let reg = FunctionRegistry::with_builtins();
        let mut model = MappingModel::new();
        model.create_context("http://ex.org/map#noTarget", "http://ex.org/A", "http://ex.org/B");
        assert!(select_rules(model.graph(), &reg, &MapConfig::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn filtered_context_is_not_optimized() -> MapResult<()> {
        let reg = FunctionRegistry::with_builtins();
        let mut model = model_with_bridge(&reg)?;
        let ctx = Term::iri("http://ex.org/map#ctx");
        let filter = reg.builder("isNotBlank")?;
        filter.add("arg1", vocab::MAP_THIS)?;
        model.set_context_filter(&ctx, Some(&filter.build()?))?;

        let rules = select_rules(model.graph(), &reg, &MapConfig::default())?;
        assert!(rules.iter().all(|r| r.kind() == RuleKind::Generic));
        assert!(rules.iter().all(|r| r.body().context_filter.is_some()));
        Ok(())
    }
}

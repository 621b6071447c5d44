//! Built-in function library (`http://ontomap.dev/fn#`).

use ontomap_graph::{local_name, vocab, Term};
use std::sync::Arc;

use super::{ArgDescriptor, ArgValues, FunctionBody, FunctionDescriptor};
use crate::error::{ErrorKey, MapResult};

pub const SELF: &str = "http://ontomap.dev/fn#self";
pub const BUILD_IRI: &str = "http://ontomap.dev/fn#buildIri";
pub const EQUALS: &str = "http://ontomap.dev/fn#equals";
pub const CONCAT: &str = "http://ontomap.dev/fn#concat";
pub const TO_UPPER_CASE: &str = "http://ontomap.dev/fn#toUpperCase";
pub const TO_LOWER_CASE: &str = "http://ontomap.dev/fn#toLowerCase";
pub const LOCAL_NAME: &str = "http://ontomap.dev/fn#localName";
pub const SUBSTRING: &str = "http://ontomap.dev/fn#substring";
pub const CONVERT_LENGTH: &str = "http://ontomap.dev/fn#convertLength";
pub const EQ: &str = "http://ontomap.dev/fn#eq";
pub const IS_NOT_BLANK: &str = "http://ontomap.dev/fn#isNotBlank";
pub const NOT: &str = "http://ontomap.dev/fn#not";

/// Name of the argument target functions bind to the mapped individual.
pub const SOURCE_ARG: &str = "source";

type Entry = (FunctionDescriptor, Arc<dyn FunctionBody>);

fn single(name: &str, return_type: &str, comment: &str) -> FunctionDescriptor {
    FunctionDescriptor::trusted(name, return_type, vec![ArgDescriptor::new("arg1")])
        .with_comment(comment)
}

fn native<F: FunctionBody + 'static>(body: F) -> Arc<dyn FunctionBody> {
    Arc::new(body)
}

/// Every built-in descriptor with its body.
pub fn library() -> Vec<Entry> {
    let source = || ArgDescriptor::new(SOURCE_ARG).not_assignable();
    vec![
        (
            FunctionDescriptor::trusted(SELF, vocab::RDFS_RESOURCE, vec![source()])
                .target()
                .leaf()
                .with_comment("The mapped individual itself."),
            native(self_body),
        ),
        (
            FunctionDescriptor::trusted(
                BUILD_IRI,
                vocab::RDFS_RESOURCE,
                vec![
                    ArgDescriptor::new("template").of_type(vocab::XSD_STRING),
                    source(),
                ],
            )
            .target()
            .with_comment("IRI from a template; `{}` is replaced by the local name of the source."),
            native(build_iri),
        ),
        (
            single(EQUALS, vocab::RDFS_RESOURCE, "The value unchanged."),
            native(equals),
        ),
        (
            FunctionDescriptor::trusted(
                CONCAT,
                vocab::XSD_STRING,
                vec![
                    ArgDescriptor::new("separator")
                        .of_type(vocab::XSD_STRING)
                        .with_default(Term::literal("")),
                    ArgDescriptor::new("arg1").vararg(),
                ],
            )
            .with_comment("Lexical forms joined by the separator."),
            native(concat),
        ),
        (
            single(TO_UPPER_CASE, vocab::XSD_STRING, "Upper-cased lexical form."),
            native(to_upper_case),
        ),
        (
            single(TO_LOWER_CASE, vocab::XSD_STRING, "Lower-cased lexical form."),
            native(to_lower_case),
        ),
        (
            single(LOCAL_NAME, vocab::XSD_STRING, "Local name of an IRI."),
            native(local_name_body),
        ),
        (
            FunctionDescriptor::trusted(
                SUBSTRING,
                vocab::XSD_STRING,
                vec![
                    ArgDescriptor::new("arg1"),
                    ArgDescriptor::new("start")
                        .of_type(vocab::XSD_INTEGER)
                        .optional(),
                    ArgDescriptor::new("length")
                        .of_type(vocab::XSD_INTEGER)
                        .optional(),
                ],
            )
            .with_comment("Characters from `start` (0-based), at most `length` of them."),
            native(substring),
        ),
        (
            FunctionDescriptor::trusted(
                CONVERT_LENGTH,
                vocab::XSD_DOUBLE,
                vec![
                    ArgDescriptor::new("arg1").of_type(vocab::XSD_DOUBLE),
                    ArgDescriptor::new("unit")
                        .of_type(vocab::XSD_STRING)
                        .one_of(["m", "km"])
                        .with_default(Term::literal("m")),
                ],
            )
            .with_comment("A length in metres expressed in `unit`."),
            native(convert_length),
        ),
        (
            FunctionDescriptor::trusted(
                EQ,
                vocab::XSD_BOOLEAN,
                vec![ArgDescriptor::new("arg1"), ArgDescriptor::new("arg2")],
            )
            .with_comment("True if both values are equal."),
            native(eq),
        ),
        (
            single(IS_NOT_BLANK, vocab::XSD_BOOLEAN, "True if the lexical form is not blank."),
            native(is_not_blank),
        ),
        (
            single(NOT, vocab::XSD_BOOLEAN, "Boolean negation."),
            native(not),
        ),
    ]
}

// ============================================================================
// Bodies
// ============================================================================

fn self_body(args: &ArgValues) -> MapResult<Option<Term>> {
    let source = args.require(SOURCE_ARG)?;
    Ok((!source.is_literal()).then(|| source.clone()))
}

fn build_iri(args: &ArgValues) -> MapResult<Option<Term>> {
    let template = args.require("template")?.lexical();
    let source = args.require(SOURCE_ARG)?;
    let key = match source {
        Term::Iri(iri) => local_name(iri),
        other => other.lexical(),
    };
    if key.is_empty() {
        return Ok(None);
    }
    Ok(Some(Term::iri(template.replace("{}", key))))
}

fn equals(args: &ArgValues) -> MapResult<Option<Term>> {
    Ok(Some(args.require("arg1")?.clone()))
}

fn concat(args: &ArgValues) -> MapResult<Option<Term>> {
    let separator = args.get("separator").map(Term::lexical).unwrap_or("");
    let parts: Vec<&str> = args.family("arg").into_iter().map(Term::lexical).collect();
    Ok(Some(Term::literal(parts.join(separator))))
}

fn to_upper_case(args: &ArgValues) -> MapResult<Option<Term>> {
    Ok(Some(Term::literal(args.require("arg1")?.lexical().to_uppercase())))
}

fn to_lower_case(args: &ArgValues) -> MapResult<Option<Term>> {
    Ok(Some(Term::literal(args.require("arg1")?.lexical().to_lowercase())))
}

fn local_name_body(args: &ArgValues) -> MapResult<Option<Term>> {
    match args.require("arg1")? {
        Term::Iri(iri) => Ok(Some(Term::literal(local_name(iri)))),
        _ => Ok(None),
    }
}

fn integer_arg(args: &ArgValues, name: &str) -> MapResult<Option<usize>> {
    let Some(value) = args.get(name) else {
        return Ok(None);
    };
    value.lexical().trim().parse::<usize>().map(Some).map_err(|_| {
        args.error("not a non-negative integer")
            .with(ErrorKey::Arg, name)
            .with(ErrorKey::ArgValue, value)
    })
}

fn substring(args: &ArgValues) -> MapResult<Option<Term>> {
    let text = args.require("arg1")?.lexical();
    let start = integer_arg(args, "start")?.unwrap_or(0);
    let chars = text.chars().skip(start);
    let out: String = match integer_arg(args, "length")? {
        Some(length) => chars.take(length).collect(),
        None => chars.collect(),
    };
    Ok(Some(Term::literal(out)))
}

fn convert_length(args: &ArgValues) -> MapResult<Option<Term>> {
    let value = args.require("arg1")?;
    let metres: f64 = value.lexical().trim().parse().map_err(|_| {
        args.error("not a number")
            .with(ErrorKey::Arg, "arg1")
            .with(ErrorKey::ArgValue, value)
    })?;
    let unit = args.get("unit").map(Term::lexical).unwrap_or("m");
    let converted = match unit {
        "km" => metres / 1000.0,
        "m" => metres,
        other => {
            return Err(args
                .error("unsupported unit")
                .with(ErrorKey::Arg, "unit")
                .with(ErrorKey::ArgValue, other))
        }
    };
    Ok(Some(Term::double(converted)))
}

fn eq(args: &ArgValues) -> MapResult<Option<Term>> {
    let (a, b) = (args.require("arg1")?, args.require("arg2")?);
    let same = a == b || (a.is_literal() && b.is_literal() && a.lexical() == b.lexical());
    Ok(Some(Term::boolean(same)))
}

fn is_not_blank(args: &ArgValues) -> MapResult<Option<Term>> {
    Ok(Some(Term::boolean(
        !args.require("arg1")?.lexical().trim().is_empty(),
    )))
}

fn not(args: &ArgValues) -> MapResult<Option<Term>> {
    Ok(Some(Term::boolean(!args.require("arg1")?.is_true())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn invoke(name: &str, values: &[(&str, Term)]) -> MapResult<Option<Term>> {
        let (descriptor, body) = library()
            .into_iter()
            .find(|(d, _)| d.name() == name)
            .ok_or_else(|| crate::error::MapError::new(ErrorKind::FunctionNotFound))?;
        let values = values
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        body.invoke(&ArgValues::new(descriptor.name(), values))
    }

    #[test]
    fn builtin_descriptors_pass_validation() -> MapResult<()> {
        for (descriptor, _) in library() {
            let checked = FunctionDescriptor::new(
                descriptor.name(),
                descriptor.return_type(),
                descriptor.args().to_vec(),
            )?;
            assert_eq!(checked.args(), descriptor.args());
            if descriptor.is_target() {
                assert!(!descriptor.can_be_nested(), "{}", descriptor.name());
            }
        }
        Ok(())
    }

    #[test]
    fn target_bodies() -> MapResult<()> {
        let x = Term::iri("http://ex.org/people/alice");
        assert_eq!(invoke(SELF, &[(SOURCE_ARG, x.clone())])?, Some(x.clone()));
        assert_eq!(
            invoke(
                BUILD_IRI,
                &[
                    ("template", Term::literal("http://ex.org/person/{}")),
                    (SOURCE_ARG, x)
                ]
            )?,
            Some(Term::iri("http://ex.org/person/alice"))
        );
        Ok(())
    }

    #[test]
    fn string_bodies() -> MapResult<()> {
        assert_eq!(
            invoke(
                CONCAT,
                &[
                    ("separator", Term::literal(" ")),
                    ("arg2", Term::literal("Lovelace")),
                    ("arg1", Term::literal("Ada")),
                ]
            )?,
            Some(Term::literal("Ada Lovelace"))
        );
        assert_eq!(
            invoke(TO_UPPER_CASE, &[("arg1", Term::literal("ab"))])?,
            Some(Term::literal("AB"))
        );
        assert_eq!(
            invoke(
                SUBSTRING,
                &[
                    ("arg1", Term::literal("abcdef")),
                    ("start", Term::literal("2")),
                    ("length", Term::literal("3")),
                ]
            )?,
            Some(Term::literal("cde"))
        );
        assert_eq!(
            invoke(LOCAL_NAME, &[("arg1", Term::iri("http://ex.org/ns#Thing"))])?,
            Some(Term::literal("Thing"))
        );
        Ok(())
    }

    #[test]
    fn convert_length_units() -> MapResult<()> {
        assert_eq!(
            invoke(
                CONVERT_LENGTH,
                &[("arg1", Term::literal("1500")), ("unit", Term::literal("km"))]
            )?,
            Some(Term::double(1.5))
        );
        let err = invoke(CONVERT_LENGTH, &[("arg1", Term::literal("far"))]);
        assert_eq!(err.err().map(|e| e.kind()), Some(ErrorKind::FunctionInvocation));
        Ok(())
    }

    #[test]
    fn boolean_bodies() -> MapResult<()> {
        assert_eq!(
            invoke(
                EQ,
                &[("arg1", Term::literal("a")), ("arg2", Term::literal("a"))]
            )?,
            Some(Term::boolean(true))
        );
        assert_eq!(
            invoke(IS_NOT_BLANK, &[("arg1", Term::literal("  "))])?,
            Some(Term::boolean(false))
        );
        assert_eq!(
            invoke(NOT, &[("arg1", Term::boolean(false))])?,
            Some(Term::boolean(true))
        );
        Ok(())
    }
}

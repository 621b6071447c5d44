use ontomap_engine::{
    ArgDescriptor, ErrorKind, FunctionDescriptor, FunctionRegistry, MapResult,
};
use ontomap_graph::{vocab, Graph, Term};
use std::sync::Arc;

fn registry_with_unit_function() -> MapResult<FunctionRegistry> {
    let reg = FunctionRegistry::with_builtins();
    let descriptor = FunctionDescriptor::new(
        "http://ex.org/fn#distance",
        vocab::XSD_DOUBLE,
        vec![
            ArgDescriptor::new("value").of_type(vocab::XSD_DOUBLE),
            ArgDescriptor::new("unit").one_of(["m", "km"]),
        ],
    )?;
    reg.register(
        descriptor,
        Arc::new(|args: &ontomap_engine::function::ArgValues| -> MapResult<Option<Term>> {
            Ok(args.get("value").cloned())
        }),
    )?;
    Ok(reg)
}

#[test]
fn one_of_rejects_values_outside_the_set() -> MapResult<()> {
    let reg = registry_with_unit_function()?;

    let bad = reg.builder("http://ex.org/fn#distance")?;
    bad.add("value", "3")?.add("unit", "x")?;
    assert_eq!(bad.build().err().map(|e| e.kind()), Some(ErrorKind::MustBeOneOf));

    let good = reg.builder("http://ex.org/fn#distance")?;
    good.add("value", "3")?.add("unit", "km")?;
    assert!(good.build().is_ok());
    Ok(())
}

#[test]
fn missing_required_argument() -> MapResult<()> {
    let reg = FunctionRegistry::with_builtins();
    let call = reg.builder("toUpperCase")?;
    let err = call.build().err();
    assert_eq!(err.as_ref().map(|e| e.kind()), Some(ErrorKind::NoRequiredArg));
    assert_eq!(
        err.as_ref().and_then(|e| e.detail(ontomap_engine::ErrorKey::Arg)),
        Some("arg1")
    );
    Ok(())
}

#[test]
fn cycles_are_rejected_when_wired() -> MapResult<()> {
    let reg = FunctionRegistry::with_builtins();
    let a = reg.builder("toUpperCase")?;
    let b = reg.builder("toLowerCase")?;
    a.add_call("arg1", &b)?;
    let err = b.add_call("arg1", &a).err();
    assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::ArgSelfRef));
    // The failed assignment left `b` untouched.
    assert!(!b.is_assigned("arg1"));
    Ok(())
}

#[test]
fn same_adds_build_equal_calls() -> MapResult<()> {
    let reg = FunctionRegistry::with_builtins();
    let build = || -> MapResult<_> {
        let call = reg.builder("concat")?;
        call.add("arg1", "a")?.add("arg1", &vocab::source_property(1))?;
        call.build()
    };
    let (first, second) = (build()?, build()?);
    assert_eq!(first, second);
    // Default applied for the separator.
    assert_eq!(first.to_string(), "fn:concat(separator=\"\", arg1=\"a\", arg2=map:sourceProperty1)");
    Ok(())
}

#[test]
fn several_problems_are_reported_together() -> MapResult<()> {
    let reg = registry_with_unit_function()?;
    let outer = reg.builder("concat")?;
    let broken = reg.builder("http://ex.org/fn#distance")?;
    broken.add("unit", "mi")?;
    outer.add_call("arg1", &broken)?;
    let upper = reg.builder("toUpperCase")?;
    outer.add_call("arg1", &upper)?;

    let err = outer.build().err();
    let err = err.as_ref();
    assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::BuildFail));
    assert!(err.is_some_and(|e| e.contains_kind(ErrorKind::MustBeOneOf)));
    assert!(err.is_some_and(|e| e.contains_kind(ErrorKind::NoRequiredArg)));
    Ok(())
}

#[test]
fn built_calls_persist_as_facts() -> MapResult<()> {
    let reg = FunctionRegistry::with_builtins();
    let call = reg.builder("concat")?;
    let inner = reg.builder("localName")?;
    inner.add("arg1", vocab::MAP_THIS)?;
    call.add("separator", ":")?.add_call("arg1", &inner)?;
    let call = call.build()?;

    let mut g = Graph::new();
    let node = ontomap_engine::call::write_call(&mut g, &call);
    assert_eq!(ontomap_engine::call::read_call(&g, &node, &reg)?, call);
    Ok(())
}

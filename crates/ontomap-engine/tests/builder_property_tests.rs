use ontomap_engine::{Call, ErrorKind, FunctionRegistry, MapResult};
use ontomap_graph::vocab;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Source(usize),
    Upper(String),
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z]{0,6}".prop_map(Value::Text),
        (1usize..4).prop_map(Value::Source),
        "[a-z]{1,4}".prop_map(Value::Upper),
    ]
}

/// A `concat` over the given values, optionally with a separator.
fn build_concat(reg: &FunctionRegistry, separator: &Option<String>, values: &[Value]) -> MapResult<Call> {
    let call = reg.builder("concat")?;
    if let Some(separator) = separator {
        call.add("separator", separator)?;
    }
    for value in values {
        match value {
            Value::Text(text) => {
                call.add("arg1", text)?;
            }
            Value::Source(k) => {
                call.add("arg1", &vocab::source_property(*k))?;
            }
            Value::Upper(text) => {
                let upper = reg.builder("toUpperCase")?;
                upper.add("arg1", text)?;
                call.add_call("arg1", &upper)?;
            }
        }
    }
    call.build()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn same_adds_build_structurally_equal_calls(
        separator in prop::option::of("[-_ ]"),
        values in prop::collection::vec(value_strategy(), 1..6),
    ) {
        let reg = FunctionRegistry::with_builtins();
        let first = build_concat(&reg, &separator, &values).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let second = build_concat(&reg, &separator, &values).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.to_string(), second.to_string());
        // One vararg slot per value, plus the separator (given or defaulted).
        prop_assert_eq!(first.args().len(), values.len() + 1);
    }

    #[test]
    fn unit_must_be_one_of_m_or_km(unit in "[a-z]{1,3}") {
        let reg = FunctionRegistry::with_builtins();
        let call = reg.builder("convertLength").map_err(|e| TestCaseError::fail(e.to_string()))?;
        call.add("arg1", "10").map_err(|e| TestCaseError::fail(e.to_string()))?;
        call.add("unit", &unit).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let result = call.build();
        if unit == "m" || unit == "km" {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::MustBeOneOf));
        }
    }
}

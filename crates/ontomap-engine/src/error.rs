//! Engine errors.
//!
//! One error type for build-time validation and run-time inference. Each
//! error carries a [`ErrorKind`], an ordered key/value detail bag, the
//! secondary errors collected alongside it (`suppressed`) and optionally the
//! error that caused it.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub type MapResult<T> = std::result::Result<T, MapError>;

// ============================================================================
// Kinds and detail keys
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    // Builder: assignment
    ArgNotAssignable,
    ArgSelfRef,
    ArgCannotHaveNested,
    ArgCannotBeNested,
    NonexistentArg,
    // Builder: build()
    NoRequiredArg,
    MustBeOneOf,
    MissedOptionalArg,
    VarargNotLast,
    BuildFail,
    // Catalog / model
    IllegalDescriptor,
    FunctionNotFound,
    ContextRequiresTargetFunction,
    BridgeRequiresNonTargetFunction,
    BridgeRequiresSourceProperty,
    FilterRequiresBooleanFunction,
    ContextNotFound,
    MalformedCall,
    CustomFunctionMalformed,
    // Inference
    NoRules,
    RuleExecutionFail,
    FunctionInvocation,
}

impl ErrorKind {
    /// Stable error code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::ArgNotAssignable => "ILLEGAL_ARG_NOT_ASSIGNABLE",
            ErrorKind::ArgSelfRef => "ILLEGAL_ARG_SELF_REF",
            ErrorKind::ArgCannotHaveNested => "ILLEGAL_ARG_CANNOT_HAVE_NESTED",
            ErrorKind::ArgCannotBeNested => "ILLEGAL_ARG_CANNOT_BE_NESTED",
            ErrorKind::NonexistentArg => "ILLEGAL_ARG_NONEXISTENT",
            ErrorKind::NoRequiredArg => "BUILD_NO_REQUIRED_ARG",
            ErrorKind::MustBeOneOf => "BUILD_MUST_BE_ONE_OF",
            ErrorKind::MissedOptionalArg => "BUILD_MISSED_OPTIONAL_ARG",
            ErrorKind::VarargNotLast => "BUILD_VARARG_NOT_LAST",
            ErrorKind::BuildFail => "BUILD_FAIL",
            ErrorKind::IllegalDescriptor => "ILLEGAL_FUNCTION_DESCRIPTOR",
            ErrorKind::FunctionNotFound => "FUNCTION_NOT_FOUND",
            ErrorKind::ContextRequiresTargetFunction => "CONTEXT_REQUIRES_TARGET_FUNCTION",
            ErrorKind::BridgeRequiresNonTargetFunction => "BRIDGE_REQUIRES_NON_TARGET_FUNCTION",
            ErrorKind::BridgeRequiresSourceProperty => "BRIDGE_REQUIRES_SOURCE_PROPERTY",
            ErrorKind::FilterRequiresBooleanFunction => "FILTER_REQUIRES_BOOLEAN_FUNCTION",
            ErrorKind::ContextNotFound => "CONTEXT_NOT_FOUND",
            ErrorKind::MalformedCall => "MALFORMED_CALL",
            ErrorKind::CustomFunctionMalformed => "CUSTOM_FUNCTION_MALFORMED",
            ErrorKind::NoRules => "NO_RULES",
            ErrorKind::RuleExecutionFail => "RULE_EXECUTION_FAIL",
            ErrorKind::FunctionInvocation => "FUNCTION_INVOCATION",
        }
    }

    /// Warning-class kinds are reported but do not fail a build on their own.
    pub fn is_warning(self) -> bool {
        matches!(self, ErrorKind::MissedOptionalArg)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKey {
    Function,
    Arg,
    ArgType,
    ArgValue,
    Context,
    Property,
    Rule,
    Instance,
    Message,
}

impl ErrorKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKey::Function => "function",
            ErrorKey::Arg => "arg",
            ErrorKey::ArgType => "arg_type",
            ErrorKey::ArgValue => "arg_value",
            ErrorKey::Context => "context",
            ErrorKey::Property => "property",
            ErrorKey::Rule => "rule",
            ErrorKey::Instance => "instance",
            ErrorKey::Message => "message",
        }
    }
}

// ============================================================================
// MapError
// ============================================================================

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}{}", render_details(.details, .suppressed))]
pub struct MapError {
    kind: ErrorKind,
    details: BTreeMap<ErrorKey, String>,
    suppressed: Vec<MapError>,
    #[source]
    cause: Option<Box<MapError>>,
}

impl MapError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            details: BTreeMap::new(),
            suppressed: Vec::new(),
            cause: None,
        }
    }

    /// Attach one detail, replacing an earlier value for the same key.
    pub fn with(mut self, key: ErrorKey, value: impl fmt::Display) -> Self {
        self.details.insert(key, value.to_string());
        self
    }

    pub fn with_cause(mut self, cause: MapError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_suppressed(mut self, errors: Vec<MapError>) -> Self {
        self.suppressed.extend(errors);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn detail(&self, key: ErrorKey) -> Option<&str> {
        self.details.get(&key).map(String::as_str)
    }

    pub fn details(&self) -> &BTreeMap<ErrorKey, String> {
        &self.details
    }

    pub fn suppressed(&self) -> &[MapError] {
        &self.suppressed
    }

    pub fn cause(&self) -> Option<&MapError> {
        self.cause.as_deref()
    }

    /// True if this error or any suppressed error (recursively) has `kind`.
    pub fn contains_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind || self.suppressed.iter().any(|e| e.contains_kind(kind))
    }

    /// Collapse a list of errors: none is `Ok`, one is returned as is, more
    /// become a `BUILD_FAIL` carrying all of them as suppressed errors.
    pub fn aggregate(mut errors: Vec<MapError>) -> MapResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(MapError::new(ErrorKind::BuildFail).with_suppressed(errors)),
        }
    }
}

fn render_details(details: &BTreeMap<ErrorKey, String>, suppressed: &[MapError]) -> String {
    let mut out = String::new();
    if !details.is_empty() {
        let parts: Vec<String> = details
            .iter()
            .map(|(k, v)| format!("{}={v}", k.as_str()))
            .collect();
        out.push_str(&format!(" [{}]", parts.join(", ")));
    }
    if !suppressed.is_empty() {
        let parts: Vec<String> = suppressed.iter().map(|e| e.to_string()).collect();
        out.push_str(&format!(" ({} suppressed: {})", suppressed.len(), parts.join("; ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_details_in_key_order() {
        let err = MapError::new(ErrorKind::MustBeOneOf)
            .with(ErrorKey::ArgValue, "x")
            .with(ErrorKey::Function, "fn:convertLength")
            .with(ErrorKey::Arg, "unit");
        assert_eq!(
            err.to_string(),
            "BUILD_MUST_BE_ONE_OF [function=fn:convertLength, arg=unit, arg_value=x]"
        );
        assert_eq!(err.detail(ErrorKey::Arg), Some("unit"));
    }

    #[test]
    fn aggregate_protocol() {
        assert!(MapError::aggregate(vec![]).is_ok());

        let single = MapError::aggregate(vec![MapError::new(ErrorKind::NoRequiredArg)]);
        assert_eq!(single.err().map(|e| e.kind()), Some(ErrorKind::NoRequiredArg));

        let many = MapError::aggregate(vec![
            MapError::new(ErrorKind::NoRequiredArg),
            MapError::new(ErrorKind::MustBeOneOf),
        ]);
        let Err(err) = many else {
            panic!("expected BUILD_FAIL");
        };
        assert_eq!(err.kind(), ErrorKind::BuildFail);
        assert_eq!(err.suppressed().len(), 2);
        assert!(err.contains_kind(ErrorKind::MustBeOneOf));
        assert!(err.to_string().starts_with("BUILD_FAIL (2 suppressed: "));
    }

    #[test]
    fn cause_is_exposed_as_source() {
        use std::error::Error as _;
        let err = MapError::new(ErrorKind::RuleExecutionFail)
            .with_cause(MapError::new(ErrorKind::FunctionInvocation));
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("FUNCTION_INVOCATION".to_string())
        );
        assert_eq!(err.cause().map(|c| c.kind()), Some(ErrorKind::FunctionInvocation));
    }
}

//! Function registry: an explicit, constructed catalog of function
//! descriptors and their implementations.

use ahash::AHashMap;
use ontomap_graph::{vocab, Graph, Term, Triple};
use parking_lot::RwLock;
use std::sync::Arc;

use super::{builtin, canonical_name, short_name, ArgDescriptor, FunctionBody, FunctionDescriptor};
use crate::call::{Call, CallBuilder};
use crate::error::{ErrorKey, ErrorKind, MapError, MapResult};

/// How a registered function is evaluated.
#[derive(Clone)]
pub enum FunctionImpl {
    /// Opaque Rust body.
    Native(Arc<dyn FunctionBody>),
    /// Custom function defined by a call over `map:paramK` placeholders.
    Composite(Call),
}

impl std::fmt::Debug for FunctionImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionImpl::Native(_) => f.write_str("Native(..)"),
            FunctionImpl::Composite(call) => write!(f, "Composite({call})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub descriptor: Arc<FunctionDescriptor>,
    pub implementation: FunctionImpl,
}

/// Registry of functions, keyed by full IRI.
///
/// Lookups take a read lock; (re-)registration takes the write lock, so one
/// registry can be shared between a manager and concurrent runs.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    entries: RwLock<AHashMap<String, Arc<FunctionEntry>>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in library.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for (descriptor, body) in builtin::library() {
            registry.insert(descriptor, FunctionImpl::Native(body));
        }
        registry
    }

    /// A registry starting with every function registered here. Later
    /// registrations on either registry are not seen by the other.
    pub fn fork(&self) -> Self {
        Self {
            entries: RwLock::new(self.entries.read().clone()),
        }
    }

    fn insert(&self, descriptor: FunctionDescriptor, implementation: FunctionImpl) -> bool {
        let name = descriptor.name().to_string();
        let entry = Arc::new(FunctionEntry {
            descriptor: Arc::new(descriptor),
            implementation,
        });
        self.entries.write().insert(name, entry).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(&canonical_name(name))
    }

    pub fn lookup(&self, name: &str) -> MapResult<Arc<FunctionEntry>> {
        let name = canonical_name(name);
        self.entries.read().get(&name).cloned().ok_or_else(|| {
            MapError::new(ErrorKind::FunctionNotFound).with(ErrorKey::Function, short_name(&name))
        })
    }

    pub fn descriptor(&self, name: &str) -> MapResult<Arc<FunctionDescriptor>> {
        Ok(self.lookup(name)?.descriptor.clone())
    }

    /// Register a new native function. Fails if the name is taken.
    pub fn register(
        &self,
        descriptor: FunctionDescriptor,
        body: Arc<dyn FunctionBody>,
    ) -> MapResult<Arc<FunctionDescriptor>> {
        if self.contains(descriptor.name()) {
            return Err(MapError::new(ErrorKind::IllegalDescriptor)
                .with(ErrorKey::Function, descriptor.short_name())
                .with(ErrorKey::Message, "function already registered"));
        }
        let name = descriptor.name().to_string();
        self.insert(descriptor, FunctionImpl::Native(body));
        self.descriptor(&name)
    }

    /// Register or re-register a native function. Returns `true` if an
    /// earlier registration was replaced.
    pub fn replace(&self, descriptor: FunctionDescriptor, body: Arc<dyn FunctionBody>) -> bool {
        self.insert(descriptor, FunctionImpl::Native(body))
    }

    /// Register (or re-register) a custom function whose body is `body`.
    ///
    /// The function takes `param1..paramN`, where N is the highest
    /// `map:paramK` index used in the body.
    pub fn register_composite(&self, iri: &str, body: &Call) -> MapResult<Arc<FunctionDescriptor>> {
        let name = canonical_name(iri);
        let malformed = |message: &str| {
            MapError::new(ErrorKind::CustomFunctionMalformed)
                .with(ErrorKey::Function, short_name(&name))
                .with(ErrorKey::Message, message)
        };
        if body.function().is_target() {
            return Err(malformed("body must not be a target function"));
        }
        if let Ok(existing) = self.lookup(&name) {
            if matches!(existing.implementation, FunctionImpl::Native(_)) {
                return Err(malformed("would shadow a native function"));
            }
        }

        let params = (1..=body.max_param_index())
            .map(|i| ArgDescriptor::new(format!("param{i}")))
            .collect();
        let descriptor = FunctionDescriptor::new(name.clone(), body.function().return_type(), params)?
            .with_comment(format!("custom function over {body}"));
        self.insert(descriptor, FunctionImpl::Composite(body.clone()));
        tracing::debug!(function = %short_name(&name), "registered custom function");
        self.descriptor(&name)
    }

    /// A fresh builder for a call to `name`.
    pub fn builder(&self, name: &str) -> MapResult<CallBuilder> {
        Ok(CallBuilder::new(self.descriptor(name)?))
    }

    /// All descriptors, sorted by name.
    pub fn descriptors(&self) -> Vec<Arc<FunctionDescriptor>> {
        let mut out: Vec<Arc<FunctionDescriptor>> = self
            .entries
            .read()
            .values()
            .map(|e| e.descriptor.clone())
            .collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }

    /// Function declarations and the mapping vocabulary classes as facts.
    pub fn to_library_graph(&self) -> Graph {
        let mut g = Graph::new();
        for class in [
            vocab::MAP_CONTEXT,
            vocab::MAP_PROPERTY_BRIDGE,
            vocab::MAP_FUNCTION,
            vocab::MAP_CUSTOM_FUNCTION,
        ] {
            g.insert(Triple::typed(Term::iri(class), Term::iri(vocab::OWL_CLASS)));
        }
        g.add(
            Term::iri(vocab::MAP_CUSTOM_FUNCTION),
            vocab::RDFS_SUBCLASS_OF,
            Term::iri(vocab::MAP_FUNCTION),
        );
        for descriptor in self.descriptors() {
            let f = Term::iri(descriptor.name());
            g.insert(Triple::typed(f.clone(), Term::iri(vocab::MAP_FUNCTION)));
            if let Some(comment) = descriptor.comment() {
                g.add(f, vocab::RDFS_COMMENT, Term::literal(comment));
            }
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::builtin;
    use crate::function::ArgValues;

    #[test]
    fn builtins_are_registered() -> MapResult<()> {
        let reg = FunctionRegistry::with_builtins();
        assert!(reg.contains("concat"));
        assert!(reg.descriptor("fn:self")?.is_target());
        assert!(reg.descriptor(builtin::NOT)?.is_boolean());
        assert_eq!(
            reg.lookup("nope").err().map(|e| e.kind()),
            Some(ErrorKind::FunctionNotFound)
        );
        let names: Vec<String> = reg.descriptors().iter().map(|d| d.name().to_string()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        Ok(())
    }

    #[test]
    fn register_then_replace() -> MapResult<()> {
        let reg = FunctionRegistry::new();
        let descriptor = || {
            FunctionDescriptor::new("http://ex.org/twice", vocab::XSD_STRING, vec![ArgDescriptor::new("arg1")])
        };
        let twice = |args: &ArgValues| -> MapResult<Option<Term>> {
            let v = args.require("arg1")?.lexical();
            Ok(Some(Term::literal(format!("{v}{v}"))))
        };
        reg.register(descriptor()?, Arc::new(twice))?;
        assert_eq!(
            reg.register(descriptor()?, Arc::new(twice)).err().map(|e| e.kind()),
            Some(ErrorKind::IllegalDescriptor)
        );
        assert!(reg.replace(descriptor()?, Arc::new(twice)));
        assert_eq!(reg.len(), 1);
        Ok(())
    }

    #[test]
    fn composite_takes_params_from_body() -> MapResult<()> {
        let reg = FunctionRegistry::with_builtins();
        let body = reg.builder("concat")?;
        body.add("arg1", &vocab::param(1))?.add("arg1", &vocab::param(2))?;
        let body = body.build()?;

        let d = reg.register_composite("http://ex.org/fullName", &body)?;
        let names: Vec<&str> = d.args().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["param1", "param2"]);
        assert!(matches!(
            reg.lookup("http://ex.org/fullName")?.implementation,
            FunctionImpl::Composite(_)
        ));

        // Re-registration replaces the composite; shadowing a native function does not.
        reg.register_composite("http://ex.org/fullName", &body)?;
        assert_eq!(
            reg.register_composite("concat", &body).err().map(|e| e.kind()),
            Some(ErrorKind::CustomFunctionMalformed)
        );
        let target = reg.builder("self")?.build()?;
        assert_eq!(
            reg.register_composite("http://ex.org/t", &target).err().map(|e| e.kind()),
            Some(ErrorKind::CustomFunctionMalformed)
        );
        Ok(())
    }

    #[test]
    fn forks_do_not_share_later_registrations() -> MapResult<()> {
        let reg = FunctionRegistry::with_builtins();
        let upper = reg.builder("toUpperCase")?;
        upper.add("arg1", &vocab::param(1))?;
        let lower = reg.builder("toLowerCase")?;
        lower.add("arg1", &vocab::param(1))?;

        let fork = reg.fork();
        assert_eq!(fork.len(), reg.len());
        fork.register_composite("http://ex.org/fn#f", &upper.build()?)?;
        assert!(!reg.contains("http://ex.org/fn#f"));

        reg.register_composite("http://ex.org/fn#f", &lower.build()?)?;
        let entry = fork.lookup("http://ex.org/fn#f")?;
        let FunctionImpl::Composite(body) = &entry.implementation else {
            panic!("expected a composite");
        };
        assert_eq!(body.function().short_name(), "toUpperCase");
        Ok(())
    }

    #[test]
    fn library_graph_declares_functions() {
        use ontomap_graph::GraphRead;
        let reg = FunctionRegistry::with_builtins();
        let g = reg.to_library_graph();
        let declared = g.subjects(vocab::RDF_TYPE, &Term::iri(vocab::MAP_FUNCTION));
        assert_eq!(declared.len(), reg.len());
        assert!(g.contains(&Triple::typed(
            Term::iri(vocab::MAP_CONTEXT),
            Term::iri(vocab::OWL_CLASS)
        )));
    }
}

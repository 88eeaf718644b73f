//! Function registry and the process-wide `wrap` state.
//!
//! The registry maps free-function names to native implementations and
//! remembers which of them were *wrapped*: wrapped functions are recorded
//! as opaque `call_function` nodes during tracing even when every argument
//! is a plain value, and are never traced through.
//!
//! The process-wide registry is explicit global state: it is initialized
//! on first registration, never torn down, and snapshotted into each
//! [`Tracer`](crate::Tracer) at construction so tests can substitute a
//! private registry instead of reading it ambiently.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use parking_lot::Mutex;
use weft_value::NativeFn;

/// Named free functions callable from traced and generated code.
#[derive(Debug, Clone)]
pub struct Registry {
    fns: HashMap<String, NativeFn>,
    wrapped: HashSet<String>,
}

impl Registry {
    /// A registry preloaded with the builtin operator table; nothing is
    /// wrapped.
    pub fn new() -> Self {
        let fns = weft_value::ops::builtins()
            .iter()
            .map(|(name, f)| ((*name).to_owned(), *f))
            .collect();
        Self { fns, wrapped: HashSet::new() }
    }

    /// A registry with no functions at all, not even the builtins.
    pub fn empty() -> Self {
        Self { fns: HashMap::new(), wrapped: HashSet::new() }
    }

    /// Register a plain native function. During tracing it executes
    /// immediately when all arguments are concrete.
    pub fn register(&mut self, name: &str, f: NativeFn) {
        self.fns.insert(name.to_owned(), f);
    }

    /// Register a function as an opaque call target: subsequent traces
    /// record calls to it instead of executing them.
    pub fn wrap(&mut self, name: &str, f: NativeFn) {
        self.fns.insert(name.to_owned(), f);
        self.wrapped.insert(name.to_owned());
    }

    /// Mark an already-registered name (builtins included) as wrapped.
    pub fn wrap_existing(&mut self, name: &str) -> bool {
        if self.fns.contains_key(name) {
            self.wrapped.insert(name.to_owned());
            true
        } else {
            false
        }
    }

    pub fn is_wrapped(&self, name: &str) -> bool {
        self.wrapped.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.fns.get(name).copied()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<Mutex<Registry>> = OnceLock::new();

fn global() -> &'static Mutex<Registry> {
    GLOBAL.get_or_init(|| Mutex::new(Registry::new()))
}

/// Register `name` as an opaque call target in the process-wide registry.
///
/// Effective for traces whose tracer is constructed afterwards; the
/// registration lives for the rest of the process.
pub fn wrap(name: &str, f: NativeFn) {
    tracing::debug!(name, "wrap registered");
    global().lock().wrap(name, f);
}

/// Register a plain native function in the process-wide registry.
pub fn register(name: &str, f: NativeFn) {
    global().lock().register(name, f);
}

/// Clone of the current process-wide registry.
pub fn global_snapshot() -> Registry {
    global().lock().clone()
}

/// Resolve a name against the process-wide registry.
pub(crate) fn global_get(name: &str) -> Option<NativeFn> {
    global().lock().get(name)
}

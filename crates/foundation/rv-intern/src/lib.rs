//! String interning for identifiers

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;
use std::fmt;
use std::sync::Arc;

/// Thread-safe string interner shared by the syntax tree and the semantic model
#[derive(Clone)]
pub struct Interner {
    inner: Arc<ThreadedRodeo>,
}

impl Interner {
    /// Creates an empty interner
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ThreadedRodeo::new()),
        }
    }

    /// Interns `text`, returning its symbol
    pub fn intern(&self, text: &str) -> Symbol {
        self.inner.get_or_intern(text)
    }

    /// The text behind `sym`
    pub fn resolve(&self, sym: &Symbol) -> &str {
        self.inner.resolve(sym)
    }

    /// The text behind `sym`, or `None` if it came from another interner
    pub fn try_resolve(&self, sym: &Symbol) -> Option<&str> {
        self.inner.try_resolve(sym)
    }

    /// Looks up `text` without interning it
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.inner.get(text)
    }

    /// Whether `sym` spells `text`
    pub fn is(&self, sym: Symbol, text: &str) -> bool {
        self.get(text) == Some(sym)
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Interner")
            .field("symbols", &self.inner.len())
            .finish()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_shared_across_clones() {
        let interner = Interner::new();
        let copy = interner.clone();
        let sym = interner.intern("init");
        assert_eq!(copy.intern("init"), sym);
        assert_eq!(copy.resolve(&sym), "init");
        assert!(interner.is(sym, "init"));
        assert!(!interner.is(sym, "main"));
        assert_eq!(interner.get("absent"), None);
    }
}

//! Lexical scope chain: symbol resolution and import memoization.
//!
//! Grounded on `spec.md` §4.8/§9: "model as an immutable stack with
//! shared-ownership links to the parent frame; each frame owns its symbol
//! map exclusively. Writes only touch the top frame." The teacher's
//! namespace indirection (`namespace.rs`'s `NamespaceId` pointing into a
//! central arena rather than raw references) motivates the same choice here
//! for generators: a `Scope` holds `GeneratorId`s, never `Generator`s.

use std::{
    cell::RefCell,
    collections::HashSet,
    path::{Path, PathBuf},
    rc::Rc,
};

use indexmap::IndexMap;

use crate::generator::GeneratorId;

/// What a symbol name is bound to.
///
/// Only entity bindings exist today; the original interpreter notes this is
/// "currently the only type of value in the symbol table, but we may support
/// other types in the future" (see `original_source/interpreter/interpreter.go`).
#[derive(Debug, Clone, Copy)]
pub enum Binding {
    Entity(GeneratorId),
}

#[derive(Debug, Clone)]
pub struct ScopeEntry {
    pub type_tag: &'static str,
    pub binding: Binding,
}

struct Frame {
    parent: Option<Scope>,
    symbols: RefCell<IndexMap<String, ScopeEntry>>,
    /// `Some` only on the root frame: the set of absolute paths already
    /// imported, shared by every descendant scope.
    imports: Option<RefCell<HashSet<PathBuf>>>,
}

/// A node in the lexical scope chain.
///
/// Cheaply cloned (`Rc` handle); cloning a `Scope` does not copy its symbol
/// table, it shares it.
#[derive(Clone)]
pub struct Scope(Rc<Frame>);

impl Scope {
    /// Creates a fresh root scope with an empty import set.
    #[must_use]
    pub fn root() -> Self {
        Self(Rc::new(Frame {
            parent: None,
            symbols: RefCell::new(IndexMap::new()),
            imports: Some(RefCell::new(HashSet::new())),
        }))
    }

    /// Pushes a new frame whose parent is `self`. Entities declared in the
    /// new frame never leak into `self`.
    #[must_use]
    pub fn push_child(&self) -> Self {
        Self(Rc::new(Frame {
            parent: Some(self.clone()),
            symbols: RefCell::new(IndexMap::new()),
            imports: None,
        }))
    }

    /// Writes to the current frame, shadowing any parent binding of the same name.
    pub fn set_symbol(&self, name: impl Into<String>, entry: ScopeEntry) {
        self.0.symbols.borrow_mut().insert(name.into(), entry);
    }

    /// Walks the chain toward the root, returning the first hit.
    pub fn resolve_symbol(&self, name: &str) -> Option<ScopeEntry> {
        let mut frame = &self.0;
        loop {
            if let Some(entry) = frame.symbols.borrow().get(name) {
                return Some(entry.clone());
            }
            match &frame.parent {
                Some(parent) => frame = &parent.0,
                None => return None,
            }
        }
    }

    fn root_frame(&self) -> &Frame {
        let mut frame = &self.0;
        while let Some(parent) = &frame.parent {
            frame = &parent.0;
        }
        frame
    }

    /// Whether `path` (already resolved to absolute) has been imported.
    pub fn has_seen(&self, path: &Path) -> bool {
        self.root_frame()
            .imports
            .as_ref()
            .expect("root frame always carries an import set")
            .borrow()
            .contains(path)
    }

    /// Marks `path` as imported. Called before walking the imported file's
    /// AST so a self-import is a no-op on the inner pass.
    pub fn mark_seen(&self, path: PathBuf) {
        self.root_frame()
            .imports
            .as_ref()
            .expect("root frame always carries an import set")
            .borrow_mut()
            .insert(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorId;

    fn entry(id: u32) -> ScopeEntry {
        ScopeEntry { type_tag: "entity", binding: Binding::Entity(GeneratorId::new(id)) }
    }

    #[test]
    fn resolves_from_descendant_scope() {
        let root = Scope::root();
        root.set_symbol("Person", entry(0));
        let child = root.push_child().push_child();
        assert!(matches!(
            child.resolve_symbol("Person").unwrap().binding,
            Binding::Entity(id) if id == GeneratorId::new(0)
        ));
    }

    #[test]
    fn child_writes_do_not_leak_into_parent() {
        let root = Scope::root();
        let child = root.push_child();
        child.set_symbol("Local", entry(1));
        assert!(root.resolve_symbol("Local").is_none());
    }

    #[test]
    fn shadowing_prefers_the_nearest_frame() {
        let root = Scope::root();
        root.set_symbol("X", entry(0));
        let child = root.push_child();
        child.set_symbol("X", entry(1));
        assert!(matches!(
            child.resolve_symbol("X").unwrap().binding,
            Binding::Entity(id) if id == GeneratorId::new(1)
        ));
        assert!(matches!(
            root.resolve_symbol("X").unwrap().binding,
            Binding::Entity(id) if id == GeneratorId::new(0)
        ));
    }

    #[test]
    fn import_tracking_is_shared_from_any_descendant() {
        let root = Scope::root();
        let child = root.push_child();
        let path = PathBuf::from("/tmp/a.lang");
        assert!(!child.has_seen(&path));
        child.mark_seen(path.clone());
        assert!(root.has_seen(&path));
    }
}

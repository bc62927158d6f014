//! The AST (C5): an arena of typed nodes built by lowering the parse-tree
//! engine's [`crate::parse::ParseGroup`] output, plus the validations that
//! turn a syntactically valid file into a semantically checked one (§4.5).
//!
//! Nodes are held in a flat `Vec`-backed arena addressed by [`NodeId`]
//! rather than owned recursively: a node's parent and children are id
//! lookups, so a document can be walked, mutated in place (e.g. by a code
//! action), and handed to the LSP's document store without fighting the
//! borrow checker over a tree of owned boxes (§9 "model the AST as an
//! arena with typed node ids").

pub mod context;
mod docs;
mod grammar;
mod lower;
mod nodes;
mod symbols;
mod validate;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub use context::{Scope, ValueTypeCtx};
pub use grammar::ACCESSIBILITY_PROPS;
pub use nodes::{ExprKind, LiteralRaw, NodePayload};
pub use symbols::{DocumentSymbol, SymbolKind};

use crate::diagnostics::DiagnosticBag;
use crate::idr::{IdrCache, IdrContext};
use crate::token::{tokenize, Span};

/// A handle into a [`Document`]'s arena. Cheap to copy, cheap to hash;
/// stable for the lifetime of the `Document` it was produced by (a new
/// parse produces a new arena and new ids — there is no incremental reuse,
/// per the Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

struct ArenaNode {
    payload: NodePayload,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    span: Span,
}

/// The `Vec`-backed node store. Never exposed directly outside this module;
/// all access goes through [`Document`]'s accessor methods.
#[derive(Default)]
struct Arena {
    nodes: Vec<ArenaNode>,
}

impl Arena {
    fn push(&mut self, parent: Option<NodeId>, payload: NodePayload, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ArenaNode {
            payload,
            parent,
            children: Vec::new(),
            span,
        });
        if let Some(p) = parent {
            self.nodes[p.0 as usize].children.push(id);
        }
        id
    }

    fn get(&self, id: NodeId) -> &ArenaNode {
        &self.nodes[id.0 as usize]
    }

    /// Moves `id` from its current parent's child list to `new_parent`'s.
    /// Used to build postfix expression chains (`a.b as T`), where the base
    /// expression is lowered before its wrapping `Lookup`/`Cast` node exists.
    fn reparent(&mut self, id: NodeId, new_parent: NodeId) {
        if let Some(old) = self.nodes[id.0 as usize].parent {
            self.nodes[old.0 as usize].children.retain(|&c| c != id);
        }
        self.nodes[new_parent.0 as usize].children.push(id);
        self.nodes[id.0 as usize].parent = Some(new_parent);
    }
}

/// A compiled source file: its text, the arena of AST nodes lowered from
/// the parse tree, the set of namespaces it imported, and every diagnostic
/// collected along the way. Built once per call to [`Document::compile`];
/// there is no incremental reparse (Non-goals).
pub struct Document {
    source: String,
    arena: Arena,
    root: Option<NodeId>,
    idr: IdrContext,
    template: Option<NodeId>,
    /// Document-wide id -> node map (validation 1), shared out to `Scope`
    /// values so expression lookups don't need to walk the arena.
    ids: Rc<HashMap<String, NodeId>>,
    /// Each `ListItemFactory` node's own scope (its non-inherited id
    /// namespace plus its `item` binding), keyed by that node's id. Looked
    /// up by walking a node's ancestors in [`Document::scope_for`].
    factory_scopes: HashMap<NodeId, Scope>,
    pub diagnostics: DiagnosticBag,
    /// Per-`(NodeId, slot)` memoization for the validator/docs/context
    /// tables (§9's static-dispatch redesign), keyed by the slot's name so
    /// distinct queries on the same node don't collide.
    memo: RefCell<HashMap<(NodeId, &'static str), ()>>,
}

impl Document {
    /// Tokenizes, parses, lowers, and validates `source` in one pass.
    /// `idr` is shared (via `Rc`) with every other document compiled in the
    /// same session so `.gir` files are parsed at most once.
    pub fn compile(source: &str, idr: Rc<IdrCache>) -> Document {
        tracing::info!(bytes = source.len(), "compiling document");

        let (tokens, lex_errors) = tokenize(source);
        tracing::trace!(count = tokens.len(), "tokenized");
        let cursor = crate::parse::Cursor::new(&tokens, source);
        let (group, parse_diagnostics) = cursor.run(grammar::ui_grammar().as_ref());

        let mut doc = Document {
            source: source.to_string(),
            arena: Arena::default(),
            root: None,
            idr: IdrContext::new(idr),
            template: None,
            ids: Rc::new(HashMap::new()),
            factory_scopes: HashMap::new(),
            diagnostics: DiagnosticBag::new(),
            memo: RefCell::new(HashMap::new()),
        };

        for e in lex_errors {
            tracing::warn!(message = %e.message, "lex error");
            doc.diagnostics.push(crate::diagnostics::Diagnostic::of_kind(
                crate::diagnostics::DiagnosticKind::Lex,
                e.message,
                e.span,
            ));
        }
        for d in parse_diagnostics {
            tracing::warn!(message = %d.message, "recoverable parse error");
            doc.diagnostics.push(d);
        }

        if let Some(group) = group {
            let root = lower::lower_document(&mut doc, &group);
            doc.root = Some(root);
            validate::run(&mut doc);
        }

        for d in &doc.diagnostics.diagnostics {
            if d.kind == crate::diagnostics::DiagnosticKind::InternalInvariant {
                tracing::error!(message = %d.message, "internal invariant violated");
            }
        }

        tracing::info!(errors = doc.diagnostics.has_errors(), "compile finished");
        doc
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn template(&self) -> Option<NodeId> {
        self.template
    }

    /// The namespaces this document has imported, for completion and
    /// hover queries that need to know what's in scope.
    pub fn idr(&self) -> &IdrContext {
        &self.idr
    }

    pub fn payload(&self, id: NodeId) -> &NodePayload {
        &self.arena.get(id).payload
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.arena.get(id).span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.arena.get(id).children
    }

    /// Id lookup scoped to this document's top level (validation 1's map).
    pub fn lookup_id(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    pub fn document_scope(&self) -> Scope {
        Scope::Document { ids: self.ids.clone() }
    }

    /// The scope visible to expressions at `id`: the nearest enclosing
    /// `ListItemFactory`'s own scope, or the document scope if `id` isn't
    /// nested inside one (§9 "computed by walking toward the root").
    pub fn scope_for(&self, id: NodeId) -> Scope {
        let mut current = Some(id);
        while let Some(node) = current {
            if matches!(self.payload(node), NodePayload::ListItemFactory { .. }) {
                if let Some(scope) = self.factory_scopes.get(&node) {
                    return scope.clone();
                }
            }
            current = self.parent(node);
        }
        self.document_scope()
    }

    /// Finds the innermost node whose span contains `offset`, for
    /// hover/completion/go-to-definition (§4.5's position-based services).
    pub fn node_at(&self, offset: usize) -> Option<NodeId> {
        let root = self.root?;
        let mut best = root;
        loop {
            let next = self
                .children(best)
                .iter()
                .find(|c| self.span(**c).contains_index(offset));
            match next {
                Some(c) => best = *c,
                None => return Some(best),
            }
        }
    }

    pub fn document_symbols(&self) -> Vec<DocumentSymbol> {
        symbols::document_symbols(self)
    }

    pub fn hover_text(&self, id: NodeId) -> Option<String> {
        docs::hover_text(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::testutil::gtk_cache;

    #[test]
    fn compiles_minimal_document_without_errors() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nBox {\n  orientation: vertical;\n}", cache);
        assert!(!doc.diagnostics.has_errors(), "{:?}", doc.diagnostics.diagnostics);
        assert!(doc.root().is_some());
        assert!(doc.template().is_none());
    }

    #[test]
    fn template_sets_template_node_and_is_lookup_able_by_id() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(
            "using Gtk 4.0;\ntemplate MyBox : Gtk.Box {\n  spacing: 4;\n}",
            cache,
        );
        assert!(!doc.diagnostics.has_errors(), "{:?}", doc.diagnostics.diagnostics);
        assert!(doc.template().is_some());
    }

    #[test]
    fn instantiating_an_abstract_class_is_an_error() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nGtk.Widget {}", cache);
        assert!(doc.diagnostics.has_errors());
        assert!(doc
            .diagnostics
            .diagnostics
            .iter()
            .any(|d| d.message.contains("abstract")));
    }

    #[test]
    fn instantiating_a_concrete_subclass_of_an_abstract_class_is_fine() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nBox {}", cache);
        assert!(!doc.diagnostics.has_errors(), "{:?}", doc.diagnostics.diagnostics);
    }

    #[test]
    fn duplicate_top_level_ids_are_flagged() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(
            "using Gtk 4.0;\ntemplate Foo : Gtk.Box {\n  Button go1 {}\n  Button go1 {}\n}",
            cache,
        );
        assert!(doc
            .diagnostics
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::DuplicateDefinition));
    }

    #[test]
    fn unknown_property_gets_a_did_you_mean_hint() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nBox {\n  spacng: 4;\n}", cache);
        let d = doc
            .diagnostics
            .diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::UnresolvedReference)
            .expect("unresolved reference diagnostic");
        assert!(d.hints.iter().any(|h| h.contains("spacing")));
    }

    #[test]
    fn deprecated_property_use_is_a_warning_not_an_error() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nBox {\n  old-spacing: 2;\n}", cache);
        assert!(!doc.diagnostics.has_errors(), "{:?}", doc.diagnostics.diagnostics);
        assert!(doc
            .diagnostics
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Deprecated));
    }

    #[test]
    fn node_at_finds_the_innermost_enclosing_node() {
        let (cache, _guard) = gtk_cache();
        let src = "using Gtk 4.0;\nBox {\n  orientation: vertical;\n}";
        let doc = Document::compile(src, cache);
        let offset = src.find("vertical").unwrap();
        let id = doc.node_at(offset).expect("node at offset");
        assert!(doc.span(id).contains_index(offset));
    }

    #[test]
    fn unresolved_signal_handler_falls_back_to_unresolved_reference() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(
            "using Gtk 4.0;\nBox {\n  not_a_signal => on_click();\n}",
            cache,
        );
        assert!(doc
            .diagnostics
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnresolvedReference));
    }
}

//! Document outline (§4.5's "outline/breadcrumbs" editor service): a tree of
//! named nodes mirroring the AST but pruned to the handful of kinds worth
//! showing in an editor's outline view.

use crate::token::Span;

use super::{Document, NodeId, NodePayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Template,
    Object,
    Property,
    Signal,
}

#[derive(Debug, Clone)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
    pub children: Vec<DocumentSymbol>,
}

pub fn document_symbols(doc: &Document) -> Vec<DocumentSymbol> {
    let Some(root) = doc.root() else { return Vec::new() };
    doc.children(root)
        .iter()
        .filter_map(|&id| symbol_for(doc, id))
        .collect()
}

fn symbol_for(doc: &Document, id: NodeId) -> Option<DocumentSymbol> {
    let (name, kind) = match doc.payload(id) {
        NodePayload::Template { name, .. } => (name.clone(), SymbolKind::Template),
        NodePayload::Object { class, id: object_id, .. } => {
            (object_id.clone().unwrap_or_else(|| class.name()), SymbolKind::Object)
        }
        NodePayload::Property { name } => (name.clone(), SymbolKind::Property),
        NodePayload::Signal { name, .. } => (name.clone(), SymbolKind::Signal),
        NodePayload::ListItemFactory { item_type } => (item_type.name(), SymbolKind::Template),
        _ => return None,
    };
    let children = doc
        .children(id)
        .iter()
        .flat_map(|&c| object_content_symbols(doc, c))
        .collect();
    Some(DocumentSymbol { name, kind, span: doc.span(id), children })
}

/// A `Template`/`Object`'s direct child is its `ObjectContent` wrapper,
/// which is itself not shown in the outline; its children surface instead.
fn object_content_symbols(doc: &Document, content_id: NodeId) -> Vec<DocumentSymbol> {
    match doc.payload(content_id) {
        NodePayload::ObjectContent => doc
            .children(content_id)
            .iter()
            .filter_map(|&id| symbol_for(doc, id))
            .collect(),
        _ => Vec::new(),
    }
}

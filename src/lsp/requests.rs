//! The request handlers named in §4.9/§6: hover, definition, code actions,
//! and the custom compile request. Each is a plain function over a
//! [`Document`] and the already-open text, returning data the transport
//! layer (`blu-lsp`) converts into `lsp_types` responses.

use crate::ast::Document;
use crate::token::Span;

use super::{position, Position, Range, TextEdit};

/// Hover text at `pos`, sourced from the innermost AST node's docs provider.
pub fn hover(doc: &Document, text: &str, pos: Position) -> Option<String> {
    let offset = super::byte_offset(text, pos);
    let node = doc.node_at(offset)?;
    doc.hover_text(node)
}

/// Go-to-definition for an in-document identifier (an object id referenced
/// from a `ValueIdentFlag` or an expression `IdentLiteral`). Cross-file
/// definitions (introspected classes/properties) have no source location to
/// jump to, so they are not handled here.
pub fn definition(doc: &Document, text: &str, pos: Position) -> Option<Range> {
    let offset = super::byte_offset(text, pos);
    let node = doc.node_at(offset)?;
    let name = match doc.payload(node) {
        crate::ast::NodePayload::ValueIdentFlag { name } => name.clone(),
        crate::ast::NodePayload::Expr(crate::ast::ExprKind::IdentLiteral(name)) => name.clone(),
        _ => return None,
    };
    let target = doc.scope_for(node).lookup(&name)?;
    Some(span_to_range(text, doc.span(target)))
}

/// One applicable code action: a human-facing title plus the edit it makes.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeActionResult {
    pub title: String,
    pub edit: TextEdit,
}

/// Code actions collected from diagnostics whose span overlaps `query`
/// (§4.9: "collected from diagnostics whose range overlaps the request range").
pub fn code_actions(doc: &Document, text: &str, query: Range) -> Vec<CodeActionResult> {
    let query_span = Span::new(super::byte_offset(text, query.start), super::byte_offset(text, query.end));
    let mut out = Vec::new();
    for d in &doc.diagnostics.diagnostics {
        if !d.span.overlaps(query_span) {
            continue;
        }
        for action in &d.actions {
            let span = action.span.unwrap_or(d.span);
            out.push(CodeActionResult {
                title: action.title.clone(),
                edit: TextEdit { range: span_to_range(text, span), new_text: action.replace_with.clone() },
            });
        }
    }
    out
}

/// `textDocument/x-blueprint-compile`: emits XML, or `Err` with the
/// document's current diagnostics when compilation would fail.
pub fn compile(doc: &Document) -> Result<String, ()> {
    crate::xml::emit(doc).map_err(|_| ())
}

pub(super) fn span_to_range(text: &str, span: Span) -> Range {
    Range {
        start: position(text, span.start()),
        end: position(text, span.end()),
    }
}

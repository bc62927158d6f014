//! Semantic tokens (§6): exactly one token type, `enumMember`, full-document
//! only — the compiler does not attempt to classify every token kind, only
//! to flag bare identifiers resolved against an enumeration or bitfield
//! member so the editor can color them distinctly from plain strings.

use crate::ast::{Document, NodeId, NodePayload};
use crate::token::Span;
use crate::types::Type;

pub const SEMANTIC_TOKEN_TYPES: &[&str] = &["enumMember"];

/// One delta-encoded token, ready for the LSP wire format: `delta_line` and
/// `delta_start` are relative to the previous token (or to `(0, 0)` for the
/// first), per the full-document semantic tokens encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticToken {
    pub delta_line: u32,
    pub delta_start: u32,
    pub length: u32,
    pub token_type: u32,
}

pub fn semantic_tokens(doc: &Document, text: &str) -> Vec<SemanticToken> {
    let Some(root) = doc.root() else { return Vec::new() };
    let mut spans = Vec::new();
    collect(doc, root, &mut spans);
    spans.sort_by_key(|s| s.start());

    let idx = super::LineIndex::new(text);
    let mut out = Vec::with_capacity(spans.len());
    let mut prev_line = 0u32;
    let mut prev_start = 0u32;
    for span in spans {
        let pos = idx.position(text, span.start());
        let length = idx.utf16_len(text, span.start(), span.end());
        if length == 0 {
            continue;
        }
        let delta_line = pos.line - prev_line;
        let delta_start = if delta_line == 0 { pos.character - prev_start } else { pos.character };
        out.push(SemanticToken { delta_line, delta_start, length, token_type: 0 });
        prev_line = pos.line;
        prev_start = pos.character;
    }
    out
}

fn collect(doc: &Document, id: NodeId, out: &mut Vec<Span>) {
    if let NodePayload::Property { name } = doc.payload(id) {
        if let Some(class) = enclosing_class(doc, id) {
            if let Some(p) = class.property(name) {
                if let Some(&value) = doc.children(id).first() {
                    mark_enum_member(doc, &p.type_, value, out);
                }
            }
        }
    }
    for &child in doc.children(id) {
        collect(doc, child, out);
    }
}

fn mark_enum_member(doc: &Document, expected: &Type, id: NodeId, out: &mut Vec<Span>) {
    if let NodePayload::ValueIdentFlag { name } = doc.payload(id) {
        let is_enum_like = matches!(expected, Type::Enumeration(_) | Type::Bitfield(_));
        if is_enum_like && name != "true" && name != "false" {
            out.push(doc.span(id));
        }
    }
}

fn enclosing_class(doc: &Document, prop_id: NodeId) -> Option<Type> {
    let content_id = doc.parent(prop_id)?;
    let obj_id = doc.parent(content_id)?;
    match doc.payload(obj_id) {
        NodePayload::Object { class, .. } => Some(class.clone()),
        NodePayload::ListItemFactory { item_type } => Some(item_type.clone()),
        _ => None,
    }
}

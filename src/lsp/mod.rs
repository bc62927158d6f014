//! The LSP surface (C9): a document store, request handlers, and range
//! arithmetic, implemented as plain Rust types independent of any specific
//! RPC transport. `src/bin/blu-lsp.rs` is the thin adapter that wires these
//! to `tower_lsp`'s `LspService`/`Server` over stdio — the transport layer
//! the scope section treats as an external collaborator.

pub mod position;
mod requests;
mod semantic_tokens;

use std::rc::Rc;

use dashmap::DashMap;

use crate::ast::Document;
use crate::idr::IdrCache;

pub use position::{byte_offset, position, LineIndex, Position};
pub use requests::{code_actions, compile, definition, hover, CodeActionResult};
pub use semantic_tokens::{semantic_tokens, SemanticToken, SEMANTIC_TOKEN_TYPES};

/// A half-open range in LSP position units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// One content-change event (§4.9): `range: None` is a full-document
/// replace; `Some` is an incremental edit applied at that half-open range.
pub struct Change {
    pub range: Option<Range>,
    pub text: String,
}

/// A text replacement, used both for incremental sync and for code-action
/// edits handed back to the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

/// One open document: its current text and the [`Document`] rebuilt from it
/// on every open/change. There is no incremental reparse (Non-goals) — the
/// incrementality named in §6 is in the *text sync protocol*, not the
/// compiler, which always reparses the whole resulting text.
pub struct OpenFile {
    text: String,
    pub version: i32,
    pub doc: Document,
}

impl OpenFile {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `uri -> OpenFile`, mutated without locks (§5: single-threaded LSP loop,
/// no request concurrency). `DashMap` is used for its shared-reference
/// entry API rather than for genuine concurrent access.
pub struct DocumentStore {
    idr: Rc<IdrCache>,
    files: DashMap<String, OpenFile>,
}

impl DocumentStore {
    pub fn new(idr: Rc<IdrCache>) -> Self {
        DocumentStore { idr, files: DashMap::new() }
    }

    pub fn open(&self, uri: impl Into<String>, text: String, version: i32) {
        let doc = Document::compile(&text, self.idr.clone());
        self.files.insert(uri.into(), OpenFile { text, version, doc });
    }

    /// Applies content changes in event order, converting each range to
    /// byte indices against the text as it stood *before* that change, then
    /// rebuilds the document once from the final text (§4.9).
    pub fn change(&self, uri: &str, changes: Vec<Change>, version: i32) {
        let Some(mut entry) = self.files.get_mut(uri) else { return };
        let mut text = entry.text.clone();
        for change in changes {
            text = match change.range {
                None => change.text,
                Some(range) => {
                    let start = byte_offset(&text, range.start);
                    let end = byte_offset(&text, range.end);
                    let mut next = String::with_capacity(text.len() - (end - start) + change.text.len());
                    next.push_str(&text[..start]);
                    next.push_str(&change.text);
                    next.push_str(&text[end..]);
                    next
                }
            };
        }
        let doc = Document::compile(&text, self.idr.clone());
        entry.text = text;
        entry.version = version;
        entry.doc = doc;
    }

    pub fn close(&self, uri: &str) {
        self.files.remove(uri);
    }

    pub fn get(&self, uri: &str) -> Option<dashmap::mapref::one::Ref<'_, String, OpenFile>> {
        self.files.get(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;

    fn store() -> DocumentStore {
        DocumentStore::new(Rc::new(IdrCache::new(SearchConfig::default())))
    }

    #[test]
    fn open_then_full_replace_reparses() {
        let store = store();
        store.open("file:///a.blp", "using Gtk 4.0;".to_string(), 1);
        assert!(store.get("file:///a.blp").is_some());

        store.change(
            "file:///a.blp",
            vec![Change { range: None, text: "using Gtk 3.0;".to_string() }],
            2,
        );
        let file = store.get("file:///a.blp").unwrap();
        assert_eq!(file.version, 2);
        assert!(file.doc.diagnostics.has_errors());
    }

    #[test]
    fn incremental_edit_splices_at_byte_range() {
        let store = store();
        store.open("file:///a.blp", "using Gtk 4.0;\nusing Gtk 4.0;".to_string(), 1);
        // Replace the second line's "4.0" with "4.1".
        store.change(
            "file:///a.blp",
            vec![Change {
                range: Some(Range {
                    start: Position { line: 1, character: 10 },
                    end: Position { line: 1, character: 13 },
                }),
                text: "4.1".to_string(),
            }],
            2,
        );
        let file = store.get("file:///a.blp").unwrap();
        assert!(file.text().contains("4.1"));
    }

    #[test]
    fn close_drops_the_document() {
        let store = store();
        store.open("file:///a.blp", "using Gtk 4.0;".to_string(), 1);
        store.close("file:///a.blp");
        assert!(store.get("file:///a.blp").is_none());
    }
}

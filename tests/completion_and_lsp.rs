//! Completion robustness and the LSP document-store plumbing (§8: "every
//! byte offset" for completion/hover, plus incremental-sync correctness).

mod common;

use blu::ast::Document;
use blu::completion::complete;
use blu::idr::IdrCache;
use blu::lsp::{byte_offset, position, Change, DocumentStore};
use common::{gtk_cache, GTK_4_0_GIR};

/// Completion must never panic for any cursor position in a realistic
/// document, including inside tokens, at EOF, and on non-ASCII text.
#[test]
fn completion_never_panics_at_any_offset() {
    let (cache, _guard) = gtk_cache();
    let source = "using Gtk 4.0;\ntemplate Foo : Gtk.Box {\n  // caf\u{e9}\n  orient\n}\n";
    let doc = Document::compile(source, cache);
    for (offset, _) in source.char_indices().chain(std::iter::once((source.len(), ' '))) {
        let pos = position(source, offset);
        let _ = complete(&doc, source, pos);
    }
}

#[test]
fn byte_offset_and_position_round_trip_across_multibyte_lines() {
    let source = "using Gtk 4.0;\nGtk.Box {\n  name: \"caf\u{e9}\";\n}\n";
    for (offset, _) in source.char_indices() {
        let pos = position(source, offset);
        assert_eq!(byte_offset(source, pos), offset, "round trip failed at byte {offset}");
    }
}

#[test]
fn document_store_reparses_on_full_text_change() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = blu::config::SearchConfig::new();
    config.add_path(dir.path());
    std::fs::write(dir.path().join("Gtk-4.0.gir"), GTK_4_0_GIR).expect("write fixture");
    let store = DocumentStore::new(std::rc::Rc::new(IdrCache::new(config)));

    let uri = "file:///test.blp";
    store.open(uri, "using Gtk 4.0;\nGtk.Box {}\n".to_string(), 1);
    assert!(!store.get(uri).expect("open doc").doc.diagnostics.has_errors());

    store.change(
        uri,
        vec![Change { range: None, text: "using Gtk 4.0;\nGtk.Widget {}\n".to_string() }],
        2,
    );
    let entry = store.get(uri).expect("changed doc");
    assert!(entry.doc.diagnostics.has_errors(), "instantiating an abstract class should now be an error");
    assert_eq!(entry.version, 2);

    store.close(uri);
    assert!(store.get(uri).is_none());
}

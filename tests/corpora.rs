//! Round-trip and error-corpus properties (§8) over a small in-repo sample
//! set: every `VALID_SAMPLES` entry must compile without diagnostics and
//! emit well-formed XML; every `ERROR_SAMPLES` entry must fail with a
//! diagnostic matching one of its expected substrings.

mod common;

use blu::ast::Document;
use common::{gtk_cache, ERROR_SAMPLES, VALID_SAMPLES};

#[test]
fn valid_samples_compile_without_diagnostics() {
    for (name, source) in VALID_SAMPLES {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(source, cache);
        assert!(
            !doc.diagnostics.has_errors(),
            "sample `{name}` unexpectedly failed: {:?}",
            doc.diagnostics.diagnostics
        );
    }
}

#[test]
fn valid_samples_emit_well_formed_xml() {
    for (name, source) in VALID_SAMPLES {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(source, cache);
        let xml = blu::xml::emit(&doc).unwrap_or_else(|e| panic!("sample `{name}` failed to emit: {e}"));
        assert!(xml.contains("<interface"), "sample `{name}`: missing <interface> root: {xml}");
        assert_eq!(
            xml.matches('<').count(),
            xml.matches('>').count(),
            "sample `{name}`: unbalanced angle brackets in emitted XML"
        );
    }
}

#[test]
fn recompiling_the_same_source_is_deterministic() {
    for (name, source) in VALID_SAMPLES {
        let (cache, _guard) = gtk_cache();
        let first = blu::xml::emit(&Document::compile(source, cache.clone())).expect("emit");
        let second = blu::xml::emit(&Document::compile(source, cache)).expect("emit");
        assert_eq!(first, second, "sample `{name}`: two compiles of the same source diverged");
    }
}

#[test]
fn error_samples_fail_with_an_expected_diagnostic() {
    for (source, expected_substrings) in ERROR_SAMPLES {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(source, cache);
        assert!(doc.diagnostics.has_errors(), "expected `{source}` to fail to compile");
        let matched = doc
            .diagnostics
            .diagnostics
            .iter()
            .any(|d| expected_substrings.iter().any(|s| d.message.to_lowercase().contains(&s.to_lowercase())));
        assert!(
            matched,
            "none of {:?} matched any diagnostic message in {:?}",
            expected_substrings, doc.diagnostics.diagnostics
        );
    }
}

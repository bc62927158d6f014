//! The static completer table (§4.10 SUPPLEMENT: "replace the
//! decorator-with-side-effects model with an explicit static list").
//! Each entry is a plain value; [`super::complete`] is the only code that
//! iterates this table.

use std::collections::HashSet;

use crate::types::Type;

use super::{
    all_properties, all_signals, import_insertion_edit, AstKind, Completer, CompletionCtx,
    CompletionItem, CompletionKind, PatternElem,
};
use crate::ast::NodePayload;

pub const COMPLETERS: &[Completer] = &[
    Completer {
        name: "object-content.properties",
        applies_in: &[AstKind::ObjectContent],
        applies_in_subclass: None,
        matches: &[&[]],
        build: properties_in_object_content,
    },
    Completer {
        name: "object-content.signals",
        applies_in: &[AstKind::ObjectContent],
        applies_in_subclass: None,
        matches: &[&[]],
        build: signals_in_object_content,
    },
    Completer {
        name: "object-content.child-class",
        applies_in: &[AstKind::ObjectContent],
        applies_in_subclass: None,
        matches: &[&[]],
        build: class_name_items,
    },
    Completer {
        name: "object-content.accessibility-keyword",
        applies_in: &[AstKind::ObjectContent],
        applies_in_subclass: None,
        matches: &[&[]],
        build: accessibility_keyword,
    },
    Completer {
        name: "accessibility.prop-names",
        applies_in: &[AstKind::Accessibility],
        applies_in_subclass: None,
        matches: &[&[]],
        build: accessibility_prop_names,
    },
    Completer {
        name: "property.enum-member-value",
        applies_in: &[AstKind::Property],
        applies_in_subclass: None,
        matches: &[&[]],
        build: enum_member_in_property_value,
    },
    Completer {
        name: "ui.root-keywords",
        applies_in: &[AstKind::Ui],
        applies_in_subclass: None,
        matches: &[&[]],
        build: root_keywords,
    },
    Completer {
        name: "ui.root-object-class",
        applies_in: &[AstKind::Ui],
        applies_in_subclass: None,
        matches: &[&[]],
        build: class_name_items,
    },
    // A completer that only triggers right after the toolkit `using`, so
    // `translation-domain` is never suggested a second time once it's
    // already present. Demonstrates a token-pattern constraint beyond the
    // always-on `&[]`: the preceding token must literally be `;`.
    Completer {
        name: "ui.translation-domain-after-using",
        applies_in: &[AstKind::Ui],
        applies_in_subclass: None,
        matches: &[&[PatternElem::Kind(crate::token::TokenKind::StmtEnd)]],
        build: translation_domain_keyword,
    },
];

/// Whether the property/accessibility-prop snippet should append its own
/// `;` (§4.10 SUPPLEMENT): skipped when the statement already has one
/// immediately after the cursor, modulo intervening whitespace.
fn needs_trailing_semicolon(text: &str, offset: usize) -> bool {
    !text[offset..].trim_start().starts_with(';')
}

fn properties_in_object_content(ctx: &CompletionCtx) -> Vec<CompletionItem> {
    let Some(class) = ctx.enclosing_class() else { return Vec::new() };
    let semi = if needs_trailing_semicolon(ctx.text, ctx.offset) { ";" } else { "" };
    all_properties(&class)
        .into_iter()
        .map(|p| {
            let mut item = CompletionItem::new(p.name.clone(), CompletionKind::Property, 1)
                .with_snippet(format!("{}: $0{semi}", p.name))
                .with_detail(p.type_.name());
            if let Some(doc) = &p.doc {
                item = item.with_docs(Some(doc.clone()));
            }
            if p.deprecated {
                item.detail = Some(format!("{} (deprecated)", item.detail.unwrap_or_default()));
            }
            item
        })
        .collect()
}

fn signals_in_object_content(ctx: &CompletionCtx) -> Vec<CompletionItem> {
    let Some(class) = ctx.enclosing_class() else { return Vec::new() };
    all_signals(&class)
        .into_iter()
        .map(|s| {
            CompletionItem::new(s.name.clone(), CompletionKind::Signal, 1)
                .with_snippet(format!("{} => ${{1:on_{}}}();", s.name, s.name.replace('-', "_")))
                .with_detail("signal".to_string())
        })
        .collect()
}

fn accessibility_keyword(_ctx: &CompletionCtx) -> Vec<CompletionItem> {
    vec![CompletionItem::new("accessibility", CompletionKind::Keyword, 2)
        .with_snippet("accessibility {\n  $0\n}")
        .with_detail("accessibility block")]
}

fn accessibility_prop_names(ctx: &CompletionCtx) -> Vec<CompletionItem> {
    let semi = if needs_trailing_semicolon(ctx.text, ctx.offset) { ";" } else { "" };
    crate::ast::ACCESSIBILITY_PROPS
        .iter()
        .map(|name| {
            CompletionItem::new(*name, CompletionKind::AccessibilityProp, 1)
                .with_snippet(format!("{name}: $0{semi}"))
        })
        .collect()
}

fn enum_member_in_property_value(ctx: &CompletionCtx) -> Vec<CompletionItem> {
    let NodePayload::Property { name } = ctx.doc.payload(ctx.node) else { return Vec::new() };
    let Some(class) = ctx.enclosing_class() else { return Vec::new() };
    let Some(prop) = class.property(name) else { return Vec::new() };
    let members = match &prop.type_ {
        Type::Enumeration(e) | Type::Bitfield(e) => &e.members,
        _ => return Vec::new(),
    };
    members
        .iter()
        .map(|m| {
            let mut item = CompletionItem::new(m.name.clone(), CompletionKind::EnumMember, 1);
            if let Some(docs) = &m.docs {
                item = item.with_docs(Some(docs.clone()));
            }
            item
        })
        .collect()
}

/// Shared by the `Ui`-root and `ObjectContent` completers: every class
/// reachable by name, qualified imports first, then classes from a
/// namespace loaded elsewhere in the process but not yet imported into
/// this document (carrying the import-insertion edit).
fn class_name_items(ctx: &CompletionCtx) -> Vec<CompletionItem> {
    let idr = ctx.doc.idr();
    let mut items = Vec::new();
    let mut imported_names = HashSet::new();

    for ns in idr.imported() {
        imported_names.insert(ns.name.clone());
        for name in ns.classes.keys() {
            items.push(
                CompletionItem::new(name.clone(), CompletionKind::Class, 2)
                    .with_detail(format!("{}.{name}", ns.name)),
            );
        }
    }

    for ns in idr.cache().loaded_namespaces() {
        if imported_names.contains(&ns.name) {
            continue;
        }
        for name in ns.classes.keys() {
            let edit = import_insertion_edit(ctx.doc, ctx.text, &ns.name, &ns.version);
            items.push(
                CompletionItem::new(name.clone(), CompletionKind::Class, 3)
                    .with_detail(format!("{}.{name} (adds `using {} {}`)", ns.name, ns.name, ns.version))
                    .with_edit(edit),
            );
        }
    }
    items
}

fn root_keywords(ctx: &CompletionCtx) -> Vec<CompletionItem> {
    let mut items = vec![CompletionItem::new("using", CompletionKind::Keyword, 2).with_snippet("using $1 $2;")];
    if ctx.doc.template().is_none() {
        items.push(
            CompletionItem::new("template", CompletionKind::Keyword, 2)
                .with_snippet("template $1 : $2 {\n  $0\n}"),
        );
    }
    items
}

fn translation_domain_keyword(ctx: &CompletionCtx) -> Vec<CompletionItem> {
    let Some(root) = ctx.doc.root() else { return Vec::new() };
    let already_present = ctx
        .doc
        .children(root)
        .iter()
        .any(|&c| matches!(ctx.doc.payload(c), NodePayload::TranslationDomain { .. }));
    if already_present {
        return Vec::new();
    }
    vec![CompletionItem::new("translation-domain", CompletionKind::Keyword, 2)
        .with_snippet("translation-domain \"$0\";")]
}

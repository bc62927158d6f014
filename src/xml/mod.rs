//! The XML output adapter (C8). §4.8 specifies only a contract — an
//! `open_tag`/`close_tag`/`self_closing`/`text`/`cdata` sink the validated
//! AST walks itself into — and leaves the target schema's exact tag layout
//! out of scope; what's implemented here is one concrete rendering of that
//! contract, close to the target toolkit's own interface-definition schema,
//! not a byte-exact reproduction of it.

mod sink;

pub use sink::{IndentedWriter, Sink};

use crate::ast::{Document, ExprKind, LiteralRaw, NodeId, NodePayload};
use crate::error::{CoreError, CoreResult};

/// Walks `doc`'s AST and renders it as XML. Returns an error only if the
/// document has unresolved compile errors — emitting from a document with
/// warnings or deprecation notices is fine, matching "any non-warning error
/// blocks XML emission" (§7).
pub fn emit(doc: &Document) -> CoreResult<String> {
    if doc.diagnostics.has_errors() {
        return Err(CoreError::internal(
            "cannot emit XML for a document with unresolved errors",
        ));
    }
    let Some(root) = doc.root() else {
        return Err(CoreError::internal("cannot emit XML for an unparsed document"));
    };

    let mut writer = IndentedWriter::new(2);
    writer.open_tag("interface", &[]);

    for &child in doc.children(root) {
        match doc.payload(child) {
            NodePayload::Using { namespace, version } => {
                writer.self_closing("requires", &[("lib", &namespace.to_lowercase()), ("version", version)]);
            }
            NodePayload::Template { name, parent } => {
                let class = parent.as_ref().map(|t| t.glib_type_name());
                let mut attrs = vec![("class", name.as_str())];
                if let Some(p) = class.as_deref() {
                    attrs.push(("parent", p));
                }
                writer.open_tag("template", &attrs);
                if let Some(&content) = doc.children(child).first() {
                    emit_object_content(doc, &mut writer, content);
                }
                writer.close_tag();
            }
            NodePayload::Object { .. } => emit_object(doc, &mut writer, child),
            NodePayload::TranslationDomain { .. } => {}
            _ => {}
        }
    }

    writer.close_tag();
    Ok(writer.finish())
}

fn emit_object(doc: &Document, writer: &mut IndentedWriter, id: NodeId) {
    let NodePayload::Object { class, id: obj_id, .. } = doc.payload(id) else {
        return;
    };
    let mut attrs = vec![("class", class.glib_type_name())];
    if let Some(name) = obj_id {
        attrs.push(("id", name.clone()));
    }
    let attrs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    writer.open_tag("object", &attrs);
    if let Some(&content) = doc.children(id).first() {
        emit_object_content(doc, writer, content);
    }
    writer.close_tag();
}

fn emit_object_content(doc: &Document, writer: &mut IndentedWriter, content: NodeId) {
    for &child in doc.children(content) {
        match doc.payload(child) {
            NodePayload::Property { name } => emit_property(doc, writer, child, name),
            NodePayload::Signal { name, detail, handler, object_arg, swapped, after } => {
                emit_signal(writer, name, detail.as_deref(), handler, object_arg.as_deref(), *swapped, *after)
            }
            NodePayload::Accessibility => emit_accessibility(doc, writer, child),
            NodePayload::Object { child_role, .. } => {
                let role = child_role.clone();
                match role {
                    Some(r) => {
                        writer.open_tag("child", &[("type", r.as_str())]);
                        emit_object(doc, writer, child);
                        writer.close_tag();
                    }
                    None => {
                        writer.open_tag("child", &[]);
                        emit_object(doc, writer, child);
                        writer.close_tag();
                    }
                }
            }
            NodePayload::ListItemFactory { item_type } => emit_list_item_factory(doc, writer, child, item_type),
            _ => {}
        }
    }
}

/// `template { ... }` nested inside a `Gtk.BuilderListItemFactory` object,
/// emitted the same way a top-level template is: a `<template>` tag naming
/// the row's class, with no `parent` attribute (the row template has no
/// named subclass of its own).
fn emit_list_item_factory(doc: &Document, writer: &mut IndentedWriter, id: NodeId, item_type: &crate::types::Type) {
    writer.open_tag("template", &[("class", item_type.glib_type_name().as_str())]);
    if let Some(&content) = doc.children(id).first() {
        emit_object_content(doc, writer, content);
    }
    writer.close_tag();
}

fn emit_property(doc: &Document, writer: &mut IndentedWriter, id: NodeId, name: &str) {
    let Some(&value) = doc.children(id).first() else {
        writer.self_closing("property", &[("name", name)]);
        return;
    };
    match doc.payload(value) {
        NodePayload::ValueTranslated { text, translator_context } => {
            let mut attrs = vec![("name", name.to_string()), ("translatable", "yes".to_string())];
            if let Some(ctx) = translator_context {
                attrs.push(("context", ctx.clone()));
            }
            let attrs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
            writer.open_tag("property", &attrs);
            writer.text(text);
            writer.close_tag();
        }
        NodePayload::ValueObject => {
            writer.open_tag("property", &[("name", name)]);
            if let Some(&obj) = doc.children(value).first() {
                emit_object(doc, writer, obj);
            }
            writer.close_tag();
        }
        NodePayload::ValueArray => {
            writer.open_tag("property", &[("name", name)]);
            for &item in doc.children(value) {
                writer.open_tag("item", &[]);
                writer.text(&value_text(doc, item));
                writer.close_tag();
            }
            writer.close_tag();
        }
        NodePayload::ValueBind { bidirectional, no_sync_create, inverted } => {
            let mut attrs = vec![("name", name.to_string())];
            if *bidirectional {
                attrs.push(("bidirectional", "true".to_string()));
            }
            if *no_sync_create {
                attrs.push(("no-sync-create", "true".to_string()));
            }
            if *inverted {
                attrs.push(("inverted", "true".to_string()));
            }
            let attrs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
            writer.open_tag("binding", &attrs);
            if let Some(&expr) = doc.children(value).first() {
                emit_expr(doc, writer, expr);
            }
            writer.close_tag();
        }
        NodePayload::ValueExpr => {
            writer.open_tag("binding", &[("name", name)]);
            if let Some(&expr) = doc.children(value).first() {
                emit_expr(doc, writer, expr);
            }
            writer.close_tag();
        }
        _ => {
            writer.open_tag("property", &[("name", name)]);
            writer.text(&value_text(doc, value));
            writer.close_tag();
        }
    }
}

/// Renders a `Value*` node's scalar text content. Only used by value kinds
/// with no nested elements of their own (literal, ident/flag, flags, and
/// array items, which recurse into this for each element).
fn value_text(doc: &Document, id: NodeId) -> String {
    match doc.payload(id) {
        NodePayload::ValueLiteral(LiteralRaw::Number(n)) => format_number(*n),
        NodePayload::ValueLiteral(LiteralRaw::Quoted(s)) => s.clone(),
        NodePayload::ValueIdentFlag { name } => name.clone(),
        NodePayload::ValueFlags { members } => members.join(" | "),
        _ => String::new(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn emit_signal(
    writer: &mut IndentedWriter,
    name: &str,
    detail: Option<&str>,
    handler: &str,
    object_arg: Option<&str>,
    swapped: bool,
    after: bool,
) {
    let full_name = match detail {
        Some(d) => format!("{name}::{d}"),
        None => name.to_string(),
    };
    let mut attrs = vec![("name", full_name.clone()), ("handler", handler.to_string())];
    if let Some(obj) = object_arg {
        attrs.push(("object", obj.to_string()));
    }
    if swapped {
        attrs.push(("swapped", "true".to_string()));
    }
    if after {
        attrs.push(("after", "true".to_string()));
    }
    let attrs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    writer.self_closing("signal", &attrs);
}

fn emit_accessibility(doc: &Document, writer: &mut IndentedWriter, id: NodeId) {
    writer.open_tag("accessibility", &[]);
    for &prop in doc.children(id) {
        let NodePayload::AccessibilityProp { name } = doc.payload(prop) else {
            continue;
        };
        match doc.children(prop).first() {
            Some(&value) => {
                if let NodePayload::ValueFlags { members } = doc.payload(value) {
                    for member in members {
                        writer.open_tag("property", &[("name", name.as_str()), ("translatable", "no")]);
                        writer.text(member);
                        writer.close_tag();
                    }
                } else {
                    writer.open_tag("property", &[("name", name.as_str())]);
                    writer.text(&value_text(doc, value));
                    writer.close_tag();
                }
            }
            None => writer.self_closing("property", &[("name", name.as_str())]),
        }
    }
    writer.close_tag();
}

/// Binding expressions render as a chain of `<lookup>`/`<constant>` elements,
/// the closest analogue the schema has to the source language's `a.b.c`
/// postfix chain; closures become `<closure>` with their arguments nested.
fn emit_expr(doc: &Document, writer: &mut IndentedWriter, id: NodeId) {
    match doc.payload(id) {
        NodePayload::Expr(ExprKind::IdentLiteral(name)) => {
            writer.open_tag("constant", &[]);
            writer.text(name);
            writer.close_tag();
        }
        NodePayload::Expr(ExprKind::Literal(lit)) => {
            writer.open_tag("constant", &[]);
            match lit {
                LiteralRaw::Number(n) => writer.text(&format_number(*n)),
                LiteralRaw::Quoted(s) => writer.text(s),
            }
            writer.close_tag();
        }
        NodePayload::Expr(ExprKind::Lookup { property }) => {
            writer.open_tag("lookup", &[("name", property.as_str())]);
            if let Some(&base) = doc.children(id).first() {
                emit_expr(doc, writer, base);
            }
            writer.close_tag();
        }
        NodePayload::Expr(ExprKind::Cast { .. }) => {
            if let Some(&base) = doc.children(id).first() {
                emit_expr(doc, writer, base);
            }
        }
        NodePayload::Expr(ExprKind::Closure { name, is_extern }) => {
            writer.open_tag("closure", &[("function", name.as_str()), ("extern", if *is_extern { "1" } else { "0" })]);
            for &arg in doc.children(id) {
                emit_expr(doc, writer, arg);
            }
            writer.close_tag();
        }
        NodePayload::Expr(ExprKind::Translated { text, .. }) => {
            writer.open_tag("constant", &[("translatable", "yes")]);
            writer.text(text);
            writer.close_tag();
        }
        NodePayload::Expr(ExprKind::Try) => {
            for &branch in doc.children(id) {
                emit_expr(doc, writer, branch);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::gtk_cache;

    #[test]
    fn emits_requires_and_simple_object() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nBox { orientation: vertical; }", cache);
        let xml = emit(&doc).expect("emit");
        assert!(xml.starts_with("<interface>"));
        assert!(xml.contains(r#"<requires lib="gtk" version="4.0"/>"#));
        assert!(xml.contains(r#"<object class="GtkBox">"#));
        assert!(xml.contains(r#"<property name="orientation">vertical</property>"#));
    }

    #[test]
    fn emits_bracketed_child_role_and_signal() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(
            "using Gtk 4.0;\nBox { [start] Button { label: \"Go\"; clicked => on_click(); } }",
            cache,
        );
        let xml = emit(&doc).expect("emit");
        assert!(xml.contains(r#"<child type="start">"#));
        assert!(xml.contains(r#"<signal name="clicked" handler="on_click"/>"#));
    }
}

//! Lowers a [`crate::parse::ParseGroup`] tree into the typed arena (§4.5's
//! "lowering" step). Structural validations that only need locally-known
//! context — duplicate ids, unknown properties/signals, construct-only
//! binds, the toolkit `using`, at-most-one `template` — are applied inline
//! here, since the information they need (the enclosing class, the running
//! id map) is already at hand while walking down. Validations that need the
//! *whole* document first (value type conformance against a possibly
//! forward-declared bind source) are deferred to [`super::validate`].

use std::collections::HashMap;

use crate::config::{SUPPORTED_TOOLKIT_NAMESPACE, SUPPORTED_TOOLKIT_VERSION};
use crate::diagnostics::Diagnostic;
use crate::expr as exprgrammar;
use crate::parse::{ParseGroup, Value};
use crate::types::{BasicType, Type};

use super::grammar;
use super::{Document, ExprKind, LiteralRaw, NodeId, NodePayload, Scope};

pub fn lower_document(doc: &mut Document, group: &ParseGroup) -> NodeId {
    let ui_id = doc.arena.push(None, NodePayload::Ui, group.span);
    let mut ids: HashMap<String, NodeId> = HashMap::new();
    let mut using_count = 0usize;

    for child in &group.children {
        if child.kind == grammar::KIND_USING {
            lower_using(doc, child, using_count == 0);
            using_count += 1;
        } else if child.kind == grammar::KIND_TRANSLATION_DOMAIN {
            lower_translation_domain(doc, ui_id, child);
        } else if child.kind == grammar::KIND_TEMPLATE {
            lower_template(doc, ui_id, child, &mut ids);
        } else if child.kind == grammar::KIND_OBJECT {
            lower_object(doc, ui_id, child, &mut ids, None);
        }
    }

    doc.ids = std::rc::Rc::new(ids);
    ui_id
}

fn lower_using(doc: &mut Document, group: &ParseGroup, is_first: bool) {
    let namespace = ident(group, "namespace").unwrap_or_default();
    let version = group
        .token_for("version")
        .map(|t| t.text(&doc.source).to_string())
        .unwrap_or_default();

    if is_first && (namespace != SUPPORTED_TOOLKIT_NAMESPACE || version != SUPPORTED_TOOLKIT_VERSION) {
        doc.diagnostics.push(Diagnostic::version_mismatch(
            format!(
                "expected the first `using` to be `{SUPPORTED_TOOLKIT_NAMESPACE} {SUPPORTED_TOOLKIT_VERSION}`, found `{namespace} {version}`"
            ),
            group.span,
        ));
    }

    if let Err(e) = doc.idr.import(&namespace, &version) {
        doc.diagnostics
            .push(Diagnostic::missing_namespace(e.to_string(), group.span));
    }
}

fn lower_translation_domain(doc: &mut Document, parent: NodeId, group: &ParseGroup) {
    let domain = group.get("domain").and_then(Value::as_quoted).unwrap_or_default().to_string();
    doc.arena.push(Some(parent), NodePayload::TranslationDomain { domain }, group.span);
}

fn lower_template(doc: &mut Document, parent: NodeId, group: &ParseGroup, ids: &mut HashMap<String, NodeId>) {
    let name = ident(group, "name").unwrap_or_default();
    let parent_ty = match group.children_of_kind(grammar::KIND_TYPE_NAME).next() {
        Some(g) => Some(resolve_type_name(doc, g)),
        None => None,
    };

    if doc.template.is_some() {
        let first_span = doc.template.map(|t| doc.span(t)).unwrap_or(group.span);
        doc.diagnostics.push(Diagnostic::duplicate(
            "a file may declare at most one `template`",
            group.span,
            first_span,
        ));
        return;
    }

    let template_id = doc.arena.push(
        Some(parent),
        NodePayload::Template { name: name.clone(), parent: parent_ty.clone() },
        group.span,
    );
    doc.template = Some(template_id);

    // Back-compat: a template's own declared name resolves as an object id
    // to its root, so expressions can `bind` off the template itself the
    // same way older sources reference the surrounding class by name.
    if !name.is_empty() {
        ids.entry(name).or_insert(template_id);
    }

    let class = parent_ty.unwrap_or(Type::Extern { namespace: String::new(), name: "_Template".into() });
    if let Some(content) = group.children_of_kind(grammar::KIND_OBJECT_CONTENT).next() {
        lower_object_content(doc, template_id, content, &class, ids);
    }
}

fn lower_object(
    doc: &mut Document,
    parent: NodeId,
    group: &ParseGroup,
    ids: &mut HashMap<String, NodeId>,
    child_role: Option<String>,
) -> NodeId {
    let class = match group.children_of_kind(grammar::KIND_TYPE_NAME).next() {
        Some(g) => resolve_type_name(doc, g),
        None => Type::Basic(BasicType::Void),
    };

    if let Type::Class(c) = &class {
        if c.abstract_ {
            doc.diagnostics.push(Diagnostic::error(
                format!("`{}` is abstract and cannot be instantiated", class.full_name()),
                group.span,
            ));
        }
    }

    let id_name = ident(group, "id");
    let obj_id = doc.arena.push(
        Some(parent),
        NodePayload::Object { class: class.clone(), id: id_name.clone(), child_role },
        group.span,
    );

    if let Some(name) = id_name {
        if let Some(&prev) = ids.get(&name) {
            doc.diagnostics.push(Diagnostic::duplicate(
                format!("duplicate id `{name}`"),
                group.span,
                doc.span(prev),
            ));
        } else {
            ids.insert(name, obj_id);
        }
    }

    if let Some(content) = group.children_of_kind(grammar::KIND_OBJECT_CONTENT).next() {
        lower_object_content(doc, obj_id, content, &class, ids);
    }
    obj_id
}

fn lower_object_content(
    doc: &mut Document,
    parent_obj: NodeId,
    group: &ParseGroup,
    class: &Type,
    ids: &mut HashMap<String, NodeId>,
) -> NodeId {
    let content_id = doc.arena.push(Some(parent_obj), NodePayload::ObjectContent, group.span);
    let mut seen_properties: HashMap<String, NodeId> = HashMap::new();
    for child in &group.children {
        if child.kind == grammar::KIND_PROPERTY {
            lower_property(doc, content_id, child, class, ids, &mut seen_properties);
        } else if child.kind == grammar::KIND_SIGNAL {
            lower_signal(doc, content_id, child, class);
        } else if child.kind == grammar::KIND_ACCESSIBILITY {
            lower_accessibility(doc, content_id, child, ids);
        } else if child.kind == grammar::KIND_OBJECT {
            lower_object(doc, content_id, child, ids, None);
        } else if child.kind == grammar::KIND_BRACKETED_CHILD {
            let role = ident(child, "child_role");
            if let Some(obj) = child.children_of_kind(grammar::KIND_OBJECT).next() {
                lower_object(doc, content_id, obj, ids, role);
            }
        } else if child.kind == grammar::KIND_LIST_ITEM_FACTORY {
            lower_list_item_factory(doc, content_id, child, class);
        }
    }
    content_id
}

/// `template { ... }` nested inside a `Gtk.BuilderListItemFactory` object
/// (`class` is that enclosing object's type). Opens a scope of its own:
/// ids declared inside don't leak into, or inherit from, the surrounding
/// document scope, and `item` is bound to `Gtk.ListItem` throughout.
fn lower_list_item_factory(doc: &mut Document, parent: NodeId, group: &ParseGroup, container_class: &Type) {
    if let Some(expected) = doc.idr.resolve(Some("Gtk"), "BuilderListItemFactory") {
        if !container_class.assignable_to(&expected) {
            doc.diagnostics.push(Diagnostic::error(
                format!(
                    "`{}` is not a `Gtk.BuilderListItemFactory`, so it doesn't have sub-templates",
                    container_class.name()
                ),
                group.span,
            ));
        }
    }

    let item_type = doc
        .idr
        .resolve(Some("Gtk"), "ListItem")
        .unwrap_or(Type::Extern { namespace: "Gtk".into(), name: "ListItem".into() });

    let factory_id = doc.arena.push(
        Some(parent),
        NodePayload::ListItemFactory { item_type: item_type.clone() },
        group.span,
    );

    let mut local_ids: HashMap<String, NodeId> = HashMap::new();
    if let Some(content) = group.children_of_kind(grammar::KIND_OBJECT_CONTENT).next() {
        lower_object_content(doc, factory_id, content, &item_type, &mut local_ids);
    }
    doc.factory_scopes.insert(
        factory_id,
        Scope::Local { ids: std::rc::Rc::new(local_ids), item_type },
    );
}

fn lower_property(
    doc: &mut Document,
    parent: NodeId,
    group: &ParseGroup,
    class: &Type,
    ids: &mut HashMap<String, NodeId>,
    seen_properties: &mut HashMap<String, NodeId>,
) -> NodeId {
    let name = ident(group, "name").unwrap_or_default();
    let prop_id = doc.arena.push(Some(parent), NodePayload::Property { name: name.clone() }, group.span);

    if let Some(&prev) = seen_properties.get(&name) {
        doc.diagnostics.push(Diagnostic::duplicate(
            format!("duplicate property `{name}`"),
            group.span,
            doc.span(prev),
        ));
    } else {
        seen_properties.insert(name.clone(), prop_id);
    }

    match class.property(&name) {
        Some(p) => {
            if p.deprecated {
                let mut d = Diagnostic::deprecated(format!("property `{name}` is deprecated"), group.span);
                if let Some(doc_text) = &p.deprecated_doc {
                    d = d.with_hint(doc_text.clone());
                }
                doc.diagnostics.push(d);
            }
            if !p.writable {
                doc.diagnostics.push(Diagnostic::error(
                    format!("property `{name}` is not writable"),
                    group.span,
                ));
            }
        }
        None => {
            let candidates = class.property_names();
            doc.diagnostics
                .push(Diagnostic::unresolved(format!("unknown property `{name}`"), group.span).did_you_mean(&name, &candidates));
        }
    }

    if let Some(value_group) = group.children.first() {
        lower_value(doc, prop_id, value_group, ids);
        if value_group.kind == grammar::KIND_VALUE_BIND {
            if let Some(p) = class.property(&name) {
                if p.construct_only {
                    doc.diagnostics.push(Diagnostic::error(
                        format!("cannot bind construct-only property `{name}`"),
                        group.span,
                    ));
                }
            }
        }
    }
    prop_id
}

fn lower_signal(doc: &mut Document, parent: NodeId, group: &ParseGroup, class: &Type) -> NodeId {
    let name = ident(group, "name").unwrap_or_default();
    let detail = ident(group, "detail");
    let handler = ident(group, "handler").unwrap_or_default();
    let object_arg = ident(group, "object_arg");
    let swapped = group.get("swapped").and_then(Value::as_bool).unwrap_or(false);
    let after = group.get("after").and_then(Value::as_bool).unwrap_or(false);

    let sig_id = doc.arena.push(
        Some(parent),
        NodePayload::Signal { name: name.clone(), detail, handler, object_arg, swapped, after },
        group.span,
    );

    match class.signal(&name) {
        Some(s) if s.deprecated => {
            let mut d = Diagnostic::deprecated(format!("signal `{name}` is deprecated"), group.span);
            if let Some(doc_text) = &s.deprecated_doc {
                d = d.with_hint(doc_text.clone());
            }
            doc.diagnostics.push(d);
        }
        Some(_) => {}
        None => {
            let candidates = class.signal_names();
            doc.diagnostics
                .push(Diagnostic::unresolved(format!("unknown signal `{name}`"), group.span).did_you_mean(&name, &candidates));
        }
    }
    sig_id
}

fn lower_accessibility(doc: &mut Document, parent: NodeId, group: &ParseGroup, ids: &mut HashMap<String, NodeId>) -> NodeId {
    let acc_id = doc.arena.push(Some(parent), NodePayload::Accessibility, group.span);
    for child in group.children_of_kind(grammar::KIND_ACCESSIBILITY_PROP) {
        lower_accessibility_prop(doc, acc_id, child, ids);
    }
    acc_id
}

fn lower_accessibility_prop(doc: &mut Document, parent: NodeId, group: &ParseGroup, ids: &mut HashMap<String, NodeId>) -> NodeId {
    let name = ident(group, "name").unwrap_or_default();
    if !grammar::ACCESSIBILITY_PROPS.contains(&name.as_str()) {
        doc.diagnostics.push(
            Diagnostic::unresolved(format!("unknown accessibility property `{name}`"), group.span)
                .did_you_mean(&name, grammar::ACCESSIBILITY_PROPS),
        );
    }
    let prop_id = doc.arena.push(Some(parent), NodePayload::AccessibilityProp { name }, group.span);

    let targets = grammar::ident_list(group, "targets");
    if !targets.is_empty() {
        let members = targets.into_iter().map(String::from).collect();
        doc.arena.push(Some(prop_id), NodePayload::ValueFlags { members }, group.span);
    } else if let Some(value_group) = group.children.first() {
        lower_value(doc, prop_id, value_group, ids);
    }
    prop_id
}

/// Lowers one `value` production's matched alternative into its `Value*`
/// node, returning the new node's id.
fn lower_value(doc: &mut Document, parent: NodeId, group: &ParseGroup, ids: &mut HashMap<String, NodeId>) -> NodeId {
    if group.kind == grammar::KIND_VALUE_LITERAL {
        doc.arena.push(Some(parent), NodePayload::ValueLiteral(literal_raw(group)), group.span)
    } else if group.kind == grammar::KIND_VALUE_IDENT {
        let name = ident(group, "value").unwrap_or_default();
        doc.arena.push(Some(parent), NodePayload::ValueIdentFlag { name }, group.span)
    } else if group.kind == grammar::KIND_VALUE_FLAGS {
        let members = grammar::ident_list(group, "members").into_iter().map(String::from).collect();
        doc.arena.push(Some(parent), NodePayload::ValueFlags { members }, group.span)
    } else if group.kind == grammar::KIND_VALUE_TRANSLATED {
        let text = group.get("value").and_then(Value::as_quoted).unwrap_or_default().to_string();
        let translator_context = group.get("context").and_then(Value::as_quoted).map(String::from);
        doc.arena
            .push(Some(parent), NodePayload::ValueTranslated { text, translator_context }, group.span)
    } else if group.kind == grammar::KIND_VALUE_ARRAY {
        let array_id = doc.arena.push(Some(parent), NodePayload::ValueArray, group.span);
        for item in &group.children {
            lower_value(doc, array_id, item, ids);
        }
        array_id
    } else if group.kind == grammar::KIND_OBJECT {
        // `object_value_grammar` delegates straight to `object_grammar`, so
        // a nested object as a value arrives untagged as a plain `KIND_OBJECT`.
        let wrapper = doc.arena.push(Some(parent), NodePayload::ValueObject, group.span);
        lower_object(doc, wrapper, group, ids, None);
        wrapper
    } else if group.kind == grammar::KIND_VALUE_EXPR {
        let expr_id = doc.arena.push(Some(parent), NodePayload::ValueExpr, group.span);
        if let Some(e) = group.children_of_kind(exprgrammar::KIND_EXPRESSION).next() {
            lower_expr(doc, expr_id, e);
        }
        expr_id
    } else if group.kind == grammar::KIND_VALUE_BIND {
        let bidirectional = group.get("bidirectional").and_then(Value::as_bool).unwrap_or(false);
        let no_sync_create = group.get("no_sync_create").and_then(Value::as_bool).unwrap_or(false);
        let inverted = group.get("inverted").and_then(Value::as_bool).unwrap_or(false);
        let bind_id = doc.arena.push(
            Some(parent),
            NodePayload::ValueBind { bidirectional, no_sync_create, inverted },
            group.span,
        );
        if let Some(e) = group.children_of_kind(exprgrammar::KIND_EXPRESSION).next() {
            lower_expr(doc, bind_id, e);
        }
        bind_id
    } else {
        doc.arena.push(Some(parent), NodePayload::ValueLiteral(LiteralRaw::Quoted(String::new())), group.span)
    }
}

/// Lowers an `expr.expression` group: its first child is the primary, every
/// child after it is a postfix `lookup`/`cast` wrapping everything lowered
/// so far (left to right), per the grammar's left-associative postfix loop.
fn lower_expr(doc: &mut Document, parent: NodeId, group: &ParseGroup) -> NodeId {
    let mut children = group.children.iter();
    let Some(primary) = children.next() else {
        return doc.arena.push(Some(parent), NodePayload::Expr(ExprKind::IdentLiteral(String::new())), group.span);
    };
    let mut current = lower_expr_primary(doc, parent, primary);

    for postfix in children {
        let payload = if postfix.kind == exprgrammar::KIND_LOOKUP {
            let property = ident(postfix, "property").unwrap_or_default();
            NodePayload::Expr(ExprKind::Lookup { property })
        } else if postfix.kind == exprgrammar::KIND_CAST {
            let legacy_paren = postfix.get("lparen").is_some();
            let target = match postfix.children_of_kind(exprgrammar::KIND_TYPE_NAME).next() {
                Some(g) => resolve_type_name(doc, g),
                None => Type::Basic(BasicType::Void),
            };
            NodePayload::Expr(ExprKind::Cast { target, legacy_paren })
        } else {
            continue;
        };
        let new_id = doc.arena.push(Some(parent), payload, postfix.span);
        doc.arena.reparent(current, new_id);
        current = new_id;
    }
    current
}

fn lower_expr_primary(doc: &mut Document, parent: NodeId, group: &ParseGroup) -> NodeId {
    if group.kind == exprgrammar::KIND_EXPRESSION {
        // A parenthesized sub-expression recurses transparently: no node of
        // its own, just the inner expression's tree.
        return lower_expr(doc, parent, group);
    }
    if group.kind == exprgrammar::KIND_LITERAL {
        return doc.arena.push(Some(parent), NodePayload::Expr(ExprKind::Literal(literal_raw(group))), group.span);
    }
    if group.kind == exprgrammar::KIND_IDENT_LITERAL {
        let name = ident(group, "value").unwrap_or_default();
        return doc.arena.push(Some(parent), NodePayload::Expr(ExprKind::IdentLiteral(name)), group.span);
    }
    if group.kind == exprgrammar::KIND_TRANSLATED {
        let text = group.get("value").and_then(Value::as_quoted).unwrap_or_default().to_string();
        let translator_context = group.get("context").and_then(Value::as_quoted).map(String::from);
        return doc
            .arena
            .push(Some(parent), NodePayload::Expr(ExprKind::Translated { text, translator_context }), group.span);
    }
    if group.kind == exprgrammar::KIND_TRY {
        let try_id = doc.arena.push(Some(parent), NodePayload::Expr(ExprKind::Try), group.span);
        for branch in group.children_of_kind(exprgrammar::KIND_EXPRESSION) {
            lower_expr(doc, try_id, branch);
        }
        return try_id;
    }
    if group.kind == exprgrammar::KIND_CLOSURE {
        let name = ident(group, "name").unwrap_or_default();
        let is_extern = group.get("extern").is_some();
        let closure_id = doc.arena.push(Some(parent), NodePayload::Expr(ExprKind::Closure { name, is_extern }), group.span);
        for arg in group.children_of_kind(exprgrammar::KIND_CLOSURE_ARG) {
            if let Some(inner) = arg.children_of_kind(exprgrammar::KIND_EXPRESSION).next() {
                lower_expr(doc, closure_id, inner);
            }
        }
        return closure_id;
    }
    // Shouldn't be reachable for a grammar-conformant tree; keep lowering total.
    doc.arena.push(Some(parent), NodePayload::Expr(ExprKind::IdentLiteral(String::new())), group.span)
}

fn literal_raw(group: &ParseGroup) -> LiteralRaw {
    match group.get("value") {
        Some(Value::Number(n)) => LiteralRaw::Number(*n),
        Some(Value::Quoted(s)) => LiteralRaw::Quoted(s.clone()),
        _ => LiteralRaw::Quoted(String::new()),
    }
}

fn ident(group: &ParseGroup, key: &str) -> Option<String> {
    group.get(key).and_then(Value::as_ident).map(String::from)
}

/// Resolves a `type_name` group (shared between C5's object/template
/// grammar and C6's cast grammar) against the document's imports.
fn resolve_type_name(doc: &mut Document, group: &ParseGroup) -> Type {
    let class_name = ident(group, "class_name").unwrap_or_default();

    if group.get("ignore_gir").is_some() {
        return Type::Extern { namespace: String::new(), name: class_name };
    }

    let namespace = ident(group, "namespace");
    let resolved = doc.idr.resolve(namespace.as_deref(), &class_name);

    match resolved {
        Some(t) => {
            if t.deprecated() {
                let mut d = Diagnostic::deprecated(format!("type `{}` is deprecated", t.full_name()), group.span);
                if let Some(doc_text) = t.deprecated_doc() {
                    d = d.with_hint(doc_text.to_string());
                }
                doc.diagnostics.push(d);
            }
            t
        }
        None => {
            doc.diagnostics.push(Diagnostic::unresolved(
                format!("unknown type `{class_name}`"),
                group.span,
            ));
            Type::Extern { namespace: namespace.unwrap_or_default(), name: class_name }
        }
    }
}

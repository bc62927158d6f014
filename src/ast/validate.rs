//! The validations that need the whole document already lowered (§4.5's
//! value-type conformance, which may reference a `bind` source declared
//! later in the same file). Everything that only needs locally-known
//! context (duplicate ids, unknown properties, construct-only binds, the
//! toolkit `using`, at-most-one `template`, deprecation) is applied inline
//! during [`super::lower`] instead, where the relevant context is already
//! at hand.

use crate::diagnostics::{CodeAction, Diagnostic};
use crate::types::{BasicType, Type};

use super::{Document, ExprKind, LiteralRaw, NodeId, NodePayload, Scope};

pub fn run(doc: &mut Document) {
    let Some(root) = doc.root() else { return };
    let checks = collect_checks(doc, root);
    for check in checks {
        check_value(doc, check);
    }
    walk_for_expr_validation(doc, root);
}

/// Whether an `item` identifier is directly wrapped by a cast, and whether
/// that cast is in turn immediately looked up — the only two legal shapes
/// for the special list-item binding (§4.6).
#[derive(Clone, Copy, PartialEq)]
enum ItemWrap {
    None,
    Cast,
    CastUnderLookup,
}

/// Walks every expression reachable from the document, entering each
/// top-level `Expr` subtree once via [`validate_expr`], which recurses into
/// its own children — so this outer walk only needs to recurse through
/// non-expression nodes to find where expression trees begin.
fn walk_for_expr_validation(doc: &mut Document, id: NodeId) {
    if matches!(doc.payload(id), NodePayload::Expr(_)) {
        let scope = doc.scope_for(id);
        validate_expr(doc, &scope, id, ItemWrap::None);
        return;
    }
    for child in doc.children(id).to_vec() {
        walk_for_expr_validation(doc, child);
    }
}

/// The per-expression-kind semantic rules (§4.6 SUPPLEMENT): legacy cast
/// upgrade warning, `try` branch-count rules, the closure `$`-prefix
/// requirement, lookup's "cannot determine type" error (only when the base
/// isn't itself a literal), and `item`'s cast-then-lookup constraint.
fn validate_expr(doc: &mut Document, scope: &Scope, id: NodeId, wrap: ItemWrap) {
    let kind = match doc.payload(id) {
        NodePayload::Expr(k) => k.clone(),
        _ => return,
    };
    let span = doc.span(id);

    match kind {
        ExprKind::IdentLiteral(name) if name == "item" => {
            if scope.item_type().is_none() {
                doc.diagnostics
                    .push(Diagnostic::unresolved("`item` is only valid inside a list-item factory", span));
                return;
            }
            match wrap {
                ItemWrap::CastUnderLookup => {}
                ItemWrap::Cast => {
                    doc.diagnostics
                        .push(Diagnostic::error("`item` can only be used for looking up properties", span));
                }
                ItemWrap::None => {
                    doc.diagnostics
                        .push(Diagnostic::error("`item` must be cast to its object type before use", span));
                }
            }
        }
        ExprKind::Cast { legacy_paren, .. } => {
            if legacy_paren {
                doc.diagnostics.push(
                    Diagnostic::warning("legacy `as (T)` cast syntax is deprecated", span)
                        .with_action(CodeAction::new("Use `<T>` syntax", cast_upgrade_text(doc, id)).at(span)),
                );
            }
            if let Some(base) = doc.children(id).first().copied() {
                validate_expr(doc, scope, base, ItemWrap::Cast);
            }
        }
        ExprKind::Lookup { .. } => {
            let Some(base) = doc.children(id).first().copied() else { return };
            let base_is_cast = matches!(doc.payload(base), NodePayload::Expr(ExprKind::Cast { .. }));
            if base_is_cast {
                // The cast itself is validated here (rather than recursing into
                // it generically) so its inner `item` sees `CastUnderLookup`.
                if let NodePayload::Expr(ExprKind::Cast { legacy_paren, .. }) = doc.payload(base).clone() {
                    if legacy_paren {
                        let cast_span = doc.span(base);
                        doc.diagnostics.push(
                            Diagnostic::warning("legacy `as (T)` cast syntax is deprecated", cast_span)
                                .with_action(CodeAction::new("Use `<T>` syntax", cast_upgrade_text(doc, base)).at(cast_span)),
                        );
                    }
                }
                if let Some(inner) = doc.children(base).first().copied() {
                    validate_expr(doc, scope, inner, ItemWrap::CastUnderLookup);
                }
            } else {
                validate_expr(doc, scope, base, ItemWrap::None);
            }

            let base_is_literal = matches!(doc.payload(base), NodePayload::Expr(ExprKind::Literal(_)));
            if !base_is_literal && infer_expr_type(doc, base, scope).is_none() {
                doc.diagnostics.push(
                    Diagnostic::unresolved("could not determine type of preceding expression", doc.span(base))
                        .with_hint("add a cast, e.g. `as <Type>`"),
                );
            }
        }
        ExprKind::Closure { is_extern, .. } => {
            if !is_extern {
                doc.diagnostics.push(Diagnostic::error(
                    "closures must be written as `$name(...)`; the bare form is reserved",
                    span,
                ));
            }
            for arg in doc.children(id).to_vec() {
                validate_expr(doc, scope, arg, ItemWrap::None);
            }
        }
        ExprKind::Try => {
            let branches = doc.children(id).to_vec();
            match branches.len() {
                0 => doc
                    .diagnostics
                    .push(Diagnostic::error("`try` must have at least one branch", span)),
                1 => {
                    let branch_span = doc.span(branches[0]);
                    let replacement = branch_span.text(doc.source()).to_string();
                    doc.diagnostics.push(
                        Diagnostic::warning("a single-branch `try` has no effect", span)
                            .with_action(CodeAction::new("Remove `try`", replacement).at(span)),
                    );
                }
                _ => {
                    let types: Vec<Type> = branches.iter().filter_map(|&b| infer_expr_type(doc, b, scope)).collect();
                    if types.len() == branches.len() && Type::common_ancestor(&types).is_none() {
                        doc.diagnostics
                            .push(Diagnostic::type_mismatch("`try` branches have no common type", span));
                    }
                }
            }
            for branch in branches {
                validate_expr(doc, scope, branch, ItemWrap::None);
            }
        }
        _ => {
            if let Some(base) = doc.children(id).first().copied() {
                validate_expr(doc, scope, base, ItemWrap::None);
            }
        }
    }
}

fn cast_upgrade_text(doc: &Document, cast_id: NodeId) -> String {
    match doc.payload(cast_id) {
        NodePayload::Expr(ExprKind::Cast { target, .. }) => format!("as <{}>", target.name()),
        _ => String::new(),
    }
}

/// One property (or accessibility prop) whose declared type and lowered
/// value both need to be compared.
struct ValueCheck {
    expected: Type,
    value: NodeId,
}

fn collect_checks(doc: &Document, id: NodeId) -> Vec<ValueCheck> {
    let mut out = Vec::new();
    collect_into(doc, id, &mut out);
    out
}

fn collect_into(doc: &Document, id: NodeId, out: &mut Vec<ValueCheck>) {
    if let NodePayload::Property { name } = doc.payload(id) {
        if let Some(class) = enclosing_class(doc, id) {
            if let Some(p) = class.property(name) {
                if let Some(&value) = doc.children(id).first() {
                    out.push(ValueCheck { expected: p.type_.clone(), value });
                }
            }
        }
    }
    for &child in doc.children(id) {
        collect_into(doc, child, out);
    }
}

fn enclosing_class(doc: &Document, prop_id: NodeId) -> Option<Type> {
    let content_id = doc.parent(prop_id)?;
    let owner_id = doc.parent(content_id)?;
    match doc.payload(owner_id) {
        NodePayload::Object { class, .. } => Some(class.clone()),
        NodePayload::ListItemFactory { item_type } => Some(item_type.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::testutil::gtk_cache;

    #[test]
    fn legacy_paren_cast_warns_and_offers_upgrade_action() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(
            "using Gtk 4.0;\ntemplate Foo : Gtk.Box {\n  Button go1 {}\n  visible: bind go1 as (Gtk.Button).visible;\n}",
            cache,
        );
        let d = doc
            .diagnostics
            .diagnostics
            .iter()
            .find(|d| d.message.contains("legacy"))
            .expect("legacy cast warning");
        assert_eq!(d.severity, crate::diagnostics::Severity::Warning);
        assert_eq!(d.actions[0].replace_with, "as <Gtk.Button>");
    }

    #[test]
    fn bare_closure_form_is_rejected_but_dollar_prefixed_is_fine() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nBox {\n  spacing: bind format(4);\n}", cache);
        assert!(doc
            .diagnostics
            .diagnostics
            .iter()
            .any(|d| d.message.contains("bare form is reserved")));

        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nBox {\n  spacing: bind $format(4);\n}", cache);
        assert!(!doc
            .diagnostics
            .diagnostics
            .iter()
            .any(|d| d.message.contains("bare form is reserved")));
    }

    #[test]
    fn single_branch_try_is_a_warning_with_a_removal_action() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(
            "using Gtk 4.0;\nBox {\n  spacing: bind try { 4 };\n}",
            cache,
        );
        let d = doc
            .diagnostics
            .diagnostics
            .iter()
            .find(|d| d.message.contains("no effect"))
            .expect("single-branch try warning");
        assert_eq!(d.severity, crate::diagnostics::Severity::Warning);
    }

    #[test]
    fn empty_try_is_an_error() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nBox {\n  spacing: bind try {};\n}", cache);
        assert!(doc
            .diagnostics
            .diagnostics
            .iter()
            .any(|d| d.message.contains("at least one branch")));
    }

    #[test]
    fn item_outside_a_list_factory_is_unresolved() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile("using Gtk 4.0;\nBox {\n  spacing: bind item;\n}", cache);
        assert!(doc
            .diagnostics
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnresolvedReference && d.message.contains("list-item factory")));
    }

    #[test]
    fn item_inside_a_list_item_factory_resolves_via_cast_and_lookup() {
        let (cache, _guard) = gtk_cache();
        let doc = Document::compile(
            "using Gtk 4.0;\nBox {\n  BuilderListItemFactory {\n    template {\n      Box {\n        visible: bind item as <Gtk.ListItem>.selected;\n      }\n    }\n  }\n}",
            cache,
        );
        assert!(
            !doc.diagnostics.diagnostics.iter().any(|d| d.severity == crate::diagnostics::Severity::Error),
            "unexpected errors: {:?}",
            doc.diagnostics.diagnostics
        );
    }
}

fn check_value(doc: &mut Document, check: ValueCheck) {
    let scope = doc.scope_for(check.value);
    let Some(found) = infer_value_type(doc, check.value, &scope) else {
        return;
    };
    if found.assignable_to(&check.expected) {
        return;
    }
    let span = doc.span(check.value);
    if found.castable_to(&check.expected) {
        doc.diagnostics.push(
            Diagnostic::type_mismatch(
                format!(
                    "expected `{}`, found `{}`; the value is convertible but not directly assignable",
                    check.expected.name(),
                    found.name()
                ),
                span,
            )
            .with_action(CodeAction::new(
                format!("Wrap in `as {}`", check.expected.name()),
                format!("as {}", check.expected.name()),
            )),
        );
    } else {
        doc.diagnostics.push(Diagnostic::type_mismatch(
            format!("expected `{}`, found `{}`", check.expected.name(), found.name()),
            span,
        ));
    }
}

/// Infers the static type of a `Value*` node, or `None` when the value's
/// type is either unambiguous-by-construction (a bare numeric literal,
/// which the loader accepts for any numeric or boolean expectation) or
/// genuinely undeterminable (an unresolved identifier, a closure call's
/// return type) — in both cases there is nothing useful to compare against
/// the expected type, so the conformance check is skipped rather than
/// forced.
fn infer_value_type(doc: &Document, id: NodeId, scope: &Scope) -> Option<Type> {
    match doc.payload(id) {
        NodePayload::ValueLiteral(LiteralRaw::Quoted(_)) => Some(Type::Basic(BasicType::StringT)),
        NodePayload::ValueLiteral(LiteralRaw::Number(_)) => None,
        NodePayload::ValueTranslated { .. } => Some(Type::Basic(BasicType::StringT)),
        NodePayload::ValueIdentFlag { name } => match name.as_str() {
            "true" | "false" => Some(Type::Basic(BasicType::Boolean)),
            _ => None,
        },
        NodePayload::ValueFlags { .. } => None,
        NodePayload::ValueObject => {
            let obj = *doc.children(id).first()?;
            match doc.payload(obj) {
                NodePayload::Object { class, .. } => Some(class.clone()),
                _ => None,
            }
        }
        NodePayload::ValueArray => {
            let elems: Vec<Type> = doc
                .children(id)
                .iter()
                .filter_map(|&c| infer_value_type(doc, c, scope))
                .collect();
            Type::common_ancestor(&elems).map(|t| Type::Array(Box::new(t)))
        }
        NodePayload::ValueExpr | NodePayload::ValueBind { .. } => {
            let expr = *doc.children(id).first()?;
            infer_expr_type(doc, expr, scope)
        }
        _ => None,
    }
}

/// Infers the static type of an `Expr` node (§4.6). `Lookup` on a base of
/// unknown type and `Closure` (whose return type is user code, not
/// introspected) both resolve to `None` — "cannot determine type" is not
/// itself an error, it just opts the surrounding value out of the
/// conformance check.
fn infer_expr_type(doc: &Document, id: NodeId, scope: &Scope) -> Option<Type> {
    match doc.payload(id) {
        NodePayload::Expr(ExprKind::Literal(LiteralRaw::Quoted(_))) => Some(Type::Basic(BasicType::StringT)),
        NodePayload::Expr(ExprKind::Literal(LiteralRaw::Number(_))) => None,
        NodePayload::Expr(ExprKind::Translated { .. }) => Some(Type::Basic(BasicType::StringT)),
        NodePayload::Expr(ExprKind::IdentLiteral(name)) => {
            if name == "item" {
                if let Some(t) = scope.item_type() {
                    return Some(t.clone());
                }
            }
            let target = scope.lookup(name)?;
            match doc.payload(target) {
                NodePayload::Object { class, .. } => Some(class.clone()),
                _ => None,
            }
        }
        NodePayload::Expr(ExprKind::Lookup { property }) => {
            let base = *doc.children(id).first()?;
            let base_ty = infer_expr_type(doc, base, scope)?;
            base_ty.property(property).map(|p| p.type_.clone())
        }
        NodePayload::Expr(ExprKind::Cast { target, .. }) => Some(target.clone()),
        NodePayload::Expr(ExprKind::Closure { .. }) => None,
        NodePayload::Expr(ExprKind::Try) => {
            let branches: Vec<Type> = doc
                .children(id)
                .iter()
                .filter_map(|&c| infer_expr_type(doc, c, scope))
                .collect();
            Type::common_ancestor(&branches)
        }
        _ => None,
    }
}

//! Grammar declarations (§4.5: "a grammar expression used by C4 to
//! construct its group") for every AST node kind. This is the concrete
//! C4-configuring layer C5 owns; [`super::lower`] turns the resulting
//! [`ParseGroup`] tree into typed nodes.

use crate::expr::expression_grammar;
use crate::parse::{
    any_of, close_brace, close_bracket, comma, delimited, exact, expected, group, keyword, lazy,
    op, open_brace, open_bracket, optional, seq, statement, stmt_end, use_exact, use_ident,
    use_literal, use_number, use_quoted, zero_or_more, Node, Value,
};
use crate::parse::ParseGroup;

pub const KIND_UI: &str = "ui";
pub const KIND_USING: &str = "using";
pub const KIND_TRANSLATION_DOMAIN: &str = "translation_domain";
pub const KIND_TEMPLATE: &str = "template";
pub const KIND_OBJECT: &str = "object";
pub const KIND_OBJECT_CONTENT: &str = "object_content";
pub const KIND_PROPERTY: &str = "property";
pub const KIND_SIGNAL: &str = "signal";
pub const KIND_ACCESSIBILITY: &str = "accessibility";
pub const KIND_ACCESSIBILITY_PROP: &str = "accessibility_prop";
pub const KIND_BRACKETED_CHILD: &str = "bracketed_child";
pub const KIND_LIST_ITEM_FACTORY: &str = "list_item_factory";
pub const KIND_TYPE_NAME: &str = crate::expr::KIND_TYPE_NAME;

pub const KIND_VALUE_TRANSLATED: &str = "value.translated";
pub const KIND_VALUE_LITERAL: &str = "value.literal";
pub const KIND_VALUE_IDENT: &str = "value.ident";
pub const KIND_VALUE_FLAGS: &str = "value.flags";
pub const KIND_VALUE_OBJECT: &str = "value.object";
pub const KIND_VALUE_ARRAY: &str = "value.array";
pub const KIND_VALUE_EXPR: &str = "value.expr";
pub const KIND_VALUE_BIND: &str = "value.bind";

/// `Namespace.ClassName` | `.ClassName` | `ClassName`, shared with the
/// expression sub-language's cast target grammar.
pub fn type_name_grammar() -> Box<dyn Node> {
    crate::expr::type_name_grammar()
}

/// `using <Namespace> <version>;`
pub fn using_grammar() -> Box<dyn Node> {
    group(
        KIND_USING,
        statement(vec![
            keyword("using"),
            expected(use_ident("namespace"), "a namespace name"),
            expected(use_number("version"), "a version number"),
        ]),
    )
}

/// `translation-domain "domain";`
pub fn translation_domain_grammar() -> Box<dyn Node> {
    group(
        KIND_TRANSLATION_DOMAIN,
        statement(vec![keyword("translation-domain"), expected(use_quoted("domain"), "a quoted string")]),
    )
}

fn value_grammar_boxed() -> Box<dyn Node> {
    value_grammar()
}

/// The `value` production: the first alternative that matches wins, tried
/// in the priority order the sample corpus exercises (most specific first).
pub fn value_grammar() -> Box<dyn Node> {
    any_of(vec![
        bind_value_grammar(),
        expr_value_grammar(),
        translated_value_grammar(),
        array_value_grammar(),
        object_value_grammar(),
        flags_value_grammar(),
        literal_value_grammar(),
        ident_value_grammar(),
    ])
}

pub fn literal_value_grammar() -> Box<dyn Node> {
    group(KIND_VALUE_LITERAL, any_of(vec![use_number("value"), use_quoted("value")]))
}

pub fn ident_value_grammar() -> Box<dyn Node> {
    group(KIND_VALUE_IDENT, use_ident("value"))
}

/// `A | B | C` — two or more pipe-separated identifiers.
pub fn flags_value_grammar() -> Box<dyn Node> {
    group(
        KIND_VALUE_FLAGS,
        seq(vec![
            use_ident_into("members"),
            op("|"),
            use_ident_into("members"),
            zero_or_more(seq(vec![op("|"), use_ident_into("members")])),
        ]),
    )
}

/// `use_ident` only records one value per key; flags needs a repeated
/// capture so each member is pushed as its own child group instead.
fn use_ident_into(key: &'static str) -> Box<dyn Node> {
    group(key, use_ident("name"))
}

pub fn translated_value_grammar() -> Box<dyn Node> {
    group(
        KIND_VALUE_TRANSLATED,
        any_of(vec![
            seq(vec![
                exact("_"),
                crate::parse::open_paren(),
                expected(use_quoted("value"), "a quoted string"),
                expected(crate::parse::close_paren(), "')'"),
            ]),
            seq(vec![
                exact("C_"),
                crate::parse::open_paren(),
                expected(use_quoted("context"), "a quoted string"),
                comma(),
                expected(use_quoted("value"), "a quoted string"),
                optional(comma()),
                expected(crate::parse::close_paren(), "')'"),
            ]),
        ]),
    )
}

pub fn array_value_grammar() -> Box<dyn Node> {
    group(
        KIND_VALUE_ARRAY,
        seq(vec![
            open_bracket(),
            delimited(lazy(value_grammar_boxed), comma()),
            expected(close_bracket(), "']'"),
        ]),
    )
}

pub fn object_value_grammar() -> Box<dyn Node> {
    object_grammar()
}

/// `expr <expression>`
pub fn expr_value_grammar() -> Box<dyn Node> {
    group(KIND_VALUE_EXPR, seq(vec![keyword("expr"), expected(expression_grammar(), "an expression")]))
}

/// `bind <expr>` or `bind source.property [flag]*`.
pub fn bind_value_grammar() -> Box<dyn Node> {
    group(
        KIND_VALUE_BIND,
        seq(vec![
            keyword("bind"),
            expected(expression_grammar(), "a binding source expression"),
            zero_or_more(any_of(vec![
                seq(vec![keyword("bidirectional"), use_literal("bidirectional", Value::Bool(true))]),
                seq(vec![keyword("no-sync-create"), use_literal("no_sync_create", Value::Bool(true))]),
                seq(vec![keyword("inverted"), use_literal("inverted", Value::Bool(true))]),
            ])),
        ]),
    )
}

/// `name: value;`
pub fn property_grammar() -> Box<dyn Node> {
    group(
        KIND_PROPERTY,
        statement(vec![use_ident("name"), expected(op(":"), "':'"), expected(value_grammar(), "a value")]),
    )
}

/// `name[::detail] => handler() [swapped|after] ;`
pub fn signal_grammar() -> Box<dyn Node> {
    group(
        KIND_SIGNAL,
        statement(vec![
            use_ident("name"),
            optional(seq(vec![op("::"), use_ident("detail")])),
            expected(op("=>"), "'=>'"),
            expected(use_ident("handler"), "a handler name"),
            expected(crate::parse::open_paren(), "'('"),
            optional(use_ident("object_arg")),
            expected(crate::parse::close_paren(), "')'"),
            zero_or_more(any_of(vec![
                seq(vec![keyword("swapped"), use_literal("swapped", Value::Bool(true))]),
                seq(vec![keyword("after"), use_literal("after", Value::Bool(true))]),
            ])),
        ]),
    )
}

pub const ACCESSIBILITY_PROPS: &[&str] = &[
    "label", "description", "role", "checked", "disabled", "expanded", "hidden", "pressed",
    "selected", "invalid", "value",
];

pub fn accessibility_prop_grammar() -> Box<dyn Node> {
    group(
        KIND_ACCESSIBILITY_PROP,
        statement(vec![
            use_ident("name"),
            expected(op(":"), "':'"),
            expected(
                any_of(vec![
                    seq(vec![
                        open_bracket(),
                        delimited(use_ident_into("targets"), comma()),
                        expected(close_bracket(), "']'"),
                    ]),
                    value_grammar(),
                ]),
                "a value",
            ),
        ]),
    )
}

pub fn accessibility_grammar() -> Box<dyn Node> {
    group(
        KIND_ACCESSIBILITY,
        seq(vec![
            keyword("accessibility"),
            expected(open_brace(), "'{'"),
            zero_or_more(accessibility_prop_grammar()),
            expected(close_brace(), "'}'"),
        ]),
    )
}

fn object_content_item() -> Box<dyn Node> {
    any_of(vec![
        accessibility_grammar(),
        bracketed_child_object_grammar(),
        list_item_factory_grammar(),
        Box::new(StatementDispatch),
    ])
}

/// `template { ... }` — a `Gtk.BuilderListItemFactory`'s row template.
/// Unambiguous against `StatementDispatch`'s object/property/signal
/// dispatch: `template` is a keyword here, never a legal class or property
/// name, so it must be tried before the identifier-led alternatives.
pub fn list_item_factory_grammar() -> Box<dyn Node> {
    group(
        KIND_LIST_ITEM_FACTORY,
        seq(vec![keyword("template"), expected(lazy(object_content_boxed), "'{'")]),
    )
}

/// `[child-role] ChildObject { ... }` — unambiguous: it is the only
/// production starting with `[`. Wrapped in its own group (rather than
/// merging `child_role` as a bare key into the surrounding object content)
/// so that multiple bracketed children in the same object don't clobber
/// each other's role name.
fn bracketed_child_object_grammar() -> Box<dyn Node> {
    group(
        KIND_BRACKETED_CHILD,
        seq(vec![
            open_bracket(),
            expected(use_ident("child_role"), "a child role name"),
            expected(close_bracket(), "']'"),
            expected(object_grammar(), "a child object"),
        ]),
    )
}

/// Properties (`name: value;`), signals (`name[::detail] => handler();`),
/// and bare child objects (`ClassName { ... }`) all start with an
/// identifier. `Statement` recovers from a missing `:` or `=>` by marking
/// its group incomplete and reporting success regardless, so an `AnyOf` of
/// their three grammars would let whichever is tried first "win" on every
/// statement instead of falling through to the right one. A non-consuming
/// lookahead past the leading name (and, for the signal case, its optional
/// `::detail`) resolves the ambiguity before any of the three commits,
/// exactly as a hand-written recursive-descent parser would peek to decide.
struct StatementDispatch;

impl Node for StatementDispatch {
    fn try_match(&self, cur: &mut crate::parse::Cursor) -> crate::parse::StepResult {
        match classify_statement(cur) {
            StatementShape::Property => Ok(cur.attempt(property_grammar().as_ref())?.succeeded()),
            StatementShape::Signal => Ok(cur.attempt(signal_grammar().as_ref())?.succeeded()),
            StatementShape::Object => Ok(cur.attempt(object_grammar().as_ref())?.succeeded()),
        }
    }
}

enum StatementShape {
    Property,
    Signal,
    Object,
}

/// Peeks past the leading name to classify the statement, without
/// consuming anything: runs a throwaway probe and always reports failure
/// so [`crate::parse::Cursor::attempt`] rewinds unconditionally.
fn classify_statement(cur: &mut crate::parse::Cursor) -> StatementShape {
    struct Probe(std::cell::Cell<StatementShape>);
    impl Node for Probe {
        fn try_match(&self, cur: &mut crate::parse::Cursor) -> crate::parse::StepResult {
            use crate::token::TokenKind;
            if cur.next_token().kind != TokenKind::Ident {
                return Ok(false);
            }
            let source = cur.source();
            let peeked = cur.peek_token();
            if peeked.kind == TokenKind::Op && peeked.text(source) == "::" {
                self.0.set(StatementShape::Signal);
                return Ok(false);
            }
            let shape = match (peeked.kind, peeked.text(source)) {
                (TokenKind::Op, ":") => StatementShape::Property,
                (TokenKind::Op, "=>") => StatementShape::Signal,
                _ => StatementShape::Object,
            };
            self.0.set(shape);
            Ok(false)
        }
    }
    let probe = Probe(std::cell::Cell::new(StatementShape::Object));
    let _ = cur.attempt(&probe);
    probe.0.into_inner()
}

fn object_content_boxed() -> Box<dyn Node> {
    object_content_grammar()
}

pub fn object_content_grammar() -> Box<dyn Node> {
    group(
        KIND_OBJECT_CONTENT,
        seq(vec![
            open_brace(),
            crate::parse::until(object_content_item(), close_brace()),
        ]),
    )
}

/// `Namespace.Class [id] { ... }`
pub fn object_grammar() -> Box<dyn Node> {
    group(
        KIND_OBJECT,
        seq(vec![
            expected(type_name_grammar(), "a class name"),
            optional(use_ident("id")),
            expected(lazy(object_content_boxed), "'{'"),
        ]),
    )
}

/// `template Name [: Parent] { ... }`
pub fn template_grammar() -> Box<dyn Node> {
    group(
        KIND_TEMPLATE,
        seq(vec![
            keyword("template"),
            expected(use_ident("name"), "a template name"),
            optional(seq(vec![op(":"), expected(type_name_grammar(), "a parent class")])),
            expected(lazy(object_content_boxed), "'{'"),
        ]),
    )
}

/// The whole file: one toolkit `using`, further imports, an optional
/// translation domain, then any number of top-level objects/templates.
pub fn ui_grammar() -> Box<dyn Node> {
    group(
        KIND_UI,
        seq(vec![
            expected(using_grammar(), "a `using` statement"),
            zero_or_more(using_grammar()),
            optional(translation_domain_grammar()),
            zero_or_more(any_of(vec![template_grammar(), object_grammar()])),
            expected(crate::parse::eof(), "end of file"),
        ]),
    )
}

/// Helper used by [`super::lower`] to read a repeated ident list captured
/// via [`use_ident_into`] (flags' `members`, accessibility's `targets`):
/// each element is its own one-field child group rather than a single key,
/// since a plain `use_ident` would let a later repetition overwrite an
/// earlier one.
pub fn ident_list<'a>(group: &'a ParseGroup, child_kind: &str) -> Vec<&'a str> {
    group
        .children
        .iter()
        .filter(|g| g.kind == child_kind)
        .filter_map(|g| g.get("name").and_then(Value::as_ident))
        .collect()
}

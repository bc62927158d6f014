//! The expression sub-language (C6): the small typed expression grammar
//! embedded in property values and signal handlers — literals, translated
//! strings, identifier lookups, casts, closures, and `try` blocks.
//!
//! Grammar (left-to-right, the only place precedence matters is the
//! trailing postfix loop — there is no infix operator precedence to climb):
//!
//! ```text
//! expr     := primary {postfix}
//! primary  := translated | try | closure | literal | '(' expr ')'
//! postfix  := '.' ident          (lookup)
//!           | 'as' ('<' type '>' | '(' type ')')   (cast)
//! ```

use crate::parse::{
    any_of, close_paren, comma, delimited, exact, expected, group, keyword, lazy, op, open_paren,
    seq, use_exact, use_ident, use_literal, use_number, use_quoted, zero_or_more, Node, Value,
};

pub const KIND_LITERAL: &str = "expr.literal";
pub const KIND_IDENT_LITERAL: &str = "expr.ident_literal";
pub const KIND_TRANSLATED: &str = "expr.translated";
pub const KIND_LOOKUP: &str = "expr.lookup";
pub const KIND_CAST: &str = "expr.cast";
pub const KIND_TYPE_NAME: &str = "expr.type_name";
pub const KIND_CLOSURE: &str = "expr.closure";
pub const KIND_CLOSURE_ARG: &str = "expr.closure_arg";
pub const KIND_TRY: &str = "expr.try";
pub const KIND_EXPRESSION: &str = "expr.expression";

/// `Namespace.ClassName`, `.ClassName` (an extern/ignore-gir type), or a
/// bare `ClassName` resolved against the file's imports.
pub fn type_name_grammar() -> Box<dyn Node> {
    group(
        KIND_TYPE_NAME,
        any_of(vec![
            seq(vec![use_ident("namespace"), op("."), use_ident("class_name")]),
            seq(vec![
                op("."),
                use_ident("class_name"),
                use_literal("ignore_gir", Value::Bool(true)),
            ]),
            use_ident("class_name"),
        ]),
    )
}

/// A bare number or quoted string.
pub fn literal_grammar() -> Box<dyn Node> {
    group(KIND_LITERAL, any_of(vec![use_number("value"), use_quoted("value")]))
}

/// A bare identifier, resolved later against the enclosing scope (an
/// object id, `template`, or the special `item` in a list-item expression).
pub fn ident_literal_grammar() -> Box<dyn Node> {
    group(KIND_IDENT_LITERAL, use_ident("value"))
}

/// `_("text")` or `C_("context", "text")`.
pub fn translated_grammar() -> Box<dyn Node> {
    group(
        KIND_TRANSLATED,
        any_of(vec![
            seq(vec![
                exact("_"),
                open_paren(),
                expected(use_quoted("value"), "a quoted string"),
                expected(close_paren(), "')'"),
            ]),
            seq(vec![
                exact("C_"),
                open_paren(),
                expected(use_quoted("context"), "a quoted string"),
                comma(),
                expected(use_quoted("value"), "a quoted string"),
                crate::parse::optional(comma()),
                expected(close_paren(), "')'"),
            ]),
        ]),
    )
}

/// `.property_name`.
pub fn lookup_grammar() -> Box<dyn Node> {
    group(KIND_LOOKUP, seq(vec![op("."), use_ident("property")]))
}

/// `as <Type>` (current syntax) or `as (Type)` (legacy, flagged for upgrade).
pub fn cast_grammar() -> Box<dyn Node> {
    group(
        KIND_CAST,
        seq(vec![
            keyword("as"),
            any_of(vec![
                seq(vec![
                    op("<"),
                    expected(type_name_grammar(), "type name"),
                    expected(op(">"), "'>'"),
                ]),
                seq(vec![
                    use_exact("lparen", "("),
                    type_name_grammar(),
                    expected(use_exact("rparen", ")"), "')'"),
                ]),
            ]),
        ]),
    )
}

/// One argument to a closure call; just an expression, but kept as its own
/// group so the validator can attach a distinct inferred-type context to it.
pub fn closure_arg_grammar() -> Box<dyn Node> {
    group(KIND_CLOSURE_ARG, lazy(expression_grammar_boxed))
}

/// `$name(arg, arg, ...)`, optionally `$$name(...)` for a builtin.
pub fn closure_grammar() -> Box<dyn Node> {
    group(
        KIND_CLOSURE,
        seq(vec![
            crate::parse::optional(seq(vec![exact("$"), use_literal("extern", Value::Bool(true))])),
            use_ident("name"),
            open_paren(),
            delimited(closure_arg_grammar(), comma()),
            expected(close_paren(), "')'"),
        ]),
    )
}

/// `try { e1, e2, ... }`.
pub fn try_grammar() -> Box<dyn Node> {
    group(
        KIND_TRY,
        seq(vec![
            keyword("try"),
            use_exact("lbrace", "{"),
            delimited(lazy(expression_grammar_boxed), comma()),
            expected(use_exact("rbrace", "}"), "'}'"),
        ]),
    )
}

/// `translated | try | closure | literal | ident | '(' expr ')'`, followed
/// by zero or more postfix lookups/casts.
pub fn expression_grammar() -> Box<dyn Node> {
    group(
        KIND_EXPRESSION,
        seq(vec![
            any_of(vec![
                translated_grammar(),
                try_grammar(),
                closure_grammar(),
                literal_grammar(),
                seq(vec![open_paren(), lazy(expression_grammar_boxed), expected(close_paren(), "')'")]),
                ident_literal_grammar(),
            ]),
            zero_or_more(any_of(vec![lookup_grammar(), cast_grammar()])),
        ]),
    )
}

fn expression_grammar_boxed() -> Box<dyn Node> {
    expression_grammar()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Cursor;
    use crate::token::tokenize;

    fn parse_expr(source: &str) -> (Option<crate::parse::ParseGroup>, Vec<crate::diagnostics::Diagnostic>) {
        let (tokens, _) = tokenize(source);
        let cur = Cursor::new(&tokens, source);
        cur.run(expression_grammar().as_ref())
    }

    #[test]
    fn parses_bare_ident_as_ident_literal() {
        let (group, diags) = parse_expr("foo");
        assert!(diags.is_empty());
        let g = group.unwrap();
        assert_eq!(g.children[0].kind, KIND_IDENT_LITERAL);
    }

    #[test]
    fn parses_lookup_chain() {
        let (group, diags) = parse_expr("foo.bar.baz");
        assert!(diags.is_empty());
        let g = group.unwrap();
        let lookups: Vec<_> = g.children_of_kind(KIND_LOOKUP).collect();
        assert_eq!(lookups.len(), 2);
        assert_eq!(lookups[0].get("property").unwrap().as_ident(), Some("bar"));
        assert_eq!(lookups[1].get("property").unwrap().as_ident(), Some("baz"));
    }

    #[test]
    fn parses_cast_with_angle_brackets() {
        let (group, diags) = parse_expr("foo as <Gtk.Widget>");
        assert!(diags.is_empty());
        let g = group.unwrap();
        let cast = g.children_of_kind(KIND_CAST).next().unwrap();
        let type_name = cast.children_of_kind(KIND_TYPE_NAME).next().unwrap();
        assert_eq!(type_name.get("namespace").unwrap().as_ident(), Some("Gtk"));
        assert_eq!(type_name.get("class_name").unwrap().as_ident(), Some("Widget"));
    }

    #[test]
    fn legacy_paren_cast_still_parses() {
        let (group, diags) = parse_expr("foo as (Widget)");
        assert!(diags.is_empty());
        let g = group.unwrap();
        let cast = g.children_of_kind(KIND_CAST).next().unwrap();
        assert!(cast.get("lparen").is_some());
    }

    #[test]
    fn translated_string_requires_closing_paren() {
        let (_, diags) = parse_expr("_(\"hi\"");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Expected"));
    }

    #[test]
    fn closure_parses_with_args() {
        let (group, diags) = parse_expr("$my_func(a, b)");
        assert!(diags.is_empty());
        let g = group.unwrap();
        let closure = g.children_of_kind(KIND_CLOSURE).next().unwrap();
        assert_eq!(closure.get("name").unwrap().as_ident(), Some("my_func"));
        assert_eq!(closure.children_of_kind(KIND_CLOSURE_ARG).count(), 2);
    }

    #[test]
    fn try_expr_parses_multiple_branches() {
        let (group, diags) = parse_expr("try { a, b, c }");
        assert!(diags.is_empty());
        let g = group.unwrap();
        let try_node = g.children_of_kind(KIND_TRY).next().unwrap();
        assert_eq!(try_node.children_of_kind(KIND_EXPRESSION).count(), 3);
    }

    #[test]
    fn parenthesized_expression_recurses() {
        let (group, diags) = parse_expr("(foo.bar) as <Gtk.Widget>");
        assert!(diags.is_empty());
        let g = group.unwrap();
        assert!(g.children_of_kind(KIND_EXPRESSION).next().is_some());
        assert!(g.children_of_kind(KIND_CAST).next().is_some());
    }
}

//! Per-kind payload data (§3 Data Model's Object/Property/Signal/Value
//! variants, plus the expression sub-language's node kinds from §4.6).
//!
//! Structural relationships (parent, ordered children) live uniformly on
//! [`super::ArenaNode`]; this module only carries the scalar/typed data
//! specific to each AST kind, mirroring how the source grammar's per-kind
//! classes each declared their own fields alongside the shared base.

use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralRaw {
    Number(f64),
    Quoted(String),
}

#[derive(Debug, Clone)]
pub enum NodePayload {
    Ui,
    Using {
        namespace: String,
        version: String,
    },
    TranslationDomain {
        domain: String,
    },
    /// `name` is the template's declared class name; `parent` the optional
    /// `: ParentClass` supertype. `children[0]` is its `ObjectContent`.
    Template {
        name: String,
        parent: Option<Type>,
    },
    /// `children[0]` is its `ObjectContent`.
    Object {
        class: Type,
        id: Option<String>,
        /// Bracketed child-role this object was declared under, if any
        /// (`[titlebar] HeaderBar { ... }`), used only by the XML adapter.
        child_role: Option<String>,
    },
    /// Children are `Property` | `Signal` | `Object` | `Accessibility` nodes.
    ObjectContent,
    /// `children[0]`, if present, is the value (one of the `Value*` kinds).
    Property {
        name: String,
    },
    Signal {
        name: String,
        detail: Option<String>,
        handler: String,
        object_arg: Option<String>,
        swapped: bool,
        after: bool,
    },
    /// Children are `AccessibilityProp` nodes.
    Accessibility,
    /// `children[0]`, if present, is the value.
    AccessibilityProp {
        name: String,
    },
    ValueTranslated {
        text: String,
        translator_context: Option<String>,
    },
    ValueLiteral(LiteralRaw),
    /// An unresolved bare identifier, resolved post-facto against an enum
    /// member, a boolean literal, or an object id (§3 Value variants).
    ValueIdentFlag {
        name: String,
    },
    ValueFlags {
        members: Vec<String>,
    },
    /// `children[0]` is the nested `Object`.
    ValueObject,
    /// Children are the array's `Value*` elements.
    ValueArray,
    /// `children[0]` is the `Expr` root.
    ValueExpr,
    /// `bind <expr> [flags]`; `children[0]` is the source `Expr`.
    ValueBind {
        bidirectional: bool,
        no_sync_create: bool,
        inverted: bool,
    },
    /// The `template { ... }` sub-template nested inside a
    /// `Gtk.BuilderListItemFactory`; `children[0]` is its `ObjectContent`.
    /// Opens a `Scope::Local` binding `item` to `item_type` and its own,
    /// non-inherited id namespace.
    ListItemFactory {
        item_type: Type,
    },
    Expr(ExprKind),
}

/// The expression sub-language's node kinds (§4.6 grammar). Children:
/// `Lookup`/`Cast` have one child (the base expression); `Closure` has one
/// child per argument; `Try` has one child per branch; `Literal`,
/// `IdentLiteral`, and `Translated` are leaves.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(LiteralRaw),
    /// A bare identifier; resolved against scope during validation to an
    /// object id, the special `item` binding, or left unresolved (error).
    IdentLiteral(String),
    Translated {
        text: String,
        translator_context: Option<String>,
    },
    Lookup {
        property: String,
    },
    Cast {
        target: Type,
        /// True for the legacy `as (T)` form, which warns with an upgrade action.
        legacy_paren: bool,
    },
    Closure {
        name: String,
        is_extern: bool,
    },
    Try,
}

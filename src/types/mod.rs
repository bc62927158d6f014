//! The type system (C3): immutable types loaded from introspection data,
//! plus the assignability/castability/common-ancestor relations.

use std::collections::BTreeMap;
use std::rc::Rc;

mod numeric;
pub use numeric::{FloatWidth, IntWidth, Signedness};

/// A member of an enumeration or bitfield.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub nick: String,
    pub value: i64,
    pub docs: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub type_: Type,
    pub construct_only: bool,
    pub writable: bool,
    pub deprecated: bool,
    pub deprecated_doc: Option<String>,
    pub doc: Option<String>,
}

impl Property {
    pub fn signature(&self, owner: &str) -> String {
        format!("{owner}:{}", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Signal {
    pub name: String,
    pub deprecated: bool,
    pub deprecated_doc: Option<String>,
}

/// A tagged, reference-counted type value. Cloning a `Type` is cheap: class
/// and interface payloads are `Rc`-shared with the `Namespace` that owns them.
#[derive(Debug, Clone)]
pub enum Type {
    Basic(BasicType),
    Enumeration(Rc<EnumerationType>),
    Bitfield(Rc<EnumerationType>),
    Class(Rc<ClassType>),
    Interface(Rc<InterfaceType>),
    Array(Box<Type>),
    /// A namespace-qualified placeholder for a type the core cannot
    /// introspect, e.g. an application template class.
    Extern { namespace: String, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicType {
    Boolean,
    Int(IntWidth, Signedness),
    Float(FloatWidth),
    StringT,
    TypeHandle,
    Character,
    Void,
}

#[derive(Debug, Clone)]
pub struct EnumerationType {
    pub namespace: String,
    pub name: String,
    pub glib_type_name: String,
    pub members: Vec<Member>,
    pub deprecated: bool,
    pub deprecated_doc: Option<String>,
}

impl EnumerationType {
    pub fn member_by_name(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.name == name || m.nick == name)
    }
}

#[derive(Debug, Clone)]
pub struct ClassType {
    pub namespace: String,
    pub name: String,
    pub glib_type_name: String,
    pub parent: Option<Type>,
    pub implements: Vec<Type>,
    pub properties: BTreeMap<String, Property>,
    pub signals: BTreeMap<String, Signal>,
    pub abstract_: bool,
    pub deprecated: bool,
    pub deprecated_doc: Option<String>,
    /// True when introspection for this class's members could not be
    /// loaded (distinct from `Type::Extern`, which never had any).
    pub incomplete: bool,
}

#[derive(Debug, Clone)]
pub struct InterfaceType {
    pub namespace: String,
    pub name: String,
    pub glib_type_name: String,
    pub prerequisites: Vec<Type>,
    pub properties: BTreeMap<String, Property>,
    pub signals: BTreeMap<String, Signal>,
    pub deprecated: bool,
    pub deprecated_doc: Option<String>,
}

impl Type {
    pub fn name(&self) -> String {
        match self {
            Type::Basic(b) => b.name().to_string(),
            Type::Enumeration(e) | Type::Bitfield(e) => e.name.clone(),
            Type::Class(c) => c.name.clone(),
            Type::Interface(i) => i.name.clone(),
            Type::Array(inner) => format!("{}[]", inner.name()),
            Type::Extern { name, .. } => name.clone(),
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            Type::Basic(b) => b.name().to_string(),
            Type::Enumeration(e) | Type::Bitfield(e) => format!("{}.{}", e.namespace, e.name),
            Type::Class(c) => format!("{}.{}", c.namespace, c.name),
            Type::Interface(i) => format!("{}.{}", i.namespace, i.name),
            Type::Array(inner) => format!("{}[]", inner.full_name()),
            Type::Extern { namespace, name } => format!("{namespace}.{name}"),
        }
    }

    pub fn glib_type_name(&self) -> String {
        match self {
            Type::Basic(b) => b.glib_type_name().to_string(),
            Type::Enumeration(e) | Type::Bitfield(e) => e.glib_type_name.clone(),
            Type::Class(c) => c.glib_type_name.clone(),
            Type::Interface(i) => i.glib_type_name.clone(),
            Type::Array(inner) => format!("{}*", inner.glib_type_name()),
            Type::Extern { name, .. } => name.clone(),
        }
    }

    pub fn incomplete(&self) -> bool {
        match self {
            Type::Extern { .. } => true,
            Type::Class(c) => c.incomplete,
            _ => false,
        }
    }

    pub fn deprecated(&self) -> bool {
        match self {
            Type::Enumeration(e) | Type::Bitfield(e) => e.deprecated,
            Type::Class(c) => c.deprecated,
            Type::Interface(i) => i.deprecated,
            _ => false,
        }
    }

    pub fn deprecated_doc(&self) -> Option<&str> {
        match self {
            Type::Enumeration(e) | Type::Bitfield(e) => e.deprecated_doc.as_deref(),
            Type::Class(c) => c.deprecated_doc.as_deref(),
            Type::Interface(i) => i.deprecated_doc.as_deref(),
            _ => None,
        }
    }

    /// Parent class followed by implemented interfaces (classes), or
    /// prerequisites (interfaces); empty for everything else.
    pub fn parent_types(&self) -> Vec<Type> {
        match self {
            Type::Class(c) => {
                let mut v = Vec::new();
                if let Some(p) = &c.parent {
                    v.push(p.clone());
                }
                v.extend(c.implements.iter().cloned());
                v
            }
            Type::Interface(i) => i.prerequisites.clone(),
            _ => Vec::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        match self {
            Type::Class(c) => c.properties.get(name),
            Type::Interface(i) => i.properties.get(name),
            _ => None,
        }
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        match self {
            Type::Class(c) => c.signals.get(name),
            Type::Interface(i) => i.signals.get(name),
            _ => None,
        }
    }

    /// Property names declared directly on this type (not inherited),
    /// used for "did you mean" suggestions.
    pub fn property_names(&self) -> Vec<&str> {
        match self {
            Type::Class(c) => c.properties.keys().map(String::as_str).collect(),
            Type::Interface(i) => i.properties.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn signal_names(&self) -> Vec<&str> {
        match self {
            Type::Class(c) => c.signals.keys().map(String::as_str).collect(),
            Type::Interface(i) => i.signals.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_object_like(&self) -> bool {
        matches!(self, Type::Class(_) | Type::Interface(_) | Type::Extern { .. })
    }

    /// Reflexive, chain-walking assignability (§4.3).
    pub fn assignable_to(&self, other: &Type) -> bool {
        if self.type_eq(other) {
            return true;
        }
        match (self, other) {
            (Type::Class(_) | Type::Interface(_) | Type::Extern { .. }, _) if other.is_object_like() => {
                self.parent_types().iter().any(|p| p.assignable_to(other))
            }
            (Type::Array(a), Type::Array(b)) => a.assignable_to(b),
            (Type::Basic(a), Type::Basic(b)) => basic_assignable(*a, *b),
            (Type::Enumeration(a), Type::Enumeration(b)) | (Type::Bitfield(a), Type::Bitfield(b)) => {
                Rc::ptr_eq(a, b)
            }
            _ => false,
        }
    }

    /// Assignability in either direction for object types, plus the wider
    /// "transformable" relation for primitives.
    pub fn castable_to(&self, other: &Type) -> bool {
        if self.is_object_like() || other.is_object_like() {
            return self.assignable_to(other) || other.assignable_to(self);
        }
        match (self, other) {
            (Type::Basic(a), Type::Basic(b)) => transformable(*a, *b),
            (Type::Enumeration(_), Type::Basic(BasicType::Int(_, _)))
            | (Type::Bitfield(_), Type::Basic(BasicType::Int(_, _)))
            | (Type::Basic(BasicType::Int(_, _)), Type::Enumeration(_))
            | (Type::Basic(BasicType::Int(_, _)), Type::Bitfield(_)) => true,
            _ => self.assignable_to(other),
        }
    }

    fn type_eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Basic(a), Type::Basic(b)) => a == b,
            (Type::Enumeration(a), Type::Enumeration(b)) => Rc::ptr_eq(a, b),
            (Type::Bitfield(a), Type::Bitfield(b)) => Rc::ptr_eq(a, b),
            (Type::Class(a), Type::Class(b)) => Rc::ptr_eq(a, b),
            (Type::Interface(a), Type::Interface(b)) => Rc::ptr_eq(a, b),
            (Type::Array(a), Type::Array(b)) => a.type_eq(b),
            (Type::Extern { namespace: n1, name: nm1 }, Type::Extern { namespace: n2, name: nm2 }) => {
                n1 == n2 && nm1 == nm2
            }
            _ => false,
        }
    }

    /// Pairwise-reduces `types` left to right; returns `None` as soon as a
    /// pair has no common type (§4.3, ported from `GirType.common_ancestor`).
    pub fn common_ancestor(types: &[Type]) -> Option<Type> {
        if types.is_empty() {
            return None;
        }
        fn pairwise(a: &Type, b: &Type) -> Option<Type> {
            let mut chain_a = vec![a.clone()];
            chain_a.extend(a.parent_types());
            let mut chain_b = vec![b.clone()];
            chain_b.extend(b.parent_types());
            for anc_a in &chain_a {
                for anc_b in &chain_b {
                    if anc_a.assignable_to(anc_b) {
                        return Some(anc_b.clone());
                    } else if anc_b.assignable_to(anc_a) {
                        return Some(anc_a.clone());
                    }
                }
            }
            None
        }
        let mut common = types[0].clone();
        for t in &types[1..] {
            common = pairwise(&common, t)?;
        }
        Some(common)
    }
}

impl BasicType {
    pub fn name(self) -> &'static str {
        match self {
            BasicType::Boolean => "gboolean",
            BasicType::Int(IntWidth::W8, Signedness::Unsigned) => "guint8",
            BasicType::Int(IntWidth::W8, Signedness::Signed) => "gint8",
            BasicType::Int(IntWidth::W16, Signedness::Unsigned) => "guint16",
            BasicType::Int(IntWidth::W16, Signedness::Signed) => "gint16",
            BasicType::Int(IntWidth::W32, Signedness::Unsigned) => "guint32",
            BasicType::Int(IntWidth::W32, Signedness::Signed) => "gint32",
            BasicType::Int(IntWidth::W64, Signedness::Unsigned) => "guint64",
            BasicType::Int(IntWidth::W64, Signedness::Signed) => "gint64",
            BasicType::Float(FloatWidth::W32) => "gfloat",
            BasicType::Float(FloatWidth::W64) => "gdouble",
            BasicType::StringT => "utf8",
            BasicType::TypeHandle => "GType",
            BasicType::Character => "gchar",
            BasicType::Void => "void",
        }
    }

    pub fn glib_type_name(self) -> &'static str {
        match self {
            BasicType::Boolean => "gboolean",
            BasicType::StringT => "gchararray",
            BasicType::TypeHandle => "GType",
            BasicType::Void => "void",
            _ => self.name(),
        }
    }

    /// The inverse of [`Self::name`]: maps a GIR fundamental type name (the
    /// `name` attribute of a `<type>` element that isn't a namespaced
    /// class/interface/enum reference) to its `BasicType`, or `None` when
    /// `name` isn't a fundamental type and should instead be looked up in
    /// the namespace graph.
    pub fn from_gir_name(name: &str) -> Option<BasicType> {
        Some(match name {
            "gboolean" | "boolean" => BasicType::Boolean,
            "gint8" => BasicType::Int(IntWidth::W8, Signedness::Signed),
            "guint8" => BasicType::Int(IntWidth::W8, Signedness::Unsigned),
            "gint16" => BasicType::Int(IntWidth::W16, Signedness::Signed),
            "guint16" => BasicType::Int(IntWidth::W16, Signedness::Unsigned),
            "gint" | "gint32" => BasicType::Int(IntWidth::W32, Signedness::Signed),
            "guint" | "guint32" => BasicType::Int(IntWidth::W32, Signedness::Unsigned),
            "glong" | "gint64" | "gssize" => BasicType::Int(IntWidth::W64, Signedness::Signed),
            "gulong" | "guint64" | "gsize" => BasicType::Int(IntWidth::W64, Signedness::Unsigned),
            "gfloat" => BasicType::Float(FloatWidth::W32),
            "gdouble" => BasicType::Float(FloatWidth::W64),
            "utf8" | "filename" => BasicType::StringT,
            "GType" => BasicType::TypeHandle,
            "gchar" | "guchar" | "gunichar" => BasicType::Character,
            "none" | "void" => BasicType::Void,
            _ => return None,
        })
    }
}

fn basic_assignable(a: BasicType, b: BasicType) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (BasicType::Int(wa, sa), BasicType::Int(wb, sb)) => {
            wa as u8 <= wb as u8 && (sa == sb || sa == Signedness::Unsigned)
        }
        (BasicType::Float(wa), BasicType::Float(wb)) => wa as u8 <= wb as u8,
        _ => false,
    }
}

fn transformable(a: BasicType, b: BasicType) -> bool {
    use BasicType::*;
    if basic_assignable(a, b) {
        return true;
    }
    match (a, b) {
        (Void, _) | (_, Void) => false,
        (Character, Int(_, _)) | (Int(_, _), Character) => true,
        (Character, Boolean) | (Boolean, Character) => true,
        (Character, Float(_)) | (Float(_), Character) => true,
        (Character, StringT) | (StringT, Character) => true,
        (Boolean, Int(_, _)) | (Int(_, _), Boolean) => true,
        (Boolean, Float(_)) | (Float(_), Boolean) => true,
        (Boolean, StringT) | (StringT, Boolean) => true,
        (Int(_, _), Float(_)) | (Float(_), Int(_, _)) => true,
        (Int(_, _), StringT) | (StringT, Int(_, _)) => true,
        (Float(_), StringT) | (StringT, Float(_)) => true,
        _ => false,
    }
}

/// A versioned grouping of types loaded from one IDR file.
#[derive(Debug, Clone)]
pub struct Namespace {
    pub name: String,
    pub version: String,
    pub classes: BTreeMap<String, Rc<ClassType>>,
    pub interfaces: BTreeMap<String, Rc<InterfaceType>>,
    pub enumerations: BTreeMap<String, Rc<EnumerationType>>,
    pub bitfields: BTreeMap<String, Rc<EnumerationType>>,
    pub includes: Vec<(String, String)>,
}

impl Namespace {
    pub fn empty(name: impl Into<String>, version: impl Into<String>) -> Self {
        Namespace {
            name: name.into(),
            version: version.into(),
            classes: BTreeMap::new(),
            interfaces: BTreeMap::new(),
            enumerations: BTreeMap::new(),
            bitfields: BTreeMap::new(),
            includes: Vec::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Type> {
        if let Some(c) = self.classes.get(name) {
            return Some(Type::Class(c.clone()));
        }
        if let Some(i) = self.interfaces.get(name) {
            return Some(Type::Interface(i.clone()));
        }
        if let Some(e) = self.enumerations.get(name) {
            return Some(Type::Enumeration(e.clone()));
        }
        if let Some(b) = self.bitfields.get(name) {
            return Some(Type::Bitfield(b.clone()));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf_class(name: &str, parent: Option<Type>) -> Type {
        Type::Class(Rc::new(ClassType {
            namespace: "T".into(),
            name: name.into(),
            glib_type_name: format!("T{name}"),
            parent,
            implements: vec![],
            properties: BTreeMap::new(),
            signals: BTreeMap::new(),
            abstract_: false,
            deprecated: false,
            deprecated_doc: None,
            incomplete: false,
        }))
    }

    #[test]
    fn assignability_is_reflexive_and_transitive_over_a_chain() {
        let base = leaf_class("Base", None);
        let mid = leaf_class("Mid", Some(base.clone()));
        let leaf = leaf_class("Leaf", Some(mid.clone()));

        assert!(leaf.assignable_to(&leaf));
        assert!(leaf.assignable_to(&mid));
        assert!(leaf.assignable_to(&base));
        assert!(!base.assignable_to(&leaf));
    }

    #[test]
    fn common_ancestor_of_siblings_is_shared_parent() {
        let base = leaf_class("Base", None);
        let a = leaf_class("A", Some(base.clone()));
        let b = leaf_class("B", Some(base.clone()));
        let common = Type::common_ancestor(&[a, b]).unwrap();
        assert_eq!(common.full_name(), "T.Base");
    }

    #[test]
    fn numeric_assignability_forbids_narrowing_and_float_to_int() {
        let u8t = Type::Basic(BasicType::Int(IntWidth::W8, Signedness::Unsigned));
        let u32t = Type::Basic(BasicType::Int(IntWidth::W32, Signedness::Unsigned));
        let f64t = Type::Basic(BasicType::Float(FloatWidth::W64));
        assert!(u8t.assignable_to(&u32t));
        assert!(!u32t.assignable_to(&u8t));
        assert!(!f64t.assignable_to(&u32t));
        assert!(u32t.assignable_to(&f64t));
    }

    proptest! {
        #[test]
        fn assignable_to_self_always_holds(width in 0u8..4, signed in any::<bool>()) {
            let w = [IntWidth::W8, IntWidth::W16, IntWidth::W32, IntWidth::W64][width as usize];
            let s = if signed { Signedness::Signed } else { Signedness::Unsigned };
            let t = Type::Basic(BasicType::Int(w, s));
            prop_assert!(t.assignable_to(&t));
        }
    }
}

//! The IDR loader (C2): locates and parses introspection (`.gir`) files.
//!
//! Parsing is a streaming SAX pass over an explicit allow-list of element
//! kinds (§9 "streaming SAX with an allow-list is preferred over a DOM");
//! everything else is skipped without allocating a DOM. Results are cached
//! by `(namespace, version)`; the cache is an explicit object threaded
//! through callers rather than a process-global (§9), so tests can reset it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::rc::Rc;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::config::SearchConfig;
use crate::error::{CoreError, CoreResult};
use crate::types::{
    BasicType, ClassType, EnumerationType, FloatWidth, InterfaceType, Member, Namespace,
    Property, Signal, Signedness, Type,
};

/// Elements this loader retains; every other element (and its subtree, via
/// depth tracking) is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Repository,
    Include,
    Namespace,
    Class,
    Interface,
    Enumeration,
    Bitfield,
    Member,
    Property,
    Signal,
    Implements,
    Prerequisite,
    Parameter,
    TypeRef,
    Doc,
    Other,
}

fn classify(local_name: &str) -> ElementKind {
    match local_name {
        "repository" => ElementKind::Repository,
        "include" => ElementKind::Include,
        "namespace" => ElementKind::Namespace,
        "class" => ElementKind::Class,
        "interface" => ElementKind::Interface,
        "enumeration" => ElementKind::Enumeration,
        "bitfield" => ElementKind::Bitfield,
        "member" => ElementKind::Member,
        "property" => ElementKind::Property,
        "glib:signal" | "signal" => ElementKind::Signal,
        "implements" => ElementKind::Implements,
        "prerequisite" => ElementKind::Prerequisite,
        "parameter" | "parameters" | "return-value" => ElementKind::Parameter,
        "type" | "array" => ElementKind::TypeRef,
        "doc" => ElementKind::Doc,
        _ => ElementKind::Other,
    }
}

fn attr(e: &quick_xml::events::BytesStart, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
        let key = key.rsplit(':').next().unwrap_or(&key).to_string();
        if key == name {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn attr_bool(e: &quick_xml::events::BytesStart, name: &str) -> bool {
    attr(e, name).map(|v| v == "1" || v == "true").unwrap_or(false)
}

/// A property as parsed straight off the page: its `<type>`/`<array>` child
/// is recorded as the raw GIR name rather than a resolved [`Type`], since
/// that needs the cross-namespace `resolve_ref` machinery that only exists
/// once [`IdrCache::load`] has the whole include graph in hand.
struct RawProperty {
    name: String,
    type_name: Option<String>,
    is_array: bool,
    construct_only: bool,
    writable: bool,
    deprecated: bool,
    deprecated_doc: Option<String>,
}

struct ParsedNamespace {
    name: String,
    version: String,
    classes: Vec<(String, Option<String>, Vec<String>, Vec<RawProperty>, Vec<Signal>, bool, bool, Option<String>)>,
    interfaces: Vec<(String, Vec<String>, Vec<RawProperty>, Vec<Signal>, bool, Option<String>)>,
    enumerations: Vec<(String, Vec<Member>, bool, Option<String>)>,
    bitfields: Vec<(String, Vec<Member>, bool, Option<String>)>,
    includes: Vec<(String, String)>,
}

/// Parses one `.gir` file's bytes into a raw, not-yet-linked namespace
/// description (cross-references to parent/implemented types are resolved
/// by [`IdrCache`] once all included namespaces are loaded).
fn parse_gir(xml: &str, path: &std::path::Path) -> CoreResult<ParsedNamespace> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut skip_depth: u32 = 0;

    let mut ns_name = String::new();
    let mut ns_version = String::new();
    let mut includes = Vec::new();

    let mut classes = Vec::new();
    let mut interfaces = Vec::new();
    let mut enumerations = Vec::new();
    let mut bitfields = Vec::new();

    // Stack of in-progress member collections for the currently open
    // class/interface/enum/bitfield element.
    enum Open {
        Class {
            name: String,
            parent: Option<String>,
            implements: Vec<String>,
            properties: Vec<RawProperty>,
            signals: Vec<Signal>,
            abstract_: bool,
            deprecated: bool,
            deprecated_doc: Option<String>,
        },
        Interface {
            name: String,
            prerequisites: Vec<String>,
            properties: Vec<RawProperty>,
            signals: Vec<Signal>,
            deprecated: bool,
            deprecated_doc: Option<String>,
        },
        Enum {
            name: String,
            members: Vec<Member>,
            deprecated: bool,
            deprecated_doc: Option<String>,
        },
    }
    let mut stack: Vec<Open> = Vec::new();
    let mut last_doc: Option<String> = None;
    // The property currently open (between its Start and End events), so a
    // nested <type>/<array> child can fill in its type before it's pushed.
    let mut current_prop: Option<RawProperty> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => {
                return Err(CoreError::IdrXml {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                    continue;
                }
                let local = local_name(&e);
                let kind = classify(&local);
                match kind {
                    ElementKind::Namespace => {
                        ns_name = attr(&e, "name").unwrap_or_default();
                        ns_version = attr(&e, "version").unwrap_or_default();
                    }
                    ElementKind::Include => {
                        let name = attr(&e, "name").unwrap_or_default();
                        let version = attr(&e, "version").unwrap_or_default();
                        includes.push((name, version));
                    }
                    ElementKind::Class => {
                        stack.push(Open::Class {
                            name: attr(&e, "name").unwrap_or_default(),
                            parent: attr(&e, "parent"),
                            implements: Vec::new(),
                            properties: Vec::new(),
                            signals: Vec::new(),
                            abstract_: attr_bool(&e, "abstract"),
                            deprecated: attr(&e, "deprecated").is_some(),
                            deprecated_doc: None,
                        });
                    }
                    ElementKind::Interface => {
                        stack.push(Open::Interface {
                            name: attr(&e, "name").unwrap_or_default(),
                            prerequisites: Vec::new(),
                            properties: Vec::new(),
                            signals: Vec::new(),
                            deprecated: attr(&e, "deprecated").is_some(),
                            deprecated_doc: None,
                        });
                    }
                    ElementKind::Enumeration | ElementKind::Bitfield => {
                        stack.push(Open::Enum {
                            name: attr(&e, "name").unwrap_or_default(),
                            members: Vec::new(),
                            deprecated: attr(&e, "deprecated").is_some(),
                            deprecated_doc: None,
                        });
                    }
                    ElementKind::Implements => {
                        if let Some(Open::Class { implements, .. }) = stack.last_mut() {
                            if let Some(n) = attr(&e, "name") {
                                implements.push(n);
                            }
                        }
                    }
                    ElementKind::Prerequisite => {
                        if let Some(Open::Interface { prerequisites, .. }) = stack.last_mut() {
                            if let Some(n) = attr(&e, "name") {
                                prerequisites.push(n);
                            }
                        }
                    }
                    ElementKind::Property => {
                        current_prop = Some(RawProperty {
                            name: attr(&e, "name").unwrap_or_default(),
                            type_name: None,
                            is_array: false,
                            construct_only: attr_bool(&e, "construct-only"),
                            writable: attr(&e, "writable").map(|v| v != "0").unwrap_or(true),
                            deprecated: attr(&e, "deprecated").is_some(),
                            deprecated_doc: None,
                        });
                    }
                    ElementKind::Signal => {
                        let sig = Signal {
                            name: attr(&e, "name").unwrap_or_default(),
                            deprecated: attr(&e, "deprecated").is_some(),
                            deprecated_doc: None,
                        };
                        match stack.last_mut() {
                            Some(Open::Class { signals, .. }) => signals.push(sig),
                            Some(Open::Interface { signals, .. }) => signals.push(sig),
                            _ => {}
                        }
                    }
                    ElementKind::Member => {
                        if let Some(Open::Enum { members, .. }) = stack.last_mut() {
                            let name = attr(&e, "name").unwrap_or_default();
                            let nick = name.replace('_', "-");
                            let value = attr(&e, "value").and_then(|v| v.parse().ok()).unwrap_or(0);
                            members.push(Member { name, nick, value, docs: None });
                        }
                    }
                    ElementKind::TypeRef => {
                        if let Some(prop) = current_prop.as_mut() {
                            if local == "array" {
                                prop.is_array = true;
                            } else if let Some(n) = attr(&e, "name") {
                                prop.type_name = Some(n);
                            }
                        }
                    }
                    ElementKind::Doc | ElementKind::Parameter => {}
                    ElementKind::Repository | ElementKind::Other => {
                        // Unrecognized subtree: skip it (and its children) entirely.
                        skip_depth = 1;
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if skip_depth > 0 {
                    continue;
                }
                let local = local_name(&e);
                match classify(&local) {
                    ElementKind::Implements => {
                        if let Some(Open::Class { implements, .. }) = stack.last_mut() {
                            if let Some(n) = attr(&e, "name") {
                                implements.push(n);
                            }
                        }
                    }
                    ElementKind::Prerequisite => {
                        if let Some(Open::Interface { prerequisites, .. }) = stack.last_mut() {
                            if let Some(n) = attr(&e, "name") {
                                prerequisites.push(n);
                            }
                        }
                    }
                    ElementKind::Include => {
                        let name = attr(&e, "name").unwrap_or_default();
                        let version = attr(&e, "version").unwrap_or_default();
                        includes.push((name, version));
                    }
                    ElementKind::Member => {
                        if let Some(Open::Enum { members, .. }) = stack.last_mut() {
                            let name = attr(&e, "name").unwrap_or_default();
                            let nick = name.replace('_', "-");
                            let value = attr(&e, "value").and_then(|v| v.parse().ok()).unwrap_or(0);
                            members.push(Member { name, nick, value, docs: None });
                        }
                    }
                    ElementKind::Property => {
                        let prop = RawProperty {
                            name: attr(&e, "name").unwrap_or_default(),
                            type_name: None,
                            is_array: false,
                            construct_only: attr_bool(&e, "construct-only"),
                            writable: attr(&e, "writable").map(|v| v != "0").unwrap_or(true),
                            deprecated: attr(&e, "deprecated").is_some(),
                            deprecated_doc: None,
                        };
                        match stack.last_mut() {
                            Some(Open::Class { properties, .. }) => properties.push(prop),
                            Some(Open::Interface { properties, .. }) => properties.push(prop),
                            _ => {}
                        }
                    }
                    ElementKind::TypeRef => {
                        if let Some(prop) = current_prop.as_mut() {
                            if local == "array" {
                                prop.is_array = true;
                            } else if let Some(n) = attr(&e, "name") {
                                prop.type_name = Some(n);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                if skip_depth == 0 {
                    if let Ok(text) = t.unescape() {
                        let text = text.trim();
                        if !text.is_empty() {
                            last_doc = Some(text.to_string());
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                let local = local_name(&e);
                match classify(&local) {
                    ElementKind::Doc => {
                        if let Some(Open::Class { deprecated_doc, .. } | Open::Interface { deprecated_doc, .. } | Open::Enum { deprecated_doc, .. }) = stack.last_mut() {
                            if deprecated_doc.is_none() {
                                *deprecated_doc = last_doc.take();
                            }
                        }
                    }
                    ElementKind::Property => {
                        if let Some(prop) = current_prop.take() {
                            match stack.last_mut() {
                                Some(Open::Class { properties, .. }) => properties.push(prop),
                                Some(Open::Interface { properties, .. }) => properties.push(prop),
                                _ => {}
                            }
                        }
                    }
                    ElementKind::Class => {
                        if let Some(Open::Class {
                            name,
                            parent,
                            implements,
                            properties,
                            signals,
                            abstract_,
                            deprecated,
                            deprecated_doc,
                        }) = stack.pop()
                        {
                            classes.push((name, parent, implements, properties, signals, abstract_, deprecated, deprecated_doc));
                        }
                    }
                    ElementKind::Interface => {
                        if let Some(Open::Interface {
                            name,
                            prerequisites,
                            properties,
                            signals,
                            deprecated,
                            deprecated_doc,
                        }) = stack.pop()
                        {
                            interfaces.push((name, prerequisites, properties, signals, deprecated, deprecated_doc));
                        }
                    }
                    ElementKind::Enumeration => {
                        if let Some(Open::Enum { name, members, deprecated, deprecated_doc }) = stack.pop() {
                            enumerations.push((name, members, deprecated, deprecated_doc));
                        }
                    }
                    ElementKind::Bitfield => {
                        if let Some(Open::Enum { name, members, deprecated, deprecated_doc }) = stack.pop() {
                            bitfields.push((name, members, deprecated, deprecated_doc));
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(ParsedNamespace {
        name: ns_name,
        version: ns_version,
        classes,
        interfaces,
        enumerations,
        bitfields,
        includes,
    })
}

/// Resolves a [`RawProperty`]'s GIR type name into a real [`Type`]: GIR
/// fundamental types (`utf8`, `gboolean`, ...) resolve directly, everything
/// else goes through the same `resolve_ref` used for parent/implements
/// references. A property with no `<type>`/`<array>` child (self-closing,
/// no introspectable type) falls back to `Void`.
fn resolve_property(
    cache: &IdrCache,
    resolve_ref: &impl Fn(&IdrCache, &str) -> Type,
    p: &RawProperty,
) -> Property {
    let base = p
        .type_name
        .as_deref()
        .map(|n| BasicType::from_gir_name(n).map(Type::Basic).unwrap_or_else(|| resolve_ref(cache, n)))
        .unwrap_or(Type::Basic(BasicType::Void));
    let type_ = if p.is_array { Type::Array(Box::new(base)) } else { base };
    Property {
        name: p.name.clone(),
        type_,
        construct_only: p.construct_only,
        writable: p.writable,
        deprecated: p.deprecated,
        deprecated_doc: p.deprecated_doc.clone(),
        doc: None,
    }
}

fn local_name(e: &quick_xml::events::BytesStart) -> String {
    let full = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    full.rsplit(':').next().unwrap_or(&full).to_string()
}

/// Process-wide (but explicitly threaded, never global) cache of loaded
/// namespaces, keyed by `(namespace, version)`. First loader for a key wins.
pub struct IdrCache {
    config: SearchConfig,
    entries: RefCell<HashMap<(String, String), Rc<Namespace>>>,
}

impl IdrCache {
    pub fn new(config: SearchConfig) -> Self {
        IdrCache {
            config,
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Every namespace loaded so far in this process, regardless of which
    /// document imported it — used by the completion engine to offer a
    /// class from a namespace another open document already pulled in.
    pub fn loaded_namespaces(&self) -> Vec<Rc<Namespace>> {
        self.entries.borrow().values().cloned().collect()
    }

    /// Loads `namespace`/`version`, recursively resolving its includes.
    /// Cycles are impossible because includes form a DAG; repeated
    /// requests for an already-loaded key return the cached value.
    pub fn load(&self, namespace: &str, version: &str) -> CoreResult<Rc<Namespace>> {
        let key = (namespace.to_string(), version.to_string());
        if let Some(existing) = self.entries.borrow().get(&key) {
            tracing::debug!(namespace, version, "idr cache hit");
            return Ok(existing.clone());
        }
        tracing::debug!(namespace, version, "idr cache miss, loading from disk");

        let candidates = self.config.candidate_files(namespace, version);
        let path = candidates
            .iter()
            .find(|p| p.exists())
            .ok_or_else(|| CoreError::MissingNamespace {
                namespace: namespace.to_string(),
                version: version.to_string(),
            })?;

        let text = fs::read_to_string(path).map_err(|source| CoreError::IdrIo {
            path: path.clone(),
            source,
        })?;
        let parsed = parse_gir(&text, path)?;

        for (inc_name, inc_version) in &parsed.includes {
            self.load(inc_name, inc_version)?;
        }

        let mut ns = Namespace::empty(parsed.name.clone(), parsed.version.clone());
        ns.includes = parsed.includes.clone();

        for (name, members, deprecated, deprecated_doc) in &parsed.enumerations {
            ns.enumerations.insert(
                name.clone(),
                Rc::new(EnumerationType {
                    namespace: parsed.name.clone(),
                    name: name.clone(),
                    glib_type_name: format!("{}{}", parsed.name, name),
                    members: members.clone(),
                    deprecated: *deprecated,
                    deprecated_doc: deprecated_doc.clone(),
                }),
            );
        }
        for (name, members, deprecated, deprecated_doc) in &parsed.bitfields {
            ns.bitfields.insert(
                name.clone(),
                Rc::new(EnumerationType {
                    namespace: parsed.name.clone(),
                    name: name.clone(),
                    glib_type_name: format!("{}{}", parsed.name, name),
                    members: members.clone(),
                    deprecated: *deprecated,
                    deprecated_doc: deprecated_doc.clone(),
                }),
            );
        }

        // Classes and interfaces reference each other and possibly types from
        // included namespaces; resolve in two passes: register placeholders
        // is unnecessary here since we build the Rc graph bottom-up, parents
        // first is not guaranteed by GIR ordering, so we resolve lazily.
        self.entries.borrow_mut().insert(key.clone(), Rc::new(ns));

        let resolve_ref = |this: &Self, name: &str| -> Type {
            if let Some(local) = this.entries.borrow().get(&key).and_then(|n| n.lookup(name)) {
                return local;
            }
            for (inc_name, inc_version) in &parsed.includes {
                if let Some(inc_ns) = this.entries.borrow().get(&(inc_name.clone(), inc_version.clone())) {
                    if let Some(t) = inc_ns.lookup(name) {
                        return t;
                    }
                }
            }
            Type::Extern {
                namespace: parsed.name.clone(),
                name: name.to_string(),
            }
        };

        for (name, parent, implements, properties, signals, abstract_, deprecated, deprecated_doc) in &parsed.classes {
            let parent_ty = parent.as_deref().map(|p| resolve_ref(self, p));
            let implements_ty: Vec<Type> = implements.iter().map(|i| resolve_ref(self, i)).collect();
            let mut props = std::collections::BTreeMap::new();
            for p in properties {
                props.insert(p.name.clone(), resolve_property(self, &resolve_ref, p));
            }
            let mut sigs = std::collections::BTreeMap::new();
            for s in signals {
                sigs.insert(s.name.clone(), s.clone());
            }
            let class = Rc::new(ClassType {
                namespace: parsed.name.clone(),
                name: name.clone(),
                glib_type_name: format!("{}{}", parsed.name, name),
                parent: parent_ty,
                implements: implements_ty,
                properties: props,
                signals: sigs,
                abstract_: *abstract_,
                deprecated: *deprecated,
                deprecated_doc: deprecated_doc.clone(),
                incomplete: false,
            });
            if let Some(entry) = self.entries.borrow_mut().get_mut(&key) {
                Rc::get_mut(entry)
                    .expect("no outstanding Rc clones during load")
                    .classes
                    .insert(name.clone(), class);
            }
        }

        for (name, prerequisites, properties, signals, deprecated, deprecated_doc) in &parsed.interfaces {
            let prereq_ty: Vec<Type> = prerequisites.iter().map(|p| resolve_ref(self, p)).collect();
            let mut props = std::collections::BTreeMap::new();
            for p in properties {
                props.insert(p.name.clone(), resolve_property(self, &resolve_ref, p));
            }
            let mut sigs = std::collections::BTreeMap::new();
            for s in signals {
                sigs.insert(s.name.clone(), s.clone());
            }
            let iface = Rc::new(InterfaceType {
                namespace: parsed.name.clone(),
                name: name.clone(),
                glib_type_name: format!("{}{}", parsed.name, name),
                prerequisites: prereq_ty,
                properties: props,
                signals: sigs,
                deprecated: *deprecated,
                deprecated_doc: deprecated_doc.clone(),
            });
            if let Some(entry) = self.entries.borrow_mut().get_mut(&key) {
                Rc::get_mut(entry)
                    .expect("no outstanding Rc clones during load")
                    .interfaces
                    .insert(name.clone(), iface);
            }
        }

        Ok(self.entries.borrow().get(&key).unwrap().clone())
    }
}

/// The set of namespaces a file has imported via `using`, used for lookup.
///
/// Holds an `Rc<IdrCache>` rather than a borrow so a [`crate::ast::Document`]
/// (and the LSP document store that owns many of them alongside the shared
/// cache) never becomes self-referential.
pub struct IdrContext {
    cache: Rc<IdrCache>,
    imported: Vec<Rc<Namespace>>,
    default_namespace: Option<Rc<Namespace>>,
}

impl IdrContext {
    pub fn new(cache: Rc<IdrCache>) -> Self {
        IdrContext {
            cache,
            imported: Vec::new(),
            default_namespace: None,
        }
    }

    /// Imports a namespace; enforces that no two versions of the same
    /// namespace coexist in one context.
    pub fn import(&mut self, namespace: &str, version: &str) -> CoreResult<()> {
        if let Some(existing) = self.imported.iter().find(|n| n.name == namespace) {
            if existing.version != version {
                return Err(CoreError::internal(format!(
                    "namespace {namespace} already imported at version {}, cannot also import {version}",
                    existing.version
                )));
            }
            return Ok(());
        }
        let ns = self.cache.load(namespace, version)?;
        if self.default_namespace.is_none() {
            self.default_namespace = Some(ns.clone());
        }
        self.imported.push(ns);
        Ok(())
    }

    /// Namespaces imported by this document so far, in import order —
    /// used by the completion engine to tell whether a class it's
    /// suggesting already has a `using` in scope (§4.10).
    pub fn imported(&self) -> &[Rc<Namespace>] {
        &self.imported
    }

    pub fn cache(&self) -> &Rc<IdrCache> {
        &self.cache
    }

    /// Resolves `Namespace.ClassName` or a bare `ClassName` (searched in
    /// imported namespaces, then the implicit default namespace).
    pub fn resolve(&self, namespace: Option<&str>, name: &str) -> Option<Type> {
        if let Some(ns_name) = namespace {
            return self.imported.iter().find(|n| n.name == ns_name)?.lookup(name);
        }
        for ns in &self.imported {
            if let Some(t) = ns.lookup(name) {
                return Some(t);
            }
        }
        self.default_namespace.as_ref().and_then(|ns| ns.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(files: &[(&str, &str)]) -> (IdrCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).expect("write fixture");
        }
        let mut config = SearchConfig::new();
        config.add_path(dir.path());
        (IdrCache::new(config), dir)
    }

    const GTK_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Gtk" version="4.0">
    <class name="Widget" abstract="1">
      <property name="visible" writable="1"/>
    </class>
    <class name="Box" parent="Widget"/>
  </namespace>
</repository>
"#;

    #[test]
    fn loads_classes_and_their_abstract_flag() {
        let (cache, _guard) = cache_with(&[("Gtk-4.0.gir", GTK_GIR)]);
        let ns = cache.load("Gtk", "4.0").expect("load");
        assert!(ns.classes.get("Widget").unwrap().abstract_);
        assert!(!ns.classes.get("Box").unwrap().abstract_);
    }

    #[test]
    fn repeated_loads_return_the_same_cached_namespace() {
        let (cache, _guard) = cache_with(&[("Gtk-4.0.gir", GTK_GIR)]);
        let first = cache.load("Gtk", "4.0").expect("load");
        let second = cache.load("Gtk", "4.0").expect("load");
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_namespace_is_a_core_error() {
        let (cache, _guard) = cache_with(&[]);
        let err = cache.load("NoSuchLib", "1.0").unwrap_err();
        assert!(matches!(err, CoreError::MissingNamespace { .. }));
    }

    #[test]
    fn includes_are_resolved_recursively_and_types_cross_reference() {
        const BASE: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Base" version="1.0">
    <class name="Object"/>
  </namespace>
</repository>
"#;
        const DERIVED: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <include name="Base" version="1.0"/>
  <namespace name="Derived" version="1.0">
    <class name="Thing" parent="Base.Object"/>
  </namespace>
</repository>
"#;
        let (cache, _guard) = cache_with(&[("Base-1.0.gir", BASE), ("Derived-1.0.gir", DERIVED)]);
        let ns = cache.load("Derived", "1.0").expect("load derived");
        let thing = ns.classes.get("Thing").expect("Thing class");
        match &thing.parent {
            Some(Type::Class(c)) => assert_eq!(c.name, "Object"),
            other => panic!("expected resolved parent class, got {other:?}"),
        }
        assert!(cache.loaded_namespaces().iter().any(|n| n.name == "Base"));
    }

    #[test]
    fn context_rejects_reimporting_a_namespace_at_a_different_version() {
        let (cache, _guard) = cache_with(&[("Gtk-4.0.gir", GTK_GIR)]);
        let mut ctx = IdrContext::new(Rc::new(cache));
        ctx.import("Gtk", "4.0").expect("first import");
        let err = ctx.import("Gtk", "3.0").unwrap_err();
        assert!(matches!(err, CoreError::Internal { .. }));
    }

    #[test]
    fn context_resolves_bare_and_namespaced_names() {
        let (cache, _guard) = cache_with(&[("Gtk-4.0.gir", GTK_GIR)]);
        let mut ctx = IdrContext::new(Rc::new(cache));
        ctx.import("Gtk", "4.0").expect("import");
        assert!(ctx.resolve(None, "Box").is_some());
        assert!(ctx.resolve(Some("Gtk"), "Box").is_some());
        assert!(ctx.resolve(Some("Gtk"), "Nope").is_none());
    }
}

//! Test-only fixture: a minimal hand-written `Gtk-4.0.gir` covering just
//! enough surface (`Widget`, `Box`, `Orientation`, a couple of signals and
//! deprecated members) for the rest of the crate's tests to compile
//! realistic source against real introspection data instead of mocking the
//! type system.

use std::rc::Rc;

use tempfile::TempDir;

use crate::config::SearchConfig;
use crate::idr::IdrCache;

const GTK_4_0_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Gtk" version="4.0">
    <enumeration name="Orientation">
      <member name="horizontal" value="0"/>
      <member name="vertical" value="1"/>
    </enumeration>
    <class name="Widget" abstract="1">
      <property name="visible" writable="1"/>
      <property name="name" writable="1"/>
      <property name="css-classes" writable="1"/>
      <glib:signal name="realize"/>
      <glib:signal name="destroy"/>
    </class>
    <class name="Box" parent="Widget">
      <property name="orientation" writable="1"/>
      <property name="spacing" writable="1"/>
      <property name="homogeneous" writable="1"/>
      <property name="read-only-child-count" writable="0"/>
      <property name="old-spacing" writable="1" deprecated="1">
        <doc>use spacing instead</doc>
      </property>
      <glib:signal name="clicked"/>
    </class>
    <class name="Button" parent="Widget">
      <property name="label" writable="1"/>
      <glib:signal name="clicked"/>
    </class>
    <class name="ListItem" parent="Widget">
      <property name="child" writable="1">
        <type name="Widget"/>
      </property>
      <property name="selected" writable="0">
        <type name="gboolean"/>
      </property>
    </class>
    <class name="BuilderListItemFactory">
      <property name="bytes" writable="1">
        <type name="utf8"/>
      </property>
    </class>
  </namespace>
</repository>
"#;

/// Builds an `IdrCache` rooted at a temp directory containing a fixed
/// `Gtk-4.0.gir`. The `TempDir` guard is returned alongside so callers keep
/// it alive for as long as the cache might still read from disk (callers
/// only actually read at `import` time, during `Document::compile`, but
/// holding the guard removes any doubt).
pub(crate) fn gtk_cache() -> (Rc<IdrCache>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("Gtk-4.0.gir"), GTK_4_0_GIR).expect("write fixture");
    let mut config = SearchConfig::new();
    config.add_path(dir.path());
    (Rc::new(IdrCache::new(config)), dir)
}

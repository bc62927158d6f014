//! Shared fixture for integration tests: a minimal `Gtk-4.0.gir` rooted at
//! a temp dir, the same shape `src/testutil.rs` builds for unit tests
//! (duplicated here since that module is `pub(crate)` and `#[cfg(test)]`
//! only, so it isn't visible from the separate `tests/` crate).

use std::rc::Rc;

use blu::config::SearchConfig;
use blu::idr::IdrCache;
use tempfile::TempDir;

pub const GTK_4_0_GIR: &str = r#"<?xml version="1.0"?>
<repository version="1.2">
  <namespace name="Gtk" version="4.0">
    <enumeration name="Orientation">
      <member name="horizontal" value="0"/>
      <member name="vertical" value="1"/>
    </enumeration>
    <class name="Widget" abstract="1">
      <property name="visible" writable="1"/>
      <property name="name" writable="1"/>
      <glib:signal name="realize"/>
    </class>
    <class name="Box" parent="Widget">
      <property name="orientation" writable="1"/>
      <property name="spacing" writable="1"/>
      <glib:signal name="clicked"/>
    </class>
    <class name="Button" parent="Widget">
      <property name="label" writable="1"/>
      <glib:signal name="clicked"/>
    </class>
  </namespace>
</repository>
"#;

#[allow(dead_code)]
pub fn gtk_cache() -> (Rc<IdrCache>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("Gtk-4.0.gir"), GTK_4_0_GIR).expect("write fixture");
    let mut config = SearchConfig::new();
    config.add_path(dir.path());
    (Rc::new(IdrCache::new(config)), dir)
}

/// A handful of small, known-good sources covering the document shapes
/// the round-trip/error-corpus properties (§8) need to exercise.
#[allow(dead_code)]
pub const VALID_SAMPLES: &[(&str, &str)] = &[
    (
        "minimal_template",
        "using Gtk 4.0;\ntemplate MyWidget : Gtk.Box {\n  orientation: vertical;\n  spacing: 6;\n}\n",
    ),
    (
        "nested_children_with_id",
        "using Gtk 4.0;\nGtk.Box {\n  orientation: vertical;\n  Button go_button {\n    label: \"Go\";\n  }\n}\n",
    ),
    (
        "signal_handler",
        "using Gtk 4.0;\nGtk.Button button {\n  label: \"Click me\";\n  clicked => on_click() swapped;\n}\n",
    ),
    (
        "bind_closure_expression",
        "using Gtk 4.0;\ntemplate Foo : Gtk.Box {\n  Button go1 {}\n  visible: bind $format(go1) as <Gtk.Button>.visible;\n}\n",
    ),
];

/// Sources expected to fail compilation, paired with a substring every
/// recorded diagnostic for that source must contain at least one of.
#[allow(dead_code)]
pub const ERROR_SAMPLES: &[(&str, &[&str])] = &[
    ("using Gtk 4.0;\nGtk.Widget {}", &["abstract"]),
    (
        "using Gtk 4.0;\nGtk.Box {\n  Button a {}\n  Button a {}\n}",
        &["duplicate", "already"],
    ),
    (
        "using Gtk 4.0;\nGtk.Box {\n  spacingg: 4;\n}",
        &["spacingg", "unknown", "no property"],
    ),
];

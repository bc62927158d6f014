//! Type-system partial-order properties (§8): reflexivity of
//! `assignable_to` and that every class is assignable to each of its own
//! `parent_types`, over the classes in the fixture `.gir` (real introspected
//! data rather than hand-built `Type` values, per the teacher's own
//! "exercise through a loaded fixture, not a mock" style).

mod common;

use common::gtk_cache;

fn all_classes(ctx: &blu::idr::IdrContext) -> Vec<blu::types::Type> {
    ["Widget", "Box", "Button"]
        .iter()
        .filter_map(|n| ctx.resolve(Some("Gtk"), n))
        .collect::<Vec<_>>()
}

#[test]
fn every_class_is_assignable_to_itself() {
    let (cache, _guard) = gtk_cache();
    let mut ctx = blu::idr::IdrContext::new(cache);
    ctx.import("Gtk", "4.0").expect("import");
    for ty in all_classes(&ctx) {
        assert!(ty.assignable_to(&ty), "{ty:?} is not assignable to itself");
    }
}

#[test]
fn every_class_is_assignable_to_each_of_its_parent_types() {
    let (cache, _guard) = gtk_cache();
    let mut ctx = blu::idr::IdrContext::new(cache);
    ctx.import("Gtk", "4.0").expect("import");
    for ty in all_classes(&ctx) {
        for parent in ty.parent_types() {
            assert!(ty.assignable_to(&parent), "{ty:?} is not assignable to its own parent {parent:?}");
        }
    }
}

#[test]
fn assignable_to_implies_castable_to() {
    let (cache, _guard) = gtk_cache();
    let mut ctx = blu::idr::IdrContext::new(cache);
    ctx.import("Gtk", "4.0").expect("import");
    let classes = all_classes(&ctx);
    for a in &classes {
        for b in &classes {
            if a.assignable_to(b) {
                assert!(a.castable_to(b), "{a:?} assignable to {b:?} but not castable");
            }
        }
    }
}

#[test]
fn common_ancestor_of_widget_subclasses_is_widget() {
    let (cache, _guard) = gtk_cache();
    let mut ctx = blu::idr::IdrContext::new(cache);
    ctx.import("Gtk", "4.0").expect("import");
    let b = ctx.resolve(Some("Gtk"), "Box").expect("Box");
    let btn = ctx.resolve(Some("Gtk"), "Button").expect("Button");
    let widget = ctx.resolve(Some("Gtk"), "Widget").expect("Widget");
    let ancestor = blu::types::Type::common_ancestor(&[b, btn]).expect("common ancestor");
    assert!(ancestor.assignable_to(&widget) && widget.assignable_to(&ancestor));
}

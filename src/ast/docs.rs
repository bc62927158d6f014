//! Hover text (§4.5): renders the introspection docs already carried on
//! `Type`/`Property`/`Signal` into short Markdown, the same text a
//! completion item's documentation field shows (`crate::completion`).

use super::{Document, NodeId, NodePayload};

pub fn hover_text(doc: &Document, id: NodeId) -> Option<String> {
    match doc.payload(id) {
        NodePayload::Object { class, .. } => Some(class_hover(class)),
        NodePayload::Template { parent, .. } => {
            parent.as_ref().map(class_hover).or_else(|| Some("**template**".to_string()))
        }
        NodePayload::ListItemFactory { item_type } => Some(class_hover(item_type)),
        NodePayload::Property { name } => {
            let class = enclosing_class(doc, id)?;
            let prop = class.property(name)?;
            Some(property_hover(&class, prop))
        }
        NodePayload::Signal { name, .. } => {
            let class = enclosing_class(doc, id)?;
            let signal = class.signal(name)?;
            let mut text = format!("**{}::{}**", class.name(), signal.name);
            if signal.deprecated {
                text.push_str("\n\n*Deprecated*");
                if let Some(doc) = &signal.deprecated_doc {
                    text.push_str(&format!(": {doc}"));
                }
            }
            Some(text)
        }
        _ => None,
    }
}

fn class_hover(class: &crate::types::Type) -> String {
    let mut text = format!("**{}**", class.full_name());
    if class.incomplete() {
        text.push_str("\n\n*introspection data unavailable*");
    }
    if class.deprecated() {
        text.push_str("\n\n*Deprecated*");
        if let Some(doc) = class.deprecated_doc() {
            text.push_str(&format!(": {doc}"));
        }
    }
    text
}

fn property_hover(class: &crate::types::Type, prop: &crate::types::Property) -> String {
    let mut text = format!("**{}** : `{}`", prop.signature(&class.name()), prop.type_.name());
    if !prop.writable {
        text.push_str("\n\n*read-only*");
    } else if prop.construct_only {
        text.push_str("\n\n*construct-only*");
    }
    if prop.deprecated {
        text.push_str("\n\n*Deprecated*");
        if let Some(doc) = &prop.deprecated_doc {
            text.push_str(&format!(": {doc}"));
        }
    }
    if let Some(doc) = &prop.doc {
        text.push_str(&format!("\n\n{doc}"));
    }
    text
}

fn enclosing_class(doc: &Document, prop_id: NodeId) -> Option<crate::types::Type> {
    let content_id = doc.parent(prop_id)?;
    let obj_id = doc.parent(content_id)?;
    match doc.payload(obj_id) {
        NodePayload::Object { class, .. } => Some(class.clone()),
        NodePayload::ListItemFactory { item_type } => Some(item_type.clone()),
        _ => None,
    }
}

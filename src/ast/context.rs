//! The two context kinds nodes compute on demand and children read by
//! walking toward the root (§9 "Context lookup by type": "a small fixed
//! enum of context kinds ... extensible as data").

use std::collections::HashMap;
use std::rc::Rc;

use crate::types::Type;

use super::NodeId;

/// The set of identifiers visible to expressions at a point in the source:
/// normally the whole document's objects-by-id map, narrowed to `Scope::Local`
/// inside a list-item factory, which additionally binds `item`.
#[derive(Debug, Clone)]
pub enum Scope {
    Document {
        ids: Rc<HashMap<String, NodeId>>,
    },
    Local {
        ids: Rc<HashMap<String, NodeId>>,
        item_type: Type,
    },
}

impl Scope {
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        match self {
            Scope::Document { ids } | Scope::Local { ids, .. } => ids.get(name).copied(),
        }
    }

    pub fn item_type(&self) -> Option<&Type> {
        match self {
            Scope::Local { item_type, .. } => Some(item_type),
            Scope::Document { .. } => None,
        }
    }
}

/// The expected type (and nullability/inference laxity) for the value or
/// expression in the current position.
#[derive(Debug, Clone)]
pub struct ValueTypeCtx {
    pub expected: Option<Type>,
    pub allow_null: bool,
    /// Set inside casts and other positions with no outer expected type:
    /// a sub-expression must determine its own type rather than rely on
    /// the parent coercing it.
    pub must_infer_type: bool,
}

impl ValueTypeCtx {
    pub fn new(expected: Type) -> Self {
        ValueTypeCtx {
            expected: Some(expected),
            allow_null: false,
            must_infer_type: false,
        }
    }

    pub fn unconstrained() -> Self {
        ValueTypeCtx {
            expected: None,
            allow_null: true,
            must_infer_type: true,
        }
    }

    pub fn allowing_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn inferring(mut self) -> Self {
        self.must_infer_type = true;
        self
    }
}

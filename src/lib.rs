//! `blu`: a compiler front end for a declarative UI description language,
//! plus the editor services (diagnostics, completions, hovers, formatting,
//! code actions, document symbols, go-to-definition) layered over the same
//! pipeline.
//!
//! The pipeline is bytes -> [`token`] -> [`parse`] (configured by [`ast`]'s
//! grammar declarations) -> group tree -> [`ast`] materializes the typed AST,
//! querying [`idr`]/[`types`] and delegating to [`expr`] -> diagnostics
//! aggregate in [`diagnostics`] -> on success [`xml`] walks the AST. The
//! [`lsp`] module re-runs the front half per edit and drives [`completion`]
//! on demand; neither binary (`blu`, `blu-lsp`) nor any outer collaborator
//! needs to reach past this crate's public surface to do its job.

pub mod ast;
pub mod completion;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod expr;
pub mod idr;
pub mod lsp;
pub mod parse;
pub mod token;
pub mod types;
pub mod xml;

#[cfg(test)]
pub(crate) mod testutil;

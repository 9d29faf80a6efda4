//! Domain models for feature-lens.
//!
//! # Core Concepts
//!
//! ## Input
//!
//! - [`SourceTree`]: Arena of [`SourceElement`]s (types, fields, methods, constructors)
//!   handed over by an external source parser. Elements refer to their parent by id only.
//! - [`Metadata`]: Declarations attached to an element, either a [`FeatureDeclaration`]
//!   ("this element implements feature X") or a [`MappingDeclaration`]
//!   ("this element belongs to concept X at granularity G").
//!
//! ## Output
//!
//! - [`FeatureModel`]: The recovered graph of [`FeatureNode`]s keyed by [`NodeKey`],
//!   with containment edges and the [`Diagnostic`]s raised while building it.
//! - [`Snapshot`]: A stored copy of a model in the SQLite model store.

mod diagnostic;
mod element;
mod feature;
mod metadata;
mod snapshot;

pub use diagnostic::*;
pub use element::*;
pub use feature::*;
pub use metadata::*;
pub use snapshot::*;

//! Convgen Core - Mapping resolution and conversion synthesis engine
//!
//! This crate takes a declared conversion interface ("convert A to B"
//! methods) plus annotated field metadata and decides, for every
//! destination field, how it is produced and what wrapping it needs.
//!
//! # Main Components
//!
//! - **Type Shape Model**: identities, optionality, multiplicity, categories
//! - **Directive**: parsed field annotations and the tag grammar
//! - **Catalog**: the boundary to the introspection front-end
//! - **Declaration**: a serde document that fills a catalog
//! - **Generation**: resolver, synthesizer, signature cache and assembly
//!
//! The engine never produces text; its output is a serializable
//! [`GeneratedMapper`] for an emitter to render.
//!
//! # Example
//!
//! ```no_run
//! use convgen_core::{Declaration, Result};
//!
//! fn example(json: &str) -> Result<()> {
//!     let catalog = Declaration::from_json_str(json)?.into_catalog(None)?;
//!     let mapper = convgen_core::generate(&catalog, "Mapper")?;
//!     println!("{} units", mapper.units.len());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod declaration;
pub mod directive;
pub mod error;
pub mod generation;
pub mod naming;
pub mod types;

#[cfg(test)]
pub mod proptest_strategies;

// Re-export main types for convenience
pub use catalog::{InMemoryCatalog, InterfaceDecl, InterfaceMethod, TypeCatalog, TypeDecl};
pub use declaration::Declaration;
pub use directive::{parse_tag, Directive, SourceRef, TransformRef};
pub use error::{Error, ErrorKind, Result};
pub use generation::{
    generate, ConversionPlan, EntryPoint, GeneratedMapper, MapperAssembly, MapperSignature,
    ResolvedSource, SharedUnit, SynthesisStep,
};
pub use types::{
    Category, FieldDescriptor, MethodSignature, Multiplicity, Origin, TypeIdentity, TypeShape,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

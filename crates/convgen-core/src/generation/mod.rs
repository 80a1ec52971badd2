//! Mapping resolution and conversion synthesis
//!
//! The engine turns a declared interface into shared units and entry
//! points:
//!
//! - [`resolver`] finds the chain producing each destination field
//! - [`synthesizer`] wraps each chain link in guards, loops and checks
//! - [`cache`] deduplicates signatures and closes fallibility
//! - [`assembly`] runs both passes and collects the result
//!
//! # Example
//!
//! ```
//! use convgen_core::catalog::{InMemoryCatalog, InterfaceDecl, InterfaceMethod, TypeDecl};
//! use convgen_core::generation::generate;
//! use convgen_core::types::{FieldDescriptor, TypeIdentity, TypeShape};
//!
//! let a = TypeIdentity::new("main", "A");
//! let b = TypeIdentity::new("main", "B");
//! let catalog = InMemoryCatalog::new()
//!     .with_type(TypeDecl::structure(a.clone())
//!         .with_field(FieldDescriptor::new("Name", TypeShape::primitive("string"))))
//!     .with_type(TypeDecl::structure(b.clone())
//!         .with_field(FieldDescriptor::new("Name", TypeShape::primitive("string"))))
//!     .with_interface(InterfaceDecl::new(TypeIdentity::new("main", "Mapper"))
//!         .with_method(InterfaceMethod::new(
//!             "AtoB",
//!             TypeShape::structure(a),
//!             TypeShape::structure(b),
//!         )));
//!
//! let mapper = generate(&catalog, "Mapper").unwrap();
//! assert_eq!(mapper.units[0].name, "mapMainAToMainB");
//! ```

pub mod assembly;
pub mod cache;
pub mod plan;
pub mod resolver;
pub mod steps;
pub mod synthesizer;

pub use assembly::{generate, MapperAssembly};
pub use cache::{Fallibility, FallibilitySnapshot, SignatureCache};
pub use plan::{
    ConversionPlan, EntryPoint, GeneratedMapper, GenerationMetadata, MapperSignature,
    ResolvedSource, SharedUnit, SignatureRecord, Via,
};
pub use resolver::Resolver;
pub use steps::{
    Adapt, Argument, Callee, Expr, Invocation, Operand, Place, Slot, SynthesisStep,
};
pub use synthesizer::{Axes, ErrorSurface, Operation, Synthesizer};

mod prop_tests;

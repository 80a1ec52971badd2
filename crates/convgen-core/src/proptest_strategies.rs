//! Property-based testing strategies for generating test data
//!
//! Random but well-formed shapes, directives and decision-table points
//! for the property tests of the directive parser and the synthesizer.

#![cfg(test)]

use proptest::option;
use proptest::prelude::*;

use crate::directive::{Directive, TransformRef};
use crate::generation::Axes;
use crate::types::{Category, Multiplicity, TypeIdentity, TypeShape};

/// Strategy for exported identifiers such as field and type names
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z0-9]{0,12}"
}

/// Strategy for module paths, e.g. `github.com/acme/app`
pub fn module_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}",
        ("[a-z]{1,8}", "[a-z]{1,8}").prop_map(|(host, base)| format!("{}.com/{}", host, base)),
        ("[a-z]{1,8}", "[a-z]{1,8}", "[a-z]{1,8}")
            .prop_map(|(host, org, base)| format!("{}.com/{}/{}", host, org, base)),
    ]
}

pub fn multiplicity_strategy() -> impl Strategy<Value = Multiplicity> {
    prop_oneof![Just(Multiplicity::Scalar), Just(Multiplicity::Collection)]
}

/// Strategy for primitive shapes of any optionality and multiplicity
pub fn primitive_shape_strategy() -> impl Strategy<Value = TypeShape> {
    (
        prop_oneof![
            Just("int"),
            Just("int64"),
            Just("string"),
            Just("bool"),
            Just("float64"),
        ],
        any::<bool>(),
        multiplicity_strategy(),
    )
        .prop_map(|(name, optional, multiplicity)| {
            let shape = TypeShape::primitive(name).with_optional(optional);
            match multiplicity {
                Multiplicity::Scalar => shape,
                Multiplicity::Collection => shape.collection(),
            }
        })
}

/// Strategy for struct shapes living in a generated module
pub fn struct_shape_strategy() -> impl Strategy<Value = TypeShape> {
    (module_strategy(), identifier_strategy(), any::<bool>()).prop_map(
        |(module, name, optional)| {
            TypeShape::scalar(TypeIdentity::new(module, name), Category::Struct)
                .with_optional(optional)
        },
    )
}

/// Strategy for transform references, qualified or not
pub fn transform_ref_strategy() -> impl Strategy<Value = TransformRef> {
    prop_oneof![
        (option::of(module_strategy()), identifier_strategy())
            .prop_map(|(module, name)| TransformRef::Function { module, name }),
        (
            option::of(module_strategy()),
            identifier_strategy(),
            identifier_strategy(),
        )
            .prop_map(|(module, type_name, method_name)| TransformRef::TypeMethod {
                module,
                type_name,
                method_name,
            }),
    ]
}

/// Strategy for non-empty directives obeying the ignore/transform exclusion
pub fn directive_strategy() -> impl Strategy<Value = Directive> {
    prop_oneof![
        Just(Directive::ignore()),
        (identifier_strategy(), any::<bool>()).prop_map(|(name, method)| {
            if method {
                Directive::default().from_method(name)
            } else {
                Directive::default().renamed(name)
            }
        }),
        (
            transform_ref_strategy(),
            option::of((identifier_strategy(), any::<bool>())),
        )
            .prop_map(|(transform, rename)| {
                let directive = Directive::transform(transform);
                match rename {
                    Some((name, true)) => directive.from_method(name),
                    Some((name, false)) => directive.renamed(name),
                    None => directive,
                }
            }),
    ]
}

/// Strategy for points of the synthesizer's decision table
pub fn axes_strategy() -> impl Strategy<Value = Axes> {
    (
        any::<bool>(),
        multiplicity_strategy(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(fallible, multiplicity, source_optional, returns_optional, destination_optional)| {
                Axes {
                    fallible,
                    multiplicity,
                    source_optional,
                    returns_optional,
                    destination_optional,
                }
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_struct_shapes_are_scalar_structs(shape in struct_shape_strategy()) {
            assert!(shape.is_struct());
            assert!(!shape.is_collection());
            assert!(shape.identity.module.is_some());
        }

        #[test]
        fn test_directives_are_never_empty(directive in directive_strategy()) {
            assert!(!directive.is_empty());
            assert!(!(directive.ignored && directive.transform.is_some()));
        }

        #[test]
        fn test_primitive_shapes_have_no_module(shape in primitive_shape_strategy()) {
            assert!(shape.identity.module.is_none());
        }
    }
}

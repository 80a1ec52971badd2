//! Property-based tests for conversion synthesis
//!
//! These check that the decision table is total, that every dereference is
//! guarded, and that generation is deterministic for arbitrary shapes.

#[cfg(test)]
mod tests {
    use proptest::collection::btree_map;
    use proptest::prelude::*;

    use crate::catalog::{InMemoryCatalog, InterfaceDecl, InterfaceMethod, TypeDecl};
    use crate::directive::parse_tag;
    use crate::error::ErrorKind;
    use crate::generation::steps::{dereferences_are_guarded, is_fallible};
    use crate::generation::{generate, ErrorSurface, Synthesizer};
    use crate::proptest_strategies::*;
    use crate::types::{FieldDescriptor, TypeIdentity, TypeShape};

    fn field_pair_strategy() -> impl Strategy<Value = (TypeShape, bool)> {
        (primitive_shape_strategy(), any::<bool>())
    }

    fn catalog_for(
        fields: &std::collections::BTreeMap<String, (TypeShape, bool)>,
    ) -> InMemoryCatalog {
        let a = TypeIdentity::new("app", "Source");
        let b = TypeIdentity::new("app", "Target");
        let mut source = TypeDecl::structure(a.clone());
        let mut target = TypeDecl::structure(b.clone());
        for (name, (shape, widen)) in fields {
            source = source.with_field(FieldDescriptor::new(name, shape.clone()));
            let widened = shape.clone().with_optional(shape.optional || *widen);
            target = target.with_field(FieldDescriptor::new(name, widened));
        }
        InMemoryCatalog::new()
            .with_type(source)
            .with_type(target)
            .with_interface(InterfaceDecl::new(TypeIdentity::new("app", "Mapper")).with_method(
                InterfaceMethod::new("Convert", TypeShape::structure(a), TypeShape::structure(b)),
            ))
    }

    proptest! {
        /// Property: every table point synthesizes while failure is permitted
        #[test]
        fn prop_decision_table_is_total(
            axes in axes_strategy(),
            accepts_optional in any::<bool>()
        ) {
            let steps = Synthesizer::new(ErrorSurface::Speculative)
                .synthesize_axes(axes, accepts_optional)
                .unwrap();
            prop_assert!(!steps.is_empty());
            prop_assert!(dereferences_are_guarded(&steps));
            prop_assert_eq!(is_fallible(&steps), axes.fallible);
        }

        /// Property: a surface that cannot fail rejects exactly the fallible points
        #[test]
        fn prop_infallible_surface_rejects_fallible_operations(
            axes in axes_strategy(),
            accepts_optional in any::<bool>()
        ) {
            let result = Synthesizer::new(ErrorSurface::Declared { can_fail: false })
                .synthesize_axes(axes, accepts_optional);
            match result {
                Ok(steps) => {
                    prop_assert!(!axes.fallible);
                    prop_assert!(!is_fallible(&steps));
                }
                Err(e) => {
                    prop_assert!(axes.fallible);
                    prop_assert_eq!(e.kind(), ErrorKind::FallibleWithoutErrorSignature);
                }
            }
        }

        /// Property: a directive's canonical text parses back to itself
        #[test]
        fn prop_directive_display_parses_back(directive in directive_strategy()) {
            let parsed = parse_tag(&directive.to_string()).unwrap();
            prop_assert_eq!(parsed, Some(directive));
        }

        /// Property: same-named fields that never narrow always generate
        #[test]
        fn prop_widening_structs_always_generate(
            fields in btree_map(identifier_strategy(), field_pair_strategy(), 1..8)
        ) {
            let catalog = catalog_for(&fields);
            let first = generate(&catalog, "Mapper").unwrap();
            let second = generate(&catalog, "Mapper").unwrap();

            prop_assert_eq!(first.units.len(), 1);
            prop_assert_eq!(first.units[0].fields.len(), fields.len());
            prop_assert!(!first.units[0].fallible);
            for plan in &first.units[0].fields {
                prop_assert!(!plan.steps.is_empty());
                prop_assert!(dereferences_are_guarded(&plan.steps));
            }
            prop_assert_eq!(first, second);
        }
    }
}

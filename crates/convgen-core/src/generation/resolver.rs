//! Mapping resolver
//!
//! Finds, for one destination field, the chain of links that produces it
//! from the source type. The resolver is a pure function of the catalog and
//! the fallibility snapshot it is given; recording what it finds is the
//! assembly's job.

use tracing::debug;

use crate::catalog::{TypeCatalog, TypeDecl};
use crate::directive::TransformRef;
use crate::error::{Error, Result};
use crate::generation::cache::FallibilitySnapshot;
use crate::generation::plan::{ConversionPlan, MapperSignature, ResolvedSource};
use crate::naming;
use crate::types::{FieldDescriptor, MethodSignature, Origin, TypeIdentity, TypeShape};

pub struct Resolver<'a, C: TypeCatalog + ?Sized> {
    catalog: &'a C,
    fallibility: &'a FallibilitySnapshot,
}

impl<'a, C: TypeCatalog + ?Sized> Resolver<'a, C> {
    pub fn new(catalog: &'a C, fallibility: &'a FallibilitySnapshot) -> Self {
        Self {
            catalog,
            fallibility,
        }
    }

    /// Resolve `field` of `owner` from an instance of `source`.
    ///
    /// Returns `Ok(None)` for ignored fields. Errors carry the field name
    /// but not the method, which the caller fills in.
    pub fn resolve(
        &self,
        source: &TypeDecl,
        owner: &TypeDecl,
        field: &FieldDescriptor,
    ) -> Result<Option<ConversionPlan>> {
        if field.is_ignored() {
            debug!(field = %field.name, owner = %owner.identity, "skipping ignored field");
            return Ok(None);
        }
        self.resolve_field(source, owner, field)
            .map(Some)
            .map_err(|e| e.in_field(&field.name))
    }

    fn resolve_field(
        &self,
        source: &TypeDecl,
        owner: &TypeDecl,
        field: &FieldDescriptor,
    ) -> Result<ConversionPlan> {
        let directive = field.directive.as_ref();

        // A transform takes priority and fixes the shape the read must have
        let transform = directive
            .and_then(|d| d.transform.as_ref())
            .map(|reference| self.transform(owner, reference))
            .transpose()?;

        let (read, read_shape) = self.read(source, field)?;

        let mut plan = ConversionPlan::new(field.clone(), read);
        let mut output = read_shape.clone();

        if let Some((reference, signature)) = transform {
            let param = signature.argument_shape().ok_or_else(|| {
                Error::unresolved(
                    reference.to_string(),
                    "a transform must take exactly one argument",
                )
            })?;
            if !param.same_identity(&read_shape) {
                return Err(Error::NoConversionPath {
                    method: String::new(),
                    field: String::new(),
                    from: read_shape.to_string(),
                    to: param.to_string(),
                    reason: Some(format!("{} expects {}", reference, param)),
                });
            }
            output = signature.result.clone();
            plan = plan.then(ResolvedSource::Transform {
                reference,
                signature,
            });
        }

        if let Some(bridge) = self.bridge(&output, &field.shape)? {
            plan = plan.then(bridge);
        }

        debug!(
            field = %field.name,
            source = plan.source().name(),
            links = plan.links.len(),
            fallible = plan.fallible,
            "resolved field plan"
        );
        Ok(plan)
    }

    /// Look up a directive's routine; unqualified names live next to `owner`
    fn transform(
        &self,
        owner: &TypeDecl,
        reference: &TransformRef,
    ) -> Result<(TransformRef, MethodSignature)> {
        let reference = reference.qualified(owner.identity.module.as_deref());
        let found = match &reference {
            TransformRef::Function { module, name } => {
                self.catalog.function(module.as_deref(), name)
            }
            TransformRef::TypeMethod {
                module,
                type_name,
                method_name,
            } => self
                .catalog
                .type_method(module.as_deref(), type_name, method_name),
        };
        match found {
            Some(signature) => Ok((reference, signature.clone())),
            None => Err(Error::unresolved(
                reference.to_string(),
                "no such conversion routine",
            )),
        }
    }

    /// Find the source member feeding `field`: a renamed member, a field of
    /// the same name, or a zero-argument method of the same name
    fn read(
        &self,
        source: &TypeDecl,
        field: &FieldDescriptor,
    ) -> Result<(ResolvedSource, TypeShape)> {
        let rename = field.directive.as_ref().and_then(|d| d.rename.as_ref());
        let (name, origin) = match rename {
            Some(r) => (r.name.as_str(), Some(r.origin)),
            None => (field.name.as_str(), None),
        };

        let as_field = || {
            source
                .field(name)
                .map(|f| (ResolvedSource::DirectField(f.clone()), f.shape.clone()))
        };
        let as_method = || {
            source
                .accessor(name)
                .map(|m| (ResolvedSource::MethodCall(m.clone()), m.result.clone()))
        };

        let found = match origin {
            Some(Origin::Field) => as_field(),
            Some(Origin::Method) => as_method(),
            None => as_field().or_else(as_method),
        };

        found.ok_or_else(|| {
            let what = match origin {
                Some(Origin::Field) => "field",
                Some(Origin::Method) => "zero-argument method",
                None => "field or zero-argument method",
            };
            Error::NoMappingFound {
                method: String::new(),
                field: String::new(),
                message: format!("{} has no {} named '{}'", source.identity.short(), what, name),
            }
        })
    }

    /// Sub-mapper needed to turn `output` into `destination`, if any
    fn bridge(
        &self,
        output: &TypeShape,
        destination: &TypeShape,
    ) -> Result<Option<ResolvedSource>> {
        if output.same_identity(destination) {
            return Ok(None);
        }
        if self.catalog.is_struct(&output.identity)
            && self.catalog.is_struct(&destination.identity)
        {
            return Ok(Some(self.sub_mapper(&output.identity, &destination.identity)));
        }
        Err(Error::NoConversionPath {
            method: String::new(),
            field: String::new(),
            from: output.to_string(),
            to: destination.to_string(),
            reason: None,
        })
    }

    /// Link delegating to the shared unit for `source -> destination`
    pub fn sub_mapper(&self, source: &TypeIdentity, destination: &TypeIdentity) -> ResolvedSource {
        let signature = MapperSignature::structural(source.clone(), destination.clone());
        ResolvedSource::SubMapper {
            unit: naming::unit_name(source, destination),
            fallible: self.fallibility.is_fallible(&signature),
            signature,
        }
    }
}

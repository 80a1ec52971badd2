//! Mapper assembly
//!
//! Orchestrates one generation run for a declared interface:
//!
//! 1. Pass 1 resolves and synthesizes every unit speculatively, recording
//!    per-signature fallibility and delegation in a [`SignatureCache`].
//! 2. The cache is closed into a [`FallibilitySnapshot`].
//! 3. Pass 2 repeats the walk against the frozen snapshot and enforces
//!    every declared error surface.
//!
//! Methods are visited in a stable order (destination identity, then
//! method name) and units in signature order, so the result is identical
//! for identical input. The first error aborts the run.

use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

use crate::catalog::{InterfaceDecl, InterfaceMethod, TypeCatalog, TypeDecl};
use crate::error::{Error, Result};
use crate::generation::cache::{FallibilitySnapshot, SignatureCache};
use crate::generation::plan::{
    ConversionPlan, EntryPoint, GeneratedMapper, GenerationMetadata, MapperSignature,
    ResolvedSource, SharedUnit,
};
use crate::generation::resolver::Resolver;
use crate::generation::steps::{Operand, Place};
use crate::generation::synthesizer::{ErrorSurface, Operation, Synthesizer};
use crate::naming;
use crate::types::TypeIdentity;

/// Field name reported for errors about an interface method's own argument
const ARGUMENT: &str = "(argument)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Speculative,
    Final,
}

/// Everything one walk over the interface produced
struct Walk {
    cache: SignatureCache,
    units: BTreeMap<MapperSignature, SharedUnit>,
    entry_points: Vec<EntryPoint>,
    dependencies: BTreeMap<String, TypeIdentity>,
}

/// Generation run for one declared interface
pub struct MapperAssembly<'a, C: TypeCatalog + ?Sized> {
    catalog: &'a C,
    interface: &'a InterfaceDecl,
}

impl<'a, C: TypeCatalog + ?Sized> MapperAssembly<'a, C> {
    /// Look up `interface` in the catalog
    pub fn new(catalog: &'a C, interface: &str) -> Result<Self> {
        let interface = catalog
            .interface(interface)
            .ok_or_else(|| Error::unresolved(interface, "no such interface"))?;
        Ok(Self { catalog, interface })
    }

    pub fn interface(&self) -> &InterfaceDecl {
        self.interface
    }

    /// Declared methods, by destination identity then method name
    pub fn ordered_methods(&self) -> Vec<&'a InterfaceMethod> {
        let mut methods: Vec<&InterfaceMethod> = self.interface.methods.values().collect();
        methods.sort_by(|a, b| {
            (&a.destination.identity, &a.name).cmp(&(&b.destination.identity, &b.name))
        });
        methods
    }

    /// Both passes
    pub fn run(&self) -> Result<GeneratedMapper> {
        let cache = self.pass_one()?;
        let snapshot = cache.stabilize();
        debug!(
            interface = %self.interface.identity,
            signatures = cache.len(),
            fallible = snapshot.fallible_signatures().count(),
            "fallibility stabilized"
        );
        self.pass_two(&snapshot)
    }

    /// Speculative pass: discover units and record fallibility
    pub fn pass_one(&self) -> Result<SignatureCache> {
        let walk = self.walk(&FallibilitySnapshot::empty(), Pass::Speculative)?;
        Ok(walk.cache)
    }

    /// Enforcing pass against a frozen snapshot
    pub fn pass_two(&self, snapshot: &FallibilitySnapshot) -> Result<GeneratedMapper> {
        let walk = self.walk(snapshot, Pass::Final)?;

        // Anything fallible now but not in the snapshot was called unchecked
        let observed = walk.cache.stabilize();
        if let Some(missed) = observed
            .fallible_signatures()
            .find(|sig| !snapshot.is_fallible(sig))
        {
            return Err(Error::FallibleWithoutErrorSignature {
                method: walk.cache.origin(missed).unwrap_or_default().to_string(),
                field: observed.culprit(missed).unwrap_or_default().to_string(),
            });
        }

        let Walk {
            cache,
            mut units,
            entry_points,
            dependencies,
        } = walk;
        for (signature, unit) in units.iter_mut() {
            unit.fallible = snapshot.is_fallible(signature);
            unit.references = cache.references(signature);
        }

        let signatures = cache.records(snapshot);
        let metadata = GenerationMetadata {
            engine_version: crate::VERSION.to_string(),
            unit_count: units.len(),
            entry_point_count: entry_points.len(),
            transform_count: signatures
                .iter()
                .filter(|r| !r.signature.is_structural())
                .count(),
            fallible_signature_count: signatures.iter().filter(|r| r.fallible).count(),
        };

        let name = &self.interface.identity.name;
        let mapper = GeneratedMapper {
            interface: self.interface.identity.clone(),
            implementation: format!("{}Impl", name),
            constructor: format!("New{}Impl", name),
            receiver: naming::short_name(name),
            units: units.into_values().collect(),
            entry_points,
            dependencies,
            signatures,
            metadata,
        };
        info!(
            interface = %mapper.interface,
            units = mapper.units.len(),
            entry_points = mapper.entry_points.len(),
            "assembled mapper"
        );
        Ok(mapper)
    }

    fn walk(&self, snapshot: &FallibilitySnapshot, pass: Pass) -> Result<Walk> {
        let resolver = Resolver::new(self.catalog, snapshot);
        let mut walk = Walk {
            cache: SignatureCache::new(),
            units: BTreeMap::new(),
            entry_points: Vec::new(),
            dependencies: BTreeMap::new(),
        };
        let mut queue = VecDeque::new();

        let methods = self.ordered_methods();
        let mut delegates = Vec::with_capacity(methods.len());
        for method in &methods {
            let signature = self.entry_signature(method)?;
            if walk.cache.register(&signature, &method.name) {
                queue.push_back(signature.clone());
            }
            delegates.push(signature);
        }

        while let Some(signature) = queue.pop_front() {
            let origin = walk
                .cache
                .origin(&signature)
                .unwrap_or_default()
                .to_string();
            let unit = self
                .build_unit(&resolver, &signature, snapshot, pass, &mut walk, &mut queue)
                .map_err(|e| e.in_method(&origin))?;
            walk.units.insert(signature, unit);
        }

        for (method, signature) in methods.iter().zip(delegates) {
            let entry = self.build_entry(&resolver, method, signature, snapshot, pass)?;
            walk.entry_points.push(entry);
        }
        Ok(walk)
    }

    /// Validate a declared method and return the unit it delegates to
    fn entry_signature(&self, method: &InterfaceMethod) -> Result<MapperSignature> {
        let (source, destination) = (&method.source, &method.destination);
        if !self.catalog.is_struct(&source.identity)
            || !self.catalog.is_struct(&destination.identity)
        {
            return Err(Error::NoConversionPath {
                method: method.name.clone(),
                field: ARGUMENT.to_string(),
                from: source.to_string(),
                to: destination.to_string(),
                reason: Some("interface methods convert between struct types".to_string()),
            });
        }
        Ok(MapperSignature::structural(
            source.identity.clone(),
            destination.identity.clone(),
        ))
    }

    fn build_unit(
        &self,
        resolver: &Resolver<'_, C>,
        signature: &MapperSignature,
        snapshot: &FallibilitySnapshot,
        pass: Pass,
        walk: &mut Walk,
        queue: &mut VecDeque<MapperSignature>,
    ) -> Result<SharedUnit> {
        let source = self.decl(&signature.source)?;
        let destination = self.decl(&signature.destination)?;
        let surface = match pass {
            Pass::Speculative => ErrorSurface::Speculative,
            Pass::Final => ErrorSurface::Declared {
                can_fail: snapshot.is_fallible(signature),
            },
        };
        let mut synth = Synthesizer::new(surface);
        let source_shape = source.shape();

        let mut fields = Vec::with_capacity(destination.fields.len());
        let mut skipped = Vec::new();
        for field in destination.fields.values() {
            let Some(plan) = resolver.resolve(source, destination, field)? else {
                skipped.push(field.name.clone());
                continue;
            };
            self.record(signature, &plan, walk, queue);
            let steps = synth
                .synthesize_plan(&plan, &source_shape)
                .map_err(|e| e.in_field(&field.name))?;
            fields.push(plan.with_steps(steps));
        }

        let name = naming::unit_name(&signature.source, &signature.destination);
        debug!(unit = %name, fields = fields.len(), skipped = skipped.len(), "built unit");
        Ok(SharedUnit {
            name,
            signature: signature.clone(),
            fallible: false,
            references: 0,
            fields,
            skipped,
        })
    }

    /// Record what `plan` needs: fallibility, transforms, sub-mappers, receivers
    fn record(
        &self,
        unit: &MapperSignature,
        plan: &ConversionPlan,
        walk: &mut Walk,
        queue: &mut VecDeque<MapperSignature>,
    ) {
        let field = &plan.destination.name;
        let origin = walk.cache.origin(unit).unwrap_or_default().to_string();
        if plan.is_directly_fallible() {
            walk.cache.mark_fallible(unit, field);
        }
        for link in &plan.links {
            match link {
                ResolvedSource::Transform {
                    reference,
                    signature,
                } => {
                    if let Some(param) = signature.argument_shape() {
                        let key = MapperSignature::transform(
                            param.identity,
                            signature.result.identity.clone(),
                            reference.clone(),
                        );
                        walk.cache.register(&key, &origin);
                        if signature.fallible {
                            walk.cache.mark_fallible(&key, field);
                        }
                    }
                    if let Some(receiver) = reference.receiver() {
                        walk.dependencies
                            .insert(naming::dependency_name(&receiver), receiver);
                    }
                }
                ResolvedSource::SubMapper { signature, .. } => {
                    if walk.cache.register(signature, &origin) {
                        queue.push_back(signature.clone());
                    }
                    walk.cache.depend(unit, signature, field);
                }
                ResolvedSource::DirectField(_) | ResolvedSource::MethodCall(_) => {}
            }
        }
    }

    fn build_entry(
        &self,
        resolver: &Resolver<'_, C>,
        method: &InterfaceMethod,
        signature: MapperSignature,
        snapshot: &FallibilitySnapshot,
        pass: Pass,
    ) -> Result<EntryPoint> {
        let surface = match pass {
            Pass::Speculative => ErrorSurface::Speculative,
            Pass::Final => ErrorSurface::Declared {
                can_fail: method.fallible,
            },
        };
        let delegate = resolver.sub_mapper(&signature.source, &signature.destination);
        let unit = naming::unit_name(&signature.source, &signature.destination);
        let op = Operation::from_source(&delegate).ok_or_else(|| {
            Error::from(anyhow::anyhow!("sub-mapper link without an operation"))
        })?;

        let steps = Synthesizer::new(surface)
            .invoke(
                Operand::Parameter,
                &method.source,
                &op,
                Place::Result,
                &method.destination,
            )
            .map_err(|e| match e {
                Error::FallibleWithoutErrorSignature { .. } => {
                    Error::FallibleWithoutErrorSignature {
                        method: method.name.clone(),
                        field: snapshot.culprit(&signature).unwrap_or_default().to_string(),
                    }
                }
                other => other.in_field(ARGUMENT).in_method(&method.name),
            })?;

        Ok(EntryPoint {
            name: method.name.clone(),
            source: method.source.clone(),
            destination: method.destination.clone(),
            variadic: method.variadic,
            fallible: method.fallible,
            unit,
            delegate: signature,
            steps,
        })
    }

    fn decl(&self, identity: &TypeIdentity) -> Result<&'a TypeDecl> {
        self.catalog
            .type_decl(identity)
            .ok_or_else(|| Error::unresolved(identity.to_string(), "type is not declared"))
    }
}

/// Generate the mapper for `interface`
pub fn generate<C: TypeCatalog + ?Sized>(catalog: &C, interface: &str) -> Result<GeneratedMapper> {
    MapperAssembly::new(catalog, interface)?.run()
}

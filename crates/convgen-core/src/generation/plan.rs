//! Resolved plans and assembled units
//!
//! These are the values handed to the emitter. Everything here is plain
//! data with stable ordering, so serializing a [`GeneratedMapper`] twice for
//! the same input gives identical bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::directive::TransformRef;
use crate::generation::cache::{Fallibility, FallibilitySnapshot};
use crate::generation::steps::SynthesisStep;
use crate::types::{FieldDescriptor, MethodSignature, TypeIdentity, TypeShape};

/// How a signature converts between its identities
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "transform", rename_all = "snake_case")]
pub enum Via {
    /// Field-by-field private unit
    Structural,
    /// A named conversion routine
    Transform(TransformRef),
}

/// Deduplication key for conversions, optionality and multiplicity stripped
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MapperSignature {
    pub source: TypeIdentity,
    pub destination: TypeIdentity,
    pub via: Via,
}

impl MapperSignature {
    pub fn structural(source: TypeIdentity, destination: TypeIdentity) -> Self {
        Self {
            source,
            destination,
            via: Via::Structural,
        }
    }

    pub fn transform(source: TypeIdentity, destination: TypeIdentity, via: TransformRef) -> Self {
        Self {
            source,
            destination,
            via: Via::Transform(via),
        }
    }

    pub fn is_structural(&self) -> bool {
        self.via == Via::Structural
    }
}

impl fmt::Display for MapperSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source.short(), self.destination.short())?;
        if let Via::Transform(reference) = &self.via {
            write!(f, " via {}", reference)?;
        }
        Ok(())
    }
}

/// One link of a field's conversion chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedSource {
    /// Read a stored field of the source
    DirectField(FieldDescriptor),
    /// Call a zero-argument method of the source
    MethodCall(MethodSignature),
    /// Apply a directive-referenced routine
    Transform {
        reference: TransformRef,
        signature: MethodSignature,
    },
    /// Delegate to a shared private unit
    SubMapper {
        unit: String,
        signature: MapperSignature,
        fallible: bool,
    },
}

impl ResolvedSource {
    /// Whether this link alone can fail
    pub fn is_fallible(&self) -> bool {
        match self {
            ResolvedSource::DirectField(_) => false,
            ResolvedSource::MethodCall(sig) | ResolvedSource::Transform { signature: sig, .. } => {
                sig.fallible
            }
            ResolvedSource::SubMapper { fallible, .. } => *fallible,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResolvedSource::DirectField(_) => "DirectField",
            ResolvedSource::MethodCall(_) => "MethodCall",
            ResolvedSource::Transform { .. } => "Transform",
            ResolvedSource::SubMapper { .. } => "SubMapper",
        }
    }
}

/// Resolved answer for one destination field
///
/// `read` fetches the value from the source; `links` convert it, in order.
/// The principal source of the plan is the last link, or the read itself
/// for a plain copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionPlan {
    pub destination: FieldDescriptor,
    pub read: ResolvedSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<ResolvedSource>,
    pub fallible: bool,
    #[serde(default)]
    pub steps: Vec<SynthesisStep>,
}

impl ConversionPlan {
    pub fn new(destination: FieldDescriptor, read: ResolvedSource) -> Self {
        let fallible = read.is_fallible();
        Self {
            destination,
            read,
            links: Vec::new(),
            fallible,
            steps: Vec::new(),
        }
    }

    /// Append a conversion link
    pub fn then(mut self, link: ResolvedSource) -> Self {
        self.fallible |= link.is_fallible();
        self.links.push(link);
        self
    }

    pub fn with_steps(mut self, steps: Vec<SynthesisStep>) -> Self {
        self.steps = steps;
        self
    }

    pub fn source(&self) -> &ResolvedSource {
        self.links.last().unwrap_or(&self.read)
    }

    /// The read followed by every link
    pub fn route(&self) -> impl Iterator<Item = &ResolvedSource> {
        std::iter::once(&self.read).chain(self.links.iter())
    }

    /// Whether the read or a routine of the chain fails on its own, not
    /// counting sub-mappers
    pub fn is_directly_fallible(&self) -> bool {
        self.route()
            .filter(|link| !matches!(link, ResolvedSource::SubMapper { .. }))
            .any(ResolvedSource::is_fallible)
    }
}

/// Private conversion unit shared by every use of one structural signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedUnit {
    pub name: String,
    pub signature: MapperSignature,
    pub fallible: bool,
    pub references: usize,
    pub fields: Vec<ConversionPlan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl SharedUnit {
    pub fn field(&self, name: &str) -> Option<&ConversionPlan> {
        self.fields.iter().find(|p| p.destination.name == name)
    }
}

/// Public interface method delegating to a shared unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub source: TypeShape,
    pub destination: TypeShape,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub variadic: bool,
    pub fallible: bool,
    pub unit: String,
    pub delegate: MapperSignature,
    pub steps: Vec<SynthesisStep>,
}

/// One entry of the signature cache as reported to the emitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signature: MapperSignature,
    pub fallible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culprit: Option<String>,
    pub references: usize,
}

/// Summary counts of a generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub engine_version: String,
    pub unit_count: usize,
    pub entry_point_count: usize,
    pub transform_count: usize,
    pub fallible_signature_count: usize,
}

/// Everything the emitter needs for one interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMapper {
    pub interface: TypeIdentity,
    /// Concrete type implementing the interface, e.g. `MapperImpl`
    pub implementation: String,
    /// Constructor of the implementation, e.g. `NewMapperImpl`
    pub constructor: String,
    /// Receiver name used in every unit, e.g. `m`
    pub receiver: String,
    pub units: Vec<SharedUnit>,
    pub entry_points: Vec<EntryPoint>,
    /// Injected receivers of type-method transforms, keyed by binding name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, TypeIdentity>,
    pub signatures: Vec<SignatureRecord>,
    pub metadata: GenerationMetadata,
}

impl GeneratedMapper {
    pub fn unit(&self, name: &str) -> Option<&SharedUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn entry_point(&self, name: &str) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|e| e.name == name)
    }

    pub fn signature(&self, signature: &MapperSignature) -> Option<&SignatureRecord> {
        self.signatures.iter().find(|r| &r.signature == signature)
    }

    /// Fallibility as observed by this run, usable as input to another pass
    pub fn snapshot(&self) -> FallibilitySnapshot {
        self.signatures
            .iter()
            .map(|r| {
                (
                    r.signature.clone(),
                    Fallibility {
                        fallible: r.fallible,
                        culprit: r.culprit.clone(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDescriptor, TypeShape};

    #[test]
    fn test_signature_ordering_separates_routes() {
        let int = TypeIdentity::primitive("int");
        let string = TypeIdentity::primitive("string");
        let a = MapperSignature::transform(
            int.clone(),
            string.clone(),
            TransformRef::Function {
                module: None,
                name: "Itoa".to_string(),
            },
        );
        let b = MapperSignature::transform(
            int.clone(),
            string.clone(),
            TransformRef::Function {
                module: None,
                name: "Format".to_string(),
            },
        );
        assert_ne!(a, b);
        assert!(MapperSignature::structural(int.clone(), string.clone()) < a);
        assert_eq!(a.to_string(), "int -> string via Itoa");
    }

    #[test]
    fn test_plan_source_and_fallibility() {
        let field = FieldDescriptor::new("ID", TypeShape::primitive("int"));
        let plan = ConversionPlan::new(field.clone(), ResolvedSource::DirectField(field.clone()));
        assert_eq!(plan.source().name(), "DirectField");
        assert!(!plan.fallible);

        let parse = MethodSignature::function(
            None,
            "Parse",
            TypeShape::primitive("int"),
            TypeShape::primitive("string"),
        )
        .fallible();
        let plan = plan.then(ResolvedSource::Transform {
            reference: TransformRef::Function {
                module: None,
                name: "Parse".to_string(),
            },
            signature: parse,
        });
        assert_eq!(plan.source().name(), "Transform");
        assert!(plan.fallible);
        assert!(plan.is_directly_fallible());
        assert_eq!(plan.route().count(), 2);
    }
}

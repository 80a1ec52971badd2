//! Type shape model
//!
//! Immutable descriptors for every field, parameter and return type the
//! engine looks at. Shapes carry identity plus the three properties the
//! synthesizer reconciles: optionality, multiplicity and category.
//! Struct members are not embedded in the shape; they live in the
//! [`TypeCatalog`](crate::catalog::TypeCatalog) keyed by identity, which keeps
//! self-referential types finite.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::directive::Directive;

/// Qualified type name: module path plus type name
///
/// Primitives and the error marker have no module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub name: String,
}

impl TypeIdentity {
    /// Create an identity inside a module
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            name: name.into(),
        }
    }

    /// Create a module-less identity (primitives, builtins)
    pub fn primitive(name: impl Into<String>) -> Self {
        Self {
            module: None,
            name: name.into(),
        }
    }

    /// Last segment of the module path, e.g. `app` for `github.com/acme/app`
    pub fn module_base(&self) -> Option<&str> {
        self.module
            .as_deref()
            .map(|m| m.rsplit('/').next().unwrap_or(m))
            .filter(|m| !m.is_empty())
    }

    /// Package-qualified short form, e.g. `app.User`
    pub fn short(&self) -> String {
        match self.module_base() {
            Some(base) => format!("{}.{}", base, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{}.{}", module, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Whether a value is a single item or an ordered sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    Scalar,
    Collection,
}

/// Broad kind of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Struct,
    Interface,
    Primitive,
    ErrorMarker,
}

/// Shape of a field, parameter or return value
///
/// For a `Collection`, `optional` describes the element: `[]*T` is an
/// optional collection shape, `[]T` a required one. A collection is never
/// absent itself; an empty sequence stands for "nothing".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeShape {
    pub identity: TypeIdentity,
    #[serde(default)]
    pub optional: bool,
    pub multiplicity: Multiplicity,
    pub category: Category,
}

impl TypeShape {
    /// Create a required scalar shape
    pub fn scalar(identity: TypeIdentity, category: Category) -> Self {
        Self {
            identity,
            optional: false,
            multiplicity: Multiplicity::Scalar,
            category,
        }
    }

    /// Required scalar primitive, e.g. `int`
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::scalar(TypeIdentity::primitive(name), Category::Primitive)
    }

    /// Required scalar struct
    pub fn structure(identity: TypeIdentity) -> Self {
        Self::scalar(identity, Category::Struct)
    }

    /// Same shape, optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Same shape with the given optionality
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Same shape as a collection of it
    pub fn collection(mut self) -> Self {
        self.multiplicity = Multiplicity::Collection;
        self
    }

    /// Shape of one item: the shape itself for scalars, the element for collections
    pub fn element(&self) -> TypeShape {
        Self {
            multiplicity: Multiplicity::Scalar,
            ..self.clone()
        }
    }

    pub fn is_collection(&self) -> bool {
        self.multiplicity == Multiplicity::Collection
    }

    pub fn is_struct(&self) -> bool {
        self.category == Category::Struct
    }

    /// Whether both shapes name the same type, ignoring optionality and multiplicity
    pub fn same_identity(&self, other: &TypeShape) -> bool {
        self.identity == other.identity
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_collection() {
            write!(f, "[]")?;
        }
        if self.optional {
            write!(f, "*")?;
        }
        write!(f, "{}", self.identity.short())
    }
}

/// Whether a member is a stored field or a zero-argument accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Field,
    Method,
}

/// One struct field or zero-argument accessor method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub shape: TypeShape,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directive: Option<Directive>,
}

impl FieldDescriptor {
    /// Create a stored field without a directive
    pub fn new(name: impl Into<String>, shape: TypeShape) -> Self {
        Self {
            name: name.into(),
            shape,
            origin: Origin::Field,
            directive: None,
        }
    }

    /// Attach a directive; a directive with no effect is dropped
    pub fn with_directive(mut self, directive: Option<Directive>) -> Self {
        self.directive = directive.filter(|d| !d.is_empty());
        self
    }

    /// Whether the field is excluded from mapping
    pub fn is_ignored(&self) -> bool {
        self.directive.as_ref().is_some_and(|d| d.ignored)
    }
}

/// Signature of a function, type method, accessor or interface method
///
/// `receiver` is set for methods (the owning type); `param` is unset for
/// zero-argument accessors. A fallible signature returns a value plus a
/// failure outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<TypeIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<TypeShape>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub variadic: bool,
    pub result: TypeShape,
    #[serde(default)]
    pub fallible: bool,
}

impl MethodSignature {
    /// Free function taking one argument
    pub fn function(
        module: Option<String>,
        name: impl Into<String>,
        param: TypeShape,
        result: TypeShape,
    ) -> Self {
        Self {
            name: name.into(),
            module,
            receiver: None,
            param: Some(param),
            variadic: false,
            result,
            fallible: false,
        }
    }

    /// Zero-argument accessor on `receiver`
    pub fn accessor(receiver: TypeIdentity, name: impl Into<String>, result: TypeShape) -> Self {
        Self {
            name: name.into(),
            module: receiver.module.clone(),
            receiver: Some(receiver),
            param: None,
            variadic: false,
            result,
            fallible: false,
        }
    }

    /// One-argument method on `receiver`
    pub fn method(
        receiver: TypeIdentity,
        name: impl Into<String>,
        param: TypeShape,
        result: TypeShape,
    ) -> Self {
        Self {
            name: name.into(),
            module: receiver.module.clone(),
            receiver: Some(receiver),
            param: Some(param),
            variadic: false,
            result,
            fallible: false,
        }
    }

    /// Mark the signature as returning a failure outcome
    pub fn fallible(mut self) -> Self {
        self.fallible = true;
        self
    }

    /// Mark the single parameter as variadic
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn is_accessor(&self) -> bool {
        self.param.is_none()
    }

    /// Shape of the argument as seen by a caller; variadic parameters are collections
    pub fn argument_shape(&self) -> Option<TypeShape> {
        self.param.as_ref().map(|p| {
            if self.variadic {
                p.clone().collection()
            } else {
                p.clone()
            }
        })
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(receiver) = &self.receiver {
            write!(f, "{}.", receiver.short())?;
        }
        write!(f, "{}(", self.name)?;
        if let Some(param) = &self.param {
            if self.variadic {
                write!(f, "...{}", param)?;
            } else {
                write!(f, "{}", param)?;
            }
        }
        write!(f, ") {}", self.result)?;
        if self.fallible {
            write!(f, ", error")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display_and_short() {
        let id = TypeIdentity::new("github.com/acme/app", "User");
        assert_eq!(id.to_string(), "github.com/acme/app.User");
        assert_eq!(id.short(), "app.User");
        assert_eq!(id.module_base(), Some("app"));

        let int = TypeIdentity::primitive("int");
        assert_eq!(int.short(), "int");
        assert_eq!(int.module_base(), None);
    }

    #[test]
    fn test_shape_display() {
        let user = TypeShape::structure(TypeIdentity::new("main", "User"));
        assert_eq!(user.to_string(), "main.User");
        assert_eq!(user.clone().optional().to_string(), "*main.User");
        assert_eq!(user.clone().optional().collection().to_string(), "[]*main.User");
    }

    #[test]
    fn test_element_strips_multiplicity_only() {
        let shape = TypeShape::primitive("int64").optional().collection();
        let element = shape.element();
        assert_eq!(element.multiplicity, Multiplicity::Scalar);
        assert!(element.optional);
        assert!(element.same_identity(&shape));
    }

    #[test]
    fn test_variadic_argument_is_collection() {
        let sig = MethodSignature::function(
            None,
            "Join",
            TypeShape::primitive("string"),
            TypeShape::primitive("string"),
        )
        .variadic();
        assert!(sig.argument_shape().is_some_and(|s| s.is_collection()));
        assert_eq!(sig.to_string(), "Join(...string) string");
    }

    #[test]
    fn test_shape_serialization() {
        let shape = TypeShape::primitive("string").optional();
        let json = serde_json::to_value(&shape).unwrap();
        assert_eq!(json["identity"]["name"], "string");
        assert!(json["identity"].get("module").is_none());
        assert_eq!(json["multiplicity"], "scalar");
        assert_eq!(json["category"], "primitive");
    }
}

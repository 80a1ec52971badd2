//! Type catalog: the boundary to the introspection front-end
//!
//! The engine never inspects source code. Everything it knows about types,
//! conversion functions and the declared interface comes through
//! [`TypeCatalog`]. Lookups are by name; iteration is always in sorted order
//! so regeneration is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Category, FieldDescriptor, MethodSignature, TypeIdentity, TypeShape};

/// Declaration of a named type: its stored fields and zero-argument methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub identity: TypeIdentity,
    pub category: Category,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDescriptor>,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodSignature>,
}

impl TypeDecl {
    /// Create an empty struct declaration
    pub fn structure(identity: TypeIdentity) -> Self {
        Self {
            identity,
            category: Category::Struct,
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
        }
    }

    /// Add a stored field
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Add a method; the receiver is forced to this type
    pub fn with_method(mut self, mut method: MethodSignature) -> Self {
        method.receiver = Some(self.identity.clone());
        self.methods.insert(method.name.clone(), method);
        self
    }

    /// Required scalar shape of this type
    pub fn shape(&self) -> TypeShape {
        TypeShape::scalar(self.identity.clone(), self.category)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Zero-argument method usable as a field accessor
    pub fn accessor(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.get(name).filter(|m| m.is_accessor())
    }
}

/// One "convert A to B" method of a declared interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMethod {
    pub name: String,
    pub source: TypeShape,
    pub destination: TypeShape,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub variadic: bool,
    #[serde(default)]
    pub fallible: bool,
}

impl InterfaceMethod {
    pub fn new(name: impl Into<String>, source: TypeShape, destination: TypeShape) -> Self {
        Self {
            name: name.into(),
            source,
            destination,
            variadic: false,
            fallible: false,
        }
    }

    pub fn fallible(mut self) -> Self {
        self.fallible = true;
        self
    }

    /// Variadic source; the argument is seen as a collection
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self.source = self.source.collection();
        self
    }
}

/// A declared conversion interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub identity: TypeIdentity,
    #[serde(default)]
    pub methods: BTreeMap<String, InterfaceMethod>,
}

impl InterfaceDecl {
    pub fn new(identity: TypeIdentity) -> Self {
        Self {
            identity,
            methods: BTreeMap::new(),
        }
    }

    pub fn with_method(mut self, method: InterfaceMethod) -> Self {
        self.methods.insert(method.name.clone(), method);
        self
    }
}

/// Read-only view of everything the front-end introspected
pub trait TypeCatalog {
    /// Declaration of a named type
    fn type_decl(&self, identity: &TypeIdentity) -> Option<&TypeDecl>;

    /// Free function `module.name`
    fn function(&self, module: Option<&str>, name: &str) -> Option<&MethodSignature>;

    /// Method `module.type_name.method`
    fn type_method(
        &self,
        module: Option<&str>,
        type_name: &str,
        method: &str,
    ) -> Option<&MethodSignature>;

    /// Declared interface by name (short or qualified)
    fn interface(&self, name: &str) -> Option<&InterfaceDecl>;

    /// Whether `identity` names a struct declaration
    fn is_struct(&self, identity: &TypeIdentity) -> bool {
        self.type_decl(identity)
            .is_some_and(|decl| decl.category == Category::Struct)
    }
}

/// Catalog backed by sorted maps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryCatalog {
    types: BTreeMap<TypeIdentity, TypeDecl>,
    functions: BTreeMap<(Option<String>, String), MethodSignature>,
    interfaces: BTreeMap<TypeIdentity, InterfaceDecl>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, decl: TypeDecl) -> &mut Self {
        self.types.insert(decl.identity.clone(), decl);
        self
    }

    pub fn add_function(&mut self, function: MethodSignature) -> &mut Self {
        self.functions
            .insert((function.module.clone(), function.name.clone()), function);
        self
    }

    pub fn add_interface(&mut self, interface: InterfaceDecl) -> &mut Self {
        self.interfaces.insert(interface.identity.clone(), interface);
        self
    }

    /// Builder-style variant of [`add_type`](Self::add_type)
    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.add_type(decl);
        self
    }

    /// Builder-style variant of [`add_function`](Self::add_function)
    pub fn with_function(mut self, function: MethodSignature) -> Self {
        self.add_function(function);
        self
    }

    /// Builder-style variant of [`add_interface`](Self::add_interface)
    pub fn with_interface(mut self, interface: InterfaceDecl) -> Self {
        self.add_interface(interface);
        self
    }
}

impl TypeCatalog for InMemoryCatalog {
    fn type_decl(&self, identity: &TypeIdentity) -> Option<&TypeDecl> {
        self.types.get(identity)
    }

    fn function(&self, module: Option<&str>, name: &str) -> Option<&MethodSignature> {
        self.functions
            .get(&(module.map(str::to_string), name.to_string()))
    }

    fn type_method(
        &self,
        module: Option<&str>,
        type_name: &str,
        method: &str,
    ) -> Option<&MethodSignature> {
        let identity = TypeIdentity {
            module: module.map(str::to_string),
            name: type_name.to_string(),
        };
        self.types
            .get(&identity)
            .and_then(|decl| decl.methods.get(method))
            .filter(|m| !m.is_accessor())
    }

    fn interface(&self, name: &str) -> Option<&InterfaceDecl> {
        self.interfaces
            .values()
            .find(|i| i.identity.name == name || i.identity.to_string() == name)
    }
}

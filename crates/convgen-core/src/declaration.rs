//! Declaration documents
//!
//! A declaration describes, in JSON or YAML, what an introspection
//! front-end would otherwise extract from source code: the interfaces to
//! implement, the struct types they convert, and the conversion functions
//! that field tags refer to.
//!
//! Type references use a compact form: `int`, `*int`, `[]*User`,
//! `...string`, or a module-qualified `github.com/acme/app.User`. Names
//! without a module belong to the document's `package` unless they are
//! builtins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{InMemoryCatalog, InterfaceDecl, InterfaceMethod, TypeDecl};
use crate::directive::parse_tag;
use crate::error::{Error, Result};
use crate::types::{Category, FieldDescriptor, MethodSignature, TypeIdentity, TypeShape};

/// Builtin scalar names that never take the document package
const BUILTINS: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr", "byte", "rune", "float32", "float64", "complex64",
    "complex128", "any",
];

const ERROR_MARKER: &str = "error";

/// A type reference as written in a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeRef {
    /// `[]*pkg.Name` shorthand
    Short(String),
    Full {
        #[serde(rename = "type")]
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module: Option<String>,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        collection: bool,
        #[serde(default)]
        variadic: bool,
    },
}

/// Normalized form of a [`TypeRef`]
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedRef {
    module: Option<String>,
    name: String,
    optional: bool,
    collection: bool,
    variadic: bool,
}

impl TypeRef {
    fn parse(&self) -> Result<ParsedRef> {
        match self {
            TypeRef::Full {
                name,
                module,
                optional,
                collection,
                variadic,
            } => Ok(ParsedRef {
                module: module.clone(),
                name: name.clone(),
                optional: *optional,
                collection: *collection,
                variadic: *variadic,
            }),
            TypeRef::Short(text) => {
                let mut rest = text.trim();
                let variadic = rest.starts_with("...");
                if variadic {
                    rest = &rest[3..];
                }
                let collection = rest.starts_with("[]");
                if collection {
                    rest = &rest[2..];
                }
                let optional = rest.starts_with('*');
                if optional {
                    rest = &rest[1..];
                }
                let (module, name) = match rest.rfind('.') {
                    Some(idx) => (Some(rest[..idx].to_string()), &rest[idx + 1..]),
                    None => (None, rest),
                };
                if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    return Err(Error::declaration(format!("invalid type reference '{}'", text)));
                }
                Ok(ParsedRef {
                    module: module.filter(|m| !m.is_empty()),
                    name: name.to_string(),
                    optional,
                    collection,
                    variadic,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Struct,
    Interface,
    Primitive,
}

impl From<TypeKind> for Category {
    fn from(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Struct => Category::Struct,
            TypeKind::Interface => Category::Interface,
            TypeKind::Primitive => Category::Primitive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Raw struct tag or directive body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    /// Omitted for zero-argument accessors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<TypeRef>,
    pub returns: TypeRef,
    #[serde(default)]
    pub fallible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub param: TypeRef,
    pub returns: TypeRef,
    #[serde(default)]
    pub fallible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMethodSpec {
    pub name: String,
    pub source: TypeRef,
    pub destination: TypeRef,
    #[serde(default)]
    pub fallible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub methods: Vec<InterfaceMethodSpec>,
}

/// Top-level declaration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Module of every unqualified, non-builtin name
    pub package: String,
    #[serde(default)]
    pub interfaces: Vec<InterfaceSpec>,
    #[serde(default)]
    pub types: Vec<TypeSpec>,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
}

impl Declaration {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Interface names in declaration order
    pub fn interface_names(&self) -> Vec<&str> {
        self.interfaces.iter().map(|i| i.name.as_str()).collect()
    }

    /// Build a catalog, optionally replacing the document package
    pub fn into_catalog(self, package_override: Option<&str>) -> Result<InMemoryCatalog> {
        let package = package_override.unwrap_or(&self.package).to_string();
        if package.is_empty() {
            return Err(Error::declaration("package must not be empty"));
        }
        let builder = CatalogBuilder::new(&package, &self.types)?;
        builder.build(&self)
    }
}

/// Resolves references against the declared type table
struct CatalogBuilder<'a> {
    package: &'a str,
    categories: BTreeMap<TypeIdentity, Category>,
}

impl<'a> CatalogBuilder<'a> {
    fn new(package: &'a str, types: &[TypeSpec]) -> Result<Self> {
        let mut categories = BTreeMap::new();
        for spec in types {
            let identity = TypeIdentity::new(spec.module.as_deref().unwrap_or(package), &spec.name);
            if categories.insert(identity.clone(), spec.kind.into()).is_some() {
                return Err(Error::declaration(format!("type {} is declared twice", identity)));
            }
        }
        Ok(Self {
            package,
            categories,
        })
    }

    fn module_of(&self, explicit: Option<&str>) -> String {
        explicit.unwrap_or(self.package).to_string()
    }

    fn shape(&self, reference: &TypeRef) -> Result<(TypeShape, bool)> {
        let parsed = reference.parse()?;
        let (identity, category) = match parsed.module {
            None if BUILTINS.contains(&parsed.name.as_str()) => (
                TypeIdentity::primitive(&parsed.name),
                Category::Primitive,
            ),
            None if parsed.name == ERROR_MARKER => {
                (TypeIdentity::primitive(ERROR_MARKER), Category::ErrorMarker)
            }
            module => {
                let identity = TypeIdentity::new(self.module_of(module.as_deref()), &parsed.name);
                let category = self.categories.get(&identity).copied().ok_or_else(|| {
                    Error::unresolved(identity.to_string(), "type is not declared")
                })?;
                (identity, category)
            }
        };
        let mut shape = TypeShape::scalar(identity, category).with_optional(parsed.optional);
        if parsed.collection {
            shape = shape.collection();
        }
        Ok((shape, parsed.variadic))
    }

    fn build(&self, declaration: &Declaration) -> Result<InMemoryCatalog> {
        let mut catalog = InMemoryCatalog::new();

        for spec in &declaration.types {
            let identity = TypeIdentity::new(self.module_of(spec.module.as_deref()), &spec.name);
            let mut decl = TypeDecl {
                identity: identity.clone(),
                category: spec.kind.into(),
                fields: BTreeMap::new(),
                methods: BTreeMap::new(),
            };
            for field in &spec.fields {
                let (shape, _) = self.shape(&field.ty)?;
                let directive = match &field.tag {
                    Some(tag) => parse_tag(tag).map_err(|e| match e {
                        Error::InvalidDirective { tag, reason } => Error::InvalidDirective {
                            tag,
                            reason: format!("{}.{}: {}", spec.name, field.name, reason),
                        },
                        other => other,
                    })?,
                    None => None,
                };
                decl = decl
                    .with_field(FieldDescriptor::new(&field.name, shape).with_directive(directive));
            }
            for method in &spec.methods {
                let (result, _) = self.shape(&method.returns)?;
                let mut signature = match &method.param {
                    Some(param) => {
                        let (param, variadic) = self.shape(param)?;
                        let sig =
                            MethodSignature::method(identity.clone(), &method.name, param, result);
                        if variadic { sig.variadic() } else { sig }
                    }
                    None => MethodSignature::accessor(identity.clone(), &method.name, result),
                };
                signature.fallible = method.fallible;
                decl = decl.with_method(signature);
            }
            catalog.add_type(decl);
        }

        for function in &declaration.functions {
            let (param, variadic) = self.shape(&function.param)?;
            let (result, _) = self.shape(&function.returns)?;
            let mut signature = MethodSignature::function(
                Some(self.module_of(function.module.as_deref())),
                &function.name,
                param,
                result,
            );
            signature.variadic = variadic;
            signature.fallible = function.fallible;
            catalog.add_function(signature);
        }

        for interface in &declaration.interfaces {
            let identity =
                TypeIdentity::new(self.module_of(interface.module.as_deref()), &interface.name);
            let mut decl = InterfaceDecl::new(identity);
            for method in &interface.methods {
                let (source, variadic) = self.shape(&method.source)?;
                let (destination, _) = self.shape(&method.destination)?;
                let mut declared = InterfaceMethod::new(&method.name, source, destination);
                if variadic {
                    declared = declared.variadic();
                }
                if method.fallible {
                    declared = declared.fallible();
                }
                decl = decl.with_method(declared);
            }
            catalog.add_interface(decl);
        }

        Ok(catalog)
    }
}

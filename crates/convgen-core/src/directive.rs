//! Field directives and the tag grammar
//!
//! A directive is attached to a destination field and tells the resolver
//! where the value comes from and how it is converted:
//!
//! ```text
//! map:"<source>?,<transform>?"
//!
//!   source     Name | Name()            field, or zero-argument method
//!   transform  Func | Type.Method | module/path/Func | module/path/Type.Method
//!   "-"        exclude the field
//! ```
//!
//! # Example
//!
//! ```
//! use convgen_core::directive::{parse_tag, TransformRef};
//!
//! let directive = parse_tag(r#"json:"id" map:"ID,IntToString""#).unwrap().unwrap();
//! assert_eq!(directive.source_name(), Some("ID"));
//! assert!(matches!(directive.transform, Some(TransformRef::Function { .. })));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::types::{Origin, TypeIdentity};

static TAG_KEY_REGEX: OnceLock<Regex> = OnceLock::new();
static MAP_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static BODY_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_key_regex() -> &'static Regex {
    TAG_KEY_REGEX.get_or_init(|| Regex::new(r#"\w+:""#).unwrap())
}

fn map_tag_regex() -> &'static Regex {
    MAP_TAG_REGEX.get_or_init(|| Regex::new(r#"(?:^|\s)map:"([^"]*)""#).unwrap())
}

fn body_regex() -> &'static Regex {
    BODY_REGEX.get_or_init(|| {
        Regex::new(r"^(?P<source>\w+(?P<call>\(\))?)?(?:,(?P<transform>[\w./-]*))?$").unwrap()
    })
}

/// Source member named by a directive when it differs from the destination field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub origin: Origin,
}

/// Reference to a conversion routine named in a directive
///
/// A missing module means the routine lives next to the type declaring the
/// directive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformRef {
    Function {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module: Option<String>,
        name: String,
    },
    TypeMethod {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        module: Option<String>,
        type_name: String,
        method_name: String,
    },
}

impl TransformRef {
    pub fn module(&self) -> Option<&str> {
        match self {
            TransformRef::Function { module, .. } | TransformRef::TypeMethod { module, .. } => {
                module.as_deref()
            }
        }
    }

    /// Fill in the module for references written without one
    pub fn qualified(&self, default_module: Option<&str>) -> TransformRef {
        let fill = |module: &Option<String>| module.clone().or(default_module.map(str::to_string));
        match self {
            TransformRef::Function { module, name } => TransformRef::Function {
                module: fill(module),
                name: name.clone(),
            },
            TransformRef::TypeMethod {
                module,
                type_name,
                method_name,
            } => TransformRef::TypeMethod {
                module: fill(module),
                type_name: type_name.clone(),
                method_name: method_name.clone(),
            },
        }
    }

    /// Receiver type of a type-method transform
    pub fn receiver(&self) -> Option<TypeIdentity> {
        match self {
            TransformRef::Function { .. } => None,
            TransformRef::TypeMethod {
                module, type_name, ..
            } => Some(TypeIdentity {
                module: module.clone(),
                name: type_name.clone(),
            }),
        }
    }

    fn parse(tag: &str, text: &str) -> Result<Self> {
        let (module, expr) = match text.rfind('/') {
            Some(idx) => (Some(text[..idx].trim_end_matches('/')), &text[idx + 1..]),
            None => (None, text),
        };
        let module = module.filter(|m| !m.is_empty()).map(str::to_string);

        let parts: Vec<&str> = expr.split('.').collect();
        let invalid = |reason: &str| Error::InvalidDirective {
            tag: tag.to_string(),
            reason: reason.to_string(),
        };
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("transform name is empty"));
        }
        match parts.as_slice() {
            [name] => Ok(TransformRef::Function {
                module,
                name: name.to_string(),
            }),
            [type_name, method_name] => Ok(TransformRef::TypeMethod {
                module,
                type_name: type_name.to_string(),
                method_name: method_name.to_string(),
            }),
            _ => Err(invalid("transform must be Func or Type.Method")),
        }
    }
}

impl fmt::Display for TransformRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = self.module() {
            write!(f, "{}/", module)?;
        }
        match self {
            TransformRef::Function { name, .. } => write!(f, "{}", name),
            TransformRef::TypeMethod {
                type_name,
                method_name,
                ..
            } => write!(f, "{}.{}", type_name, method_name),
        }
    }
}

/// Parsed field annotation
///
/// `ignored` and `transform` never appear together, and a directive with
/// none of the three parts is treated as no directive at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformRef>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
}

impl Directive {
    /// Directive excluding the field
    pub fn ignore() -> Self {
        Self {
            ignored: true,
            ..Self::default()
        }
    }

    /// Directive converting the field through `transform`
    pub fn transform(transform: TransformRef) -> Self {
        Self {
            transform: Some(transform),
            ..Self::default()
        }
    }

    /// Read the value from a differently named source field
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(SourceRef {
            name: name.into(),
            origin: Origin::Field,
        });
        self
    }

    /// Read the value from a zero-argument source method
    pub fn from_method(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(SourceRef {
            name: name.into(),
            origin: Origin::Method,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rename.is_none() && self.transform.is_none() && !self.ignored
    }

    pub fn source_name(&self) -> Option<&str> {
        self.rename.as_ref().map(|r| r.name.as_str())
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ignored {
            return write!(f, "-");
        }
        if let Some(rename) = &self.rename {
            write!(f, "{}", rename.name)?;
            if rename.origin == Origin::Method {
                write!(f, "()")?;
            }
        }
        if let Some(transform) = &self.transform {
            write!(f, ",{}", transform)?;
        }
        Ok(())
    }
}

/// Parse a field annotation.
///
/// Accepts either a whole struct tag (`json:"id" map:"ID,Func"`) or just the
/// directive body (`ID,Func`). Returns `Ok(None)` when there is nothing to
/// apply: no `map` key, an empty body, or a body with no effect.
pub fn parse_tag(raw: &str) -> Result<Option<Directive>> {
    let raw = raw.trim();
    let body = if tag_key_regex().is_match(raw) {
        match map_tag_regex().captures(raw) {
            Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
            None => return Ok(None),
        }
    } else {
        raw
    };
    parse_body(raw, body.trim())
}

fn parse_body(tag: &str, body: &str) -> Result<Option<Directive>> {
    if body.is_empty() {
        return Ok(None);
    }
    if body == "-" {
        return Ok(Some(Directive::ignore()));
    }

    let caps = body_regex()
        .captures(body)
        .ok_or_else(|| Error::InvalidDirective {
            tag: tag.to_string(),
            reason: "expected \"<source>?,<transform>?\" or \"-\"".to_string(),
        })?;

    let mut directive = Directive::default();
    if let Some(source) = caps.name("source") {
        let name = source.as_str().trim_end_matches("()");
        directive = if caps.name("call").is_some() {
            directive.from_method(name)
        } else {
            directive.renamed(name)
        };
    }
    if let Some(transform) = caps.name("transform").filter(|m| !m.as_str().is_empty()) {
        directive.transform = Some(TransformRef::parse(tag, transform.as_str())?);
    }

    Ok(Some(directive).filter(|d| !d.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_function_transform() {
        let d = parse_tag(",IntToString").unwrap().unwrap();
        assert_eq!(d.rename, None);
        assert_eq!(
            d.transform,
            Some(TransformRef::Function {
                module: None,
                name: "IntToString".to_string()
            })
        );
    }

    #[test]
    fn test_parse_qualified_type_method() {
        let d = parse_tag(r#"map:"URL,github.com/acme/app/URLBuilder.Build""#)
            .unwrap()
            .unwrap();
        assert_eq!(d.source_name(), Some("URL"));
        assert_eq!(
            d.transform,
            Some(TransformRef::TypeMethod {
                module: Some("github.com/acme/app".to_string()),
                type_name: "URLBuilder".to_string(),
                method_name: "Build".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_method_source() {
        let d = parse_tag("CustomStatus()").unwrap().unwrap();
        let rename = d.rename.unwrap();
        assert_eq!(rename.name, "CustomStatus");
        assert_eq!(rename.origin, Origin::Method);
    }

    #[test]
    fn test_parse_ignore_and_empty() {
        assert!(parse_tag("-").unwrap().unwrap().ignored);
        assert_eq!(parse_tag("").unwrap(), None);
        assert_eq!(parse_tag(",").unwrap(), None);
        assert_eq!(parse_tag(r#"json:"name""#).unwrap(), None);
        assert_eq!(parse_tag(r#"map:"""#).unwrap(), None);
    }

    #[test]
    fn test_struct_tag_with_other_keys() {
        let d = parse_tag(r#"json:"id,omitempty" map:"-""#).unwrap().unwrap();
        assert!(d.ignored);
    }

    #[test]
    fn test_invalid_tags() {
        for raw in ["-,Func", "Name,a.b.c", "Na me", "Name,pkg/", "Name,.Method"] {
            let err = parse_tag(raw).unwrap_err();
            assert!(
                matches!(err, Error::InvalidDirective { .. }),
                "expected InvalidDirective for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_display_is_canonical() {
        for raw in [
            "-",
            "ID",
            "Status()",
            ",IntToString",
            "ID,strconv/Itoa",
            ",github.com/acme/app/Formatter.Format",
        ] {
            let d = parse_tag(raw).unwrap().unwrap();
            assert_eq!(d.to_string(), raw);
        }
    }

    #[test]
    fn test_qualified_fills_missing_module() {
        let t = TransformRef::Function {
            module: None,
            name: "IntToString".to_string(),
        };
        assert_eq!(t.qualified(Some("main")).module(), Some("main"));

        let explicit = TransformRef::Function {
            module: Some("strconv".to_string()),
            name: "Itoa".to_string(),
        };
        assert_eq!(explicit.qualified(Some("main")).module(), Some("strconv"));
    }
}

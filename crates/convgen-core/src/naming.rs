//! Naming helpers for generated units
//!
//! Names follow the conventions of the target language: exported
//! identifiers are upper-camel, common initialisms are kept upper-case, and
//! output files are snake-case.

use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};

use crate::types::TypeIdentity;

/// Initialisms that stay fully upper-case when they start a name segment
const COMMON_INITIALISMS: &[&str] = &[
    "ACL", "API", "ASCII", "CPU", "CSS", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID",
    "IP", "JSON", "LHS", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SQL", "SSH", "TCP", "TLS",
    "TTL", "UDP", "UI", "UID", "UUID", "URI", "URL", "UTF8", "VM", "XML", "XMPP", "XSRF", "XSS",
];

/// Upper-case the first letter of a declared type name.
///
/// The rest is kept as written: `UserDTO` must not become `UserDto`.
fn exported(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Single lower-case letter used for receivers, e.g. `m` for `Mapper`
pub fn short_name(s: &str) -> String {
    s.chars()
        .next()
        .map(|c| c.to_lowercase().collect())
        .unwrap_or_default()
}

/// Module base in a unit name: `sql` becomes `SQL`, `my_pkg` becomes `MyPkg`
pub fn upper_common_initialism(s: &str) -> String {
    let upper = s.to_uppercase();
    if COMMON_INITIALISMS.contains(&upper.as_str()) {
        upper
    } else {
        s.to_upper_camel_case()
    }
}

/// Name segment of a type inside a unit name: module base plus type name
pub fn type_segment(identity: &TypeIdentity) -> String {
    match identity.module_base() {
        Some(base) => format!("{}{}", upper_common_initialism(base), exported(&identity.name)),
        None => exported(&identity.name),
    }
}

/// Private shared unit name, e.g. `mapMainAToMainB`
pub fn unit_name(source: &TypeIdentity, destination: &TypeIdentity) -> String {
    format!("map{}To{}", type_segment(source), type_segment(destination))
}

/// Binding name of an injected receiver, e.g. `appURLBuilder`
pub fn dependency_name(identity: &TypeIdentity) -> String {
    match identity.module_base() {
        Some(base) => format!("{}{}", base.to_lower_camel_case(), exported(&identity.name)),
        None => identity.name.to_lower_camel_case(),
    }
}

/// Output file stem for an interface, e.g. `foo_bar_gen`
pub fn output_stem(interface: &str, suffix: &str) -> String {
    format!("{}{}", interface.to_snake_case(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_helpers() {
        assert_eq!(exported("userDTO"), "UserDTO");
        assert_eq!(short_name("Mapper"), "m");
        assert_eq!(short_name(""), "");
        assert_eq!(upper_common_initialism("sql"), "SQL");
        assert_eq!(upper_common_initialism("examples"), "Examples");
        assert_eq!(upper_common_initialism("my_pkg"), "MyPkg");
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem("FooBar", "_gen"), "foo_bar_gen");
        assert_eq!(output_stem("Mapper", ""), "mapper");
        assert_eq!(output_stem("HTTPServer", "_gen"), "http_server_gen");
        assert_eq!(output_stem("UserV2Mapper", "_mapping"), "user_v2_mapper_mapping");
    }

    #[test]
    fn test_unit_name() {
        let a = TypeIdentity::new("main", "A");
        let b = TypeIdentity::new("main", "B");
        assert_eq!(unit_name(&a, &b), "mapMainAToMainB");

        let user = TypeIdentity::new("github.com/acme/examples", "User");
        let dto = TypeIdentity::new("main", "UserDTO");
        assert_eq!(unit_name(&user, &dto), "mapExamplesUserToMainUserDTO");

        let null = TypeIdentity::new("database/sql", "NullString");
        assert_eq!(unit_name(&null, &b), "mapSQLNullStringToMainB");
    }

    #[test]
    fn test_dependency_and_output_names() {
        let builder = TypeIdentity::new("github.com/acme/app", "URLBuilder");
        assert_eq!(dependency_name(&builder), "appURLBuilder");

        let formatter = TypeIdentity::new("github.com/acme/text_utils", "Formatter");
        assert_eq!(dependency_name(&formatter), "textUtilsFormatter");
    }
}

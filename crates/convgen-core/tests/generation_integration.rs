//! End-to-end tests from declaration documents to generated mappers


use convgen_core::generation::steps::step_names;
use convgen_core::{generate, Declaration, ErrorKind, MapperAssembly, TypeIdentity};
use serde_json::json;
use test_support::*;

fn field_steps(
    mapper: &convgen_core::GeneratedMapper,
    unit: &str,
    field: &str,
) -> Vec<&'static str> {
    let plan = mapper
        .unit(unit)
        .and_then(|u| u.field(field))
        .unwrap_or_else(|| panic!("missing {}.{}", unit, field));
    step_names(&plan.steps)
}

#[test]
fn test_field_sources_end_to_end() {
    let catalog = catalog(field_sources_declaration());
    let mapper = generate(&catalog, "Converter").expect("generation should succeed");

    assert_eq!(mapper.implementation, "ConverterImpl");
    assert_eq!(mapper.constructor, "NewConverterImpl");
    assert_eq!(mapper.receiver, "c");
    assert_eq!(mapper.units.len(), 1);

    let unit = "mapMainAToMainB";
    assert_eq!(field_steps(&mapper, unit, "ID"), vec!["Assign"]);
    assert_eq!(field_steps(&mapper, unit, "Title"), vec!["Assign"]);
    assert_eq!(field_steps(&mapper, unit, "Age"), vec!["GuardedAssign", "Assign"]);
    assert_eq!(field_steps(&mapper, unit, "TotalCount"), vec!["Assign"]);
    assert_eq!(field_steps(&mapper, unit, "Tags"), vec!["CollectLoop", "Assign"]);
    assert_eq!(
        field_steps(&mapper, unit, "Remarks"),
        vec!["GuardedAssign", "CheckedAssign"]
    );
    assert_eq!(field_steps(&mapper, unit, "Status"), vec!["Assign"]);
    assert_eq!(field_steps(&mapper, unit, "URL"), vec!["Assign"]);

    let shared = mapper.unit(unit).unwrap();
    assert!(shared.fallible);
    assert_eq!(shared.skipped, vec!["Internal".to_string()]);
    assert_eq!(shared.references, 2);

    assert_eq!(
        mapper.dependencies.get("mainURLBuilder"),
        Some(&TypeIdentity::new("main", "URLBuilder"))
    );

    assert_eq!(
        step_names(&mapper.entry_point("AtoPtrB").unwrap().steps),
        vec!["CheckedAssign", "AddressOf"]
    );
}

#[test]
fn test_library_units_and_entry_points() {
    let catalog = catalog(library_declaration(true));
    let mapper = generate(&catalog, "Mapper").unwrap();

    let mut names: Vec<&str> = mapper.units.iter().map(|u| u.name.as_str()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "mapExamplesBookToMainBook",
            "mapExamplesPriceToMainPrice",
            "mapExamplesUserToMainUser",
        ]
    );
    assert_eq!(mapper.metadata.unit_count, 3);
    assert_eq!(mapper.metadata.entry_point_count, 2);
    assert_eq!(mapper.metadata.transform_count, 1);

    let user = mapper.unit("mapExamplesUserToMainUser").unwrap();
    assert_eq!(user.references, 2);
    assert_eq!(
        step_names(&mapper.entry_point("ConvertUsers").unwrap().steps),
        vec!["CollectLoop", "CheckedAssign"]
    );
}

#[test]
fn test_library_without_error_signature_names_the_culprit() {
    let catalog = catalog(library_declaration(false));
    let err = generate(&catalog, "Mapper").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FallibleWithoutErrorSignature);
    assert_eq!(err.method(), Some("ConvertUser"));
    assert_eq!(err.field(), Some("Books.Price.Amount"));
    assert!(err.to_string().contains("ConvertUser"));
}

#[test]
fn test_package_override_renames_units() {
    let catalog = declaration(field_sources_declaration())
        .into_catalog(Some("github.com/acme/app"))
        .unwrap();
    let mapper = generate(&catalog, "Converter").unwrap();

    assert_eq!(mapper.units[0].name, "mapAppAToAppB");
    assert_eq!(mapper.interface, TypeIdentity::new("github.com/acme/app", "Converter"));
    assert!(mapper.dependencies.contains_key("appURLBuilder"));
}

#[test]
fn test_report_json_shape() {
    let catalog = catalog(field_sources_declaration());
    let mapper = generate(&catalog, "Converter").unwrap();
    let value = serde_json::to_value(&mapper).unwrap();

    assert!(value["units"].is_array());
    assert!(value["entry_points"].is_array());
    assert!(value["signatures"].is_array());
    assert!(value.get("generated_at").is_none());

    let fields = value["units"][0]["fields"].as_array().unwrap();
    let age = fields
        .iter()
        .find(|f| f["destination"]["name"] == "Age")
        .unwrap();
    assert_eq!(age["steps"][0]["step"], "guarded_assign");
    assert_eq!(age["steps"][0]["subject"], json!({"kind": "field", "name": "Age"}));

    let back: convgen_core::GeneratedMapper = serde_json::from_value(value).unwrap();
    assert_eq!(back, mapper);
}

#[test]
fn test_fixpoint_holds_for_declarations() {
    let catalog = catalog(library_declaration(true));
    let assembly = MapperAssembly::new(&catalog, "Mapper").unwrap();

    let mapper = assembly.run().unwrap();
    assert_eq!(assembly.pass_two(&mapper.snapshot()).unwrap(), mapper);
}

#[test]
fn test_undeclared_type_in_declaration() {
    let doc = json!({
        "package": "main",
        "types": [{"name": "A", "fields": [{"name": "B", "type": "Missing"}]}]
    });
    let err = declaration(doc).into_catalog(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
}

#[test]
fn test_malformed_declaration_json() {
    let err = Declaration::from_json_str("{\"package\": ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Json);
}

#[test]
fn test_invalid_tag_in_declaration() {
    let doc = json!({
        "package": "main",
        "types": [{"name": "A", "fields": [
            {"name": "ID", "type": "int", "tag": "map:\"ID,a.b.c\""}
        ]}]
    });
    let err = declaration(doc).into_catalog(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDirective);
    assert!(err.to_string().contains("A.ID"));
}

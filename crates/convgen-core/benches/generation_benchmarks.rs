//! Benchmarks for directive parsing and mapper generation
//!
//! Generation runs both passes over the whole interface, so these track
//! how the engine scales with field count and nesting depth.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use convgen_core::catalog::{InMemoryCatalog, InterfaceDecl, InterfaceMethod, TypeDecl};
use convgen_core::directive::{parse_tag, Directive, TransformRef};
use convgen_core::types::{FieldDescriptor, MethodSignature, TypeIdentity, TypeShape};
use convgen_core::generate;
use convgen_core::generation::{Axes, ErrorSurface, Synthesizer};

fn int_to_string() -> TransformRef {
    TransformRef::Function {
        module: None,
        name: "IntToString".to_string(),
    }
}

/// `A -> B` with `width` fields, alternating plain copies, guarded
/// transforms and element-wise transforms
fn wide_catalog(width: usize) -> InMemoryCatalog {
    let a = TypeIdentity::new("bench", "A");
    let b = TypeIdentity::new("bench", "B");
    let mut source = TypeDecl::structure(a.clone());
    let mut target = TypeDecl::structure(b.clone());
    for i in 0..width {
        let name = format!("Field{}", i);
        let (from, to, directive) = match i % 3 {
            0 => (TypeShape::primitive("string"), TypeShape::primitive("string"), None),
            1 => (
                TypeShape::primitive("int").optional(),
                TypeShape::primitive("string"),
                Some(Directive::transform(int_to_string())),
            ),
            _ => (
                TypeShape::primitive("int").collection(),
                TypeShape::primitive("string").collection(),
                Some(Directive::transform(int_to_string())),
            ),
        };
        source = source.with_field(FieldDescriptor::new(&name, from));
        target = target.with_field(FieldDescriptor::new(&name, to).with_directive(directive));
    }
    InMemoryCatalog::new()
        .with_type(source)
        .with_type(target)
        .with_function(MethodSignature::function(
            Some("bench".to_string()),
            "IntToString",
            TypeShape::primitive("int"),
            TypeShape::primitive("string"),
        ))
        .with_interface(InterfaceDecl::new(TypeIdentity::new("bench", "Mapper")).with_method(
            InterfaceMethod::new("AtoB", TypeShape::structure(a), TypeShape::structure(b)),
        ))
}

/// A chain of `depth` nested structs, `L0 -> L0DTO` through `Ln -> LnDTO`
fn deep_catalog(depth: usize) -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    for level in 0..depth {
        let source = TypeIdentity::new("bench", format!("L{}", level));
        let target = TypeIdentity::new("bench", format!("L{}DTO", level));
        let mut s = TypeDecl::structure(source)
            .with_field(FieldDescriptor::new("Value", TypeShape::primitive("int")));
        let mut t = TypeDecl::structure(target)
            .with_field(FieldDescriptor::new("Value", TypeShape::primitive("int")));
        if level + 1 < depth {
            s = s.with_field(FieldDescriptor::new(
                "Child",
                TypeShape::structure(TypeIdentity::new("bench", format!("L{}", level + 1)))
                    .collection(),
            ));
            t = t.with_field(FieldDescriptor::new(
                "Child",
                TypeShape::structure(TypeIdentity::new("bench", format!("L{}DTO", level + 1)))
                    .collection(),
            ));
        }
        catalog.add_type(s).add_type(t);
    }
    catalog.with_interface(InterfaceDecl::new(TypeIdentity::new("bench", "Mapper")).with_method(
        InterfaceMethod::new(
            "Convert",
            TypeShape::structure(TypeIdentity::new("bench", "L0")),
            TypeShape::structure(TypeIdentity::new("bench", "L0DTO")),
        ),
    ))
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    let tags = [
        "-",
        ",IntToString",
        "CustomStatus()",
        r#"json:"url" map:"URL,github.com/acme/app/URLBuilder.Build""#,
    ];
    for tag in tags.iter() {
        group.bench_with_input(BenchmarkId::new("parse_tag", tag), tag, |b, tag| {
            b.iter(|| parse_tag(black_box(tag)))
        });
    }

    group.finish();
}

fn bench_decision_table(c: &mut Criterion) {
    c.bench_function("decision_table/all_axes", |b| {
        b.iter(|| {
            for axes in Axes::all() {
                for accepts_optional in [false, true] {
                    let mut synth = Synthesizer::new(ErrorSurface::Speculative);
                    black_box(synth.synthesize_axes(black_box(axes), accepts_optional)).ok();
                }
            }
        })
    });
}

fn bench_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_struct");

    for width in [10usize, 100, 500] {
        let catalog = wide_catalog(width);
        group.bench_with_input(BenchmarkId::new("generate", width), &catalog, |b, catalog| {
            b.iter(|| generate(black_box(catalog), "Mapper"))
        });
    }

    group.finish();
}

fn bench_deep(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_structs");

    for depth in [2usize, 8, 32] {
        let catalog = deep_catalog(depth);
        group.bench_with_input(BenchmarkId::new("generate", depth), &catalog, |b, catalog| {
            b.iter(|| generate(black_box(catalog), "Mapper"))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parsing,
    bench_decision_table,
    bench_wide,
    bench_deep
);
criterion_main!(benches);

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use pagepack::{ClassId, ClassRegistry, Pagepack, PagepackObject, Value};
use std::hint::black_box;
use std::sync::Arc;

#[derive(Default, PagepackObject)]
struct BenchComponent {
    id: i64,
    markup_id: String,
    visible: bool,
    children: Value,
}

#[derive(Default, PagepackObject)]
struct BenchPage {
    page_id: i64,
    title: String,
    components: Value,
    render_times: Value,
}

/// Builds a page graph with `count` components, a shared tooltip string and
/// a primitive timing array (~the shape of a real component tree snapshot).
fn generate_page(count: usize) -> Value {
    let shared_tooltip = Value::string("shared tooltip text reused across components");
    let components: Vec<Value> = (0..count)
        .map(|i| {
            Value::object(BenchComponent {
                id: i as i64,
                markup_id: format!("component-{i}"),
                visible: i % 7 != 0,
                children: Value::array(
                    ClassId::OBJECT,
                    vec![shared_tooltip.clone(), Value::Null],
                ),
            })
        })
        .collect();

    Value::object(BenchPage {
        page_id: 1,
        title: "benchmark page".to_string(),
        components: Value::array(ClassId::OBJECT, components),
        render_times: Value::from((0..count as i64).collect::<Vec<i64>>()),
    })
}

fn bench_registry() -> Arc<ClassRegistry> {
    let registry = ClassRegistry::new();
    registry
        .register::<BenchComponent>("BenchComponent")
        .expect("register");
    registry.register::<BenchPage>("BenchPage").expect("register");
    registry
}

// --- BENCHMARKS ---

fn bench_encode(c: &mut Criterion) {
    let component_count = 10_000;
    let registry = bench_registry();
    let page = generate_page(component_count);
    let encoded_len = Pagepack::to_bytes(&registry, &page).expect("encode").len();

    println!("Encode component count: {component_count} ({encoded_len} bytes)");

    let mut group = c.benchmark_group("Graph Encode");
    group.throughput(Throughput::Bytes(encoded_len as u64));

    group.bench_function("pagepack_to_bytes", |b| {
        b.iter(|| {
            let bytes =
                Pagepack::to_bytes(&registry, black_box(&page)).expect("Failed to encode graph");
            black_box(bytes);
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let component_count = 10_000;
    let registry = bench_registry();
    let page = generate_page(component_count);
    let bytes = Pagepack::to_bytes(&registry, &page).expect("encode");

    println!("Decode component count: {component_count} ({} bytes)", bytes.len());

    let mut group = c.benchmark_group("Graph Decode");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("pagepack_from_bytes", |b| {
        b.iter(|| {
            let value = Pagepack::from_bytes(&registry, black_box(&bytes))
                .expect("Failed to decode graph");
            black_box(value);
        });
    });

    group.finish();
}

fn bench_primitive_arrays(c: &mut Criterion) {
    let registry = ClassRegistry::new();
    let data = Value::from((0..1_000_000i64).collect::<Vec<i64>>());
    let bytes = Pagepack::to_bytes(&registry, &data).expect("encode");

    let mut group = c.benchmark_group("Primitive Array");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("encode_1m_longs", |b| {
        b.iter(|| {
            let bytes =
                Pagepack::to_bytes(&registry, black_box(&data)).expect("Failed to encode array");
            black_box(bytes);
        });
    });

    group.bench_function("decode_1m_longs", |b| {
        b.iter(|| {
            let value = Pagepack::from_bytes(&registry, black_box(&bytes))
                .expect("Failed to decode array");
            black_box(value);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_primitive_arrays);
criterion_main!(benches);

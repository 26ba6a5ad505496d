//! Benchmarks for hash table lookups and template compilation

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use equipment_model::core::types::TemplateHandle;
use equipment_model::core::ModelConfig;
use equipment_model::hashtbl::{HashTable, KeyKind};
use equipment_model::template::compile_template;
use serde_json::{json, Value};

/// Lookup cost as chains grow, for integer and string keys
fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for &buckets in &[1usize, 8, 64] {
        let mut ints = HashTable::create(buckets, KeyKind::Integer).unwrap();
        let mut names = HashTable::create(buckets, KeyKind::ByteString).unwrap();
        for i in 0..256u16 {
            ints.insert(&i, i).unwrap();
            names.insert(format!("Site:AHU{}.SA-T", i).as_str(), i).unwrap();
        }
        group.throughput(Throughput::Elements(256));

        group.bench_function(format!("integer_{}_buckets", buckets), |b| {
            b.iter(|| {
                for i in 0..256u16 {
                    black_box(ints.get(&i));
                }
            })
        });

        let keys: Vec<String> = (0..256).map(|i| format!("Site:AHU{}.SA-T", i)).collect();
        group.bench_function(format!("string_{}_buckets", buckets), |b| {
            b.iter(|| {
                for key in &keys {
                    black_box(names.get(key.as_str()));
                }
            })
        });
    }

    group.finish();
}

fn large_template(attributes: u16) -> Value {
    let properties: Vec<Value> = (0..attributes)
        .map(|id| {
            json!({
                "-ID": id,
                "-DataType": 4,
                "-Name": { "-setId": 509, "-value": id },
                "-IPUnits": { "-setId": 507, "-value": 64 },
                "-IPRange": { "-minvalue": 0.0, "-maxvalue": 100.0 }
            })
        })
        .collect();
    json!({ "-ID": "Bench", "-PropertyList": { "-Property": properties } })
}

fn bench_compile_template(c: &mut Criterion) {
    let config = ModelConfig::default();
    let template = large_template(400);

    c.bench_function("compile_400_attributes", |b| {
        b.iter(|| black_box(compile_template("Bench", TemplateHandle(1), &template, &config)))
    });
}

criterion_group!(benches, bench_lookup, bench_compile_template);
criterion_main!(benches);

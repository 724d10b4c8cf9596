//! Filter parsing and batched join benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use navgraph_core::lang::{parse_filter, tokenize};
use navgraph_core::storage::{MemoryDriver, StorageManager};
use navgraph_core::{CombineMode, EngineConfig, QueryEngine, QuerySpec};
use serde_json::{json, Value};

const FILTER: &str =
    "(LocationID gt 100) and (LookupCountys%2FLookupNations%2FNation eq 'Wales') and (substringof('a',Contacts/Name) eq true)";

fn metadata() -> Value {
    json!({"Entities": [
        {"description": {
            "shortName": "Location", "defaultResourceName": "Locations",
            "key": {"propertyRef": {"name": "LocationID"}},
            "dataProperties": [
                {"name": "LocationID", "dataType": "Int32"},
                {"name": "Town", "dataType": "String"},
                {"name": "LookupCountyID", "dataType": "Int32"}
            ],
            "navigationProperties": [
                {"name": "LookupCountys", "entityTypeName": "LookupCounty:#Crm.Model",
                 "isScalar": true, "foreignKeyNames": ["LookupCountyID"]},
                {"name": "Contacts", "entityTypeName": "Contact:#Crm.Model",
                 "isScalar": false, "invForeignKeyNames": ["LocationID"]}
            ]
        }},
        {"description": {
            "shortName": "LookupCounty", "defaultResourceName": "LookupCountys",
            "key": {"propertyRef": {"name": "LookupCountyID"}},
            "dataProperties": [
                {"name": "LookupCountyID", "dataType": "Int32"},
                {"name": "LookupNationID", "dataType": "Int32"}
            ],
            "navigationProperties": [
                {"name": "LookupNations", "entityTypeName": "LookupNation:#Crm.Model",
                 "isScalar": true, "foreignKeyNames": ["LookupNationID"]}
            ]
        }},
        {"description": {
            "shortName": "LookupNation", "defaultResourceName": "LookupNations",
            "key": {"propertyRef": {"name": "LookupNationID"}},
            "dataProperties": [
                {"name": "LookupNationID", "dataType": "Int32"},
                {"name": "Nation", "dataType": "String"}
            ]
        }},
        {"description": {
            "shortName": "Contact", "defaultResourceName": "Contacts",
            "key": {"propertyRef": {"name": "ContactID"}},
            "dataProperties": [
                {"name": "ContactID", "dataType": "Int32"},
                {"name": "LocationID", "dataType": "Int32"},
                {"name": "Name", "dataType": "String"}
            ]
        }}
    ]})
}

fn data(locations: i64) -> Value {
    let names = ["Alys", "Bryn", "Catrin", "Dewi", "Eleri"];
    let nations: Vec<Value> = ["England", "Wales", "Scotland"]
        .iter()
        .enumerate()
        .map(|(i, n)| json!({"LookupNationID": i, "Nation": n}))
        .collect();
    let counties: Vec<Value> = (0..30)
        .map(|i| json!({"LookupCountyID": i, "LookupNationID": i % 3}))
        .collect();
    let towns: Vec<Value> = (0..locations)
        .map(|i| json!({"LocationID": i, "Town": format!("Town {i}"), "LookupCountyID": i % 30}))
        .collect();
    let contacts: Vec<Value> = (0..locations * 2)
        .map(|i| json!({"ContactID": i, "LocationID": i / 2, "Name": names[(i % 5) as usize]}))
        .collect();
    json!({
        "LookupNations": nations,
        "LookupCountys": counties,
        "Locations": towns,
        "Contacts": contacts
    })
}

fn engine(locations: i64) -> QueryEngine {
    let config = EngineConfig::default().with_default_container("memory.crm");
    let storage = Arc::new(StorageManager::new(&config));
    storage.register(
        "memory.metadata",
        Arc::new(MemoryDriver::from_json(metadata()).unwrap()),
    );
    storage.register(
        "memory.crm",
        Arc::new(MemoryDriver::from_json(data(locations)).unwrap()),
    );
    QueryEngine::new(&config, storage)
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("lang");

    group.bench_function("tokenize", |b| {
        b.iter(|| black_box(tokenize(black_box(FILTER)).unwrap()));
    });
    group.bench_function("parse_filter", |b| {
        b.iter(|| black_box(parse_filter(black_box(FILTER)).unwrap()));
    });

    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/join");
    let engine = engine(1_000);

    for batch_size in [10, 100, 1_000] {
        for mode in [CombineMode::Expand, CombineMode::Projection] {
            let spec = QuerySpec::new("Locations")
                .with_filter(FILTER)
                .with_select("Town,Contacts/Name")
                .with_mode(mode)
                .with_batch_size(batch_size);
            group.bench_with_input(
                BenchmarkId::new(mode.as_str(), batch_size),
                &spec,
                |b, spec| {
                    b.iter(|| black_box(engine.collect(spec).unwrap()));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_join);
criterion_main!(benches);

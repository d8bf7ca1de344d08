//! Benchmarks for stage store transitions.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use studioflow::prelude::*;
use studioflow::testing::{approve_through, sample_artifact};
use studioflow::utils::generate_uuid_v7;

fn store_benchmark(c: &mut Criterion) {
    c.bench_function("generate_approve_reject_images", |b| {
        let store = Arc::new(PipelineStore::new("bench"));
        approve_through(&store, StageId::ImagePrompts).unwrap();
        let gate = ApprovalGate::new(store.clone());
        let artifact = sample_artifact(StageId::Images);

        b.iter(|| {
            let run = generate_uuid_v7();
            store.begin_generation(StageId::Images, run).unwrap();
            store.complete(StageId::Images, run, artifact.clone()).unwrap();
            gate.approve(StageId::Images).unwrap();
            gate.reject(black_box(StageId::Images)).unwrap();
        });
    });

    c.bench_function("snapshot_full_project", |b| {
        let store = Arc::new(PipelineStore::new("bench"));
        approve_through(&store, StageId::Export).unwrap();

        b.iter(|| black_box(serde_json::to_vec(&store.snapshot()).unwrap()));
    });
}

criterion_group!(benches, store_benchmark);
criterion_main!(benches);

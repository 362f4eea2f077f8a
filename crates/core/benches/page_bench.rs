#[path = "common/mod.rs"]
mod common;

use std::hint::black_box;

use anonread_core::api::{Reader, find_anonymized_boxes};
use anonread_core::blobs::{binarize, find_blobs};
use anonread_core::params::ReaderParams;
use anonread_core::{AnonymizationMethod, OcrEngine, Result};
use criterion::{criterion_group, criterion_main};
use image::GrayImage;

use common::{
    GroupWeight, XorShift64, bench_config, bench_criterion, configure_group, pages_throughput,
    synthetic_page,
};

struct Constant;

impl OcrEngine for Constant {
    fn recognize(&self, _crop: &GrayImage) -> Result<String> {
        Ok("ord".to_string())
    }
}

fn bench_detection(c: &mut criterion::Criterion) {
    let cfg = bench_config();
    let mut rng = XorShift64::new(cfg.seed);
    let page = synthetic_page(0, &mut rng);
    let params = ReaderParams::default();
    let reader = Reader::new(Constant, params.clone()).expect("reader");
    let ink = reader.ink_image(&page);

    let mut group = c.benchmark_group("detection");
    configure_group(&mut group, &cfg, GroupWeight::Light);
    group.bench_function("find_blobs", |b| {
        b.iter(|| {
            let binary = binarize(black_box(&ink), params.preprocess.binary_threshold);
            black_box(find_blobs(&binary, &params.blobs))
        })
    });
    for method in [AnonymizationMethod::Underline, AnonymizationMethod::Box] {
        group.bench_function(format!("find_anonymized_boxes/{method}"), |b| {
            b.iter(|| black_box(find_anonymized_boxes(black_box(&ink), method, &params)))
        });
    }
    group.finish();
}

fn bench_document(c: &mut criterion::Criterion) {
    let cfg = bench_config();
    let mut rng = XorShift64::new(cfg.seed);
    let pages: Vec<_> = (0..cfg.pages).map(|i| synthetic_page(i, &mut rng)).collect();
    let reader = Reader::new(Constant, ReaderParams::default()).expect("reader");

    let mut group = c.benchmark_group("document");
    configure_group(&mut group, &cfg, GroupWeight::Heavy);
    group.throughput(pages_throughput(pages.len()));
    group.bench_function("read_document", |b| {
        b.iter(|| {
            black_box(
                reader
                    .read_document(black_box(&pages), AnonymizationMethod::Underline)
                    .expect("read"),
            )
        })
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = bench_criterion();
    targets = bench_detection, bench_document
}
criterion_main!(benches);

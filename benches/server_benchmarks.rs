use criterion::{black_box, criterion_group, criterion_main, Criterion};
use omniserve::cache::LookupCache;
use omniserve::config::Config;
use omniserve::server::static_files::{resolve_mime, StaticFileHandler};
use std::path::Path;
use std::sync::Arc;

fn bench_config_creation(c: &mut Criterion) {
    c.bench_function("config_creation", |b| {
        b.iter(|| {
            let config = Config::default();
            black_box(config);
        })
    });
}

fn bench_config_validation(c: &mut Criterion) {
    let config = Config::default();

    c.bench_function("config_validation", |b| {
        b.iter(|| {
            let result = config.validate();
            black_box(result);
        })
    });
}

fn bench_path_resolution(c: &mut Criterion) {
    let handler = StaticFileHandler::new(
        Arc::new(Config::default()),
        Arc::new(LookupCache::new()),
    );

    c.bench_function("path_resolution", |b| {
        b.iter(|| {
            let resolved = handler.resolve(black_box("/assets/css/style.css"));
            black_box(resolved);
        })
    });
}

fn bench_mime_resolution(c: &mut Criterion) {
    let paths = [
        Path::new("index.html"),
        Path::new("style.css"),
        Path::new("app.js"),
        Path::new("photo.jpeg"),
        Path::new("archive.unknown"),
    ];

    c.bench_function("mime_resolution", |b| {
        b.iter(|| {
            for path in &paths {
                black_box(resolve_mime(path));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_config_creation,
    bench_config_validation,
    bench_path_resolution,
    bench_mime_resolution
);
criterion_main!(benches);

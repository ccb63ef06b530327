use std::{hint::black_box, time::Duration};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kodo::Signer as _;

fn credentials() -> kodo::Credentials {
    kodo::Credentials::new("AKIDEXAMPLE", "SECRETKEYEXAMPLE")
        .expect("static credentials must be valid")
}

fn bench_batch_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_encoding");
    group.measurement_time(Duration::from_secs(3));

    for n in [1usize, 100, 1000] {
        let keys: Vec<String> = (0..n).map(|i| format!("photos/2024/{i:05}.jpg")).collect();
        let pairs: Vec<(String, String)> = keys
            .iter()
            .map(|k| (k.clone(), format!("{k}.bak")))
            .collect();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(BenchmarkId::new("delete", n), |b| {
            b.iter(|| {
                let ops = kodo::batch::build_batch_delete(black_box("bucket"), keys.iter());
                black_box(kodo::batch::batch_body(&ops));
            });
        });
        group.bench_function(BenchmarkId::new("copy", n), |b| {
            b.iter(|| {
                let ops = kodo::batch::build_batch_copy(
                    black_box("bucket"),
                    pairs.iter().map(|(a, b)| (a.as_str(), b.as_str())),
                    Some("backup"),
                );
                black_box(kodo::batch::batch_body(&ops));
            });
        });
    }

    group.finish();
}

fn bench_signing(c: &mut Criterion) {
    let creds = credentials();
    let url = url::Url::parse("https://rs.qbox.me/batch").expect("url must parse");

    let mut group = c.benchmark_group("signing");
    group.measurement_time(Duration::from_secs(3));

    for size in [0usize, 1024, 64 * 1024] {
        let body = "op=delete/YTpi&".repeat(size / 15 + 1);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_function(BenchmarkId::new("form_request", size), |b| {
            b.iter(|| {
                let headers = creds
                    .sign(
                        black_box(&url),
                        black_box(body.as_bytes()),
                        Some("application/x-www-form-urlencoded"),
                    )
                    .expect("signing must succeed");
                black_box(headers);
            });
        });
    }

    group.bench_function("private_download_url", |b| {
        b.iter(|| {
            let url = creds
                .private_download_url(
                    black_box("http://cdn.example.com/a.jpg?imageInfo"),
                    Duration::from_secs(3600),
                )
                .expect("signing must succeed");
            black_box(url);
        });
    });

    group.bench_function("upload_token", |b| {
        let policy =
            kodo::types::UploadPolicy::with_deadline("photos", Some("a.jpg"), 4_102_444_800)
                .persistent_ops(["avthumb/mp4"]);
        b.iter(|| {
            let token = creds
                .upload_token(black_box(&policy))
                .expect("token must build");
            black_box(token);
        });
    });

    group.finish();
}

fn bench_response_json(c: &mut Criterion) {
    let body: String = {
        let items: Vec<String> = (0..1000)
            .map(|i| format!(r#"{{"code":200,"data":{{"hash":"Fh{i}","fsize":{i}}}}}"#))
            .collect();
        format!("[{}]", items.join(","))
    };
    let body = bytes::Bytes::from(body);

    c.bench_function("response_json_batch_1000", |b| {
        b.iter(|| {
            let resp =
                kodo::types::Response::new(200, 0.01, http::HeaderMap::new(), Some(body.clone()));
            let items: Option<Vec<kodo::types::BatchItem>> = resp.json_as();
            black_box(items);
        });
    });
}

criterion_group!(benches, bench_batch_encoding, bench_signing, bench_response_json);
criterion_main!(benches);

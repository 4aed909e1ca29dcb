//! Name normalization and clustering benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use almanac::cluster::Clusterer;
use almanac::mention::RawMention;
use almanac::{EntityKind, normalize};

const FIRST: [&str; 8] = ["Alice", "María-José", "Bob", "Robert", "Zoë", "Jean-Luc", "Aliza", "Sam"];
const LAST: [&str; 6] = ["Smith", "Castro", "O'Brien", "Lévesque", "Nguyen", "Da Silva"];

/// Generate realistic raw names with variants and typos.
fn generate_names(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let first = FIRST[i % FIRST.len()];
            let last = LAST[(i / FIRST.len()) % LAST.len()];
            match i % 4 {
                0 => format!("{} {}", first, last),
                1 => {
                    let alias: String = first.chars().take(3).collect();
                    format!("@{} ({} {})", alias, first, last)
                }
                2 => format!("{} ({}{})", first, last, i),
                _ => format!("{}{} {}", first, i, last),
            }
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let names = generate_names(1_000);
    let bytes: usize = names.iter().map(String::len).sum();

    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Bytes(bytes as u64));
    group.bench_function("1000_names", |b| {
        b.iter(|| {
            for name in &names {
                black_box(normalize(black_box(name)));
            }
        })
    });
    group.finish();
}

fn bench_cluster(c: &mut Criterion) {
    let clusterer = Clusterer::new();
    let mut group = c.benchmark_group("cluster");

    for count in [100, 500, 1_000] {
        let mentions: Vec<RawMention> = generate_names(count)
            .into_iter()
            .map(|name| RawMention::new(name, 2024))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("people", count), &mentions, |b, mentions| {
            b.iter(|| clusterer.cluster(EntityKind::People, black_box(mentions)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_cluster);
criterion_main!(benches);

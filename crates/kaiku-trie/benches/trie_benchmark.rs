//! Benchmarks comparing the pattern trie against a naive linear scan.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kaiku_trie::PatternTrie;

/// Naive registry: every emit checks every pattern.
struct NaiveIndex {
    patterns: Vec<(String, usize)>,
}

impl NaiveIndex {
    fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    fn insert(&mut self, pattern: &str, id: usize) {
        self.patterns.push((pattern.to_string(), id));
    }

    fn dispatch(&self, name: &str, mut sink: impl FnMut(usize)) {
        for (pattern, id) in &self.patterns {
            if naive_match(pattern, name) {
                sink(*id);
            }
        }
    }
}

fn naive_match(pattern: &str, name: &str) -> bool {
    let segments: Vec<&[u8]> = pattern.as_bytes().split(|b| *b == b'*').collect();
    let name = name.as_bytes();
    if segments.len() == 1 {
        return segments[0] == name;
    }
    let first = segments[0];
    let last = segments[segments.len() - 1];
    if name.len() < first.len() + last.len() {
        return false;
    }
    if !name.starts_with(first) || !name.ends_with(last) {
        return false;
    }
    let mut position = first.len();
    let end = name.len() - last.len();
    for segment in &segments[1..segments.len() - 1] {
        if segment.is_empty() {
            continue;
        }
        match name[position..end]
            .windows(segment.len())
            .position(|candidate| candidate == *segment)
        {
            Some(at) => position += at + segment.len(),
            None => return false,
        }
    }
    true
}

/// Subscription mix: mostly literal topics, some wildcard families.
fn patterns(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| match i % 4 {
            0 => format!("service{}.queue{}.depth", i % 37, i % 11),
            1 => format!("service{}.*.latency", i % 37),
            2 => format!("*.host{}.cpu", i % 23),
            _ => format!("service{}.host{}.*", i % 37, i % 23),
        })
        .collect()
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let name = "service3.host7.cpu";

    for n in [10, 100, 1000] {
        let subscription_set = patterns(n);

        let mut naive = NaiveIndex::new();
        for (id, pattern) in subscription_set.iter().enumerate() {
            naive.insert(pattern, id);
        }
        group.bench_with_input(BenchmarkId::new("naive", n), &naive, |b, naive| {
            b.iter(|| {
                let mut fired = 0usize;
                naive.dispatch(black_box(name), |_| fired += 1);
                black_box(fired)
            });
        });

        let mut trie = PatternTrie::new();
        for (id, pattern) in subscription_set.iter().enumerate() {
            trie.insert(pattern, id, false);
        }
        group.bench_with_input(BenchmarkId::new("trie", n), &n, |b, _| {
            b.iter(|| {
                let mut fired = 0usize;
                trie.dispatch(black_box(name), |_| fired += 1);
                black_box(fired)
            });
        });
    }

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for n in [100, 1000] {
        let subscription_set = patterns(n);
        group.bench_with_input(BenchmarkId::new("trie", n), &n, |b, _| {
            b.iter(|| {
                let mut trie = PatternTrie::new();
                for (id, pattern) in subscription_set.iter().enumerate() {
                    trie.insert(pattern, id, false);
                }
                black_box(trie.node_count())
            });
        });
    }

    group.finish();
}

fn bench_insert_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_remove");

    let subscription_set = patterns(500);
    group.bench_function("roundtrip_500", |b| {
        b.iter(|| {
            let mut trie = PatternTrie::new();
            for (id, pattern) in subscription_set.iter().enumerate() {
                trie.insert(pattern, id, false);
            }
            for (id, pattern) in subscription_set.iter().enumerate() {
                trie.remove(pattern, Some(&id));
            }
            black_box(trie.is_empty())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_insert, bench_insert_remove);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hash_stores::{LinearHashStore, LinearProbingStore, RobinHoodStore};
use std::time::Duration;

const N: usize = 50_000;
// Fixed-capacity stores run at 80% load.
const CAPACITY: usize = N * 5 / 4;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_put_fresh(c: &mut Criterion) {
    let keys: Vec<String> = lcg(1).take(N).map(key).collect();

    c.bench_function("linear_probing::put_fresh_50k", |b| {
        b.iter_batched(
            || LinearProbingStore::<String, u64>::with_capacity(CAPACITY).unwrap(),
            |mut s| {
                for (i, k) in keys.iter().enumerate() {
                    let _ = s.put(k.clone(), i as u64);
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("robin_hood::put_fresh_50k", |b| {
        b.iter_batched(
            || RobinHoodStore::<String, u64>::with_capacity(CAPACITY).unwrap(),
            |mut s| {
                for (i, k) in keys.iter().enumerate() {
                    let _ = s.put(k.clone(), i as u64);
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("linear_hash::put_fresh_50k", |b| {
        b.iter_batched(
            LinearHashStore::<String, u64>::new,
            |mut s| {
                for (i, k) in keys.iter().enumerate() {
                    s.put(k.clone(), i as u64);
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit_and_miss(c: &mut Criterion) {
    let keys: Vec<String> = lcg(7).take(N).map(key).collect();
    let misses: Vec<String> = lcg(0xdead_beef).take(10_000).map(key).collect();
    // Precompute 10k random query keys using LCG
    let mut s = 0x9e3779b97f4a7c15u64;
    let hits: Vec<String> = (0..10_000)
        .map(|_| {
            s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
            keys[(s as usize) % N].clone()
        })
        .collect();

    let mut lp = LinearProbingStore::with_capacity(CAPACITY).unwrap();
    let mut rh = RobinHoodStore::with_capacity(CAPACITY).unwrap();
    let mut lh = LinearHashStore::new();
    for (i, k) in keys.iter().enumerate() {
        let _ = lp.put(k.clone(), i as u64);
        let _ = rh.put(k.clone(), i as u64);
        lh.put(k.clone(), i as u64);
    }

    c.bench_function("linear_probing::get_hit_10k", |b| {
        b.iter(|| {
            for k in &hits { black_box(lp.get(k.as_str())); }
        })
    });
    c.bench_function("linear_probing::get_miss_10k", |b| {
        b.iter(|| {
            for k in &misses { black_box(lp.get(k.as_str())); }
        })
    });
    c.bench_function("robin_hood::get_hit_10k", |b| {
        b.iter(|| {
            for k in &hits { black_box(rh.get(k.as_str())); }
        })
    });
    c.bench_function("robin_hood::get_miss_10k", |b| {
        b.iter(|| {
            for k in &misses { black_box(rh.get(k.as_str())); }
        })
    });
    c.bench_function("linear_hash::get_hit_10k", |b| {
        b.iter(|| {
            for k in &hits { black_box(lh.get(k.as_str())); }
        })
    });
    c.bench_function("linear_hash::get_miss_10k", |b| {
        b.iter(|| {
            for k in &misses { black_box(lh.get(k.as_str())); }
        })
    });
}

// Remove then reinsert a sliding window of keys: tombstones pile up in the
// linear probing store, Robin Hood shifts back on every removal.
fn bench_churn(c: &mut Criterion) {
    let keys: Vec<String> = lcg(11).take(N).map(key).collect();
    let fresh: Vec<String> = lcg(13).take(10_000).map(key).collect();

    c.bench_function("linear_probing::churn_10k", |b| {
        b.iter_batched(
            || {
                let mut s = LinearProbingStore::with_capacity(CAPACITY).unwrap();
                for (i, k) in keys.iter().enumerate() {
                    let _ = s.put(k.clone(), i as u64);
                }
                s
            },
            |mut s| {
                for (old, new) in keys.iter().zip(&fresh) {
                    s.remove(old.as_str());
                    let _ = s.put(new.clone(), 0);
                }
                black_box(s)
            },
            BatchSize::LargeInput,
        )
    });
    c.bench_function("robin_hood::churn_10k", |b| {
        b.iter_batched(
            || {
                let mut s = RobinHoodStore::with_capacity(CAPACITY).unwrap();
                for (i, k) in keys.iter().enumerate() {
                    let _ = s.put(k.clone(), i as u64);
                }
                s
            },
            |mut s| {
                for (old, new) in keys.iter().zip(&fresh) {
                    s.remove(old.as_str());
                    let _ = s.put(new.clone(), 0);
                }
                black_box(s)
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_put_fresh, bench_get_hit_and_miss, bench_churn
}
criterion_main!(benches);

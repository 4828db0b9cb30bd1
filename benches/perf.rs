use chrono::NaiveDate;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use handicap_engine::engine::Engine;
use handicap_engine::fake_day;
use handicap_engine::profile::HistoryProfileBuilder;
use handicap_engine::snapshot::MemorySink;

fn bench_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid bench date")
}

fn bench_profile_build(c: &mut Criterion) {
    let day = fake_day::generate(bench_date(), 8, 3);
    let histories: Vec<_> = day
        .races
        .iter()
        .flat_map(|r| r.horses.iter().map(|h| h.history.clone()))
        .collect();
    let builder = HistoryProfileBuilder::new(bench_date());

    c.bench_function("profile_build", |b| {
        b.iter(|| {
            for history in &histories {
                let profile = builder.build(black_box(history));
                black_box(profile.hmp_score);
            }
        })
    });
}

fn bench_race_day(c: &mut Criterion) {
    let day = fake_day::generate(bench_date(), 40, 9);
    let races = day.race_list();
    let engine = Engine::for_date(bench_date());

    c.bench_function("race_day_compute", |b| {
        b.iter(|| {
            let mut sink = MemorySink::new();
            let summary = engine.run_day(black_box(&day), &races, &mut sink);
            black_box(summary.horses_computed);
        })
    });
}

criterion_group!(benches, bench_profile_build, bench_race_day);
criterion_main!(benches);

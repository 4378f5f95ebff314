//! Benchmarks for the initial partition and deep replays.
//!
//! A synthetic ~3100 county grid stands in for the real county file.

use std::hint::black_box;

use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use madden_imperialism::core::config::PartitionConfig;
use madden_imperialism::core::{CountyId, GeoPoint, TeamId};
use madden_imperialism::history::{Battle, BattleOutcome, HistoryEngine};
use madden_imperialism::map::{partition, Color, County, DistanceMetric, Team};

fn grid_counties() -> Vec<County> {
    let mut counties = Vec::new();
    for row in 0..50 {
        for col in 0..62 {
            let lat = 25.0 + row as f64 * 0.48;
            let lon = -124.0 + col as f64 * 0.92;
            let fips = (row * 62 + col + 1) as u32;
            counties.push(County::new(CountyId::from_fips(fips), "", "", GeoPoint::new(lat, lon)));
        }
    }
    counties
}

fn teams(n: usize) -> Vec<Team> {
    let mut rng = ChaCha8Rng::seed_from_u64(32);
    (0..n)
        .map(|i| {
            Team::new(
                TeamId::new(format!("team{:02}", i)),
                format!("Team {}", i),
                Color::random(&mut rng),
                GeoPoint::new(rng.gen_range(25.0..49.0), rng.gen_range(-124.0..-67.0)),
            )
        })
        .collect()
}

fn bench_partition(c: &mut Criterion) {
    let counties = grid_counties();
    let teams = teams(32);

    for (name, metric, threshold) in [
        ("partition_haversine_serial", DistanceMetric::Haversine, usize::MAX),
        ("partition_haversine_parallel", DistanceMetric::Haversine, 1000),
        ("partition_planar_parallel", DistanceMetric::Planar, 1000),
    ] {
        let config = PartitionConfig {
            metric,
            parallel_threshold: threshold,
            ..PartitionConfig::default()
        };
        c.bench_function(name, |b| {
            b.iter(|| black_box(partition(black_box(&counties), black_box(&teams), &config)))
        });
    }
}

fn bench_replay(c: &mut Criterion) {
    let counties = grid_counties();
    let teams = teams(32);
    let initial = partition(&counties, &teams, &PartitionConfig::default())
        .unwrap()
        .snapshot;
    let mut engine = HistoryEngine::new(teams.iter().map(|t| t.id.clone()), initial).unwrap();

    // 2000 random attacker wins
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    while engine.len() < 2000 {
        let county = &counties[rng.gen_range(0..counties.len())].id;
        let attacker = &teams[rng.gen_range(0..teams.len())].id;
        let defender = engine.current().owner(county).unwrap().clone();
        if &defender == attacker {
            continue;
        }
        let battle = Battle::new(attacker.clone(), defender, county.clone(), BattleOutcome::AttackerWins);
        engine.append_event(battle, Utc::now()).unwrap();
    }

    c.bench_function("replay_to_step_1000_of_2000", |b| {
        b.iter(|| black_box(engine.ownership_at_step(black_box(1000))))
    });
    c.bench_function("current_ownership_full_replay", |b| {
        b.iter(|| black_box(engine.current_ownership()))
    });
}

criterion_group!(benches, bench_partition, bench_replay);
criterion_main!(benches);

// Criterion benchmarks for the hotmatch engine

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hotmatch_engine::core::{
    calculate_match_score, project_page, rank_and_filter, MatchFilters, Matcher, RankOptions,
    SmartFilter, VisibilityProfile,
};
use hotmatch_engine::models::{Counterpart, Investor, MatchRecord, ScoringWeights, Startup, Tier};

const SECTORS: [&str; 6] = ["Fintech", "AI", "SaaS", "Health", "Climate", "Marketplace"];
const STAGES: [&str; 4] = ["Pre-seed", "Seed", "Series A", "Seed / Series A"];

fn create_investor(id: usize) -> Investor {
    Investor {
        id: format!("inv-{}", id),
        name: format!("Investor {}", id),
        firm: Some(format!("Fund {}", id % 40)),
        sectors: vec![
            SECTORS[id % SECTORS.len()].to_string(),
            SECTORS[(id / 3) % SECTORS.len()].to_string(),
        ],
        stages: vec![STAGES[id % STAGES.len()].to_string()],
        check_size_min: (id % 2 == 0).then_some(250_000.0),
        check_size_max: (id % 4 == 0).then_some(2_000_000.0),
        investor_score: Some((id % 100) as f64),
        ..Default::default()
    }
}

fn create_startup() -> Startup {
    Startup {
        id: "startup".to_string(),
        name: "Acme".to_string(),
        sectors: vec!["Fintech".to_string(), "AI".to_string()],
        stage: Some(2),
        total_god_score: Some(78.0),
        ..Default::default()
    }
}

fn bench_score_pair(c: &mut Criterion) {
    let startup = create_startup();
    let investor = create_investor(0);
    let weights = ScoringWeights::default();

    c.bench_function("calculate_match_score", |b| {
        b.iter(|| calculate_match_score(black_box(&startup), black_box(&investor), black_box(&weights)));
    });
}

fn bench_matching(c: &mut Criterion) {
    let matcher = Matcher::with_default_weights();
    let startup = create_startup();

    let mut group = c.benchmark_group("matching");

    for candidate_count in [10, 50, 100, 500, 1000].iter() {
        let investors: Vec<Investor> = (0..*candidate_count).map(create_investor).collect();

        group.bench_with_input(
            BenchmarkId::new("match_startup", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| matcher.match_startup(black_box(&startup), black_box(&investors), Utc::now()));
            },
        );
    }

    group.finish();
}

fn bench_rank_and_project(c: &mut Criterion) {
    let matcher = Matcher::with_default_weights();
    let startup = create_startup();
    let options = RankOptions {
        smart: Some(SmartFilter::default()),
        ..Default::default()
    };
    let profile = VisibilityProfile::for_tier(Tier::Pro);

    let mut group = c.benchmark_group("ranking");

    for candidate_count in [10, 100, 1000].iter() {
        let investors: Vec<Investor> = (0..*candidate_count).map(create_investor).collect();
        let now = Utc::now();
        let records: Vec<MatchRecord> = investors
            .into_iter()
            .map(|investor| MatchRecord {
                matched: matcher.score_pair(&startup, &investor, now),
                counterpart: Counterpart::Investor(investor),
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("rank_and_project", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    let ranked = rank_and_filter(
                        black_box(records.clone()),
                        &MatchFilters::default(),
                        &options,
                        now,
                    );
                    black_box(project_page(&ranked.matches, &profile, 0, 50))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_score_pair, bench_matching, bench_rank_and_project);

criterion_main!(benches);

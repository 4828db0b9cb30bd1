use chrono::NaiveDate;

use handicap_engine::difficulty::race_difficulty;
use handicap_engine::indices::{
    HorseScores, IndexCalculator, cfp_points, form_index, idc_points, or_points,
    success_coefficient,
};
use handicap_engine::model::{Discipline, DisciplineFamily, HorseEntry, PerformanceRecord};
use handicap_engine::profile::{
    BandCounters, BandedCounters, BestTop5, HistoryProfileBuilder, HorseHistoryProfile, Music,
    trend_indicator,
};
use handicap_engine::race_ranker::{Classement, RaceRanker, RankEntry, restore_post_order};
use handicap_engine::rank::assign_ranks;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn run(on: NaiveDate, place: u8, discipline: Discipline) -> PerformanceRecord {
    PerformanceRecord {
        date: on,
        place,
        category: 5,
        discipline,
        allocation: 20_000,
        field_size: 12,
    }
}

#[test]
fn duplicate_maximum_shares_first_rank() {
    let scores = [7.5, 7.5, 6.0];
    assert_eq!(assign_ranks(&scores, |s| *s), vec![1, 1, 3]);
}

#[test]
fn success_coefficient_single_second_place() {
    let history = [run(date(2024, 6, 1), 2, Discipline::Flat)];
    assert_eq!(success_coefficient(&history, DisciplineFamily::GallopFlat), 45.0);
}

#[test]
fn form_index_mean_of_three() {
    let today = date(2024, 6, 15);
    let history = [
        run(date(2024, 6, 1), 1, Discipline::HarnessDriven),
        run(date(2024, 5, 20), 3, Discipline::HarnessDriven),
        run(date(2024, 5, 2), 5, Discipline::HarnessDriven),
    ];
    assert_eq!(form_index(&history, DisciplineFamily::Harness, today), 3.0);
}

#[test]
fn hmp_for_one_recent_top3() {
    let counters = BandedCounters {
        last3: BandCounters {
            top3: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    assert_eq!(counters.hmp_score(), 13.34);
}

#[test]
fn trend_of_short_music() {
    assert_eq!(trend_indicator(&Music::from_digits("1231")), 52.8);
}

#[test]
fn or_and_cfp_for_gallop_third() {
    let history = [PerformanceRecord {
        date: date(2024, 6, 1),
        place: 3,
        category: 4,
        discipline: Discipline::Hurdles,
        allocation: 30_000,
        field_size: 12,
    }];
    let or = or_points(&history, DisciplineFamily::GallopJumps);
    assert_eq!(or, 120.0);

    let entry = HorseEntry {
        sex_age: "H5".to_string(),
        starts: 10,
        earnings: 600_000.0,
        ..Default::default()
    };
    let idc = idc_points(&entry);
    assert_eq!(idc, 1.2);
    assert_eq!(cfp_points(idc, or), 1.0);
}

#[test]
fn restore_after_best_category_reproduces_post_order() {
    let scores = HorseScores::default();
    let top5 = [
        (6, 1, 9_000),
        (2, 4, 40_000),
        (6, 1, 12_000),
        (15, 0, 0),
        (1, 3, 2_000),
    ];
    let profiles: Vec<HorseHistoryProfile> = top5
        .into_iter()
        .map(|(category, place, allocation)| HorseHistoryProfile {
            best_top5: BestTop5 {
                allocation,
                place,
                category,
            },
            ..Default::default()
        })
        .collect();
    // arena order differs from post order, with one missing post
    let posts = [3u16, 1, 0, 5, 2];
    let entries: Vec<RankEntry> = profiles
        .iter()
        .zip(posts)
        .map(|(profile, post)| RankEntry {
            post,
            scores: &scores,
            profile,
        })
        .collect();
    let ranker = RaceRanker::new(&entries);

    let mut handles = ranker.classement_order(Classement::BestCategory);
    let ranked_posts: Vec<u16> = handles.iter().map(|h| h.post).collect();
    assert_eq!(ranked_posts, vec![2, 1, 0, 3, 5]);

    restore_post_order(&mut handles);
    assert_eq!(handles.as_slice(), ranker.post_order());
    let posts_after: Vec<u16> = handles.iter().map(|h| h.post).collect();
    assert_eq!(posts_after, vec![1, 2, 3, 5, 0]);

    restore_post_order(&mut handles);
    assert_eq!(handles.as_slice(), ranker.post_order());
}

#[test]
fn difficulty_four_weak_in_ten() {
    let mn = [0, 1, 2, 2, 3, 3, 4, 5, 6, 9];
    assert_eq!(race_difficulty(&mn, 10), 40);
}

#[test]
fn empty_history_scores() {
    let today = date(2024, 6, 15);
    let profile = HistoryProfileBuilder::new(today).build(&[]);
    let entry = HorseEntry {
        post: 4,
        name: "Inconnu".to_string(),
        sex_age: "F2".to_string(),
        ..Default::default()
    };
    let scores =
        IndexCalculator::new(today, DisciplineFamily::GallopFlat).compute(&entry, &[], &profile);

    assert_eq!(scores.coef_reussite, 1.0);
    assert_eq!(scores.ind_for, 10.0);
    assert_eq!(profile.hmp_score, 0.0);
    assert_eq!(scores.pts_cx, 0.0);
    assert_eq!(scores.pts_mn, 0);
    assert_eq!(scores.pts_or, 0.0);
    assert_eq!(scores.pts_cfp, 0.0);
}

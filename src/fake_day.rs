//! Synthetic race days for demos and benchmarks.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{
    Discipline, HorseEntry, PerformanceRecord, Race, RaceKey, UNCLASSIFIED_CATEGORY,
};
use crate::snapshot::{RaceDaySnapshot, SnapshotHorse, SnapshotRace};

const DISCIPLINES: [Discipline; 6] = [
    Discipline::HarnessDriven,
    Discipline::HarnessDriven,
    Discipline::HarnessMounted,
    Discipline::Flat,
    Discipline::Hurdles,
    Discipline::Steeplechase,
];

const NAME_HEADS: [&str; 12] = [
    "Belle", "Roi", "Eclair", "Douce", "Grand", "Joli", "Prince", "Reine", "Sacre", "Vif",
    "Noble", "Ombre",
];
const NAME_TAILS: [&str; 12] = [
    "du Bocage", "de Mai", "Royal", "d'Avril", "Bleu", "des Pins", "Doree", "du Nord",
    "Fleuri", "de Vire", "Sauvage", "Normand",
];

/// Build a deterministic race day of `races` races: 8 to 16 runners each, 0 to 20 past runs
/// per runner.
pub fn generate(date: NaiveDate, races: usize, seed: u64) -> RaceDaySnapshot {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(races);
    let mut serial = 0usize;

    for idx in 0..races {
        let discipline = DISCIPLINES[rng.gen_range(0..DISCIPLINES.len())];
        let runners = rng.gen_range(8..=16usize);
        let key = RaceKey {
            program: format!("R{}", idx / 8 + 1),
            race_number: (idx % 8 + 1) as u8,
        };

        let horses = (1..=runners)
            .map(|post| {
                serial += 1;
                fake_horse(&mut rng, date, discipline, post as u16, serial)
            })
            .collect();

        out.push(SnapshotRace {
            race: Race {
                key,
                discipline,
                field_size: runners,
            },
            horses,
        });
    }

    RaceDaySnapshot::new(Some(date), out)
}

fn fake_horse(
    rng: &mut impl Rng,
    date: NaiveDate,
    discipline: Discipline,
    post: u16,
    serial: usize,
) -> SnapshotHorse {
    let age = rng.gen_range(2..=10u32);
    let sex = ['H', 'F', 'M'][rng.gen_range(0..3)];
    let name = format!(
        "{} {} {}",
        NAME_HEADS[rng.gen_range(0..NAME_HEADS.len())],
        NAME_TAILS[rng.gen_range(0..NAME_TAILS.len())],
        serial
    );

    let runs = rng.gen_range(0..=20usize);
    let history = fake_history(rng, date, discipline, runs);
    let starts = history.len() as u32 + rng.gen_range(0..10u32);
    let wins = history.iter().filter(|p| p.place == 1).count() as u32;
    let places = history.iter().filter(|p| (1..=3).contains(&p.place)).count() as u32;
    let earnings: f64 = history
        .iter()
        .filter(|p| (1..=5).contains(&p.place))
        .map(|p| p.allocation as f64 * 0.5 / p.place as f64)
        .sum();

    SnapshotHorse {
        entry: HorseEntry {
            post,
            name,
            sex_age: format!("{sex}{age}"),
            starts,
            wins,
            places,
            earnings: earnings.round(),
            rd: rng.gen_range(-3..=3) as f64,
            re: rng.gen_range(-3..=3) as f64,
        },
        history,
    }
}

fn fake_history(
    rng: &mut impl Rng,
    date: NaiveDate,
    discipline: Discipline,
    runs: usize,
) -> Vec<PerformanceRecord> {
    let mut history = Vec::with_capacity(runs);
    let mut day = date;
    for _ in 0..runs {
        day -= Duration::days(rng.gen_range(10..60));
        let field_size = rng.gen_range(6..=18u16);
        let place = if rng.gen_bool(0.2) {
            0
        } else {
            rng.gen_range(1..=field_size.min(12)) as u8
        };
        let category = if rng.gen_bool(0.1) {
            UNCLASSIFIED_CATEGORY
        } else {
            rng.gen_range(1..=8u8)
        };
        history.push(PerformanceRecord {
            date: day,
            place,
            category,
            discipline,
            allocation: rng.gen_range(8..=120u64) * 1_000,
            field_size,
        });
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let a = generate(date, 3, 7);
        let b = generate(date, 3, 7);
        assert_eq!(a.races.len(), 3);
        for (ra, rb) in a.races.iter().zip(&b.races) {
            assert_eq!(ra.race.key, rb.race.key);
            assert_eq!(ra.horses.len(), rb.horses.len());
            assert!((8..=16).contains(&ra.horses.len()));
            assert_eq!(ra.race.field_size, ra.horses.len());
        }
    }

    #[test]
    fn histories_are_most_recent_first() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let day = generate(date, 2, 11);
        for horse in day.races.iter().flat_map(|r| &r.horses) {
            assert!(horse.history.len() <= 20);
            assert!(horse.history.windows(2).all(|w| w[0].date > w[1].date));
            assert!(horse.history.iter().all(|p| p.date < date));
        }
    }
}

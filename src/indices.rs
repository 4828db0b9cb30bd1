use chrono::{Months, NaiveDate};

use crate::model::{DisciplineFamily, HorseEntry, PerformanceRecord, place_key};
use crate::profile::{HorseHistoryProfile, Music};

const SUCCESS_WEIGHTS: [f64; 5] = [5.0, 4.0, 3.0, 2.0, 1.0];
const FORM_RUNS: usize = 5;
const FORM_SECOND_RUN_MONTHS: u32 = 2;
const FORM_WINDOW_HARNESS_MONTHS: u32 = 3;
const FORM_WINDOW_GALLOP_MONTHS: u32 = 5;
const OR_DEFAULT_FIELD: f64 = 10.0;
const OR_LIMIT_HARNESS: u8 = 8;
const OR_LIMIT_GALLOP: u8 = 6;
const CX_UNPLACED: f64 = 11.0;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `num / den`, or 0 when the denominator is 0.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Unranked numeric indices of one horse.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HorseScores {
    pub coef_reussite: f64,
    pub ind_for: f64,
    pub pts_idc: f64,
    pub pts_cfp: f64,
    pub pts_cx: f64,
    pub pts_or: f64,
    pub pts_mn: u32,
    pub rx: f64,
    pub cje: f64,
}

/// Per-horse formulas evaluated against one race's context.
pub struct IndexCalculator {
    computation_date: NaiveDate,
    family: DisciplineFamily,
}

impl IndexCalculator {
    pub fn new(computation_date: NaiveDate, family: DisciplineFamily) -> Self {
        Self {
            computation_date,
            family,
        }
    }

    pub fn compute(
        &self,
        entry: &HorseEntry,
        history: &[PerformanceRecord],
        profile: &HorseHistoryProfile,
    ) -> HorseScores {
        let pts_idc = idc_points(entry);
        let pts_or = or_points(history, self.family);
        let pts_mn = mn_points(&profile.music_full);
        HorseScores {
            coef_reussite: success_coefficient(history, self.family),
            ind_for: form_index(history, self.family, self.computation_date),
            pts_idc,
            pts_cfp: cfp_points(pts_idc, pts_or),
            pts_cx: cx_points(&profile.music_recent),
            pts_or,
            pts_mn,
            rx: rx_points(entry),
            cje: cje_value(pts_mn, entry.rd, entry.re),
        }
    }
}

/// Weighted score of the last five runs in the race's own family.
///
/// Weights 5,4,3,2,1 apply to `11 - place` (unplaced counts as 10) and the sum is divided by
/// the number of runs used. No qualifying run gives 1.
pub fn success_coefficient(history: &[PerformanceRecord], family: DisciplineFamily) -> f64 {
    let mut sum = 0.0;
    let mut used = 0usize;
    for (perf, weight) in history
        .iter()
        .filter(|p| p.discipline.family() == family)
        .zip(SUCCESS_WEIGHTS)
    {
        sum += weight * (11.0 - f64::from(perf.place_key()));
        used += 1;
    }
    if used == 0 {
        return 1.0;
    }
    round_to(sum / used as f64, 2)
}

/// Mean place of the recent runs still inside the form window; 10 when none qualify.
///
/// Scanning stops at the second run when it is older than two months, and at any run older
/// than three months (harness) or five months (gallop).
pub fn form_index(
    history: &[PerformanceRecord],
    family: DisciplineFamily,
    computation_date: NaiveDate,
) -> f64 {
    let window = if family.is_harness() {
        FORM_WINDOW_HARNESS_MONTHS
    } else {
        FORM_WINDOW_GALLOP_MONTHS
    };
    let second_floor = months_before(computation_date, FORM_SECOND_RUN_MONTHS);
    let window_floor = months_before(computation_date, window);

    let mut places: Vec<f64> = Vec::with_capacity(FORM_RUNS);
    for (idx, perf) in history.iter().take(FORM_RUNS).enumerate() {
        if idx == 1 && perf.date < second_floor {
            break;
        }
        if perf.date < window_floor {
            break;
        }
        places.push(f64::from(perf.place_key()));
    }

    if places.is_empty() {
        return 10.0;
    }
    round_to(places.iter().sum::<f64>() / places.len() as f64, 2)
}

fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// Earnings (in thousands) per start, per year of age, scaled by 10.
pub fn idc_points(entry: &HorseEntry) -> f64 {
    let den = 10.0 * f64::from(entry.age()) * f64::from(entry.starts);
    round_to(ratio(entry.earnings / 1000.0, den), 2)
}

/// Purse-per-place value of the last run, scaled by its field size.
///
/// Places below the discipline limit (8 harness, 6 gallop) earn the full value; worse or
/// unplaced runs earn half, with an unplaced run counted as 10th.
pub fn or_points(history: &[PerformanceRecord], family: DisciplineFamily) -> f64 {
    let Some(last) = history.first() else {
        return 0.0;
    };
    if last.allocation == 0 {
        return 0.0;
    }
    let field = if last.field_size == 0 {
        OR_DEFAULT_FIELD
    } else {
        f64::from(last.field_size)
    };
    let limit = if family.is_harness() {
        OR_LIMIT_HARNESS
    } else {
        OR_LIMIT_GALLOP
    };
    let allocation = last.allocation as f64;

    if last.place > 0 && last.place < limit {
        round_to(allocation / (1000.0 * f64::from(last.place)) * field, 2)
    } else {
        let place = if last.place == 0 { 10 } else { last.place };
        round_to(allocation / (1000.0 * f64::from(place)) * field / 2.0, 2)
    }
}

pub fn cfp_points(idc: f64, or: f64) -> f64 {
    if or > 0.0 {
        round_to(idc / or * 100.0, 2)
    } else {
        0.0
    }
}

/// Mean digit of the recent music, unplaced runs counted as 11.
pub fn cx_points(music: &Music) -> f64 {
    if music.is_unraced() {
        return 0.0;
    }
    let values: Vec<f64> = music
        .as_str()
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(0) | None => CX_UNPLACED,
            Some(d) => f64::from(d),
        })
        .collect();
    round_to(values.iter().sum::<f64>() / values.len() as f64, 2)
}

pub fn mn_points(music_full: &Music) -> u32 {
    music_full.podiums()
}

/// Average earnings per start.
pub fn rx_points(entry: &HorseEntry) -> f64 {
    if entry.starts == 0 || entry.earnings == 0.0 {
        return 0.0;
    }
    round_to(entry.earnings / f64::from(entry.starts), 2)
}

/// `100/MN` plus the external adjustments, capped at 1.
pub fn cje_value(mn: u32, rd: f64, re: f64) -> f64 {
    let base = if mn > 0 { 100.0 / f64::from(mn) } else { 0.0 };
    let value = base + rd / 100.0 + re / 100.0;
    if value > 1.0 { 1.0 } else { round_to(value, 1) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Discipline;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn run(date: NaiveDate, place: u8, discipline: Discipline) -> PerformanceRecord {
        PerformanceRecord {
            date,
            place,
            category: 7,
            discipline,
            allocation: 0,
            field_size: 0,
        }
    }

    #[test]
    fn success_coefficient_single_run() {
        let history = vec![run(date(2024, 5, 1), 2, Discipline::HarnessDriven)];
        assert_eq!(success_coefficient(&history, DisciplineFamily::Harness), 45.0);
    }

    #[test]
    fn success_coefficient_skips_other_families() {
        let history = vec![
            run(date(2024, 5, 10), 1, Discipline::Hurdles),
            run(date(2024, 5, 1), 0, Discipline::Flat),
            run(date(2024, 4, 1), 4, Discipline::Flat),
        ];
        // (5*(11-10) + 4*(11-4)) / 2
        assert_eq!(success_coefficient(&history, DisciplineFamily::GallopFlat), 16.5);
        assert_eq!(success_coefficient(&[], DisciplineFamily::GallopFlat), 1.0);
    }

    #[test]
    fn form_index_mean_of_places() {
        let today = date(2024, 6, 1);
        let history = vec![
            run(date(2024, 5, 20), 1, Discipline::Flat),
            run(date(2024, 5, 1), 3, Discipline::Flat),
            run(date(2024, 3, 1), 5, Discipline::Flat),
        ];
        assert_eq!(form_index(&history, DisciplineFamily::GallopFlat, today), 3.0);
    }

    #[test]
    fn form_index_window_rules() {
        let today = date(2024, 6, 1);
        // Second run older than two months stops the scan.
        let stale_second = vec![
            run(date(2024, 5, 20), 2, Discipline::Flat),
            run(date(2024, 3, 20), 1, Discipline::Flat),
        ];
        assert_eq!(form_index(&stale_second, DisciplineFamily::GallopFlat, today), 2.0);

        // Four months old: inside the gallop window, outside the harness one.
        let history = vec![
            run(date(2024, 5, 25), 4, Discipline::Flat),
            run(date(2024, 5, 1), 0, Discipline::Flat),
            run(date(2024, 2, 1), 1, Discipline::Flat),
        ];
        assert_eq!(form_index(&history, DisciplineFamily::GallopFlat, today), 5.0);
        assert_eq!(form_index(&history, DisciplineFamily::Harness, today), 7.0);
        assert_eq!(form_index(&[], DisciplineFamily::Harness, today), 10.0);
    }

    #[test]
    fn or_points_gallop_full_value() {
        let mut last = run(date(2024, 5, 1), 3, Discipline::Flat);
        last.allocation = 30_000;
        last.field_size = 12;
        assert_eq!(or_points(&[last], DisciplineFamily::GallopFlat), 120.0);
    }

    #[test]
    fn or_points_half_value_past_limit() {
        let mut last = run(date(2024, 5, 1), 6, Discipline::Flat);
        last.allocation = 30_000;
        last.field_size = 12;
        assert_eq!(or_points(&[last.clone()], DisciplineFamily::GallopFlat), 30.0);
        // Harness limit is 8, so 6th earns the full value.
        assert_eq!(or_points(&[last.clone()], DisciplineFamily::Harness), 60.0);

        last.place = 0;
        last.field_size = 0;
        assert_eq!(or_points(&[last.clone()], DisciplineFamily::Harness), 15.0);

        last.allocation = 0;
        assert_eq!(or_points(&[last], DisciplineFamily::Harness), 0.0);
    }

    #[test]
    fn cfp_relative_to_or() {
        assert_eq!(cfp_points(6.0, 120.0), 5.0);
        assert_eq!(cfp_points(6.0, 0.0), 0.0);
    }

    #[test]
    fn cx_counts_unplaced_as_eleven() {
        assert_eq!(cx_points(&Music::from_digits("1203")), 4.25);
        assert_eq!(cx_points(&Music::default()), 0.0);
    }

    #[test]
    fn idc_and_rx_guard_zero_denominators() {
        let entry = HorseEntry {
            sex_age: "H5".to_string(),
            starts: 20,
            earnings: 150_000.0,
            ..Default::default()
        };
        assert_eq!(idc_points(&entry), 0.15);
        assert_eq!(rx_points(&entry), 7500.0);

        let unraced = HorseEntry {
            sex_age: "F2".to_string(),
            ..Default::default()
        };
        assert_eq!(idc_points(&unraced), 0.0);
        assert_eq!(rx_points(&unraced), 0.0);
    }

    #[test]
    fn cje_caps_at_one() {
        assert_eq!(cje_value(4, 0.0, 0.0), 1.0);
        assert_eq!(cje_value(0, 12.0, 30.0), 0.4);
        assert_eq!(cje_value(0, 0.0, 0.0), 0.0);
    }
}

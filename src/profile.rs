//! One-pass summary of a horse's past performances.
//!
//! The builder walks the history once, most recent first, and fills the banded place counters,
//! the "music" strings, the running best-allocation / best-category extrema and the two best
//! places of the last five runs. Nothing here mutates the input records.

use std::fmt;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::indices::round_to;
use crate::model::{PerformanceRecord, UNCLASSIFIED_CATEGORY, place_key};

/// Displayed in place of an empty music string.
pub const NO_HISTORY: &str = "Inédit";

const LOOKBACK_MONTHS: u32 = 12;
const TWO_BEST_WINDOW: usize = 5;
const TREND_HEAD: usize = 4;
const TREND_TAIL: usize = 3;
const TREND_TAIL_MIN_LEN: usize = 8;

/// Finishing places encoded as digits, most recent first. Unplaced runs are written as `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Music(String);

impl Music {
    pub fn from_digits(raw: &str) -> Self {
        Self(raw.to_string())
    }

    fn push_place(&mut self, place: u8) {
        let digit = if (1..=9).contains(&place) { place } else { 0 };
        self.0.push(char::from(b'0' + digit));
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unraced(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of 1st, 2nd and 3rd places.
    pub fn podiums(&self) -> u32 {
        self.0.chars().filter(|c| matches!(c, '1' | '2' | '3')).count() as u32
    }
}

impl fmt::Display for Music {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str(NO_HISTORY)
        } else {
            f.write_str(&self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Top3,
    Mid,
    Low,
    Unplaced,
}

impl Band {
    pub fn of(place: u8) -> Self {
        match place {
            1..=3 => Band::Top3,
            4..=5 => Band::Mid,
            6..=9 => Band::Low,
            _ => Band::Unplaced,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounters {
    pub top3: u32,
    pub mid: u32,
    pub low: u32,
    pub unplaced: u32,
}

impl BandCounters {
    fn record(&mut self, band: Band) {
        match band {
            Band::Top3 => self.top3 += 1,
            Band::Mid => self.mid += 1,
            Band::Low => self.low += 1,
            Band::Unplaced => self.unplaced += 1,
        }
    }
}

/// Counters per recency window. Positions are 1-based, 1 = most recent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandedCounters {
    /// Positions 1-3.
    pub last3: BandCounters,
    /// Positions 1-5.
    pub last5: BandCounters,
    /// Positions 6-10.
    pub tail: BandCounters,
    /// Positions 9-10.
    pub tail_end: BandCounters,
}

impl BandedCounters {
    fn record(&mut self, position: usize, place: u8) {
        let band = Band::of(place);
        if position <= 3 {
            self.last3.record(band);
        }
        if position <= 5 {
            self.last5.record(band);
        }
        if (6..=10).contains(&position) {
            self.tail.record(band);
        }
        if (9..=10).contains(&position) {
            self.tail_end.record(band);
        }
    }

    /// Weighted HMP score, rounded to 2 decimals. Unplaced counters carry no weight.
    pub fn hmp_score(&self) -> f64 {
        let raw = 13.34 * f64::from(self.last3.top3)
            + 6.67 * f64::from(self.last3.mid)
            + 1.67 * f64::from(self.last3.low)
            + 3.0 * f64::from(self.last5.top3)
            + 2.0 * f64::from(self.last5.mid)
            + 1.0 * f64::from(self.last5.low)
            + 3.0 * f64::from(self.tail.top3)
            + 2.0 * f64::from(self.tail.mid)
            + 1.0 * f64::from(self.tail.low)
            + 10.0 * f64::from(self.tail_end.top3)
            + 5.0 * f64::from(self.tail_end.mid)
            + 1.66 * f64::from(self.tail_end.low);
        round_to(raw, 2)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestAllocation {
    pub amount: u64,
    pub place: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestCategory {
    pub code: u8,
    pub place: u8,
}

impl Default for BestCategory {
    fn default() -> Self {
        Self {
            code: UNCLASSIFIED_CATEGORY,
            place: 0,
        }
    }
}

/// Best class among runs finished in the first five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestTop5 {
    pub allocation: u64,
    pub place: u8,
    pub category: u8,
}

impl Default for BestTop5 {
    fn default() -> Self {
        Self {
            allocation: 0,
            place: 0,
            category: UNCLASSIFIED_CATEGORY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HorseHistoryProfile {
    pub music_recent: Music,
    pub music_full: Music,
    pub counters: BandedCounters,
    pub best_allocation: BestAllocation,
    pub best_category: BestCategory,
    pub best_top5: BestTop5,
    pub two_best_places: String,
    pub hmp_score: f64,
    pub trend_indicator: f64,
    pub performance_count: usize,
}

pub struct HistoryProfileBuilder {
    computation_date: NaiveDate,
}

impl HistoryProfileBuilder {
    pub fn new(computation_date: NaiveDate) -> Self {
        Self { computation_date }
    }

    /// Profile a history supplied most recent first.
    pub fn build(&self, history: &[PerformanceRecord]) -> HorseHistoryProfile {
        let recent_floor = self
            .computation_date
            .checked_sub_months(Months::new(LOOKBACK_MONTHS))
            .unwrap_or(NaiveDate::MIN);

        let mut music_recent = Music::default();
        let mut music_full = Music::default();
        let mut counters = BandedCounters::default();
        let mut best_allocation: Option<BestAllocation> = None;
        let mut best_category: Option<BestCategory> = None;
        let mut best_top5: Option<BestTop5> = None;
        let mut two_best = TwoBest::default();

        for (idx, perf) in history.iter().enumerate() {
            let position = idx + 1;

            counters.record(position, perf.place);

            music_full.push_place(perf.place);
            if perf.date >= recent_floor {
                music_recent.push_place(perf.place);
            }

            best_allocation = Some(match best_allocation {
                Some(best) if !improves_allocation(&best, perf) => best,
                _ => BestAllocation {
                    amount: perf.allocation,
                    place: perf.place,
                },
            });

            best_category = Some(match best_category {
                Some(best) if !improves_category(&best, perf) => best,
                _ => BestCategory {
                    code: perf.category,
                    place: perf.place,
                },
            });

            if (1..=5).contains(&perf.place) {
                best_top5 = Some(match best_top5 {
                    Some(best) if !improves_top5(&best, perf) => best,
                    _ => BestTop5 {
                        allocation: perf.allocation,
                        place: perf.place,
                        category: perf.category,
                    },
                });
            }

            if position <= TWO_BEST_WINDOW {
                two_best.offer(perf.place);
            }
        }

        let hmp_score = counters.hmp_score();
        let trend_indicator = trend_indicator(&music_recent);

        HorseHistoryProfile {
            music_recent,
            music_full,
            counters,
            best_allocation: best_allocation.unwrap_or_default(),
            best_category: best_category.unwrap_or_default(),
            best_top5: best_top5.unwrap_or_default(),
            two_best_places: two_best.encode(),
            hmp_score,
            trend_indicator,
            performance_count: history.len(),
        }
    }
}

fn improves_allocation(best: &BestAllocation, perf: &PerformanceRecord) -> bool {
    perf.allocation > best.amount
        || (perf.allocation == best.amount && perf.place_key() < place_key(best.place))
}

fn improves_category(best: &BestCategory, perf: &PerformanceRecord) -> bool {
    perf.category < best.code
        || (perf.category == best.code && perf.place_key() < place_key(best.place))
}

fn improves_top5(best: &BestTop5, perf: &PerformanceRecord) -> bool {
    if perf.category != best.category {
        return perf.category < best.category;
    }
    if perf.place != best.place {
        return perf.place < best.place;
    }
    perf.allocation > best.allocation
}

/// The two smallest positive places offered so far.
#[derive(Debug, Default)]
struct TwoBest {
    best: Option<u8>,
    second: Option<u8>,
}

impl TwoBest {
    fn offer(&mut self, place: u8) {
        if !(1..=9).contains(&place) {
            return;
        }
        match self.best {
            Some(best) if place >= best => {
                if self.second.is_none_or(|second| place < second) {
                    self.second = Some(place);
                }
            }
            _ => {
                self.second = self.best;
                self.best = Some(place);
            }
        }
    }

    /// Two-digit code, best then second, missing slots padded with 9.
    fn encode(&self) -> String {
        format!("{}{}", self.best.unwrap_or(9), self.second.unwrap_or(9))
    }
}

/// MX trend score of a music string.
///
/// Counts 1st/2nd/3rd places in the first four digits, plus the last three digits when the
/// string is longer than eight, and returns `(100*c1 + 10*c2 + c3) / (c1 + c2 + c3)` rounded to
/// one decimal. Returns 0 when nothing was counted.
pub fn trend_indicator(music: &Music) -> f64 {
    let chars: Vec<char> = music.as_str().chars().collect();
    let mut counts = [0u32; 3];
    let mut tally = |c: &char| match c {
        '1' => counts[0] += 1,
        '2' => counts[1] += 1,
        '3' => counts[2] += 1,
        _ => {}
    };

    chars.iter().take(TREND_HEAD).for_each(&mut tally);
    if chars.len() > TREND_TAIL_MIN_LEN {
        chars[chars.len() - TREND_TAIL..].iter().for_each(&mut tally);
    }

    let total = counts.iter().sum::<u32>();
    if total == 0 {
        return 0.0;
    }
    let weighted =
        100.0 * f64::from(counts[0]) + 10.0 * f64::from(counts[1]) + f64::from(counts[2]);
    round_to(weighted / f64::from(total), 1)
}

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Category code given to performances whose class is unknown.
pub const UNCLASSIFIED_CATEGORY: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    HarnessDriven,
    HarnessMounted,
    Flat,
    Hurdles,
    Steeplechase,
    CrossCountry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisciplineFamily {
    Harness,
    GallopFlat,
    GallopJumps,
}

impl Discipline {
    pub fn family(self) -> DisciplineFamily {
        match self {
            Discipline::HarnessDriven | Discipline::HarnessMounted => DisciplineFamily::Harness,
            Discipline::Flat => DisciplineFamily::GallopFlat,
            Discipline::Hurdles | Discipline::Steeplechase | Discipline::CrossCountry => {
                DisciplineFamily::GallopJumps
            }
        }
    }

    /// Map provider labels ("ATTELE", "Plat", "steeple-chase", ...) to a discipline.
    pub fn from_label(raw: &str) -> Option<Self> {
        let s = raw.trim().to_lowercase().replace(['-', '_', ' '], "");
        match s.as_str() {
            "attele" | "attelé" | "harness" | "harnessdriven" | "trot" => {
                Some(Discipline::HarnessDriven)
            }
            "monte" | "monté" | "harnessmounted" => Some(Discipline::HarnessMounted),
            "plat" | "flat" => Some(Discipline::Flat),
            "haies" | "hurdles" => Some(Discipline::Hurdles),
            "steeplechase" | "steeple" => Some(Discipline::Steeplechase),
            "cross" | "crosscountry" => Some(Discipline::CrossCountry),
            _ => None,
        }
    }
}

impl DisciplineFamily {
    pub fn is_harness(self) -> bool {
        self == DisciplineFamily::Harness
    }

    /// Trot and gallop histories are never mixed; the two gallop families share one grouping.
    pub fn same_grouping(self, other: DisciplineFamily) -> bool {
        self.is_harness() == other.is_harness()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RaceKey {
    /// Venue-program identifier, e.g. "R1".
    pub program: String,
    pub race_number: u8,
}

impl fmt::Display for RaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}C{}", self.program, self.race_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Race {
    pub key: RaceKey,
    pub discipline: Discipline,
    pub field_size: usize,
}

impl Race {
    pub fn family(&self) -> DisciplineFamily {
        self.discipline.family()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HorseEntry {
    /// Post number 1..N; 0 when the provider did not supply one.
    pub post: u16,
    pub name: String,
    /// Sex letter followed by age, e.g. "H5" or "F4".
    pub sex_age: String,
    pub starts: u32,
    pub wins: u32,
    pub places: u32,
    pub earnings: f64,
    /// External adjustment points supplied alongside the program.
    pub rd: f64,
    pub re: f64,
}

impl HorseEntry {
    /// Age from the trailing digits of the sex+age code; 0 when absent.
    pub fn age(&self) -> u32 {
        let digits: String = self
            .sex_age
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<u32>().unwrap_or(0)
    }
}

/// One historical run. Supplied most-recent-first per horse and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub date: NaiveDate,
    /// 0 = unplaced/unknown/DNF, 1..9 = finishing order.
    pub place: u8,
    /// 1 = highest class, 15 = unclassified.
    pub category: u8,
    pub discipline: Discipline,
    pub allocation: u64,
    pub field_size: u16,
}

impl PerformanceRecord {
    /// Place as a ranking key: unplaced or out-of-range places count as 10 (worst).
    pub fn place_key(&self) -> u8 {
        place_key(self.place)
    }
}

pub fn place_key(place: u8) -> u8 {
    if (1..=9).contains(&place) { place } else { 10 }
}

/// Per-horse output block. Written only by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HorseIndices {
    pub post: u16,
    pub name: String,
    pub coef_reussite: f64,
    pub coef_reussite_rank: u32,
    pub ind_for: f64,
    pub ind_for_rank: u32,
    pub pts_idc: f64,
    pub pts_idc_rank: u32,
    pub pts_cfp: f64,
    pub pts_cfp_rank: u32,
    pub pts_cx: f64,
    pub pts_cx_rank: u32,
    pub pts_or: f64,
    pub pts_or_rank: u32,
    pub pts_mn: u32,
    pub pts_mn_rank: u32,
    pub rx: f64,
    pub cje: f64,
    pub hmp: i64,
    pub hmp_rank: u32,
    pub best_allocation_rank: u32,
    pub best_category_rank: u32,
    pub mx: i64,
    pub nb_bloc: String,
    pub music_recent: String,
    pub music_full: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceResult {
    pub key: RaceKey,
    pub difficulty: u32,
    /// Ascending post-number order.
    pub horses: Vec<HorseIndices>,
}

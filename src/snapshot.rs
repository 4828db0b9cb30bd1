//! Race-day snapshot files.
//!
//! A snapshot is the JSON dump of one day's program: races, their fields and every runner's
//! past performances. Decoding is lenient: a missing or malformed place, allocation or category
//! falls back to its sentinel instead of rejecting the file. The loaded snapshot then serves
//! as both field and history source for the engine.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

use crate::config::parse_date;
use crate::engine::{FieldSource, HistorySource, ResultSink};
use crate::model::{
    Discipline, DisciplineFamily, HorseEntry, PerformanceRecord, Race, RaceKey, RaceResult,
    UNCLASSIFIED_CATEGORY,
};

#[derive(Debug, Clone)]
pub struct SnapshotRace {
    pub race: Race,
    pub horses: Vec<SnapshotHorse>,
}

#[derive(Debug, Clone)]
pub struct SnapshotHorse {
    pub entry: HorseEntry,
    pub history: Vec<PerformanceRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct RaceDaySnapshot {
    pub date: Option<NaiveDate>,
    pub races: Vec<SnapshotRace>,
    by_horse: HashMap<String, (usize, usize)>,
}

impl RaceDaySnapshot {
    pub fn new(date: Option<NaiveDate>, races: Vec<SnapshotRace>) -> Self {
        let mut by_horse = HashMap::new();
        for (race_idx, race) in races.iter().enumerate() {
            for (horse_idx, horse) in race.horses.iter().enumerate() {
                by_horse
                    .entry(horse.entry.name.to_lowercase())
                    .or_insert((race_idx, horse_idx));
            }
        }
        Self {
            date,
            races,
            by_horse,
        }
    }

    pub fn race_list(&self) -> Vec<Race> {
        self.races.iter().map(|r| r.race.clone()).collect()
    }

    pub fn horse_count(&self) -> usize {
        self.races.iter().map(|r| r.horses.len()).sum()
    }
}

impl FieldSource for RaceDaySnapshot {
    fn fetch_field(&self, race: &RaceKey) -> Result<Vec<HorseEntry>> {
        let found = self
            .races
            .iter()
            .find(|r| &r.race.key == race)
            .ok_or_else(|| anyhow!("race {race} not in snapshot"))?;
        let mut field: Vec<HorseEntry> = found.horses.iter().map(|h| h.entry.clone()).collect();
        field.sort_by_key(|h| (h.post == 0, h.post));
        Ok(field)
    }
}

impl HistorySource for RaceDaySnapshot {
    fn fetch_history(
        &self,
        horse: &str,
        family: DisciplineFamily,
        cutoff: NaiveDate,
    ) -> Result<Vec<PerformanceRecord>> {
        let Some((race_idx, horse_idx)) = self.by_horse.get(&horse.to_lowercase()).copied()
        else {
            return Ok(Vec::new());
        };
        let mut history: Vec<PerformanceRecord> = self.races[race_idx].horses[horse_idx]
            .history
            .iter()
            .filter(|p| p.date > cutoff)
            .filter(|p| family.same_grouping(p.discipline.family()))
            .cloned()
            .collect();
        history.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(history)
    }
}

/// Collects results in memory, keyed by race.
#[derive(Debug, Default)]
pub struct MemorySink {
    results: BTreeMap<RaceKey, RaceResult>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RaceKey) -> Option<&RaceResult> {
        self.results.get(key)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_results(self) -> Vec<RaceResult> {
        self.results.into_values().collect()
    }
}

impl ResultSink for MemorySink {
    fn persist(&mut self, result: &RaceResult) -> Result<()> {
        self.results.insert(result.key.clone(), result.clone());
        Ok(())
    }
}

pub fn load_snapshot(path: &Path) -> Result<RaceDaySnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read snapshot {}", path.display()))?;
    parse_snapshot_json(&raw).with_context(|| format!("parse snapshot {}", path.display()))
}

pub fn parse_snapshot_json(raw: &str) -> Result<RaceDaySnapshot> {
    let value: Value = serde_json::from_str(raw.trim()).context("invalid snapshot json")?;
    let date = value.get("date").and_then(|v| v.as_str()).and_then(parse_date);
    let races_raw = value
        .get("races")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("snapshot has no races array"))?;

    let mut races = Vec::with_capacity(races_raw.len());
    for (idx, item) in races_raw.iter().enumerate() {
        match parse_race(item) {
            Some(race) => races.push(race),
            None => warn!(index = idx, "skipping unreadable race"),
        }
    }
    Ok(RaceDaySnapshot::new(date, races))
}

fn parse_race(v: &Value) -> Option<SnapshotRace> {
    let program = v.get("program").and_then(|x| match x.as_str() {
        Some(label) => Some(label.to_string()),
        None => as_u64_any(x).map(|n| format!("R{n}")),
    })?;
    let race_number = u8::try_from(as_u64_any(v.get("race_number")?)?).ok()?;
    let discipline = v
        .get("discipline")
        .and_then(|x| x.as_str())
        .and_then(Discipline::from_label)?;

    let horses: Vec<SnapshotHorse> = v
        .get("horses")
        .and_then(|x| x.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|h| parse_horse(h, discipline))
                .collect()
        })
        .unwrap_or_default();
    let field_size = v
        .get("field_size")
        .and_then(as_u64_any)
        .map(|n| n as usize)
        .unwrap_or(horses.len());

    Some(SnapshotRace {
        race: Race {
            key: RaceKey {
                program,
                race_number,
            },
            discipline,
            field_size,
        },
        horses,
    })
}

fn parse_horse(v: &Value, race_discipline: Discipline) -> Option<SnapshotHorse> {
    let name = v.get("name")?.as_str()?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    let entry = HorseEntry {
        post: v
            .get("post")
            .and_then(as_u64_any)
            .and_then(|n| u16::try_from(n).ok())
            .unwrap_or(0),
        name,
        sex_age: v
            .get("sex_age")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string(),
        starts: v.get("starts").and_then(as_u32_any).unwrap_or(0),
        wins: v.get("wins").and_then(as_u32_any).unwrap_or(0),
        places: v.get("places").and_then(as_u32_any).unwrap_or(0),
        earnings: v.get("earnings").and_then(as_f64_any).unwrap_or(0.0),
        rd: v.get("rd").and_then(as_f64_any).unwrap_or(0.0),
        re: v.get("re").and_then(as_f64_any).unwrap_or(0.0),
    };
    let history = v
        .get("history")
        .and_then(|x| x.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|p| parse_performance(p, race_discipline))
                .collect()
        })
        .unwrap_or_default();
    Some(SnapshotHorse { entry, history })
}

/// A run without a readable date cannot be placed in the history and is dropped.
fn parse_performance(v: &Value, fallback: Discipline) -> Option<PerformanceRecord> {
    let date = v.get("date").and_then(|x| x.as_str()).and_then(parse_date)?;
    Some(PerformanceRecord {
        date,
        place: v.get("place").map(parse_place).unwrap_or(0),
        category: v
            .get("category")
            .and_then(as_u64_any)
            .and_then(|n| u8::try_from(n).ok())
            .filter(|c| *c >= 1)
            .unwrap_or(UNCLASSIFIED_CATEGORY),
        discipline: v
            .get("discipline")
            .and_then(|x| x.as_str())
            .and_then(Discipline::from_label)
            .unwrap_or(fallback),
        allocation: v
            .get("allocation")
            .and_then(as_f64_any)
            .filter(|a| *a > 0.0)
            .map(|a| a as u64)
            .unwrap_or(0),
        field_size: v
            .get("field_size")
            .and_then(as_u64_any)
            .and_then(|n| u16::try_from(n).ok())
            .unwrap_or(0),
    })
}

/// Finishing place from a number or provider text; anything non-numeric ("DA", "T", "Ret")
/// is unplaced.
pub fn parse_place(v: &Value) -> u8 {
    as_u64_any(v)
        .and_then(|n| u8::try_from(n).ok())
        .unwrap_or(0)
}

fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

fn as_u32_any(v: &Value) -> Option<u32> {
    let n = as_u64_any(v)?;
    u32::try_from(n).ok()
}

fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().replace(',', ".").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn place_accepts_numbers_and_text() {
        assert_eq!(parse_place(&json!(3)), 3);
        assert_eq!(parse_place(&json!("7")), 7);
        assert_eq!(parse_place(&json!("DA")), 0);
        assert_eq!(parse_place(&json!("")), 0);
        assert_eq!(parse_place(&json!(null)), 0);
        assert_eq!(parse_place(&json!(-2)), 0);
    }

    #[test]
    fn performance_sentinels_for_missing_fields() {
        let perf = parse_performance(&json!({"date": "2024-05-01"}), Discipline::Flat)
            .expect("dated run should parse");
        assert_eq!(perf.place, 0);
        assert_eq!(perf.allocation, 0);
        assert_eq!(perf.category, UNCLASSIFIED_CATEGORY);
        assert_eq!(perf.discipline, Discipline::Flat);
        assert!(parse_performance(&json!({"place": 1}), Discipline::Flat).is_none());
    }

    #[test]
    fn history_filtered_by_grouping_and_cutoff() {
        let raw = r#"{
            "date": "2024-06-15",
            "races": [{
                "program": "R1", "race_number": 2, "discipline": "plat", "field_size": 1,
                "horses": [{
                    "post": 1, "name": "Belle Epoque", "sex_age": "F4",
                    "history": [
                        {"date": "2023-03-01", "place": 1, "discipline": "haies"},
                        {"date": "2024-05-01", "place": 2, "discipline": "plat"},
                        {"date": "2024-04-01", "place": 4, "discipline": "attele"},
                        {"date": "2021-12-31", "place": 1, "discipline": "plat"},
                        {"date": "2022-01-01", "place": 5, "discipline": "plat"}
                    ]
                }]
            }]
        }"#;
        let snapshot = parse_snapshot_json(raw).expect("snapshot should parse");
        let cutoff = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let history = snapshot
            .fetch_history("belle epoque", DisciplineFamily::GallopFlat, cutoff)
            .unwrap();
        // the run dated on the cutoff itself is not after it
        let places: Vec<u8> = history.iter().map(|p| p.place).collect();
        assert_eq!(places, vec![2, 1]);
    }
}

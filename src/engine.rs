//! Race-day orchestration.
//!
//! For every race the engine fetches the field and each horse's history from the collaborators,
//! builds the history profiles, evaluates the indices, ranks the field and derives the race
//! difficulty. Races share nothing, so a day is computed on a rayon pool; results are then
//! handed to the sink one race at a time.

use anyhow::Result as AnyResult;
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::difficulty::race_difficulty;
use crate::error::{EngineError, Result};
use crate::indices::{HorseScores, IndexCalculator};
use crate::model::{
    DisciplineFamily, HorseEntry, HorseIndices, PerformanceRecord, Race, RaceKey, RaceResult,
};
use crate::profile::{HistoryProfileBuilder, HorseHistoryProfile};
use crate::race_ranker::{HorseRanks, RaceRanker, RankEntry};

/// Supplies a race's field, ascending by post number.
pub trait FieldSource {
    fn fetch_field(&self, race: &RaceKey) -> AnyResult<Vec<HorseEntry>>;
}

/// Supplies a horse's history, most recent first, restricted to the trot or gallop grouping
/// of `family` and to runs after `cutoff`.
pub trait HistorySource {
    fn fetch_history(
        &self,
        horse: &str,
        family: DisciplineFamily,
        cutoff: NaiveDate,
    ) -> AnyResult<Vec<PerformanceRecord>>;
}

/// Receives one fully computed race: the horses' output blocks plus the difficulty.
pub trait ResultSink {
    fn persist(&mut self, result: &RaceResult) -> AnyResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct DaySummary {
    pub races_total: usize,
    pub races_computed: usize,
    pub horses_computed: usize,
    pub errors: Vec<String>,
}

/// Earliest run date worth fetching: January 1st of the computation year, moved back one
/// year per year of age past two.
pub fn history_cutoff(computation_date: NaiveDate, age: u32) -> NaiveDate {
    let years_back = age.saturating_sub(2) as i32;
    NaiveDate::from_ymd_opt(computation_date.year() - years_back, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub struct Engine {
    computation_date: NaiveDate,
    pool: Option<rayon::ThreadPool>,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallelism)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(err) => {
                warn!(
                    threads = config.parallelism,
                    "race pool unavailable, using global pool: {err}"
                );
                None
            }
        };
        Self {
            computation_date: config.computation_date,
            pool,
        }
    }

    /// Engine without a dedicated pool; parallel work runs on rayon's global pool.
    pub fn for_date(computation_date: NaiveDate) -> Self {
        Self {
            computation_date,
            pool: None,
        }
    }

    /// Compute every race, then persist the successful ones in race-key order.
    ///
    /// A failing race is logged and recorded in the summary; the others still go through.
    pub fn run_day<S, K>(&self, source: &S, races: &[Race], sink: &mut K) -> DaySummary
    where
        S: FieldSource + HistorySource + Sync,
        K: ResultSink,
    {
        info!(
            date = %self.computation_date,
            races = races.len(),
            "computing race day"
        );

        let mut outcomes: Vec<Result<RaceResult>> = self.with_pool(|| {
            races
                .par_iter()
                .map(|race| self.compute_race(source, race))
                .collect()
        });
        outcomes.sort_by(|a, b| outcome_key(a).cmp(outcome_key(b)));

        let mut summary = DaySummary {
            races_total: races.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            let persisted = outcome.and_then(|result| {
                if result.horses.is_empty() {
                    debug!(race = %result.key, "empty field, nothing to persist");
                    return Ok(0);
                }
                sink.persist(&result)
                    .map_err(|err| EngineError::sink_failed(&result.key, err))?;
                Ok(result.horses.len())
            });
            match persisted {
                Ok(horses) => {
                    summary.races_computed += 1;
                    summary.horses_computed += horses;
                }
                Err(err) => {
                    warn!(race = %err.race(), "race skipped: {err}");
                    summary.errors.push(err.to_string());
                }
            }
        }

        info!(
            computed = summary.races_computed,
            failed = summary.errors.len(),
            horses = summary.horses_computed,
            "race day complete"
        );
        summary
    }

    /// Fetch one race's inputs and compute it.
    pub fn compute_race<S>(&self, source: &S, race: &Race) -> Result<RaceResult>
    where
        S: FieldSource + HistorySource,
    {
        let field = source
            .fetch_field(&race.key)
            .map_err(|err| EngineError::source_failed(&race.key, err))?;

        let family = race.family();
        let histories = field
            .iter()
            .map(|horse| {
                let cutoff = history_cutoff(self.computation_date, horse.age());
                source
                    .fetch_history(&horse.name, family, cutoff)
                    .map_err(|err| {
                        EngineError::source_failed(
                            &race.key,
                            err.context(format!("history of {}", horse.name)),
                        )
                    })
            })
            .collect::<Result<Vec<Vec<PerformanceRecord>>>>()?;

        self.compute_field(race, &field, &histories)
    }

    /// Compute a race from already resolved inputs. `histories[i]` belongs to `field[i]`.
    pub fn compute_field(
        &self,
        race: &Race,
        field: &[HorseEntry],
        histories: &[Vec<PerformanceRecord>],
    ) -> Result<RaceResult> {
        if race.field_size != field.len() || histories.len() != field.len() {
            return Err(EngineError::FieldSizeMismatch {
                race: race.key.clone(),
                declared: race.field_size,
                supplied: field.len(),
            });
        }

        let builder = HistoryProfileBuilder::new(self.computation_date);
        let calculator = IndexCalculator::new(self.computation_date, race.family());

        let profiles: Vec<HorseHistoryProfile> =
            histories.iter().map(|history| builder.build(history)).collect();
        let scores: Vec<HorseScores> = field
            .iter()
            .zip(histories)
            .zip(&profiles)
            .map(|((entry, history), profile)| calculator.compute(entry, history, profile))
            .collect();

        let entries: Vec<RankEntry> = field
            .iter()
            .zip(&scores)
            .zip(&profiles)
            .map(|((entry, scores), profile)| RankEntry {
                post: entry.post,
                scores,
                profile,
            })
            .collect();
        let ranker = RaceRanker::new(&entries);
        let ranks = ranker.rank();

        let mn_points: Vec<u32> = scores.iter().map(|s| s.pts_mn).collect();
        let difficulty = race_difficulty(&mn_points, race.field_size);

        let horses = ranker
            .post_order()
            .iter()
            .map(|handle| {
                let slot = handle.slot;
                indices_for(&field[slot], &scores[slot], &profiles[slot], &ranks[slot])
            })
            .collect();

        debug!(race = %race.key, field = field.len(), difficulty, "race computed");

        Ok(RaceResult {
            key: race.key.clone(),
            difficulty,
            horses,
        })
    }

    fn with_pool<T: Send>(&self, action: impl FnOnce() -> T + Send) -> T {
        if let Some(pool) = self.pool.as_ref() {
            pool.install(action)
        } else {
            action()
        }
    }
}

fn outcome_key(outcome: &Result<RaceResult>) -> &RaceKey {
    match outcome {
        Ok(result) => &result.key,
        Err(err) => err.race(),
    }
}

fn indices_for(
    entry: &HorseEntry,
    scores: &HorseScores,
    profile: &HorseHistoryProfile,
    ranks: &HorseRanks,
) -> HorseIndices {
    HorseIndices {
        post: entry.post,
        name: entry.name.clone(),
        coef_reussite: scores.coef_reussite,
        coef_reussite_rank: ranks.coef_reussite,
        ind_for: scores.ind_for,
        ind_for_rank: ranks.ind_for,
        pts_idc: scores.pts_idc,
        pts_idc_rank: ranks.pts_idc,
        pts_cfp: scores.pts_cfp,
        pts_cfp_rank: ranks.pts_cfp,
        pts_cx: scores.pts_cx,
        pts_cx_rank: ranks.pts_cx,
        pts_or: scores.pts_or,
        pts_or_rank: ranks.pts_or,
        pts_mn: scores.pts_mn,
        pts_mn_rank: ranks.pts_mn,
        rx: scores.rx,
        cje: scores.cje,
        hmp: profile.hmp_score.round() as i64,
        hmp_rank: ranks.hmp,
        best_allocation_rank: ranks.best_allocation,
        best_category_rank: ranks.best_category,
        mx: profile.trend_indicator.round() as i64,
        nb_bloc: profile.two_best_places.clone(),
        music_recent: profile.music_recent.to_string(),
        music_full: profile.music_full.to_string(),
    }
}

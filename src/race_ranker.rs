//! Race-local ranks and classements.
//!
//! Rankings never move the horses themselves: every pass sorts lightweight [`Handle`]s that
//! point into the per-race arena of scores and profiles and carry the post number. Ranks are
//! written back by slot, so the caller's horse order is never disturbed.

use crate::indices::HorseScores;
use crate::model::place_key;
use crate::profile::HorseHistoryProfile;
use crate::rank::{SortDirection, StackedStableSort, assign_ranks};

/// One horse as seen by the ranker.
#[derive(Debug, Clone, Copy)]
pub struct RankEntry<'a> {
    pub post: u16,
    pub scores: &'a HorseScores,
    pub profile: &'a HorseHistoryProfile,
}

/// Position of a horse in the arena, tagged with its post number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    pub slot: usize,
    pub post: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HorseRanks {
    pub coef_reussite: u32,
    pub ind_for: u32,
    pub pts_idc: u32,
    pub pts_cfp: u32,
    pub pts_cx: u32,
    pub pts_or: u32,
    pub pts_mn: u32,
    pub hmp: u32,
    pub best_allocation: u32,
    pub best_category: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classement {
    Hmp,
    BestAllocation,
    BestCategory,
}

/// Post-number order with missing (zero) post numbers last. Stable for equal posts.
pub fn restore_post_order(handles: &mut [Handle]) {
    handles.sort_by_key(|h| (h.post == 0, h.post));
}

pub struct RaceRanker<'a> {
    entries: &'a [RankEntry<'a>],
    base: Vec<Handle>,
}

impl<'a> RaceRanker<'a> {
    pub fn new(entries: &'a [RankEntry<'a>]) -> Self {
        let mut base: Vec<Handle> = entries
            .iter()
            .enumerate()
            .map(|(slot, e)| Handle { slot, post: e.post })
            .collect();
        restore_post_order(&mut base);
        Self { entries, base }
    }

    /// Handles in post-number order, the default tie-break for every ranking.
    pub fn post_order(&self) -> &[Handle] {
        &self.base
    }

    /// Ranks for every horse, indexed like the entries slice.
    pub fn rank(&self) -> Vec<HorseRanks> {
        use SortDirection::{Ascending, Descending};

        let coef_reussite = self.rank_by_score(|s| s.coef_reussite, Descending);
        let ind_for = self.rank_by_score(|s| s.ind_for, Ascending);
        let pts_idc = self.rank_by_score(|s| s.pts_idc, Descending);
        let pts_cfp = self.rank_by_score(|s| s.pts_cfp, Descending);
        let pts_cx = self.rank_by_score(|s| s.pts_cx, Ascending);
        let pts_or = self.rank_by_score(|s| s.pts_or, Descending);
        let pts_mn = self.rank_by_score(|s| f64::from(s.pts_mn), Descending);
        let hmp = self.by_slot(self.classement(Classement::Hmp));
        let best_allocation = self.by_slot(self.classement(Classement::BestAllocation));
        let best_category = self.by_slot(self.classement(Classement::BestCategory));

        (0..self.entries.len())
            .map(|slot| HorseRanks {
                coef_reussite: coef_reussite[slot],
                ind_for: ind_for[slot],
                pts_idc: pts_idc[slot],
                pts_cfp: pts_cfp[slot],
                pts_cx: pts_cx[slot],
                pts_or: pts_or[slot],
                pts_mn: pts_mn[slot],
                hmp: hmp[slot],
                best_allocation: best_allocation[slot],
                best_category: best_category[slot],
            })
            .collect()
    }

    fn by_slot(&self, pairs: Vec<(usize, u32)>) -> Vec<u32> {
        let mut out = vec![0; self.entries.len()];
        for (slot, rank) in pairs {
            out[slot] = rank;
        }
        out
    }

    fn rank_by_score(&self, score: fn(&HorseScores) -> f64, direction: SortDirection) -> Vec<u32> {
        let entries = self.entries;
        let mut handles = self.base.clone();
        StackedStableSort::new()
            .then_by_f64(move |h: &Handle| score(entries[h.slot].scores), direction)
            .sort(&mut handles);
        let ranks = assign_ranks(&handles, |h| score(entries[h.slot].scores));
        self.by_slot(handles.iter().map(|h| h.slot).zip(ranks).collect())
    }

    /// Handles sorted for a classement, best first.
    pub fn classement_order(&self, classement: Classement) -> Vec<Handle> {
        let entries = self.entries;
        let mut handles = self.base.clone();
        let sorter = match classement {
            Classement::Hmp => StackedStableSort::new().then_by_f64(
                move |h: &Handle| entries[h.slot].profile.hmp_score,
                SortDirection::Descending,
            ),
            Classement::BestAllocation => StackedStableSort::new()
                .then_by_key(
                    move |h: &Handle| entries[h.slot].profile.best_allocation.amount,
                    SortDirection::Descending,
                )
                .then_by_key(
                    move |h: &Handle| place_key(entries[h.slot].profile.best_allocation.place),
                    SortDirection::Ascending,
                ),
            Classement::BestCategory => StackedStableSort::new()
                .then_by_key(
                    move |h: &Handle| entries[h.slot].profile.best_top5.category,
                    SortDirection::Ascending,
                )
                .then_by_key(
                    move |h: &Handle| place_key(entries[h.slot].profile.best_top5.place),
                    SortDirection::Ascending,
                )
                .then_by_key(
                    move |h: &Handle| entries[h.slot].profile.best_top5.allocation,
                    SortDirection::Descending,
                ),
        };
        sorter.sort(&mut handles);
        handles
    }

    /// `(slot, rank)` pairs for a classement. Rows with identical keys share a rank.
    pub fn classement(&self, classement: Classement) -> Vec<(usize, u32)> {
        let entries = self.entries;
        let handles = self.classement_order(classement);
        let ranks = match classement {
            Classement::Hmp => assign_ranks(&handles, |h| entries[h.slot].profile.hmp_score),
            Classement::BestAllocation => assign_ranks(&handles, |h| {
                let best = entries[h.slot].profile.best_allocation;
                (best.amount, place_key(best.place))
            }),
            Classement::BestCategory => assign_ranks(&handles, |h| {
                let best = entries[h.slot].profile.best_top5;
                (best.allocation, best.category, place_key(best.place))
            }),
        };
        handles.iter().map(|h| h.slot).zip(ranks).collect()
    }
}

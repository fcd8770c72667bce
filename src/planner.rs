//! Constraint negotiation for time pushdown.
//!
//! The host engine describes the predicates of a candidate query plan as a
//! list of (column, operator) pairs and asks [`plan`] what the adapter can
//! do with them. The planner honors at most one constraint: the first plain
//! comparison on the time column. Everything else (other columns, other
//! operators, the second bound of a closed range) stays a host-side
//! residual filter, so pushdown can only ever reduce I/O, never the row set
//! the host observes after its own filtering.
//!
//! The chosen constraint travels back to the host as an explicit
//! [`Constraint`] value inside the returned [`ScanPlan`]; the host threads
//! it, together with the literal bound of the matched predicate, into
//! [`ScanCursor::start`](crate::cursor::ScanCursor::start). There is no
//! shared negotiation state between `plan` and the cursor.
//!
//! Costs are tiers, not statistics: an equality bound touches one
//! timestep's worth of files regardless of history length, a range bound
//! touches an unknown-sized slice of the timeline, and no usable bound
//! means the full grid-size × iteration-count worst case, represented by a
//! fixed sentinel.

use crate::relation::Column;

/// Comparison operators the scan layer can evaluate against a file's
/// timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// `time = bound`
    Eq,
    /// `time > bound`
    Gt,
    /// `time >= bound`
    Ge,
    /// `time < bound`
    Lt,
    /// `time <= bound`
    Le,
}

/// Operator attached to a candidate constraint by the host engine.
///
/// Only the plain comparisons are eligible for pushdown; the remaining
/// variants are operators hosts commonly offer that this adapter can never
/// evaluate against a filename, so they always stay residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOp {
    /// Equality; usable.
    Eq,
    /// Strictly greater; usable.
    Gt,
    /// Greater or equal; usable.
    Ge,
    /// Strictly less; usable.
    Lt,
    /// Less or equal; usable.
    Le,
    /// Inequality; not usable (rejecting one timestep still requires
    /// visiting every other file).
    Ne,
    /// Substring match; not usable.
    Match,
    /// SQL `LIKE`; not usable.
    Like,
    /// Glob match; not usable.
    Glob,
}

impl CandidateOp {
    /// The pushdown operator for this candidate, if it is usable.
    pub fn pushdown_op(self) -> Option<ConstraintOp> {
        match self {
            CandidateOp::Eq => Some(ConstraintOp::Eq),
            CandidateOp::Gt => Some(ConstraintOp::Gt),
            CandidateOp::Ge => Some(ConstraintOp::Ge),
            CandidateOp::Lt => Some(ConstraintOp::Lt),
            CandidateOp::Le => Some(ConstraintOp::Le),
            CandidateOp::Ne | CandidateOp::Match | CandidateOp::Like | CandidateOp::Glob => None,
        }
    }
}

/// One predicate the host engine offers for pushdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintCandidate {
    /// Column the predicate compares.
    pub column: Column,
    /// Operator of the predicate.
    pub op: CandidateOp,
}

/// The constraint the planner chose to honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    /// Index of the winning candidate in the `plan` input, so the host
    /// knows which predicate's literal to supply as the bound at `start`.
    pub candidate: usize,
    /// The comparison the scan will apply to each file's timestep.
    pub op: ConstraintOp,
}

/// Outcome of constraint negotiation: the honored constraint, if any, and
/// the estimated cost of the resulting scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPlan {
    /// The constraint the scan will apply, or `None` for a full scan.
    pub constraint: Option<Constraint>,
    /// Estimated scan cost; one of the three tier constants.
    pub cost: f64,
}

/// Cost of scanning a single timestep's worth of files (an equality bound).
pub const TIMESTEP_SCAN_COST: f64 = 10_000.0;

/// Cost of scanning a bounded but unknown-sized slice of the timeline (any
/// range bound).
pub const RANGE_SCAN_COST: f64 = 1_000_000.0;

/// Sentinel cost of scanning the entire history: the grid-size ×
/// iteration-count worst case, as a fixed constant rather than a measured
/// statistic.
pub const FULL_SCAN_COST: f64 = 1_000_000_000.0;

/// Selects the first usable constraint from `candidates` and prices it.
///
/// A candidate is usable iff it compares the time column with one of the
/// plain comparison operators. If two time bounds are present (a closed
/// range), only the first is honored and the second is left to the host's
/// residual filtering; pushdown is a pure optimization and must never cost
/// correctness. With no usable candidate the plan is a full scan at
/// [`FULL_SCAN_COST`].
///
/// Purely functional over its input; hosts call it as often as they like
/// while exploring plans.
pub fn plan(candidates: &[ConstraintCandidate]) -> ScanPlan {
    for (idx, candidate) in candidates.iter().enumerate() {
        if candidate.column != Column::Time {
            continue;
        }
        let Some(op) = candidate.op.pushdown_op() else {
            continue;
        };
        let cost = match op {
            ConstraintOp::Eq => TIMESTEP_SCAN_COST,
            ConstraintOp::Gt | ConstraintOp::Ge | ConstraintOp::Lt | ConstraintOp::Le => {
                RANGE_SCAN_COST
            }
        };
        return ScanPlan {
            constraint: Some(Constraint {
                candidate: idx,
                op,
            }),
            cost,
        };
    }

    ScanPlan {
        constraint: None,
        cost: FULL_SCAN_COST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(column: Column, op: CandidateOp) -> ConstraintCandidate {
        ConstraintCandidate { column, op }
    }

    #[test]
    fn empty_plan_is_a_full_scan() {
        let p = plan(&[]);
        assert_eq!(p.constraint, None);
        assert_eq!(p.cost, FULL_SCAN_COST);
    }

    #[test]
    fn equality_on_time_is_cheapest() {
        let p = plan(&[cand(Column::Time, CandidateOp::Eq)]);
        assert_eq!(
            p.constraint,
            Some(Constraint {
                candidate: 0,
                op: ConstraintOp::Eq
            })
        );
        assert_eq!(p.cost, TIMESTEP_SCAN_COST);
    }

    #[test]
    fn range_on_time_costs_more_than_equality() {
        for op in [
            CandidateOp::Gt,
            CandidateOp::Ge,
            CandidateOp::Lt,
            CandidateOp::Le,
        ] {
            let p = plan(&[cand(Column::Time, op)]);
            assert!(p.constraint.is_some(), "{op:?} should be usable");
            assert_eq!(p.cost, RANGE_SCAN_COST);
        }
        assert!(TIMESTEP_SCAN_COST < RANGE_SCAN_COST);
        assert!(RANGE_SCAN_COST < FULL_SCAN_COST);
    }

    #[test]
    fn non_time_columns_are_never_pushed_down() {
        let p = plan(&[
            cand(Column::Heat, CandidateOp::Gt),
            cand(Column::Partition, CandidateOp::Eq),
            cand(Column::I, CandidateOp::Eq),
        ]);
        assert_eq!(p.constraint, None);
        assert_eq!(p.cost, FULL_SCAN_COST);
    }

    #[test]
    fn unusable_operators_on_time_are_skipped() {
        for op in [
            CandidateOp::Ne,
            CandidateOp::Match,
            CandidateOp::Like,
            CandidateOp::Glob,
        ] {
            let p = plan(&[cand(Column::Time, op)]);
            assert_eq!(p.constraint, None, "{op:?} should not be usable");
            assert_eq!(p.cost, FULL_SCAN_COST);
        }
    }

    #[test]
    fn first_usable_candidate_wins() {
        // An unusable time candidate and a non-time candidate come first;
        // the usable time range at index 2 must be the one chosen.
        let p = plan(&[
            cand(Column::Time, CandidateOp::Match),
            cand(Column::Heat, CandidateOp::Lt),
            cand(Column::Time, CandidateOp::Ge),
            cand(Column::Time, CandidateOp::Eq),
        ]);
        assert_eq!(
            p.constraint,
            Some(Constraint {
                candidate: 2,
                op: ConstraintOp::Ge
            })
        );
        assert_eq!(p.cost, RANGE_SCAN_COST);
    }

    #[test]
    fn closed_range_honors_only_the_first_bound() {
        // time >= a AND time <= b: the second bound stays residual.
        let p = plan(&[
            cand(Column::Time, CandidateOp::Ge),
            cand(Column::Time, CandidateOp::Le),
        ]);
        assert_eq!(
            p.constraint,
            Some(Constraint {
                candidate: 0,
                op: ConstraintOp::Ge
            })
        );
    }
}

//! Read-only table adapter over flat solver output directories.
//!
//! Parallel heat-diffusion solvers write one plain-text file per
//! (partition, timestep) pair, named `output.<partition>.<time>`, each line
//! holding one `i j heat` grid cell. This crate exposes such a directory to
//! a host query engine as a five-column relation
//! (`i, j, heat, partition, time`) without ever materializing the data set:
//!
//! - [`relation`] — registration: schema declaration through the
//!   [`SchemaHost`] seam and fail-fast directory validation.
//! - [`planner`] — constraint negotiation, so a time predicate lets the
//!   scan skip whole files instead of reading them.
//! - [`cursor`] — the lazy directory → file → row scan cursor.
//! - [`codec`] — filename and line decoding with skip-friendly failure
//!   modes.
//!
//! The host drives the protocol: [`Relation::register`] once, then any
//! number of [`ScanCursor::open`]s against the relation; per cursor,
//! [`plan`] as often as it likes, then [`ScanCursor::start`] with the
//! chosen constraint and literal bound, then stream rows until exhausted.
//! Predicates the adapter does not consume remain host-side residual
//! filters, so pushdown only ever reduces I/O, never the row set the host
//! observes after its own filtering.
#![deny(missing_docs)]

pub mod codec;
pub mod cursor;
pub mod planner;
pub mod relation;

pub use cursor::{Row, Rows, ScanCursor, ScanError, TimePredicate, Value};
pub use planner::{
    plan, CandidateOp, Constraint, ConstraintCandidate, ConstraintOp, ScanPlan, FULL_SCAN_COST,
    RANGE_SCAN_COST, TIMESTEP_SCAN_COST,
};
pub use relation::{
    Column, ColumnDef, ColumnType, RegisterError, Relation, SchemaHost, SchemaRejection, SCHEMA,
};

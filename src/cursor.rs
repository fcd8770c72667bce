//! The scan cursor: a two-level lazy iterator over an output directory.
//!
//! A [`ScanCursor`] follows the host protocol `open -> start ->
//! (is_exhausted / read_column / advance)* -> close`. `start` stores the
//! pushed-down time predicate, opens the directory stream, and positions
//! the cursor on the first qualifying row (or exhaustion), so the host can
//! rely on `is_exhausted` before its first read.
//!
//! Each advance consumes either one line of the open file or one directory
//! entry, so a finite directory always drives the cursor to exhaustion.
//! Files whose name does not decode are skipped at the directory level
//! without being opened; when the predicate rejects a decoded timestep the
//! file is likewise never opened, which is the entire payoff of pushdown.
//! A line that fails to parse abandons the remainder of its file rather
//! than wedging the cursor on a position it cannot leave.

use std::fs::{File, ReadDir};
use std::io::{BufRead, BufReader};

use log::{debug, warn};
use snafu::prelude::*;

use crate::codec::{self, FileKey};
use crate::planner::ConstraintOp;
use crate::relation::{Column, Relation};

/// A pushed-down bound on the time column.
///
/// Built by the host from the [`Constraint`](crate::planner::Constraint)
/// returned by [`plan`](crate::planner::plan) and the literal value of the
/// matched predicate, then threaded into [`ScanCursor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePredicate {
    /// Comparison to apply to each file's timestep.
    pub op: ConstraintOp,
    /// Literal bound from the host's predicate.
    pub bound: i64,
}

impl TimePredicate {
    /// True when a file written at timestep `time` can contain matching
    /// rows.
    pub fn admits(self, time: i64) -> bool {
        match self.op {
            ConstraintOp::Eq => time == self.bound,
            ConstraintOp::Gt => time > self.bound,
            ConstraintOp::Ge => time >= self.bound,
            ConstraintOp::Lt => time < self.bound,
            ConstraintOp::Le => time <= self.bound,
        }
    }
}

/// One materialized output row.
///
/// `i`, `j`, and `heat` come from a parsed line; `partition` and `time`
/// come from the containing filename. Rows are plain values: each advance
/// produces a fresh one and never mutates its predecessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    /// Grid row index.
    pub i: i64,
    /// Grid column index.
    pub j: i64,
    /// Heat value at the cell; finite by construction.
    pub heat: f64,
    /// Partition (process rank) that wrote the containing file.
    pub partition: i64,
    /// Timestep of the containing file.
    pub time: i64,
}

impl Row {
    fn column(self, column: Column) -> Value {
        match column {
            Column::I => Value::Int(self.i),
            Column::J => Value::Int(self.j),
            Column::Heat => Value::Float(self.heat),
            Column::Partition => Value::Int(self.partition),
            Column::Time => Value::Int(self.time),
        }
    }
}

/// A single column value produced by [`ScanCursor::read_column`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// An integer column (`i`, `j`, `partition`, `time`).
    Int(i64),
    /// A float column (`heat`).
    Float(f64),
}

/// Errors from cursor protocol calls.
///
/// These are all fatal at the specific call; the caller must not retry the
/// same state. Malformed files and rows are deliberately absent here: they
/// are skipped, not raised (see the module docs).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ScanError {
    /// The relation's directory disappeared or became unreadable between
    /// registration and `start`.
    #[snafu(display("Cannot open output directory {}: {source}", path.display()))]
    OpenDirectory {
        /// Directory that failed to open.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A protocol call arrived in a state that does not allow it, such as
    /// `start` twice or `advance` before `start` or past exhaustion.
    #[snafu(display("Cursor cannot {operation} while {state}"))]
    Protocol {
        /// The offending call.
        operation: &'static str,
        /// State the cursor was in.
        state: &'static str,
    },

    /// `read_column` was called while the cursor holds no row.
    #[snafu(display("Cursor has no current row"))]
    NoCurrentRow,
}

/// Live file stream within a scan, tagged so the state machine is
/// exhaustively checkable instead of resting on sentinel nulls.
enum FileState {
    NoFile,
    Open {
        key: FileKey,
        reader: BufReader<File>,
    },
}

/// Cursor lifecycle. The terminal CLOSED state is the cursor value having
/// been consumed or dropped, so it needs no variant.
enum CursorState {
    Opened,
    Scanning { dir: ReadDir, file: FileState },
    Exhausted,
}

impl CursorState {
    fn name(&self) -> &'static str {
        match self {
            CursorState::Opened => "opened",
            CursorState::Scanning { .. } => "scanning",
            CursorState::Exhausted => "exhausted",
        }
    }
}

/// A single, independently owned iteration over a [`Relation`]'s rows.
///
/// Any number of cursors may be open against one relation at a time; each
/// owns its own directory and file streams and shares nothing mutable.
pub struct ScanCursor<'rel> {
    relation: &'rel Relation,
    predicate: Option<TimePredicate>,
    state: CursorState,
    current: Option<Row>,
}

impl<'rel> ScanCursor<'rel> {
    /// Opens a cursor against `relation`. Performs no I/O; the directory
    /// stream is only opened by [`start`](Self::start).
    pub fn open(relation: &'rel Relation) -> ScanCursor<'rel> {
        ScanCursor {
            relation,
            predicate: None,
            state: CursorState::Opened,
            current: None,
        }
    }

    /// Starts the scan with an optional pushed-down time predicate.
    ///
    /// Opens the directory stream and immediately advances to the first
    /// qualifying row, so a cursor never rests on a non-qualifying
    /// position: after `start`, either `is_exhausted` is true or the
    /// current row satisfies the predicate. Callable exactly once, from the
    /// opened state.
    pub fn start(&mut self, predicate: Option<TimePredicate>) -> Result<(), ScanError> {
        if !matches!(self.state, CursorState::Opened) {
            return ProtocolSnafu {
                operation: "start",
                state: self.state.name(),
            }
            .fail();
        }
        let dir = std::fs::read_dir(self.relation.path()).context(OpenDirectorySnafu {
            path: self.relation.path(),
        })?;
        self.predicate = predicate;
        self.state = CursorState::Scanning {
            dir,
            file: FileState::NoFile,
        };
        self.step();
        Ok(())
    }

    /// Moves to the next qualifying row, or to exhaustion.
    ///
    /// Callable only while scanning and not exhausted; the host is expected
    /// to consult [`is_exhausted`](Self::is_exhausted) first.
    pub fn advance(&mut self) -> Result<(), ScanError> {
        if !matches!(self.state, CursorState::Scanning { .. }) {
            return ProtocolSnafu {
                operation: "advance",
                state: self.state.name(),
            }
            .fail();
        }
        self.step();
        Ok(())
    }

    /// True once the scan has run out of qualifying rows.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, CursorState::Exhausted)
    }

    /// Reads one column of the current row.
    pub fn read_column(&self, column: Column) -> Result<Value, ScanError> {
        self.current
            .map(|row| row.column(column))
            .ok_or(ScanError::NoCurrentRow)
    }

    /// The current row, if the cursor is positioned on one.
    pub fn current_row(&self) -> Option<Row> {
        self.current
    }

    /// Closes the cursor, releasing whatever directory or file streams it
    /// holds (zero, one, or two). Consuming `self` makes a second close
    /// unrepresentable; dropping the cursor has the same effect.
    pub fn close(self) {}

    /// Consumes the cursor and iterates over its remaining rows.
    ///
    /// Intended for hosts that drove `start` themselves and want plain
    /// `Iterator` ergonomics for the streaming phase. A cursor that was
    /// never started yields nothing.
    pub fn rows(self) -> Rows<'rel> {
        Rows { cursor: self }
    }

    /// The inner pull loop: repeats until a row is produced or the
    /// directory is exhausted. Every iteration consumes either one line or
    /// one directory entry, so the loop terminates on any finite
    /// directory.
    fn step(&mut self) {
        let predicate = self.predicate;
        let CursorState::Scanning { dir, file } = &mut self.state else {
            return;
        };

        let next = loop {
            match file {
                FileState::Open { key, reader } => {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        // End of file: move on to the next directory entry.
                        Ok(0) => *file = FileState::NoFile,
                        Ok(_) => match codec::decode_line(&line) {
                            Some(cell) => {
                                break Some(Row {
                                    i: cell.i,
                                    j: cell.j,
                                    heat: cell.heat,
                                    partition: key.partition,
                                    time: key.time,
                                });
                            }
                            // Unparsable line: abandon the rest of the file
                            // so the cursor cannot wedge on this position.
                            None => {
                                warn!(
                                    "unparsable line in output file (partition {}, time {}); \
                                     skipping rest of file",
                                    key.partition, key.time
                                );
                                *file = FileState::NoFile;
                            }
                        },
                        Err(err) => {
                            warn!(
                                "read error in output file (partition {}, time {}): {err}; \
                                 skipping rest of file",
                                key.partition, key.time
                            );
                            *file = FileState::NoFile;
                        }
                    }
                }
                FileState::NoFile => {
                    let Some(entry) = dir.next() else {
                        break None;
                    };
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(err) => {
                            warn!("unreadable directory entry: {err}; skipping");
                            continue;
                        }
                    };
                    let name = entry.file_name();
                    let Some(key) = name.to_str().and_then(codec::decode_filename) else {
                        // Foreign file; not ours to report on.
                        continue;
                    };
                    if let Some(predicate) = predicate {
                        if !predicate.admits(key.time) {
                            debug!(
                                "pruned output file (partition {}, time {})",
                                key.partition, key.time
                            );
                            continue;
                        }
                    }
                    match File::open(entry.path()) {
                        Ok(f) => {
                            *file = FileState::Open {
                                key,
                                reader: BufReader::new(f),
                            }
                        }
                        Err(err) => {
                            warn!("cannot open {}: {err}; skipping", entry.path().display());
                        }
                    }
                }
            }
        };

        match next {
            Some(row) => self.current = Some(row),
            None => {
                self.current = None;
                self.state = CursorState::Exhausted;
            }
        }
    }
}

/// Iterator over the remaining rows of a started [`ScanCursor`].
pub struct Rows<'rel> {
    cursor: ScanCursor<'rel>,
}

impl Iterator for Rows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.cursor.is_exhausted() {
            return None;
        }
        let row = self.cursor.current?;
        // advance only errors on protocol misuse, which the exhaustion
        // check above rules out.
        let _ = self.cursor.advance();
        Some(row)
    }
}

//! Table registration: schema declaration and output-directory validation.
//!
//! A [`Relation`] is the registered, immutable handle to one directory of
//! solver output files. Registration validates the directory up front (fail
//! fast, not at first scan) and declares the fixed five-column schema to the
//! host engine through the [`SchemaHost`] seam. After registration the
//! relation is read-only, so any number of cursors may borrow it
//! concurrently without synchronization, and the borrow checker guarantees
//! it outlives every cursor opened against it.

use std::fs;
use std::path::{Path, PathBuf};

use snafu::prelude::*;

/// Columns of the output table, in declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Grid row index, parsed from each line.
    I,
    /// Grid column index, parsed from each line.
    J,
    /// Heat value at the cell, parsed from each line.
    Heat,
    /// Solver partition (process rank), decoded from the filename.
    Partition,
    /// Simulation timestep, decoded from the filename. The only column
    /// eligible for pushdown.
    Time,
}

impl Column {
    /// All columns in schema order.
    pub const ALL: [Column; 5] = [
        Column::I,
        Column::J,
        Column::Heat,
        Column::Partition,
        Column::Time,
    ];

    /// Looks a column up by its position in the declared schema.
    pub fn from_index(index: usize) -> Option<Column> {
        Column::ALL.get(index).copied()
    }

    /// Position of this column in the declared schema.
    pub fn index(self) -> usize {
        match self {
            Column::I => 0,
            Column::J => 1,
            Column::Heat => 2,
            Column::Partition => 3,
            Column::Time => 4,
        }
    }

    /// Column name as exposed to the host engine.
    pub fn name(self) -> &'static str {
        SCHEMA[self.index()].name
    }

    /// Value type of this column.
    pub fn column_type(self) -> ColumnType {
        SCHEMA[self.index()].column_type
    }
}

/// Value type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
}

/// One column of the declared schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Which column this entry describes.
    pub column: Column,
    /// Name exposed to the host engine.
    pub name: &'static str,
    /// Value type exposed to the host engine.
    pub column_type: ColumnType,
}

/// The fixed five-column schema every relation declares, in order.
pub const SCHEMA: [ColumnDef; 5] = [
    ColumnDef {
        column: Column::I,
        name: "i",
        column_type: ColumnType::Integer,
    },
    ColumnDef {
        column: Column::J,
        name: "j",
        column_type: ColumnType::Integer,
    },
    ColumnDef {
        column: Column::Heat,
        name: "heat",
        column_type: ColumnType::Float,
    },
    ColumnDef {
        column: Column::Partition,
        name: "partition",
        column_type: ColumnType::Integer,
    },
    ColumnDef {
        column: Column::Time,
        name: "time",
        column_type: ColumnType::Integer,
    },
];

/// Receives the schema during registration, on behalf of the host engine.
///
/// The host may refuse the declaration (for example when a table with an
/// incompatible shape already exists under the chosen name), which aborts
/// registration with [`RegisterError::SchemaRejected`].
pub trait SchemaHost {
    /// Called exactly once per registration with the declared schema.
    fn declare_schema(&mut self, columns: &[ColumnDef; 5]) -> Result<(), SchemaRejection>;
}

/// Accept-all host, for embedding without schema negotiation.
impl SchemaHost for () {
    fn declare_schema(&mut self, _columns: &[ColumnDef; 5]) -> Result<(), SchemaRejection> {
        Ok(())
    }
}

/// Host-side refusal of the declared schema.
#[derive(Debug, Clone)]
pub struct SchemaRejection {
    /// Host-supplied reason for the refusal.
    pub reason: String,
}

/// Errors that abort registration. No partial [`Relation`] is ever produced.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RegisterError {
    /// The registration path could not be opened as a directory.
    #[snafu(display("Cannot open output directory {}: {source}", path.display()))]
    Path {
        /// The (quote-stripped) path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The host engine rejected the declared schema.
    #[snafu(display("Host rejected the output schema: {reason}"))]
    SchemaRejected {
        /// Host-supplied reason for the refusal.
        reason: String,
    },
}

/// Registered, immutable handle to a directory of solver output files.
///
/// Dropping the relation releases the registration; because cursors borrow
/// it, the drop can only happen after every cursor is closed.
#[derive(Debug)]
pub struct Relation {
    path: PathBuf,
}

impl Relation {
    /// Registers `path` as an output-file relation.
    ///
    /// Strips one layer of matching leading/trailing quote characters from
    /// `path` (hosts commonly pass the argument through verbatim from a
    /// quoted declaration), validates that the result opens as a directory,
    /// and declares [`SCHEMA`] to `host`.
    pub fn register(path: &str, host: &mut dyn SchemaHost) -> Result<Relation, RegisterError> {
        let path = PathBuf::from(strip_quotes(path));
        fs::read_dir(&path).context(PathSnafu { path: &path })?;
        host.declare_schema(&SCHEMA)
            .map_err(|rejection| RegisterError::SchemaRejected {
                reason: rejection.reason,
            })?;
        Ok(Relation { path })
    }

    /// Directory the relation scans.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The declared schema, in column order.
    pub fn schema(&self) -> &'static [ColumnDef; 5] {
        &SCHEMA
    }
}

/// Strips one layer of matching `"` or `'` quotes, if present.
fn strip_quotes(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// Records what was declared, optionally refusing it.
    struct RecordingHost {
        declared: Vec<&'static str>,
        refuse: bool,
    }

    impl RecordingHost {
        fn new(refuse: bool) -> Self {
            RecordingHost {
                declared: Vec::new(),
                refuse,
            }
        }
    }

    impl SchemaHost for RecordingHost {
        fn declare_schema(&mut self, columns: &[ColumnDef; 5]) -> Result<(), SchemaRejection> {
            self.declared = columns.iter().map(|c| c.name).collect();
            if self.refuse {
                return Err(SchemaRejection {
                    reason: "table exists with a different shape".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn register_declares_schema_in_order() -> TestResult {
        let tmp = TempDir::new()?;
        let mut host = RecordingHost::new(false);

        let relation = Relation::register(tmp.path().to_str().unwrap(), &mut host)?;

        assert_eq!(host.declared, vec!["i", "j", "heat", "partition", "time"]);
        assert_eq!(relation.path(), tmp.path());
        Ok(())
    }

    #[test]
    fn register_fails_fast_on_missing_directory() -> TestResult {
        let tmp = TempDir::new()?;
        let missing = tmp.path().join("no-such-dir");

        let err = Relation::register(missing.to_str().unwrap(), &mut ())
            .expect_err("missing directory should fail registration");

        assert!(matches!(err, RegisterError::Path { .. }));
        Ok(())
    }

    #[test]
    fn register_fails_when_path_is_a_file() -> TestResult {
        let tmp = TempDir::new()?;
        let file = tmp.path().join("output.0.1");
        std::fs::write(&file, "1 1 0.5\n")?;

        let err = Relation::register(file.to_str().unwrap(), &mut ())
            .expect_err("plain file should fail registration");

        assert!(matches!(err, RegisterError::Path { .. }));
        Ok(())
    }

    #[test]
    fn register_strips_one_quote_layer() -> TestResult {
        let tmp = TempDir::new()?;
        let raw = tmp.path().to_str().unwrap();

        let double = Relation::register(&format!("\"{raw}\""), &mut ())?;
        assert_eq!(double.path(), tmp.path());

        let single = Relation::register(&format!("'{raw}'"), &mut ())?;
        assert_eq!(single.path(), tmp.path());
        Ok(())
    }

    #[test]
    fn register_surfaces_host_rejection() -> TestResult {
        let tmp = TempDir::new()?;
        let mut host = RecordingHost::new(true);

        let err = Relation::register(tmp.path().to_str().unwrap(), &mut host)
            .expect_err("refusing host should abort registration");

        assert!(matches!(err, RegisterError::SchemaRejected { .. }));
        Ok(())
    }

    #[test]
    fn column_index_round_trips() {
        for (idx, def) in SCHEMA.iter().enumerate() {
            assert_eq!(def.column.index(), idx);
            assert_eq!(Column::from_index(idx), Some(def.column));
            assert_eq!(def.column.name(), def.name);
            assert_eq!(def.column.column_type(), def.column_type);
        }
        assert_eq!(Column::from_index(5), None);
    }
}

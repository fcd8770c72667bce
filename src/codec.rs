//! Decoding of solver output filenames and rows.
//!
//! Producers write one plain-text file per (partition, timestep) pair, named
//! `output.<partition>.<time>` with decimal, non-padded integers, each line
//! holding one grid cell as `i j heat`. Both decoders return `None` on any
//! mismatch so the scan layer can treat foreign files and trailing garbage
//! as skippable rather than fatal.

/// Identity of one output file, recovered from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileKey {
    /// Rank of the solver process that wrote the file.
    pub partition: i64,
    /// Simulation timestep the file belongs to.
    pub time: i64,
}

/// One grid cell parsed from a line of an output file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Row index of the cell in the simulation grid.
    pub i: i64,
    /// Column index of the cell in the simulation grid.
    pub j: i64,
    /// Heat value at the cell; always finite.
    pub heat: f64,
}

/// Decodes `output.<partition>.<time>` into a [`FileKey`].
///
/// Returns `None` for any name that does not match the pattern exactly:
/// wrong prefix, missing or empty fields, extra dot-separated segments, or
/// anything other than plain decimal digits in either field.
pub fn decode_filename(name: &str) -> Option<FileKey> {
    let rest = name.strip_prefix("output.")?;
    let (partition, time) = rest.split_once('.')?;
    if time.contains('.') {
        return None;
    }
    Some(FileKey {
        partition: parse_decimal(partition)?,
        time: parse_decimal(time)?,
    })
}

/// Decodes one `i j heat` line into a [`Cell`].
///
/// Exactly three whitespace-separated fields are required, and `heat` must
/// be finite; anything else returns `None`, which the scan layer takes as
/// "abandon the rest of this file".
pub fn decode_line(line: &str) -> Option<Cell> {
    let mut fields = line.split_whitespace();
    let i = fields.next()?.parse().ok()?;
    let j = fields.next()?.parse().ok()?;
    let heat: f64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() || !heat.is_finite() {
        return None;
    }
    Some(Cell { i, j, heat })
}

fn parse_decimal(field: &str) -> Option<i64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

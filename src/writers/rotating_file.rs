//! Rotation state for file-backed writers.
//!
//! A [`RotatingFile`] is owned by exactly one worker thread, so its counters
//! and handle are plain fields.
//!
//! Rotated files get a numeric index inserted before the extension:
//! `app.log` becomes `app.1.log`, then `app.2.log`, always taking the
//! lowest free index. Retention is unbounded up to [`MAX_ROTATIONS`] files;
//! past that rotation fails and the triggering record is dropped.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDate};

use crate::error::WriterError;

pub const MAX_ROTATIONS: u32 = 999;

/// When to roll the active file over.
///
/// Limits of zero are disabled. Nothing is checked unless `rotate` is set;
/// a non-rotating file is appended to indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    pub rotate: bool,
    /// Lines (text files) or records (structured files).
    pub max_units: u64,
    pub max_size: u64,
    pub daily: bool,
}

/// Counts the units already present in an existing file.
pub(crate) type UnitCounter = fn(&Path) -> io::Result<u64>;

#[derive(Debug)]
pub(crate) struct RotatingFile {
    path: PathBuf,
    policy: RotationPolicy,
    file: Option<BufWriter<File>>,
    units: u64,
    size: u64,
    day: NaiveDate,
    count_units: UnitCounter,
}

impl RotatingFile {
    /// Opens `path`, reusing an existing file when it is below both maxima
    /// and, for daily rotation, was last written today. Otherwise the old
    /// file is rotated out of the way first.
    pub(crate) fn open(
        path: impl Into<PathBuf>,
        policy: RotationPolicy,
        count_units: UnitCounter,
    ) -> Result<Self, WriterError> {
        let path = path.into();
        let today = Local::now().date_naive();
        let mut rf = Self {
            path,
            policy,
            file: None,
            units: 0,
            size: 0,
            day: today,
            count_units,
        };

        if !rf.path.exists() {
            rf.open_append()?;
            return Ok(rf);
        }

        match rf.existing_counts(today) {
            Ok(Some((units, size))) => {
                rf.open_append()?;
                rf.units = units;
                rf.size = size;
                tracing::debug!(path = ?rf.path, units, size, "reusing existing log file");
            }
            Ok(None) => rf.rotate(today)?,
            Err(source) => {
                return Err(WriterError::Open {
                    path: rf.path.clone(),
                    source,
                });
            }
        }
        Ok(rf)
    }

    #[cfg(test)]
    pub(crate) fn units(&self) -> u64 {
        self.units
    }

    #[cfg(test)]
    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Appends one rendered record worth `units` lines or elements, rotating
    /// first when it would cross a limit or when `day` is past the open
    /// file's day.
    pub(crate) fn write(
        &mut self,
        rendered: &[u8],
        units: u64,
        day: NaiveDate,
    ) -> Result<(), WriterError> {
        if self.needs_rotation(rendered.len() as u64, units, day) {
            self.rotate(day)?;
        }
        if self.file.is_none() {
            self.open_append()?;
        }
        // An empty file belongs to the day of its first record.
        if self.size == 0 {
            self.day = day;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(rendered)?;
        }
        self.units += units;
        self.size += rendered.len() as u64;
        Ok(())
    }

    fn needs_rotation(&self, len: u64, units: u64, day: NaiveDate) -> bool {
        let p = &self.policy;
        // An empty file is never rotated; an oversized record still has to land somewhere.
        if !p.rotate || self.size == 0 {
            return false;
        }
        (p.max_units > 0 && self.units + units > p.max_units)
            || (p.max_size > 0 && self.size + len > p.max_size)
            || (p.daily && day != self.day)
    }

    /// Closes the active file, renames it to the lowest free index and opens
    /// a fresh file at the original path.
    pub(crate) fn rotate(&mut self, day: NaiveDate) -> Result<(), WriterError> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        if self.path.exists() {
            let target = match next_free_name(&self.path) {
                Ok(target) => target,
                Err(e) => {
                    self.open_append()?;
                    return Err(e);
                }
            };
            if let Err(source) = fs::rename(&self.path, &target) {
                self.open_append()?;
                return Err(WriterError::Rename {
                    path: self.path.clone(),
                    source,
                });
            }
            tracing::debug!(from = ?self.path, to = ?target, "rotated log file");
        }

        self.open_append()?;
        self.units = 0;
        self.size = 0;
        self.day = day;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<(), WriterError> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    pub(crate) fn finish(&mut self) -> Result<(), WriterError> {
        self.flush()?;
        self.file = None;
        Ok(())
    }

    fn open_append(&mut self) -> Result<(), WriterError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| WriterError::Open {
                path: self.path.clone(),
                source,
            })?;
        self.file = Some(BufWriter::new(file));
        Ok(())
    }

    /// `Some((units, size))` when the existing file may be appended to.
    fn existing_counts(&self, today: NaiveDate) -> io::Result<Option<(u64, u64)>> {
        let meta = fs::metadata(&self.path)?;
        let size = meta.len();
        let p = &self.policy;

        if p.rotate {
            if p.max_size > 0 && size >= p.max_size {
                return Ok(None);
            }
            if p.daily {
                let written: DateTime<Local> = meta.modified()?.into();
                if written.date_naive() != today {
                    return Ok(None);
                }
            }
        }

        let units = (self.count_units)(&self.path)?;
        if p.rotate && p.max_units > 0 && units >= p.max_units {
            return Ok(None);
        }
        Ok(Some((units, size)))
    }
}

/// `app.log` + 3 -> `app.3.log`; `app` + 3 -> `app.3`.
pub(crate) fn rotated_name(path: &Path, index: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{index}"),
    };
    path.with_file_name(name)
}

fn next_free_name(path: &Path) -> Result<PathBuf, WriterError> {
    (1..=MAX_ROTATIONS)
        .map(|n| rotated_name(path, n))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| WriterError::RotationExhausted(path.to_path_buf()))
}

/// Newline count of a text log.
pub(crate) fn count_lines(path: &Path) -> io::Result<u64> {
    count_occurrences(path, b"\n")
}

/// Number of closed record elements in a structured log.
pub(crate) fn count_records(path: &Path) -> io::Result<u64> {
    count_occurrences(path, RECORD_CLOSE)
}

/// Lines a rendered text record adds to its file.
pub(crate) fn line_units(rendered: &[u8]) -> u64 {
    rendered.iter().filter(|&&b| b == b'\n').count() as u64
}

pub(crate) const RECORD_CLOSE: &[u8] = b"</record>";

/// Counts `needle` over raw bytes, so a file need not be valid UTF-8.
fn count_occurrences(path: &Path, needle: &[u8]) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    let keep = needle.len().saturating_sub(1);
    let mut window: Vec<u8> = Vec::new();
    let mut found = 0u64;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(found);
        }
        window.extend_from_slice(buf);
        let len = buf.len();
        reader.consume(len);

        found += window.windows(needle.len()).filter(|w| *w == needle).count() as u64;
        // The tail is shorter than `needle`, so no match is counted twice.
        let cut = window.len().saturating_sub(keep);
        window.drain(..cut);
    }
}

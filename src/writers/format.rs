//! Format templates for line-oriented writers.
//!
//! | token | expands to                          |
//! |-------|-------------------------------------|
//! | `%T`  | time, `HH:MM:SS`                    |
//! | `%t`  | time, `HH:MM`                       |
//! | `%D`  | date, `YYYY/MM/DD`                  |
//! | `%d`  | date, `MM/DD/YY`                    |
//! | `%L`  | four-letter level code (`WARN`)     |
//! | `%S`  | source                              |
//! | `%s`  | last `::` segment of the source     |
//! | `%M`  | message                             |
//! | `%%`  | a literal `%`                       |
//!
//! Anything else, including unknown tokens, is copied through unchanged.

use std::fmt::Write as _;

use crate::log::log_record::Record;

pub const DEFAULT_FORMAT: &str = "[%D %T] [%L] (%S) %M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Literal(usize, usize),
    Time,
    ShortTime,
    Date,
    ShortDate,
    Level,
    Source,
    ShortSource,
    Message,
    Percent,
}

/// A parsed format template; parsing happens once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    template: String,
    pieces: Vec<Piece>,
}

impl FormatTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let pieces = parse(&template);
        Self { template, pieces }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Renders `record` without a trailing newline.
    #[must_use]
    pub fn render(&self, record: &Record) -> String {
        let mut out = String::with_capacity(self.template.len() + record.message().len() + 32);
        let created = record.created();
        for piece in &self.pieces {
            // Writing into a String cannot fail.
            let _ = match *piece {
                Piece::Literal(start, end) => {
                    out.push_str(&self.template[start..end]);
                    Ok(())
                }
                Piece::Time => write!(out, "{}", created.format("%H:%M:%S")),
                Piece::ShortTime => write!(out, "{}", created.format("%H:%M")),
                Piece::Date => write!(out, "{}", created.format("%Y/%m/%d")),
                Piece::ShortDate => write!(out, "{}", created.format("%m/%d/%y")),
                Piece::Level => {
                    out.push_str(record.level().code());
                    Ok(())
                }
                Piece::Source => {
                    out.push_str(record.source());
                    Ok(())
                }
                Piece::ShortSource => {
                    out.push_str(short_source(record.source()));
                    Ok(())
                }
                Piece::Message => {
                    out.push_str(record.message());
                    Ok(())
                }
                Piece::Percent => {
                    out.push('%');
                    Ok(())
                }
            };
        }
        out
    }
}

impl Default for FormatTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_FORMAT)
    }
}

fn short_source(source: &str) -> &str {
    source.rsplit("::").next().unwrap_or(source)
}

fn parse(template: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let bytes = template.as_bytes();
    let mut lit_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' || i + 1 >= bytes.len() {
            i += 1;
            continue;
        }
        let token = match bytes[i + 1] {
            b'T' => Piece::Time,
            b't' => Piece::ShortTime,
            b'D' => Piece::Date,
            b'd' => Piece::ShortDate,
            b'L' => Piece::Level,
            b'S' => Piece::Source,
            b's' => Piece::ShortSource,
            b'M' => Piece::Message,
            b'%' => Piece::Percent,
            _ => {
                i += 1;
                continue;
            }
        };
        if lit_start < i {
            pieces.push(Piece::Literal(lit_start, i));
        }
        pieces.push(token);
        i += 2;
        lit_start = i;
    }
    if lit_start < bytes.len() {
        pieces.push(Piece::Literal(lit_start, bytes.len()));
    }
    pieces
}

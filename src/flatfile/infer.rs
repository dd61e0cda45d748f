//! Per-column type inference for flat-file cells.
//!
//! A column is `integer` if every non-empty cell parses as i64 or u64, else
//! `float` if every non-empty cell parses as a finite f64 without losing
//! digits, else `text`. Empty cells never decide the type and always become
//! NULL.

use crate::models::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
        }
    }

    /// Convert one raw cell. Cells that do not fit the kind stay text.
    pub fn convert(&self, cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        match self {
            Self::Integer => parse_integer(cell).unwrap_or_else(|| Value::from(cell)),
            Self::Float => parse_float(cell)
                .map(Value::Float)
                .unwrap_or_else(|| Value::from(cell)),
            Self::Text => Value::from(cell),
        }
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer the kind of a column from its cells.
pub fn infer_kind<'a>(cells: impl IntoIterator<Item = &'a str>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    // An integer column widened to float must not lose any of its cells
    let mut all_fit_float = true;
    for cell in cells.into_iter().filter(|c| !c.is_empty()) {
        let fits_float = parse_float(cell).is_some();
        let cell_kind = if parse_integer(cell).is_some() {
            ColumnKind::Integer
        } else if fits_float {
            ColumnKind::Float
        } else {
            return ColumnKind::Text;
        };
        all_fit_float &= fits_float;
        kind = Some(match (kind, cell_kind) {
            (Some(ColumnKind::Float), _) | (_, ColumnKind::Float) => ColumnKind::Float,
            _ => ColumnKind::Integer,
        });
    }
    match kind {
        Some(ColumnKind::Float) if !all_fit_float => ColumnKind::Text,
        Some(kind) => kind,
        None => ColumnKind::Text,
    }
}

/// Integers with a redundant leading zero ("007") are identifiers, not numbers.
fn parse_integer(cell: &str) -> Option<Value> {
    let digits = cell.strip_prefix(['-', '+']).unwrap_or(cell);
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    cell.parse::<i64>()
        .map(Value::Int)
        .or_else(|_| cell.parse::<u64>().map(Value::UInt))
        .ok()
}

/// Rejects cells with more significant digits than an f64 holds exactly.
fn parse_float(cell: &str) -> Option<f64> {
    let digits = cell.strip_prefix(['-', '+']).unwrap_or(cell);
    if digits.len() > 1 && digits.starts_with('0') && !digits[1..].starts_with('.') {
        return None;
    }
    if significant_digits(digits) > f64::DIGITS as usize {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn significant_digits(number: &str) -> usize {
    let mantissa = number.split(['e', 'E']).next().unwrap_or(number);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').trim_end_matches('0').len()
}

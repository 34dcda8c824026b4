//! Safe-ish conversions between cells and typed fields.

use super::*;
use chrono::{DateTime, Utc};

pub fn cell_to_approval(cell: &Cell) -> Result<Approval, String> {
    match cell {
        c if c.is_blank() => Ok(Approval::Pending),
        Cell::Text(s) => match s.trim() {
            "Approved" => Ok(Approval::Approved),
            "Disapproved" => Ok(Approval::Disapproved),
            other => Err(format!(
                "approval '{other}' is not one of Approved, Disapproved or blank"
            )),
        },
        other => Err(format!("approval cell holds {other:?}, expected text")),
    }
}
pub fn approval_to_cell(approval: Approval) -> Cell {
    match approval {
        Approval::Pending => Cell::Empty,
        a => Cell::text(a.as_sheet_text()),
    }
}

pub fn cell_to_tier(cell: &Cell) -> Result<Tier, String> {
    match cell {
        Cell::Text(s) => s.parse(),
        other => Err(format!("tier cell holds {other:?}, expected text")),
    }
}
pub fn tier_to_cell(tier: Tier) -> Cell {
    Cell::Text(tier.to_string())
}

/// Points may arrive as numeric text since form answers are strings.
/// Totals only ever grow, so negative points are rejected.
pub fn cell_to_points(cell: &Cell) -> Result<f64, String> {
    let points = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("points '{s}' is not a number"))?,
        other => return Err(format!("points cell holds {other:?}, expected a number")),
    };
    validate_points(points)
}

pub fn validate_points(points: f64) -> Result<f64, String> {
    if !points.is_finite() {
        Err(format!("points {points} is not finite"))
    } else if points < 0.0 {
        Err(format!("points {points} is negative"))
    } else {
        Ok(points)
    }
}
pub fn points_to_cell(points: f64) -> Cell {
    Cell::Number(points)
}

/// Totals must already be numbers; a blank total means the row was never initialized.
pub fn cell_to_total(cell: &Cell) -> Result<f64, String> {
    match cell {
        Cell::Number(n) if n.is_finite() => Ok(*n),
        other => Err(other.to_string()),
    }
}
pub fn total_to_cell(total: f64) -> Cell {
    Cell::Number(total)
}

/// Names are matched exactly, so no trimming or case folding happens here.
pub fn cell_to_name(cell: &Cell) -> Result<String, String> {
    match cell {
        c if c.is_blank() => Err("member name is blank".to_string()),
        Cell::Text(s) => Ok(s.clone()),
        other => Err(format!("member name cell holds {other:?}, expected text")),
    }
}
pub fn name_to_cell(name: &str) -> Cell {
    Cell::text(name)
}

pub fn cell_to_text(cell: &Cell) -> String {
    cell.to_string()
}

/// Hand-entered rows may have a blank or unparseable timestamp; that is not an error.
pub fn cell_to_timestamp(cell: &Cell) -> Option<DateTime<Utc>> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Text(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}
pub fn timestamp_to_cell(timestamp: Option<DateTime<Utc>>) -> Cell {
    timestamp.map_or(Cell::Empty, Cell::DateTime)
}

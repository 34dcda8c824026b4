//! A library with common utilities for reconciling approved point submissions into a leaderboard.

pub mod accumulator;
pub mod binary_lookup;
pub mod compactor;
pub mod error;
pub mod grid;
pub mod intake;
pub mod leaderboard_updater;
pub mod queue_scanner;
pub mod reconcile;
pub mod sheet_util;
pub mod sort_orchestrator;
pub mod timestamp;
pub mod workbook;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const QUEUE_SHEET_NAME: &str = "Approval Status";
pub const LEADERBOARD_SHEET_NAME: &str = "Star & Lamp Leaderboard";

/// Prefix of the stamp written to the leaderboard after each run.
pub const LAST_UPDATED_PREFIX: &str = "Last Updated: \n";
pub const LAST_UPDATED_FORMAT: &str = "%m/%d/%Y %H:%M";
/// Pacific time, where the leaderboard's readers live.
pub const DEFAULT_TIME_ZONE: chrono_tz::Tz = chrono_tz::America::Los_Angeles;

/// Category of activity a submission is worth points for.
/// Each tier has its own running total on the leaderboard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Tier1 => write!(f, "Tier 1"),
            Tier::Tier2 => write!(f, "Tier 2"),
            Tier::Tier3 => write!(f, "Tier 3"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    /// Accepts the sheet spelling ("Tier 2") as well as the compact one ("Tier2").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.split_whitespace().collect::<String>().to_lowercase();
        match compact.as_str() {
            "tier1" => Ok(Tier::Tier1),
            "tier2" => Ok(Tier::Tier2),
            "tier3" => Ok(Tier::Tier3),
            _ => Err(format!("'{s}' is not a tier (expected Tier 1, Tier 2 or Tier 3)")),
        }
    }
}

/// The reviewer's decision on a submission.
/// Pending rows are never touched by a reconciliation run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum Approval {
    #[default]
    Pending,
    Approved,
    Disapproved,
}

impl Approval {
    /// Text shown in the approval dropdown. Pending is the blank cell.
    pub fn as_sheet_text(&self) -> &'static str {
        match self {
            Approval::Pending => "",
            Approval::Approved => "Approved",
            Approval::Disapproved => "Disapproved",
        }
    }
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approval::Pending => write!(f, "Pending"),
            Approval::Approved => write!(f, "Approved"),
            Approval::Disapproved => write!(f, "Disapproved"),
        }
    }
}

/// One submitted point request waiting in the approval queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// Missing when the row was typed in by hand instead of coming from the form.
    pub timestamp: Option<DateTime<Utc>>,
    pub member_name: String,
    pub points: f64,
    pub activity: String,
    pub tier: Tier,
    pub approval: Approval,
}

/// One member's running totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub member_name: String,
    pub tier1_total: f64,
    pub tier2_total: f64,
    pub tier3_total: f64,
    /// Reset by hand at the start of each month.
    pub period_total: f64,
    pub grand_total: f64,
}

impl LeaderboardEntry {
    /// A freshly registered member, every total zero.
    pub fn new(member_name: impl Into<String>) -> Self {
        Self {
            member_name: member_name.into(),
            tier1_total: 0.0,
            tier2_total: 0.0,
            tier3_total: 0.0,
            period_total: 0.0,
            grand_total: 0.0,
        }
    }

    pub fn tier_total(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Tier1 => self.tier1_total,
            Tier::Tier2 => self.tier2_total,
            Tier::Tier3 => self.tier3_total,
        }
    }

    pub fn tier_total_mut(&mut self, tier: Tier) -> &mut f64 {
        match tier {
            Tier::Tier1 => &mut self.tier1_total,
            Tier::Tier2 => &mut self.tier2_total,
            Tier::Tier3 => &mut self.tier3_total,
        }
    }
}

/// What to do with an approved submission whose member is not on the leaderboard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum UnmatchedPolicy {
    /// Delete the row and report the lost points.
    #[default]
    Drop,
    /// Keep the row in the queue so it is retried once the member is registered.
    Retain,
}

/// An approved submission that could not be credited to anyone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedMember {
    /// Absolute sheet row (0-based) the submission was read from.
    pub row: usize,
    pub member_name: String,
    pub points: f64,
    pub tier: Tier,
}

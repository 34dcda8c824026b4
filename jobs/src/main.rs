//! Command-line jobs for the point standings workbook.

#![warn(clippy::all, clippy::pedantic)]

use anyhow::{Context, Result, bail};
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use log::{info, warn};
use standings_common::grid::GridStore;
use standings_common::intake::{self, FormResponse};
use standings_common::reconcile::{ReconcileOptions, Reconciler};
use standings_common::sheet_util::{SheetLayout, leaderboard};
use standings_common::timestamp::{now_in, parse_time_zone};
use standings_common::workbook::{Workbook, WorkbookLock};
use standings_common::{
    Approval, DEFAULT_TIME_ZONE, LEADERBOARD_SHEET_NAME, QUEUE_SHEET_NAME, Tier, UnmatchedPolicy,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The workbook file holding both sheets
    #[arg(
        short,
        long,
        global = true,
        default_value = "standings.json",
        env = "STANDINGS_WORKBOOK"
    )]
    workbook: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new workbook with empty sheets
    Init {
        /// Overwrite an existing workbook
        #[arg(long)]
        force: bool,

        /// Members to register with zero points
        members: Vec<String>,
    },

    /// Register a member on the leaderboard
    AddMember { name: String },

    /// Queue a point submission for review
    Submit {
        name: String,
        points: f64,

        #[arg(value_enum)]
        tier: Tier,

        /// What the points were earned for
        #[arg(short, long, default_value = "")]
        activity: String,
    },

    /// Record a decision on a queued submission
    Review {
        /// Sheet row of the submission, as shown by `show --queue`
        row: usize,

        #[arg(value_enum)]
        approval: Approval,
    },

    /// Fold reviewed submissions into the leaderboard
    Reconcile {
        /// What to do with approved points for unregistered members
        #[arg(long, value_enum, default_value_t = UnmatchedPolicy::Drop, env = "STANDINGS_UNMATCHED")]
        unmatched: UnmatchedPolicy,

        /// IANA time zone used for the "Last Updated" stamp
        #[arg(
            long,
            default_value_t = DEFAULT_TIME_ZONE,
            value_parser = parse_time_zone,
            env = "STANDINGS_TIME_ZONE"
        )]
        time_zone: Tz,

        /// Leave the "Last Updated" stamp alone
        #[arg(long, env = "STANDINGS_NO_STAMP")]
        no_stamp: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the leaderboard, or the approval queue
    Show {
        #[arg(long)]
        queue: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Cli::parse();
    let layout = SheetLayout::default();
    let path = cli.workbook.as_path();

    match cli.command {
        Command::Init { force, members } => {
            let _lock = WorkbookLock::acquire(path)?;
            if path.exists() && !force {
                bail!("{} already exists, pass --force to replace it", path.display());
            }
            let workbook = Workbook::new(&layout, &members)?;
            workbook.save(path)?;
            println!(
                "Created {} with {} members.",
                path.display(),
                members.len()
            );
        }
        Command::AddMember { name } => {
            mutate(path, |workbook| {
                workbook.add_member(&layout, &name)?;
                println!("Registered '{name}'.");
                Ok(())
            })?;
        }
        Command::Submit {
            name,
            points,
            tier,
            activity,
        } => {
            mutate(path, |workbook| {
                let response = FormResponse {
                    timestamp: Utc::now(),
                    member_name: name,
                    points,
                    activity,
                    tier,
                };
                let row = intake::append_submission(&mut workbook.queue, &layout.queue, response)?;
                println!("Queued on row {}.", row + 1);
                Ok(())
            })?;
        }
        Command::Review { row, approval } => {
            let Some(row) = row.checked_sub(1) else {
                bail!("Rows are numbered from 1");
            };
            mutate(path, |workbook| {
                intake::set_approval(&mut workbook.queue, &layout.queue, row, approval)?;
                println!("Row {} marked {approval}.", row + 1);
                Ok(())
            })?;
        }
        Command::Reconcile {
            unmatched,
            time_zone,
            no_stamp,
            json,
        } => {
            let options = ReconcileOptions {
                unmatched,
                stamp_at: (!no_stamp).then(|| now_in(time_zone)),
            };
            let reconciler = Reconciler::new();
            mutate(path, |workbook| {
                let report = reconciler.run(
                    &mut workbook.queue,
                    &mut workbook.leaderboard,
                    &layout,
                    &options,
                )?;
                for member in &report.unmatched {
                    warn!(
                        "No member named '{}': {} {} points from row {} were not credited",
                        member.member_name,
                        member.points,
                        member.tier,
                        member.row + 1
                    );
                }
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!(
                        "Removed {} rows: {} credited for {} points, {} disapproved, {} unmatched. {} still pending.",
                        report.rows_deleted,
                        report.rows_credited,
                        report.points_credited,
                        report.rows_disapproved,
                        report.unmatched.len(),
                        report.rows_pending
                    );
                }
                Ok(())
            })?;
        }
        Command::Show { queue } => {
            let workbook = Workbook::load(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            if queue {
                print_queue(&workbook, &layout);
            } else {
                print_leaderboard(&workbook, &layout)?;
            }
        }
    }
    Ok(())
}

/// Load the workbook under its lock, apply `f`, and save it only if `f` succeeds.
fn mutate<F>(path: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut Workbook) -> Result<()>,
{
    let _lock = WorkbookLock::acquire(path)?;
    let mut workbook =
        Workbook::load(path).with_context(|| format!("Failed to open {}", path.display()))?;
    f(&mut workbook)?;
    workbook.save(path)?;
    info!("Saved {}", path.display());
    Ok(())
}

fn print_leaderboard(workbook: &Workbook, layout: &SheetLayout) -> Result<()> {
    let board_layout = &layout.leaderboard;
    let board = &workbook.leaderboard;
    let rows = board.read_range(board_layout.data_range(board.row_count()))?;
    let entries = leaderboard::rows_to_entries(&rows, board_layout, board_layout.header_rows)?;

    println!("=== {LEADERBOARD_SHEET_NAME} ===");
    let stamp = board.cell(board_layout.stamp_row, board_layout.stamp_col);
    if !stamp.is_blank() {
        println!("{}", stamp.to_string().replace('\n', ""));
    }
    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}. {:<24} {:>8} (Tier 1 {}, Tier 2 {}, Tier 3 {}, this month {})",
            rank + 1,
            entry.member_name,
            entry.grand_total,
            entry.tier1_total,
            entry.tier2_total,
            entry.tier3_total,
            entry.period_total
        );
    }
    Ok(())
}

fn print_queue(workbook: &Workbook, layout: &SheetLayout) {
    let queue = &workbook.queue;
    println!("=== {QUEUE_SHEET_NAME} ===");
    for (row, cells) in queue
        .rows()
        .iter()
        .enumerate()
        .take(queue.row_count())
        .skip(layout.queue.header_rows)
    {
        let line: Vec<String> = cells.iter().map(ToString::to_string).collect();
        println!("{:>4}: {}", row + 1, line.join(" | "));
    }
}

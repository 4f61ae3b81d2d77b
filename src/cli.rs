//! Command-line front end over the tracker

use std::fmt::Write;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Subcommand;

use crate::bulk::BulkReport;
use crate::ledger::model::parse_match_date;
use crate::ledger::{NewMatch, NewParticipant, Outcome, ParticipantId, Window};
use crate::publish::{render, PublishOutcome};
use crate::ranking::{Metric, PersonalStats};
use crate::tracker::Tracker;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the board scheduler until interrupted
    Run,

    /// Record a new match
    AddMatch {
        /// Opposing team
        opponent: String,
        /// win or lose
        #[arg(short, long, default_value = "win")]
        result: Outcome,
        /// DD.MM.YYYY [HH:MM], defaults to now
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Add one participant to a match
    AddPlayer {
        /// Participant id
        id: ParticipantId,
        /// Damage dealt (`12k` = 12000)
        damage: String,
        kills: u64,
        /// Match ordinal, 1 = newest
        #[arg(short, long, default_value = "1")]
        ordinal: usize,
    },

    /// Add participants from `id damage kills` lines
    Upload {
        /// Input file, `-` for stdin
        file: PathBuf,
        #[arg(short, long, default_value = "1")]
        ordinal: usize,
    },

    /// Import whole matches from a text file
    Import {
        /// Input file, `-` for stdin
        file: PathBuf,
        /// Outcome for headers without a win/lose marker
        #[arg(short, long, default_value = "win")]
        result: Outcome,
    },

    /// Remove a match
    Remove {
        /// Match ordinal, 1 = newest
        ordinal: usize,
    },

    /// Remove every match
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show match history
    History {
        /// all, week, month, <n>d or <n>h
        #[arg(short, long, default_value = "all")]
        window: Window,
        /// 1-based page
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Top participants by average damage
    TopAvg {
        #[arg(short, long, default_value = "all")]
        window: Window,
    },

    /// Top participants by kills
    TopKills {
        #[arg(short, long, default_value = "all")]
        window: Window,
    },

    /// One participant's totals and positions
    Stats {
        id: ParticipantId,
        #[arg(short, long, default_value = "all")]
        window: Window,
    },

    /// Publish every board now
    Refresh,
}

impl Commands {
    /// Commands that change the ledger and should be followed by a refresh
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::AddMatch { .. }
                | Commands::AddPlayer { .. }
                | Commands::Upload { .. }
                | Commands::Import { .. }
                | Commands::Remove { .. }
                | Commands::Reset { .. }
        )
    }
}

/// Execute a one-shot command and return its printable output.
pub async fn execute_command(tracker: &Tracker, command: Commands) -> anyhow::Result<String> {
    match command {
        Commands::Run => bail!("`run` is handled by the binary"),

        Commands::AddMatch { opponent, result, date } => {
            let timestamp = date
                .as_deref()
                .map(parse_match_date)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let ordinal = tracker
                .add_match(NewMatch { opponent: opponent.clone(), outcome: result, timestamp })
                .await?;
            Ok(format!("Match #{} vs {} recorded ({})", ordinal, opponent, outcome_label(result)))
        }

        Commands::AddPlayer { id, damage, kills, ordinal } => {
            let damage = crate::bulk::parse_amount(&damage)
                .with_context(|| format!("invalid damage '{}'", damage))?;
            let entry = tracker
                .add_participant(NewParticipant { ordinal, id, damage, kills })
                .await?;
            Ok(format!(
                "{} added to match #{}: {} damage, {} kills",
                entry.label,
                ordinal,
                render::thousands(entry.damage),
                entry.kills
            ))
        }

        Commands::Upload { file, ordinal } => {
            let text = read_input(&file)?;
            let report = tracker.upload_participants(ordinal, &text).await?;
            Ok(format_report(&report, "participants"))
        }

        Commands::Import { file, result } => {
            let text = read_input(&file)?;
            let report = tracker.import_matches(&text, result).await?;
            Ok(format_report(&report, "matches"))
        }

        Commands::Remove { ordinal } => {
            let removed = tracker.remove_match(ordinal).await?;
            Ok(format!(
                "Removed match vs {} ({}, {} participants)",
                removed.opponent,
                removed.timestamp.format("%d.%m.%Y %H:%M"),
                removed.participants.len()
            ))
        }

        Commands::Reset { yes } => {
            if !yes {
                bail!("reset removes every match; pass --yes to confirm");
            }
            let (matches, entries) = tracker.reset().await?;
            Ok(format!("Removed {} matches and {} participant totals", matches, entries))
        }

        Commands::History { window, page } => {
            let view = tracker.history_view(window).await;
            let page = view.render_page(page.saturating_sub(1));
            Ok(render::history(&page, &window.describe(), Utc::now()))
        }

        Commands::TopAvg { window } => leaderboard(tracker, Metric::AverageDamage, window).await,

        Commands::TopKills { window } => leaderboard(tracker, Metric::TotalKills, window).await,

        Commands::Stats { id, window } => {
            let stats = tracker.personal_stats(id, window).await?;
            let label = tracker.label(id).await;
            Ok(format_stats(&label, &stats, window))
        }

        Commands::Refresh => {
            let outcomes = tracker.refresh_all().await;
            let mut out = String::new();
            for (board, outcome) in outcomes {
                let status = match outcome {
                    PublishOutcome::Created(a) => format!("created {}", a.id),
                    PublishOutcome::Updated(a) => format!("updated {}", a.id),
                    PublishOutcome::Skipped(reason) => format!("skipped: {}", reason),
                    PublishOutcome::Failed(error) => format!("failed: {}", error),
                };
                let _ = writeln!(out, "{:<15} {}", board.to_string(), status);
            }
            Ok(out.trim_end().to_string())
        }
    }
}

async fn leaderboard(tracker: &Tracker, metric: Metric, window: Window) -> anyhow::Result<String> {
    let board = tracker.leaderboard(metric, window).await;
    let snapshot = tracker.snapshot().await;
    let placeholder = tracker.publisher().settings().placeholder_label.clone();
    let label = |id| {
        snapshot
            .latest_label(id)
            .map(str::to_string)
            .unwrap_or_else(|| crate::identity::placeholder_label(&placeholder, id))
    };
    Ok(render::leaderboard(&board, label, Utc::now()))
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("reading stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn outcome_label(outcome: Outcome) -> &'static str {
    if outcome.is_win() {
        "win"
    } else {
        "loss"
    }
}

fn format_report(report: &BulkReport, what: &str) -> String {
    let mut out = format!("Added {} {}", report.added, what);
    if !report.failures.is_empty() {
        let _ = write!(out, ", {} lines rejected:", report.failures.len());
        for failure in &report.failures {
            let _ = write!(out, "\n  {}", failure);
        }
    }
    out
}

fn format_stats(label: &str, stats: &PersonalStats, window: Window) -> String {
    let position = |p: Option<usize>| p.map_or_else(|| "-".to_string(), |p| format!("#{}", p));
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", label, window);
    let _ = writeln!(out, "Games:          {}", stats.totals.games);
    let _ = writeln!(out, "Total damage:   {}", render::thousands(stats.totals.damage));
    let _ = writeln!(out, "Average damage: {}", render::thousands(stats.average_damage));
    let _ = writeln!(out, "Kills:          {}", stats.totals.kills);
    let _ = writeln!(out, "Average board:  {}", position(stats.average_position));
    let _ = write!(out, "Kills board:    {}", position(stats.kills_position));
    out
}

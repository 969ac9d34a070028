//! Plain-text rendering of schedules and KPIs.
//!
//! Player ids are shown 1-based. Units are shown in court order, followed
//! by the bench; a unit with teams renders as `1 2 v 3 4`.

use std::fmt::Write;

use crate::kpi::RotationKpi;
use crate::models::{PlayerStats, Schedule, Unit};

const CELL: usize = 16;

fn format_unit(unit: &Unit) -> String {
    match unit.teams {
        Some([a, b]) => format!("{} {} v {} {}", a.0 + 1, a.1 + 1, b.0 + 1, b.1 + 1),
        None => unit
            .players
            .iter()
            .map(|p| (p + 1).to_string())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Renders the round table, followed by per-court usage when courts are set.
pub fn render_schedule(schedule: &Schedule) -> String {
    let mut out = String::new();
    let _ = write!(out, "{:12}", "");
    for c in 0..schedule.court_count {
        let _ = write!(out, "{:width$}", format!("court {}", c + 1), width = CELL);
    }
    let _ = writeln!(out, "bench");

    for round in &schedule.rounds {
        let _ = write!(out, "{:12}", format!("Round {:>3}:", round.index + 1));
        for c in 0..schedule.court_count {
            let cell = round
                .units
                .get(c)
                .map(format_unit)
                .unwrap_or_else(|| "-".into());
            let _ = write!(out, "{cell:width$}", width = CELL);
        }
        let bench: Vec<String> = round.bench.iter().map(|p| (p + 1).to_string()).collect();
        let _ = writeln!(out, "{}", bench.join(" "));
    }

    if schedule.has_courts() {
        let stats = PlayerStats::collect(schedule);
        for c in 0..schedule.court_count {
            let usage: Vec<String> = stats
                .iter()
                .map(|s| s.court_usage.get(&c).copied().unwrap_or(0).to_string())
                .collect();
            let _ = writeln!(out, "{:12}{}", format!("Court {:>3}:", c + 1), usage.join(" "));
        }
    }
    out
}

/// Renders a KPI summary.
pub fn render_kpi(kpi: &RotationKpi) -> String {
    let rows: [(&str, String); 10] = [
        ("bench spread", kpi.bench_spread.to_string()),
        ("played spread", kpi.played_spread.to_string()),
        (
            "distinct unit-mates",
            format!("min {} / avg {:.2}", kpi.min_distinct_mates, kpi.avg_distinct_mates),
        ),
        ("pairs never met", kpi.pairs_never_met.to_string()),
        ("max co-occurrence", kpi.max_co_occurrence.to_string()),
        ("repeated partners", kpi.repeated_partner_pairs.to_string()),
        ("repeated bench pairs", kpi.repeated_bench_pairs.to_string()),
        ("back-to-back repeats", kpi.back_to_back_repeats.to_string()),
        ("max court spread", kpi.max_court_spread.to_string()),
        (
            "players at max spread",
            kpi.players_at_max_court_spread.to_string(),
        ),
    ];
    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{label:>22}: {value}");
    }
    out
}

//! Collected results and their text/JSON rendering.

use crate::config::TimeUnit;
use crate::digest::BenchCase;
use crate::executor::ForkOutcome;
use crate::stats::mean_of_means;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Write as _;
use std::time::Duration;

/// All fork outcomes of one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub case: BenchCase,
    pub outcomes: Vec<ForkOutcome>,
}

impl CaseReport {
    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.successful()
    }

    /// Mean of the per-fork means; `None` means no data.
    pub fn grand_mean(&self) -> Option<Duration> {
        mean_of_means(self.outcomes.iter().filter_map(ForkOutcome::result))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub forks: usize,
    pub time_unit: TimeUnit,
    pub cases: Vec<CaseReport>,
}

impl BenchmarkReport {
    pub fn failed_forks(&self) -> usize {
        self.cases.iter().map(CaseReport::failed).sum()
    }
}

const HEADERS: [&str; 5] = ["Implementation", "Algorithm", "Mean", "Unit", "Forks"];

/// Renders a report in a fixed unit.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    unit: TimeUnit,
}

impl Reporter {
    pub fn new(unit: TimeUnit) -> Self {
        Self { unit }
    }

    pub fn format_mean(&self, mean: Option<Duration>) -> String {
        match mean {
            Some(d) => format!("{:.3}", self.unit.convert(d)),
            None => "no data".to_string(),
        }
    }

    /// Aligned table with one row per case, followed by the reasons of any
    /// failed forks. Cases without a single successful fork still get a row.
    pub fn render(&self, report: &BenchmarkReport) -> String {
        let rows: Vec<[String; 5]> = report
            .cases
            .iter()
            .map(|c| {
                [
                    c.case.implementation.to_string(),
                    c.case.algorithm.to_string(),
                    self.format_mean(c.grand_mean()),
                    self.unit.label().to_string(),
                    format!("{}/{}", c.successful(), report.forks),
                ]
            })
            .collect();

        let mut widths = HEADERS.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let mut out = String::new();
        write_row(&mut out, &widths, HEADERS.iter().copied());
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_row(&mut out, &widths, rule.iter().map(String::as_str));
        for row in &rows {
            write_row(&mut out, &widths, row.iter().map(String::as_str));
        }

        if report.failed_forks() > 0 {
            out.push_str("\nFailed forks:\n");
            for case in &report.cases {
                for outcome in &case.outcomes {
                    if let ForkOutcome::Failed { fork, error } = outcome {
                        let _ = writeln!(out, "  {} fork {}: {}", case.case, fork, error);
                    }
                }
            }
        }
        out
    }

    /// Pretty JSON with the summary numbers converted to the report unit and
    /// the raw fork outcomes attached.
    pub fn render_json(&self, report: &BenchmarkReport) -> serde_json::Result<String> {
        let cases: Vec<_> = report
            .cases
            .iter()
            .map(|c| {
                json!({
                    "implementation": c.case.implementation,
                    "algorithm": c.case.algorithm,
                    "mean": c.grand_mean().map(|d| self.unit.convert(d)),
                    "unit": self.unit.label(),
                    "successful_forks": c.successful(),
                    "forks": report.forks,
                    "outcomes": c.outcomes,
                })
            })
            .collect();
        serde_json::to_string_pretty(&json!({
            "forks": report.forks,
            "time_unit": self.unit.label(),
            "cases": cases,
        }))
    }
}

fn write_row<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    let line: Vec<String> = cells
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &width))| {
            // Numeric-ish columns (mean) are right-aligned.
            if i == 2 {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

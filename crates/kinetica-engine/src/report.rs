//! # Report Assembly
//!
//! End-of-run summary of a simulation, exportable as JSON.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use kinetica_models::PointId;

use crate::point::PointMetrics;

/// Summary of one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub start_time: f64,
    pub end_time: f64,
    /// Where the clock actually stopped (equals `end_time` on a clean run,
    /// earlier when the audit halted the simulation).
    pub final_time: f64,
    pub instants: u64,
    pub total_internal_events: u64,
    pub total_external_events: u64,
    pub total_messages_sent: u64,
    pub total_messages_received: u64,
    pub points: Vec<PointReportRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointReportRow {
    pub point: PointId,
    pub live_certificates: usize,
    pub metrics: PointMetrics,
}

impl SimulationReport {
    /// Export as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Simulation report written to {}", path.display());
        Ok(())
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Summary ===")?;
        writeln!(
            f,
            "Time: {} -> {} (configured end {})",
            self.start_time, self.final_time, self.end_time
        )?;
        writeln!(f, "Instants: {}", self.instants)?;
        writeln!(
            f,
            "Events: internal={} external={}",
            self.total_internal_events, self.total_external_events
        )?;
        writeln!(
            f,
            "Messages: sent={} received={}",
            self.total_messages_sent, self.total_messages_received
        )?;
        writeln!(f)?;

        writeln!(f, "POINTS:")?;
        for row in &self.points {
            writeln!(
                f,
                "  {} | certs: {} | events: int={} ext={} | msgs: out={} in={} | refits: {}{}",
                row.point,
                row.live_certificates,
                row.metrics.internal_events,
                row.metrics.external_events,
                row.metrics.sent_messages,
                row.metrics.received_messages,
                row.metrics.recomputed_polynomials,
                if row.metrics.changed { " | changed" } else { "" },
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> SimulationReport {
        SimulationReport {
            start_time: 0.0,
            end_time: 10.0,
            final_time: 10.0,
            instants: 3,
            total_internal_events: 2,
            total_external_events: 1,
            total_messages_sent: 4,
            total_messages_received: 4,
            points: vec![PointReportRow {
                point: PointId(0),
                live_certificates: 1,
                metrics: PointMetrics {
                    sent_messages: 4,
                    received_messages: 4,
                    internal_events: 2,
                    external_events: 1,
                    recomputed_polynomials: 0,
                    changed: true,
                },
            }],
        }
    }

    #[test]
    fn renders_summary() {
        let text = sample_report().to_string();
        assert!(text.contains("=== Simulation Summary ==="));
        assert!(text.contains("p0 | certs: 1"));
        assert!(text.contains("changed"));
    }

    #[test]
    fn writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        sample_report().write_json(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"instants\": 3"));
    }
}

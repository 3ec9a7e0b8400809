// Per-Iteration JSONL Bound Trace
// Outputs one JSON line per published bound for independent analysis

use lagranger_spoke::BoundRecord;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct BoundSnapshot {
    pub iteration: u64,
    pub bound: f64,
    /// Change from the previous published bound (0 for the first).
    pub delta: f64,
    pub best_so_far: f64,
}

pub struct BoundTrace {
    snapshots: Vec<BoundSnapshot>,
}

impl BoundTrace {
    pub fn from_records(records: &[BoundRecord]) -> Self {
        let mut snapshots = Vec::with_capacity(records.len());
        let mut prev: Option<f64> = None;
        let mut best = f64::NEG_INFINITY;
        for r in records {
            best = best.max(r.value);
            snapshots.push(BoundSnapshot {
                iteration: r.iteration,
                bound: r.value,
                delta: prev.map(|p| r.value - p).unwrap_or(0.0),
                best_so_far: best,
            });
            prev = Some(r.value);
        }
        Self { snapshots }
    }

    /// Write all snapshots to a JSONL file
    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        for snapshot in &self.snapshots {
            let line = serde_json::to_string(snapshot)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

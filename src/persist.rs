// Copyright © 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Append-only CSV persistence of W and xbar values.
//!
//! Each append starts with a `#iteration number,<n>` marker row so several
//! iterations can share one file.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::capability::{RecordKind, RecordSink};
use crate::types::Scenario;

pub const W_FILE: &str = "lagranger_w_vals.csv";
pub const XBAR_FILE: &str = "lagranger_xbar_vals.csv";

#[derive(Debug, Clone)]
pub struct CsvRecordSink {
    dir: PathBuf,
}

impl CsvRecordSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: RecordKind) -> PathBuf {
        match kind {
            RecordKind::Weights => self.dir.join(W_FILE),
            RecordKind::ReferencePoint => self.dir.join(XBAR_FILE),
        }
    }

    fn open_append(path: &Path) -> io::Result<BufWriter<std::fs::File>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }
}

impl RecordSink for CsvRecordSink {
    fn append_record(
        &mut self,
        kind: RecordKind,
        iteration: u64,
        scenarios: &[Scenario],
    ) -> io::Result<()> {
        let mut out = Self::open_append(&self.path_for(kind))?;
        writeln!(out, "#iteration number,{}", iteration)?;
        match kind {
            RecordKind::Weights => {
                for scenario in scenarios {
                    for (index, slot) in &scenario.nonants {
                        writeln!(out, "{},{},{},{}", scenario.name, index.node, index.slot, slot.w)?;
                    }
                }
            }
            RecordKind::ReferencePoint => {
                // xbar is identical across local scenarios after compute_xbar
                if let Some(first) = scenarios.first() {
                    for (index, slot) in &first.nonants {
                        writeln!(out, "{},{},{}", index.node, index.slot, slot.xbar)?;
                    }
                }
            }
        }
        out.flush()
    }
}

use std::{fs::File, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use static_queue::sync::Mutex;

/// One row of the consumption trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumption {
    pub consumer: usize,
    pub producer: u16,
    pub seq: u32,
}

/// CSV sink shared by all consumer threads.
pub struct TraceWriter {
    writer: Mutex<csv::Writer<File>>,
}

impl TraceWriter {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("Creating trace file {}", path.display()))?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }

    pub fn record(&self, row: Consumption) -> anyhow::Result<()> {
        self.writer
            .lock()
            .serialize(row)
            .context("Writing trace row failed")
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        self.writer.lock().flush().context("Flushing trace failed")
    }
}

#[cfg(test)]
mod test {
    use super::{Consumption, TraceWriter};

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");

        let trace = TraceWriter::create(&path).unwrap();
        trace
            .record(Consumption {
                consumer: 0,
                producer: 2,
                seq: 7,
            })
            .unwrap();
        trace.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "consumer,producer,seq\n0,2,7\n");
    }
}

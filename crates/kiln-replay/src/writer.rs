//! Streaming log writer.
//!
//! [`LogWriter`] writes the opening of the document and the initial state
//! on construction, one diff per [`write_diff`](LogWriter::write_diff),
//! and the closing brackets on [`finish`](LogWriter::finish). A writer
//! dropped before `finish` leaves an incomplete document.

use std::io::Write;

use kiln_core::{ResultLog, SimulationState, StateDiff};

use crate::error::ReplayError;
use crate::records::{DiffRecord, StateRecord};

/// Writes a result log to a byte stream as it is produced.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use `BufWriter<File>`.
///
/// # Examples
///
/// ```
/// use kiln_core::{GeneralState, SimulationState, SiteId, SiteState, StateDiff};
/// use kiln_replay::{read_log, LogWriter};
///
/// let initial = SimulationState::new(vec![SiteState::new("A", 1.0); 2], GeneralState::default());
/// let mut writer = LogWriter::new(Vec::new(), &initial).unwrap();
/// let mut diff = StateDiff::empty();
/// diff.set_site(SiteId(1), SiteState::new("B", 1.0));
/// writer.write_diff(&diff).unwrap();
/// assert_eq!(writer.diffs_written(), 1);
/// let buf = writer.finish().unwrap();
///
/// let log = read_log(buf.as_slice()).unwrap();
/// assert_eq!(log.len(), 1);
/// assert_eq!(log.final_state().sites[1].phase, "B");
/// ```
pub struct LogWriter<W: Write> {
    writer: Option<W>,
    diffs_written: u64,
}

impl<W: Write> LogWriter<W> {
    /// Create a writer, immediately writing `initial`.
    pub fn new(mut writer: W, initial: &SimulationState) -> Result<Self, ReplayError> {
        writer.write_all(b"{\"initial_state\":")?;
        serde_json::to_writer(&mut writer, &StateRecord::from(initial))?;
        writer.write_all(b",\"diffs\":[")?;
        Ok(Self {
            writer: Some(writer),
            diffs_written: 0,
        })
    }

    fn sink(&mut self) -> Result<&mut W, ReplayError> {
        self.writer.as_mut().ok_or(ReplayError::Finished)
    }

    /// Append one diff.
    pub fn write_diff(&mut self, diff: &StateDiff) -> Result<(), ReplayError> {
        let first = self.diffs_written == 0;
        let w = self.sink()?;
        if !first {
            w.write_all(b",")?;
        }
        serde_json::to_writer(&mut *w, &DiffRecord::from(diff))?;
        self.diffs_written += 1;
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), ReplayError> {
        self.sink()?.flush()?;
        Ok(())
    }

    /// Number of diffs written so far.
    pub fn diffs_written(&self) -> u64 {
        self.diffs_written
    }

    /// Close the document, flush, and return the underlying sink.
    pub fn finish(mut self) -> Result<W, ReplayError> {
        let mut w = self.writer.take().ok_or(ReplayError::Finished)?;
        w.write_all(b"]}")?;
        w.flush()?;
        Ok(w)
    }
}

/// Write a whole log to `writer` and return it.
pub fn write_log<W: Write>(writer: W, log: &ResultLog) -> Result<W, ReplayError> {
    let mut out = LogWriter::new(writer, log.initial_state())?;
    for diff in log.diffs() {
        out.write_diff(diff)?;
    }
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{GeneralState, SiteId, SiteState};

    fn initial() -> SimulationState {
        SimulationState::new(vec![SiteState::new("A", 1.0)], GeneralState::default())
    }

    #[test]
    fn empty_log_is_valid_json() {
        let buf = LogWriter::new(Vec::new(), &initial()).unwrap().finish().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["diffs"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["initial_state"]["sites"]["0"]["phase"], "A");
    }

    #[test]
    fn diffs_are_comma_separated() {
        let mut w = LogWriter::new(Vec::new(), &initial()).unwrap();
        for phase in ["B", "C", "D"] {
            let mut d = StateDiff::empty();
            d.set_site(SiteId(0), SiteState::new(phase, 1.0));
            w.write_diff(&d).unwrap();
        }
        let buf = w.finish().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["diffs"][2]["sites"]["0"]["phase"], "D");
    }

    #[test]
    fn write_log_matches_record_serialization() {
        let mut log = ResultLog::new(initial());
        let mut d = StateDiff::empty();
        d.general.temperature = Some(700.0);
        log.push(d).unwrap();
        let streamed = write_log(Vec::new(), &log).unwrap();
        let whole = serde_json::to_vec(&crate::records::LogRecord::from(&log)).unwrap();
        assert_eq!(streamed, whole);
    }
}

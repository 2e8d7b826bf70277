//! Log reader.

use std::io::Read;

use kiln_core::ResultLog;

use crate::error::ReplayError;
use crate::records::LogRecord;

/// Parse a log record from `reader` without replaying it.
pub fn read_record<R: Read>(reader: R) -> Result<LogRecord, ReplayError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Parse a log from `reader`, replaying every diff to validate it.
///
/// # Errors
///
/// - [`ReplayError::Json`] for input that is not a log document
/// - [`ReplayError::MalformedRecord`] for bad or missing site ids
/// - [`ReplayError::Sim`] for a diff that references a site outside the
///   grid
pub fn read_log<R: Read>(reader: R) -> Result<ResultLog, ReplayError> {
    read_record(reader)?.into_log()
}

//! CSV export of journal records.

use crate::domain::error::JournalError;
use crate::domain::record::Record;
use std::io::Write;

const HEADER: [&str; 11] = [
    "id",
    "createdAt",
    "currencyPair",
    "timeframe",
    "pattern",
    "direction",
    "confidence",
    "tradeExecuted",
    "tradeResult",
    "memo",
    "chartUrl",
];

/// Write `records` as CSV with a header row, in the order given.
pub fn write_records<W: Write>(writer: W, records: &[Record]) -> Result<(), JournalError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER).map_err(csv_error)?;

    for record in records {
        let confidence = record.confidence.to_string();
        let executed = record.trade_executed.to_string();
        let created_at = record.created_at.to_rfc3339();
        wtr.write_record([
            record.id.as_str(),
            created_at.as_str(),
            record.currency_pair.as_str(),
            record.timeframe.as_str(),
            record.pattern.as_str(),
            record.direction.as_str(),
            confidence.as_str(),
            executed.as_str(),
            record.trade_result.map(|r| r.as_str()).unwrap_or(""),
            record.memo.as_str(),
            record.chart_url.as_str(),
        ])
        .map_err(csv_error)?;
    }

    wtr.flush()?;
    Ok(())
}

fn csv_error(e: csv::Error) -> JournalError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => JournalError::Io(io),
        other => JournalError::Io(std::io::Error::other(format!("CSV write error: {other:?}"))),
    }
}

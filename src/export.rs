//! CSV export of a snapshot.

use std::io::Write;
use std::path::Path;

use crate::models::Snapshot;
use crate::utils::error::{AppError, Result};

pub const CSV_FILE_NAME: &str = "scraped_data.csv";
pub const CSV_HEADER: [&str; 4] = ["Name", "Price", "Link", "Image"];

/// Writes the header and one row per item, in result-set order.
pub fn write_csv<W: Write>(snapshot: &Snapshot, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(CSV_HEADER)?;
    for item in snapshot {
        csv_writer.write_record([item.name(), item.price_raw(), item.link(), item.image()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string(snapshot: &Snapshot) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(snapshot, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| AppError::Internal(e.to_string()))
}

pub fn write_csv_file(snapshot: &Snapshot, path: impl AsRef<Path>) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_csv(snapshot, file)?;
    tracing::info!(path = %path.as_ref().display(), rows = snapshot.len(), "Wrote CSV export");
    Ok(())
}

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::PrettyFormatter;

use super::{OutputFormat, WriteError};
use crate::container::TextContainer;

/// Column-ordered JSON view of a container.
struct JsonColumns<'a>(&'a TextContainer);

impl Serialize for JsonColumns<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, rows) in self.0.columns() {
            map.serialize_entry(name, rows)?;
        }
        map.end()
    }
}

/// Write `container` to `writer` in `format`.
///
/// The container itself is left untouched; empty values are dropped from a
/// copy before serializing.
pub fn write_to<W: Write>(
    container: &TextContainer,
    format: OutputFormat,
    writer: W,
) -> Result<(), WriteError> {
    let mut cleaned = container.clone();
    cleaned.remove_null_value_per_column();

    match format {
        OutputFormat::Csv => write_delimited(&cleaned, b',', writer),
        OutputFormat::Tsv => write_delimited(&cleaned, b'\t', writer),
        OutputFormat::Json => write_json(&cleaned, writer),
    }
}

fn write_delimited<W: Write>(
    container: &TextContainer,
    delimiter: u8,
    writer: W,
) -> Result<(), WriteError> {
    if container.is_empty() {
        return Ok(());
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    let table = container.collate();
    csv_writer.write_record(table.header())?;
    for row in table.rows() {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn write_json<W: Write>(container: &TextContainer, writer: W) -> Result<(), WriteError> {
    let mut serializer =
        serde_json::Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
    JsonColumns(container).serialize(&mut serializer)?;
    Ok(())
}

/// `<dir>/<basename>.<ext>`.
pub fn output_path(dir: &Path, basename: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", basename, format.extension()))
}

/// Write `container` to a file, creating parent directories as needed.
pub fn save_to_path(
    container: &TextContainer,
    format: OutputFormat,
    path: &Path,
) -> Result<(), WriteError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    write_to(container, format, &mut writer)?;
    writer.flush()?;

    tracing::info!(
        "Wrote {} column(s) to {}",
        container.len(),
        path.display()
    );
    Ok(())
}

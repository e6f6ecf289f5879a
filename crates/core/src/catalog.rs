//! Catalog IO: raw CSV in, processed (normalized + embedded) JSON in and out.

use crate::error::CatalogError;
use crate::models::{Catalog, CatalogSide};
use crate::normalizer;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;
use tracing::{info, warn};

/// Reads a catalog CSV, normalizing the values of `name_column`.
///
/// Fails before any row is read when the column is absent. Rows with a blank
/// name are skipped.
pub fn read_csv(
    path: &Path,
    name_column: &str,
    side: CatalogSide,
) -> Result<Catalog, CatalogError> {
    let file = File::open(path)?;
    let catalog = read_csv_from(file, &path.display().to_string(), name_column, side)?;
    info!(
        "loaded {} {} records from {}",
        catalog.len(),
        side,
        path.display()
    );
    Ok(catalog)
}

pub fn read_csv_from<R: Read>(
    input: R,
    source: &str,
    name_column: &str,
    side: CatalogSide,
) -> Result<Catalog, CatalogError> {
    let csv_err = |source_err: csv::Error| CatalogError::Csv {
        path: source.into(),
        source: source_err,
    };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = headers
        .iter()
        .position(|h| h.trim() == name_column)
        .ok_or_else(|| CatalogError::SchemaMismatch {
            path: source.to_string(),
            column: name_column.to_string(),
            found: headers.iter().collect::<Vec<_>>().join(", "),
        })?;

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.map_err(csv_err)?;
        let name = row.get(column).unwrap_or_default().trim();
        if name.is_empty() {
            warn!("{}: skipping row {} with blank `{}`", source, idx + 1, name_column);
            continue;
        }
        records.push(normalizer::normalize(name));
    }
    Ok(Catalog::new(side, records))
}

pub fn save_processed(path: &Path, catalog: &Catalog) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, catalog).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_processed(path: &Path) -> Result<Catalog, CatalogError> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Checks every embedding in both catalogs has the same length.
///
/// Returns that length, or `None` when nothing is embedded.
pub fn validate_dimensions(
    external: &Catalog,
    internal: &Catalog,
) -> Result<Option<usize>, CatalogError> {
    let mut expected: Option<usize> = None;
    for record in external.records().iter().chain(internal.records()) {
        let Some(vector) = record.embedding.as_ref() else {
            continue;
        };
        match expected {
            None => expected = Some(vector.len()),
            Some(dim) if dim != vector.len() => {
                return Err(CatalogError::DimensionMismatch {
                    name: record.original_name.clone(),
                    expected: dim,
                    found: vector.len(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(expected)
}

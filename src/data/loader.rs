// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads the labelled TCO measurement table from CSV.
//
// Expected header (extra columns are ignored, order is free):
//   Material,Wavelength,AbsorptionRate,Transmission,OpticalDensity
//
// What the loader checks:
//   - every required column is present (else DataFormatError
//     listing ALL missing columns, before any row is read)
//   - every non-empty feature cell parses as a number
//
// What it does NOT check:
//   - value ranges; those are only enforced at inference time
//
// Rows with an empty cell are incomplete. They are excluded
// and counted so the caller can report how many were dropped.
// A missing-value marker ("NA", "null", ...) or a cell that
// parses to NaN / ±inf counts as empty.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use std::{fs::File, io::Read, path::PathBuf};

use crate::domain::errors::DataFormatError;
use crate::domain::feature_schema::{Feature, FeatureVector, FEATURES, LABEL_COLUMN, N_FEATURES};
use crate::domain::measurement::{Measurement, MeasurementTable};
use crate::domain::traits::MeasurementSource;

/// Cell texts read as "no value" (the pandas defaults that are not numbers).
const MISSING_MARKERS: [&str; 8] = ["NA", "N/A", "n/a", "#N/A", "NULL", "null", "None", "<NA>"];

/// Loads measurements from a CSV file on disk.
/// Implements the MeasurementSource trait from Layer 3.
pub struct CsvMeasurementLoader {
    path: PathBuf,
}

impl CsvMeasurementLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MeasurementSource for CsvMeasurementLoader {
    fn load(&self) -> Result<MeasurementTable, DataFormatError> {
        tracing::info!("Loading measurements from '{}'", self.path.display());
        let file  = File::open(&self.path)?;
        let table = read_measurements(file)?;

        if table.skipped_incomplete > 0 {
            tracing::warn!(
                "Excluded {} incomplete row(s) from '{}'",
                table.skipped_incomplete,
                self.path.display()
            );
        }
        tracing::info!("Loaded {} complete measurement rows", table.len());
        Ok(table)
    }
}

/// Parse measurements from any CSV byte stream.
pub fn read_measurements<R: Read>(reader: R) -> Result<MeasurementTable, DataFormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataFormatError::Csv(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    // ── Column presence ───────────────────────────────────────────────────────
    let position = |name: &str| headers.iter().position(|h| h == name);

    let mut missing = Vec::new();
    let label_idx = position(LABEL_COLUMN);
    if label_idx.is_none() {
        missing.push(LABEL_COLUMN.to_string());
    }
    let feature_idx: Vec<Option<usize>> = Feature::ALL.iter().map(|f| position(f.spec().column)).collect();
    for (spec, idx) in FEATURES.iter().zip(&feature_idx) {
        if idx.is_none() {
            missing.push(spec.column.to_string());
        }
    }
    let (Some(label_idx), true) = (label_idx, missing.is_empty()) else {
        return Err(DataFormatError::MissingColumns { missing });
    };
    let feature_idx: Vec<usize> = feature_idx.into_iter().flatten().collect();

    // ── Rows ──────────────────────────────────────────────────────────────────
    let mut table = MeasurementTable::default();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataFormatError::Csv(e.to_string()))?;
        // 1-based data row, header excluded
        let row = row_no + 1;

        let material = record.get(label_idx).unwrap_or("");
        if material.is_empty() {
            table.skipped_incomplete += 1;
            continue;
        }

        let mut features: FeatureVector = [0.0; N_FEATURES];
        let mut complete = true;
        for (&col, spec) in feature_idx.iter().zip(FEATURES.iter()) {
            let cell = record.get(col).unwrap_or("");
            if cell.is_empty() || MISSING_MARKERS.contains(&cell) {
                complete = false;
                break;
            }
            let value = cell.parse::<f64>().map_err(|_| DataFormatError::InvalidNumber {
                row,
                column: spec.column.to_string(),
                value:  cell.to_string(),
            })?;
            // "NaN", "inf" and friends parse, but are not measurements
            if !value.is_finite() {
                complete = false;
                break;
            }
            features[spec.feature.index()] = value;
        }

        if complete {
            table.rows.push(Measurement::new(material, features));
        } else {
            table.skipped_incomplete += 1;
        }
    }

    if table.is_empty() {
        return Err(DataFormatError::Empty);
    }
    Ok(table)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_reordered_to_schema() {
        // CSV columns deliberately shuffled relative to the schema
        let csv = "OpticalDensity,Material,Transmission,Wavelength,AbsorptionRate\n\
                   120,ITO,80,500,0.3\n\
                   90,FTO,70,450,0.2\n";
        let table = read_measurements(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].material, "ITO");
        assert_eq!(table.rows[0].features, [500.0, 0.3, 80.0, 120.0]);
        assert_eq!(table.rows[1].features[Feature::OpticalDensity.index()], 90.0);
        assert_eq!(table.feature_matrix()[1], vec![450.0, 0.2, 70.0, 90.0]);
    }

    #[test]
    fn test_missing_columns_are_all_reported() {
        let csv = "Material,Wavelength,Transmission\nITO,500,80\n";
        match read_measurements(csv.as_bytes()) {
            Err(DataFormatError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["AbsorptionRate", "OpticalDensity"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_incomplete_rows_are_excluded() {
        let csv = "Material,Wavelength,AbsorptionRate,Transmission,OpticalDensity\n\
                   ITO,500,0.3,80,120\n\
                   FTO,,0.2,70,90\n\
                   ,450,0.2,70,90\n";
        let table = read_measurements(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped_incomplete, 2);
    }

    #[test]
    fn test_nan_and_infinite_cells_are_incomplete() {
        let csv = "Material,Wavelength,AbsorptionRate,Transmission,OpticalDensity\n\
                   ITO,500,NaN,80,120\n\
                   FTO,450,0.2,inf,90\n\
                   AZO,400,0.1,60,-Infinity\n\
                   ITO,510,nan,81,121\n\
                   ITO,505,0.3,80,118\n";
        let table = read_measurements(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped_incomplete, 4);
        assert_eq!(table.rows[0].features, [505.0, 0.3, 80.0, 118.0]);
        assert!(table.feature_matrix().iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_missing_value_markers_are_incomplete() {
        let csv = "Material,Wavelength,AbsorptionRate,Transmission,OpticalDensity\n\
                   ITO,500,NA,80,120\n\
                   FTO,null,0.2,70,90\n\
                   AZO,400,0.1,60,50\n";
        let table = read_measurements(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped_incomplete, 2);
        assert_eq!(table.rows[0].material, "AZO");
    }

    #[test]
    fn test_non_numeric_cell_is_a_format_error() {
        let csv = "Material,Wavelength,AbsorptionRate,Transmission,OpticalDensity\n\
                   ITO,500,high,80,120\n";
        match read_measurements(csv.as_bytes()) {
            Err(DataFormatError::InvalidNumber { row, column, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "AbsorptionRate");
            }
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_values_are_kept() {
        let csv = "Material,Wavelength,AbsorptionRate,Transmission,OpticalDensity\n\
                   ITO,950,1.5,80,120\n";
        let table = read_measurements(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0].features[0], 950.0);
    }

    #[test]
    fn test_header_only_is_empty() {
        let csv = "Material,Wavelength,AbsorptionRate,Transmission,OpticalDensity\n";
        assert!(matches!(read_measurements(csv.as_bytes()), Err(DataFormatError::Empty)));
    }
}

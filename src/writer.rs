//! Result table persistence.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rusqlite::{params, Connection};
use tracing::info;

use crate::config::{OutputConfig, OutputFormat};
use crate::error::WriteError;
use crate::model::{PriceRecommendation, RecommendationRecord};

pub fn write_results(output: &OutputConfig, rows: &[PriceRecommendation]) -> Result<(), WriteError> {
    match output.format {
        OutputFormat::Csv => write_csv(&output.path, rows)?,
        OutputFormat::Json => write_json(&output.path, rows)?,
        OutputFormat::Sqlite => write_sqlite(&output.path, &output.table, rows)?,
    }
    info!(path = %output.path.display(), format = ?output.format, rows = rows.len(), "results written");
    Ok(())
}

fn records(rows: &[PriceRecommendation]) -> impl Iterator<Item = RecommendationRecord> + '_ {
    rows.iter().map(RecommendationRecord::from)
}

/// Undefined values become empty cells.
pub fn write_csv(path: &Path, rows: &[PriceRecommendation]) -> Result<(), WriteError> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(HEADER)?;
    }
    for record in records(rows) {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json(path: &Path, rows: &[PriceRecommendation]) -> Result<(), WriteError> {
    let mut out = BufWriter::new(File::create(path)?);
    let records: Vec<RecommendationRecord> = records(rows).collect();
    serde_json::to_writer_pretty(&mut out, &records)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

const HEADER: [&str; 10] = [
    "delta",
    "part_number",
    "historical_optimal_price",
    "competitor_adjusted_price",
    "demand_target_price",
    "predicted_quantity",
    "elasticity",
    "intercept",
    "days_analyzed",
    "outliers",
];

/// Replace `table` with the given rows in a single transaction.
pub fn write_sqlite(path: &Path, table: &str, rows: &[PriceRecommendation]) -> Result<(), WriteError> {
    let mut conn = Connection::open(path)?;
    let table = format!("\"{}\"", table.replace('"', "\"\""));

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (
            row_order INTEGER PRIMARY KEY,
            delta REAL NOT NULL,
            part_number TEXT NOT NULL,
            historical_optimal_price REAL,
            competitor_adjusted_price REAL NOT NULL,
            demand_target_price REAL,
            predicted_quantity REAL,
            elasticity REAL,
            intercept REAL,
            days_analyzed INTEGER NOT NULL,
            outliers TEXT NOT NULL
         );"
    ))?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ))?;
        for (i, r) in records(rows).enumerate() {
            stmt.execute(params![
                i as i64,
                r.delta,
                r.part_number,
                r.historical_optimal_price,
                r.competitor_adjusted_price,
                r.demand_target_price,
                r.predicted_quantity,
                r.elasticity,
                r.intercept,
                r.days_analyzed as i64,
                r.outliers,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Plain-text summary with values rounded to two decimals.
pub fn summary_table(rows: &[PriceRecommendation]) -> String {
    fn opt(v: Option<f64>) -> String {
        v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string())
    }

    let mut out = format!(
        "{:>6} {:<16} {:>12} {:>12} {:>12} {:>10} {:>10}  {}\n",
        "delta", "part", "hist_opt", "adjusted", "demand", "pred_qty", "elast", "outliers"
    );
    for r in rows {
        out.push_str(&format!(
            "{:>6.2} {:<16} {:>12} {:>12.2} {:>12} {:>10} {:>10}  {}\n",
            r.delta,
            r.product_id,
            opt(r.historical_optimal_price),
            r.competitor_adjusted_price,
            opt(r.demand_target_price),
            opt(r.predicted_quantity),
            opt(r.elasticity),
            r.outliers.render(),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutlierScan;

    fn rows() -> Vec<PriceRecommendation> {
        vec![
            PriceRecommendation {
                delta: 0.05,
                product_id: "A".to_string(),
                historical_optimal_price: Some(28000.0),
                competitor_adjusted_price: 28000.0,
                demand_target_price: None,
                predicted_quantity: Some(4.25),
                elasticity: Some(-12.5),
                intercept: Some(130.0),
                days_analyzed: 4,
                outliers: OutlierScan::None,
            },
            PriceRecommendation {
                delta: 0.06,
                product_id: "B".to_string(),
                historical_optimal_price: Some(29000.0),
                competitor_adjusted_price: 28500.0,
                demand_target_price: Some(27000.0),
                predicted_quantity: None,
                elasticity: None,
                intercept: None,
                days_analyzed: 3,
                outliers: OutlierScan::Found(vec!["35000:1".into(), "28000:40".into()]),
            },
        ]
    }

    #[test]
    fn test_write_csv_empty_cells_for_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &rows()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER.join(","));
        assert_eq!(lines[1], "0.05,A,28000.0,28000.0,,4.25,-12.5,130.0,4,none");
        assert!(lines[2].ends_with(",3,\"35000:1, 28000:40\""));
    }

    #[test]
    fn test_write_csv_no_rows_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), HEADER.join(","));
    }

    #[test]
    fn test_write_json_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &rows()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert!(value[0]["demand_target_price"].is_null());
        assert_eq!(value[1]["outliers"], "35000:1, 28000:40");
    }

    #[test]
    fn test_write_sqlite_replaces_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.db");
        write_sqlite(&path, "recommendations", &rows()).unwrap();
        write_sqlite(&path, "recommendations", &rows()[..1]).unwrap();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM recommendations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let demand: Option<f64> = conn
            .query_row("SELECT demand_target_price FROM recommendations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(demand, None);
    }

    #[test]
    fn test_summary_table_rounds() {
        let text = summary_table(&rows());
        assert!(text.contains("28000.00"));
        assert!(text.contains("-12.50"));
        assert_eq!(text.lines().count(), 3);
    }
}

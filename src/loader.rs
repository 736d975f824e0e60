use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{types::ValueRef, Connection};
use tracing::{debug, info};

use crate::config::{ColumnMap, InputConfig, InputFormat};
use crate::error::LoadError;
use crate::model::{ProductGroup, RawRecord};

/// Read the configured input table and group it by part number.
pub fn load_groups(input: &InputConfig) -> Result<Vec<ProductGroup>, LoadError> {
    let records = match input.format {
        InputFormat::Csv => load_csv(&input.path, &input.columns)?,
        InputFormat::Sqlite => load_sqlite(&input.path, &input.table, &input.columns)?,
    };
    let groups = group_by_product(records);
    info!(path = %input.path.display(), products = groups.len(), "input loaded");
    Ok(groups)
}

/// Read a CSV file with a header row. Rows whose price or quantity do not
/// parse are dropped.
pub fn load_csv(path: &Path, columns: &ColumnMap) -> Result<Vec<RawRecord>, LoadError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let headers = reader.headers()?.clone();

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let date_idx = find(&columns.date)?;
    let part_idx = find(&columns.part_number)?;
    let price_idx = find(&columns.price)?;
    let qty_idx = find(&columns.quantity)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in reader.records() {
        let row = row?;
        let parsed = (|| {
            Some(RawRecord {
                date: row.get(date_idx)?.to_string(),
                part_number: row.get(part_idx)?.to_string(),
                price: row.get(price_idx)?.parse().ok()?,
                quantity: parse_quantity(row.get(qty_idx)?)?,
            })
        })();
        match parsed {
            Some(r) if !r.part_number.is_empty() => records.push(r),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, "unparseable CSV rows dropped");
    }
    Ok(records)
}

/// Whole-number quantities, also when written as `12.0`.
fn parse_quantity(text: &str) -> Option<i64> {
    if let Ok(q) = text.parse::<i64>() {
        return Some(q);
    }
    let f: f64 = text.parse().ok()?;
    (f.fract() == 0.0 && f.is_finite()).then_some(f as i64)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn cell_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        _ => None,
    }
}

fn cell_to_f64(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        _ => None,
    }
}

/// Read `table` from a SQLite database.
pub fn load_sqlite(path: &Path, table: &str, columns: &ColumnMap) -> Result<Vec<RawRecord>, LoadError> {
    let conn = Connection::open(path)?;

    let sql = format!(
        "SELECT {}, {}, {}, {} FROM {}",
        quote_ident(&columns.date),
        quote_ident(&columns.part_number),
        quote_ident(&columns.price),
        quote_ident(&columns.quantity),
        quote_ident(table),
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt.query_map([], |row| {
        let quantity = cell_to_f64(row.get_ref(3)?)
            .filter(|q| q.fract() == 0.0)
            .map(|q| q as i64);
        Ok(cell_to_string(row.get_ref(1)?).and_then(|part_number| {
            Some(RawRecord {
                date: cell_to_string(row.get_ref(0).ok()?).unwrap_or_default(),
                part_number,
                price: cell_to_f64(row.get_ref(2).ok()?)?,
                quantity: quantity?,
            })
        }))
    })?;

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in rows {
        match row? {
            Some(r) => records.push(r),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "incomplete SQLite rows dropped");
    }
    Ok(records)
}

/// Group rows by part number in ascending order. When every part number is
/// numeric they are ordered by value (`9` before `10`), otherwise as text.
/// Rows inside a group keep their input order.
pub fn group_by_product(records: Vec<RawRecord>) -> Vec<ProductGroup> {
    let mut map: BTreeMap<String, Vec<RawRecord>> = BTreeMap::new();
    for r in records {
        map.entry(r.part_number.clone()).or_default().push(r);
    }
    let mut groups: Vec<ProductGroup> = map
        .into_iter()
        .map(|(product_id, rows)| ProductGroup { product_id, rows })
        .collect();

    let numeric: Option<Vec<f64>> = groups
        .iter()
        .map(|g| g.product_id.trim().parse::<f64>().ok().filter(|v| !v.is_nan()))
        .collect();
    if let Some(keys) = numeric {
        let mut keyed: Vec<(f64, ProductGroup)> = keys.into_iter().zip(groups).collect();
        // stable: equal values such as "7" and "7.0" keep their text order
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        groups = keyed.into_iter().map(|(_, g)| g).collect();
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn columns() -> ColumnMap {
        ColumnMap::default()
    }

    #[test]
    fn test_load_csv_case_insensitive_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Part_Number,PRICE,Quantity,extra").unwrap();
        writeln!(file, "2024-01-01,A1,28000,5,x").unwrap();
        writeln!(file, "2024-01-02,A1,28500.5,4.0,y").unwrap();
        writeln!(file, "2024-01-03,A1,oops,4,z").unwrap();
        writeln!(file, "2024-01-04,,28000,4,z").unwrap();
        file.flush().unwrap();

        let records = load_csv(file.path(), &columns()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].price, 28500.5);
        assert_eq!(records[1].quantity, 4);
    }

    #[test]
    fn test_load_csv_missing_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,part_number,price").unwrap();
        file.flush().unwrap();

        let err = load_csv(file.path(), &columns()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(c) if c == "quantity"));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("7"), Some(7));
        assert_eq!(parse_quantity("-2"), Some(-2));
        assert_eq!(parse_quantity("3.0"), Some(3));
        assert_eq!(parse_quantity("3.5"), None);
        assert_eq!(parse_quantity(""), None);
    }

    #[test]
    fn test_load_sqlite_mixed_cell_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE \"BASE_MODELOS\" (date TEXT, part_number, price, quantity);
             INSERT INTO \"BASE_MODELOS\" VALUES ('2024-01-01', 1001, 28000, 5);
             INSERT INTO \"BASE_MODELOS\" VALUES ('2024-01-02', '1001', 28100.5, 4);
             INSERT INTO \"BASE_MODELOS\" VALUES ('2024-01-03', 'B7', NULL, 4);",
        )
        .unwrap();
        drop(conn);

        let records = load_sqlite(&path, "BASE_MODELOS", &columns()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].part_number, "1001");
        assert_eq!(records[1].part_number, "1001");
        assert_eq!(records[1].price, 28100.5);
    }

    #[test]
    fn test_group_by_product_sorted_and_stable() {
        let rec = |part: &str, date: &str| RawRecord {
            date: date.to_string(),
            part_number: part.to_string(),
            price: 28000.0,
            quantity: 1,
        };
        let groups = group_by_product(vec![rec("B", "1"), rec("A", "2"), rec("B", "3")]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].product_id, "A");
        assert_eq!(groups[1].product_id, "B");
        let dates: Vec<&str> = groups[1].rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["1", "3"]);
    }

    #[test]
    fn test_group_by_product_numeric_ids_by_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE \"BASE_MODELOS\" (date TEXT, part_number INTEGER, price REAL, quantity INTEGER);
             INSERT INTO \"BASE_MODELOS\" VALUES ('2024-01-01', 100, 28000, 5);
             INSERT INTO \"BASE_MODELOS\" VALUES ('2024-01-01', 9, 28000, 5);
             INSERT INTO \"BASE_MODELOS\" VALUES ('2024-01-01', 10, 28000, 5);
             INSERT INTO \"BASE_MODELOS\" VALUES ('2024-01-02', 9, 28100, 4);",
        )
        .unwrap();
        drop(conn);

        let groups = group_by_product(load_sqlite(&path, "BASE_MODELOS", &columns()).unwrap());
        let ids: Vec<&str> = groups.iter().map(|g| g.product_id.as_str()).collect();
        assert_eq!(ids, vec!["9", "10", "100"]);
        assert_eq!(groups[0].rows.len(), 2);
    }

    #[test]
    fn test_group_by_product_mixed_ids_as_text() {
        let rec = |part: &str| RawRecord {
            date: String::new(),
            part_number: part.to_string(),
            price: 28000.0,
            quantity: 1,
        };
        let groups = group_by_product(vec![rec("10"), rec("9"), rec("A1")]);
        let ids: Vec<&str> = groups.iter().map(|g| g.product_id.as_str()).collect();
        assert_eq!(ids, vec!["10", "9", "A1"]);
    }
}

use std::path::Path;

use chrono::NaiveDate;

use crate::error::{CuadreError, Result};
use crate::models::StatementRow;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> f64 {
    let s = raw
        .replace(',', "")
        .replace('"', "")
        .replace("S/", "")
        .replace('$', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -inner.trim().parse::<f64>().unwrap_or(0.0);
    }
    if let Some(inner) = s.strip_prefix('-') {
        return -inner.trim().parse::<f64>().unwrap_or(0.0);
    }
    s.parse().unwrap_or(0.0)
}

/// Accepts `dd/mm/yyyy` (Peruvian bank exports) and ISO `yyyy-mm-dd`.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn normalize_header(cell: &str) -> String {
    cell.trim()
        .to_lowercase()
        .replace('ó', "o")
        .replace('é', "e")
}

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum AmountColumns {
    /// One signed amount column.
    Signed(usize),
    /// Separate debit (cargo) and credit (abono) columns, both unsigned.
    Split { cargo: usize, abono: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Layout {
    date: Option<usize>,
    description: usize,
    amount: AmountColumns,
}

fn detect_layout(record: &csv::StringRecord) -> Option<Layout> {
    let headers: Vec<String> = record.iter().map(normalize_header).collect();
    let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));

    let description = find(&["description", "descripcion", "concepto", "detalle"])?;
    let date = find(&["date", "fecha", "fecha operacion", "fecha proceso"]);
    let amount = match find(&["amount", "monto", "importe"]) {
        Some(col) => AmountColumns::Signed(col),
        None => AmountColumns::Split {
            cargo: find(&["cargo", "cargos", "debit"])?,
            abono: find(&["abono", "abonos", "credit"])?,
        },
    };
    Some(Layout {
        date,
        description,
        amount,
    })
}

fn row_amount(record: &csv::StringRecord, columns: AmountColumns) -> f64 {
    let cell = |i: usize| record.get(i).unwrap_or("");
    match columns {
        AmountColumns::Signed(col) => parse_amount(cell(col)),
        AmountColumns::Split { cargo, abono } => {
            parse_amount(cell(abono)).abs() - parse_amount(cell(cargo)).abs()
        }
    }
}

// ---------------------------------------------------------------------------
// read_statement
// ---------------------------------------------------------------------------

/// Read a bank-statement CSV. Lines before the header row (bank banners,
/// account numbers) are ignored, as are rows without a description.
pub fn read_statement(file_path: &Path) -> Result<Vec<StatementRow>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut layout: Option<Layout> = None;
    let mut rows = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let Some(cols) = layout else {
            layout = detect_layout(&record);
            continue;
        };
        let description = record.get(cols.description).unwrap_or("").trim().to_string();
        if description.is_empty() {
            tracing::debug!(line = line + 1, "skipping row without description");
            continue;
        }
        let date = cols
            .date
            .and_then(|i| record.get(i))
            .and_then(parse_date);
        rows.push(StatementRow {
            date,
            description,
            amount: row_amount(&record, cols.amount),
            kind: None,
        });
    }

    if layout.is_none() {
        return Err(CuadreError::Other(format!(
            "No header row with description and amount columns in {}",
            file_path.display()
        )));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("\"500.00\""), 500.0);
        assert_eq!(parse_amount("  -42.50  "), -42.5);
        assert_eq!(parse_amount("0"), 0.0);
        assert_eq!(parse_amount("not_a_number"), 0.0);
    }

    #[test]
    fn test_parse_amount_parenthesized_negatives() {
        assert_eq!(parse_amount("(500.00)"), -500.0);
        assert_eq!(parse_amount("(1,234.56)"), -1234.56);
    }

    #[test]
    fn test_parse_amount_currency_symbol() {
        assert_eq!(parse_amount("S/ 1,234.56"), 1234.56);
        assert_eq!(parse_amount("-S/ 50.00"), -50.0);
        assert_eq!(parse_amount("$20.00"), 20.0);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("15/01/2025"), Some("2025-01-15".to_string()));
        assert_eq!(parse_date("2024-12-01"), Some("2024-12-01".to_string()));
        assert_eq!(parse_date("31/02/2025"), None);
        assert_eq!(parse_date("invalid"), None);
    }

    #[test]
    fn test_read_signed_statement() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "stmt.csv",
            "Cuenta Corriente Soles,191-0000000-0-00\n\
             Fecha,Descripción,Monto\n\
             02/01/2025,ABONO HABERES,\"3,500.00\"\n\
             03/01/2025,PAGOS AFP INTEGRA,-420.10\n\
             04/01/2025,,10.00\n",
        );
        let rows = read_statement(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date.as_deref(), Some("2025-01-02"));
        assert_eq!(rows[0].description, "ABONO HABERES");
        assert_eq!(rows[0].amount, 3500.0);
        assert_eq!(rows[1].amount, -420.10);
        assert!(rows[1].kind.is_none());
    }

    #[test]
    fn test_read_split_cargo_abono_statement() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "bcp.csv",
            "Fecha,Concepto,Cargo,Abono\n\
             05/02/2025,ITF,0.25,\n\
             06/02/2025,DEVOL. FACTURA F001-12,,50.00\n",
        );
        let rows = read_statement(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, -0.25);
        assert_eq!(rows[1].amount, 50.0);
    }

    #[test]
    fn test_read_statement_without_header_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "bad.csv", "a,b,c\n1,2,3\n");
        assert!(read_statement(&path).is_err());
    }
}

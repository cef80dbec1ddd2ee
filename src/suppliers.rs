use std::collections::HashMap;
use std::path::Path;

use crate::conditions::ConditionTree;
use crate::error::Result;
use crate::models::Supplier;

/// Supplier names keyed by RUC.
#[derive(Debug, Default)]
pub struct SupplierDirectory {
    by_ruc: HashMap<String, Supplier>,
}

impl SupplierDirectory {
    pub fn from_suppliers(suppliers: Vec<Supplier>) -> Self {
        let by_ruc = suppliers.into_iter().map(|s| (s.ruc.clone(), s)).collect();
        Self { by_ruc }
    }

    pub fn len(&self) -> usize {
        self.by_ruc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ruc.is_empty()
    }

    pub fn name_for(&self, ruc: &str) -> Option<&str> {
        self.by_ruc.get(ruc.trim()).map(|s| s.name.as_str())
    }

    /// `RUC (Name)` when the supplier is known, the bare value otherwise.
    pub fn label(&self, ruc: &str) -> String {
        match self.name_for(ruc) {
            Some(name) => format!("{ruc} ({name})"),
            None => ruc.to_string(),
        }
    }
}

/// Read a `ruc,name` CSV. A header row, blank lines and rows without a
/// numeric RUC are skipped.
pub fn load_suppliers(file_path: &Path) -> Result<Vec<Supplier>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut suppliers = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() < 2 {
            continue;
        }
        let ruc = record[0].trim();
        if ruc.is_empty() || !ruc.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        suppliers.push(Supplier {
            ruc: ruc.to_string(),
            name: record[1].trim().to_string(),
        });
    }
    Ok(suppliers)
}

/// Load the directory only when the tree has supplier leaves and a file is
/// configured; otherwise nothing is read.
pub fn directory_for(tree: &ConditionTree, file_path: Option<&Path>) -> Result<Option<SupplierDirectory>> {
    if !tree.needs_supplier_lookup() {
        return Ok(None);
    }
    let Some(path) = file_path else {
        tracing::debug!("supplier conditions present but no suppliers file configured");
        return Ok(None);
    };
    let directory = SupplierDirectory::from_suppliers(load_suppliers(path)?);
    tracing::debug!(count = directory.len(), "supplier directory loaded");
    Ok(Some(directory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{Condition, ConditionGroup, ConditionOperator, GroupOperator};

    fn write_suppliers(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("suppliers.csv");
        std::fs::write(
            &path,
            "ruc,name\n20100047218,Banco de Credito del Peru\n\n20512345678, Transportes Andinos SAC \nabc,Bad Row\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_load_suppliers_skips_header_and_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let suppliers = load_suppliers(&write_suppliers(dir.path())).unwrap();
        assert_eq!(suppliers.len(), 2);
        assert_eq!(suppliers[1].name, "Transportes Andinos SAC");
    }

    #[test]
    fn test_label() {
        let directory = SupplierDirectory::from_suppliers(vec![Supplier {
            ruc: "20512345678".into(),
            name: "Transportes Andinos SAC".into(),
        }]);
        assert_eq!(directory.label("20512345678"), "20512345678 (Transportes Andinos SAC)");
        assert_eq!(directory.label("1"), "1");
    }

    #[test]
    fn test_directory_only_loaded_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_suppliers(dir.path());

        let plain = ConditionTree::default();
        assert!(directory_for(&plain, Some(path.as_path())).unwrap().is_none());

        let missing = dir.path().join("missing.csv");
        // not needed, so the missing file is never opened
        assert!(directory_for(&plain, Some(missing.as_path())).unwrap().is_none());

        let supplier_tree = ConditionTree::new(ConditionGroup::new(
            GroupOperator::And,
            vec![Condition::new("supplier", ConditionOperator::Equals, "20100047218")],
        ));
        let directory = directory_for(&supplier_tree, Some(path.as_path())).unwrap().unwrap();
        assert_eq!(directory.name_for("20100047218"), Some("Banco de Credito del Peru"));
        assert!(directory_for(&supplier_tree, None).unwrap().is_none());
        assert!(directory_for(&supplier_tree, Some(missing.as_path())).is_err());
    }
}

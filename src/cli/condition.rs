use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{read_json, resolve, EditAction, LeafAttribute};
use crate::conditions::{
    from_json, to_json, ConditionGroup, ConditionTree, ConditionUpdate, SUPPLIER_FIELD,
};
use crate::error::{CuadreError, Result};
use crate::settings::Settings;
use crate::suppliers::{directory_for, SupplierDirectory};

pub fn normalize(file: &str) -> Result<()> {
    let tree = ConditionTree::from_value(&read_json(file)?)?;
    println!("{}", tree.to_json_pretty()?);
    Ok(())
}

fn add_group_rows(
    table: &mut Table,
    group: &ConditionGroup,
    path: &str,
    record: &serde_json::Value,
    suppliers: Option<&SupplierDirectory>,
) {
    let joiner = group.operator.as_str();
    for condition in &group.conditions {
        let (value, result) = if condition.is_complete() {
            let value = match suppliers {
                Some(dir) if condition.field == SUPPLIER_FIELD => dir.label(&condition.value),
                _ => condition.value.clone(),
            };
            let result = if condition.matches(record) {
                "yes".green().to_string()
            } else {
                "no".red().to_string()
            };
            (value, result)
        } else {
            (condition.value.clone(), "skipped".dimmed().to_string())
        };
        table.add_row(vec![
            Cell::new(path),
            Cell::new(joiner),
            Cell::new(&condition.field),
            Cell::new(condition.operator.as_str()),
            Cell::new(value),
            Cell::new(result),
        ]);
    }
    for (idx, child) in group.groups.iter().enumerate() {
        add_group_rows(table, child, &format!("{path}.{idx}"), record, suppliers);
    }
}

pub fn check(settings: &Settings, condition: &str, record: &str) -> Result<()> {
    let tree = ConditionTree::from_value(&read_json(condition)?)?;
    let record = read_json(record)?;
    let suppliers_file: Option<PathBuf> = settings.suppliers_file.as_deref().map(resolve);
    let suppliers = directory_for(&tree, suppliers_file.as_deref())?;

    let mut table = Table::new();
    table.set_header(vec!["Group", "Join", "Field", "Operator", "Value", "Match"]);
    add_group_rows(&mut table, &tree.root, "root", &record, suppliers.as_ref());
    println!("{table}");

    let referenced = tree.supplier_values();
    if !referenced.is_empty() {
        let labels: Vec<String> = referenced
            .iter()
            .map(|ruc| match &suppliers {
                Some(dir) => dir.label(ruc),
                None => ruc.to_string(),
            })
            .collect();
        println!("Suppliers: {}", labels.join(", "));
    }

    if tree.matches(&record) {
        println!("{}", "MATCH".green().bold());
    } else {
        println!("{}", "NO MATCH".red().bold());
    }
    Ok(())
}

fn parse_group_path(raw: &str) -> Result<Vec<usize>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("root") {
        return Ok(Vec::new());
    }
    raw.split('.')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| CuadreError::InvalidCondition(format!("bad group path: {raw}")))
        })
        .collect()
}

fn target_group<'a>(tree: &'a ConditionTree, path: &[usize], raw: &str) -> Result<&'a ConditionGroup> {
    tree.group_at(path)
        .ok_or_else(|| CuadreError::InvalidCondition(format!("no group at {raw}")))
}

fn check_index(group: &ConditionGroup, index: usize) -> Result<()> {
    if index >= group.conditions.len() {
        return Err(CuadreError::InvalidCondition(format!(
            "condition {index} out of range (group has {})",
            group.conditions.len()
        )));
    }
    Ok(())
}

fn apply(tree: &ConditionTree, action: EditAction) -> Result<ConditionTree> {
    let next = match action {
        EditAction::AddCondition { group } => {
            let path = parse_group_path(&group)?;
            target_group(tree, &path, &group)?;
            tree.add_condition(&path)
        }
        EditAction::RemoveCondition { group, index } => {
            let path = parse_group_path(&group)?;
            check_index(target_group(tree, &path, &group)?, index)?;
            tree.remove_condition(&path, index)
        }
        EditAction::Set {
            group,
            index,
            attribute,
            value,
        } => {
            let path = parse_group_path(&group)?;
            check_index(target_group(tree, &path, &group)?, index)?;
            let update = match attribute {
                LeafAttribute::Field => ConditionUpdate::Field(value),
                LeafAttribute::Operator => ConditionUpdate::Operator(value.parse()?),
                LeafAttribute::Value => ConditionUpdate::Value(value),
            };
            tree.update_condition(&path, index, update)
        }
        EditAction::Operator { group, operator } => {
            let path = parse_group_path(&group)?;
            target_group(tree, &path, &group)?;
            tree.update_group_operator(&path, operator)
        }
        EditAction::AddGroup { group } => {
            let path = parse_group_path(&group)?;
            target_group(tree, &path, &group)?;
            tree.add_group(&path)
        }
        EditAction::RemoveGroup { group } => {
            let path = parse_group_path(&group)?;
            if path.is_empty() {
                return Err(CuadreError::InvalidCondition(
                    "the root group cannot be removed".to_string(),
                ));
            }
            target_group(tree, &path, &group)?;
            tree.remove_group(&path)
        }
    };
    Ok(next)
}

pub fn edit(file: &str, action: EditAction) -> Result<()> {
    let stored = read_json(file)?;
    let root = from_json(&stored)?.into_iter().next().unwrap_or_default();
    let tree = apply(&ConditionTree::new(root), action)?;

    let json = serde_json::to_string_pretty(&to_json(std::slice::from_ref(&tree.root))?)?;
    std::fs::write(file, format!("{json}\n"))?;
    tracing::info!(file, "condition saved");
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{Condition, ConditionOperator, GroupOperator};

    #[test]
    fn test_parse_group_path() {
        assert_eq!(parse_group_path("root").unwrap(), Vec::<usize>::new());
        assert_eq!(parse_group_path("").unwrap(), Vec::<usize>::new());
        assert_eq!(parse_group_path("0.2").unwrap(), vec![0, 2]);
        assert!(parse_group_path("0.x").is_err());
    }

    #[test]
    fn test_apply_rejects_unknown_targets() {
        let tree = ConditionTree::default();
        assert!(apply(&tree, EditAction::AddCondition { group: "1".into() }).is_err());
        assert!(apply(&tree, EditAction::RemoveCondition { group: "root".into(), index: 3 }).is_err());
        assert!(apply(&tree, EditAction::RemoveGroup { group: "root".into() }).is_err());
        let bad_operator = EditAction::Set {
            group: "root".into(),
            index: 0,
            attribute: LeafAttribute::Operator,
            value: "between".into(),
        };
        assert!(apply(&tree, bad_operator).is_err());
    }

    #[test]
    fn test_apply_edits_nested_group() {
        let tree = apply(&ConditionTree::default(), EditAction::AddGroup { group: "root".into() }).unwrap();
        let tree = apply(
            &tree,
            EditAction::Set {
                group: "0".into(),
                index: 0,
                attribute: LeafAttribute::Field,
                value: "amount".into(),
            },
        )
        .unwrap();
        let tree = apply(
            &tree,
            EditAction::Set {
                group: "0".into(),
                index: 0,
                attribute: LeafAttribute::Operator,
                value: "less_than".into(),
            },
        )
        .unwrap();
        let tree = apply(
            &tree,
            EditAction::Operator {
                group: "0".into(),
                operator: GroupOperator::Or,
            },
        )
        .unwrap();
        let child = tree.group_at(&[0]).unwrap();
        assert_eq!(child.operator, GroupOperator::Or);
        assert_eq!(child.conditions[0], Condition::new("amount", ConditionOperator::LessThan, ""));

        let removed = apply(&tree, EditAction::RemoveGroup { group: "0".into() }).unwrap();
        assert!(removed.root.groups.is_empty());
    }
}

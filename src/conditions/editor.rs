use super::{Condition, ConditionGroup, ConditionOperator, ConditionTree, GroupOperator, SUPPLIER_FIELD};

/// One attribute of a leaf to replace.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionUpdate {
    Field(String),
    Operator(ConditionOperator),
    Value(String),
}

/// Editing transitions. Groups are addressed by a path of child indices
/// from the root: `&[]` is the root, `&[1]` is `root.groups[1]`. Every
/// transition returns a new tree; an unknown path or index returns an
/// unchanged copy.
impl ConditionTree {
    pub fn group_at(&self, path: &[usize]) -> Option<&ConditionGroup> {
        path.iter()
            .try_fold(&self.root, |group, &idx| group.groups.get(idx))
    }

    fn edit_group(&self, path: &[usize], edit: impl FnOnce(&mut ConditionGroup) -> bool) -> Self {
        let mut next = self.clone();
        let target = path
            .iter()
            .try_fold(&mut next.root, |group, &idx| group.groups.get_mut(idx));
        match target {
            Some(group) => {
                if !edit(group) {
                    tracing::debug!(?path, "condition edit ignored: index out of range");
                }
            }
            None => tracing::debug!(?path, "condition edit ignored: no such group"),
        }
        next
    }

    pub fn add_condition(&self, path: &[usize]) -> Self {
        self.edit_group(path, |group| {
            group.conditions.push(Condition::default());
            true
        })
    }

    /// Removing the last leaf leaves one empty leaf in its place.
    pub fn remove_condition(&self, path: &[usize], index: usize) -> Self {
        self.edit_group(path, |group| {
            if index >= group.conditions.len() {
                return false;
            }
            group.conditions.remove(index);
            if group.conditions.is_empty() {
                group.conditions.push(Condition::default());
            }
            true
        })
    }

    pub fn update_condition(&self, path: &[usize], index: usize, update: ConditionUpdate) -> Self {
        self.edit_group(path, |group| {
            let Some(condition) = group.conditions.get_mut(index) else {
                return false;
            };
            match update {
                ConditionUpdate::Field(field) => condition.field = field,
                ConditionUpdate::Operator(op) => condition.operator = op,
                ConditionUpdate::Value(value) => condition.value = value,
            }
            true
        })
    }

    pub fn update_group_operator(&self, path: &[usize], operator: GroupOperator) -> Self {
        self.edit_group(path, |group| {
            group.operator = operator;
            true
        })
    }

    /// Append a nested group (with one empty leaf) under the group at `path`.
    pub fn add_group(&self, path: &[usize]) -> Self {
        self.edit_group(path, |group| {
            group.groups.push(ConditionGroup::default());
            true
        })
    }

    /// Remove the nested group at `path`. The root cannot be removed.
    pub fn remove_group(&self, path: &[usize]) -> Self {
        let Some((&last, parent)) = path.split_last() else {
            tracing::debug!("condition edit ignored: the root group cannot be removed");
            return self.clone();
        };
        self.edit_group(parent, |group| {
            if last >= group.groups.len() {
                return false;
            }
            group.groups.remove(last);
            true
        })
    }

    /// Whether any leaf tests the supplier field, i.e. whether the supplier
    /// directory has to be loaded to display this tree.
    pub fn needs_supplier_lookup(&self) -> bool {
        self.root.leaves().iter().any(|c| c.field == SUPPLIER_FIELD)
    }

    /// Values of complete supplier leaves, in tree order.
    pub fn supplier_values(&self) -> Vec<&str> {
        self.root
            .leaves()
            .into_iter()
            .filter(|c| c.field == SUPPLIER_FIELD && c.is_complete())
            .map(|c| c.value.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount_tree() -> ConditionTree {
        ConditionTree::new(ConditionGroup::new(
            GroupOperator::And,
            vec![Condition::new("amount", ConditionOperator::GreaterThan, "100")],
        ))
    }

    #[test]
    fn test_add_condition_appends_empty_leaf() {
        let tree = amount_tree();
        let next = tree.add_condition(&[]);
        assert_eq!(next.root.conditions.len(), 2);
        assert_eq!(next.root.conditions[1], Condition::default());
        // original untouched
        assert_eq!(tree.root.conditions.len(), 1);
    }

    #[test]
    fn test_remove_condition_keeps_one_leaf() {
        let tree = amount_tree();
        let next = tree.remove_condition(&[], 0);
        assert_eq!(next.root.conditions, vec![Condition::default()]);
        let again = next.remove_condition(&[], 0);
        assert_eq!(again.root.conditions, vec![Condition::default()]);
    }

    #[test]
    fn test_remove_condition_from_longer_list() {
        let tree = amount_tree()
            .add_condition(&[])
            .update_condition(&[], 1, ConditionUpdate::Field("description".into()));
        let next = tree.remove_condition(&[], 0);
        assert_eq!(next.root.conditions.len(), 1);
        assert_eq!(next.root.conditions[0].field, "description");
    }

    #[test]
    fn test_update_condition_attributes() {
        let tree = ConditionTree::default()
            .update_condition(&[], 0, ConditionUpdate::Field("supplier".into()))
            .update_condition(&[], 0, ConditionUpdate::Operator(ConditionOperator::NotEquals))
            .update_condition(&[], 0, ConditionUpdate::Value("20512345678".into()));
        assert_eq!(
            tree.root.conditions[0],
            Condition::new("supplier", ConditionOperator::NotEquals, "20512345678")
        );
    }

    #[test]
    fn test_update_group_operator() {
        let tree = amount_tree().update_group_operator(&[], GroupOperator::Or);
        assert_eq!(tree.root.operator, GroupOperator::Or);
    }

    #[test]
    fn test_nested_group_editing() {
        let tree = amount_tree()
            .add_group(&[])
            .update_condition(&[0], 0, ConditionUpdate::Field("description".into()))
            .update_condition(&[0], 0, ConditionUpdate::Value("FLETE".into()))
            .update_group_operator(&[0], GroupOperator::Or);
        let child = tree.group_at(&[0]).unwrap();
        assert_eq!(child.operator, GroupOperator::Or);
        assert_eq!(child.conditions[0].value, "FLETE");

        let removed = tree.remove_group(&[0]);
        assert!(removed.root.groups.is_empty());
    }

    #[test]
    fn test_invalid_paths_leave_tree_unchanged() {
        let tree = amount_tree();
        assert_eq!(tree.add_condition(&[3]), tree);
        assert_eq!(tree.remove_condition(&[], 9), tree);
        assert_eq!(
            tree.update_condition(&[], 5, ConditionUpdate::Value("x".into())),
            tree
        );
        assert_eq!(tree.remove_group(&[]), tree);
        assert_eq!(tree.remove_group(&[0]), tree);
        assert!(tree.group_at(&[0]).is_none());
    }

    #[test]
    fn test_needs_supplier_lookup() {
        let tree = amount_tree();
        assert!(!tree.needs_supplier_lookup());
        let with_supplier = tree
            .add_group(&[])
            .update_condition(&[0], 0, ConditionUpdate::Field("supplier".into()));
        // incomplete supplier leaf still triggers the lookup, but has no value
        assert!(with_supplier.needs_supplier_lookup());
        assert!(with_supplier.supplier_values().is_empty());
        let filled = with_supplier.update_condition(&[0], 0, ConditionUpdate::Value("20100047218".into()));
        assert_eq!(filled.supplier_values(), vec!["20100047218"]);
    }
}

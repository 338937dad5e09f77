//! Resolves parent-name references into direct inheritance links.
//!
//! Runs after a full collection pass (full barrier: every scheduled parse
//! has returned) and again after each single-file re-parse. Each run clears
//! and rebuilds all links, which makes it idempotent.

use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

use crate::model::{ClassId, ClassTable};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Non-fatal: the class stays usable standalone (e.g. an intrinsic base
    /// class whose source is not in the scanned roots).
    #[error("parent class `{parent}` of `{class}` not found")]
    UnresolvedParent { class: String, parent: String },
    /// Fatal for the involved classes only; they are excluded from the
    /// resolvable hierarchy.
    #[error("inheritance cycle involving {}", classes.join(", "))]
    Cycle { classes: Vec<String> },
}

#[derive(Debug, Default)]
pub struct LinkReport {
    pub errors: Vec<LinkError>,
}

impl LinkReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Link every class's parent reference and rebuild the child index.
pub fn link(table: &mut ClassTable) -> LinkReport {
    let mut report = LinkReport::default();
    let ids: Vec<ClassId> = table.ids().collect();

    for &id in &ids {
        let class = table.get_mut(id);
        class.parent = None;
        class.children.clear();
        class.orphaned = false;
        class.cyclic = false;
    }

    // Parent resolution. Self-inheritance is left unlinked here and caught
    // as a one-class cycle below.
    for &id in &ids {
        let Some(parent_name) = table.get(id).parent_name.clone() else {
            continue;
        };
        match table.find(&parent_name) {
            Some(parent_id) if parent_id != id => {
                table.get_mut(id).parent = Some(parent_id);
            }
            Some(_) => {
                let name = table.get(id).name.clone();
                report.errors.push(LinkError::Cycle {
                    classes: vec![name],
                });
                table.get_mut(id).cyclic = true;
            }
            None => {
                let class = table.get_mut(id);
                class.orphaned = true;
                let err = LinkError::UnresolvedParent {
                    class: class.name.clone(),
                    parent: parent_name,
                };
                warn!("{err}");
                report.errors.push(err);
            }
        }
    }

    // Cycle detection: walk each class toward the root with a visited set.
    let mut reported: HashSet<Vec<ClassId>> = HashSet::new();
    for &id in &ids {
        if let Some(cycle) = find_cycle(table, id) {
            let mut key = cycle.clone();
            key.sort_by_key(|c| c.0);
            if reported.insert(key) {
                let names: Vec<String> =
                    cycle.iter().map(|&c| table.get(c).name.clone()).collect();
                let err = LinkError::Cycle { classes: names };
                warn!("{err}");
                report.errors.push(err);
            }
            for &member in &cycle {
                table.get_mut(member).cyclic = true;
            }
        }
    }

    // Sever cyclic classes from the hierarchy, then build the child index
    // from the surviving links.
    for &id in &ids {
        if table.get(id).cyclic {
            table.get_mut(id).parent = None;
        }
    }
    for &id in &ids {
        if let Some(parent_id) = table.get(id).parent {
            table.get_mut(parent_id).children.push(id);
        }
    }

    report
}

/// Members of the cycle reachable from `start`, if its ancestor chain loops.
/// Only the classes on the cycle itself are returned; classes that merely
/// inherit from a cyclic class are not part of it.
fn find_cycle(table: &ClassTable, start: ClassId) -> Option<Vec<ClassId>> {
    let mut seen = HashSet::new();
    let mut cursor = Some(start);
    while let Some(id) = cursor {
        if !seen.insert(id) {
            // `id` is the first repeated node: collect the loop from there.
            let mut cycle = vec![id];
            let mut walk = table.get(id).parent;
            while let Some(next) = walk {
                if next == id {
                    break;
                }
                cycle.push(next);
                walk = table.get(next).parent;
            }
            return Some(cycle);
        }
        cursor = table.get(id).parent;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassSymbol;
    use std::path::PathBuf;

    fn class(name: &str, parent: Option<&str>) -> ClassSymbol {
        ClassSymbol::new(
            name,
            parent.map(str::to_string),
            PathBuf::from(format!("{name}.uc")),
        )
    }

    fn table(specs: &[(&str, Option<&str>)]) -> ClassTable {
        ClassTable::from_classes(specs.iter().map(|&(n, p)| class(n, p)).collect())
    }

    #[test]
    fn links_parents_and_children() {
        let mut t = table(&[
            ("Object", None),
            ("Pawn", Some("Object")),
            ("Enemy", Some("Pawn")),
        ]);
        let report = link(&mut t);
        assert!(report.is_clean());

        let object = t.find("Object").unwrap();
        let pawn = t.find("Pawn").unwrap();
        let enemy = t.find("Enemy").unwrap();
        assert_eq!(t.get(pawn).parent, Some(object));
        assert_eq!(t.get(enemy).parent, Some(pawn));
        assert_eq!(t.get(object).children, vec![pawn]);
        assert_eq!(t.get(pawn).children, vec![enemy]);
    }

    #[test]
    fn missing_parent_marks_orphan_but_links_rest() {
        let mut t = table(&[("Pawn", Some("Actor")), ("Enemy", Some("Pawn"))]);
        let report = link(&mut t);
        assert_eq!(report.errors.len(), 1);

        let pawn = t.find("Pawn").unwrap();
        let enemy = t.find("Enemy").unwrap();
        assert!(t.get(pawn).orphaned);
        assert!(t.get(pawn).parent.is_none());
        assert_eq!(t.get(enemy).parent, Some(pawn));
    }

    #[test]
    fn detects_two_class_cycle_exactly() {
        let mut t = table(&[
            ("A", Some("B")),
            ("B", Some("A")),
            ("Object", None),
            ("Pawn", Some("Object")),
        ]);
        let report = link(&mut t);

        let cycles: Vec<&LinkError> = report
            .errors
            .iter()
            .filter(|e| matches!(e, LinkError::Cycle { .. }))
            .collect();
        assert_eq!(cycles.len(), 1);
        let LinkError::Cycle { classes } = cycles[0] else {
            unreachable!()
        };
        let mut involved = classes.clone();
        involved.sort();
        assert_eq!(involved, vec!["A", "B"]);

        let a = t.find("A").unwrap();
        let b = t.find("B").unwrap();
        assert!(t.get(a).cyclic && t.get(b).cyclic);
        assert!(t.get(a).parent.is_none() && t.get(b).parent.is_none());

        // Unrelated classes remain linked.
        let pawn = t.find("Pawn").unwrap();
        assert_eq!(t.get(pawn).parent, t.find("Object"));
    }

    #[test]
    fn self_inheritance_is_a_cycle() {
        let mut t = table(&[("Weird", Some("Weird"))]);
        let report = link(&mut t);
        assert!(!report.is_clean());
        let weird = t.find("Weird").unwrap();
        assert!(t.get(weird).cyclic);
    }

    #[test]
    fn relink_is_idempotent() {
        let mut t = table(&[("Object", None), ("Pawn", Some("Object"))]);
        link(&mut t);
        let report = link(&mut t);
        assert!(report.is_clean());

        let object = t.find("Object").unwrap();
        let pawn = t.find("Pawn").unwrap();
        assert_eq!(t.get(object).children, vec![pawn]);
        assert_eq!(t.get(pawn).parent, Some(object));
    }

    #[test]
    fn class_below_cycle_is_not_flagged() {
        let mut t = table(&[("A", Some("B")), ("B", Some("A")), ("C", Some("A"))]);
        link(&mut t);
        let c = t.find("C").unwrap();
        assert!(!t.get(c).cyclic);
        // C keeps its link to A; A itself is severed from the loop.
        assert_eq!(t.get(c).parent, t.find("A"));
    }
}

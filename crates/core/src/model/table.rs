use indexmap::IndexMap;
use std::path::Path;

use super::ClassSymbol;

/// Index of a class in the table arena. Stable across in-place replacement
/// of a class (single-file re-parse keeps the id).
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// Arena of all known classes with a case-insensitive name index.
///
/// The table is the only owner of [`ClassSymbol`]s; everything else refers
/// to them by [`ClassId`]. Readers receive the table behind an `Arc` and
/// must treat every lookup as fresh: a re-parse replaces the whole table.
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: Vec<ClassSymbol>,
    by_name: IndexMap<String, ClassId>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from a flat class list (snapshot load path). The
    /// linker must run afterwards to restore parent/child links.
    pub fn from_classes(classes: Vec<ClassSymbol>) -> Self {
        let mut table = Self::new();
        for class in classes {
            table.insert(class);
        }
        table
    }

    /// Insert a class, replacing any same-named class in place so existing
    /// ids stay valid.
    pub fn insert(&mut self, class: ClassSymbol) -> ClassId {
        let key = class.name.to_ascii_lowercase();
        match self.by_name.get(&key) {
            Some(&id) => {
                self.classes[id.0 as usize] = class;
                id
            }
            None => {
                let id = ClassId(self.classes.len() as u32);
                self.classes.push(class);
                self.by_name.insert(key, id);
                id
            }
        }
    }

    pub fn get(&self, id: ClassId) -> &ClassSymbol {
        &self.classes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut ClassSymbol {
        &mut self.classes[id.0 as usize]
    }

    /// Case-insensitive lookup. Package-qualified names (`Core.Object`)
    /// match on their last component.
    pub fn find(&self, name: &str) -> Option<ClassId> {
        let short = name.rsplit('.').next().unwrap_or(name);
        self.by_name.get(&short.to_ascii_lowercase()).copied()
    }

    pub fn find_by_file(&self, path: &Path) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c.file == path)
            .map(|i| ClassId(i as u32))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = ClassId> + use<> {
        (0..self.classes.len() as u32).map(ClassId)
    }

    pub fn classes(&self) -> &[ClassSymbol] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

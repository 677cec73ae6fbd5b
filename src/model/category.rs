//! Class definitions and the editable class list.

use serde::{Deserialize, Serialize};

use crate::constants::{CLASS_HOTKEY_COUNT, MAX_CLASS_ID};

/// Color used for classes without an explicit or built-in color.
pub const FALLBACK_COLOR: [u8; 3] = [255, 255, 255];

/// Built-in colors for the first class ids (red, lime).
const BUILTIN_COLORS: &[(u32, [u8; 3])] = &[(0, [255, 0, 0]), (1, [0, 255, 0])];

/// A labeling class. The id is the stable key boxes refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Unique identifier for the class
    pub id: u32,
    /// Display name of the class
    pub name: String,
    /// Optional RGB override for rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
}

impl ClassDef {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = Some(color);
        self
    }
}

/// Ordered list of classes, unique by id and kept sorted by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ClassDef>", into = "Vec<ClassDef>")]
pub struct ClassList {
    classes: Vec<ClassDef>,
}

impl From<Vec<ClassDef>> for ClassList {
    fn from(defs: Vec<ClassDef>) -> Self {
        Self::from_defs(defs)
    }
}

impl From<ClassList> for Vec<ClassDef> {
    fn from(list: ClassList) -> Self {
        list.classes
    }
}

impl Default for ClassList {
    fn default() -> Self {
        Self {
            classes: vec![ClassDef::new(0, "class0"), ClassDef::new(1, "class1")],
        }
    }
}

impl ClassList {
    /// Two default classes, `class0` and `class1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary definitions; later duplicates of an id are dropped.
    pub fn from_defs(defs: impl IntoIterator<Item = ClassDef>) -> Self {
        let mut classes: Vec<ClassDef> = Vec::new();
        for def in defs {
            if !classes.iter().any(|c| c.id == def.id) {
                classes.push(def);
            }
        }
        classes.sort_by_key(|c| c.id);
        Self { classes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// Add a class with the smallest free id and a `class{id}` name.
    ///
    /// Returns `None` when every id up to the limit is taken.
    pub fn add(&mut self) -> Option<u32> {
        let id = (0..MAX_CLASS_ID).find(|id| !self.contains(*id))?;
        self.classes.push(ClassDef::new(id, &format!("class{id}")));
        self.classes.sort_by_key(|c| c.id);
        log::debug!("Added class {}", id);
        Some(id)
    }

    /// Rename a class. Returns false if the id is unknown.
    pub fn rename(&mut self, id: u32, name: &str) -> bool {
        match self.classes.iter_mut().find(|c| c.id == id) {
            Some(class) => {
                class.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a class. Returns the removed definition, if any.
    pub fn remove(&mut self, id: u32) -> Option<ClassDef> {
        let pos = self.classes.iter().position(|c| c.id == id)?;
        log::debug!("Removed class {}", id);
        Some(self.classes.remove(pos))
    }

    /// Class id bound to a digit hotkey position (0-based, digits 1-9).
    pub fn id_for_hotkey(&self, index: usize) -> Option<u32> {
        if index >= CLASS_HOTKEY_COUNT {
            return None;
        }
        self.classes.get(index).map(|c| c.id)
    }

    /// Rendering color for a class id. Unknown ids fall back to white and
    /// never block editing.
    pub fn color(&self, id: u32) -> [u8; 3] {
        self.get(id)
            .and_then(|c| c.color)
            .or_else(|| {
                BUILTIN_COLORS
                    .iter()
                    .find(|(builtin, _)| *builtin == id)
                    .map(|(_, color)| *color)
            })
            .unwrap_or(FALLBACK_COLOR)
    }

    /// Names ordered by id, as written to `classes.txt`.
    pub fn names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.name.as_str()).collect()
    }
}

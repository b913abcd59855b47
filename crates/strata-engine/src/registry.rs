//! Class index: identity → record

use rustc_hash::FxHashMap;

use crate::class::{ClassHandle, ClassId, ClassRecord};

/// Process-wide class index owned by a [`BuildDirector`](crate::BuildDirector)
#[derive(Debug)]
pub struct ClassIndex {
    /// Classes indexed by ID
    classes: Vec<ClassHandle>,
    /// Class name to ID mapping
    name_to_id: FxHashMap<String, ClassId>,
}

impl ClassIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            name_to_id: FxHashMap::default(),
        }
    }

    /// Register a built class. The class ID must be `next_class_id()`.
    pub(crate) fn register(&mut self, class: ClassHandle) -> ClassId {
        let id = class.class_id();
        debug_assert_eq!(id, self.next_class_id());
        self.name_to_id.insert(class.type_name().to_string(), id);
        self.classes.push(class);
        id
    }

    /// Get class by ID
    pub fn get(&self, id: ClassId) -> Option<&ClassHandle> {
        self.classes.get(id.index())
    }

    /// Get class by name
    pub fn get_by_name(&self, name: &str) -> Option<&ClassHandle> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.classes.get(id.index()))
    }

    /// Check if a name is taken
    pub fn contains_name(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    /// Check that `class` is the record registered under its own ID
    pub fn owns(&self, class: &ClassRecord) -> bool {
        self.get(class.class_id())
            .map(|registered| std::ptr::eq(registered.as_ref(), class))
            .unwrap_or(false)
    }

    /// Get next available class ID
    pub fn next_class_id(&self) -> ClassId {
        ClassId::new(self.classes.len() as u32)
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no class is registered
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate over all classes in ID order
    pub fn iter(&self) -> impl Iterator<Item = &ClassHandle> {
        self.classes.iter()
    }
}

impl Default for ClassIndex {
    fn default() -> Self {
        Self::new()
    }
}

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use rustc_hash::FxHashMap;

use super::TypeRef;

/// Declared types, by name.
#[derive(Default)]
pub struct TypeRegistry {
    types: FxHashMap<String, TypeRef>,
}

impl TypeRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type under its own name, replacing any previous one
    pub fn register(&mut self, ty: TypeRef) -> &mut Self {
        self.types.insert(ty.name().to_string(), ty);
        self
    }

    /// Builder-style variant of [`TypeRegistry::register`]
    pub fn with(mut self, ty: TypeRef) -> Self {
        self.register(ty);
        self
    }

    /// Looks a type up by name
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.types.get(name).cloned()
    }

    /// All registered types
    pub fn types(&self) -> Vec<TypeRef> {
        self.types.values().cloned().collect()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

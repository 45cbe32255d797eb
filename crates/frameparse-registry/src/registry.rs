use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::config::{DuplicatePolicy, RegistryConfig};
use crate::descriptor::{DuplicateType, OutputType};
use crate::error::{RegistryError, Result};

/// Identifier-keyed table of output type constructors.
///
/// Read-only once built: parsing threads only ever call [`lookup`](Self::lookup)
/// and [`create`](Self::create).
pub struct TypeRegistry<Id, O> {
    types: HashMap<Id, OutputType<Id, O>>,
    config: RegistryConfig,
}

impl<Id, O> TypeRegistry<Id, O>
where
    Id: Clone + Eq + Hash + fmt::Debug,
{
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            types: HashMap::new(),
            config,
        }
    }

    /// Replace the table with the given candidates.
    ///
    /// Candidates are registered in order; on a shared identifier the first
    /// registration wins and every skipped candidate is returned. With
    /// [`DuplicatePolicy::Reject`] the first duplicate fails the whole build
    /// and leaves the registry empty.
    pub fn build<I>(&mut self, candidates: I) -> Result<Vec<DuplicateType<Id>>>
    where
        I: IntoIterator<Item = OutputType<Id, O>>,
    {
        self.types.clear();

        let mut types: HashMap<Id, OutputType<Id, O>> = HashMap::new();
        let mut duplicates = Vec::new();

        for candidate in candidates {
            if let Some(existing) = types.get(candidate.type_id()) {
                let duplicate = DuplicateType {
                    type_id: candidate.type_id().clone(),
                    registered: existing.type_name(),
                    duplicate: candidate.type_name(),
                };

                if self.config.duplicate_policy == DuplicatePolicy::Reject {
                    return Err(RegistryError::DuplicateTypeId {
                        type_id: format!("{:?}", duplicate.type_id),
                        registered: duplicate.registered,
                        duplicate: duplicate.duplicate,
                    });
                }

                warn!(
                    type_id = ?duplicate.type_id,
                    registered = duplicate.registered,
                    duplicate = duplicate.duplicate,
                    "duplicate output type identifier; keeping first registration"
                );
                duplicates.push(duplicate);
                continue;
            }

            types.insert(candidate.type_id().clone(), candidate);
        }

        debug!(
            output_types = types.len(),
            duplicates = duplicates.len(),
            "type registry built"
        );
        self.types = types;
        Ok(duplicates)
    }

    /// Descriptor registered under `id`.
    pub fn lookup(&self, id: &Id) -> Option<&OutputType<Id, O>> {
        self.types.get(id)
    }

    /// Construct a fresh output for `id`, if the identifier is known.
    pub fn create(&self, id: &Id) -> Option<O> {
        self.types.get(id).map(OutputType::create)
    }

    /// Check if an identifier is registered.
    pub fn contains(&self, id: &Id) -> bool {
        self.types.contains_key(id)
    }

    /// Number of registered output types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when no output type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Remove every registration.
    pub fn clear(&mut self) {
        self.types.clear();
    }

    /// Registered identifiers, in no particular order.
    pub fn type_ids(&self) -> impl Iterator<Item = &Id> {
        self.types.keys()
    }

    /// Registered descriptors, in no particular order.
    pub fn descriptors(&self) -> impl Iterator<Item = &OutputType<Id, O>> {
        self.types.values()
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl<Id, O> Default for TypeRegistry<Id, O>
where
    Id: Clone + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: fmt::Debug, O> fmt::Debug for TypeRegistry<Id, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.values().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

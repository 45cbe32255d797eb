/// How a registry reacts when two candidates share a type identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// The first registration wins; later candidates are reported and skipped.
    #[default]
    KeepFirst,
    /// Building the registry fails with `RegistryError::DuplicateTypeId`.
    Reject,
}

/// Controls type registry behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Handling of candidates whose identifier is already registered.
    pub duplicate_policy: DuplicatePolicy,
}

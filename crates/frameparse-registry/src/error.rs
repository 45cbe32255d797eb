/// Errors that can occur while building a type registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two output types share one identifier and duplicates are rejected.
    #[error("type identifier {type_id} claimed by both {registered} and {duplicate}")]
    DuplicateTypeId {
        type_id: String,
        registered: &'static str,
        duplicate: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

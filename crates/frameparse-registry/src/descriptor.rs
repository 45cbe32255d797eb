use std::fmt;

use frameparse_image::Identified;

/// Descriptor for one concrete output type.
///
/// Holds the runtime type name, the type identifier and a zero-argument
/// constructor producing a fresh, uninitialized output.
pub struct OutputType<Id, O> {
    type_name: &'static str,
    type_id: Id,
    create: fn() -> O,
}

impl<Id, O> OutputType<Id, O> {
    /// Create a descriptor from an explicit constructor.
    pub fn new(type_name: &'static str, type_id: Id, create: fn() -> O) -> Self {
        Self {
            type_name,
            type_id,
            create,
        }
    }

    /// Create a descriptor for an [`Identified`] output type.
    pub fn of<T>() -> Self
    where
        T: Identified<TypeId = Id> + Default + Into<O>,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            type_id: T::TYPE_ID,
            create: || T::default().into(),
        }
    }

    /// Name of the concrete output type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Identifier this descriptor is registered under.
    pub fn type_id(&self) -> &Id {
        &self.type_id
    }

    /// Construct a fresh output instance.
    pub fn create(&self) -> O {
        (self.create)()
    }
}

impl<Id: Clone, O> Clone for OutputType<Id, O> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            type_id: self.type_id.clone(),
            create: self.create,
        }
    }
}

impl<Id: fmt::Debug, O> fmt::Debug for OutputType<Id, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputType")
            .field("type_name", &self.type_name)
            .field("type_id", &self.type_id)
            .finish()
    }
}

/// A candidate that lost its identifier to an earlier registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateType<Id> {
    /// The contested identifier.
    pub type_id: Id,
    /// Type that owns the identifier.
    pub registered: &'static str,
    /// Type that was skipped.
    pub duplicate: &'static str,
}

//! Typed id and field accessors.
//!
//! Accessors are built from typed closures when the metadata is declared and
//! downcast the entity at call time. Applying an accessor to an instance of a
//! different concrete type yields `IndexError::AccessorNotFound`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::errors::IndexError;
use crate::metadata::FieldValue;
use crate::source::Entity;

type FieldGetter = Arc<dyn Fn(&dyn Any) -> Option<FieldValue> + Send + Sync>;
type IdGetter = Arc<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;

/// Reads one field of one concrete type.
#[derive(Clone)]
pub struct FieldAccessor {
    type_name: String,
    field: String,
    getter: FieldGetter,
}

impl FieldAccessor {
    pub(crate) fn new<T, F, V>(type_name: &str, field: &str, getter: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<FieldValue>,
    {
        Self {
            type_name: type_name.to_string(),
            field: field.to_string(),
            getter: Arc::new(move |any: &dyn Any| any.downcast_ref::<T>().map(|t| getter(t).into())),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Read the raw value from `entity`.
    pub fn read(&self, entity: &dyn Entity) -> Result<FieldValue, IndexError> {
        (self.getter)(entity.as_any())
            .ok_or_else(|| IndexError::accessor_not_found(&self.type_name, &self.field))
    }
}

impl fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("type_name", &self.type_name)
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

/// Reads the natural identifier of one concrete type.
#[derive(Clone)]
pub struct IdAccessor {
    type_name: String,
    getter: IdGetter,
}

impl IdAccessor {
    pub(crate) fn new<T, F, I>(type_name: &str, getter: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> I + Send + Sync + 'static,
        I: ToString,
    {
        Self {
            type_name: type_name.to_string(),
            getter: Arc::new(move |any: &dyn Any| {
                any.downcast_ref::<T>().map(|t| getter(t).to_string())
            }),
        }
    }

    /// Read the identifier of `entity` in its string form.
    pub fn read(&self, entity: &dyn Entity) -> Result<String, IndexError> {
        (self.getter)(entity.as_any()).ok_or_else(|| IndexError::accessor_not_found(&self.type_name, "id"))
    }
}

impl fmt::Debug for IdAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdAccessor")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

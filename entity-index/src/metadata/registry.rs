//! Entity index metadata registry.
//!
//! Holds, per entity type, the indexed fields and their groups, the typed id and
//! field accessors, and the precomputed ancestor chain. The registry is built
//! once by [`MetadataBuilder`] and is read-only afterwards.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use tracing::debug;

use crate::errors::IndexError;
use crate::metadata::accessor::{FieldAccessor, IdAccessor};
use crate::metadata::{FieldValue, IndexSpec};
use crate::source::Entity;

/// Metadata of one declared type.
#[derive(Debug)]
pub struct TypeMetadata {
    name: String,
    parent: Option<String>,
    is_abstract: bool,
    /// Most specific first, starting with the type itself.
    ancestors: Vec<String>,
    indexes: Vec<(String, IndexSpec)>,
    id: Option<IdAccessor>,
    fields: HashMap<String, FieldAccessor>,
}

impl TypeMetadata {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// Fields declared for indexing on this type itself, in declaration order.
    pub fn indexes(&self) -> &[(String, IndexSpec)] {
        &self.indexes
    }
}

/// Read-only registry of indexed entity types.
#[derive(Debug)]
pub struct IndexMetadata {
    types: HashMap<String, TypeMetadata>,
    /// Registration order of every type.
    order: Vec<String>,
    by_type_id: HashMap<TypeId, String>,
}

impl IndexMetadata {
    /// Returns true if the type is declared at all.
    pub fn is_mapped(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Look up a declared type.
    pub fn type_metadata(&self, type_name: &str) -> Result<&TypeMetadata, IndexError> {
        self.types
            .get(type_name)
            .ok_or_else(|| IndexError::type_not_mapped(type_name))
    }

    /// Returns true if the type itself declares at least one indexed field.
    pub fn has_indexes(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|t| !t.indexes.is_empty())
    }

    /// Returns true if the type or any of its ancestors declares indexed fields.
    pub fn is_indexed(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|t| t.ancestors.iter().any(|a| self.has_indexes(a)))
    }

    pub fn is_abstract(&self, type_name: &str) -> bool {
        self.types.get(type_name).is_some_and(|t| t.is_abstract)
    }

    /// Indexed fields declared on the type itself.
    ///
    /// # Returns
    ///
    /// * `Err(IndexError::TypeNotMapped)` - If the type is unknown
    /// * `Err(IndexError::TypeNotIndexed)` - If the type declares no indexed field
    pub fn indexes_of(&self, type_name: &str) -> Result<&[(String, IndexSpec)], IndexError> {
        let meta = self.type_metadata(type_name)?;
        if meta.indexes.is_empty() {
            return Err(IndexError::type_not_indexed(type_name));
        }
        Ok(&meta.indexes)
    }

    /// Accessor of the type's natural identifier.
    pub fn id_accessor(&self, type_name: &str) -> Result<&IdAccessor, IndexError> {
        self.type_metadata(type_name)?
            .id
            .as_ref()
            .ok_or_else(|| IndexError::accessor_not_found(type_name, "id"))
    }

    /// Accessor of one field on a concrete type.
    pub fn field_accessor(&self, type_name: &str, field: &str) -> Result<&FieldAccessor, IndexError> {
        self.type_metadata(type_name)?
            .fields
            .get(field)
            .ok_or_else(|| IndexError::accessor_not_found(type_name, field))
    }

    /// Every type whose ancestor chain declares indexing, in registration order.
    ///
    /// Abstract types are included; the full reindex skips them.
    pub fn indexed_type_names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|t| self.is_indexed(t))
            .map(String::as_str)
            .collect()
    }

    /// The ancestor chain of a type, most specific first, including the type.
    ///
    /// Unknown types have an empty chain.
    pub fn ancestors_of(&self, type_name: &str) -> &[String] {
        self.types
            .get(type_name)
            .map(|t| t.ancestors.as_slice())
            .unwrap_or_default()
    }

    /// Types of the ancestor chain that declare indexed fields, most specific first.
    pub fn indexed_ancestors<'a>(&'a self, type_name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.ancestors_of(type_name)
            .iter()
            .filter(move |a| self.has_indexes(a))
            .map(String::as_str)
    }

    /// The type and every type that has it in its ancestor chain.
    pub fn subtypes_of(&self, type_name: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|t| self.ancestors_of(t).iter().any(|a| a == type_name))
            .map(String::as_str)
            .collect()
    }

    /// Top of the ancestor chain, or `None` for unknown types.
    pub fn root_of(&self, type_name: &str) -> Option<&str> {
        self.ancestors_of(type_name).last().map(String::as_str)
    }

    /// Number of ancestors above the type; roots have depth 0.
    pub fn depth_of(&self, type_name: &str) -> usize {
        self.ancestors_of(type_name).len().saturating_sub(1)
    }

    /// Registered type name of an entity instance, resolved from its Rust type.
    pub fn type_name_of(&self, entity: &dyn Entity) -> Option<&str> {
        self.by_type_id
            .get(&Any::type_id(entity.as_any()))
            .map(String::as_str)
    }
}

struct TypeDecl {
    name: String,
    parent: Option<String>,
    is_abstract: bool,
    type_id: Option<TypeId>,
    id: Option<IdAccessor>,
    fields: HashMap<String, FieldAccessor>,
    indexes: Vec<(String, IndexSpec)>,
}

impl TypeDecl {
    fn new(name: &str, is_abstract: bool, type_id: Option<TypeId>) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            is_abstract,
            type_id,
            id: None,
            fields: HashMap::new(),
            indexes: Vec::new(),
        }
    }

    fn add_index(&mut self, field: &str, spec: IndexSpec) {
        self.indexes.push((field.to_string(), spec));
    }
}

/// Declares the entity types of an application and builds an [`IndexMetadata`].
///
/// # Example
///
/// ```
/// use entity_index::metadata::{IndexSpec, MetadataBuilder};
///
/// struct Company {
///     id: u64,
///     name: String,
/// }
///
/// let metadata = MetadataBuilder::new()
///     .entity::<Company>("Company", |t| {
///         t.id(|c| c.id)
///             .field("name", |c| c.name.clone())
///             .index("name", IndexSpec::new().group("company"))
///     })
///     .build()
///     .expect("valid metadata");
///
/// assert!(metadata.has_indexes("Company"));
/// ```
#[derive(Default)]
pub struct MetadataBuilder {
    decls: Vec<TypeDecl>,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a concrete type backed by the Rust type `T`.
    pub fn entity<T>(
        mut self,
        name: &str,
        declare: impl FnOnce(TypeBuilder<T>) -> TypeBuilder<T>,
    ) -> Self
    where
        T: Any + Send + Sync,
    {
        let builder = TypeBuilder {
            decl: TypeDecl::new(name, false, Some(TypeId::of::<T>())),
            _marker: PhantomData,
        };
        self.decls.push(declare(builder).decl);
        self
    }

    /// Declare an abstract type. It has no instances and no accessors of its own;
    /// its indexed fields are read through the accessors of its concrete subtypes.
    pub fn abstract_type<F>(mut self, name: &str, declare: F) -> Self
    where
        F: FnOnce(AbstractTypeBuilder) -> AbstractTypeBuilder,
    {
        let builder = AbstractTypeBuilder {
            decl: TypeDecl::new(name, true, None),
        };
        self.decls.push(declare(builder).decl);
        self
    }

    /// Validate the declarations and build the registry.
    ///
    /// # Returns
    ///
    /// * `Err(IndexError::Configuration)` - On duplicate types or indexed fields,
    ///   unknown parents, inheritance cycles, concrete types without id accessor,
    ///   or indexed fields without an accessor on a concrete type inheriting them
    pub fn build(self) -> Result<IndexMetadata, IndexError> {
        let mut types: HashMap<String, TypeMetadata> = HashMap::new();
        let mut order = Vec::with_capacity(self.decls.len());
        let mut by_type_id = HashMap::new();

        for decl in self.decls {
            if types.contains_key(&decl.name) {
                return Err(IndexError::configuration(format!(
                    "type '{}' is declared twice",
                    decl.name
                )));
            }
            let mut seen = HashSet::new();
            for (field, _) in &decl.indexes {
                if !seen.insert(field.as_str()) {
                    return Err(IndexError::configuration(format!(
                        "field '{}' of type '{}' is indexed twice",
                        field, decl.name
                    )));
                }
            }
            if let Some(type_id) = decl.type_id {
                if let Some(other) = by_type_id.insert(type_id, decl.name.clone()) {
                    return Err(IndexError::configuration(format!(
                        "types '{}' and '{}' are backed by the same Rust type",
                        other, decl.name
                    )));
                }
            }
            if !decl.is_abstract && decl.id.is_none() {
                return Err(IndexError::configuration(format!(
                    "type '{}' has no id accessor",
                    decl.name
                )));
            }
            order.push(decl.name.clone());
            types.insert(
                decl.name.clone(),
                TypeMetadata {
                    name: decl.name,
                    parent: decl.parent,
                    is_abstract: decl.is_abstract,
                    ancestors: Vec::new(),
                    indexes: decl.indexes,
                    id: decl.id,
                    fields: decl.fields,
                },
            );
        }

        let chains = order
            .iter()
            .map(|name| resolve_chain(&types, name).map(|chain| (name.clone(), chain)))
            .collect::<Result<Vec<_>, _>>()?;
        for (name, chain) in chains {
            if let Some(meta) = types.get_mut(&name) {
                meta.ancestors = chain;
            }
        }

        let metadata = IndexMetadata {
            types,
            order,
            by_type_id,
        };
        metadata.check_accessors()?;

        debug!(
            type_count = metadata.order.len(),
            indexed_count = metadata.indexed_type_names().len(),
            "Index metadata built"
        );
        Ok(metadata)
    }
}

impl IndexMetadata {
    /// Every concrete type must be able to read each field indexed anywhere in its chain.
    fn check_accessors(&self) -> Result<(), IndexError> {
        for meta in self.types.values().filter(|t| !t.is_abstract) {
            for ancestor in &meta.ancestors {
                for (field, _) in &self.types[ancestor].indexes {
                    if !meta.fields.contains_key(field) {
                        return Err(IndexError::configuration(format!(
                            "field '{}' indexed by '{}' has no accessor on '{}'",
                            field, ancestor, meta.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn resolve_chain(types: &HashMap<String, TypeMetadata>, name: &str) -> Result<Vec<String>, IndexError> {
    let mut chain = vec![name.to_string()];
    let mut current = name;
    while let Some(parent) = types.get(current).and_then(|t| t.parent.as_deref()) {
        if !types.contains_key(parent) {
            return Err(IndexError::configuration(format!(
                "type '{current}' extends unknown type '{parent}'"
            )));
        }
        if chain.iter().any(|c| c == parent) {
            return Err(IndexError::configuration(format!(
                "inheritance cycle through type '{parent}'"
            )));
        }
        chain.push(parent.to_string());
        current = parent;
    }
    Ok(chain)
}

/// Declares a concrete type; see [`MetadataBuilder::entity`].
pub struct TypeBuilder<T> {
    decl: TypeDecl,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> TypeBuilder<T> {
    /// Set the supertype.
    pub fn parent(mut self, name: &str) -> Self {
        self.decl.parent = Some(name.to_string());
        self
    }

    /// Set the natural identifier accessor.
    pub fn id<F, I>(mut self, getter: F) -> Self
    where
        F: Fn(&T) -> I + Send + Sync + 'static,
        I: ToString,
    {
        self.decl.id = Some(IdAccessor::new::<T, F, I>(&self.decl.name, getter));
        self
    }

    /// Register a typed field accessor. Inherited indexed fields need one too.
    pub fn field<F, V>(mut self, name: &str, getter: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<FieldValue>,
    {
        let accessor = FieldAccessor::new::<T, F, V>(&self.decl.name, name, getter);
        self.decl.fields.insert(name.to_string(), accessor);
        self
    }

    /// Declare a field of this type as indexed.
    pub fn index(mut self, field: &str, spec: IndexSpec) -> Self {
        self.decl.add_index(field, spec);
        self
    }
}

/// Declares an abstract type; see [`MetadataBuilder::abstract_type`].
pub struct AbstractTypeBuilder {
    decl: TypeDecl,
}

impl AbstractTypeBuilder {
    pub fn parent(mut self, name: &str) -> Self {
        self.decl.parent = Some(name.to_string());
        self
    }

    pub fn index(mut self, field: &str, spec: IndexSpec) -> Self {
        self.decl.add_index(field, spec);
        self
    }
}

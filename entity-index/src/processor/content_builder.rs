//! Grouped content building.
//!
//! For every pair of a concrete type and an indexed type in its ancestor chain,
//! a [`ContentPlan`] lists the fields to read, their configured formatters and
//! the keys each rendered value is appended to. Plans are compiled once and
//! reused for every instance.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::errors::IndexError;
use crate::formatter::{Formatter, FormatterRegistry};
use crate::metadata::{FieldAccessor, IndexMetadata};
use crate::source::Entity;

/// Which keys an indexed field is written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// A field goes into each of its groups, or under its own name when it has none.
    #[default]
    Grouped,
    /// Every field is written under its own name; groups are ignored.
    PerField,
}

impl FromStr for KeyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grouped" | "group" => Ok(Self::Grouped),
            "per-field" | "per_field" | "perfield" | "field" => Ok(Self::PerField),
            other => Err(format!("invalid key mode '{other}'")),
        }
    }
}

/// Content of one index slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedContent {
    /// Group or field name.
    pub key: String,
    pub content: String,
}

impl KeyedContent {
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

struct FieldPlan {
    accessor: FieldAccessor,
    formatter: Box<dyn Formatter>,
    /// Indexes into `ContentPlan::keys`.
    slots: Vec<usize>,
}

struct ContentPlan {
    keys: Vec<String>,
    fields: Vec<FieldPlan>,
}

impl ContentPlan {
    fn compile(
        metadata: &IndexMetadata,
        formatters: &FormatterRegistry,
        key_mode: KeyMode,
        concrete: &str,
        model: &str,
    ) -> Result<Self, IndexError> {
        let mut keys: Vec<String> = Vec::new();
        let mut fields = Vec::new();

        for (field, spec) in metadata.indexes_of(model)? {
            let mut formatter = formatters.resolve(&spec.formatter)?;
            formatter.configure(&spec.formatter_options);

            let field_keys: Vec<&str> = match key_mode {
                KeyMode::Grouped if !spec.groups.is_empty() => {
                    spec.groups.iter().map(String::as_str).collect()
                }
                _ => vec![field.as_str()],
            };
            let slots = field_keys
                .into_iter()
                .map(|key| match keys.iter().position(|k| k == key) {
                    Some(slot) => slot,
                    None => {
                        keys.push(key.to_string());
                        keys.len() - 1
                    }
                })
                .collect();

            fields.push(FieldPlan {
                accessor: metadata.field_accessor(concrete, field)?.clone(),
                formatter,
                slots,
            });
        }

        Ok(Self { keys, fields })
    }

    fn build(&self, entity: &dyn Entity) -> Result<Vec<KeyedContent>, IndexError> {
        let mut parts: Vec<Vec<String>> = vec![Vec::new(); self.keys.len()];
        for field in &self.fields {
            let rendered = field.formatter.render(&field.accessor.read(entity)?);
            if rendered.trim().is_empty() {
                continue;
            }
            for &slot in &field.slots {
                parts[slot].push(rendered.clone());
            }
        }

        Ok(self
            .keys
            .iter()
            .zip(parts)
            .map(|(key, parts)| KeyedContent {
                key: key.clone(),
                content: parts.join(" "),
            })
            .collect())
    }
}

/// Compiled content plans for every indexed (concrete type, model) pair.
pub struct ContentBuilder {
    key_mode: KeyMode,
    plans: HashMap<(String, String), ContentPlan>,
}

impl ContentBuilder {
    /// Compile plans for every concrete indexed type and each indexed type in its chain.
    ///
    /// # Returns
    ///
    /// * `Err(IndexError::Configuration)` - If a field names an unknown formatter
    pub fn compile(
        metadata: &IndexMetadata,
        formatters: &FormatterRegistry,
        key_mode: KeyMode,
    ) -> Result<Self, IndexError> {
        let mut plans = HashMap::new();
        for concrete in metadata.indexed_type_names() {
            if metadata.is_abstract(concrete) {
                continue;
            }
            for model in metadata.indexed_ancestors(concrete) {
                let plan = ContentPlan::compile(metadata, formatters, key_mode, concrete, model)?;
                plans.insert((concrete.to_string(), model.to_string()), plan);
            }
        }

        debug!(plan_count = plans.len(), key_mode = ?key_mode, "Content plans compiled");
        Ok(Self { key_mode, plans })
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key_mode
    }

    /// Build the keyed content of `entity`, an instance of `concrete`, using the
    /// field set declared by `model`.
    ///
    /// Keys come in order of first appearance. Blank renders are left out of the
    /// join, so a key whose members all render blank has empty content. This
    /// differs from a literal space-join of every render, which would leave
    /// doubled or trailing spaces: `"Acme"` and `""` join to `"Acme"`, not `"Acme "`.
    pub fn build(
        &self,
        concrete: &str,
        model: &str,
        entity: &dyn Entity,
    ) -> Result<Vec<KeyedContent>, IndexError> {
        self.plans
            .get(&(concrete.to_string(), model.to_string()))
            .ok_or_else(|| IndexError::type_not_indexed(format!("{concrete} as {model}")))?
            .build(entity)
    }
}

impl fmt::Debug for ContentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentBuilder")
            .field("key_mode", &self.key_mode)
            .field("plans", &self.plans.len())
            .finish()
    }
}

use std::collections::HashMap;

use crate::model::{ArrayData, AttrValue, Attributes, Dimension, VariableDef};
use crate::store::{complete_to_shape, Schema, StoreRead, StoreWrite, VariableSpec};

/// A store held entirely in memory. Readable and writable at once, so a
/// pipeline can write into it and read the result straight back.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    schema: Schema,
    data: HashMap<String, ArrayData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored values of `name` as written, without padding to the current shape.
    pub fn stored(&self, name: &str) -> Option<&ArrayData> {
        self.data.get(name)
    }
}

impl StoreRead for MemoryStore {
    fn global_attributes(&self) -> &Attributes {
        &self.schema.attributes
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.schema.dimensions
    }

    fn variables(&self) -> &[VariableDef] {
        &self.schema.variables
    }

    fn read_values(&mut self, name: &str) -> anyhow::Result<ArrayData> {
        let def = self
            .schema
            .variable(name)
            .ok_or_else(|| anyhow::anyhow!("no variable named '{}'", name))?;
        let shape = self.shape(def)?;
        complete_to_shape(def, &shape, self.data.get(name).cloned())
    }
}

impl StoreWrite for MemoryStore {
    fn global_attribute(&self, name: &str) -> Option<&AttrValue> {
        self.schema.attributes.get(name)
    }

    fn set_global_attribute(&mut self, name: &str, value: AttrValue) -> anyhow::Result<()> {
        self.schema.attributes.set(name, value);
        Ok(())
    }

    fn add_dimension(&mut self, name: &str, len: Option<usize>) -> anyhow::Result<()> {
        self.schema.add_dimension(name, len)
    }

    fn grow_dimension(&mut self, name: &str, len: usize) -> anyhow::Result<()> {
        self.schema.grow_dimension(name, len)
    }

    fn define_variable(&mut self, spec: VariableSpec) -> anyhow::Result<()> {
        self.schema.define_variable(spec)
    }

    fn variable_attributes(&self, var: &str) -> Option<&Attributes> {
        self.schema.variable(var).map(|v| &v.attributes)
    }

    fn set_variable_attribute(&mut self, var: &str, name: &str, value: AttrValue) -> anyhow::Result<()> {
        self.schema.set_variable_attribute(var, name, value)
    }

    fn set_auto_mask_and_scale(&mut self, var: &str, enabled: bool) -> anyhow::Result<()> {
        self.schema.set_auto_mask_and_scale(var, enabled)
    }

    fn put_values(&mut self, var: &str, values: ArrayData) -> anyhow::Result<()> {
        let (stored, _shape) = self.schema.prepare_put(var, values)?;
        self.data.insert(var.to_string(), stored);
        Ok(())
    }
}

//! Schema builders for tfplug
//!
//! Thin fluent layer over `tf_provider::schema` so resources declare their
//! attributes the same way everywhere.

use std::collections::HashMap;

pub use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    name: String,
    attr_type: AttributeType,
    description: Description,
    required: bool,
    optional: bool,
    computed: bool,
    sensitive: bool,
    deprecated: bool,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, attr_type: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            attr_type,
            description: Description::plain(""),
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            deprecated: false,
        }
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.description = Description::plain(desc);
        self
    }

    /// Set a markdown description
    pub fn markdown_description(mut self, desc: &str) -> Self {
        self.description = Description::markdown(desc);
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    fn constraint(&self) -> AttributeConstraint {
        match (self.required, self.optional, self.computed) {
            (true, _, _) => AttributeConstraint::Required,
            (false, true, true) => AttributeConstraint::OptionalComputed,
            (false, false, true) => AttributeConstraint::Computed,
            _ => AttributeConstraint::Optional,
        }
    }

    /// Finalize the attribute
    pub fn build(self) -> (String, Attribute) {
        let constraint = self.constraint();
        (
            self.name,
            Attribute {
                attr_type: self.attr_type,
                description: self.description,
                constraint,
                sensitive: self.sensitive,
                deprecated: self.deprecated,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ObjectNesting {
    Single,
    List,
}

/// Builds nested-attribute object types (`AttributeSingle` / `AttributeList`)
pub struct NestedAttributeBuilder {
    nesting: ObjectNesting,
    attributes: HashMap<String, Attribute>,
}

impl NestedAttributeBuilder {
    /// A single nested object
    pub fn single() -> Self {
        Self {
            nesting: ObjectNesting::Single,
            attributes: HashMap::new(),
        }
    }

    /// A list of nested objects
    pub fn list() -> Self {
        Self {
            nesting: ObjectNesting::List,
            attributes: HashMap::new(),
        }
    }

    /// Add attribute
    pub fn attribute(mut self, (name, attr): (String, Attribute)) -> Self {
        self.attributes.insert(name, attr);
        self
    }

    pub fn build(self) -> AttributeType {
        match self.nesting {
            ObjectNesting::Single => AttributeType::AttributeSingle(self.attributes),
            ObjectNesting::List => AttributeType::AttributeList(self.attributes),
        }
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::default(),
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    /// Add attribute
    pub fn attribute(mut self, (name, attr): (String, Attribute)) -> Self {
        self.schema.block.attributes.insert(name, attr);
        self
    }

    /// Add nested block
    pub fn block(mut self, name: &str, block: NestedBlock) -> Self {
        self.schema.block.blocks.insert(name.to_string(), block);
        self
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = Description::plain(desc);
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    /// Finalize the schema
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects the attribute names of a schema's root block, sorted.
pub fn attribute_names(schema: &Schema) -> Vec<String> {
    let mut names: Vec<String> = schema.block.attributes.keys().cloned().collect();
    names.sort();
    names
}

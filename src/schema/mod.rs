//! Schema model, flattening and diffing for CustomResourceDefinitions

pub mod definition;
pub mod diff;
pub mod flatten;

pub use definition::{
    AdditionalProperties, DefinitionError, SchemaNode, Scope, StructuredDefinition, VersionSchema,
};
pub use diff::{FieldDiff, diff};
pub use flatten::{FieldDescriptor, FieldPath, FlatSchema, PathToken, flatten};

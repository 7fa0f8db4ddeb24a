//! Reflected schema metadata.
//!
//! Every consensus struct declares its name and fields in wire order, and every
//! action family declares its ordinal table. Explorers and API layers use this
//! to project values to JSON without knowing the concrete Rust types.

use serde::Serialize;

/// One field of a reflected struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    /// Field name.
    pub name: &'static str,
    /// Declared type, as written in the definition.
    pub type_name: &'static str,
}

/// Name and ordered fields of a reflected struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSchema {
    /// Type name.
    pub name: &'static str,
    /// Fields in wire order.
    pub fields: &'static [FieldSchema],
}

/// Types that expose their schema.
pub trait Reflect {
    /// Type name.
    const NAME: &'static str;

    /// Fields in wire order.
    const FIELDS: &'static [FieldSchema];

    /// Schema descriptor for the type.
    fn schema() -> TypeSchema {
        TypeSchema { name: Self::NAME, fields: Self::FIELDS }
    }
}

/// One member of a reflected tagged union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSchema {
    /// Wire ordinal.
    pub ordinal: u32,
    /// Variant name as used in JSON.
    pub name: &'static str,
    /// Payload schema.
    pub payload: TypeSchema,
}

/// Ordinal table of a tagged union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilySchema {
    /// Family name.
    pub family: &'static str,
    /// Members ordered by ordinal.
    pub variants: Vec<VariantSchema>,
}

/// Tagged unions that expose their ordinal table.
pub trait ReflectFamily {
    /// Schema descriptor for the family.
    fn family_schema() -> FamilySchema;
}

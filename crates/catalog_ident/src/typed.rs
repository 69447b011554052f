//! Category-typed wrappers around [`InternalId`].
//!
//! A `TypedId<K>` holds nothing but the encoded id. The marker `K` ties it to
//! a single [`Section`] so a table id can't be passed where a function id is
//! expected, and provides named accessors for fixed segment positions.
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{IdentError, Result};
use crate::internal::InternalId;
use crate::section::Section;

/// Marker for an id category.
pub trait IdKind: 'static {
    const SECTION: Section;
}

pub struct TypedId<K> {
    id: InternalId,
    _kind: PhantomData<fn() -> K>,
}

impl<K: IdKind> TypedId<K> {
    pub const fn null() -> Self {
        TypedId {
            id: InternalId::NULL,
            _kind: PhantomData,
        }
    }

    /// Wrap an id already known to be of this category.
    fn wrap(id: InternalId) -> Self {
        debug_assert!(id.section() == K::SECTION || !id.is_valid());
        TypedId {
            id,
            _kind: PhantomData,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }

    pub fn as_internal(&self) -> &InternalId {
        &self.id
    }

    pub fn into_internal(self) -> InternalId {
        self.id
    }
}

impl<K: IdKind> TryFrom<InternalId> for TypedId<K> {
    type Error = IdentError;

    fn try_from(id: InternalId) -> Result<Self> {
        let section = id.section();
        if section != K::SECTION && !section.is_null() {
            return Err(IdentError::SectionMismatch {
                expected: K::SECTION,
                actual: section,
            });
        }
        Ok(Self::wrap(id))
    }
}

impl<K> From<TypedId<K>> for InternalId {
    fn from(value: TypedId<K>) -> Self {
        value.id
    }
}

impl<K> AsRef<InternalId> for TypedId<K> {
    fn as_ref(&self) -> &InternalId {
        &self.id
    }
}

impl<K: IdKind> Default for TypedId<K> {
    fn default() -> Self {
        Self::null()
    }
}

impl<K> Clone for TypedId<K> {
    fn clone(&self) -> Self {
        TypedId {
            id: self.id.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> PartialEq for TypedId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K> Eq for TypedId<K> {}

impl<K> PartialOrd for TypedId<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for TypedId<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl<K> Hash for TypedId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl<K> fmt::Display for TypedId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

impl<K> fmt::Debug for TypedId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

impl<K> Serialize for TypedId<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.id.serialize(serializer)
    }
}

impl<'de, K: IdKind> Deserialize<'de> for TypedId<K> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = InternalId::deserialize(deserializer)?;
        TypedId::try_from(id).map_err(serde::de::Error::custom)
    }
}

macro_rules! id_kind {
    ($kind:ident, $alias:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $kind {}

        impl IdKind for $kind {
            const SECTION: Section = Section::$kind;
        }

        pub type $alias = TypedId<$kind>;
    };
}

/// Categories made up only of name segments.
macro_rules! named_ids {
    ($($kind:ident => $alias:ident { $($idx:literal => $name:ident),+ $(,)? })*) => {
        $(
            id_kind!($kind, $alias);

            impl TypedId<$kind> {
                /// Returns the null id if every name is empty.
                pub fn new($($name: &str),+) -> Self {
                    if $($name.is_empty())&&+ {
                        return Self::null();
                    }
                    Self::wrap(InternalId::new(Section::$kind, &[$($name),+]))
                }

                $(
                    pub fn $name(&self) -> Cow<'_, str> {
                        self.id.segment_str($idx)
                    }
                )+
            }
        )*
    };
}

named_ids! {
    AccessMethod => AccessMethodId { 0 => method_name }
    Check => CheckId { 0 => schema_name, 1 => table_name, 2 => check_name }
    Collation => CollationId { 0 => schema_name, 1 => collation_name }
    ColumnDefault => ColumnDefaultId { 0 => schema_name, 1 => table_name, 2 => column_name }
    Database => DatabaseId { 0 => database_name }
    ForeignKey => ForeignKeyId { 0 => schema_name, 1 => table_name, 2 => foreign_key_name }
    Index => IndexId { 0 => schema_name, 1 => table_name, 2 => index_name }
    Namespace => NamespaceId { 0 => schema_name }
    Sequence => SequenceId { 0 => schema_name, 1 => sequence_name }
    Table => TableId { 0 => schema_name, 1 => table_name }
    Trigger => TriggerId { 0 => schema_name, 1 => table_name, 2 => trigger_name }
    Type => TypeId { 0 => schema_name, 1 => type_name }
    View => ViewId { 0 => schema_name, 1 => view_name }
}

id_kind!(EnumLabel, EnumLabelId);
id_kind!(Function, FunctionId);
id_kind!(Procedure, ProcedureId);
id_kind!(Oid, OidId);

impl TypedId<EnumLabel> {
    pub fn new(parent: &TypeId, label: &str) -> Self {
        if !parent.is_valid() && label.is_empty() {
            return Self::null();
        }
        Self::wrap(InternalId::new(
            Section::EnumLabel,
            &[parent.as_internal().as_bytes(), label.as_bytes()],
        ))
    }

    /// The enum type this label belongs to.
    pub fn parent(&self) -> Result<TypeId> {
        TypeId::try_from(self.id.nested(0)?)
    }

    pub fn label(&self) -> Cow<'_, str> {
        self.id.segment_str(1)
    }
}

/// Encode a routine signature, parameter type ids follow schema and name.
fn routine_id(
    section: Section,
    schema_name: &str,
    name: &str,
    parameters: &[TypeId],
) -> InternalId {
    let mut segments: Vec<&[u8]> = Vec::with_capacity(parameters.len() + 2);
    segments.push(schema_name.as_bytes());
    segments.push(name.as_bytes());
    segments.extend(parameters.iter().map(|p| p.as_internal().as_bytes()));
    InternalId::new(section, &segments)
}

fn routine_parameters(id: &InternalId) -> Result<Vec<TypeId>> {
    (2..id.segment_count())
        .map(|idx| TypeId::try_from(id.nested(idx)?))
        .collect()
}

impl TypedId<Function> {
    pub fn new(schema_name: &str, function_name: &str, parameters: &[TypeId]) -> Self {
        if schema_name.is_empty() && function_name.is_empty() && parameters.is_empty() {
            return Self::null();
        }
        Self::wrap(routine_id(
            Section::Function,
            schema_name,
            function_name,
            parameters,
        ))
    }

    pub fn schema_name(&self) -> Cow<'_, str> {
        self.id.segment_str(0)
    }

    pub fn function_name(&self) -> Cow<'_, str> {
        self.id.segment_str(1)
    }

    pub fn parameters(&self) -> Result<Vec<TypeId>> {
        routine_parameters(&self.id)
    }

    pub fn parameter_count(&self) -> usize {
        self.id.segment_count().saturating_sub(2)
    }
}

impl TypedId<Procedure> {
    pub fn new(schema_name: &str, procedure_name: &str, parameters: &[TypeId]) -> Self {
        if schema_name.is_empty() && procedure_name.is_empty() && parameters.is_empty() {
            return Self::null();
        }
        Self::wrap(routine_id(
            Section::Procedure,
            schema_name,
            procedure_name,
            parameters,
        ))
    }

    pub fn schema_name(&self) -> Cow<'_, str> {
        self.id.segment_str(0)
    }

    pub fn procedure_name(&self) -> Cow<'_, str> {
        self.id.segment_str(1)
    }

    pub fn parameters(&self) -> Result<Vec<TypeId>> {
        routine_parameters(&self.id)
    }

    pub fn parameter_count(&self) -> usize {
        self.id.segment_count().saturating_sub(2)
    }
}

impl TypedId<Oid> {
    /// Wrap a raw OID. The identity cache returns the value as-is.
    pub fn new(oid: u32) -> Self {
        Self::wrap(InternalId::new(Section::Oid, &[oid.to_string()]))
    }

    /// The raw value, None if the segment isn't a valid u32.
    pub fn oid(&self) -> Option<u32> {
        parse_raw_oid(&self.id)
    }
}

/// Parse the decimal segment of a `Section::Oid` id.
pub(crate) fn parse_raw_oid(id: &InternalId) -> Option<u32> {
    std::str::from_utf8(id.segment(0)).ok()?.parse().ok()
}

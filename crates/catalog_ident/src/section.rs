use std::fmt;
use std::str::FromStr;

use crate::errors::{IdentError, Result};

/// Category tag stored as the first byte of every [`InternalId`].
///
/// Tags are persisted inside encoded ids. A tag's value and meaning must never
/// change once shipped, new categories may only be appended.
///
/// [`InternalId`]: crate::internal::InternalId
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Section {
    /// Absent or invalid id.
    Null = 0,
    AccessMethod = 1,
    Cast = 2,
    Check = 3,
    Collation = 4,
    ColumnDefault = 5,
    Conversion = 6,
    Database = 7,
    EnumLabel = 8,
    EventTrigger = 9,
    Extension = 10,
    ForeignDataWrapper = 11,
    ForeignKey = 12,
    ForeignServer = 13,
    ForeignTable = 14,
    Function = 15,
    FunctionLanguage = 16,
    Index = 17,
    Namespace = 18,
    /// Raw numeric OID. The single segment holds the decimal value, and the
    /// identity cache passes it through without translation.
    Oid = 19,
    Operator = 20,
    OperatorClass = 21,
    OperatorFamily = 22,
    Policy = 23,
    Procedure = 24,
    Publication = 25,
    RewriteRule = 26,
    Sequence = 27,
    Subscription = 28,
    Table = 29,
    TextSearchConfig = 30,
    TextSearchDictionary = 31,
    TextSearchParser = 32,
    TextSearchTemplate = 33,
    Transform = 34,
    Trigger = 35,
    Type = 36,
    User = 37,
    View = 38,
}

impl Section {
    /// Every section in tag order. `ALL[tag]` is the section for `tag`.
    pub const ALL: [Section; 39] = [
        Section::Null,
        Section::AccessMethod,
        Section::Cast,
        Section::Check,
        Section::Collation,
        Section::ColumnDefault,
        Section::Conversion,
        Section::Database,
        Section::EnumLabel,
        Section::EventTrigger,
        Section::Extension,
        Section::ForeignDataWrapper,
        Section::ForeignKey,
        Section::ForeignServer,
        Section::ForeignTable,
        Section::Function,
        Section::FunctionLanguage,
        Section::Index,
        Section::Namespace,
        Section::Oid,
        Section::Operator,
        Section::OperatorClass,
        Section::OperatorFamily,
        Section::Policy,
        Section::Procedure,
        Section::Publication,
        Section::RewriteRule,
        Section::Sequence,
        Section::Subscription,
        Section::Table,
        Section::TextSearchConfig,
        Section::TextSearchDictionary,
        Section::TextSearchParser,
        Section::TextSearchTemplate,
        Section::Transform,
        Section::Trigger,
        Section::Type,
        Section::User,
        Section::View,
    ];

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn is_null(self) -> bool {
        matches!(self, Section::Null)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Section::Null => "Null",
            Section::AccessMethod => "AccessMethod",
            Section::Cast => "Cast",
            Section::Check => "Check",
            Section::Collation => "Collation",
            Section::ColumnDefault => "ColumnDefault",
            Section::Conversion => "Conversion",
            Section::Database => "Database",
            Section::EnumLabel => "EnumLabel",
            Section::EventTrigger => "EventTrigger",
            Section::Extension => "Extension",
            Section::ForeignDataWrapper => "ForeignDataWrapper",
            Section::ForeignKey => "ForeignKey",
            Section::ForeignServer => "ForeignServer",
            Section::ForeignTable => "ForeignTable",
            Section::Function => "Function",
            Section::FunctionLanguage => "FunctionLanguage",
            Section::Index => "Index",
            Section::Namespace => "Namespace",
            Section::Oid => "OID",
            Section::Operator => "Operator",
            Section::OperatorClass => "OperatorClass",
            Section::OperatorFamily => "OperatorFamily",
            Section::Policy => "Policy",
            Section::Procedure => "Procedure",
            Section::Publication => "Publication",
            Section::RewriteRule => "RewriteRule",
            Section::Sequence => "Sequence",
            Section::Subscription => "Subscription",
            Section::Table => "Table",
            Section::TextSearchConfig => "TextSearchConfig",
            Section::TextSearchDictionary => "TextSearchDictionary",
            Section::TextSearchParser => "TextSearchParser",
            Section::TextSearchTemplate => "TextSearchTemplate",
            Section::Transform => "Transform",
            Section::Trigger => "Trigger",
            Section::Type => "Type",
            Section::User => "User",
            Section::View => "View",
        }
    }
}

// The high bit of the first encoded byte marks the delimited format.
const _: () = assert!((Section::ALL.len() - 1) < 0x80);

impl TryFrom<u8> for Section {
    type Error = IdentError;

    fn try_from(value: u8) -> Result<Self> {
        Section::ALL
            .get(value as usize)
            .copied()
            .ok_or(IdentError::UnknownSection(value))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Section {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self> {
        Section::ALL
            .iter()
            .find(|section| section.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| IdentError::UnknownSectionName(s.to_string()))
    }
}

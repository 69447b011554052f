//! Objects with fixed OIDs.
//!
//! These match the OIDs Postgres assigns at bootstrap so that clients with
//! hardcoded knowledge of `pg_catalog` (drivers decoding type OIDs, for
//! example) keep working. Every value must be at or below
//! [`BUILTIN_OID_CEILING`](crate::cache::BUILTIN_OID_CEILING).

use crate::internal::InternalId;
use crate::typed::{NamespaceId, TypeId};

pub const PG_CATALOG_SCHEMA: &str = "pg_catalog";
pub const PG_TOAST_SCHEMA: &str = "pg_toast";
pub const PUBLIC_SCHEMA: &str = "public";
pub const INFORMATION_SCHEMA: &str = "information_schema";

/// System namespaces with their OIDs.
pub const BUILTIN_NAMESPACES: &[(&str, u32)] = &[
    (PG_CATALOG_SCHEMA, 11),
    (PG_TOAST_SCHEMA, 99),
    (PUBLIC_SCHEMA, 2200),
    (INFORMATION_SCHEMA, 13000),
];

/// Types in `pg_catalog` with their OIDs.
pub const BUILTIN_TYPES: &[(&str, u32)] = &[
    ("bool", 16),
    ("bytea", 17),
    ("char", 18),
    ("name", 19),
    ("int8", 20),
    ("int2", 21),
    ("int4", 23),
    ("regproc", 24),
    ("text", 25),
    ("oid", 26),
    ("json", 114),
    ("float4", 700),
    ("float8", 701),
    ("unknown", 705),
    ("bpchar", 1042),
    ("varchar", 1043),
    ("date", 1082),
    ("time", 1083),
    ("timestamp", 1114),
    ("timestamptz", 1184),
    ("interval", 1186),
    ("timetz", 1266),
    ("numeric", 1700),
    ("regclass", 2205),
    ("regtype", 2206),
    ("uuid", 2950),
    ("jsonb", 3802),
];

/// Every builtin id paired with its fixed OID.
pub fn builtin_entries() -> impl Iterator<Item = (InternalId, u32)> {
    let namespaces = BUILTIN_NAMESPACES
        .iter()
        .map(|&(name, oid)| (NamespaceId::new(name).into_internal(), oid));
    let types = BUILTIN_TYPES.iter().map(|&(name, oid)| {
        (
            TypeId::new(PG_CATALOG_SCHEMA, name).into_internal(),
            oid,
        )
    });

    namespaces.chain(types)
}

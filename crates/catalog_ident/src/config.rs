use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::builtin::builtin_entries;
use crate::cache::BUILTIN_OID_CEILING;
use crate::errors::{IdentError, Result};
use crate::internal::InternalId;
use crate::section::Section;

/// Configuration for constructing an [`IdentityCache`].
///
/// [`IdentityCache`]: crate::cache::IdentityCache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Register the system namespaces and types from [`crate::builtin`].
    pub system_builtins: bool,
    /// Additional objects with fixed OIDs, e.g. for extensions that ship
    /// their own types.
    pub extra_builtins: Vec<BuiltinConfigEntry>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            system_builtins: true,
            extra_builtins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinConfigEntry {
    /// Section name, case insensitive.
    pub section: String,
    pub segments: Vec<String>,
    pub oid: u32,
}

impl CacheConfig {
    /// All builtin entries described by this config.
    ///
    /// Extra entries are validated here since they come from user input. An
    /// extra entry may not reuse an OID or id already claimed by another entry.
    pub fn builtin_entries(&self) -> Result<Vec<(InternalId, u32)>> {
        let mut entries = Vec::new();
        if self.system_builtins {
            entries.extend(builtin_entries());
        }

        let mut seen_oids: HashSet<u32, ahash::RandomState> =
            entries.iter().map(|(_, oid)| *oid).collect();
        let mut seen_ids: HashSet<InternalId, ahash::RandomState> =
            entries.iter().map(|(id, _)| id.clone()).collect();

        for extra in &self.extra_builtins {
            let section: Section = extra.section.parse()?;
            if section.is_null() {
                return Err(IdentError::InvalidConfig(
                    "builtin entries can't use the null section".to_string(),
                ));
            }
            if extra.oid > BUILTIN_OID_CEILING {
                return Err(IdentError::InvalidConfig(format!(
                    "builtin oid {} for {section} exceeds {BUILTIN_OID_CEILING}",
                    extra.oid
                )));
            }
            let id = InternalId::encode(section, &extra.segments)?;
            if !seen_oids.insert(extra.oid) {
                return Err(IdentError::InvalidConfig(format!(
                    "builtin oid {} for {id} is already assigned",
                    extra.oid
                )));
            }
            if !seen_ids.insert(id.clone()) {
                return Err(IdentError::InvalidConfig(format!(
                    "builtin {id} is already assigned an oid"
                )));
            }
            entries.push((id, extra.oid));
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::IdentityCache;

    #[test]
    fn deserialize_with_defaults() {
        let config: CacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(CacheConfig::default(), config);

        let config: CacheConfig = serde_json::from_str(
            r#"{
                "system_builtins": false,
                "extra_builtins": [
                    {"section": "type", "segments": ["ext", "vector"], "oid": 60001}
                ]
            }"#,
        )
        .unwrap();

        let entries = config.builtin_entries().unwrap();
        assert_eq!(1, entries.len());
        assert_eq!(
            InternalId::new(Section::Type, &["ext", "vector"]),
            entries[0].0
        );
        assert_eq!(60001, entries[0].1);
    }

    #[test]
    fn rejects_bad_entries() {
        let bad_oid = CacheConfig {
            system_builtins: false,
            extra_builtins: vec![BuiltinConfigEntry {
                section: "table".to_string(),
                segments: vec!["s".to_string(), "t".to_string()],
                oid: BUILTIN_OID_CEILING + 1,
            }],
        };
        assert!(matches!(
            bad_oid.builtin_entries(),
            Err(IdentError::InvalidConfig(_))
        ));

        let bad_section = CacheConfig {
            system_builtins: false,
            extra_builtins: vec![BuiltinConfigEntry {
                section: "tables".to_string(),
                segments: Vec::new(),
                oid: 100,
            }],
        };
        assert!(matches!(
            bad_section.builtin_entries(),
            Err(IdentError::UnknownSectionName(_))
        ));
    }

    #[test]
    fn rejects_duplicate_entries() {
        struct TestCase {
            json: &'static str,
        }

        let cases = [
            // Clashes with pg_catalog.
            TestCase {
                json: r#"{"extra_builtins":[{"section":"type","segments":["ext","vector"],"oid":11}]}"#,
            },
            // Clashes with the system int4 type.
            TestCase {
                json: r#"{"extra_builtins":[{"section":"type","segments":["pg_catalog","int4"],"oid":60001}]}"#,
            },
            // Extra entries clash with each other.
            TestCase {
                json: r#"{"system_builtins":false,"extra_builtins":[
                    {"section":"type","segments":["ext","a"],"oid":60001},
                    {"section":"type","segments":["ext","b"],"oid":60001}
                ]}"#,
            },
            TestCase {
                json: r#"{"system_builtins":false,"extra_builtins":[
                    {"section":"type","segments":["ext","a"],"oid":60001},
                    {"section":"type","segments":["ext","a"],"oid":60002}
                ]}"#,
            },
        ];

        for case in cases {
            let config: CacheConfig = serde_json::from_str(case.json).unwrap();
            assert!(
                matches!(config.builtin_entries(), Err(IdentError::InvalidConfig(_))),
                "{}",
                case.json
            );
            assert!(
                matches!(
                    IdentityCache::from_config(&config),
                    Err(IdentError::InvalidConfig(_))
                ),
                "{}",
                case.json
            );
        }
    }
}

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_ident::config::CacheConfig;
use catalog_ident::{IdentityCache, InternalId, Section};
use clap::Subcommand;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Print every section with its tag.
    Sections,
    /// Encode an id from a section name and its segments.
    Encode {
        section: Section,
        segments: Vec<String>,
        /// Always use the delimited format.
        #[clap(long)]
        delimited: bool,
    },
    /// Decode a hex encoded id.
    Decode { hex: String },
    /// Print the OID a fresh cache assigns to an id.
    Oid {
        section: Section,
        segments: Vec<String>,
        /// JSON file with cache config. Defaults to the system builtins.
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    /// Run the command, returning what should be printed.
    pub fn run(self) -> Result<String> {
        match self {
            Commands::Sections => Ok(sections()),
            Commands::Encode {
                section,
                segments,
                delimited,
            } => {
                let id = if delimited {
                    InternalId::encode_delimited(section, &segments)
                } else {
                    InternalId::encode(section, &segments)?
                };
                Ok(describe(&id))
            }
            Commands::Decode { hex } => {
                let id = InternalId::from_bytes(decode_hex(&hex)?)?;
                Ok(describe(&id))
            }
            Commands::Oid {
                section,
                segments,
                config,
            } => {
                let config = match config {
                    Some(path) => {
                        let s = fs::read_to_string(&path)
                            .with_context(|| format!("failed to read {}", path.display()))?;
                        serde_json::from_str(&s)
                            .with_context(|| format!("failed to parse {}", path.display()))?
                    }
                    None => CacheConfig::default(),
                };
                let cache = IdentityCache::from_config(&config)?;
                let id = InternalId::encode(section, &segments)?;
                let oid = cache.to_oid(&id);
                info!(%id, %oid, "assigned oid");
                Ok(format!("{oid}"))
            }
        }
    }
}

fn sections() -> String {
    let mut s = String::new();
    for section in Section::ALL {
        let _ = writeln!(s, "{:>3}  {section}", section.as_u8());
    }
    s.trim_end().to_string()
}

fn describe(id: &InternalId) -> String {
    let format = if !id.is_valid() {
        "null"
    } else if id.is_delimited() {
        "delimited"
    } else {
        "packed"
    };

    let mut s = String::new();
    let _ = writeln!(s, "hex:      {}", hex::encode(id.as_bytes()));
    let _ = writeln!(s, "display:  {id}");
    let _ = writeln!(s, "literal:  {}", id.literal());
    let _ = writeln!(s, "format:   {format}");
    let _ = write!(s, "segments: {}", id.segment_count());
    s
}

fn decode_hex(input: &str) -> Result<Vec<u8>> {
    hex::decode(input.trim()).with_context(|| format!("invalid hex input '{input}'"))
}

//! Seed packs: vocabulary bootstrapping for a fresh lexicon.
//!
//! A seed pack is a TOML-defined bundle of taught words. Two packs are
//! bundled into the binary: `core` (the words the command grammar builds on)
//! and `social` (greetings with taught responses).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::lexicon::{Lexicon, TeachOutcome, WordType};

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum SeedError {
    #[error("seed pack not found: \"{id}\"")]
    #[diagnostic(
        code(lexagent::seed::not_found),
        help("Bundled packs are `core` and `social`. External packs live in <dir>/<id>/seed.toml.")
    )]
    NotFound { id: String },

    #[error("failed to parse seed pack \"{id}\": {message}")]
    #[diagnostic(
        code(lexagent::seed::parse),
        help("Check the seed.toml syntax: a [seed] table and [[words]] entries with word, word_type and expression.")
    )]
    Parse { id: String, message: String },

    #[error("failed to read seed file: {path}")]
    #[diagnostic(code(lexagent::seed::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type SeedResult<T> = std::result::Result<T, SeedError>;

// ── Seed pack data model ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SeedPack {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub words: Vec<SeedWord>,
    pub source: SeedSource,
}

/// Where a seed pack came from.
#[derive(Debug, Clone)]
pub enum SeedSource {
    /// Bundled into the binary via `include_str!`.
    Bundled,
    External(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedWord {
    pub word: String,
    pub word_type: WordType,
    pub expression: String,
}

/// Report after applying a seed pack.
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub id: String,
    pub words_learned: usize,
    /// Already known, with this or another meaning. Existing meanings win.
    pub words_skipped: usize,
    pub words_failed: Vec<(String, String)>,
}

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SeedToml {
    seed: SeedMeta,
    #[serde(default)]
    words: Vec<SeedWord>,
}

#[derive(Debug, Deserialize)]
struct SeedMeta {
    id: String,
    name: String,
    version: String,
    #[serde(default)]
    description: String,
}

// ── Bundled seed packs ──────────────────────────────────────────────────

const CORE_TOML: &str = include_str!("../../data/seeds/core/seed.toml");
const SOCIAL_TOML: &str = include_str!("../../data/seeds/social/seed.toml");

fn parse_seed_toml(toml_str: &str, source: SeedSource) -> SeedResult<SeedPack> {
    let parsed: SeedToml = toml::from_str(toml_str).map_err(|e| SeedError::Parse {
        id: "(unknown)".into(),
        message: e.to_string(),
    })?;
    Ok(SeedPack {
        id: parsed.seed.id,
        name: parsed.seed.name,
        version: parsed.seed.version,
        description: parsed.seed.description,
        words: parsed.words,
        source,
    })
}

fn bundled_packs() -> Vec<SeedPack> {
    [(CORE_TOML, "core"), (SOCIAL_TOML, "social")]
        .iter()
        .filter_map(|(toml, id)| match parse_seed_toml(toml, SeedSource::Bundled) {
            Ok(pack) => Some(pack),
            Err(e) => {
                tracing::warn!(seed = id, "failed to parse bundled seed: {e}");
                None
            }
        })
        .collect()
}

// ── Seed Registry ───────────────────────────────────────────────────────

/// Registry of available seed packs (bundled + discovered from disk).
pub struct SeedRegistry {
    packs: HashMap<String, SeedPack>,
}

impl SeedRegistry {
    pub fn bundled() -> Self {
        let packs = bundled_packs()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { packs }
    }

    /// Bundled packs plus every `<seeds_dir>/<id>/seed.toml`. External
    /// packs shadow bundled ones with the same id.
    pub fn discover(seeds_dir: &Path) -> Self {
        let mut registry = Self::bundled();

        let Ok(entries) = std::fs::read_dir(seeds_dir) else {
            return registry;
        };
        for entry in entries.flatten() {
            let seed_file = entry.path().join("seed.toml");
            if !seed_file.is_file() {
                continue;
            }
            match load_pack(&seed_file, SeedSource::External(entry.path())) {
                Ok(pack) => {
                    registry.packs.insert(pack.id.clone(), pack);
                }
                Err(e) => {
                    tracing::warn!(path = %seed_file.display(), "skipping seed pack: {e}");
                }
            }
        }
        registry
    }

    pub fn list(&self) -> Vec<&SeedPack> {
        let mut packs: Vec<&SeedPack> = self.packs.values().collect();
        packs.sort_by(|a, b| a.id.cmp(&b.id));
        packs
    }

    pub fn get(&self, id: &str) -> SeedResult<&SeedPack> {
        self.packs
            .get(id)
            .ok_or_else(|| SeedError::NotFound { id: id.to_string() })
    }

    /// Teach a pack's words. Idempotent: known words are skipped.
    pub fn apply(&self, pack_id: &str, lexicon: &mut Lexicon) -> SeedResult<SeedReport> {
        let pack = self.get(pack_id)?;
        Ok(apply_seed_pack(pack, lexicon))
    }

    pub fn apply_all(&self, pack_ids: &[String], lexicon: &mut Lexicon) -> SeedResult<Vec<SeedReport>> {
        let mut reports = Vec::new();
        for id in pack_ids {
            reports.push(self.apply(id, lexicon)?);
        }
        Ok(reports)
    }
}

fn load_pack(path: &Path, source: SeedSource) -> SeedResult<SeedPack> {
    let content = std::fs::read_to_string(path).map_err(|e| SeedError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_seed_toml(&content, source)
}

// ── Application logic ───────────────────────────────────────────────────

fn apply_seed_pack(pack: &SeedPack, lexicon: &mut Lexicon) -> SeedReport {
    let mut report = SeedReport {
        id: pack.id.clone(),
        ..Default::default()
    };

    for sw in &pack.words {
        if lexicon.contains(&sw.word) {
            report.words_skipped += 1;
            continue;
        }
        match lexicon.add_entry(&sw.word, sw.word_type, &sw.expression) {
            Ok(TeachOutcome::Learned) => report.words_learned += 1,
            Ok(_) => report.words_skipped += 1,
            Err(e) => {
                tracing::warn!(seed = %pack.id, word = %sw.word, "seed word rejected: {e}");
                report.words_failed.push((sw.word.clone(), e.to_string()));
            }
        }
    }

    tracing::info!(
        seed = %pack.id,
        learned = report.words_learned,
        skipped = report.words_skipped,
        failed = report.words_failed.len(),
        "seed pack applied"
    );
    report
}

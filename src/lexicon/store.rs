//! Durable lexicon storage and curriculum files.
//!
//! The lexicon is saved as a pretty-printed JSON array of
//! `{word, word_type, meaning_expression}` records, sorted by word. Saves go
//! through a temporary file in the target directory that is then renamed over
//! the previous file, so a crash never leaves a half-written lexicon behind.
//!
//! Curriculum files are plain text, one word per line:
//!
//! ```text
//! # colours
//! property :: red :: obj.color == 'red'
//! noun     :: box :: obj.shape == 'box'
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Lexicon, TeachOutcome, WordType};

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("failed to read {path}")]
    #[diagnostic(
        code(lexagent::store::read),
        help("Ensure the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    #[diagnostic(
        code(lexagent::store::write),
        help("Ensure the directory exists and you have write permissions.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lexicon file {path} is not valid JSON: {message}")]
    #[diagnostic(
        code(lexagent::store::decode),
        help("The file must be a JSON array of {{word, word_type, meaning_expression}} records.")
    )]
    Decode { path: String, message: String },

    #[error("failed to encode lexicon: {message}")]
    #[diagnostic(code(lexagent::store::encode), help("This is a bug; please report it."))]
    Encode { message: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One persisted word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: String,
    pub word_type: WordType,
    pub meaning_expression: String,
}

/// A record that could not be restored on load.
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    pub word: String,
    pub reason: String,
}

/// Result of loading a lexicon file.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub lexicon: Lexicon,
    pub loaded: usize,
    pub skipped: Vec<SkippedRecord>,
}

pub fn records(lexicon: &Lexicon) -> Vec<WordRecord> {
    lexicon
        .iter()
        .map(|e| WordRecord {
            word: e.word.clone(),
            word_type: e.word_type,
            meaning_expression: e.meaning_expression.clone(),
        })
        .collect()
}

/// Load a lexicon. A missing file yields an empty lexicon.
///
/// Records whose meaning no longer compiles are skipped and reported rather
/// than failing the whole load.
pub fn load(path: &Path) -> StoreResult<LoadReport> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no lexicon file yet, starting empty");
        return Ok(LoadReport::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let records: Vec<WordRecord> = serde_json::from_str(&text).map_err(|e| StoreError::Decode {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut report = LoadReport::default();
    for record in records {
        match report
            .lexicon
            .add_entry(&record.word, record.word_type, &record.meaning_expression)
        {
            Ok(_) => report.loaded += 1,
            Err(e) => {
                tracing::warn!(word = %record.word, "skipping stored word: {e}");
                report.skipped.push(SkippedRecord {
                    word: record.word,
                    reason: e.to_string(),
                });
            }
        }
    }
    tracing::info!(
        path = %path.display(),
        loaded = report.loaded,
        skipped = report.skipped.len(),
        "lexicon loaded"
    );
    Ok(report)
}

/// Atomically replace the file at `path` with the full lexicon.
pub fn save(lexicon: &Lexicon, path: &Path) -> StoreResult<usize> {
    let records = records(lexicon);
    let json = serde_json::to_string_pretty(&records).map_err(|e| StoreError::Encode {
        message: e.to_string(),
    })?;

    let write_err = |source: std::io::Error| StoreError::Write {
        path: path.display().to_string(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.write_all(b"\n").map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::info!(path = %path.display(), words = records.len(), "lexicon saved");
    Ok(records.len())
}

// ---------------------------------------------------------------------------
// Curriculum files
// ---------------------------------------------------------------------------

/// One `type :: word :: expression` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurriculumLine {
    pub line: usize,
    pub word_type: String,
    pub word: String,
    pub expression: String,
}

/// Outcome of teaching a curriculum.
#[derive(Debug, Clone, Default)]
pub struct CurriculumReport {
    pub learned: usize,
    pub unchanged: usize,
    /// `(line number, message)` for every rejected line.
    pub failed: Vec<(usize, String)>,
}

/// Parse curriculum text. Malformed lines are returned as errors alongside
/// the well-formed ones.
pub fn parse_curriculum(text: &str) -> (Vec<CurriculumLine>, Vec<(usize, String)>) {
    let mut lines = Vec::new();
    let mut errors = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = trimmed.splitn(3, "::").map(str::trim).collect();
        match parts.as_slice() {
            [word_type, word, expression] if !word.is_empty() => lines.push(CurriculumLine {
                line: line_no,
                word_type: word_type.to_string(),
                word: word.to_string(),
                expression: expression.to_string(),
            }),
            _ => errors.push((
                line_no,
                format!("expected `type :: word :: expression`, got \"{trimmed}\""),
            )),
        }
    }
    (lines, errors)
}

/// Teach every line of a curriculum. Bad lines are reported, not fatal.
pub fn teach_curriculum(lexicon: &mut Lexicon, text: &str) -> CurriculumReport {
    let (lines, errors) = parse_curriculum(text);
    let mut report = CurriculumReport {
        failed: errors,
        ..Default::default()
    };
    for line in lines {
        let result = line
            .word_type
            .parse::<WordType>()
            .and_then(|t| lexicon.add_entry(&line.word, t, &line.expression));
        match result {
            Ok(TeachOutcome::Unchanged) => report.unchanged += 1,
            Ok(_) => report.learned += 1,
            Err(e) => report.failed.push((line.line, e.to_string())),
        }
    }
    report.failed.sort_by_key(|(line, _)| *line);
    report
}

/// Read and teach a curriculum file.
pub fn learn_curriculum(lexicon: &mut Lexicon, path: &Path) -> StoreResult<CurriculumReport> {
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let report = teach_curriculum(lexicon, &text);
    tracing::info!(
        path = %path.display(),
        learned = report.learned,
        unchanged = report.unchanged,
        failed = report.failed.len(),
        "curriculum applied"
    );
    Ok(report)
}

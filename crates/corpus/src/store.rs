//! Process-wide corpus store.
//!
//! Loaded once at startup from a directory of `*.md` documents and read
//! concurrently by every pipeline invocation. A query that finds nothing
//! triggers one lazy reload from disk before returning, so documents
//! dropped into the corpus directory become visible without a restart.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use pl_domain::error::Result;

use crate::document::{parse_document, Document, DocumentDomain};
use crate::types::{PhilosophyDoc, SessionTemplate, WeekStructure};

#[derive(Default)]
struct Loaded {
    philosophies: Vec<PhilosophyDoc>,
    structures: Vec<WeekStructure>,
    templates: Vec<SessionTemplate>,
}

/// Read-mostly store over the corpus directory.
pub struct CorpusStore {
    root: PathBuf,
    inner: RwLock<Loaded>,
}

impl CorpusStore {
    /// Load the corpus from `root`. Unparseable files are logged and
    /// skipped; an empty or missing directory yields an empty store.
    pub fn load(root: &Path) -> Result<Self> {
        let store = Self {
            root: root.to_path_buf(),
            inner: RwLock::new(Loaded::default()),
        };
        store.reload()?;
        Ok(store)
    }

    /// An empty store for tests that inject documents directly.
    pub fn empty() -> Self {
        Self {
            root: PathBuf::new(),
            inner: RwLock::new(Loaded::default()),
        }
    }

    /// Insert parsed documents directly (test fixtures, seeds).
    pub fn insert_documents(&self, docs: &[Document]) -> Result<()> {
        let mut inner = self.inner.write();
        for doc in docs {
            Self::index_document(&mut inner, doc)?;
        }
        Ok(())
    }

    /// Re-scan the corpus directory.
    pub fn reload(&self) -> Result<()> {
        let mut loaded = Loaded::default();

        if self.root.as_os_str().is_empty() || !self.root.exists() {
            *self.inner.write() = loaded;
            return Ok(());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        // Stable load order keeps tie-breaking deterministic.
        paths.sort();

        for path in paths {
            let raw = std::fs::read_to_string(&path)?;
            match parse_document(&raw) {
                Ok(doc) => {
                    if let Err(e) = Self::index_document(&mut loaded, &doc) {
                        tracing::warn!(path = %path.display(), error = %e, "skipping corpus document");
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unparseable corpus document");
                }
            }
        }

        tracing::info!(
            philosophies = loaded.philosophies.len(),
            structures = loaded.structures.len(),
            templates = loaded.templates.len(),
            root = %self.root.display(),
            "corpus loaded"
        );

        *self.inner.write() = loaded;
        Ok(())
    }

    fn index_document(loaded: &mut Loaded, doc: &Document) -> Result<()> {
        match doc.meta.domain {
            DocumentDomain::Philosophy => {
                loaded.philosophies.push(PhilosophyDoc::from_document(doc)?);
            }
            DocumentDomain::Structure => {
                loaded.structures.push(WeekStructure::from_document(doc)?);
            }
            DocumentDomain::Template => {
                loaded.templates.extend(SessionTemplate::from_document(doc)?);
            }
        }
        Ok(())
    }

    // ── queries ──────────────────────────────────────────────────────

    /// Philosophies matching a race type and audience.
    pub fn philosophies(&self, race_type: &str, audience: &str) -> Vec<PhilosophyDoc> {
        let hit = self.query_philosophies(race_type, audience);
        if !hit.is_empty() {
            return hit;
        }
        // Cache miss: fall back to a store read once.
        let _ = self.reload();
        self.query_philosophies(race_type, audience)
    }

    fn query_philosophies(&self, race_type: &str, audience: &str) -> Vec<PhilosophyDoc> {
        self.inner
            .read()
            .philosophies
            .iter()
            .filter(|p| matches_key(&p.race_types, race_type) && matches_key(&p.audience, audience))
            .cloned()
            .collect()
    }

    /// Structures for a philosophy, filtered by race type, audience and
    /// phase.
    pub fn structures(
        &self,
        philosophy_id: &str,
        race_type: &str,
        audience: &str,
        phase: &str,
    ) -> Vec<WeekStructure> {
        self.inner
            .read()
            .structures
            .iter()
            .filter(|s| {
                s.philosophy_id == philosophy_id
                    && s.phase == phase
                    && matches_key(&s.race_types, race_type)
                    && matches_key(&s.audience, audience)
            })
            .cloned()
            .collect()
    }

    /// Templates for `(philosophy, race_type, audience, phase, session_type)`.
    pub fn templates(
        &self,
        philosophy_id: &str,
        race_type: &str,
        audience: &str,
        phase: &str,
        session_type: &str,
    ) -> Vec<SessionTemplate> {
        self.inner
            .read()
            .templates
            .iter()
            .filter(|t| {
                t.philosophy_id == philosophy_id
                    && t.session_type == session_type
                    && t.phase == phase
                    && matches_key(&t.race_types, race_type)
                    && matches_key(&t.audience, audience)
            })
            .cloned()
            .collect()
    }
}

/// A document key list matches when it names the value or is empty
/// (empty = applies to all).
fn matches_key(keys: &[String], value: &str) -> bool {
    keys.is_empty() || keys.iter().any(|k| k == value)
}

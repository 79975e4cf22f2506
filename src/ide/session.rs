//! Virtual document session.
//!
//! Owns one synthetic document per original document and the versioning
//! discipline around analyzer requests:
//!
//! - a rebuild snapshots `(text, version)`, lowers it and installs the result
//!   only if the version is still current; otherwise the result is discarded
//!   as superseded. Rebuilds of one document are serialized, rebuilds of
//!   different documents run in parallel.
//! - [`Session::request`] captures the version before calling the analyzer
//!   and compares after. A mismatch waits for edits to settle and then
//!   reports [`AnalysisError::Busy`], never an empty result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use indexmap::{IndexMap, IndexSet};
use parking_lot::{Condvar, Mutex, RwLock};
use rayon::prelude::*;
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::base::{DocumentId, LineIndex};
use crate::dialect::{DialectOptions, dialect_to_markup, markup_to_dialect};
use crate::error::AnalysisError;
use crate::lower::{DialectPair, LoweredTemplate, lower_template};
use crate::markup::parse_markup;
use crate::source_map::SourceMap;
use crate::template::parse_template;

/// Rebuilds tried before a request waits for edits to settle.
const REBUILD_ATTEMPTS: usize = 3;

/// Session-wide settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// A document counts as settled after this long without a change.
    pub settle_interval: Duration,
    /// Give up waiting for a document that never stops changing.
    pub max_settle: Duration,
    /// Semantic tokens are not computed for larger documents.
    pub semantic_tokens_limit: usize,
    pub dialect: DialectOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_interval: Duration::from_millis(400),
            max_settle: Duration::from_secs(10),
            semantic_tokens_limit: 100_000,
            dialect: DialectOptions::default(),
        }
    }
}

/// Notation of an original document's template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateLanguage {
    Markup,
    /// The indentation dialect; converted to markup before lowering.
    Dialect,
}

/// Synthetic text generated from one version of an original document.
#[derive(Debug)]
pub struct VirtualDocument {
    pub id: DocumentId,
    /// The original document's version this was generated from.
    pub version: u64,
    pub text: Arc<str>,
    pub source_map: SourceMap,
    pub referenced_tags: IndexSet<SmolStr>,
    pub slots: IndexMap<SmolStr, String>,
    /// The markup lowered for a dialect document.
    pub markup: Option<String>,
    /// The original text this was generated from.
    pub source: Arc<str>,
    pub source_lines: LineIndex,
}

impl VirtualDocument {
    /// Lower `source` into a virtual document for `original`.
    pub fn build(
        original: DocumentId,
        source: Arc<str>,
        version: u64,
        language: TemplateLanguage,
    ) -> Self {
        let (lowered, markup) = match language {
            TemplateLanguage::Markup => (lower_template(&parse_template(&source), None), None),
            TemplateLanguage::Dialect => {
                let markup = dialect_to_markup(&source);
                let pair = DialectPair {
                    markup: &markup,
                    dialect: &source,
                };
                let lowered = lower_template(&parse_template(&markup), Some(pair));
                (lowered, Some(markup))
            }
        };
        let LoweredTemplate {
            text,
            mappings,
            referenced_tags,
            slots,
        } = lowered;

        Self {
            id: original.virtual_of(),
            version,
            text: text.into(),
            source_lines: LineIndex::new(&source),
            source,
            source_map: SourceMap::new(mappings),
            referenced_tags,
            slots,
            markup,
        }
    }
}

/// Result of [`Session::rebuild`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// The virtual document for `version` is installed.
    Installed { version: u64 },
    /// The document changed while building; nothing was installed.
    Superseded { built: u64, current: u64 },
}

#[derive(Debug)]
struct Source {
    text: Arc<str>,
    version: u64,
}

#[derive(Debug)]
struct DocumentState {
    language: TemplateLanguage,
    source: Mutex<Source>,
    /// Signalled on every edit.
    changed: Condvar,
    current: RwLock<Option<Arc<VirtualDocument>>>,
    /// Held for the duration of a rebuild.
    rebuild: Mutex<()>,
}

impl DocumentState {
    fn snapshot(&self) -> (Arc<str>, u64) {
        let source = self.source.lock();
        (Arc::clone(&source.text), source.version)
    }

    fn version(&self) -> u64 {
        self.source.lock().version
    }
}

/// Original documents and their virtual documents.
#[derive(Debug, Default)]
pub struct Session {
    config: SessionConfig,
    documents: RwLock<IndexMap<DocumentId, Arc<DocumentState>>>,
    next_id: AtomicU32,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn state(&self, id: DocumentId) -> Result<Arc<DocumentState>, AnalysisError> {
        self.documents
            .read()
            .get(&id.original())
            .cloned()
            .ok_or(AnalysisError::UnknownDocument(id))
    }

    /// Register a document at version 1 and build its virtual document.
    pub fn open(&self, text: impl Into<Arc<str>>, language: TemplateLanguage) -> DocumentId {
        let id = DocumentId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let state = Arc::new(DocumentState {
            language,
            source: Mutex::new(Source {
                text: text.into(),
                version: 1,
            }),
            changed: Condvar::new(),
            current: RwLock::new(None),
            rebuild: Mutex::new(()),
        });
        self.documents.write().insert(id, state);
        match self.rebuild(id) {
            Ok(outcome) => debug!(file = %id, ?outcome, "opened document"),
            // closed by another thread before the first build
            Err(error) => debug!(file = %id, %error, "initial build skipped"),
        }
        id
    }

    /// Replace a document's text; returns the new version.
    pub fn change(&self, id: DocumentId, text: impl Into<Arc<str>>) -> Result<u64, AnalysisError> {
        let state = self.state(id)?;
        let version = {
            let mut source = state.source.lock();
            source.text = text.into();
            source.version += 1;
            source.version
        };
        state.changed.notify_all();
        Ok(version)
    }

    pub fn close(&self, id: DocumentId) -> bool {
        self.documents.write().swap_remove(&id.original()).is_some()
    }

    pub fn version(&self, id: DocumentId) -> Option<u64> {
        self.state(id).ok().map(|state| state.version())
    }

    pub fn source_text(&self, id: DocumentId) -> Option<Arc<str>> {
        self.state(id).ok().map(|state| state.snapshot().0)
    }

    pub fn documents(&self) -> Vec<DocumentId> {
        self.documents.read().keys().copied().collect()
    }

    /// Bring the virtual document up to the current version.
    pub fn rebuild(&self, id: DocumentId) -> Result<RebuildOutcome, AnalysisError> {
        let state = self.state(id)?;
        let _serialized = state.rebuild.lock();

        let (text, version) = state.snapshot();
        if state
            .current
            .read()
            .as_ref()
            .is_some_and(|doc| doc.version == version)
        {
            return Ok(RebuildOutcome::Installed { version });
        }

        debug!(file = %id, version, "rebuilding virtual document");
        let doc = VirtualDocument::build(id.original(), text, version, state.language);

        let current = state.version();
        if current != version {
            debug!(file = %id, built = version, current, "rebuild superseded");
            return Ok(RebuildOutcome::Superseded {
                built: version,
                current,
            });
        }
        *state.current.write() = Some(Arc::new(doc));
        debug!(file = %id, version, "virtual document installed");
        Ok(RebuildOutcome::Installed { version })
    }

    /// Rebuild every document whose virtual document is stale, in parallel.
    pub fn rebuild_all(&self) -> Vec<(DocumentId, RebuildOutcome)> {
        let stale: Vec<DocumentId> = self
            .documents
            .read()
            .iter()
            .filter(|(_, state)| {
                let version = state.version();
                state
                    .current
                    .read()
                    .as_ref()
                    .is_none_or(|doc| doc.version != version)
            })
            .map(|(id, _)| *id)
            .collect();

        stale
            .par_iter()
            .filter_map(|&id| self.rebuild(id).ok().map(|outcome| (id, outcome)))
            .collect()
    }

    /// The virtual document for the current version, rebuilding if needed.
    ///
    /// When edits keep superseding the rebuild, waits for them to settle and
    /// returns [`AnalysisError::Busy`] naming the last version built.
    pub fn virtual_document(
        &self,
        id: DocumentId,
        cancel: &CancellationToken,
    ) -> Result<Arc<VirtualDocument>, AnalysisError> {
        let state = self.state(id)?;
        let mut last_built = None;
        for _ in 0..REBUILD_ATTEMPTS {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            let version = state.version();
            if let Some(doc) = state.current.read().as_ref() {
                if doc.version == version {
                    return Ok(Arc::clone(doc));
                }
            }
            match self.rebuild(id)? {
                RebuildOutcome::Installed { .. } => {
                    if let Some(doc) = state.current.read().as_ref() {
                        return Ok(Arc::clone(doc));
                    }
                }
                RebuildOutcome::Superseded { built, .. } => last_built = Some(built),
            }
        }

        self.wait_for_settle(id, cancel)?;
        let current = state.version();
        let requested = last_built.unwrap_or(current);
        debug!(file = %id, requested, current, "edits keep superseding the rebuild");
        Err(AnalysisError::Busy {
            file: id,
            requested,
            current,
        })
    }

    /// The current document rendered in the indentation dialect, using the
    /// session's dialect options.
    pub fn render_dialect(
        &self,
        id: DocumentId,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let doc = self.virtual_document(id, cancel)?;
        let markup = doc.markup.as_deref().unwrap_or(&doc.source);
        Ok(markup_to_dialect(&parse_markup(markup), &self.config.dialect))
    }

    /// The installed virtual document, whatever its version.
    pub fn installed(&self, id: DocumentId) -> Option<Arc<VirtualDocument>> {
        self.state(id).ok()?.current.read().clone()
    }

    /// Run `f` against the current virtual document under the version guard.
    ///
    /// If the original document changes while `f` runs, the result is
    /// discarded: the call waits for edits to settle and then returns
    /// [`AnalysisError::Busy`].
    pub fn request<T>(
        &self,
        id: DocumentId,
        cancel: &CancellationToken,
        f: impl FnOnce(&VirtualDocument) -> T,
    ) -> Result<T, AnalysisError> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let doc = self.virtual_document(id, cancel)?;
        let requested = doc.version;

        let result = f(&doc);

        let after = self.version(id).ok_or(AnalysisError::UnknownDocument(id))?;
        if after != requested {
            self.wait_for_settle(id, cancel)?;
            let current = self.version(id).unwrap_or(after);
            debug!(file = %id, requested, current, "analyzer result is stale");
            return Err(AnalysisError::Busy {
                file: id,
                requested,
                current,
            });
        }
        Ok(result)
    }

    /// Block until the document has gone one settle interval without an edit.
    ///
    /// Returns early with [`AnalysisError::Cancelled`]; gives up (successfully)
    /// after the configured maximum. The token is checked between waits, so a
    /// cancellation takes effect within one settle interval.
    pub fn wait_for_settle(
        &self,
        id: DocumentId,
        cancel: &CancellationToken,
    ) -> Result<(), AnalysisError> {
        let state = self.state(id)?;
        let deadline = Instant::now() + self.config.max_settle;
        let mut source = state.source.lock();
        loop {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            let seen = source.version;
            let timeout = state
                .changed
                .wait_for(&mut source, self.config.settle_interval);
            if timeout.timed_out() && source.version == seen {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(file = %id, version = source.version, "document did not settle");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> SessionConfig {
        SessionConfig {
            settle_interval: Duration::from_millis(10),
            max_settle: Duration::from_millis(500),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_open_builds_virtual_document() {
        let session = Session::new(quick());
        let id = session.open(r#"<div id="x"></div>"#, TemplateLanguage::Markup);
        let doc = session.virtual_document(id, &CancellationToken::new()).unwrap();
        assert!(doc.id.is_virtual());
        assert_eq!(doc.id.original(), id);
        assert_eq!(doc.version, 1);
        assert!(doc.referenced_tags.contains("div"));
        assert!(doc.markup.is_none());
    }

    #[test]
    fn test_change_makes_virtual_document_stale() {
        let session = Session::new(quick());
        let id = session.open("<a></a>", TemplateLanguage::Markup);
        assert_eq!(session.change(id, "<b></b>").unwrap(), 2);

        assert_eq!(session.installed(id).unwrap().version, 1);
        let doc = session.virtual_document(id, &CancellationToken::new()).unwrap();
        assert_eq!(doc.version, 2);
        assert!(doc.referenced_tags.contains("b"));
    }

    #[test]
    fn test_dialect_document() {
        let session = Session::new(quick());
        let id = session.open("div\n  span hi", TemplateLanguage::Dialect);
        let doc = session.virtual_document(id, &CancellationToken::new()).unwrap();
        assert!(doc.markup.as_deref().unwrap().starts_with("<div>"));
        assert_eq!(
            doc.referenced_tags.iter().collect::<Vec<_>>(),
            ["div", "span"]
        );
    }

    #[test]
    fn test_render_dialect_uses_session_options() {
        let session = Session::new(SessionConfig {
            dialect: DialectOptions {
                indent_width: 4,
                use_tabs: false,
            },
            ..quick()
        });
        let markup = session.open("<ul><li>one</li></ul>", TemplateLanguage::Markup);
        assert_eq!(
            session.render_dialect(markup, &CancellationToken::new()).unwrap(),
            "ul\n    li one"
        );

        let dialect = session.open("ul\n  li one", TemplateLanguage::Dialect);
        assert_eq!(
            session.render_dialect(dialect, &CancellationToken::new()).unwrap(),
            "ul\n    li one"
        );
    }

    #[test]
    fn test_rebuild_all_only_touches_stale_documents() {
        let session = Session::new(quick());
        let a = session.open("<a></a>", TemplateLanguage::Markup);
        let b = session.open("<b></b>", TemplateLanguage::Markup);
        session.change(b, "<i></i>").unwrap();

        let rebuilt = session.rebuild_all();
        assert_eq!(rebuilt, vec![(b, RebuildOutcome::Installed { version: 2 })]);
        assert_eq!(session.installed(a).unwrap().version, 1);
    }

    #[test]
    fn test_request_returns_result_when_unchanged() {
        let session = Session::new(quick());
        let id = session.open("<a></a>", TemplateLanguage::Markup);
        let len = session
            .request(id, &CancellationToken::new(), |doc| doc.text.len())
            .unwrap();
        assert!(len > 0);
    }

    #[test]
    fn test_request_cancelled_up_front() {
        let session = Session::new(quick());
        let id = session.open("<a></a>", TemplateLanguage::Markup);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            session.request(id, &cancel, |_| ()),
            Err(AnalysisError::Cancelled)
        );
    }

    #[test]
    fn test_open_survives_nameless_attribute_before_non_ascii() {
        let session = Session::new(quick());
        let id = session.open("p(=\"x\"é)", TemplateLanguage::Dialect);
        let doc = session.virtual_document(id, &CancellationToken::new()).unwrap();
        assert!(doc.referenced_tags.contains("p"));
    }

    #[test]
    fn test_superseded_rebuilds_wait_before_busy() {
        let session = Session::new(quick());
        let text: Arc<str> = "<p :title=\"a\">{{ count }}</p>".repeat(2000).into();
        let id = session.open(Arc::clone(&text), TemplateLanguage::Markup);
        let stop = Mutex::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !*stop.lock() {
                    session.change(id, Arc::clone(&text)).unwrap();
                }
            });
            while session.version(id) < Some(3) {
                std::thread::yield_now();
            }

            let started = Instant::now();
            let result = session.virtual_document(id, &CancellationToken::new());
            *stop.lock() = true;

            let Err(AnalysisError::Busy {
                file,
                requested,
                current,
            }) = result
            else {
                panic!("expected busy, got {result:?}");
            };
            assert_eq!(file, id);
            assert!(requested > 1 && requested < current, "{requested} {current}");
            // edits never stopped, so the wait ran to its limit
            assert!(started.elapsed() >= quick().max_settle);
        });
    }

    #[test]
    fn test_unknown_and_closed_documents() {
        let session = Session::new(quick());
        let id = session.open("<a></a>", TemplateLanguage::Markup);
        assert!(session.close(id));
        assert!(!session.close(id));
        assert_eq!(
            session.virtual_document(id, &CancellationToken::new()).unwrap_err(),
            AnalysisError::UnknownDocument(id)
        );
        assert_eq!(session.version(id), None);
    }
}

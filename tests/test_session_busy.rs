//! Versioned analyzer requests: edits that race with a request surface as
//! a busy error, never as an empty result.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use stencil::base::{DocumentId, TextRange, TextSize};
use stencil::error::AnalysisError;
use stencil::ide::{
    ClassifiedSpan, Diagnostic, ExternalAnalyzer, Location, RebuildOutcome, Session,
    SessionConfig, TemplateLanguage, find_references, semantic_tokens,
};
use tokio_util::sync::CancellationToken;

const SOURCE: &str = "<p>{{ count }}</p>";

fn config() -> SessionConfig {
    SessionConfig {
        settle_interval: Duration::from_millis(20),
        max_settle: Duration::from_secs(2),
        ..SessionConfig::default()
    }
}

/// Edits the original document while answering, a fixed number of times.
struct Racing<'a> {
    session: &'a Session,
    edits_left: AtomicUsize,
    calls: AtomicUsize,
}

impl<'a> Racing<'a> {
    fn new(session: &'a Session, edits: usize) -> Self {
        Self {
            session,
            edits_left: AtomicUsize::new(edits),
            calls: AtomicUsize::new(0),
        }
    }

    fn answer(&self, file: DocumentId) -> Vec<Location> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let doc = self.session.installed(file.original()).expect("installed");
        if self
            .edits_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            let edited = format!("{SOURCE}\n");
            self.session.change(file.original(), edited).expect("change");
        }
        doc.text
            .match_indices("count")
            .map(|(start, name)| {
                Location::new(file, TextRange::at(TextSize::from(start as u32), TextSize::of(name)))
            })
            .collect()
    }
}

impl ExternalAnalyzer for Racing<'_> {
    fn encoded_classifications(&self, file: DocumentId, _: TextRange) -> Vec<ClassifiedSpan> {
        self.answer(file)
            .into_iter()
            .map(|location| ClassifiedSpan {
                range: location.range,
                classification: 8 << 8,
            })
            .collect()
    }
    fn find_references(&self, file: DocumentId, _: TextSize) -> Vec<Location> {
        self.answer(file)
    }
    fn rename_locations(&self, file: DocumentId, _: TextSize) -> Vec<Location> {
        self.answer(file)
    }
    fn diagnostics(&self, _: DocumentId) -> Vec<Diagnostic> {
        Vec::new()
    }
    fn document_text(&self, file: DocumentId) -> Option<Arc<str>> {
        self.session.installed(file.original()).map(|doc| Arc::clone(&doc.text))
    }
}

#[test]
fn test_edit_during_request_is_busy_then_retry_succeeds() {
    let session = Session::new(config());
    let id = session.open(SOURCE, TemplateLanguage::Markup);
    let analyzer = Racing::new(&session, 1);
    let cancel = CancellationToken::new();

    let first = find_references(&session, &analyzer, id, 7.into(), &cancel);
    assert_eq!(
        first,
        Err(AnalysisError::Busy {
            file: id,
            requested: 1,
            current: 2,
        })
    );
    assert!(first.unwrap_err().is_busy());

    let second = find_references(&session, &analyzer, id, 7.into(), &cancel).unwrap();
    assert_eq!(second, vec![Location::new(id, TextRange::new(6.into(), 11.into()))]);
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.installed(id).unwrap().version, 2);
}

#[test]
fn test_semantic_tokens_busy_is_not_empty() {
    let session = Session::new(config());
    let id = session.open(SOURCE, TemplateLanguage::Markup);
    let analyzer = Racing::new(&session, 1);
    let cancel = CancellationToken::new();

    let raced = semantic_tokens(&session, &analyzer, id, &cancel);
    assert!(matches!(raced, Err(AnalysisError::Busy { .. })), "{raced:?}");

    let tokens = semantic_tokens(&session, &analyzer, id, &cancel)
        .unwrap()
        .unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!((tokens[0].line, tokens[0].col, tokens[0].length), (0, 6, 5));
}

#[test]
fn test_busy_waits_for_edits_to_settle() {
    let session = Session::new(config());
    let id = session.open(SOURCE, TemplateLanguage::Markup);
    let analyzer = Racing::new(&session, 1);
    let cancel = CancellationToken::new();

    thread::scope(|scope| {
        // keeps typing for a while after the racing edit
        scope.spawn(|| {
            for i in 0..5 {
                thread::sleep(Duration::from_millis(5));
                session.change(id, format!("{SOURCE}{}", " ".repeat(i))).unwrap();
            }
        });

        let started = Instant::now();
        let result = find_references(&session, &analyzer, id, 7.into(), &cancel);
        assert!(result.unwrap_err().is_busy());
        assert!(started.elapsed() >= config().settle_interval);
    });
}

#[test]
fn test_settle_wait_is_cancellable() {
    let session = Session::new(SessionConfig {
        settle_interval: Duration::from_millis(50),
        max_settle: Duration::from_secs(30),
        ..SessionConfig::default()
    });
    let id = session.open(SOURCE, TemplateLanguage::Markup);
    let cancel = CancellationToken::new();
    let stop = Mutex::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            let mut i = 0;
            while !*stop.lock() {
                i += 1;
                session.change(id, format!("{SOURCE}{i}")).unwrap();
                thread::sleep(Duration::from_millis(5));
            }
        });
        scope.spawn(|| {
            thread::sleep(Duration::from_millis(100));
            cancel.cancel();
        });

        let started = Instant::now();
        let waited = session.wait_for_settle(id, &cancel);
        *stop.lock() = true;
        assert_eq!(waited, Err(AnalysisError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    });
}

#[test]
fn test_rebuild_all_in_parallel() {
    let session = Session::new(config());
    let ids: Vec<DocumentId> = (0..16)
        .map(|i| session.open(format!("<c{i}></c{i}>"), TemplateLanguage::Markup))
        .collect();
    for id in &ids {
        session.change(*id, "<p>{{ x }}</p>").unwrap();
    }

    let mut rebuilt = session.rebuild_all();
    rebuilt.sort_by_key(|(id, _)| *id);
    assert_eq!(rebuilt.len(), ids.len());
    assert!(
        rebuilt
            .iter()
            .all(|(_, outcome)| *outcome == RebuildOutcome::Installed { version: 2 })
    );
    assert!(session.rebuild_all().is_empty());
}

#[test]
fn test_concurrent_edits_never_install_stale_text() {
    let session = Session::new(config());
    let id = session.open(SOURCE, TemplateLanguage::Markup);

    thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..50 {
                session.change(id, format!("<p>{{{{ v{i} }}}}</p>")).unwrap();
            }
        });
        for _ in 0..50 {
            if let Ok(RebuildOutcome::Superseded { built, current }) = session.rebuild(id) {
                assert!(built < current);
            }
        }
    });

    let doc = session.virtual_document(id, &CancellationToken::new()).unwrap();
    assert_eq!(Some(doc.version), session.version(id));
    assert!(doc.text.contains("{v49};"));
}

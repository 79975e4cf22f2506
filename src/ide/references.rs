//! Find references and rename through the virtual document.
//!
//! The cursor is mapped forward with the requested capability, the analyzer
//! is asked at every synthetic position it lands on, and results located in
//! virtual documents are mapped back. Results in ordinary documents (script
//! files the analyzer sees directly) are kept as they are.

use indexmap::IndexSet;
use tokio_util::sync::CancellationToken;

use crate::base::{DocumentId, TextRange, TextSize};
use crate::error::AnalysisError;
use crate::source_map::Capability;

use super::analyzer::{ExternalAnalyzer, Location};
use super::session::Session;

/// All references to the symbol at `offset` of an original document.
pub fn find_references(
    session: &Session,
    analyzer: &dyn ExternalAnalyzer,
    file: DocumentId,
    offset: TextSize,
    cancel: &CancellationToken,
) -> Result<Vec<Location>, AnalysisError> {
    locate(session, file, offset, Capability::References, cancel, |file, offset| {
        analyzer.find_references(file, offset)
    })
}

/// Every location a rename of the symbol at `offset` has to edit.
pub fn rename_locations(
    session: &Session,
    analyzer: &dyn ExternalAnalyzer,
    file: DocumentId,
    offset: TextSize,
    cancel: &CancellationToken,
) -> Result<Vec<Location>, AnalysisError> {
    locate(session, file, offset, Capability::Rename, cancel, |file, offset| {
        analyzer.rename_locations(file, offset)
    })
}

fn locate(
    session: &Session,
    file: DocumentId,
    offset: TextSize,
    capability: Capability,
    cancel: &CancellationToken,
    query: impl Fn(DocumentId, TextSize) -> Vec<Location>,
) -> Result<Vec<Location>, AnalysisError> {
    let found = session.request(file, cancel, |doc| {
        let mut found = IndexSet::new();
        for cursor in doc.source_map.to_synthetic(TextRange::empty(offset), capability) {
            for location in query(doc.id, cursor.range.start()) {
                found.extend(to_source(session, location, capability));
            }
        }
        found
    })?;
    Ok(found.into_iter().collect())
}

/// Map an analyzer location back to original documents.
fn to_source(session: &Session, location: Location, capability: Capability) -> Vec<Location> {
    if !location.file.is_virtual() {
        return vec![location];
    }
    let original = location.file.original();
    let Some(doc) = session.installed(original) else {
        return Vec::new();
    };
    doc.source_map
        .to_original(location.range, capability)
        .into_iter()
        .map(|mapped| Location::new(original, mapped.range))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::ide::analyzer::ClassifiedSpan;
    use crate::ide::diagnostics::Diagnostic;
    use crate::ide::session::{SessionConfig, TemplateLanguage};

    /// Answers with every occurrence of `name` in the queried virtual
    /// document plus a fixed location in a plain script file.
    struct Finder<'a> {
        session: &'a Session,
        name: &'static str,
        script: Location,
        queries: Mutex<Vec<(DocumentId, TextSize)>>,
    }

    impl Finder<'_> {
        fn occurrences(&self, file: DocumentId, offset: TextSize) -> Vec<Location> {
            self.queries.lock().push((file, offset));
            let Some(doc) = self.session.installed(file.original()) else {
                return Vec::new();
            };
            let mut found: Vec<Location> = doc
                .text
                .match_indices(self.name)
                .map(|(start, name)| {
                    Location::new(file, TextRange::at(TextSize::from(start as u32), TextSize::of(name)))
                })
                .collect();
            found.push(self.script);
            found.push(self.script);
            found
        }
    }

    impl ExternalAnalyzer for Finder<'_> {
        fn encoded_classifications(&self, _: DocumentId, _: TextRange) -> Vec<ClassifiedSpan> {
            Vec::new()
        }
        fn find_references(&self, file: DocumentId, offset: TextSize) -> Vec<Location> {
            self.occurrences(file, offset)
        }
        fn rename_locations(&self, file: DocumentId, offset: TextSize) -> Vec<Location> {
            self.occurrences(file, offset)
        }
        fn diagnostics(&self, _: DocumentId) -> Vec<Diagnostic> {
            Vec::new()
        }
        fn document_text(&self, file: DocumentId) -> Option<Arc<str>> {
            self.session.installed(file.original()).map(|doc| Arc::clone(&doc.text))
        }
    }

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(start.into(), end.into())
    }

    fn finder(session: &Session) -> Finder<'_> {
        Finder {
            session,
            name: "count",
            script: Location::new(DocumentId::new(99), range(3, 8)),
            queries: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_references_map_back_and_deduplicate() {
        let session = Session::new(SessionConfig::default());
        let id = session.open("<p>{{ count }}{{ count }}</p>", TemplateLanguage::Markup);
        let analyzer = finder(&session);

        let found =
            find_references(&session, &analyzer, id, 8.into(), &CancellationToken::new()).unwrap();
        assert_eq!(
            found,
            vec![
                Location::new(id, range(6, 11)),
                Location::new(id, range(17, 22)),
                analyzer.script,
            ]
        );

        let queries = analyzer.queries.lock();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].0, id.virtual_of());
    }

    #[test]
    fn test_unmapped_cursor_never_reaches_analyzer() {
        let session = Session::new(SessionConfig::default());
        let id = session.open("<p>{{ count }}</p>", TemplateLanguage::Markup);
        let analyzer = finder(&session);

        // `<` belongs to no mapping
        let found =
            rename_locations(&session, &analyzer, id, 0.into(), &CancellationToken::new()).unwrap();
        assert!(found.is_empty());
        assert!(analyzer.queries.lock().is_empty());

        // the tag name is rename capable
        rename_locations(&session, &analyzer, id, 1.into(), &CancellationToken::new()).unwrap();
        assert!(!analyzer.queries.lock().is_empty());
    }

    #[test]
    fn test_rename_uses_rename_capable_mappings() {
        let session = Session::new(SessionConfig::default());
        let id = session.open("<p>{{ count }}</p>", TemplateLanguage::Markup);
        let analyzer = finder(&session);

        let found =
            rename_locations(&session, &analyzer, id, 6.into(), &CancellationToken::new()).unwrap();
        assert_eq!(found[0], Location::new(id, range(6, 11)));
    }
}

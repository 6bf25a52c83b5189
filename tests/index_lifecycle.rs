#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use glaive::analysis::WhitespaceAnalyzer;
    use glaive::error::ErrorKind;
    use glaive::index::document::Document;
    use glaive::index::field_infos::FieldInfos;
    use glaive::index::reader::IndexReader;
    use glaive::index::term::Term;
    use glaive::index::writer::{IndexWriter, IndexWriterConfig, OpenMode};
    use glaive::query::Query;
    use glaive::search::Searcher;
    use glaive::storage::Storage;
    use glaive::storage::file::FileStorage;
    use glaive::storage::memory::MemoryStorage;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::TempDir;

    fn writer(storage: &Arc<dyn Storage>, mode: OpenMode, config: IndexWriterConfig) -> IndexWriter {
        IndexWriter::open(
            Arc::clone(storage),
            Arc::new(WhitespaceAnalyzer::default()),
            mode,
            config,
        )
        .unwrap()
    }

    fn small_segments() -> IndexWriterConfig {
        IndexWriterConfig {
            max_buffered_docs: 3,
            merge_factor: 2,
            ..Default::default()
        }
    }

    fn doc(id: u32, body: &str) -> Document {
        Document::new().add_field("id", id.to_string()).add_field("body", body)
    }

    #[test]
    fn test_delete_keeps_max_doc() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut w = writer(&storage, OpenMode::Create(FieldInfos::default()), IndexWriterConfig::default());
        for i in 0..4 {
            w.add_document(&doc(i, "shared text")).unwrap();
        }
        assert_eq!(w.delete_term("id", "2").unwrap(), 1);
        w.close().unwrap();

        let reader = IndexReader::open(Arc::clone(&storage)).unwrap();
        assert_eq!(reader.max_doc(), 4);
        assert_eq!(reader.num_docs(), 3);
        assert!(reader.has_deletions());
        assert!(reader.is_deleted(2));
        // Stored data survives until a merge.
        assert_eq!(reader.get_document(2).unwrap().get_value("id"), Some("2"));

        let s = Searcher::new(reader);
        assert_eq!(s.search(&Query::term("body", "shared"), 0, 10).unwrap().docs(), vec![0, 1, 3]);
    }

    #[test]
    fn test_merge_preserves_live_documents() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut w = writer(&storage, OpenMode::Create(FieldInfos::default()), small_segments());
        for i in 0..20 {
            w.add_document(&doc(i, if i % 2 == 0 { "even" } else { "odd" })).unwrap();
        }
        w.delete_term("id", "4").unwrap();
        w.delete_term("id", "5").unwrap();
        w.optimize().unwrap();
        assert_eq!(w.segment_count(), 1);
        w.close().unwrap();

        let reader = IndexReader::open(storage).unwrap();
        assert_eq!(reader.max_doc(), 18);
        assert_eq!(reader.num_docs(), 18);
        assert!(!reader.has_deletions());
        let ids: BTreeSet<String> = (0..reader.max_doc())
            .map(|d| reader.get_document(d).unwrap().get_value("id").unwrap_or_default().to_string())
            .collect();
        assert!(!ids.contains("4"));
        assert!(!ids.contains("5"));
        assert_eq!(ids.len(), 18);
        assert_eq!(reader.doc_freq(&Term::new("body", "even")).unwrap(), 9);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut w = writer(&storage, OpenMode::Create(FieldInfos::default()), IndexWriterConfig::default());
        w.add_document(&doc(0, "first")).unwrap();
        w.commit().unwrap();

        let reader = IndexReader::open(Arc::clone(&storage)).unwrap();
        assert!(reader.is_latest().unwrap());
        let same = reader.reopen().unwrap();
        assert_eq!(same.version(), reader.version());
        assert_eq!(same.max_doc(), 1);

        w.add_document(&doc(1, "second")).unwrap();
        w.commit().unwrap();
        assert!(!reader.is_latest().unwrap());
        // The old snapshot is unchanged.
        assert_eq!(reader.max_doc(), 1);
        let fresh = reader.reopen().unwrap();
        assert!(fresh.version() > reader.version());
        assert_eq!(fresh.max_doc(), 2);
        let again = fresh.reopen().unwrap();
        assert_eq!(again.version(), fresh.version());
        assert_eq!(again.max_doc(), 2);
        w.close().unwrap();
    }

    #[test]
    fn test_reopen_after_recreate_sees_new_content() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut w = writer(&storage, OpenMode::Create(FieldInfos::default()), IndexWriterConfig::default());
        w.add_document(&doc(0, "old")).unwrap();
        w.close().unwrap();
        let reader = IndexReader::open(Arc::clone(&storage)).unwrap();

        // Same number of documents in the single new segment.
        let mut w = writer(&storage, OpenMode::Create(FieldInfos::default()), IndexWriterConfig::default());
        w.add_document(&doc(0, "new")).unwrap();
        w.close().unwrap();

        let reopened = reader.reopen().unwrap();
        assert!(reopened.version() > reader.version());
        assert_eq!(reopened.max_doc(), 1);
        assert_eq!(reopened.doc_freq(&Term::new("body", "new")).unwrap(), 1);
        assert_eq!(reopened.doc_freq(&Term::new("body", "old")).unwrap(), 0);
        assert_eq!(reopened.get_document(0).unwrap().get_value("body"), Some("new"));

        // The old snapshot keeps serving the old content.
        assert_eq!(reader.doc_freq(&Term::new("body", "old")).unwrap(), 1);
    }

    #[test]
    fn test_lazy_document_round_trip() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut w = writer(&storage, OpenMode::Create(FieldInfos::default()), IndexWriterConfig::default());
        let mut original = Document::new().add_field("title", "Lazy Loading");
        original.push_value("tag", "one");
        original.push_value("tag", "two");
        w.add_document(&original).unwrap();
        w.close().unwrap();

        let reader = IndexReader::open(storage).unwrap();
        let lazy = reader.get_lazy_doc(0).unwrap();
        let tag = lazy.get("tag").unwrap();
        assert!(!tag.is_loaded(0));
        assert_eq!(tag.values().unwrap(), vec!["one", "two"]);
        assert!(tag.is_loaded(0));
        assert_eq!(lazy.get_value("title").unwrap(), Some("Lazy Loading"));
        let loaded = lazy.load().unwrap();
        assert_eq!(loaded.get_value("title"), original.get_value("title"));
        assert_eq!(loaded.get("tag").map(|f| f.values.clone()), Some(vec!["one".to_string(), "two".to_string()]));
    }

    #[test]
    fn test_term_enum_skip_to_is_forward_only() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut w = writer(&storage, OpenMode::Create(FieldInfos::default()), small_segments());
        for (i, body) in ["apple cherry", "banana", "date apple", "elder fig", "cherry"].iter().enumerate() {
            w.add_document(&doc(i as u32, body)).unwrap();
        }
        w.close().unwrap();

        let reader = IndexReader::open(storage).unwrap();
        let mut terms = reader.terms("body").unwrap();
        assert!(terms.skip_to("c").unwrap());
        assert_eq!(terms.text(), Some("cherry"));
        assert_eq!(terms.doc_freq(), 2);
        assert!(terms.skip_to("apple").unwrap());
        assert_eq!(terms.text(), Some("cherry"));
        assert!(terms.next().unwrap());
        assert_eq!(terms.text(), Some("date"));
        let mut seen = Vec::new();
        while terms.next().unwrap() {
            seen.push(terms.text().unwrap_or_default().to_string());
        }
        assert_eq!(seen, vec!["elder", "fig"]);
    }

    #[test]
    fn test_term_docs_skip_to() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut w = writer(&storage, OpenMode::Create(FieldInfos::default()), small_segments());
        for i in 0..40 {
            w.add_document(&doc(i, if i % 3 == 0 { "hit hit" } else { "miss" })).unwrap();
        }
        w.close().unwrap();

        let reader = IndexReader::open(storage).unwrap();
        let mut docs = reader.term_docs(&Term::new("body", "hit")).unwrap();
        assert!(docs.skip_to(10).unwrap());
        assert_eq!(docs.doc(), 12);
        assert_eq!(docs.freq(), 2);
        assert!(docs.skip_to(12).unwrap());
        assert_eq!(docs.doc(), 12);
        assert!(docs.next().unwrap());
        assert_eq!(docs.doc(), 15);
        assert!(docs.skip_to(39).unwrap());
        assert_eq!(docs.doc(), 39);
        assert!(!docs.next().unwrap());
    }

    #[test]
    fn test_file_storage_index() {
        let dir = TempDir::new().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path()).unwrap());
        let mut w = writer(&storage, OpenMode::CreateIfMissing(FieldInfos::default()), small_segments());
        for i in 0..10 {
            w.add_document(&doc(i, "on disk")).unwrap();
        }
        w.close().unwrap();

        // A second store over the same directory sees the committed index.
        let reopened: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path()).unwrap());
        let mut w = writer(&reopened, OpenMode::Append, IndexWriterConfig::default());
        w.add_document(&doc(10, "on disk")).unwrap();
        w.close().unwrap();

        let s = Searcher::new(IndexReader::open(reopened).unwrap());
        assert_eq!(s.search(&Query::term("body", "disk"), 0, 20).unwrap().total_hits, 11);
    }

    #[test]
    fn test_second_writer_is_locked_out() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut first = writer(&storage, OpenMode::Create(FieldInfos::default()), IndexWriterConfig::default());
        let err = IndexWriter::open(
            Arc::clone(&storage),
            Arc::new(WhitespaceAnalyzer::default()),
            OpenMode::Append,
            IndexWriterConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lock);
        first.close().unwrap();
        let mut second = writer(&storage, OpenMode::Append, IndexWriterConfig::default());
        second.close().unwrap();
    }

    #[test]
    fn test_append_without_index_fails() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let err = IndexWriter::open(
            storage,
            Arc::new(WhitespaceAnalyzer::default()),
            OpenMode::Append,
            IndexWriterConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_random_adds_deletes_and_merges() {
        let mut rng = StdRng::seed_from_u64(42);
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut w = writer(&storage, OpenMode::Create(FieldInfos::default()), small_segments());
        let words = ["red", "green", "blue", "cyan"];
        let mut live: Vec<(u32, &str)> = Vec::new();
        for id in 0..120 {
            let word = words[rng.random_range(0..words.len())];
            w.add_document(&doc(id, word)).unwrap();
            live.push((id, word));
            if rng.random_bool(0.15) && !live.is_empty() {
                let victim = live.remove(rng.random_range(0..live.len()));
                assert_eq!(w.delete_term("id", &victim.0.to_string()).unwrap(), 1);
            }
            if rng.random_bool(0.05) {
                w.optimize().unwrap();
            }
        }
        w.close().unwrap();

        let reader = IndexReader::open(storage).unwrap();
        assert_eq!(reader.num_docs() as usize, live.len());
        let s = Searcher::new(reader);
        for word in words {
            let expected = live.iter().filter(|(_, w)| *w == word).count() as u64;
            let top = s.search(&Query::term("body", word), 0, 200).unwrap();
            assert_eq!(top.total_hits, expected, "{word}");
        }
        let mut ids: Vec<u32> = Vec::new();
        for doc in s.search(&Query::match_all(), 0, 500).unwrap().docs() {
            let stored = s.get_document(doc).unwrap();
            ids.push(stored.get_value("id").unwrap_or_default().parse().unwrap());
        }
        ids.sort_unstable();
        let expected: Vec<u32> = live.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, expected);
    }
}

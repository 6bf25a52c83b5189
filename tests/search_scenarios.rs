#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glaive::analysis::StandardAnalyzer;
    use glaive::error::ErrorKind;
    use glaive::index::document::Document;
    use glaive::index::field_infos::{FieldInfo, FieldInfos, IndexValue, StoreValue, TermVectorValue};
    use glaive::index::reader::IndexReader;
    use glaive::index::writer::{IndexWriter, IndexWriterConfig, OpenMode};
    use glaive::query::{
        BooleanQuery, FuzzyQuery, PhraseQuery, PrefixQuery, Query, QueryParser, QueryParserConfig, RangeQuery,
        WildcardQuery,
    };
    use glaive::search::{HighlightOptions, Searcher};
    use glaive::storage::Storage;
    use glaive::storage::memory::MemoryStorage;

    fn body_schema() -> FieldInfos {
        let mut infos = FieldInfos::default();
        infos
            .add_field(
                FieldInfo::new(
                    "body",
                    StoreValue::Yes,
                    IndexValue::Yes,
                    TermVectorValue::WithPositionsOffsets,
                )
                .unwrap(),
            )
            .unwrap();
        infos
    }

    fn index(bodies: &[&str]) -> Arc<dyn Storage> {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut writer = IndexWriter::open(
            Arc::clone(&storage),
            Arc::new(StandardAnalyzer::default()),
            OpenMode::Create(body_schema()),
            IndexWriterConfig::default(),
        )
        .unwrap();
        for body in bodies {
            writer.add_document(&Document::new().add_field("body", *body)).unwrap();
        }
        writer.close().unwrap();
        storage
    }

    fn searcher(bodies: &[&str]) -> Searcher {
        Searcher::new(IndexReader::open(index(bodies)).unwrap())
    }

    #[test]
    fn test_single_term_hit() {
        let s = searcher(&["the quick brown fox"]);
        let top = s.search(&Query::term("body", "fox"), 0, 10).unwrap();
        assert_eq!(top.total_hits, 1);
        assert_eq!(top.hits.len(), 1);
        assert_eq!(top.hits[0].doc, 0);
    }

    #[test]
    fn test_must_not_excludes() {
        let s = searcher(&["cat sat", "cat ran"]);
        let q = Query::from(
            BooleanQuery::new()
                .must(Query::term("body", "cat"))
                .must_not(Query::term("body", "ran")),
        );
        let top = s.search(&q, 0, 10).unwrap();
        assert_eq!(top.total_hits, 1);
        assert_eq!(top.hits[0].doc, 0);
    }

    #[test]
    fn test_phrase_slop() {
        let s = searcher(&["the quick brown fox"]);
        let phrase = PhraseQuery::new("body").with_terms(&["quick", "fox"]);
        let sloppy = Query::from(phrase.clone().with_slop(1));
        assert_eq!(s.search(&sloppy, 0, 10).unwrap().total_hits, 1);
        let exact = Query::from(phrase.with_slop(0));
        assert_eq!(s.search(&exact, 0, 10).unwrap().total_hits, 0);
    }

    #[test]
    fn test_parsed_query_equals_built_query() {
        let s = searcher(&["cat dog", "cat", "dog"]);
        let parser = QueryParser::for_reader(
            s.reader(),
            Arc::new(StandardAnalyzer::default()),
            QueryParserConfig {
                default_fields: Some(vec!["body".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();
        let parsed = parser.parse("cat AND dog").unwrap();
        let built = Query::from(
            BooleanQuery::new()
                .must(Query::term("body", "cat"))
                .must(Query::term("body", "dog")),
        );
        assert_eq!(parsed, built);
        assert_eq!(s.search(&parsed, 0, 10).unwrap(), s.search(&built, 0, 10).unwrap());
        assert_eq!(s.search(&parsed, 0, 10).unwrap().docs(), vec![0]);
    }

    #[test]
    fn test_explain_equals_search_score() {
        let s = searcher(&[
            "the quick brown fox jumps over the lazy dog",
            "quick quick fox",
            "a lazy afternoon",
            "brown dog and brown fox",
        ]);
        let queries = vec![
            Query::term("body", "fox"),
            Query::from(
                BooleanQuery::new()
                    .should(Query::term("body", "quick"))
                    .should(Query::term("body", "brown").with_boost(3.0))
                    .must_not(Query::term("body", "afternoon")),
            ),
            Query::from(PhraseQuery::new("body").with_terms(&["brown", "fox"]).with_slop(2)),
            Query::from(PrefixQuery::new("body", "la")),
            Query::from(WildcardQuery::new("body", "?ox")),
            Query::from(FuzzyQuery::new("body", "quack")),
            Query::from(RangeQuery::new("body", Some("brown"), Some("dog"), true, true).unwrap()),
            Query::match_all(),
        ];
        for q in &queries {
            let top = s.search(q, 0, 10).unwrap();
            assert!(top.total_hits > 0, "{q} matched nothing");
            for hit in &top.hits {
                let e = s.explain(q, hit.doc).unwrap();
                assert!(e.is_match(), "{q}: {e}");
                assert!((e.value - hit.score).abs() < 1e-5, "{q} on {}: {} vs {}", hit.doc, e.value, hit.score);
            }
        }
    }

    #[test]
    fn test_expansion_cap_is_an_error() {
        let s = searcher(&["aa ab ac ad ae"]);
        let capped = Query::from(PrefixQuery::new("body", "a").with_max_terms(3));
        let err = s.search(&capped, 0, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyClauses);
        let truncated = Query::from(
            PrefixQuery::new("body", "a")
                .with_max_terms(3)
                .with_truncate_expansion(true),
        );
        assert_eq!(s.search(&truncated, 0, 10).unwrap().total_hits, 1);
    }

    #[test]
    fn test_highlight_marks_query_terms() {
        let s = searcher(&["the quick brown fox jumps over the lazy dog"]);
        let q = Query::from(
            BooleanQuery::new()
                .should(Query::term("body", "quick"))
                .should(Query::term("body", "dog")),
        );
        let options = HighlightOptions {
            pre_tag: "[".to_string(),
            post_tag: "]".to_string(),
            ..Default::default()
        };
        let excerpts = s.highlight(&q, 0, "body", &options).unwrap().unwrap();
        assert_eq!(excerpts, vec!["the [quick] brown fox jumps over the lazy [dog]".to_string()]);
    }
}

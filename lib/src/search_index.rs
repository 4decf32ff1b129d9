//! The Search Index (SI): an inverted index over note bodies. See
//! `spec.md` ss4.7.
//!
//! Implemented with `tantivy`, grounded by the retrieval pack's
//! `tantivy`-based indexers (`sidecar`'s file index, `claude-view`'s db
//! crate pairing `sqlx` with `tantivy`). The analyzer pipeline follows
//! spec ss4.7 literally: tokenize, lowercase, then synonym-expand each
//! token against a configured map.

use std::collections::HashMap;
use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Field;
use tantivy::schema::Schema;
use tantivy::schema::Value;
use tantivy::schema::STORED;
use tantivy::schema::STRING;
use tantivy::tokenizer::LowerCaser;
use tantivy::tokenizer::SimpleTokenizer;
use tantivy::tokenizer::TextAnalyzer;
use tantivy::Index;
use tantivy::IndexReader;
use tantivy::TantivyDocument;
use tantivy::Term;
use tracing::warn;

use crate::contracts::SearchIndex;
use crate::error::NoteResult;

const ANALYZER_NAME: &str = "note_body_analyzer";
const WRITER_HEAP_BYTES: usize = 32 * 1024 * 1024;

/// Each matching token emits itself plus all configured synonyms, per spec
/// ss4.7 "synonym expansion from a configured `{term: [synonyms]}`
/// mapping".
#[derive(Clone)]
struct SynonymFilter {
    synonyms: std::sync::Arc<HashMap<String, Vec<String>>>,
}

impl tantivy::tokenizer::TokenFilter for SynonymFilter {
    type Tokenizer<T: tantivy::tokenizer::Tokenizer> = SynonymFilterWrapper<T>;

    fn transform<T: tantivy::tokenizer::Tokenizer>(self, tokenizer: T) -> SynonymFilterWrapper<T> {
        SynonymFilterWrapper {
            inner: tokenizer,
            synonyms: self.synonyms,
        }
    }
}

#[derive(Clone)]
struct SynonymFilterWrapper<T> {
    inner: T,
    synonyms: std::sync::Arc<HashMap<String, Vec<String>>>,
}

impl<T: tantivy::tokenizer::Tokenizer> tantivy::tokenizer::Tokenizer for SynonymFilterWrapper<T> {
    type TokenStream<'a> = SynonymTokenStream<T::TokenStream<'a>>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        SynonymTokenStream {
            inner: self.inner.token_stream(text),
            synonyms: self.synonyms.clone(),
            pending: Vec::new(),
        }
    }
}

struct SynonymTokenStream<S> {
    inner: S,
    synonyms: std::sync::Arc<HashMap<String, Vec<String>>>,
    pending: Vec<String>,
}

impl<S: tantivy::tokenizer::TokenStream> tantivy::tokenizer::TokenStream for SynonymTokenStream<S> {
    fn advance(&mut self) -> bool {
        if let Some(next) = self.pending.pop() {
            self.token_mut().text = next;
            return true;
        }
        if !self.inner.advance() {
            return false;
        }
        if let Some(expansions) = self.synonyms.get(&self.inner.token().text) {
            self.pending = expansions.clone();
        }
        true
    }

    fn token(&self) -> &tantivy::tokenizer::Token {
        self.inner.token()
    }

    fn token_mut(&mut self) -> &mut tantivy::tokenizer::Token {
        self.inner.token_mut()
    }
}

pub struct TantivySearchIndex {
    index: Index,
    reader: IndexReader,
    title_field: Field,
    content_field: Field,
    write_lock: tokio::sync::Mutex<()>,
}

impl TantivySearchIndex {
    /// Opens (creating if absent) the index at `index_dir`, per spec ss6
    /// "SI at `<data>/index/` (engine-native files)".
    pub fn open_or_create(
        index_dir: &Path,
        synonyms: HashMap<String, Vec<String>>,
    ) -> NoteResult<Self> {
        std::fs::create_dir_all(index_dir)?;

        let mut schema_builder = Schema::builder();
        let title_field = schema_builder.add_text_field("title", STRING | STORED);
        let content_field = schema_builder.add_text_field(
            "content",
            tantivy::schema::TextOptions::default()
                .set_indexing_options(
                    tantivy::schema::TextFieldIndexing::default()
                        .set_tokenizer(ANALYZER_NAME)
                        .set_index_option(tantivy::schema::IndexRecordOption::WithFreqsAndPositions),
                )
                .set_stored(),
        );
        let schema = schema_builder.build();

        let mmap_dir = tantivy::directory::MmapDirectory::open(index_dir)
            .map_err(tantivy::TantivyError::from)?;
        let index = Index::open_or_create(mmap_dir, schema)?;

        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(SynonymFilter {
                synonyms: std::sync::Arc::new(synonyms),
            })
            .build();
        index.tokenizers().register(ANALYZER_NAME, analyzer);

        let reader = index
            .reader_builder()
            .reload_policy(tantivy::ReloadPolicy::OnCommitWithDelay)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            title_field,
            content_field,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }
}

/// `Index`/`IndexReader` are `Clone` (internally `Arc`-backed) and
/// `Send + Sync`, so they're cloned into the closure and the actual
/// `tantivy` segment I/O runs off the async runtime, matching
/// `content_store.rs`'s `spawn_blocking` pattern for `git2`.
#[async_trait::async_trait]
impl SearchIndex for TantivySearchIndex {
    async fn update_document(&self, title: &str, content: &str) -> NoteResult<()> {
        let _guard = self.write_lock.lock().await;
        let index = self.index.clone();
        let title_field = self.title_field;
        let content_field = self.content_field;
        let title = title.to_string();
        let content = content.to_string();
        tokio::task::spawn_blocking(move || {
            update_document_blocking(&index, title_field, content_field, &title, &content)
        })
        .await?
    }

    async fn delete_by_title(&self, title: &str) -> NoteResult<()> {
        let _guard = self.write_lock.lock().await;
        let index = self.index.clone();
        let title_field = self.title_field;
        let title = title.to_string();
        tokio::task::spawn_blocking(move || delete_by_title_blocking(&index, title_field, &title)).await?
    }

    async fn search(&self, keyword: &str, limit: usize) -> NoteResult<Vec<String>> {
        if keyword.trim().is_empty() {
            return Ok(Vec::new());
        }
        let index = self.index.clone();
        let reader = self.reader.clone();
        let title_field = self.title_field;
        let content_field = self.content_field;
        let keyword = keyword.to_string();
        tokio::task::spawn_blocking(move || {
            search_blocking(&index, &reader, title_field, content_field, &keyword, limit)
        })
        .await?
    }
}

fn update_document_blocking(
    index: &Index,
    title_field: Field,
    content_field: Field,
    title: &str,
    content: &str,
) -> NoteResult<()> {
    let mut writer = index.writer(WRITER_HEAP_BYTES)?;
    writer.delete_term(Term::from_field_text(title_field, title));
    let mut doc = TantivyDocument::default();
    doc.add_text(title_field, title);
    doc.add_text(content_field, content);
    writer.add_document(doc)?;
    writer.commit()?;
    Ok(())
}

fn delete_by_title_blocking(index: &Index, title_field: Field, title: &str) -> NoteResult<()> {
    let mut writer: tantivy::IndexWriter<TantivyDocument> = index.writer(WRITER_HEAP_BYTES)?;
    writer.delete_term(Term::from_field_text(title_field, title));
    writer.commit()?;
    Ok(())
}

fn search_blocking(
    index: &Index,
    reader: &IndexReader,
    title_field: Field,
    content_field: Field,
    keyword: &str,
    limit: usize,
) -> NoteResult<Vec<String>> {
    let searcher = reader.searcher();
    let parser = QueryParser::for_index(index, vec![content_field]);
    let query = match parser.parse_query(keyword) {
        Ok(query) => query,
        Err(err) => {
            warn!(%err, keyword, "failed to parse search keyword, returning no hits");
            return Ok(Vec::new());
        }
    };
    let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
    let mut titles = Vec::with_capacity(top_docs.len());
    for (_score, doc_address) in top_docs {
        let doc: TantivyDocument = searcher.doc(doc_address)?;
        if let Some(title) = doc.get_first(title_field).and_then(|value| value.as_str()) {
            titles.push(title.to_string());
        }
    }
    Ok(titles)
}

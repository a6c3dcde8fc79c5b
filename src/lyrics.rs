//! Lyrics search provider backed by a per-worker inverted index.
//!
//! At startup every file in the corpus directory is indexed: the first line
//! is the canonical reference returned to the user, the remaining lines are
//! the searchable body, the filename is the title. The index is write-once;
//! rebuilding requires a fresh process.

use std::fs;
use std::path::PathBuf;

use rand::seq::IteratorRandom;
use regex::Regex;
use tantivy::collector::DocSetCollector;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, STORED, Schema, TEXT, Value};
use tantivy::{Index, IndexReader, TantivyDocument, doc};
use tracing::{debug, info, warn};

use crate::answer::Answer;
use crate::config::Config;
use crate::provider::{AnswerProvider, InitError, ProviderError};

/// Writer heap for the one-shot index build.
const WRITER_HEAP_BYTES: usize = 50_000_000;

enum IndexState {
    Unbuilt,
    Building,
    Ready(ReadyIndex),
}

struct ReadyIndex {
    index: Index,
    reader: IndexReader,
    path: Field,
    body: Field,
}

pub struct LyricsSearchEngine {
    corpus_dir: PathBuf,
    index_base: PathBuf,
    worker_id: Option<u32>,
    trigger: Regex,
    command_prefix: char,
    state: IndexState,
}

impl LyricsSearchEngine {
    pub fn new(config: &Config) -> Self {
        // The trigger phrase is matched literally, with an optional comma,
        // at the start of the already lower-cased message.
        let pattern = format!(r"^{},?\s+(.+)$", regex::escape(&config.lyrics_trigger));
        let trigger = Regex::new(&pattern).expect("escaped trigger phrase compiles");

        Self {
            corpus_dir: config.corpus_dir.clone(),
            index_base: config.data_dir.clone(),
            worker_id: config.worker_id,
            trigger,
            command_prefix: config.command_prefix,
            state: IndexState::Unbuilt,
        }
    }

    /// Index directory for this worker.
    ///
    /// Workers never share an index, so the directory is keyed by the
    /// configured worker id, or by the process id when no worker manager
    /// assigns one.
    fn index_dir(&self) -> PathBuf {
        let worker = self.worker_id.unwrap_or_else(std::process::id);
        self.index_base.join(format!("lyrics-index-{}", worker))
    }

    fn build_index(&self) -> Result<ReadyIndex, InitError> {
        let index_dir = self.index_dir();
        // Worker ids and pids recur across restarts; the index is built
        // fresh every run, so a leftover directory is wiped first.
        if index_dir.exists() {
            fs::remove_dir_all(&index_dir)
                .map_err(|e| InitError::Io { path: index_dir.clone(), source: e })?;
        }
        fs::create_dir_all(&index_dir)
            .map_err(|e| InitError::Io { path: index_dir.clone(), source: e })?;

        let mut builder = Schema::builder();
        let title = builder.add_text_field("title", STORED);
        let path = builder.add_text_field("path", STORED);
        let body = builder.add_text_field("body", TEXT);
        let schema = builder.build();

        let index = Index::create_in_dir(&index_dir, schema)?;
        let mut writer = index.writer(WRITER_HEAP_BYTES)?;

        let entries = fs::read_dir(&self.corpus_dir)
            .map_err(|e| InitError::Io { path: self.corpus_dir.clone(), source: e })?;

        let mut documents = 0usize;
        for entry in entries {
            let entry = entry
                .map_err(|e| InitError::Io { path: self.corpus_dir.clone(), source: e })?;
            let file_path = entry.path();
            if !file_path.is_file() {
                continue;
            }
            let content = fs::read_to_string(&file_path)
                .map_err(|e| InitError::Io { path: file_path.clone(), source: e })?;

            let mut lines = content.lines();
            let reference = match lines.next() {
                Some(line) => line,
                None => {
                    warn!("skipping empty lyrics file {}", file_path.display());
                    continue;
                }
            };
            let body_text = lines.collect::<Vec<_>>().join("\n");
            let file_title = entry.file_name().to_string_lossy().into_owned();

            writer.add_document(doc!(
                title => file_title,
                path => reference,
                body => body_text,
            ))?;
            documents += 1;
        }

        writer.commit()?;
        let reader = index.reader()?;

        info!(
            "lyrics index ready: {} documents in {}",
            documents,
            index_dir.display()
        );

        Ok(ReadyIndex { index, reader, path, body })
    }

    fn search(&self, terms: &str) -> Result<Option<Answer>, ProviderError> {
        let ready = match &self.state {
            IndexState::Ready(ready) => ready,
            IndexState::Unbuilt | IndexState::Building => {
                return Err(ProviderError::NotInitialized);
            }
        };

        let mut parser = QueryParser::for_index(&ready.index, vec![ready.body]);
        parser.set_conjunction_by_default();
        let query = match parser.parse_query(terms) {
            Ok(q) => q,
            Err(e) => {
                debug!("unparseable lyrics query '{}': {}", terms, e);
                return Ok(None);
            }
        };

        let searcher = ready.reader.searcher();
        let hits = searcher.search(&query, &DocSetCollector)?;

        // One hit is returned as-is; among several the pick is uniformly
        // random over the whole hit set, not the best-scored one.
        let addr = if hits.len() == 1 {
            hits.iter().next().copied()
        } else {
            hits.iter().choose(&mut rand::thread_rng()).copied()
        };
        let addr = match addr {
            Some(addr) => addr,
            None => return Ok(None),
        };

        let document: TantivyDocument = searcher.doc(addr)?;
        let reference = document
            .get_first(ready.path)
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if reference.is_empty() {
            return Ok(None);
        }
        Ok(Some(Answer::plain(reference)))
    }
}

impl AnswerProvider for LyricsSearchEngine {
    fn name(&self) -> &'static str {
        "lyrics"
    }

    fn init(&mut self) -> Result<(), InitError> {
        self.state = IndexState::Building;
        let ready = self.build_index()?;
        self.state = IndexState::Ready(ready);
        Ok(())
    }

    fn answer(&self, text: &str) -> Result<Option<Answer>, ProviderError> {
        // Command-style messages belong to other providers; never touch the
        // index for them.
        if text.chars().next() == Some(self.command_prefix) {
            return Ok(None);
        }
        let terms = match self.trigger.captures(text).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => return Ok(None),
        };
        self.search(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::{AnswerKind, RenderAs};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn test_config(corpus_dir: &TempDir, data_dir: &TempDir, worker_id: Option<u32>) -> Config {
        Config {
            corpus_dir: corpus_dir.path().to_path_buf(),
            data_dir: data_dir.path().to_path_buf(),
            wake_word: "lyra".to_string(),
            lyrics_trigger: "lyra song".to_string(),
            command_prefix: '/',
            worker_id,
        }
    }

    fn write_song(dir: &TempDir, name: &str, reference: &str, body: &str) {
        let content = format!("{}\n{}", reference, body);
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    fn ready_engine(corpus: &TempDir, data: &TempDir) -> LyricsSearchEngine {
        let mut engine = LyricsSearchEngine::new(&test_config(corpus, data, Some(1)));
        engine.init().expect("init should succeed");
        engine
    }

    #[test]
    fn test_hit_returns_reference_line() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");
        let engine = ready_engine(&corpus, &data);

        let answer = engine
            .answer("lyra song, love")
            .unwrap()
            .expect("should match");
        assert_eq!(answer.content, "http://x/song1");
        assert_eq!(answer.render_as, RenderAs::PlainText);
        assert_eq!(answer.kind, AnswerKind::Message);
        assert!(answer.transforms.is_empty());
    }

    #[test]
    fn test_no_match_returns_none() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");
        let engine = ready_engine(&corpus, &data);

        assert!(engine.answer("lyra song, zzzznotfound").unwrap().is_none());
    }

    #[test]
    fn test_terms_are_conjunctive() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "a.txt", "http://x/a", "hello world");
        write_song(&corpus, "b.txt", "http://x/b", "hello moon");
        let engine = ready_engine(&corpus, &data);

        let answer = engine.answer("lyra song, hello world").unwrap().unwrap();
        assert_eq!(answer.content, "http://x/a");
        // Both terms must match one document.
        assert!(engine.answer("lyra song, hello mars").unwrap().is_none());
    }

    #[test]
    fn test_command_prefix_short_circuits() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");
        let engine = ready_engine(&corpus, &data);

        // Even though the rest of the text would match, commands are
        // reserved for other providers.
        assert!(engine.answer("/lyra song, love").unwrap().is_none());

        // The guard runs before the index is ever consulted: on an engine
        // that has no index yet, a command still gets a clean None instead
        // of the not-initialized error.
        let unbuilt = LyricsSearchEngine::new(&test_config(&corpus, &data, Some(2)));
        assert!(unbuilt.answer("/lyra song, love").unwrap().is_none());
    }

    #[test]
    fn test_non_trigger_text_returns_none() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");
        let engine = ready_engine(&corpus, &data);

        assert!(engine.answer("tell me about love").unwrap().is_none());
        assert!(engine.answer("lyra song").unwrap().is_none());
        // Trigger must be at the start.
        assert!(engine.answer("please lyra song, love").unwrap().is_none());
    }

    #[test]
    fn test_trigger_comma_is_optional() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");
        let engine = ready_engine(&corpus, &data);

        let answer = engine.answer("lyra song love").unwrap().unwrap();
        assert_eq!(answer.content, "http://x/song1");
    }

    #[test]
    fn test_malformed_query_is_no_match() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");
        let engine = ready_engine(&corpus, &data);

        // An unbalanced quote fails the query parser; that is a no-match,
        // never an error.
        assert!(engine.answer("lyra song, \"unclosed").unwrap().is_none());
    }

    #[test]
    fn test_query_before_init_fails_fast() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");
        let engine = LyricsSearchEngine::new(&test_config(&corpus, &data, Some(1)));

        let err = engine.answer("lyra song, love").unwrap_err();
        assert!(matches!(err, ProviderError::NotInitialized));
    }

    #[test]
    fn test_empty_corpus_is_valid() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        let engine = ready_engine(&corpus, &data);

        assert!(engine.answer("lyra song, anything").unwrap().is_none());
    }

    #[test]
    fn test_empty_corpus_file_is_skipped() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        std::fs::write(corpus.path().join("empty.txt"), "").unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");
        let engine = ready_engine(&corpus, &data);

        let answer = engine.answer("lyra song, love").unwrap().unwrap();
        assert_eq!(answer.content, "http://x/song1");
    }

    #[test]
    fn test_missing_corpus_dir_is_fatal() {
        let data = TempDir::new().unwrap();
        let config = Config {
            corpus_dir: PathBuf::from("/nonexistent/lyrics"),
            data_dir: data.path().to_path_buf(),
            wake_word: "lyra".to_string(),
            lyrics_trigger: "lyra song".to_string(),
            command_prefix: '/',
            worker_id: Some(1),
        };
        let mut engine = LyricsSearchEngine::new(&config);
        let err = engine.init().unwrap_err();
        assert!(matches!(err, InitError::Io { .. }));
    }

    #[test]
    fn test_index_dir_is_namespaced_per_worker() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");

        let mut first = LyricsSearchEngine::new(&test_config(&corpus, &data, Some(7)));
        let mut second = LyricsSearchEngine::new(&test_config(&corpus, &data, Some(8)));
        first.init().unwrap();
        second.init().unwrap();

        assert!(data.path().join("lyrics-index-7").is_dir());
        assert!(data.path().join("lyrics-index-8").is_dir());
        assert_eq!(
            first.answer("lyra song, love").unwrap().unwrap().content,
            "http://x/song1"
        );
        assert_eq!(
            second.answer("lyra song, love").unwrap().unwrap().content,
            "http://x/song1"
        );
    }

    #[test]
    fn test_stale_index_dir_is_rebuilt() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "song1.txt", "http://x/song1", "hello world my love");

        // A previous run with the same worker id left an index behind.
        let mut engine = LyricsSearchEngine::new(&test_config(&corpus, &data, Some(1)));
        engine.init().unwrap();
        let mut again = LyricsSearchEngine::new(&test_config(&corpus, &data, Some(1)));
        again.init().unwrap();

        assert_eq!(
            again.answer("lyra song, love").unwrap().unwrap().content,
            "http://x/song1"
        );
    }

    #[test]
    fn test_multiple_hits_spread_uniformly() {
        let corpus = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        write_song(&corpus, "a.txt", "http://x/a", "love is in the air");
        write_song(&corpus, "b.txt", "http://x/b", "all you need is love");
        write_song(&corpus, "c.txt", "http://x/c", "love me tender");
        let engine = ready_engine(&corpus, &data);

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..300 {
            let answer = engine.answer("lyra song, love").unwrap().unwrap();
            *counts.entry(answer.content).or_insert(0) += 1;
        }

        assert_eq!(counts.len(), 3);
        // Each of the three matches should land around 100 of 300 draws;
        // 30 is far enough below to keep the test stable.
        for (reference, count) in counts {
            assert!(count > 30, "{} only drawn {} times", reference, count);
        }
    }
}

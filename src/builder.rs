use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::IndexError;
use crate::partial_index::PartialIndex;
use crate::tokenizer::tokenize_document;

/// A corpus document record (spec.md §6). `encoding` is required for a
/// document to be considered well-formed even though its value isn't
/// otherwise consulted by the tokenizer.
#[derive(Debug, Deserialize)]
struct CorpusDocument {
    content: String,
    url: String,
    #[allow(dead_code)]
    encoding: String,
}

/// Number of documents tokenized per rayon batch. Tokenization runs in
/// parallel across a batch; the resulting per-document mappings are
/// folded into the (single, serialized) in-memory `PartialIndex`
/// sequentially, per spec.md §5's concurrency model.
const TOKENIZE_CHUNK_SIZE: usize = 100;

/// Converts a directory of corpus documents into a sequence of sorted
/// partial-index files plus a `doc_id_map.json` sidecar (spec.md §4.3).
pub struct PartialIndexBuilder {
    batch_size: usize,
}

impl PartialIndexBuilder {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.batch_size)
    }

    pub fn build(
        &self,
        webpages_dir: &Path,
        partial_index_dir: &Path,
        index_dir: &Path,
    ) -> Result<(), IndexError> {
        ensure_empty_or_creatable(partial_index_dir)?;
        fs::create_dir_all(index_dir)?;

        let paths = walk_sorted(webpages_dir)?;
        tracing::info!(count = paths.len(), "discovered corpus files");

        let (doc_id_map, assigned_docs) = self.assign_doc_ids(&paths)?;
        tracing::info!(
            documents = assigned_docs.len(),
            distinct_urls = doc_id_map.len(),
            "assigned document IDs"
        );

        self.tokenize_and_flush(&assigned_docs, partial_index_dir)?;

        write_doc_id_map(index_dir, &doc_id_map)?;
        Ok(())
    }

    /// Sequential pass: reads each document's JSON, strips URL
    /// fragments, dedupes by canonical URL (first sighting wins), and
    /// assigns monotonically increasing doc_ids. Returns the doc_id→URL
    /// map alongside the (doc_id, HTML content) pairs still needing
    /// tokenization.
    fn assign_doc_ids(
        &self,
        paths: &[PathBuf],
    ) -> Result<(BTreeMap<u32, String>, Vec<(u32, String)>), IndexError> {
        let mut doc_id_map = BTreeMap::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut assigned = Vec::new();
        let mut next_doc_id: u32 = 0;

        for path in paths {
            let raw = fs::read_to_string(path)?;
            let doc: CorpusDocument =
                serde_json::from_str(&raw).map_err(|e| IndexError::Json {
                    path: path.clone(),
                    source: e,
                })?;

            let canonical_url = strip_fragment(&doc.url);
            if seen_urls.contains(&canonical_url) {
                continue;
            }
            seen_urls.insert(canonical_url.clone());

            let doc_id = next_doc_id;
            next_doc_id += 1;
            doc_id_map.insert(doc_id, canonical_url);
            assigned.push((doc_id, doc.content));
        }

        Ok((doc_id_map, assigned))
    }

    fn tokenize_and_flush(
        &self,
        assigned_docs: &[(u32, String)],
        partial_index_dir: &Path,
    ) -> Result<(), IndexError> {
        let mut current = PartialIndex::new();
        let mut seq: u32 = 0;

        for chunk in assigned_docs.chunks(TOKENIZE_CHUNK_SIZE) {
            let tokenized: Vec<_> = chunk
                .par_iter()
                .map(|(doc_id, content)| tokenize_document(content, *doc_id))
                .collect();

            for per_doc in tokenized {
                for (term, list) in per_doc {
                    current.add_posting_list(term, list)?;
                }
                if current.num_postings() >= self.batch_size {
                    flush(&current, partial_index_dir, seq)?;
                    seq += 1;
                    current = PartialIndex::new();
                }
            }
        }

        if current.num_postings() > 0 {
            flush(&current, partial_index_dir, seq)?;
        }

        Ok(())
    }
}

fn flush(index: &PartialIndex, partial_index_dir: &Path, seq: u32) -> Result<(), IndexError> {
    let path = partial_index_dir.join(format!("partial_index_{seq:03}.bin"));
    tracing::info!(?path, postings = index.num_postings(), "flushing partial index");
    let bytes = index.serialize()?;
    fs::write(&path, bytes)?;
    Ok(())
}

fn write_doc_id_map(index_dir: &Path, doc_id_map: &BTreeMap<u32, String>) -> Result<(), IndexError> {
    let path = index_dir.join("doc_id_map.json");
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, doc_id_map).map_err(|e| IndexError::Json {
        path,
        source: e,
    })?;
    Ok(())
}

fn walk_sorted(dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    Ok(paths)
}

fn strip_fragment(url: &str) -> String {
    match url.split_once('#') {
        Some((base, _fragment)) => base.to_string(),
        None => url.to_string(),
    }
}

fn ensure_empty_or_creatable(dir: &Path) -> Result<(), IndexError> {
    if dir.exists() {
        let mut entries = fs::read_dir(dir)?;
        if entries.next().is_some() {
            return Err(IndexError::ResourcePrecondition(format!(
                "{} must start empty",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_doc(dir: &Path, name: &str, content: &str, url: &str) {
        let body = serde_json::json!({
            "content": content,
            "url": url,
            "encoding": "utf-8",
        });
        fs::write(dir.join(name), body.to_string()).unwrap();
    }

    #[test]
    fn strips_url_fragment() {
        assert_eq!(strip_fragment("https://foo.com/page#section"), "https://foo.com/page");
        assert_eq!(strip_fragment("https://foo.com/page"), "https://foo.com/page");
    }

    #[test]
    fn dedupes_repeated_canonical_urls_first_wins() {
        let webpages = tempfile::tempdir().unwrap();
        write_doc(webpages.path(), "a.json", "<p>first</p>", "https://foo.com#frag1");
        write_doc(webpages.path(), "b.json", "<p>second</p>", "https://foo.com#frag2");

        let partial = tempfile::tempdir().unwrap();
        let index_dir = tempfile::tempdir().unwrap();
        fs::remove_dir(partial.path()).unwrap();

        let builder = PartialIndexBuilder::new(1 << 18);
        builder
            .build(webpages.path(), partial.path(), index_dir.path())
            .unwrap();

        let map_text = fs::read_to_string(index_dir.path().join("doc_id_map.json")).unwrap();
        let map: BTreeMap<u32, String> = serde_json::from_str(&map_text).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&0).unwrap(), "https://foo.com");
    }

    #[test]
    fn rejects_non_empty_partial_index_dir() {
        let webpages = tempfile::tempdir().unwrap();
        let partial = tempfile::tempdir().unwrap();
        fs::write(partial.path().join("leftover.bin"), b"x").unwrap();
        let index_dir = tempfile::tempdir().unwrap();

        let builder = PartialIndexBuilder::new(1 << 18);
        let err = builder
            .build(webpages.path(), partial.path(), index_dir.path())
            .unwrap_err();
        assert!(matches!(err, IndexError::ResourcePrecondition(_)));
    }

    #[test]
    fn missing_required_field_is_corrupt_input() {
        let webpages = tempfile::tempdir().unwrap();
        fs::write(
            webpages.path().join("bad.json"),
            r#"{"content": "<p>hi</p>"}"#,
        )
        .unwrap();
        let partial = tempfile::tempdir().unwrap();
        fs::remove_dir(partial.path()).unwrap();
        let index_dir = tempfile::tempdir().unwrap();

        let builder = PartialIndexBuilder::new(1 << 18);
        let err = builder
            .build(webpages.path(), partial.path(), index_dir.path())
            .unwrap_err();
        assert!(matches!(err, IndexError::Json { .. }));
    }
}

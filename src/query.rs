use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::posting::PostingList;
use crate::term::Term;
use crate::tokenizer::tokenize_query;

/// Per-term postings cached for the duration of one `ranked_retrieve`
/// call: document frequency (the posting list's length) plus an O(1)
/// doc_id→term_frequency lookup.
struct TermPostings {
    df: usize,
    tf_by_doc: HashMap<u32, u32>,
}

/// Opens `inverted_index.bin` for seekable reads and loads the term
/// directory and doc_id map fully into memory at startup (spec.md
/// §4.6). Read-only and immutable after construction; there is no
/// mutation path once `open` succeeds.
#[derive(Debug)]
pub struct QueryEngine {
    index_path: PathBuf,
    term_directory: HashMap<Term, u64>,
    doc_id_map: BTreeMap<u32, String>,
    num_docs: usize,
    top_k: usize,
}

impl QueryEngine {
    pub fn open(index_dir: &Path, top_k: usize) -> Result<Self, IndexError> {
        let has_entries = index_dir.is_dir() && fs::read_dir(index_dir)?.next().is_some();
        if !has_entries {
            return Err(IndexError::MissingArtifact(format!(
                "index directory {} is missing or empty",
                index_dir.display()
            )));
        }

        let index_path = index_dir.join("inverted_index.bin");
        let directory_path = index_dir.join("term_directory.json");
        let doc_map_path = index_dir.join("doc_id_map.json");

        for path in [&index_path, &directory_path, &doc_map_path] {
            if !path.exists() {
                return Err(IndexError::MissingArtifact(format!(
                    "required artifact missing: {}",
                    path.display()
                )));
            }
        }

        let raw_directory: BTreeMap<String, u64> = read_json(&directory_path)?;
        let term_directory = raw_directory
            .into_iter()
            .map(|(term, offset)| (Term::from(term), offset))
            .collect();

        let doc_id_map: BTreeMap<u32, String> = read_json(&doc_map_path)?;
        let num_docs = doc_id_map.len();

        Ok(Self {
            index_path,
            term_directory,
            doc_id_map,
            num_docs,
            top_k,
        })
    }

    /// Random-access lookup of a term's posting list. Absent terms
    /// return an empty list rather than an error (spec.md §7 case 5).
    /// Opens its own file handle per call, the thread-local-open
    /// pattern spec.md §5 recommends for concurrent query serving.
    pub fn lookup(&self, term: &Term) -> Result<PostingList, IndexError> {
        let offset = match self.term_directory.get(term) {
            Some(offset) => *offset,
            None => return Ok(PostingList::new()),
        };

        let mut file = File::open(&self.index_path)?;
        file.seek(SeekFrom::Start(offset))?;
        let decoded_term = Term::read_from(&mut file)?;
        if &decoded_term != term {
            return Err(IndexError::InvariantViolation(format!(
                "term mismatch at offset {offset}: expected '{term}', found '{decoded_term}'"
            )));
        }
        PostingList::read_from(&mut file).map_err(IndexError::from)
    }

    /// Boolean-AND retrieval: any absent term empties the whole result.
    pub fn bool_retrieve(&self, query: &str) -> Result<Vec<String>, IndexError> {
        let terms = tokenize_query(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut posting_lists = Vec::with_capacity(terms.len());
        for term in &terms {
            let list = self.lookup(term)?;
            if list.is_empty() {
                return Ok(Vec::new());
            }
            posting_lists.push(list);
        }

        let mut doc_ids: BTreeSet<u32> = posting_lists[0].iter().map(|p| p.doc_id).collect();
        for list in &posting_lists[1..] {
            let next: BTreeSet<u32> = list.iter().map(|p| p.doc_id).collect();
            doc_ids = doc_ids.intersection(&next).copied().collect();
        }

        Ok(doc_ids
            .into_iter()
            .take(self.top_k)
            .filter_map(|id| self.doc_id_map.get(&id).cloned())
            .collect())
    }

    /// TF-IDF ranked retrieval with the soft-conjunction gate (spec.md
    /// §4.6 step 5): a document scoring on fewer than
    /// `ceil(0.75 * distinct_terms)` distinct query terms is dropped
    /// entirely, regardless of the score it would otherwise carry.
    pub fn ranked_retrieve(&self, query: &str) -> Result<Vec<String>, IndexError> {
        let tokens = tokenize_query(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut distinct_terms: Vec<Term> = tokens;
        distinct_terms.sort();
        distinct_terms.dedup();

        let mut term_postings = Vec::with_capacity(distinct_terms.len());
        let mut candidates: BTreeSet<u32> = BTreeSet::new();
        for term in &distinct_terms {
            let list = self.lookup(term)?;
            candidates.extend(list.iter().map(|p| p.doc_id));
            let tf_by_doc = list.iter().map(|p| (p.doc_id, p.term_frequency)).collect();
            term_postings.push(TermPostings {
                df: list.len(),
                tf_by_doc,
            });
        }

        let threshold = 0.75 * distinct_terms.len() as f64;

        let mut scored: Vec<(u32, f64)> = Vec::new();
        for doc_id in candidates {
            let mut matched = 0usize;
            let mut score = 0.0;
            for postings in &term_postings {
                if postings.df == 0 {
                    continue;
                }
                if let Some(&tf_raw) = postings.tf_by_doc.get(&doc_id) {
                    let tf = 1.0 + (tf_raw as f64).log10();
                    let idf = (self.num_docs as f64 / postings.df as f64).log10();
                    score += tf * idf;
                    matched += 1;
                }
            }

            if (matched as f64) <= threshold {
                continue;
            }
            scored.push((doc_id, score));
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .filter_map(|(id, _)| self.doc_id_map.get(&id).cloned())
            .collect())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, IndexError> {
    let mut text = String::new();
    File::open(path)?.read_to_string(&mut text)?;
    serde_json::from_str(&text).map_err(|e| IndexError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PartialIndexBuilder;
    use crate::merger::Merger;
    use std::fs;

    fn build_two_doc_corpus() -> tempfile::TempDir {
        let webpages = tempfile::tempdir().unwrap();
        fs::write(
            webpages.path().join("a.json"),
            serde_json::json!({
                "content": "<body>foo foo foo foo foo foo bar bar bar baz</body>",
                "url": "foo.com",
                "encoding": "utf-8",
            })
            .to_string(),
        )
        .unwrap();
        fs::write(
            webpages.path().join("b.json"),
            serde_json::json!({
                "content": "<body>foo foo foo bar bar bar bar bar bar baz</body>",
                "url": "bar.com",
                "encoding": "utf-8",
            })
            .to_string(),
        )
        .unwrap();
        webpages
    }

    fn build_index(webpages: &Path) -> tempfile::TempDir {
        let partial_dir = tempfile::tempdir().unwrap();
        fs::remove_dir(partial_dir.path()).unwrap();
        let index_dir = tempfile::tempdir().unwrap();

        let builder = PartialIndexBuilder::new(1 << 18);
        builder
            .build(webpages, partial_dir.path(), index_dir.path())
            .unwrap();
        Merger::merge(partial_dir.path(), index_dir.path()).unwrap();
        index_dir
    }

    #[test]
    fn end_to_end_posting_lists_match_weighted_body_counts() {
        let webpages = build_two_doc_corpus();
        let index_dir = build_index(webpages.path());
        let engine = QueryEngine::open(index_dir.path(), 5).unwrap();

        let foo = engine.lookup(&Term::from("foo")).unwrap();
        let counts: Vec<(u32, u32)> = foo.iter().map(|p| (p.doc_id, p.term_frequency)).collect();
        assert_eq!(counts, vec![(0, 6), (1, 3)]);

        let bar = engine.lookup(&Term::from("bar")).unwrap();
        let counts: Vec<(u32, u32)> = bar.iter().map(|p| (p.doc_id, p.term_frequency)).collect();
        assert_eq!(counts, vec![(0, 3), (1, 6)]);

        let baz = engine.lookup(&Term::from("baz")).unwrap();
        let counts: Vec<(u32, u32)> = baz.iter().map(|p| (p.doc_id, p.term_frequency)).collect();
        assert_eq!(counts, vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn bool_retrieve_intersects_and_sorts_by_doc_id() {
        let webpages = build_two_doc_corpus();
        let index_dir = build_index(webpages.path());
        let engine = QueryEngine::open(index_dir.path(), 5).unwrap();

        let results = engine.bool_retrieve("foo bar").unwrap();
        assert_eq!(results, vec!["foo.com".to_string(), "bar.com".to_string()]);
    }

    #[test]
    fn bool_retrieve_absent_term_returns_empty() {
        let webpages = build_two_doc_corpus();
        let index_dir = build_index(webpages.path());
        let engine = QueryEngine::open(index_dir.path(), 5).unwrap();

        assert!(engine.bool_retrieve("foo qux").unwrap().is_empty());
    }

    #[test]
    fn bool_retrieve_single_term() {
        let webpages = build_two_doc_corpus();
        let index_dir = build_index(webpages.path());
        let engine = QueryEngine::open(index_dir.path(), 5).unwrap();

        let results = engine.bool_retrieve("baz").unwrap();
        assert_eq!(results, vec!["foo.com".to_string(), "bar.com".to_string()]);
    }

    #[test]
    fn ranked_retrieve_zero_idf_still_returns_by_doc_id_order() {
        let webpages = build_two_doc_corpus();
        let index_dir = build_index(webpages.path());
        let engine = QueryEngine::open(index_dir.path(), 5).unwrap();

        let results = engine.ranked_retrieve("foo").unwrap();
        assert_eq!(results, vec!["foo.com".to_string(), "bar.com".to_string()]);
    }

    #[test]
    fn ranked_retrieve_soft_conjunction_drops_partial_matches() {
        let webpages = build_two_doc_corpus();
        let index_dir = build_index(webpages.path());
        let engine = QueryEngine::open(index_dir.path(), 5).unwrap();

        // "qux" never appears; neither doc matches all 3 distinct terms,
        // so the soft-conjunction gate (matched > 2.25 => >= 3) drops both.
        let results = engine.ranked_retrieve("foo baz qux").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn open_fails_on_missing_index_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::remove_dir(dir.path()).unwrap();
        let err = QueryEngine::open(dir.path(), 5).unwrap_err();
        assert!(matches!(err, IndexError::MissingArtifact(_)));
    }
}

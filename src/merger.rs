use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::partial_index_reader::PartialIndexReader;
use crate::posting::PostingList;
use crate::term::Term;

/// Reduces N sorted partial-index files to one sorted inverted-index
/// file, combining posting lists for identical terms, while emitting
/// a term→byte-offset directory (spec.md §4.5).
pub struct Merger;

impl Merger {
    /// Runs the pairwise polyphase merge and writes `inverted_index.bin`
    /// plus `term_directory.json` into `index_dir`.
    pub fn merge(partial_index_dir: &Path, index_dir: &Path) -> Result<(), IndexError> {
        let mut queue: VecDeque<PathBuf> = read_partial_indexes_fifo(partial_index_dir)?;
        if queue.is_empty() {
            return Err(IndexError::ResourcePrecondition(
                "no partial indexes to merge".to_string(),
            ));
        }

        let mut run: u32 = 0;
        while queue.len() > 1 {
            let left = queue.pop_front().expect("queue has >1 entries");
            let right = queue.pop_front().expect("queue has >1 entries");
            let output_path = partial_index_dir.join(format!("tmp_merge_run_{run}.bin"));
            tracing::info!(?left, ?right, ?output_path, "merging partial index pair");
            run += 1;
            two_way_merge(&left, &right, &output_path)?;
            queue.push_back(output_path);
        }

        let surviving = queue.pop_front().expect("queue started non-empty");
        let final_path = index_dir.join("inverted_index.bin");
        let directory = finalize(&surviving, &final_path)?;
        tracing::info!(terms = directory.len(), "final merge pass complete");
        write_term_directory(index_dir, &directory)?;
        Ok(())
    }
}

/// Streams a two-way merge of `left` and `right` into `output_path`,
/// maintaining one pending item per side. Equal terms have their
/// posting lists merged by ordered doc_id union; a term present on
/// only one side is emitted verbatim.
fn two_way_merge(left: &Path, right: &Path, output_path: &Path) -> Result<(), IndexError> {
    let mut left_reader = PartialIndexReader::open(left)?;
    let mut right_reader = PartialIndexReader::open(right)?;
    let mut out = BufWriter::new(File::create(output_path)?);

    let mut left_item = left_reader.read_item()?;
    let mut right_item = right_reader.read_item()?;

    loop {
        match (left_item.take(), right_item.take()) {
            (Some((lt, ll)), Some((rt, rl))) => match lt.cmp(&rt) {
                std::cmp::Ordering::Less => {
                    write_record(&mut out, &lt, &ll)?;
                    left_item = left_reader.read_item()?;
                    right_item = Some((rt, rl));
                }
                std::cmp::Ordering::Greater => {
                    write_record(&mut out, &rt, &rl)?;
                    right_item = right_reader.read_item()?;
                    left_item = Some((lt, ll));
                }
                std::cmp::Ordering::Equal => {
                    let merged = ll.merge(&rl)?;
                    write_record(&mut out, &lt, &merged)?;
                    left_item = left_reader.read_item()?;
                    right_item = right_reader.read_item()?;
                }
            },
            (Some((lt, ll)), None) => {
                write_record(&mut out, &lt, &ll)?;
                left_item = left_reader.read_item()?;
            }
            (None, Some((rt, rl))) => {
                write_record(&mut out, &rt, &rl)?;
                right_item = right_reader.read_item()?;
            }
            (None, None) => break,
        }
    }

    out.flush()?;
    Ok(())
}

fn write_record<W: Write>(w: &mut W, term: &Term, list: &PostingList) -> std::io::Result<()> {
    term.write_to(w)?;
    list.write_to(w)
}

/// Reads the sole surviving sorted stream record-by-record, writing it
/// to `final_path` while recording each record's starting byte offset.
/// This is the sole source of truth for random-access lookup and runs
/// whether the corpus produced one partial index (no merges needed) or
/// many (this is the tail of the pairwise merge chain).
fn finalize(surviving_path: &Path, final_path: &Path) -> Result<BTreeMap<String, u64>, IndexError> {
    let mut reader = PartialIndexReader::open(surviving_path)?;
    let mut out = BufWriter::new(File::create(final_path)?);
    let mut directory = BTreeMap::new();
    let mut offset: u64 = 0;

    while let Some((term, list)) = reader.read_item()? {
        directory.insert(term.as_str().to_string(), offset);
        let mut record = Vec::new();
        term.write_to(&mut record)?;
        list.write_to(&mut record)?;
        out.write_all(&record)?;
        offset += record.len() as u64;
    }

    out.flush()?;
    Ok(directory)
}

fn write_term_directory(
    index_dir: &Path,
    directory: &BTreeMap<String, u64>,
) -> Result<(), IndexError> {
    let path = index_dir.join("term_directory.json");
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, directory).map_err(|e| IndexError::Json {
        path,
        source: e,
    })?;
    Ok(())
}

fn read_partial_indexes_fifo(dir: &Path) -> Result<VecDeque<PathBuf>, IndexError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("partial_index_"))
        })
        .collect();
    paths.sort();
    Ok(paths.into())
}

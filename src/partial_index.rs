use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::error::IndexError;
use crate::posting::{Posting, PostingList};
use crate::term::Term;

/// An in-memory sorted term→posting-list map with a bounded size,
/// materializable to disk in one pass (spec.md §4.2).
///
/// Invariant: `sorted_terms` always equals the ascending key set of
/// `postings`.
#[derive(Debug, Default, PartialEq)]
pub struct PartialIndex {
    postings: HashMap<Term, PostingList>,
    sorted_terms: Vec<Term>,
    num_postings: usize,
}

impl PartialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_postings(&self) -> usize {
        self.num_postings
    }

    pub fn num_terms(&self) -> usize {
        self.sorted_terms.len()
    }

    pub fn get(&self, term: &Term) -> Option<&PostingList> {
        self.postings.get(term)
    }

    fn insert_sorted_term(&mut self, term: Term) {
        let pos = self.sorted_terms.partition_point(|t| t < &term);
        self.sorted_terms.insert(pos, term);
    }

    /// Adds a single posting for `term`. Fails loudly if `posting`'s
    /// `doc_id` duplicates one already present for the term.
    pub fn add_posting(&mut self, term: Term, posting: Posting) -> Result<(), IndexError> {
        match self.postings.get_mut(&term) {
            Some(list) => list.add_posting(posting)?,
            None => {
                let mut list = PostingList::new();
                list.add_posting(posting)?;
                self.postings.insert(term.clone(), list);
                self.insert_sorted_term(term);
            }
        }
        self.num_postings += 1;
        Ok(())
    }

    /// Adds an entire posting list for `term` in one batch, amortizing
    /// the per-posting bookkeeping of `add_posting`.
    pub fn add_posting_list(&mut self, term: Term, list: PostingList) -> Result<(), IndexError> {
        let added = list.len();
        match self.postings.get_mut(&term) {
            Some(existing) => {
                let merged = existing.merge(&list)?;
                *existing = merged;
            }
            None => {
                self.postings.insert(term.clone(), list);
                self.insert_sorted_term(term);
            }
        }
        self.num_postings += added;
        Ok(())
    }

    /// Emits `<u16 term_len><term bytes><u16 posting_count><postings...>`
    /// records in ascending term order.
    pub fn serialize(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for term in &self.sorted_terms {
            let list = self
                .postings
                .get(term)
                .expect("sorted_terms is the key set of postings");
            term.write_to(w)?;
            list.write_to(w)?;
        }
        Ok(())
    }

    /// Inverse of `serialize`; used by tests only for round-trip
    /// verification. Streaming consumers use `PartialIndexReader`.
    pub fn deserialize(bytes: &[u8]) -> io::Result<Self> {
        let mut cursor = bytes;
        Self::read_from(&mut cursor)
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut index = PartialIndex::new();
        loop {
            let term = match Term::read_from(r) {
                Ok(term) => term,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            };
            let list = PostingList::read_from(r)?;
            index.num_postings += list.len();
            index.postings.insert(term.clone(), list);
            index.sorted_terms.push(term);
        }
        index.sorted_terms.sort();
        Ok(index)
    }
}

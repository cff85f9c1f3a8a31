use std::io::{self, Read, Write};

use crate::error::IndexError;

/// A (doc_id, term_frequency) pair, the unit of an inverted-index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: u32,
    pub term_frequency: u32,
}

impl Posting {
    pub const WIRE_SIZE: usize = 8;

    pub fn new(doc_id: u32, term_frequency: u32) -> Self {
        Self {
            doc_id,
            term_frequency,
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.doc_id.to_le_bytes())?;
        w.write_all(&self.term_frequency.to_le_bytes())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut doc_id_buf = [0u8; 4];
        let mut tf_buf = [0u8; 4];
        r.read_exact(&mut doc_id_buf)?;
        r.read_exact(&mut tf_buf)?;
        Ok(Self {
            doc_id: u32::from_le_bytes(doc_id_buf),
            term_frequency: u32::from_le_bytes(tf_buf),
        })
    }
}

impl PartialOrd for Posting {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Posting {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.doc_id.cmp(&other.doc_id)
    }
}

/// An ordered, doc_id-unique sequence of postings for a single term.
///
/// `PostingList` is deliberately "dumb": it doesn't know which term it
/// belongs to, only that its entries are kept strictly increasing by
/// `doc_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sorted_unique(postings: Vec<Posting>) -> Result<Self, IndexError> {
        let list = Self { postings };
        list.assert_strictly_increasing()?;
        Ok(list)
    }

    fn assert_strictly_increasing(&self) -> Result<(), IndexError> {
        for pair in self.postings.windows(2) {
            if pair[0].doc_id >= pair[1].doc_id {
                return Err(IndexError::InvariantViolation(format!(
                    "posting list doc_ids not strictly increasing: {} >= {}",
                    pair[0].doc_id, pair[1].doc_id
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Posting> {
        self.postings.iter()
    }

    pub fn as_slice(&self) -> &[Posting] {
        &self.postings
    }

    /// Inserts `posting` at the position that keeps the list sorted by
    /// `doc_id`. Fails loudly on a duplicate `doc_id`.
    pub fn add_posting(&mut self, posting: Posting) -> Result<(), IndexError> {
        let mut insert_at = self.postings.len();
        while insert_at > 0 && self.postings[insert_at - 1].doc_id >= posting.doc_id {
            if self.postings[insert_at - 1].doc_id == posting.doc_id {
                return Err(IndexError::InvariantViolation(format!(
                    "duplicate posting for doc_id {}",
                    posting.doc_id
                )));
            }
            insert_at -= 1;
        }
        self.postings.insert(insert_at, posting);
        Ok(())
    }

    /// Writes `<u16 posting_count><posting_count * (u32 doc_id, u32 tf)>`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let count: u16 = self.postings.len().try_into().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "posting list exceeds u16 length; widen the length prefix or split the term",
            )
        })?;
        w.write_all(&count.to_le_bytes())?;
        for posting in &self.postings {
            posting.write_to(w)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut count_buf = [0u8; 2];
        r.read_exact(&mut count_buf)?;
        let count = u16::from_le_bytes(count_buf) as usize;
        let mut postings = Vec::with_capacity(count);
        for _ in 0..count {
            postings.push(Posting::read_from(r)?);
        }
        Ok(Self { postings })
    }

    /// Ordered doc_id union of `self` and `other`; fails loudly on a
    /// doc_id present in both (the merger treats that as a corrupt
    /// partial index rather than a recoverable condition).
    pub fn merge(&self, other: &PostingList) -> Result<PostingList, IndexError> {
        let mut out = Vec::with_capacity(self.postings.len() + other.postings.len());
        let (mut i, mut j) = (0, 0);
        while i < self.postings.len() && j < other.postings.len() {
            let l = self.postings[i];
            let r = other.postings[j];
            match l.doc_id.cmp(&r.doc_id) {
                std::cmp::Ordering::Less => {
                    out.push(l);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(r);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    return Err(IndexError::InvariantViolation(format!(
                        "duplicate doc_id {} for same term across partial indexes",
                        l.doc_id
                    )));
                }
            }
        }
        out.extend_from_slice(&self.postings[i..]);
        out.extend_from_slice(&other.postings[j..]);
        Ok(PostingList { postings: out })
    }
}

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::posting::PostingList;
use crate::term::Term;

/// Streaming, strictly forward-only decoder over one partial-index
/// file. A scoped resource owning an open file handle; the merger's
/// random-access lookup path (§4.6) is implemented separately against
/// the sealed inverted index, not through this reader.
pub struct PartialIndexReader {
    reader: BufReader<File>,
}

impl PartialIndexReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
        })
    }

    /// Returns the next `(Term, PostingList)` record, or `Ok(None)` at
    /// end of stream.
    pub fn read_item(&mut self) -> io::Result<Option<(Term, PostingList)>> {
        let term = match Term::read_from(&mut self.reader) {
            Ok(term) => term,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        };
        let list = PostingList::read_from(&mut self.reader)?;
        Ok(Some((term, list)))
    }
}

use std::io::{self, Read, Write};

/// A normalized (lowercased, Porter-stemmed) token.
///
/// Ordered lexicographically by byte sequence, matching the ordering of
/// records within the on-disk inverted index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term(pub String);

impl Term {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Writes `<u16 term_byte_len><term bytes>`, little-endian.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let bytes = self.0.as_bytes();
        let len: u16 = bytes.len().try_into().map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "term exceeds u16 byte length")
        })?;
        w.write_all(&len.to_le_bytes())?;
        w.write_all(bytes)
    }

    /// Reads `<u16 term_byte_len><term bytes>` back into a `Term`.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut len_buf = [0u8; 2];
        r.read_exact(&mut len_buf)?;
        let len = u16::from_le_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        r.read_exact(&mut buf)?;
        let term = String::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Term(term))
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Term(s)
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term(s.to_string())
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_format() {
        let term = Term::from("comput");
        let mut buf = Vec::new();
        term.write_to(&mut buf).unwrap();
        let decoded = Term::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(term, decoded);
    }

    #[test]
    fn orders_lexicographically_by_bytes() {
        let mut terms: Vec<Term> = ["zebra", "apple", "mango"]
            .into_iter()
            .map(Term::from)
            .collect();
        terms.sort();
        assert_eq!(
            terms,
            vec![Term::from("apple"), Term::from("mango"), Term::from("zebra")]
        );
    }
}

use std::collections::HashMap;

use rust_stemmers::{Algorithm, Stemmer};
use scraper::{Html, Selector};

use crate::posting::{Posting, PostingList};
use crate::term::Term;

/// HTML tag → weight table (spec.md §4.1). Tags not listed here are
/// ignored at this level; their text is still counted if it's reached
/// through a recognized ancestor's `.text()` walk.
const WEIGHTED_TAGS: &[(&str, u32)] = &[
    ("title", 5),
    ("h1", 4),
    ("h2", 3),
    ("h3", 2),
    ("b", 2),
    ("strong", 2),
    ("p", 1),
    ("body", 1),
    ("span", 1),
    ("div", 1),
];

/// Splits `text` into alphanumeric (Unicode letter/digit) runs,
/// lowercased, flushing the buffer on any other character.
fn raw_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut buffer = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            buffer.extend(c.to_lowercase());
        } else if !buffer.is_empty() {
            tokens.push(std::mem::take(&mut buffer));
        }
    }
    if !buffer.is_empty() {
        tokens.push(buffer);
    }
    tokens
}

fn stemmer() -> Stemmer {
    Stemmer::create(Algorithm::English)
}

/// Tokenizes weighted HTML for one document into a per-term posting
/// list, each carrying a single posting for `doc_id` whose
/// `term_frequency` is the sum of tag weights contributed by every
/// occurrence of that term's stem.
///
/// An empty or unparsable document yields an empty mapping.
pub fn tokenize_document(html_src: &str, doc_id: u32) -> HashMap<Term, PostingList> {
    let document = Html::parse_document(html_src);
    let stemmer = stemmer();
    let mut tf: HashMap<String, u32> = HashMap::new();

    for &(tag, weight) in WEIGHTED_TAGS {
        // A malformed tag name cannot occur since WEIGHTED_TAGS is
        // a fixed, valid set of selectors.
        let selector = Selector::parse(tag).expect("static selector is valid");
        for element in document.select(&selector) {
            let text: String = element.text().collect::<Vec<_>>().join(" ");
            for raw in raw_tokens(&text) {
                let stemmed = stemmer.stem(&raw).into_owned();
                *tf.entry(stemmed).or_insert(0) += weight;
            }
        }
    }

    let mut out = HashMap::with_capacity(tf.len());
    for (term, weight) in tf {
        let mut list = PostingList::new();
        list.add_posting(Posting::new(doc_id, weight))
            .expect("single posting per term per document cannot collide");
        out.insert(Term::from(term), list);
    }
    out
}

/// Tokenizes plain query text with the same case-folding and stemming
/// as indexing, but without any HTML weighting (spec.md §4.6 step 1).
pub fn tokenize_query(text: &str) -> Vec<Term> {
    let stemmer = stemmer();
    raw_tokens(text)
        .into_iter()
        .map(|raw| Term::from(stemmer.stem(&raw).into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_empty_mapping() {
        let out = tokenize_document("", 0);
        assert!(out.is_empty());
    }

    #[test]
    fn weights_accumulate_per_tag() {
        let html = "<html><body><title>cats</title><p>cats and dogs</p></body></html>";
        let out = tokenize_document(html, 0);

        // "cat" appears once in <title> (weight 5), once in <p> (weight 1),
        // and twice more via <body>'s own descendant text walk, which also
        // sees the title's and the paragraph's text (weight 1 each): 8 total.
        let cat = out.get(&Term::from("cat")).expect("cat present");
        assert_eq!(cat.iter().next().unwrap().term_frequency, 8);
    }

    #[test]
    fn unrecognized_tag_text_still_counted_via_ancestor() {
        let html = "<html><body><em>wizard</em></body></html>";
        let out = tokenize_document(html, 3);
        let posting = out
            .get(&Term::from("wizard"))
            .expect("wizard reachable via body")
            .iter()
            .next()
            .unwrap();
        assert_eq!(posting.doc_id, 3);
        assert_eq!(posting.term_frequency, 1);
    }

    #[test]
    fn query_tokenizer_applies_same_stemming_without_weights() {
        let tokens = tokenize_query("Running Runners");
        assert_eq!(tokens, vec![Term::from("run"), Term::from("runner")]);
    }
}

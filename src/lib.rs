pub mod builder;
pub mod config;
pub mod error;
pub mod merger;
pub mod partial_index;
pub mod partial_index_reader;
pub mod posting;
pub mod query;
pub mod term;
pub mod tokenizer;

use std::io::{BufRead, Write};

use builder::PartialIndexBuilder;
use config::Config;
use error::IndexError;
use merger::Merger;
use query::QueryEngine;

/// Builds partial indexes from `cfg.webpages_dir` then merges them into
/// a final inverted index under `cfg.index_dir` (spec.md §6 `build`
/// command surface).
pub fn build(cfg: &Config) -> Result<(), IndexError> {
    tracing::info!(webpages_dir = ?cfg.webpages_dir, "starting build");
    let builder = PartialIndexBuilder::from_config(cfg);
    builder.build(&cfg.webpages_dir, &cfg.partial_index_dir, &cfg.index_dir)?;

    tracing::info!("starting merge");
    Merger::merge(&cfg.partial_index_dir, &cfg.index_dir)?;

    tracing::info!("build complete");
    Ok(())
}

/// Interactive query loop: reads lines from `input` until `quit`,
/// printing up to `cfg.top_k` result URLs per query, numbered from 1
/// (spec.md §6 `query` command surface).
pub fn query_repl<R: BufRead, W: Write>(
    cfg: &Config,
    mut input: R,
    mut output: W,
) -> Result<(), IndexError> {
    let engine = QueryEngine::open(&cfg.index_dir, cfg.top_k)?;

    let mut line = String::new();
    loop {
        write!(output, "\nEnter query: ")?;
        output.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        let results = engine.ranked_retrieve(query)?;
        if results.is_empty() {
            writeln!(output, "\nNo results found.")?;
        } else {
            for (i, url) in results.iter().enumerate() {
                writeln!(output, "{}. {}", i + 1, url)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn query_repl_numbers_results_and_stops_on_quit() {
        let webpages = tempfile::tempdir().unwrap();
        fs::write(
            webpages.path().join("a.json"),
            serde_json::json!({
                "content": "<title>widgets</title>",
                "url": "widgets.example",
                "encoding": "utf-8",
            })
            .to_string(),
        )
        .unwrap();

        let partial_index_dir = tempfile::tempdir().unwrap();
        fs::remove_dir(partial_index_dir.path()).unwrap();
        let index_dir = tempfile::tempdir().unwrap();

        let cfg = Config {
            webpages_dir: webpages.path().to_path_buf(),
            partial_index_dir: partial_index_dir.path().to_path_buf(),
            index_dir: index_dir.path().to_path_buf(),
            batch_size: config::DEFAULT_BATCH_SIZE,
            top_k: config::DEFAULT_TOP_K,
        };
        build(&cfg).unwrap();

        let input = std::io::Cursor::new(b"widgets\nquit\n".to_vec());
        let mut output = Vec::new();
        query_repl(&cfg, input, &mut output).unwrap();

        let rendered = String::from_utf8(output).unwrap();
        assert!(rendered.contains("1. widgets.example"));
    }
}

//! Excerpt highlighting for the `title` and `content` fields.
//!
//! Works like tantivy's `SnippetGenerator` but can return several fragments
//! per field: the stored text is re-tokenized with the field's analyzer, and
//! windows of at most `fragment_size` characters are cut around query-term hits.

use std::collections::HashSet;

use tantivy::tokenizer::TextAnalyzer;

use ctxsearch_core::types::{Highlights, StoredDocument};

use crate::index::TextIndex;
use crate::schema::{CONTENT, TITLE};

pub const PRE_TAG: &str = "<em>";
pub const POST_TAG: &str = "</em>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightOptions {
    pub fragment_size: usize,
    pub max_fragments: usize,
}

pub const TITLE_HIGHLIGHT: HighlightOptions = HighlightOptions { fragment_size: 100, max_fragments: 5 };
pub const CONTENT_HIGHLIGHT: HighlightOptions = HighlightOptions { fragment_size: 150, max_fragments: 3 };

struct Tok {
    from: usize,
    to: usize,
    hit: bool,
}

/// Cut highlighted fragments out of `text`. Returns nothing when no token
/// of `text` is in `terms`.
pub fn fragments(
    analyzer: &mut TextAnalyzer,
    text: &str,
    terms: &HashSet<String>,
    opts: HighlightOptions,
) -> Vec<String> {
    let mut toks = Vec::new();
    let mut stream = analyzer.token_stream(text);
    while stream.advance() {
        let t = stream.token();
        toks.push(Tok { from: t.offset_from, to: t.offset_to, hit: terms.contains(&t.text) });
    }

    let width = |from: usize, to: usize| text[from..to].chars().count();
    let mut out = Vec::new();
    let mut covered = 0usize;
    for (i, tok) in toks.iter().enumerate() {
        if out.len() >= opts.max_fragments {
            break;
        }
        if !tok.hit || tok.from < covered {
            continue;
        }
        // a little leading context, never reaching into the previous fragment
        let mut first = i;
        while first > 0
            && toks[first - 1].from >= covered
            && width(toks[first - 1].from, tok.to) <= opts.fragment_size / 3
        {
            first -= 1;
        }
        let start = toks[first].from;
        let mut last = i;
        while last + 1 < toks.len() && width(start, toks[last + 1].to) <= opts.fragment_size {
            last += 1;
        }

        let mut frag = String::with_capacity(toks[last].to - start + 16);
        let mut pos = start;
        for t in &toks[first..=last] {
            frag.push_str(&text[pos..t.from]);
            if t.hit {
                frag.push_str(PRE_TAG);
                frag.push_str(&text[t.from..t.to]);
                frag.push_str(POST_TAG);
            } else {
                frag.push_str(&text[t.from..t.to]);
            }
            pos = t.to;
        }
        covered = toks[last].to;
        out.push(frag);
    }
    out
}

impl TextIndex {
    /// Highlights of `query_text` in the title and content of `doc`. Fields
    /// without a hit are left out.
    pub fn highlight(&self, doc: &StoredDocument, query_text: &str) -> anyhow::Result<Highlights> {
        let terms: HashSet<String> = self.analyze(self.fields.content, query_text)?.into_iter().collect();
        let mut highlights = Highlights::new();
        if terms.is_empty() {
            return Ok(highlights);
        }
        for (name, field, text, opts) in [
            (TITLE, self.fields.title, &doc.title, TITLE_HIGHLIGHT),
            (CONTENT, self.fields.content, &doc.content, CONTENT_HIGHLIGHT),
        ] {
            let mut analyzer = self.index.tokenizer_for_field(field)?;
            let frags = fragments(&mut analyzer, text, &terms, opts);
            if !frags.is_empty() {
                highlights.insert(name.to_string(), frags);
            }
        }
        Ok(highlights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::tokenizer::{LowerCaser, SimpleTokenizer};

    fn analyzer() -> TextAnalyzer {
        TextAnalyzer::builder(SimpleTokenizer::default()).filter(LowerCaser).build()
    }

    fn terms(ts: &[&str]) -> HashSet<String> {
        ts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn wraps_hits_case_insensitively() {
        let f = fragments(&mut analyzer(), "Cats are great pets.", &terms(&["cats", "pets"]), CONTENT_HIGHLIGHT);
        assert_eq!(f, vec!["<em>Cats</em> are great <em>pets</em>".to_string()]);
    }

    #[test]
    fn no_hit_no_fragment() {
        assert!(fragments(&mut analyzer(), "Markets rose today", &terms(&["cats"]), CONTENT_HIGHLIGHT).is_empty());
    }

    #[test]
    fn respects_size_and_count() {
        let text = "dog ".repeat(200);
        let opts = HighlightOptions { fragment_size: 20, max_fragments: 3 };
        let f = fragments(&mut analyzer(), &text, &terms(&["dog"]), opts);
        assert_eq!(f.len(), 3);
        for frag in &f {
            let plain = frag.replace(PRE_TAG, "").replace(POST_TAG, "");
            assert!(plain.len() <= 20, "{plain:?}");
        }
    }

    #[test]
    fn size_counts_characters_not_bytes() {
        let text = "고양이 ".repeat(50);
        let opts = HighlightOptions { fragment_size: 20, max_fragments: 1 };
        let f = fragments(&mut analyzer(), &text, &terms(&["고양이"]), opts);
        let plain = f[0].replace(PRE_TAG, "").replace(POST_TAG, "");
        assert_eq!(plain.chars().count(), 19, "{plain:?}");
        assert!(plain.len() > 20);
    }
}

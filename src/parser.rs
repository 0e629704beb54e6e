// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! HTML document parsing and stemming.
//!
//! The parser extracts everything the indexer needs from one crawled page in
//! a single pass over the DOM: the stemmed visible-text token stream, the
//! stemmed heading/bold/title term sets used for field boosts, the title
//! string, every outgoing link, and a short plain-text summary.
//!
//! Visibility follows the direct parent rule: a text node counts as visible
//! unless its parent element is one of `style`, `script`, `head`, `meta`,
//! `a`, `img`, or it hangs directly off the document root. In particular
//! `<title>` text is visible (its parent is `title`), which is what lets
//! title-only terms enter the index at all.

use std::collections::HashSet;

use scraper::{node::Node, Html, Selector};

use crate::text::tokenize;

/// Elements whose direct text children are not part of the page's visible
/// text.
const HIDDEN_PARENTS: [&str; 6] = ["style", "script", "head", "meta", "a", "img"];

/// Maximum length of the stored document summary, in characters.
const SUMMARY_CHARS: usize = 200;

/// Token normalizer applied to every indexed and queried token.
///
/// Swapping implementations invalidates any previously built index.
pub trait Stemmer {
    fn stem(&self, token: &str) -> String;
}

/// Snowball English stemmer. Input is lowercased before stemming, so the
/// tokenizer can stay case-preserving.
pub struct EnglishStemmer {
    inner: rust_stemmers::Stemmer,
}

impl EnglishStemmer {
    pub fn new() -> Self {
        EnglishStemmer {
            inner: rust_stemmers::Stemmer::create(rust_stemmers::Algorithm::English),
        }
    }
}

impl Default for EnglishStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Stemmer for EnglishStemmer {
    fn stem(&self, token: &str) -> String {
        self.inner.stem(&token.to_lowercase()).into_owned()
    }
}

/// Everything extracted from one page.
pub struct ParsedPage {
    /// Stemmed visible-text tokens, in document order.
    pub tokens: Vec<String>,
    /// Stemmed terms appearing inside `<h1>`..`<h3>`.
    pub headers: HashSet<String>,
    /// Stemmed terms appearing inside `<b>` or `<strong>`.
    pub bold: HashSet<String>,
    /// Stemmed terms appearing inside `<title>`.
    pub titles: HashSet<String>,
    /// The first `<title>` element's text, if any.
    pub title: Option<String>,
    /// Raw `href` of every `<a>` element.
    pub links: Vec<String>,
    /// Leading visible text, whitespace-collapsed and truncated.
    pub summary: String,
}

pub struct PageParser {
    headers: Selector,
    bold: Selector,
    titles: Selector,
    links: Selector,
}

impl PageParser {
    pub fn new() -> Self {
        PageParser {
            headers: Selector::parse("h1, h2, h3").unwrap(),
            bold: Selector::parse("b, strong").unwrap(),
            titles: Selector::parse("title").unwrap(),
            links: Selector::parse("a").unwrap(),
        }
    }

    pub fn parse(&self, html: &str, stemmer: &dyn Stemmer) -> ParsedPage {
        let document = Html::parse_document(html);

        let mut visible: Vec<&str> = Vec::new();
        for node in document.tree.nodes() {
            if let Node::Text(text) = node.value() {
                let parent_visible = node
                    .parent()
                    .and_then(|p| p.value().as_element())
                    .map(|e| !HIDDEN_PARENTS.contains(&e.name()))
                    .unwrap_or(false);
                if parent_visible {
                    visible.push(&**text);
                }
            }
        }

        let tokens: Vec<String> = visible
            .iter()
            .flat_map(|segment| tokenize(segment))
            .map(|token| stemmer.stem(&token))
            .collect();

        let summary: String = visible
            .iter()
            .flat_map(|segment| segment.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(SUMMARY_CHARS)
            .collect();

        let title = document
            .select(&self.titles)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string());

        let links = document
            .select(&self.links)
            .filter_map(|element| element.value().attr("href"))
            .map(str::to_string)
            .collect();

        ParsedPage {
            tokens,
            headers: self.stemmed_set(&document, &self.headers, stemmer),
            bold: self.stemmed_set(&document, &self.bold, stemmer),
            titles: self.stemmed_set(&document, &self.titles, stemmer),
            title,
            links,
            summary,
        }
    }

    fn stemmed_set(
        &self,
        document: &Html,
        selector: &Selector,
        stemmer: &dyn Stemmer,
    ) -> HashSet<String> {
        let mut terms = HashSet::new();
        for element in document.select(selector) {
            let text: String = element.text().collect();
            for token in tokenize(&text) {
                terms.insert(stemmer.stem(&token));
            }
        }
        terms
    }
}

impl Default for PageParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> ParsedPage {
        PageParser::new().parse(html, &EnglishStemmer::new())
    }

    #[test]
    fn script_and_style_text_is_invisible() {
        let page = parse(
            "<html><body><p>hello world</p>\
             <script>var hidden = 1;</script>\
             <style>body { color: red }</style></body></html>",
        );
        assert!(page.tokens.contains(&"hello".to_string()));
        assert!(!page.tokens.contains(&"hidden".to_string()));
        assert!(!page.tokens.contains(&"color".to_string()));
    }

    #[test]
    fn anchor_text_is_invisible_but_href_is_collected() {
        let page = parse(r#"<body><a href="http://x.test/page#frag">click here</a></body>"#);
        assert!(!page.tokens.contains(&"click".to_string()));
        assert_eq!(page.links, vec!["http://x.test/page#frag"]);
    }

    #[test]
    fn title_text_is_visible_and_recorded() {
        let page = parse("<html><head><title>Rust Guide</title></head><body>body</body></html>");
        assert_eq!(page.title.as_deref(), Some("Rust Guide"));
        assert!(page.tokens.contains(&"rust".to_string()));
        assert!(page.titles.contains("rust"));
        assert!(page.titles.contains("guid"));
    }

    #[test]
    fn field_sets_are_stemmed() {
        let page = parse(
            "<body><h2>Running Programs</h2><p>text with <b>Highlighted</b> words</p></body>",
        );
        assert!(page.headers.contains("run"));
        assert!(page.headers.contains("program"));
        assert!(page.bold.contains("highlight"));
    }

    #[test]
    fn summary_is_collapsed_and_truncated() {
        let long = format!("<body><p>{}</p></body>", "word ".repeat(200));
        let page = parse(&long);
        assert!(page.summary.chars().count() <= 200);
        assert!(page.summary.starts_with("word word"));
        assert!(!page.summary.contains('\n'));
    }

    #[test]
    fn comments_are_ignored() {
        let page = parse("<body><!-- secret note --><p>shown</p></body>");
        assert!(!page.tokens.contains(&"secret".to_string()));
        assert!(page.tokens.contains(&"shown".to_string()));
    }
}

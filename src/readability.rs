//! General-purpose readable-text extraction.
//!
//! Used for continuation pages of paginated articles and by the baseline
//! record builder. Picks the most specific content container present and
//! keeps the text of its paragraphs, headings and list items.

use crate::text::TextCleaner;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article", "main", "[role='main']", ".content", "#content", "body"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, h1, h2, h3, h4, h5, h6, li").unwrap());

/// Readable text of `html`, blocks separated by blank lines.
pub fn extract_text(html: &Html, cleaner: &TextCleaner) -> String {
    for selector in CONTAINER_SELECTORS.iter() {
        if let Some(container) = html.select(selector).next() {
            let text = blocks_text(container, cleaner);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

fn blocks_text(container: ElementRef<'_>, cleaner: &TextCleaner) -> String {
    let blocks: Vec<String> = container
        .select(&BLOCK_SELECTOR)
        // nested blocks (p inside li) are covered by their outermost block
        .filter(|el| {
            !el.ancestors()
                .filter_map(ElementRef::wrap)
                .take_while(|a| a.id() != container.id())
                .any(|a| BLOCK_SELECTOR.matches(&a))
        })
        .map(|el| cleaner.clean(&el.html()))
        .filter(|t| !t.is_empty())
        .collect();

    if blocks.is_empty() {
        // bare text directly in the container
        return cleaner.clean(&container.html());
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_article() {
        let html = Html::parse_document(
            "<html><body><nav><p>Menu</p></nav><article><h1>Judul</h1><p>Isi satu.</p><p>Isi dua.</p></article></body></html>",
        );
        assert_eq!(
            extract_text(&html, &TextCleaner::new()),
            "Judul\n\nIsi satu.\n\nIsi dua."
        );
    }

    #[test]
    fn test_falls_back_to_body() {
        let html = Html::parse_document("<html><body><p>Hanya body</p></body></html>");
        assert_eq!(extract_text(&html, &TextCleaner::new()), "Hanya body");
    }

    #[test]
    fn test_bare_text_container() {
        let html = Html::parse_document("<html><body><main>A </main></body></html>");
        assert_eq!(extract_text(&html, &TextCleaner::new()), "A");
    }

    #[test]
    fn test_nested_blocks_not_duplicated() {
        let html = Html::parse_document(
            "<html><body><article><ul><li><p>Satu</p></li></ul></article></body></html>",
        );
        assert_eq!(extract_text(&html, &TextCleaner::new()), "Satu");
    }

    #[test]
    fn test_scripts_ignored() {
        let html = Html::parse_document(
            "<html><body><script>var a = 1;</script><p>Teks</p></body></html>",
        );
        assert_eq!(extract_text(&html, &TextCleaner::new()), "Teks");
    }
}

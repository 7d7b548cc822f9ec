use crate::errors::{BrowserError, Result};
use scraper::{Html, Selector};
use tracing::debug;

/// Tile containers on a streaming catalogue page.
pub const TILE_SELECTOR: &str = "div.StandardEmphasisHorizontalTileThumbnail__content";

/// Marker in a tile image's alt text that precedes the title.
const TITLE_MARKER: &str = "for ";

/// Pulls titles out of catalogue tiles in rendered page HTML.
///
/// Each tile's first image carries alt text such as
/// `"Cover art for Arrival"`; the title is whatever follows the first
/// `"for "`. Tiles without an image, alt text or marker are skipped.
pub struct TitleExtractor {
    tile: Selector,
    image: Selector,
}

impl TitleExtractor {
    pub fn new() -> Result<Self> {
        Self::with_tile_selector(TILE_SELECTOR)
    }

    pub fn with_tile_selector(tile: &str) -> Result<Self> {
        Ok(Self {
            tile: parse(tile)?,
            image: parse("img")?,
        })
    }

    pub fn extract(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut titles = Vec::new();
        let mut skipped = 0usize;

        for tile in document.select(&self.tile) {
            let title = tile
                .select(&self.image)
                .next()
                .and_then(|img| img.value().attr("alt"))
                .and_then(|alt| alt.split_once(TITLE_MARKER))
                .map(|(_, title)| title.trim())
                .filter(|title| !title.is_empty());

            match title {
                Some(title) => titles.push(title.to_string()),
                None => skipped += 1,
            }
        }

        debug!(found = titles.len(), skipped, "extracted titles");
        titles
    }
}

fn parse(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| {
        BrowserError::ExtractionFailed(format!("invalid selector '{}': {:?}", selector, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="StandardEmphasisHorizontalTileThumbnail__content">
            <img alt="Cover art for Arrival" src="a.jpg">
          </div>
          <div class="StandardEmphasisHorizontalTileThumbnail__content other">
            <img alt="Cover art for Paddington 2" src="b.jpg">
            <img alt="Logo for something else" src="logo.png">
          </div>
          <div class="StandardEmphasisHorizontalTileThumbnail__content">
            <img alt="Promotional banner" src="c.jpg">
          </div>
          <div class="StandardEmphasisHorizontalTileThumbnail__content">
            <span>No artwork yet</span>
          </div>
          <div class="SomeOtherTile">
            <img alt="Cover art for Not A Movie Tile" src="d.jpg">
          </div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_titles_in_page_order() {
        let titles = TitleExtractor::new().unwrap().extract(PAGE);
        assert_eq!(titles, vec!["Arrival", "Paddington 2"]);
    }

    #[test]
    fn test_keeps_everything_after_first_marker() {
        let html = r#"<div class="StandardEmphasisHorizontalTileThumbnail__content">
            <img alt="Cover art for Cloudy with a Chance of Meatballs for Kids"></div>"#;
        let titles = TitleExtractor::new().unwrap().extract(html);
        assert_eq!(titles, vec!["Cloudy with a Chance of Meatballs for Kids"]);
    }

    #[test]
    fn test_empty_page_has_no_titles() {
        assert!(TitleExtractor::new().unwrap().extract("").is_empty());
    }

    #[test]
    fn test_invalid_tile_selector_is_rejected() {
        assert!(matches!(
            TitleExtractor::with_tile_selector("div[").err(),
            Some(BrowserError::ExtractionFailed(_))
        ));
    }
}

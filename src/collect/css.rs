// src/collect/css.rs
use scraper::{ElementRef, Html, Selector};

use super::normalize_text;
use super::types::{RawFields, RecordExtractor, Selectors};
use crate::error::ParseError;

/// CSS-selector extraction on top of `scraper`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssExtractor;

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::InvalidSelector {
        selector: selector.to_string(),
        detail: e.to_string(),
    })
}

fn first_text(el: &ElementRef<'_>, sel: Option<&Selector>) -> Option<String> {
    el.select(sel?)
        .next()
        .map(|hit| {
            // Prefer machine-readable attributes when the page provides them.
            hit.value()
                .attr("content")
                .or_else(|| hit.value().attr("data-price"))
                .map(str::to_string)
                .unwrap_or_else(|| hit.text().collect::<Vec<_>>().join(" "))
        })
        .map(|t| normalize_text(&t))
        .filter(|t| !t.is_empty())
}

impl RecordExtractor for CssExtractor {
    fn extract(&self, document: &str, selectors: &Selectors) -> Result<Vec<RawFields>, ParseError> {
        let item = compile(&selectors.item)?;
        let name = compile(&selectors.name)?;
        let price = compile(&selectors.price)?;
        let rating = selectors.rating.as_deref().map(compile).transpose()?;
        let category = selectors.category.as_deref().map(compile).transpose()?;

        let html = Html::parse_document(document);
        let out = html
            .select(&item)
            .map(|el| RawFields {
                name: first_text(&el, Some(&name)),
                price: first_text(&el, Some(&price)),
                rating: first_text(&el, rating.as_ref()),
                category: first_text(&el, category.as_ref()),
            })
            .collect();
        Ok(out)
    }
}

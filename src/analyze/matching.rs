// src/analyze/matching.rs
//! Cross-source product matching by normalized name.

use std::collections::BTreeMap;

use crate::collect::types::{CollectionBatch, ProductRecord};

/// Lowercase, punctuation to spaces, whitespace collapsed.
/// `"Widget-Pro (XL)"` and `"widget pro xl"` match.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One product as seen across sources: at most one entry per source.
#[derive(Debug)]
pub struct ProductGroup<'a> {
    key: String,
    /// batch index -> cheapest entry from that source
    by_source: BTreeMap<usize, &'a ProductRecord>,
}

impl<'a> ProductGroup<'a> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name as spelled by the first source (in batch order) that lists it.
    pub fn display_name(&self) -> &'a str {
        self.by_source
            .values()
            .next()
            .copied()
            .map(ProductRecord::name)
            .unwrap_or_default()
    }

    pub fn source_count(&self) -> usize {
        self.by_source.len()
    }

    /// Entries in batch order.
    pub fn entries(&self) -> impl Iterator<Item = &'a ProductRecord> + '_ {
        self.by_source.values().copied()
    }

    pub fn entry_for(&self, source: &str) -> Option<&'a ProductRecord> {
        self.entries().find(|r| r.source() == source)
    }

    pub fn by_currency(&self) -> BTreeMap<&'a str, Vec<&'a ProductRecord>> {
        let mut out: BTreeMap<&'a str, Vec<&'a ProductRecord>> = BTreeMap::new();
        for r in self.entries() {
            out.entry(r.price().currency()).or_default().push(r);
        }
        out
    }
}

/// Group every record by normalized name, ordered by that name.
pub fn index_products(batches: &[CollectionBatch]) -> Vec<ProductGroup<'_>> {
    let mut index: BTreeMap<String, BTreeMap<usize, &ProductRecord>> = BTreeMap::new();
    for (i, b) in batches.iter().enumerate() {
        for r in b.records() {
            let key = normalize_name(r.name());
            if key.is_empty() {
                continue;
            }
            let slot = index.entry(key).or_default();
            match slot.get(&i) {
                Some(prev) if prev.price().amount() <= r.price().amount() => {}
                _ => {
                    slot.insert(i, r);
                }
            }
        }
    }
    index
        .into_iter()
        .map(|(key, by_source)| ProductGroup { key, by_source })
        .collect()
}

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Placeholder for any field that could not be extracted.
pub const NOT_AVAILABLE: &str = "N/A";

/// One product listing as extracted from a storefront page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScrapedItem {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Price")]
    price_raw: String,
    #[serde(rename = "Link")]
    link: String,
    #[serde(rename = "Image")]
    image: String,
}

impl ScrapedItem {
    /// Builds an item; missing or blank values become [`NOT_AVAILABLE`].
    pub fn new(
        name: Option<String>,
        price_raw: Option<String>,
        link: Option<String>,
        image: Option<String>,
    ) -> Self {
        Self {
            name: or_sentinel(name),
            price_raw: or_sentinel(price_raw),
            link: or_sentinel(link),
            image: or_sentinel(image),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price_raw(&self) -> &str {
        &self.price_raw
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    fn dedupe_key(&self) -> (String, String) {
        (self.name.clone(), self.link.clone())
    }
}

fn or_sentinel(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Point-in-time, read-only view of a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<[ScrapedItem]>);

impl Snapshot {
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn items(&self) -> &[ScrapedItem] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScrapedItem> {
        self.0.iter()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<ScrapedItem>> for Snapshot {
    fn from(items: Vec<ScrapedItem>) -> Self {
        Self(Arc::from(items))
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a ScrapedItem;
    type IntoIter = std::slice::Iter<'a, ScrapedItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

/// Append-only, insertion-ordered collection of everything a session has
/// extracted so far.
#[derive(Debug, Default)]
pub struct ResultSet {
    items: Vec<ScrapedItem>,
    seen: HashSet<(String, String)>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends one page of items in order and returns how many were kept.
    /// With `dedupe` set, items whose `(name, link)` were already accepted
    /// are dropped.
    pub fn append_page(&mut self, items: Vec<ScrapedItem>, dedupe: bool) -> usize {
        let mut added = 0;
        for item in items {
            let fresh = self.seen.insert(item.dedupe_key());
            if dedupe && !fresh {
                continue;
            }
            self.items.push(item);
            added += 1;
        }
        added
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from(self.items.clone())
    }
}

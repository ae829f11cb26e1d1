//! Series and item types supplied by the resolution collaborator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single downloadable entry of a series (one episode).
///
/// Items are immutable once constructed; the engine only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Opaque identifier understood by the link resolver.
    pub id: String,
    /// Display name, also used to build the destination filename.
    pub name: String,
    /// Locator handed to the link resolver.
    #[serde(rename = "link")]
    pub locator: String,
}

impl Item {
    /// Creates a new item.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            locator: locator.into(),
        }
    }
}

/// Display metadata and the ordered item list for one series.
#[derive(Debug, Clone)]
pub struct SeriesInfo {
    /// Series title.
    pub title: String,
    /// Items in the order the source lists them.
    pub items: Vec<Arc<Item>>,
    /// Name of the server the items were taken from.
    pub server: String,
}

/// Keeps only items whose name appears in `names`.
///
/// An empty filter keeps every item. Order of `items` is preserved.
#[must_use]
pub fn filter_items(items: Vec<Arc<Item>>, names: &[String]) -> Vec<Arc<Item>> {
    if names.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| names.iter().any(|name| *name == item.name))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> Vec<Arc<Item>> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Arc::new(Item::new(i.to_string(), *name, format!("/ep/{i}"))))
            .collect()
    }

    #[test]
    fn test_filter_items_empty_filter_keeps_all() {
        let kept = filter_items(items(&["1", "2", "3"]), &[]);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_filter_items_keeps_matching_in_source_order() {
        let filter = vec!["4".to_string(), "2".to_string()];
        let kept = filter_items(items(&["1", "2", "3", "4", "5"]), &filter);
        let names: Vec<&str> = kept.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["2", "4"]);
    }

    #[test]
    fn test_filter_items_unknown_names_match_nothing() {
        let filter = vec!["99".to_string()];
        assert!(filter_items(items(&["1", "2"]), &filter).is_empty());
    }

    #[test]
    fn test_item_deserializes_link_as_locator() {
        let item: Item =
            serde_json::from_str(r#"{"id":"a1","name":"01","link":"https://x/ep/1"}"#).unwrap();
        assert_eq!(item.locator, "https://x/ep/1");
    }
}

use crate::SaveProperty;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Filtered and sorted projection of a property list.
///
/// Storage order stays authoritative: the view only maps "row N on screen" to an index in
/// the underlying list. Positional edits must go through [`PropertyView::storage_index`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyView {
    pub filter: String,
    pub name_sort: Option<SortDirection>,
    pub type_sort: Option<SortDirection>,
}

impl PropertyView {
    /// Reordering only makes sense when rows are shown in storage order.
    pub fn is_identity(&self) -> bool {
        self.name_sort.is_none() && self.type_sort.is_none() && self.filter.trim().is_empty()
    }

    pub fn has_filter(&self) -> bool {
        !self.filter.is_empty()
    }

    fn matches(&self, needle: &str, property: &SaveProperty) -> bool {
        needle.is_empty() || property.name.to_lowercase().contains(needle)
    }

    /// Storage indices of the visible rows, in display order.
    pub fn visible_indices(&self, properties: &[SaveProperty]) -> Vec<usize> {
        let needle = self.filter.trim().to_lowercase();
        let mut rows: Vec<usize> = properties
            .iter()
            .enumerate()
            .filter(|(_, p)| self.matches(&needle, p))
            .map(|(i, _)| i)
            .collect();

        if self.name_sort.is_some() || self.type_sort.is_some() {
            // Stable sort: ties keep storage order.
            rows.sort_by(|&a, &b| {
                let (pa, pb) = (&properties[a], &properties[b]);
                let by_name = self.name_sort.map_or(Ordering::Equal, |dir| {
                    dir.apply(compare_names(&pa.name, &pb.name))
                });
                by_name.then_with(|| {
                    self.type_sort.map_or(Ordering::Equal, |dir| {
                        dir.apply(pa.type_name().cmp(pb.type_name()))
                    })
                })
            });
        }

        rows
    }

    pub fn storage_index(&self, properties: &[SaveProperty], visible: usize) -> Option<usize> {
        if self.is_identity() {
            return (visible < properties.len()).then_some(visible);
        }
        self.visible_indices(properties).get(visible).copied()
    }

    pub fn visible_index(&self, properties: &[SaveProperty], storage: usize) -> Option<usize> {
        if self.is_identity() {
            return (storage < properties.len()).then_some(storage);
        }
        self.visible_indices(properties)
            .iter()
            .position(|&i| i == storage)
    }

    pub fn visible_len(&self, properties: &[SaveProperty]) -> usize {
        if self.is_identity() {
            properties.len()
        } else {
            self.visible_indices(properties).len()
        }
    }
}

/// Case-insensitive first, then ordinal, so "a" and "A" still have a fixed order.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::{PropertyView, SortDirection};
    use crate::SaveFile;

    fn sample() -> SaveFile {
        SaveFile::from_json5_str("{ Gold: 1, armor: 'x', gear: true, Gems: 2.5 }").unwrap()
    }

    #[test]
    fn default_view_is_identity() {
        let file = sample();
        let view = PropertyView::default();
        assert!(view.is_identity());
        assert_eq!(view.visible_indices(file.properties()), [0, 1, 2, 3]);
        assert_eq!(view.storage_index(file.properties(), 3), Some(3));
        assert_eq!(view.storage_index(file.properties(), 4), None);
    }

    #[test]
    fn filter_is_trimmed_and_case_insensitive() {
        let file = sample();
        let view = PropertyView {
            filter: "  GE ".to_string(),
            ..Default::default()
        };
        assert!(!view.is_identity());
        assert_eq!(view.visible_indices(file.properties()), [2, 3]);
        assert_eq!(view.storage_index(file.properties(), 1), Some(3));
        assert_eq!(view.visible_index(file.properties(), 0), None);
    }

    #[test]
    fn whitespace_filter_still_allows_moves() {
        let view = PropertyView {
            filter: "   ".to_string(),
            ..Default::default()
        };
        assert!(view.is_identity());
        assert!(view.has_filter());
    }

    #[test]
    fn name_sort_maps_rows_back_to_storage() {
        let file = sample();
        let view = PropertyView {
            name_sort: Some(SortDirection::Descending),
            ..Default::default()
        };
        // Gold, Gems, gear, armor
        assert_eq!(view.visible_indices(file.properties()), [0, 3, 2, 1]);
        assert_eq!(view.storage_index(file.properties(), 1), Some(3));
        assert_eq!(view.visible_index(file.properties(), 1), Some(3));
    }

    #[test]
    fn type_sort_is_stable_over_storage_order() {
        let file = SaveFile::from_json5_str("{ b: 1, a: 'x', c: 2 }").unwrap();
        let view = PropertyView {
            type_sort: Some(SortDirection::Ascending),
            ..Default::default()
        };
        // "number (i64)" < "string"
        assert_eq!(view.visible_indices(file.properties()), [0, 2, 1]);
    }
}

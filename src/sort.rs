use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum SortDirection {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortDirection {
    /// Direction a column takes when its header is toggled. A sorted column
    /// flips between ascending and descending and never returns to `None`.
    fn toggled(self) -> Self {
        match self {
            Self::None | Self::Descending => Self::Ascending,
            Self::Ascending => Self::Descending,
        }
    }

    pub fn is_active(self) -> bool {
        self != Self::None
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::None => "·",
            Self::Ascending => "▲",
            Self::Descending => "▼",
        }
    }

    pub fn query_value(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Ascending => Some("asc"),
            Self::Descending => Some("desc"),
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Ascending => write!(f, "ascending"),
            Self::Descending => write!(f, "descending"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnSortEntry {
    pub accessor: String,
    pub direction: SortDirection,
}

/// One entry per sortable column, in display order. At most one entry is
/// ever active.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct SortState {
    entries: Vec<ColumnSortEntry>,
}

impl SortState {
    pub fn new<I, S>(accessors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: accessors
                .into_iter()
                .map(|accessor| ColumnSortEntry {
                    accessor: accessor.into(),
                    direction: SortDirection::None,
                })
                .collect(),
        }
    }

    /// Marks `accessor` as the single active column. Unknown accessors leave
    /// the state unchanged.
    pub fn with_active(mut self, accessor: &str, direction: SortDirection) -> Self {
        if !self.contains(accessor) {
            return self;
        }
        for entry in &mut self.entries {
            entry.direction = if entry.accessor == accessor {
                direction
            } else {
                SortDirection::None
            };
        }
        self
    }

    pub fn entries(&self) -> &[ColumnSortEntry] {
        &self.entries
    }

    pub fn contains(&self, accessor: &str) -> bool {
        self.entries.iter().any(|entry| entry.accessor == accessor)
    }

    pub fn direction_of(&self, accessor: &str) -> SortDirection {
        self.entries
            .iter()
            .find(|entry| entry.accessor == accessor)
            .map(|entry| entry.direction)
            .unwrap_or_default()
    }

    pub fn active(&self) -> Option<(&str, SortDirection)> {
        self.entries
            .iter()
            .find(|entry| entry.direction.is_active())
            .map(|entry| (entry.accessor.as_str(), entry.direction))
    }

    /// Full replacement of the sort list: the toggled column advances one
    /// step and every other column is reset to `None`.
    pub fn toggled(&self, accessor: &str) -> SortState {
        if !self.contains(accessor) {
            return self.clone();
        }

        let entries = self
            .entries
            .iter()
            .map(|entry| ColumnSortEntry {
                accessor: entry.accessor.clone(),
                direction: if entry.accessor == accessor {
                    entry.direction.toggled()
                } else {
                    SortDirection::None
                },
            })
            .collect();
        SortState { entries }
    }

    /// Returns whether the state changed.
    pub fn toggle(&mut self, accessor: &str) -> bool {
        let next = self.toggled(accessor);
        let changed = next != *self;
        *self = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::{SortDirection, SortState};

    fn columns() -> SortState {
        SortState::new(["name", "namespace", "pod", "app"])
            .with_active("namespace", SortDirection::Ascending)
    }

    fn active_count(state: &SortState) -> usize {
        state
            .entries()
            .iter()
            .filter(|entry| entry.direction.is_active())
            .count()
    }

    #[test]
    fn toggle_cycles_none_ascending_descending_ascending() {
        let mut sort = columns();
        assert_eq!(sort.direction_of("name"), SortDirection::None);

        sort.toggle("name");
        assert_eq!(sort.direction_of("name"), SortDirection::Ascending);
        sort.toggle("name");
        assert_eq!(sort.direction_of("name"), SortDirection::Descending);
        sort.toggle("name");
        assert_eq!(sort.direction_of("name"), SortDirection::Ascending);
    }

    #[test]
    fn toggling_a_column_resets_every_other_column() {
        let mut sort = columns();
        sort.toggle("pod");
        assert_eq!(sort.active(), Some(("pod", SortDirection::Ascending)));
        assert_eq!(sort.direction_of("namespace"), SortDirection::None);

        sort.toggle("namespace");
        assert_eq!(sort.direction_of("namespace"), SortDirection::Ascending);
        assert_eq!(sort.direction_of("pod"), SortDirection::None);
    }

    #[test]
    fn at_most_one_column_is_active_after_any_toggle_sequence() {
        let mut sort = columns();
        let sequence = [
            "app", "app", "name", "pod", "pod", "pod", "missing", "namespace", "app", "name",
        ];
        for accessor in sequence {
            sort.toggle(accessor);
            assert!(active_count(&sort) <= 1, "after toggling {accessor}");
        }
    }

    #[test]
    fn unknown_column_is_a_no_op() {
        let mut sort = columns();
        let before = sort.clone();
        assert!(!sort.toggle("replicas"));
        assert_eq!(sort, before);
    }

    #[test]
    fn toggled_leaves_the_original_untouched() {
        let sort = columns();
        let next = sort.toggled("namespace");
        assert_eq!(sort.direction_of("namespace"), SortDirection::Ascending);
        assert_eq!(next.direction_of("namespace"), SortDirection::Descending);
    }

    #[test]
    fn with_active_keeps_single_active_invariant() {
        let sort = SortState::new(["key", "value"])
            .with_active("key", SortDirection::Ascending)
            .with_active("value", SortDirection::Descending);
        assert_eq!(sort.active(), Some(("value", SortDirection::Descending)));
        assert_eq!(active_count(&sort), 1);
    }
}

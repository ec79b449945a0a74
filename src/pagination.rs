pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Page cursor for a screen. The server reports no total, so "more data"
/// is inferred from whether the last load filled a whole page.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Pagination {
    page: u32,
    page_size: usize,
    last_loaded: Option<usize>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            last_loaded: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn can_previous(&self) -> bool {
        self.page != 1
    }

    /// A full page counts as evidence that more data may exist. When the
    /// final page is exactly full this allows one extra, empty fetch.
    pub fn can_next(&self) -> bool {
        self.last_loaded == Some(self.page_size)
    }

    pub fn previous(&mut self) -> bool {
        if !self.can_previous() {
            return false;
        }
        self.page -= 1;
        self.last_loaded = None;
        true
    }

    pub fn next(&mut self) -> bool {
        if !self.can_next() {
            return false;
        }
        self.page += 1;
        self.last_loaded = None;
        true
    }

    pub fn record_loaded(&mut self, count: usize) {
        self.last_loaded = Some(count);
    }
}

#[cfg(test)]
mod tests {
    use super::Pagination;

    #[test]
    fn starts_on_first_page_without_navigation() {
        let pagination = Pagination::new(10);
        assert_eq!(pagination.page(), 1);
        assert!(!pagination.can_previous());
        assert!(!pagination.can_next());
    }

    #[test]
    fn full_page_allows_next() {
        let mut pagination = Pagination::new(10);
        pagination.record_loaded(10);
        assert!(pagination.can_next());

        pagination.record_loaded(7);
        assert!(!pagination.can_next());
    }

    #[test]
    fn next_and_previous_respect_bounds() {
        let mut pagination = Pagination::new(10);
        assert!(!pagination.previous());

        pagination.record_loaded(10);
        assert!(pagination.next());
        assert_eq!(pagination.page(), 2);
        assert!(pagination.can_previous());

        pagination.record_loaded(3);
        assert!(!pagination.next());
        assert_eq!(pagination.page(), 2);

        assert!(pagination.previous());
        assert_eq!(pagination.page(), 1);
        assert!(!pagination.can_previous());
    }

    #[test]
    fn new_page_has_no_count_until_its_load_completes() {
        let mut pagination = Pagination::new(10);
        pagination.record_loaded(10);
        assert!(pagination.next());
        assert!(!pagination.can_next());
        assert!(!pagination.next());
        assert_eq!(pagination.page(), 2);

        pagination.record_loaded(10);
        assert!(pagination.previous());
        assert!(!pagination.can_next());
        assert_eq!(pagination.page(), 1);
    }

    #[test]
    fn exactly_full_last_page_permits_one_empty_fetch() {
        let mut pagination = Pagination::new(5);
        pagination.record_loaded(5);
        assert!(pagination.next());
        pagination.record_loaded(0);
        assert!(!pagination.can_next());
        assert_eq!(pagination.page(), 2);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let mut pagination = Pagination::new(0);
        assert_eq!(pagination.page_size(), 1);
        pagination.record_loaded(1);
        assert!(pagination.can_next());
    }
}

/// Item budget shared by the `list-*` subcommands.
///
/// List APIs page through results with an opaque continuation token. The
/// caller may cap the total number of items with `--limit` and override the
/// per-request page size with `--page-size`; the budget makes sure no request
/// asks for more items than the caller still wants.
pub struct PageBudget {
    remaining: Option<usize>,
    page_size: Option<i32>,
}

impl PageBudget {
    pub fn new(limit: Option<usize>, page_size: Option<i32>) -> Self {
        Self {
            remaining: limit,
            page_size,
        }
    }

    /// Page size for the next request, or `None` for the service default.
    pub fn request_size(&self) -> Option<i32> {
        match (self.remaining, self.page_size) {
            (Some(remaining), Some(page_size)) => Some(page_size.min(remaining as i32)),
            (Some(remaining), None) => Some(remaining as i32),
            (None, page_size) => page_size,
        }
    }

    /// Truncates a page of items to the remaining budget.
    pub fn clamp<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let Some(remaining) = self.remaining {
            items.truncate(remaining);
        }
        items
    }

    /// Records that `count` items were emitted. Returns `true` while budget
    /// remains.
    pub fn consume(&mut self, count: usize) -> bool {
        match self.remaining.as_mut() {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(count);
                *remaining > 0
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PageBudget;

    #[test]
    fn test_unbounded_budget_never_exhausts() {
        let mut budget = PageBudget::new(None, None);
        assert_eq!(budget.request_size(), None);
        assert!(budget.consume(1_000));
        assert!(budget.consume(1_000));
    }

    #[test]
    fn test_page_size_clamped_to_remaining_limit() {
        let mut budget = PageBudget::new(Some(25), Some(10));
        assert_eq!(budget.request_size(), Some(10));
        assert!(budget.consume(10));
        assert_eq!(budget.request_size(), Some(10));
        assert!(budget.consume(10));
        // 5 items left, smaller than the page-size override.
        assert_eq!(budget.request_size(), Some(5));
        assert!(!budget.consume(5));
    }

    #[test]
    fn test_limit_without_page_size() {
        let budget = PageBudget::new(Some(7), None);
        assert_eq!(budget.request_size(), Some(7));
    }

    #[test]
    fn test_clamp_truncates_to_remaining() {
        let mut budget = PageBudget::new(Some(3), None);
        let items = budget.clamp(vec!["a", "b", "c", "d", "e"]);
        assert_eq!(items, vec!["a", "b", "c"]);
        assert!(!budget.consume(items.len()));
        assert!(budget.clamp(vec!["f"]).is_empty());
    }

    #[test]
    fn test_overconsuming_saturates() {
        let mut budget = PageBudget::new(Some(2), None);
        assert!(!budget.consume(5));
        assert_eq!(budget.request_size(), Some(0));
    }
}

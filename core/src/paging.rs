pub const MIN_PAGE_LIMIT: u32 = 5;
pub const MAX_PAGE_LIMIT: u32 = 200;
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(MIN_PAGE_LIMIT, MAX_PAGE_LIMIT)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageQuery {
    pub offset: u64,
    pub limit: u32,
    pub search: Option<String>,
}

impl PageQuery {
    /// Clamps `limit` and drops a blank search term.
    pub fn new(offset: u64, limit: u32, search: Option<String>) -> Self {
        let search = search
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Self {
            offset,
            limit: clamp_limit(limit),
            search,
        }
    }

    pub fn next(&self, total: u64) -> Option<Self> {
        let offset = self.offset + u64::from(self.limit);
        (offset < total).then(|| Self {
            offset,
            ..self.clone()
        })
    }

    pub fn previous(&self) -> Option<Self> {
        (self.offset > 0).then(|| Self {
            offset: self.offset.saturating_sub(u64::from(self.limit)),
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePosition {
    /// 1-indexed
    pub page: u64,
    pub total_pages: u64,
}

pub fn page_position(offset: u64, limit: u32, total: u64) -> PagePosition {
    let limit = u64::from(clamp_limit(limit));
    let total_pages = total.div_ceil(limit);
    let page = (offset / limit + 1).min(total_pages.max(1));
    PagePosition { page, total_pages }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped_both_ways() {
        assert_eq!(clamp_limit(0), 5);
        assert_eq!(clamp_limit(4), 5);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(10_000), 200);
    }

    #[test]
    fn blank_search_is_dropped() {
        assert_eq!(PageQuery::new(0, 20, Some("   ".into())).search, None);
        assert_eq!(
            PageQuery::new(0, 20, Some(" boots ".into())).search.as_deref(),
            Some("boots")
        );
    }

    #[test]
    fn next_stops_at_total() {
        let query = PageQuery::new(0, 20, None);
        let next = query.next(45).unwrap();
        assert_eq!(next.offset, 20);
        let last = next.next(45).unwrap();
        assert_eq!(last.offset, 40);
        assert!(last.next(45).is_none());
    }

    #[test]
    fn previous_saturates_at_zero() {
        assert!(PageQuery::new(0, 20, None).previous().is_none());
        assert_eq!(PageQuery::new(10, 20, None).previous().unwrap().offset, 0);
        assert_eq!(PageQuery::new(60, 20, None).previous().unwrap().offset, 40);
    }

    #[test]
    fn page_position_normal() {
        let p = page_position(20, 20, 45);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn page_position_empty() {
        let p = page_position(0, 20, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
    }

    #[test]
    fn page_position_out_of_bounds_is_clamped() {
        let p = page_position(400, 20, 45);
        assert_eq!(p.page, 3);
    }
}

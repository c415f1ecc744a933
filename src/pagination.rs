use serde::Serialize;

/// One window of an ordered result set, plus what the paginator partial
/// needs to draw page links.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub object_list: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T: Serialize> Page<T> {
    pub fn new(object_list: Vec<T>, total: i64, number: i64, per_page: i64) -> Page<T> {
        let num_pages = num_pages(total, per_page);
        Page {
            object_list,
            number,
            num_pages,
            has_previous: number > 1,
            has_next: number < num_pages,
        }
    }
}

pub fn num_pages(total: i64, per_page: i64) -> i64 {
    ((total + per_page - 1) / per_page).max(1)
}

/// Resolve a requested page number the forgiving way: absent or invalid
/// requests land on page 1, past-the-end requests on the last page.
pub fn clamp(requested: Option<i64>, total: i64, per_page: i64) -> i64 {
    requested.unwrap_or(1).clamp(1, num_pages(total, per_page))
}

/// `LIMIT`/`OFFSET` for a resolved page number.
pub fn window(number: i64, per_page: i64) -> (i64, i64) {
    (per_page, (number - 1) * per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirteen_posts_fill_one_page_and_leave_three() {
        assert_eq!(num_pages(13, 10), 2);
        let first = Page::new(vec![(); 10], 13, 1, 10);
        assert!(first.has_next);
        assert!(!first.has_previous);
        let second = Page::new(vec![(); 3], 13, 2, 10);
        assert!(!second.has_next);
        assert!(second.has_previous);
    }

    #[test]
    fn clamp_is_forgiving_at_both_ends() {
        assert_eq!(clamp(None, 13, 10), 1);
        assert_eq!(clamp(Some(0), 13, 10), 1);
        assert_eq!(clamp(Some(-4), 13, 10), 1);
        assert_eq!(clamp(Some(999), 13, 10), 2);
        assert_eq!(clamp(Some(2), 13, 10), 2);
    }

    #[test]
    fn empty_result_set_still_has_one_page() {
        assert_eq!(num_pages(0, 10), 1);
        assert_eq!(clamp(Some(5), 0, 10), 1);
    }

    #[test]
    fn window_offsets_by_whole_pages() {
        assert_eq!(window(1, 10), (10, 0));
        assert_eq!(window(2, 10), (10, 10));
        assert_eq!(window(3, 4), (4, 8));
    }
}

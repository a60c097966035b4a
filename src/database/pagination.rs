use serde::{Deserialize, Serialize};

/// Offset-windowed page envelope. Rows carry their own window count
/// (`COUNT(..) OVER()`), so one query yields both the page and the
/// total.
#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: i64,
    pub prev_offset: i64,
    pub message: Option<String>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows();
        }
        let last_offset = ((total_rows - 1).max(0) / page_size) * page_size;
        let next_offset = (current_offset + page_size).min(last_offset);
        let prev_offset = (current_offset - page_size).max(0);

        Self {
            rows,
            total_rows,
            next_offset,
            prev_offset,
            message: Some(format!(
                "{} - {} / {}",
                current_offset,
                (current_offset + page_size).min(total_rows),
                total_rows
            )),
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            next_offset: 0,
            prev_offset: 0,
            message: Some(String::from("No results")),
        }
    }

    /// Maps the row type while keeping the window bookkeeping.
    pub fn map_rows<U>(self, f: impl FnMut(T) -> U) -> PageContext<U> {
        PageContext {
            rows: self.rows.into_iter().map(f).collect(),
            total_rows: self.total_rows,
            next_offset: self.next_offset,
            prev_offset: self.prev_offset,
            message: self.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_the_empty_page() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, 10, 0);
        assert_eq!(page.total_rows, 0);
        assert_eq!(page.next_offset, 0);
        assert_eq!(page.prev_offset, 0);
    }

    #[test]
    fn first_page_has_no_previous_offset() {
        let page = PageContext::from_rows(vec![1, 2, 3], 25, 10, 0);
        assert_eq!(page.prev_offset, 0);
        assert_eq!(page.next_offset, 10);
    }

    #[test]
    fn middle_page_moves_both_ways() {
        let page = PageContext::from_rows(vec![1, 2, 3], 25, 10, 10);
        assert_eq!(page.prev_offset, 0);
        assert_eq!(page.next_offset, 20);
    }

    #[test]
    fn next_offset_never_passes_the_last_window() {
        let page = PageContext::from_rows(vec![1, 2, 3], 25, 10, 20);
        assert_eq!(page.next_offset, 20);
    }

    #[test]
    fn map_rows_keeps_the_window() {
        let page = PageContext::from_rows(vec![1, 2, 3], 3, 10, 0).map_rows(|n| n.to_string());
        assert_eq!(page.rows, vec!["1", "2", "3"]);
        assert_eq!(page.total_rows, 3);
    }

    #[test]
    fn message_reports_the_window() {
        let page = PageContext::from_rows(vec![1, 2], 12, 10, 10);
        assert_eq!(page.message.as_deref(), Some("10 - 12 / 12"));
    }
}

//! Cache key construction.

use crate::application::pagination::PageRequest;

const ANONYMOUS_VIEWER: &str = "anonymous";

/// Key for one rendered home feed page.
///
/// Every key shares the configured prefix. The requested page and the viewer
/// are appended so that page 2 never serves page 1 and signed-in chrome never
/// leaks between viewers.
pub fn home_page_key(prefix: &str, request: PageRequest, viewer: Option<&str>) -> String {
    let page = match request {
        PageRequest::Absent | PageRequest::Invalid => "1".to_string(),
        PageRequest::Number(number) => number.to_string(),
    };
    let viewer = viewer.unwrap_or(ANONYMOUS_VIEWER);
    format!("{prefix}:page={page}:viewer={viewer}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_invalid_pages_share_the_first_page_key() {
        let absent = home_page_key("index_page", PageRequest::Absent, None);
        let invalid = home_page_key("index_page", PageRequest::Invalid, None);
        let first = home_page_key("index_page", PageRequest::Number(1), None);
        assert_eq!(absent, "index_page:page=1:viewer=anonymous");
        assert_eq!(absent, invalid);
        assert_eq!(absent, first);
    }

    #[test]
    fn pages_and_viewers_are_distinct() {
        let second = home_page_key("index_page", PageRequest::Number(2), None);
        let signed_in = home_page_key("index_page", PageRequest::Number(2), Some("leo"));
        assert_ne!(second, signed_in);
        assert!(second.starts_with("index_page:"));
        assert!(signed_in.ends_with("viewer=leo"));
    }
}

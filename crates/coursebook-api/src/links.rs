// crates/coursebook-api/src/links.rs
// ============================================================================
// Module: Response Links
// Description: HATEOAS-style navigation links for paginated collections and
//              created resources.
// Purpose: Build relative URLs that preserve active filters so clients can
//          walk pages without reassembling query strings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Collection responses carry page navigation links and creation responses
//! carry a link to the new resource. All links are server-relative paths.
//! Filter parameters active on the current request are reproduced on every
//! page link so following a link keeps the same result set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Page Links
// ============================================================================

/// Navigation links for one page of a collection.
#[derive(Debug, Default, Serialize)]
pub struct PageLinks {
    /// Next page, present when a later page exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    /// Last page, present when a later page exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page: Option<String>,
    /// Previous page, present when an earlier page exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<String>,
    /// First page, present when an earlier page exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_page: Option<String>,
}

/// Builds page navigation links for a collection endpoint.
///
/// `filters` holds the active filter parameters in the order they should
/// appear after `page` in each query string.
#[must_use]
pub fn page_links(
    base: &str,
    page: u64,
    total_pages: u64,
    filters: &[(&str, String)],
) -> PageLinks {
    let (next_page, last_page) = if page < total_pages {
        (
            Some(page_url(base, page + 1, filters)),
            Some(page_url(base, total_pages, filters)),
        )
    } else {
        (None, None)
    };
    let (prev_page, first_page) = if page > 1 {
        (Some(page_url(base, page - 1, filters)), Some(page_url(base, 1, filters)))
    } else {
        (None, None)
    };
    PageLinks {
        next_page,
        last_page,
        prev_page,
        first_page,
    }
}

/// Formats one page URL with the active filters appended.
fn page_url(base: &str, page: u64, filters: &[(&str, String)]) -> String {
    let mut url = format!("{base}?page={page}");
    for (name, value) in filters {
        url.push('&');
        url.push_str(name);
        url.push('=');
        url.push_str(value);
    }
    url
}

// ============================================================================
// SECTION: Resource Links
// ============================================================================

/// Self link for a newly created resource.
#[derive(Debug, Serialize)]
pub struct SelfLink {
    /// Path of the created resource.
    #[serde(rename = "self")]
    pub self_link: String,
}

impl SelfLink {
    /// Builds a self link from a resource path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { self_link: path.into() }
    }
}

/// Links for a newly created submission.
#[derive(Debug, Serialize)]
pub struct SubmissionLinks {
    /// Path of the submission metadata resource.
    pub submission: String,
    /// Path of the stored submission payload.
    pub submission_file: String,
}

impl SubmissionLinks {
    /// Builds submission links from its ids and filename.
    #[must_use]
    pub fn new(assignment_id: i64, submission_id: i64, filename: &str) -> Self {
        let submission = format!("/assignments/{assignment_id}/submissions/{submission_id}");
        let submission_file = format!("{submission}/file/{filename}");
        Self { submission, submission_file }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::*;

    #[test]
    fn middle_page_links_in_all_directions() {
        let links = page_links("/courses", 2, 4, &[("subject", "CS".to_string())]);
        assert_eq!(links.next_page.as_deref(), Some("/courses?page=3&subject=CS"));
        assert_eq!(links.last_page.as_deref(), Some("/courses?page=4&subject=CS"));
        assert_eq!(links.prev_page.as_deref(), Some("/courses?page=1&subject=CS"));
        assert_eq!(links.first_page.as_deref(), Some("/courses?page=1&subject=CS"));
    }

    #[test]
    fn first_page_omits_backward_links() {
        let links = page_links("/courses", 1, 3, &[]);
        assert_eq!(links.next_page.as_deref(), Some("/courses?page=2"));
        assert!(links.prev_page.is_none());
        assert!(links.first_page.is_none());
    }

    #[test]
    fn last_page_omits_forward_links() {
        let links = page_links("/courses", 3, 3, &[]);
        assert!(links.next_page.is_none());
        assert!(links.last_page.is_none());
        assert_eq!(links.prev_page.as_deref(), Some("/courses?page=2"));
    }

    #[test]
    fn empty_collection_has_no_links() {
        let links = page_links("/courses", 1, 0, &[]);
        assert!(links.next_page.is_none());
        assert!(links.prev_page.is_none());
    }

    #[test]
    fn submission_links_nest_under_the_assignment() {
        let links = SubmissionLinks::new(4, 9, "essay.pdf");
        assert_eq!(links.submission, "/assignments/4/submissions/9");
        assert_eq!(links.submission_file, "/assignments/4/submissions/9/file/essay.pdf");
    }
}

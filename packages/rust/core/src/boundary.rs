//! Semantic-boundary detection.
//!
//! A boundary predicate reports when an element starts a new semantic unit
//! (a section or a page) that must not share a chunk with what came before.
//! Predicates may hold state, so a fresh set is built for each element stream.

use docchunk_shared::{Element, ElementKind};

/// Detects when an element crosses a semantic boundary.
pub trait BoundaryPredicate: Send {
    /// True when `element` begins a new semantic unit.
    fn is_boundary(&mut self, element: &Element) -> bool;
}

/// Every `Title` element starts a new section.
#[derive(Debug, Default)]
pub struct TitleBoundary;

impl BoundaryPredicate for TitleBoundary {
    fn is_boundary(&mut self, element: &Element) -> bool {
        element.kind == ElementKind::Title
    }
}

/// Triggers on each change of page number.
///
/// The first element never triggers; it sets the current page to its own
/// page number, or 1 when it has none. Elements without a page number
/// continue the current page. Any other page number, lower ones included,
/// starts a new page.
#[derive(Debug)]
pub struct PageBoundary {
    current_page: u32,
    is_first: bool,
}

impl PageBoundary {
    pub fn new() -> Self {
        Self {
            current_page: 1,
            is_first: true,
        }
    }
}

impl Default for PageBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryPredicate for PageBoundary {
    fn is_boundary(&mut self, element: &Element) -> bool {
        let page_number = element.metadata.page_number;

        if self.is_first {
            // Page 0 means unset.
            self.current_page = page_number.filter(|&n| n != 0).unwrap_or(1);
            self.is_first = false;
            return false;
        }

        match page_number {
            Some(n) if n != self.current_page => {
                self.current_page = n;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_page(page: Option<u32>) -> Element {
        let mut e = Element::narrative("text");
        e.metadata.page_number = page;
        e
    }

    #[test]
    fn title_boundary() {
        let mut pred = TitleBoundary;
        assert!(pred.is_boundary(&Element::title("Intro")));
        assert!(!pred.is_boundary(&Element::narrative("Body")));
    }

    #[test]
    fn page_boundary_tracks_page_changes() {
        let mut pred = PageBoundary::new();
        let results: Vec<bool> = [Some(2), Some(2), None, Some(3), Some(3), Some(1)]
            .into_iter()
            .map(|p| pred.is_boundary(&on_page(p)))
            .collect();
        assert_eq!(results, vec![false, false, false, true, false, true]);
    }

    #[test]
    fn unnumbered_first_element_starts_page_one() {
        let mut pred = PageBoundary::new();
        assert!(!pred.is_boundary(&on_page(None)));
        assert!(!pred.is_boundary(&on_page(Some(1))));
        assert!(pred.is_boundary(&on_page(Some(2))));
    }

    #[test]
    fn page_zero_on_first_element_counts_as_page_one() {
        let mut pred = PageBoundary::new();
        assert!(!pred.is_boundary(&on_page(Some(0))));
        assert!(!pred.is_boundary(&on_page(Some(1))));
        assert!(pred.is_boundary(&on_page(Some(2))));
    }
}

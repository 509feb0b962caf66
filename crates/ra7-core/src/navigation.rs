//! Page navigation through an explicitly passed view stack.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Opaque page identifier. Not validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub String);

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that can be told to show a page.
pub trait NavigationContext {
    fn navigate(&mut self, page: PageId);
}

/// Frame-style view stack: navigating pushes, `back` pops.
#[derive(Debug, Default, Clone)]
pub struct ViewStack {
    pages: Vec<PageId>,
}

impl ViewStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&PageId> {
        self.pages.last()
    }

    pub fn depth(&self) -> usize {
        self.pages.len()
    }

    /// Returns to the previous page. The root page is never popped.
    pub fn back(&mut self) -> Option<PageId> {
        if self.pages.len() > 1 {
            self.pages.pop()
        } else {
            None
        }
    }
}

impl NavigationContext for ViewStack {
    fn navigate(&mut self, page: PageId) {
        debug!("navigate -> {}", page);
        self.pages.push(page);
    }
}

/// Send `ctx` to `page`.
pub fn navigate_to(ctx: &mut dyn NavigationContext, page: impl Into<PageId>) {
    ctx.navigate(page.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_pushes_page() {
        let mut stack = ViewStack::new();
        navigate_to(&mut stack, "TaskListPage");
        navigate_to(&mut stack, "TaskDetailPage");
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current(), Some(&PageId::from("TaskDetailPage")));
    }

    #[test]
    fn test_identifier_is_not_validated() {
        let mut stack = ViewStack::new();
        navigate_to(&mut stack, "");
        navigate_to(&mut stack, "no such page!!");
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current().map(|p| p.0.as_str()), Some("no such page!!"));
    }

    #[test]
    fn test_back_keeps_root() {
        let mut stack = ViewStack::new();
        navigate_to(&mut stack, "Home");
        navigate_to(&mut stack, "Settings");
        assert_eq!(stack.back(), Some(PageId::from("Settings")));
        assert_eq!(stack.back(), None);
        assert_eq!(stack.current(), Some(&PageId::from("Home")));
    }

    #[test]
    fn test_custom_context() {
        struct Recorder(Vec<String>);
        impl NavigationContext for Recorder {
            fn navigate(&mut self, page: PageId) {
                self.0.push(page.0);
            }
        }

        let mut rec = Recorder(Vec::new());
        navigate_to(&mut rec, String::from("About"));
        assert_eq!(rec.0, vec!["About".to_string()]);
    }
}

//! Focused-window detection
//!
//! A [`WindowProvider`] answers "what is the focused window called right
//! now"; the [`FocusWatcher`] turns that into change notifications so the
//! handler only hears about a title once.

#[cfg(feature = "x11")]
pub mod x11;

use tracing::{debug, info};

/// Platform query for the currently focused window
pub trait WindowProvider {
    /// Title of the focused window, or `None` if it cannot be determined
    fn active_window_title(&mut self) -> Option<String>;
}

/// Provider for platforms without window detection
#[derive(Debug, Default)]
pub struct NullProvider;

impl WindowProvider for NullProvider {
    fn active_window_title(&mut self) -> Option<String> {
        None
    }
}

/// Change detector over a [`WindowProvider`]
pub struct FocusWatcher {
    provider: Box<dyn WindowProvider>,
    last_title: String,
}

impl FocusWatcher {
    pub fn new(provider: Box<dyn WindowProvider>) -> Self {
        Self {
            provider,
            last_title: String::new(),
        }
    }

    /// Watcher backed by the best provider this build supports
    ///
    /// Falls back to [`NullProvider`] when the windowing system is not
    /// reachable, so a missing display never stops the process.
    pub fn platform() -> Self {
        #[cfg(feature = "x11")]
        {
            match x11::X11Provider::connect() {
                Ok(provider) => {
                    info!("Window focus tracking via X11");
                    return Self::new(Box::new(provider));
                }
                Err(e) => info!("Window focus tracking disabled: {}", e),
            }
        }

        #[cfg(not(feature = "x11"))]
        info!("Window focus tracking not compiled in");

        Self::new(Box::new(NullProvider))
    }

    /// Return the new title if focus moved to a differently named window
    pub fn poll(&mut self) -> Option<String> {
        let title = self.provider.active_window_title()?;
        if title == self.last_title {
            return None;
        }

        debug!(from = %self.last_title, to = %title, "focus changed");
        self.last_title.clone_from(&title);
        Some(title)
    }

    /// Last title reported by [`poll`](Self::poll); empty before the first change
    pub fn last_title(&self) -> &str {
        &self.last_title
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Provider replaying a fixed sequence of answers
    pub(crate) struct ScriptedProvider(pub VecDeque<Option<String>>);

    impl ScriptedProvider {
        pub(crate) fn new(titles: &[Option<&str>]) -> Self {
            Self(titles.iter().map(|t| t.map(String::from)).collect())
        }
    }

    impl WindowProvider for ScriptedProvider {
        fn active_window_title(&mut self) -> Option<String> {
            self.0.pop_front().flatten()
        }
    }

    #[test]
    fn test_reports_each_distinct_title_once() {
        let provider = ScriptedProvider::new(&[
            Some("Terminal"),
            Some("Terminal"),
            Some("Ardour"),
            Some("Ardour"),
            Some("Terminal"),
        ]);
        let mut watcher = FocusWatcher::new(Box::new(provider));

        assert_eq!(watcher.poll().as_deref(), Some("Terminal"));
        assert_eq!(watcher.poll(), None);
        assert_eq!(watcher.poll().as_deref(), Some("Ardour"));
        assert_eq!(watcher.poll(), None);
        assert_eq!(watcher.poll().as_deref(), Some("Terminal"));
        assert_eq!(watcher.last_title(), "Terminal");
    }

    #[test]
    fn test_unavailable_provider_never_reports() {
        let mut watcher = FocusWatcher::new(Box::new(NullProvider));
        for _ in 0..3 {
            assert_eq!(watcher.poll(), None);
        }
        assert_eq!(watcher.last_title(), "");
    }

    #[test]
    fn test_failed_query_keeps_last_title() {
        let provider = ScriptedProvider::new(&[Some("Firefox"), None, Some("Firefox")]);
        let mut watcher = FocusWatcher::new(Box::new(provider));

        assert_eq!(watcher.poll().as_deref(), Some("Firefox"));
        assert_eq!(watcher.poll(), None);
        assert_eq!(watcher.poll(), None);
    }
}

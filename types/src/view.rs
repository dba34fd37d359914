//! Host-side view abstraction.
//!
//! A [`ViewHandle`] is what the host hands the supervisor when asking for a
//! render: the view's identity, the document it shows, and the per-view
//! theme/layout selections the user made in the preview toolbar.

use std::path::{Path, PathBuf};

use crate::{Layout, Theme, ViewId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewHandle {
    id: ViewId,
    /// `None` for views whose document has no backing file yet.
    source: Option<PathBuf>,
    theme: Option<Theme>,
    layout: Option<Layout>,
}

impl ViewHandle {
    #[must_use]
    pub fn new(id: ViewId, source: impl Into<PathBuf>) -> Self {
        Self {
            id,
            source: Some(source.into()),
            theme: None,
            layout: None,
        }
    }

    /// A view that is not (yet) backed by a file on disk.
    #[must_use]
    pub fn unsaved(id: ViewId) -> Self {
        Self {
            id,
            source: None,
            theme: None,
            layout: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> ViewId {
        self.id
    }

    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn theme(&self) -> Option<Theme> {
        self.theme
    }

    #[must_use]
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn set_theme(&mut self, theme: Option<Theme>) {
        self.theme = theme;
    }

    pub fn set_layout(&mut self, layout: Option<Layout>) {
        self.layout = layout;
    }

    /// Drop the user's theme and layout selections.
    pub fn clear_preferences(&mut self) {
        self.theme = None;
        self.layout = None;
    }
}

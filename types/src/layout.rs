//! Layout engine identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EmptyStringError, NonEmptyString};

/// A layout engine id as passed to `--layout=<id>`.
///
/// Bundled engines are `dagre` and `elk`; `tala` and third-party plugins
/// report their own ids through `d2 layout`, so this is an open set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Layout(NonEmptyString);

impl Layout {
    pub const DAGRE: &'static str = "dagre";
    pub const ELK: &'static str = "elk";
    pub const TALA: &'static str = "tala";

    /// Returns `None` for blank ids.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        NonEmptyString::new(id.trim()).ok().map(Self)
    }

    #[must_use]
    pub fn dagre() -> Self {
        Self(NonEmptyString(Self::DAGRE.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Layout {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(EmptyStringError)
    }
}

impl From<Layout> for String {
    fn from(value: Layout) -> Self {
        value.0.into()
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::dagre()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the compiler's layout engine listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEngine {
    layout: Layout,
    bundled: bool,
    description: String,
}

impl LayoutEngine {
    #[must_use]
    pub fn new(layout: Layout, bundled: bool, description: impl Into<String>) -> Self {
        Self {
            layout,
            bundled,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Whether the engine ships inside the compiler binary.
    #[must_use]
    pub fn bundled(&self) -> bool {
        self.bundled
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

//! The D2 theme catalog.
//!
//! Themes are identified on the compiler command line by their numeric id
//! (`--theme=<id>`). The catalog mirrors the themes bundled with the `d2`
//! compiler; anything else is rejected at the boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Theme {
    #[default]
    NeutralDefault,
    NeutralGrey,
    FlagshipTerrastruct,
    CoolClassics,
    MixedBerryBlue,
    GrapeSoda,
    Aubergine,
    ColorblindClear,
    VanillaNitroCola,
    OrangeCreamsicle,
    ShirleyTemple,
    EarthTones,
    EvergladeGreen,
    ButteredToast,
    DarkMauve,
    DarkFlagshipTerrastruct,
    Terminal,
    TerminalGrayscale,
    Origami,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown D2 theme id {0}")]
pub struct UnknownThemeError(pub i64);

impl Theme {
    pub const ALL: [Theme; 19] = [
        Theme::NeutralDefault,
        Theme::NeutralGrey,
        Theme::FlagshipTerrastruct,
        Theme::CoolClassics,
        Theme::MixedBerryBlue,
        Theme::GrapeSoda,
        Theme::Aubergine,
        Theme::ColorblindClear,
        Theme::VanillaNitroCola,
        Theme::OrangeCreamsicle,
        Theme::ShirleyTemple,
        Theme::EarthTones,
        Theme::EvergladeGreen,
        Theme::ButteredToast,
        Theme::DarkMauve,
        Theme::DarkFlagshipTerrastruct,
        Theme::Terminal,
        Theme::TerminalGrayscale,
        Theme::Origami,
    ];

    /// Numeric id passed to `--theme`.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::NeutralDefault => 0,
            Self::NeutralGrey => 1,
            Self::FlagshipTerrastruct => 3,
            Self::CoolClassics => 4,
            Self::MixedBerryBlue => 5,
            Self::GrapeSoda => 6,
            Self::Aubergine => 7,
            Self::ColorblindClear => 8,
            Self::VanillaNitroCola => 100,
            Self::OrangeCreamsicle => 101,
            Self::ShirleyTemple => 102,
            Self::EarthTones => 103,
            Self::EvergladeGreen => 104,
            Self::ButteredToast => 105,
            Self::DarkMauve => 200,
            Self::DarkFlagshipTerrastruct => 201,
            Self::Terminal => 300,
            Self::TerminalGrayscale => 301,
            Self::Origami => 302,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NeutralDefault => "Neutral Default",
            Self::NeutralGrey => "Neutral Grey",
            Self::FlagshipTerrastruct => "Flagship Terrastruct",
            Self::CoolClassics => "Cool Classics",
            Self::MixedBerryBlue => "Mixed Berry Blue",
            Self::GrapeSoda => "Grape Soda",
            Self::Aubergine => "Aubergine",
            Self::ColorblindClear => "Colorblind Clear",
            Self::VanillaNitroCola => "Vanilla Nitro Cola",
            Self::OrangeCreamsicle => "Orange Creamsicle",
            Self::ShirleyTemple => "Shirley Temple",
            Self::EarthTones => "Earth Tones",
            Self::EvergladeGreen => "Everglade Green",
            Self::ButteredToast => "Buttered Toast",
            Self::DarkMauve => "Dark Mauve",
            Self::DarkFlagshipTerrastruct => "Dark Flagship Terrastruct",
            Self::Terminal => "Terminal",
            Self::TerminalGrayscale => "Terminal Grayscale",
            Self::Origami => "Origami",
        }
    }

    /// Dark themes occupy the 200 range.
    #[must_use]
    pub const fn is_dark(self) -> bool {
        matches!(self, Self::DarkMauve | Self::DarkFlagshipTerrastruct)
    }

    #[must_use]
    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|theme| theme.id() == id)
    }
}

impl TryFrom<i64> for Theme {
    type Error = UnknownThemeError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(UnknownThemeError(id))
    }
}

impl From<Theme> for i64 {
    fn from(theme: Theme) -> Self {
        theme.id()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

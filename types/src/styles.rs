//! Validation table for `style.*` attributes.
//!
//! Each [`ShapeStyle`] keyword maps to a [`StyleValidator`] describing which
//! values the compiler accepts. The table follows the compiler's own style
//! handling (`d2graph`): numeric ranges are inclusive, booleans are the
//! literals `true`/`false`, and colors are hex codes or CSS color names.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeStyle {
    Opacity,
    Fill,
    FillPattern,
    Stroke,
    StrokeWidth,
    StrokeDash,
    BorderRadius,
    Font,
    FontSize,
    FontColor,
    Bold,
    Italic,
    Underline,
    TextTransform,
    Shadow,
    Multiple,
    DoubleBorder,
    ThreeD,
    Animated,
    Filled,
}

const FILL_PATTERNS: &[&str] = &["dots", "lines", "grain"];
const TEXT_TRANSFORMS: &[&str] = &["uppercase", "lowercase", "title", "none"];
const SYSTEM_FONTS: &[&str] = &["mono"];

impl ShapeStyle {
    pub const ALL: [ShapeStyle; 20] = [
        ShapeStyle::Opacity,
        ShapeStyle::Fill,
        ShapeStyle::FillPattern,
        ShapeStyle::Stroke,
        ShapeStyle::StrokeWidth,
        ShapeStyle::StrokeDash,
        ShapeStyle::BorderRadius,
        ShapeStyle::Font,
        ShapeStyle::FontSize,
        ShapeStyle::FontColor,
        ShapeStyle::Bold,
        ShapeStyle::Italic,
        ShapeStyle::Underline,
        ShapeStyle::TextTransform,
        ShapeStyle::Shadow,
        ShapeStyle::Multiple,
        ShapeStyle::DoubleBorder,
        ShapeStyle::ThreeD,
        ShapeStyle::Animated,
        ShapeStyle::Filled,
    ];

    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Opacity => "opacity",
            Self::Fill => "fill",
            Self::FillPattern => "fill-pattern",
            Self::Stroke => "stroke",
            Self::StrokeWidth => "stroke-width",
            Self::StrokeDash => "stroke-dash",
            Self::BorderRadius => "border-radius",
            Self::Font => "font",
            Self::FontSize => "font-size",
            Self::FontColor => "font-color",
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::TextTransform => "text-transform",
            Self::Shadow => "shadow",
            Self::Multiple => "multiple",
            Self::DoubleBorder => "double-border",
            Self::ThreeD => "3d",
            Self::Animated => "animated",
            Self::Filled => "filled",
        }
    }

    #[must_use]
    pub const fn validator(self) -> StyleValidator {
        match self {
            Self::Opacity => StyleValidator::FloatRange { min: 0.0, max: 1.0 },
            Self::Fill | Self::Stroke | Self::FontColor => StyleValidator::Color,
            Self::FillPattern => StyleValidator::Text(FILL_PATTERNS),
            Self::StrokeWidth => StyleValidator::IntRange { min: 0, max: 15 },
            Self::StrokeDash => StyleValidator::IntRange { min: 0, max: 10 },
            Self::BorderRadius => StyleValidator::IntRange { min: 0, max: 20 },
            Self::Font => StyleValidator::Font,
            Self::FontSize => StyleValidator::IntRange { min: 8, max: 100 },
            Self::TextTransform => StyleValidator::Text(TEXT_TRANSFORMS),
            Self::Bold
            | Self::Italic
            | Self::Underline
            | Self::Shadow
            | Self::Multiple
            | Self::DoubleBorder
            | Self::ThreeD
            | Self::Animated
            | Self::Filled => StyleValidator::Boolean,
        }
    }

    /// Styles that only make sense on connections.
    #[must_use]
    pub const fn connection_only(self) -> bool {
        matches!(self, Self::Animated | Self::Filled)
    }

    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.keyword() == keyword)
    }

    /// Validate `value` for this style, returning the user-facing message on rejection.
    pub fn check(self, value: &str) -> Result<(), String> {
        let validator = self.validator();
        if validator.accepts(value) {
            Ok(())
        } else {
            Err(validator.error_message(self.keyword()))
        }
    }
}

impl fmt::Display for ShapeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleValidator {
    FloatRange { min: f32, max: f32 },
    IntRange { min: i64, max: i64 },
    Boolean,
    Font,
    Text(&'static [&'static str]),
    Color,
}

impl StyleValidator {
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        match *self {
            Self::FloatRange { min, max } => value
                .parse::<f32>()
                .is_ok_and(|v| (min..=max).contains(&v)),
            Self::IntRange { min, max } => value
                .parse::<i64>()
                .is_ok_and(|v| (min..=max).contains(&v)),
            Self::Boolean => value == "true" || value == "false",
            Self::Font => SYSTEM_FONTS.contains(&unquote(value)),
            Self::Text(variants) => variants.contains(&unquote(value)),
            Self::Color => is_color(unquote(value)),
        }
    }

    #[must_use]
    pub fn error_message(&self, keyword: &str) -> String {
        match *self {
            Self::FloatRange { min, max } => {
                format!("Expected {keyword} to be a float between {min:.1} and {max:.1}")
            }
            Self::IntRange { min, max } => {
                format!("Expected {keyword} to be an integer between {min} and {max}")
            }
            Self::Boolean => format!("Expected {keyword} to be true or false"),
            Self::Font => format!(
                "Expected {keyword} to be a valid font: ({})",
                SYSTEM_FONTS.join(", ")
            ),
            Self::Text(variants) => {
                format!("Expected {keyword} to be one of ({})", variants.join(", "))
            }
            Self::Color => format!("Expected {keyword} to be a hex color or a CSS color name"),
        }
    }

    /// Completion candidates, when the value space is small enough to list.
    #[must_use]
    pub fn completions(&self) -> Option<&'static [&'static str]> {
        match *self {
            Self::Boolean => Some(&["true", "false"]),
            Self::Font => Some(SYSTEM_FONTS),
            Self::Text(variants) => Some(variants),
            Self::Color => Some(NAMED_COLORS),
            Self::FloatRange { .. } | Self::IntRange { .. } => None,
        }
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn is_color(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    let lower = value.to_ascii_lowercase();
    NAMED_COLORS.contains(&lower.as_str())
}

/// CSS named colors, plus `transparent`.
pub const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "transparent", "turquoise", "violet", "wheat", "white",
    "whitesmoke", "yellow", "yellowgreen",
];

//! Scene element model.
//!
//! # Responsibility
//! - Define the canonical record for clouds and birds.
//! - Synthesize randomized elements for the `add` command.
//! - Validate bounded fields before anything is adopted into a scene.
//!
//! # Invariants
//! - `id` is stable and never reused for another element.
//! - `position` axes lie in `[0, 100)`, `scale` in `[1, 2)` and
//!   `animation_delay` in `[0, 10)` seconds.
//! - Bird colors come from `BIRD_PALETTE`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every scene element.
pub type ElementId = Uuid;

/// Placement band used for freshly generated elements, in percent.
const SPAWN_X_RANGE: std::ops::Range<u32> = 5..85;
const SPAWN_Y_RANGE: std::ops::Range<u32> = 5..75;

const POSITION_MAX: f64 = 100.0;
const SCALE_MIN: f64 = 1.0;
const SCALE_MAX: f64 = 2.0;
const ANIMATION_DELAY_MAX: f64 = 10.0;

/// Named bird color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub name: &'static str,
    pub hex: &'static str,
}

/// Fixed bird palette.
pub const BIRD_PALETTE: &[PaletteColor] = &[
    PaletteColor {
        name: "Bright Blue",
        hex: "#1EAEDB",
    },
    PaletteColor {
        name: "Vivid Purple",
        hex: "#8B5CF6",
    },
    PaletteColor {
        name: "Magenta Pink",
        hex: "#D946EF",
    },
    PaletteColor {
        name: "Bright Orange",
        hex: "#F97316",
    },
    PaletteColor {
        name: "Ocean Blue",
        hex: "#0EA5E9",
    },
    PaletteColor {
        name: "Green",
        hex: "#22C55E",
    },
    PaletteColor {
        name: "Red",
        hex: "#EF4444",
    },
    PaletteColor {
        name: "Yellow",
        hex: "#FACC15",
    },
    PaletteColor {
        name: "Cyan",
        hex: "#06B6D4",
    },
];

/// Looks up a palette entry by hex value (case-insensitive).
pub fn palette_color(hex: &str) -> Option<&'static PaletteColor> {
    BIRD_PALETTE
        .iter()
        .find(|color| color.hex.eq_ignore_ascii_case(hex.trim()))
}

/// Closed set of element categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bird,
    Cloud,
}

impl Category {
    /// Every category, in merge order.
    pub const ALL: [Category; 2] = [Category::Bird, Category::Cloud];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bird => "bird",
            Self::Cloud => "cloud",
        }
    }

    /// Collection key used in remote save bodies.
    pub fn plural_key(self) -> &'static str {
        match self {
            Self::Bird => "birds",
            Self::Cloud => "clouds",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudSize {
    Small,
    Medium,
    Large,
}

impl CloudSize {
    pub const ALL: [CloudSize; 3] = [CloudSize::Small, CloudSize::Medium, CloudSize::Large];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

/// Percentage placement on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Category-specific payload.
///
/// Serialized inline with the element, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementPayload {
    Bird {
        /// Hex value from `BIRD_PALETTE`.
        color: String,
    },
    Cloud {
        #[serde(rename = "cloudSize")]
        cloud_size: CloudSize,
    },
}

impl ElementPayload {
    pub fn category(&self) -> Category {
        match self {
            Self::Bird { .. } => Category::Bird,
            Self::Cloud { .. } => Category::Cloud,
        }
    }
}

/// Canonical record for one cloud or bird on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneElement {
    pub id: ElementId,
    pub position: Position,
    /// Serialized as `size` to match the external schema.
    #[serde(rename = "size")]
    pub scale: f64,
    /// Seconds; serialized as a CSS duration such as `"2.5s"`.
    #[serde(with = "css_seconds")]
    pub animation_delay: f64,
    #[serde(flatten)]
    pub payload: ElementPayload,
}

impl SceneElement {
    /// Synthesizes a new element with a fresh id and random appearance.
    pub fn random<R: Rng + ?Sized>(category: Category, rng: &mut R) -> Self {
        let payload = match category {
            Category::Bird => ElementPayload::Bird {
                color: BIRD_PALETTE[rng.gen_range(0..BIRD_PALETTE.len())]
                    .hex
                    .to_string(),
            },
            Category::Cloud => ElementPayload::Cloud {
                cloud_size: CloudSize::ALL[rng.gen_range(0..CloudSize::ALL.len())],
            },
        };

        Self {
            id: Uuid::new_v4(),
            position: Position {
                x: f64::from(rng.gen_range(SPAWN_X_RANGE)),
                y: f64::from(rng.gen_range(SPAWN_Y_RANGE)),
            },
            scale: rng.gen_range(SCALE_MIN..SCALE_MAX),
            animation_delay: rng.gen_range(0.0..ANIMATION_DELAY_MAX),
            payload,
        }
    }

    pub fn category(&self) -> Category {
        self.payload.category()
    }

    /// Validates bounded fields and the variant payload.
    pub fn validate(&self) -> Result<(), ElementValidationError> {
        for (axis, value) in [('x', self.position.x), ('y', self.position.y)] {
            if !(0.0..POSITION_MAX).contains(&value) {
                return Err(ElementValidationError::PositionOutOfRange { axis, value });
            }
        }
        if !(SCALE_MIN..SCALE_MAX).contains(&self.scale) {
            return Err(ElementValidationError::ScaleOutOfRange(self.scale));
        }
        if !(0.0..ANIMATION_DELAY_MAX).contains(&self.animation_delay) {
            return Err(ElementValidationError::AnimationDelayOutOfRange(
                self.animation_delay,
            ));
        }
        if let ElementPayload::Bird { color } = &self.payload {
            if palette_color(color).is_none() {
                return Err(ElementValidationError::UnknownBirdColor(color.clone()));
            }
        }
        Ok(())
    }
}

/// Validation failure for one element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValidationError {
    PositionOutOfRange { axis: char, value: f64 },
    ScaleOutOfRange(f64),
    AnimationDelayOutOfRange(f64),
    UnknownBirdColor(String),
}

impl Display for ElementValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PositionOutOfRange { axis, value } => {
                write!(f, "position.{axis} must be in [0, 100), got {value}")
            }
            Self::ScaleOutOfRange(value) => write!(f, "size must be in [1, 2), got {value}"),
            Self::AnimationDelayOutOfRange(value) => {
                write!(f, "animationDelay must be in [0s, 10s), got {value}s")
            }
            Self::UnknownBirdColor(value) => write!(f, "bird color `{value}` is not in the palette"),
        }
    }
}

impl Error for ElementValidationError {}

mod css_seconds {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDelay {
        Seconds(f64),
        Css(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value}s"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match RawDelay::deserialize(deserializer)? {
            RawDelay::Seconds(value) => Ok(value),
            RawDelay::Css(text) => {
                let trimmed = text.trim();
                let number = trimmed.strip_suffix('s').unwrap_or(trimmed);
                number
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| D::Error::custom(format!("invalid css duration `{text}`")))
            }
        }
    }
}

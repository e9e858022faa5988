use serde::{Deserialize, Serialize};

/// RGB color, serialized as `[r, g, b]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}

/// Per-layer palette used when the configuration does not provide one.
pub const DEFAULT_PALETTE: [Color; 6] = [
    Color::new(255, 100, 100),
    Color::new(255, 180, 80),
    Color::new(255, 255, 100),
    Color::new(100, 255, 100),
    Color::new(100, 200, 255),
    Color::new(180, 100, 255),
];

pub fn default_palette() -> Vec<Color> {
    DEFAULT_PALETTE.to_vec()
}

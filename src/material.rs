//! Materials and per-variant palettes.
//!
//! Palettes are fixed, ordered and shared read-only by every instance of a
//! variant. The only mutable material state is an instance's
//! [`MaterialCycle`], which advances atomically: the new index and the entry
//! to display come out of a single call.

use std::sync::Arc;

use serde::Serialize;

/// A named surface colour for the lit mesh shader.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StandardMaterial {
    pub name: String,
    /// sRGB colour as authored (`0xRRGGBB`).
    pub hex: u32,
    pub roughness: f32,
    pub metalness: f32,
}

impl StandardMaterial {
    pub fn from_hex(name: impl Into<String>, hex: u32) -> Self {
        Self {
            name: name.into(),
            hex,
            roughness: 1.0,
            metalness: 0.0,
        }
    }

    /// Colour in sRGB space, 0-1.
    pub fn srgb(&self) -> [f32; 3] {
        [
            ((self.hex >> 16) & 0xff) as f32 / 255.0,
            ((self.hex >> 8) & 0xff) as f32 / 255.0,
            (self.hex & 0xff) as f32 / 255.0,
        ]
    }

    /// Colour in linear space for shading.
    pub fn linear(&self) -> [f32; 3] {
        self.srgb().map(srgb_to_linear)
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Material for the particle point cloud.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PointsMaterial {
    /// Point size in world units.
    pub size: f32,
    pub vertex_colors: bool,
    pub transparent: bool,
    pub opacity: f32,
}

impl Default for PointsMaterial {
    fn default() -> Self {
        Self {
            size: 0.2,
            vertex_colors: true,
            transparent: true,
            opacity: 0.8,
        }
    }
}

/// How a palette index moves on each click.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CycleRule {
    /// index + 1, wrapping at the palette length.
    Increment,
    /// 0 ↔ 1.
    Toggle,
}

/// Ordered, fixed list of materials for one model variant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MaterialPalette {
    entries: Vec<StandardMaterial>,
    rule: CycleRule,
}

impl MaterialPalette {
    /// Create a palette. An empty list is replaced by a single white entry so
    /// every index computation stays valid.
    pub fn new(entries: Vec<StandardMaterial>, rule: CycleRule) -> Self {
        let entries = if entries.is_empty() {
            vec![StandardMaterial::from_hex("white", 0xffffff)]
        } else {
            entries
        };
        Self { entries, rule }
    }

    /// Light blue, yellow, gold.
    pub fn primary() -> Self {
        Self::new(
            vec![
                StandardMaterial::from_hex("light_blue", 0x38bdf8),
                StandardMaterial::from_hex("yellow", 0xfacc15),
                StandardMaterial::from_hex("gold", 0xca8a04),
            ],
            CycleRule::Increment,
        )
    }

    /// White, red.
    pub fn secondary() -> Self {
        Self::new(
            vec![
                StandardMaterial::from_hex("white", 0xffffff),
                StandardMaterial::from_hex("red", 0xff0000),
            ],
            CycleRule::Toggle,
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rule(&self) -> CycleRule {
        self.rule
    }

    /// Entry at `index`, wrapping at the palette length.
    pub fn get(&self, index: usize) -> &StandardMaterial {
        &self.entries[index % self.entries.len()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &StandardMaterial> {
        self.entries.iter()
    }

    /// The index that follows `index` under this palette's rule.
    pub fn next_index(&self, index: usize) -> usize {
        match self.rule {
            CycleRule::Increment => (index + 1) % self.entries.len(),
            CycleRule::Toggle => {
                if index % 2 == 0 {
                    1 % self.entries.len()
                } else {
                    0
                }
            }
        }
    }
}

/// An instance's current position in its palette.
#[derive(Clone, Debug)]
pub struct MaterialCycle {
    palette: Arc<MaterialPalette>,
    index: usize,
}

impl MaterialCycle {
    pub fn new(palette: Arc<MaterialPalette>, initial_index: usize) -> Self {
        let index = initial_index % palette.len();
        Self { palette, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The material currently displayed.
    pub fn current(&self) -> &StandardMaterial {
        self.palette.get(self.index)
    }

    pub fn palette(&self) -> &Arc<MaterialPalette> {
        &self.palette
    }

    /// Move to the next index and return it together with the material to
    /// display. Reading and writing the index happen in this one call.
    pub fn advance(&mut self) -> (usize, &StandardMaterial) {
        self.index = self.palette.next_index(self.index);
        (self.index, self.palette.get(self.index))
    }
}

use smallvec::SmallVec;

use crate::foundation::core::PixelRect;
use crate::foundation::error::{TileRenderError, TileRenderResult};

/// Name given to the layer synthesized when configuration defines none.
pub const DEFAULT_LAYER_NAME: &str = "RenderLayer";

/// Channels of the combined RGBA accumulation buffer every layer carries.
pub const COMBINED_CHANNELS: usize = 4;

/// Kind tag of an auxiliary render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Depth,
    Vector,
    Normal,
    Color,
    Diffuse,
    Specular,
    Shadow,
    AmbientOcclusion,
    Reflection,
}

impl PassKind {
    pub const ALL: [PassKind; 9] = [
        PassKind::Depth,
        PassKind::Vector,
        PassKind::Normal,
        PassKind::Color,
        PassKind::Diffuse,
        PassKind::Specular,
        PassKind::Shadow,
        PassKind::AmbientOcclusion,
        PassKind::Reflection,
    ];

    /// Float channels stored per pixel for this pass.
    pub fn channels(self) -> usize {
        match self {
            PassKind::Depth => 1,
            PassKind::Normal
            | PassKind::Diffuse
            | PassKind::Specular
            | PassKind::Shadow
            | PassKind::AmbientOcclusion
            | PassKind::Reflection => 3,
            PassKind::Vector | PassKind::Color => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PassKind::Depth => "Depth",
            PassKind::Vector => "Vector",
            PassKind::Normal => "Normal",
            PassKind::Color => "Color",
            PassKind::Diffuse => "Diffuse",
            PassKind::Specular => "Specular",
            PassKind::Shadow => "Shadow",
            PassKind::AmbientOcclusion => "AO",
            PassKind::Reflection => "Reflection",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of enabled pass kinds on a layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PassFlags(u16);

impl PassFlags {
    pub fn from_kinds(kinds: &[PassKind]) -> Self {
        Self(kinds.iter().fold(0, |acc, k| acc | k.bit()))
    }

    pub fn contains(self, kind: PassKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Enabled kinds in canonical order.
    pub fn iter(self) -> impl Iterator<Item = PassKind> {
        PassKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

/// Configured description of one compositing layer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LayerConfig {
    pub name: String,
    #[serde(default = "all_visible")]
    pub visible_mask: u32,
    #[serde(default)]
    pub passes: Vec<PassKind>,
}

fn all_visible() -> u32 {
    u32::MAX
}

impl LayerConfig {
    pub fn new(name: impl Into<String>, passes: &[PassKind]) -> Self {
        Self {
            name: name.into(),
            visible_mask: u32::MAX,
            passes: passes.to_vec(),
        }
    }
}

/// Layer structure shared by the full result and every tile result of one render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultLayout {
    layers: Vec<LayerConfig>,
}

impl ResultLayout {
    /// Build a layout; an empty layer list yields the single default combined layer.
    pub fn new(layers: &[LayerConfig]) -> Self {
        if layers.is_empty() {
            return Self {
                layers: vec![LayerConfig::new(DEFAULT_LAYER_NAME, &[])],
            };
        }
        Self {
            layers: layers.to_vec(),
        }
    }

    pub fn layers(&self) -> &[LayerConfig] {
        &self.layers
    }

    /// Floats per pixel summed across every layer buffer.
    pub fn floats_per_pixel(&self) -> usize {
        self.layers
            .iter()
            .map(|l| {
                COMBINED_CHANNELS
                    + PassFlags::from_kinds(&l.passes)
                        .iter()
                        .map(PassKind::channels)
                        .sum::<usize>()
            })
            .sum()
    }
}

/// Float buffer for one auxiliary pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPass {
    pub kind: PassKind,
    pub data: Vec<f32>,
}

impl RenderPass {
    pub fn channels(&self) -> usize {
        self.kind.channels()
    }
}

/// One compositing layer: a combined RGBA buffer plus its enabled passes.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderLayer {
    pub name: String,
    pub visible_mask: u32,
    pub enabled: PassFlags,
    pub combined: Vec<f32>,
    pub passes: SmallVec<[RenderPass; 4]>,
}

impl RenderLayer {
    pub fn pass(&self, kind: PassKind) -> Option<&RenderPass> {
        self.passes.iter().find(|p| p.kind == kind)
    }

    pub fn pass_mut(&mut self, kind: PassKind) -> Option<&mut RenderPass> {
        self.passes.iter_mut().find(|p| p.kind == kind)
    }

    /// Every channel buffer of this layer with its channel count, combined first.
    pub fn buffers(&self) -> impl Iterator<Item = (usize, &[f32])> {
        std::iter::once((COMBINED_CHANNELS, self.combined.as_slice()))
            .chain(self.passes.iter().map(|p| (p.channels(), p.data.as_slice())))
    }

    pub fn buffers_mut(&mut self) -> impl Iterator<Item = (usize, &mut Vec<f32>)> {
        std::iter::once((COMBINED_CHANNELS, &mut self.combined)).chain(
            self.passes
                .iter_mut()
                .map(|p| (p.kind.channels(), &mut p.data)),
        )
    }
}

/// Pixel data for one rendered region: the full image or a single in-flight tile.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderResult {
    pub width: u32,
    pub height: u32,
    /// Placement of this buffer. For tiles: relative to the full result, crop included.
    pub tile_rect: PixelRect,
    /// Extra pixels on every edge rendered for filter overlap, stripped before merge.
    pub crop: u32,
    pub layers: Vec<RenderLayer>,
}

impl RenderResult {
    /// Allocate zeroed buffers covering `rect` for every layer of `layout`.
    pub fn new(layout: &ResultLayout, rect: PixelRect, crop: u32) -> TileRenderResult<Self> {
        if rect.is_empty() {
            return Err(TileRenderError::evaluation(
                "render result rectangle must be non-empty",
            ));
        }
        let width = rect.width() as u32;
        let height = rect.height() as u32;
        let px = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| TileRenderError::evaluation("render result size overflow"))?;

        let layers = layout
            .layers()
            .iter()
            .map(|cfg| {
                let enabled = PassFlags::from_kinds(&cfg.passes);
                RenderLayer {
                    name: cfg.name.clone(),
                    visible_mask: cfg.visible_mask,
                    enabled,
                    combined: vec![0.0; px * COMBINED_CHANNELS],
                    passes: enabled
                        .iter()
                        .map(|kind| RenderPass {
                            kind,
                            data: vec![0.0; px * kind.channels()],
                        })
                        .collect(),
                }
            })
            .collect();

        Ok(Self {
            width,
            height,
            tile_rect: rect,
            crop,
            layers,
        })
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Bytes held by all channel buffers.
    pub fn byte_len(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|l| l.buffers())
            .map(|(_, b)| b.len() * std::mem::size_of::<f32>())
            .sum()
    }

    pub fn layer(&self, name: &str) -> Option<&RenderLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut RenderLayer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    /// The first layer; always present.
    pub fn primary_layer(&self) -> &RenderLayer {
        &self.layers[0]
    }

    /// Combined RGBA of the primary layer at buffer coordinates `(x, y)`.
    pub fn combined_pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + x as usize) * COMBINED_CHANNELS;
        let c = &self.primary_layer().combined;
        Some([c[i], c[i + 1], c[i + 2], c[i + 3]])
    }

    /// Zero every buffer and re-home the result at `rect` (same size) for reuse.
    pub fn reset(&mut self, rect: PixelRect, crop: u32) {
        debug_assert_eq!(rect.width() as u32, self.width);
        debug_assert_eq!(rect.height() as u32, self.height);
        self.tile_rect = rect;
        self.crop = crop;
        for layer in &mut self.layers {
            for (_, buf) in layer.buffers_mut() {
                buf.fill(0.0);
            }
        }
    }

    /// Same layer and pass structure as `other`, regardless of size.
    pub fn same_structure(&self, other: &RenderResult) -> bool {
        self.layers.len() == other.layers.len()
            && self.layers.iter().zip(&other.layers).all(|(a, b)| {
                a.name == b.name
                    && a.enabled == b.enabled
                    && a.passes.len() == b.passes.len()
            })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/result/model.rs"]
mod tests;

use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::foundation::math::{gamma_decode, gamma_encode};
use crate::result::model::{COMBINED_CHANNELS, RenderResult};

/// Alpha below which a combined pixel counts as empty for key blending.
pub const KEY_ALPHA_EPS: f32 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlurOptions {
    /// Blend combined colour in gamma-decoded space.
    pub gamma: bool,
    /// Alpha-keyed blending of the combined buffer.
    pub key_alpha: bool,
}

/// Equal-weight running average of sub-frame renders.
#[derive(Debug)]
pub struct BlurAccumulator {
    opts: BlurOptions,
    acc: Option<RenderResult>,
    samples: u32,
}

impl BlurAccumulator {
    pub fn new(opts: BlurOptions) -> Self {
        Self {
            opts,
            acc: None,
            samples: 0,
        }
    }

    /// Sub-frames accumulated so far.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn current(&self) -> Option<&RenderResult> {
        self.acc.as_ref()
    }

    /// Fold one sub-frame in. The first sample becomes the accumulator as is.
    pub fn add_sample(&mut self, sample: RenderResult) -> TileRenderResult<()> {
        let Some(acc) = self.acc.as_mut() else {
            self.acc = Some(sample);
            self.samples = 1;
            return Ok(());
        };
        if !acc.same_structure(&sample) || acc.width != sample.width || acc.height != sample.height
        {
            return Err(TileRenderError::evaluation(
                "blur sample does not match the accumulated result",
            ));
        }
        self.samples += 1;
        let fac = 1.0 / self.samples as f32;
        for (dst, src) in acc.layers.iter_mut().zip(&sample.layers) {
            if self.opts.key_alpha {
                blend_key(&mut dst.combined, &src.combined, fac, self.opts.gamma);
            } else {
                blend_combined(&mut dst.combined, &src.combined, fac, self.opts.gamma);
            }
            for (d, s) in dst.passes.iter_mut().zip(&src.passes) {
                blend_plain(&mut d.data, &s.data, fac);
            }
        }
        Ok(())
    }

    /// The accumulated result, `None` if no sample was added.
    pub fn finish(self) -> Option<RenderResult> {
        self.acc
    }
}

#[inline]
fn mix(a: f32, b: f32, fac: f32) -> f32 {
    (1.0 - fac) * a + fac * b
}

fn blend_plain(acc: &mut [f32], new: &[f32], fac: f32) {
    for (a, &b) in acc.iter_mut().zip(new) {
        if a.to_bits() != b.to_bits() {
            *a = mix(*a, b, fac);
        }
    }
}

fn blend_combined(acc: &mut [f32], new: &[f32], fac: f32, gamma: bool) {
    if !gamma {
        blend_plain(acc, new, fac);
        return;
    }
    for (a, b) in acc
        .chunks_exact_mut(COMBINED_CHANNELS)
        .zip(new.chunks_exact(COMBINED_CHANNELS))
    {
        for c in 0..3 {
            if a[c].to_bits() != b[c].to_bits() {
                a[c] = gamma_encode(mix(gamma_decode(a[c]), gamma_decode(b[c]), fac));
            }
        }
        if a[3].to_bits() != b[3].to_bits() {
            a[3] = mix(a[3], b[3], fac);
        }
    }
}

fn blend_key(acc: &mut [f32], new: &[f32], fac: f32, gamma: bool) {
    let (dec, enc): (fn(f32) -> f32, fn(f32) -> f32) = if gamma {
        (gamma_decode, gamma_encode)
    } else {
        (std::convert::identity, std::convert::identity)
    };
    for (a, b) in acc
        .chunks_exact_mut(COMBINED_CHANNELS)
        .zip(new.chunks_exact(COMBINED_CHANNELS))
    {
        if a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()) {
            continue;
        }
        if b[3] < KEY_ALPHA_EPS {
            a[3] *= 1.0 - fac;
        } else if a[3] < KEY_ALPHA_EPS {
            a[..3].copy_from_slice(&b[..3]);
            a[3] = fac * b[3];
        } else {
            for c in 0..3 {
                a[c] = enc(mix(dec(a[c]), dec(b[c]), fac));
            }
            a[3] = mix(a[3], b[3], fac);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/accumulate/blur.rs"]
mod tests;

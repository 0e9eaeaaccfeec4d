use crate::data::observation::ObservationSet;
use crate::engine::context::RenderContext;
use crate::foundation::core::{FrameF32, ImageSize};
use crate::foundation::error::{FitError, FitResult};
use crate::foundation::math::bilinear;
use crate::scene::list::ModelList;
use crate::scene::model::{Model, ModelKind};
use crate::scene::shader::Shader;
use anyhow::Context as _;
use kurbo::{Affine, Point};
use rayon::prelude::*;
use std::path::Path;

/// Options for [`RasterContext`].
#[derive(Clone, Copy, Debug)]
pub struct RasterOpts {
    /// Angular size of one pixel, in the same units as model positions and sizes (mas).
    pub scale: f64,
}

impl Default for RasterOpts {
    fn default() -> Self {
        Self { scale: 0.1 }
    }
}

/// Software render context.
///
/// Renders every model of the scene additively into a single-channel back buffer. Sky coordinates
/// have `x` growing with the column index and `y` growing upward; the image center sits at the sky
/// origin.
pub struct RasterContext {
    opts: RasterOpts,
    back: FrameF32,
    front: FrameF32,
    sets: Vec<ObservationSet>,
    frames_presented: u64,
}

impl RasterContext {
    pub fn new(opts: RasterOpts) -> FitResult<Self> {
        if !(opts.scale.is_finite() && opts.scale > 0.0) {
            return Err(FitError::validation("pixel scale must be finite and > 0"));
        }
        let size = ImageSize::default();
        Ok(Self {
            opts,
            back: FrameF32::zeroed(size),
            front: FrameF32::zeroed(size),
            sets: Vec::new(),
            frames_presented: 0,
        })
    }

    pub fn size(&self) -> ImageSize {
        self.back.size
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn pixel_to_sky(&self) -> Affine {
        let s = self.opts.scale;
        let cx = (f64::from(self.back.size.width) - 1.0) / 2.0;
        let cy = (f64::from(self.back.size.height) - 1.0) / 2.0;
        Affine::new([s, 0.0, 0.0, -s, -cx * s, cy * s])
    }

    fn set(&self, set: usize) -> FitResult<&ObservationSet> {
        self.sets.get(set).ok_or_else(|| {
            FitError::validation(format!(
                "data set {set} out of range ({} loaded)",
                self.sets.len()
            ))
        })
    }

    fn sample(&self, set: usize) -> FitResult<impl Iterator<Item = (f64, f64, f64)> + '_> {
        let s = self.set(set)?;
        let to_pixel = self.pixel_to_sky().inverse();
        let w = self.back.size.width as usize;
        let h = self.back.size.height as usize;
        Ok(s.points.iter().map(move |p| {
            let px = to_pixel * Point::new(p.x, p.y);
            let sim = bilinear(&self.back.data, w, h, px.x, px.y);
            (sim, p.value, p.error)
        }))
    }
}

enum Shape {
    /// Limb-darkened sphere or flat disk of the given radius.
    Disk { radius: f64 },
    Gaussian { two_sigma_sq: f64 },
}

struct Footprint<'a> {
    to_local: Affine,
    shape: Shape,
    shader: Option<&'a Shader>,
}

impl<'a> Footprint<'a> {
    fn new(model: &'a Model, time: f64, pixel_to_sky: Affine) -> Self {
        let p = |n: &str| model.params().value(n).unwrap_or(0.0);
        let (x, y, _) = model.position().xyz(time);
        let squash = match model.kind() {
            // A sphere's outline does not depend on inclination.
            ModelKind::Sphere => 1.0,
            ModelKind::UniformDisk | ModelKind::Gaussian => {
                p("inclination").to_radians().cos().abs().max(1e-3)
            }
        };
        let to_local = Affine::scale_non_uniform(1.0, 1.0 / squash)
            * Affine::rotate(-p("position_angle").to_radians())
            * Affine::translate((-x, -y))
            * pixel_to_sky;
        let shape = match model.kind() {
            ModelKind::Sphere | ModelKind::UniformDisk => Shape::Disk {
                radius: model.size() / 2.0,
            },
            ModelKind::Gaussian => {
                let sigma = model.size() / (2.0 * (2.0 * std::f64::consts::LN_2).sqrt());
                Shape::Gaussian {
                    two_sigma_sq: 2.0 * sigma * sigma,
                }
            }
        };
        Self {
            to_local,
            shape,
            shader: model.shader(),
        }
    }

    fn intensity(&self, pixel: Point) -> f64 {
        let local = self.to_local * pixel;
        let r_sq = local.x * local.x + local.y * local.y;
        match self.shape {
            Shape::Disk { radius } => {
                let rho_sq = r_sq / (radius * radius);
                if rho_sq >= 1.0 {
                    return 0.0;
                }
                let mu = (1.0 - rho_sq).sqrt();
                self.shader.map_or(1.0, |s| s.intensity(mu))
            }
            Shape::Gaussian { two_sigma_sq } => (-r_sq / two_sigma_sq).exp(),
        }
    }
}

impl RenderContext for RasterContext {
    fn resize(&mut self, size: ImageSize) -> FitResult<()> {
        if size.width == 0 || size.height == 0 {
            return Err(FitError::validation("image size must be non-zero"));
        }
        self.back = FrameF32::zeroed(size);
        self.front = FrameF32::zeroed(size);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(models = scene.len()))]
    fn render(&mut self, scene: &ModelList) -> FitResult<()> {
        let pixel_to_sky = self.pixel_to_sky();
        let footprints: Vec<Footprint<'_>> = scene
            .iter()
            .map(|m| Footprint::new(m, scene.time(), pixel_to_sky))
            .collect();
        let width = self.back.size.width as usize;
        self.back
            .data
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, line)| {
                for (col, px) in line.iter_mut().enumerate() {
                    let at = Point::new(col as f64, row as f64);
                    *px = footprints.iter().map(|f| f.intensity(at)).sum::<f64>() as f32;
                }
            });
        Ok(())
    }

    fn present(&mut self) -> FitResult<()> {
        if self.front.size != self.back.size {
            return Err(FitError::context("front and back buffers disagree in size"));
        }
        self.front.data.copy_from_slice(&self.back.data);
        self.frames_presented += 1;
        Ok(())
    }

    fn load_data(&mut self, sets: Vec<ObservationSet>) -> FitResult<usize> {
        let n = sets.len();
        self.sets.extend(sets);
        tracing::debug!(added = n, total = self.sets.len(), "observation sets loaded");
        Ok(n)
    }

    fn replace_data(&mut self, set: usize, data: ObservationSet) -> FitResult<()> {
        self.set(set)?;
        self.sets[set] = data;
        Ok(())
    }

    fn remove_data(&mut self, set: usize) -> FitResult<()> {
        self.set(set)?;
        self.sets.remove(set);
        Ok(())
    }

    fn data_sets(&self) -> usize {
        self.sets.len()
    }

    fn ave_time(&self, set: usize) -> FitResult<f64> {
        Ok(self.set(set)?.time)
    }

    fn allocated(&self, set: usize) -> usize {
        self.sets.get(set).map_or(0, ObservationSet::len)
    }

    fn residuals(&mut self, set: usize, out: &mut [f64]) -> FitResult<()> {
        let n = self.allocated(set);
        if out.len() != n {
            return Err(FitError::validation(format!(
                "residual buffer holds {} values, set {set} needs {n}",
                out.len()
            )));
        }
        for (o, (sim, value, error)) in out.iter_mut().zip(self.sample(set)?) {
            *o = (sim - value) / error;
        }
        Ok(())
    }

    fn log_like(&mut self, set: usize) -> FitResult<f64> {
        let ln_two_pi = (2.0 * std::f64::consts::PI).ln();
        let sum: f64 = self
            .sample(set)?
            .map(|(sim, value, error)| {
                let r = (sim - value) / error;
                r * r + ln_two_pi + 2.0 * error.ln()
            })
            .sum();
        Ok(-0.5 * sum)
    }

    fn flux(&mut self) -> FitResult<f64> {
        Ok(self.back.sum())
    }

    fn copy_image(&mut self) -> FitResult<FrameF32> {
        Ok(self.front.clone())
    }

    fn save_image(&mut self, path: &Path) -> FitResult<()> {
        let peak = self.front.max();
        let gain = if peak > 0.0 { 255.0 / peak } else { 0.0 };
        let bytes: Vec<u8> = self
            .front
            .data
            .iter()
            .map(|v| (v * gain).round().clamp(0.0, 255.0) as u8)
            .collect();
        image::save_buffer_with_format(
            path,
            &bytes,
            self.front.size.width,
            self.front.size.height,
            image::ColorType::L8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }

    fn simulated(&mut self, set: usize) -> FitResult<Vec<f64>> {
        Ok(self.sample(set)?.map(|(sim, _, _)| sim).collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;

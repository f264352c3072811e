//! Screen-space ambient occlusion.
//!
//! Runs after the main pass using only the depth buffer:
//!
//! 1. reconstruct each pixel's world position through the inverse
//!    view-projection and move it to view space
//! 2. estimate the normal from neighbouring positions
//! 3. scatter a hemisphere kernel around the point, rotated per pixel by a
//!    tiled noise texture, and count samples hidden behind stored depth
//! 4. box-blur the occlusion separably
//! 5. darken every pixel by `ambient · (1 - ao)`
//!
//! Kernel and noise come from a seeded [`StdRng`], so output is reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::colors::Color;
use crate::config::SsaoConfig;
use crate::math::mat4::Mat4;
use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;
use crate::render::framebuffer::FrameBuffers;
use crate::render::rasterizer::edgefunction::ndc_to_screen;

/// Camera matrices the pass reprojects with.
#[derive(Clone, Copy, Debug)]
pub struct SsaoView {
    pub view: Mat4,
    pub projection: Mat4,
}

/// Hemisphere kernel and rotation noise for one configuration.
#[derive(Clone, Debug)]
pub struct SsaoKernel {
    samples: Vec<Vec3>,
    noise: Vec<Vec3>,
    noise_size: usize,
}

impl SsaoKernel {
    pub fn new(config: &SsaoConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let count = config.kernel_size.max(1);

        let samples = (0..count)
            .map(|i| {
                let dir = Vec3::new(
                    rng.random_range(-1.0..=1.0),
                    rng.random_range(-1.0..=1.0),
                    rng.random_range(0.0..=1.0),
                )
                .normalize();
                // Bias samples toward the origin.
                let t = i as f32 / count as f32;
                let scale = 0.1 + 0.9 * t * t;
                dir * (rng.random_range(0.0..=1.0) * scale)
            })
            .collect();

        let noise_size = config.noise_size.max(1);
        let noise = (0..noise_size * noise_size)
            .map(|_| {
                Vec3::new(rng.random_range(-1.0..=1.0), rng.random_range(-1.0..=1.0), 0.0)
            })
            .collect();

        Self {
            samples,
            noise,
            noise_size,
        }
    }

    /// Tangent-space samples with `z >= 0`, inside the unit sphere.
    pub fn samples(&self) -> &[Vec3] {
        &self.samples
    }

    fn noise_at(&self, x: usize, y: usize) -> Vec3 {
        self.noise[(y % self.noise_size) * self.noise_size + x % self.noise_size]
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// View-space positions reconstructed from a depth buffer. Background pixels
/// (infinite depth) are `None`.
pub fn reconstruct_positions(depth: &[f32], width: u32, height: u32, view: &SsaoView) -> Vec<Option<Vec3>> {
    let inverse_vp = (view.projection * view.view).inverse_or_identity();
    let (w, h) = (width as f32, height as f32);

    depth
        .par_iter()
        .enumerate()
        .map(|(i, &d)| {
            if !d.is_finite() {
                return None;
            }
            let (x, y) = (i % width as usize, i / width as usize);
            let ndc = Vec4::new(
                (x as f32 + 0.5) / w * 2.0 - 1.0,
                1.0 - (y as f32 + 0.5) / h * 2.0,
                d * 2.0 - 1.0,
                1.0,
            );
            let world = (inverse_vp * ndc).perspective_divide();
            Some(view.view.transform_point(world))
        })
        .collect()
}

/// Normal from finite differences, facing the camera. Falls back to the
/// opposite neighbour at borders and depth discontinuities to background.
fn estimate_normal(positions: &[Option<Vec3>], width: usize, height: usize, x: usize, y: usize) -> Option<Vec3> {
    let at = |x: usize, y: usize| positions[y * width + x];
    let p = at(x, y)?;

    let dx = match (x + 1 < width).then(|| at(x + 1, y)).flatten() {
        Some(right) => right - p,
        None => p - (x > 0).then(|| at(x - 1, y)).flatten()?,
    };
    let dy = match (y + 1 < height).then(|| at(x, y + 1)).flatten() {
        Some(down) => down - p,
        None => p - (y > 0).then(|| at(x, y - 1)).flatten()?,
    };

    let n = dx.cross(dy).normalize();
    if n.length_squared() == 0.0 {
        return None;
    }
    // The camera sits at the view-space origin.
    Some(if n.dot(-p) < 0.0 { -n } else { n })
}

/// Raw ambient visibility per pixel: 1 is unoccluded, 0 fully occluded.
pub fn compute_occlusion(
    depth: &[f32],
    width: u32,
    height: u32,
    view: &SsaoView,
    kernel: &SsaoKernel,
    config: &SsaoConfig,
) -> Vec<f32> {
    let positions = reconstruct_positions(depth, width, height, view);
    let (w, h) = (width as usize, height as usize);
    let sample_count = kernel.samples.len() as f32;

    (0..w * h)
        .into_par_iter()
        .map(|i| {
            let (x, y) = (i % w, i / w);
            let (Some(p), Some(normal)) = (positions[i], estimate_normal(&positions, w, h, x, y)) else {
                return 1.0;
            };

            let random = kernel.noise_at(x, y);
            let mut tangent = random - normal * random.dot(normal);
            if tangent.length_squared() < 1e-8 {
                tangent = normal.cross(if normal.x.abs() < 0.9 { Vec3::RIGHT } else { Vec3::UP });
            }
            let tangent = tangent.normalize();
            let bitangent = normal.cross(tangent);

            let mut occlusion = 0.0;
            for s in &kernel.samples {
                let offset = tangent * s.x + bitangent * s.y + normal * s.z;
                let sample = p + offset * config.radius;

                let clip = view.projection * Vec4::point(sample);
                if clip.w <= 0.0 {
                    continue;
                }
                let ndc = clip.perspective_divide();
                let (sx, sy) = ndc_to_screen(ndc.x, ndc.y, width, height);
                if sx < 0.0 || sy < 0.0 || sx >= width as f32 || sy >= height as f32 {
                    continue;
                }
                let Some(scene) = positions[sy as usize * w + sx as usize] else {
                    continue;
                };

                // View space looks down -Z: larger z is closer.
                if scene.z >= sample.z + config.bias {
                    let range = smoothstep(0.0, 1.0, config.radius / (p.z - scene.z).abs());
                    occlusion += range;
                }
            }
            1.0 - occlusion / sample_count
        })
        .collect()
}

/// Separable box blur over foreground pixels. Background pixels neither
/// receive nor contribute.
pub fn blur(ao: &[f32], depth: &[f32], width: u32, height: u32, radius: usize) -> Vec<f32> {
    if radius == 0 {
        return ao.to_vec();
    }
    let (w, h) = (width as usize, height as usize);
    let foreground = |i: usize| depth[i].is_finite();

    let pass = |input: &[f32], step: (usize, usize)| -> Vec<f32> {
        let mut output = vec![1.0; w * h];
        output.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let i = y * w + x;
                if !foreground(i) {
                    continue;
                }
                let (mut sum, mut count) = (0.0, 0usize);
                for k in -(radius as isize)..=radius as isize {
                    let sx = x as isize + k * step.0 as isize;
                    let sy = y as isize + k * step.1 as isize;
                    if sx < 0 || sy < 0 || sx >= w as isize || sy >= h as isize {
                        continue;
                    }
                    let j = sy as usize * w + sx as usize;
                    if foreground(j) {
                        sum += input[j];
                        count += 1;
                    }
                }
                *out = sum / count as f32;
            }
        });
        output
    };

    let horizontal = pass(ao, (1, 0));
    pass(&horizontal, (0, 1))
}

/// Scales each pixel's ambient term by its visibility and re-clamps
/// `lit + ambient · ao`. Background and fully visible pixels are untouched.
pub fn apply_occlusion(buffers: &FrameBuffers, ao: &[f32]) {
    let width = buffers.width() as usize;
    (0..buffers.height()).into_par_iter().for_each(|y| {
        let mut row = buffers.lock_row(y);
        let offset = y as usize * width;
        for x in 0..width {
            let visibility = ao[offset + x];
            if visibility >= 1.0 || row.depth[x].is_infinite() {
                continue;
            }
            let lit = Vec3::from(row.lit[x]);
            let ambient = Vec3::from(row.ambient[x]);
            row.color[x] = Color::from_vec3(lit + ambient * visibility);
        }
    });
}

/// Full pass over the current frame. Returns the mean visibility of
/// foreground pixels (1.0 for an empty frame).
pub fn run(buffers: &FrameBuffers, view: &SsaoView, kernel: &SsaoKernel, config: &SsaoConfig) -> f32 {
    let (width, height) = (buffers.width(), buffers.height());
    let depth = buffers.depth_snapshot();
    let raw = compute_occlusion(&depth, width, height, view, kernel, config);
    let ao = blur(&raw, &depth, width, height, config.blur_radius);
    apply_occlusion(buffers, &ao);

    let (sum, count) = depth
        .iter()
        .zip(&ao)
        .filter(|(d, _)| d.is_finite())
        .fold((0.0, 0usize), |(s, c), (_, a)| (s + a, c + 1));
    if count == 0 {
        1.0
    } else {
        sum / count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::framebuffer::{Fragment, FragmentTarget};
    use approx::assert_relative_eq;

    const SIZE: u32 = 64;

    fn view() -> SsaoView {
        SsaoView {
            view: Mat4::identity(),
            projection: Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0),
        }
    }

    fn depth_of(view: &SsaoView, z: f32) -> f32 {
        let ndc = (view.projection * Vec4::new(0.0, 0.0, z, 1.0)).perspective_divide();
        ndc.z * 0.5 + 0.5
    }

    /// Wall at z = -5, with the right half stepped forward to `right_z`.
    fn stepped_depth(view: &SsaoView, right_z: f32) -> Vec<f32> {
        let (left, right) = (depth_of(view, -5.0), depth_of(view, right_z));
        (0..SIZE * SIZE)
            .map(|i| if i % SIZE < SIZE / 2 { left } else { right })
            .collect()
    }

    fn config() -> SsaoConfig {
        SsaoConfig {
            enabled: true,
            kernel_size: 64,
            radius: 1.0,
            blur_radius: 0,
            ..SsaoConfig::default()
        }
    }

    #[test]
    fn kernel_is_seeded_and_in_hemisphere() {
        let a = SsaoKernel::new(&config());
        let b = SsaoKernel::new(&config());
        assert_eq!(a.samples(), b.samples());
        for s in a.samples() {
            assert!(s.z >= 0.0);
            assert!(s.length() <= 1.0 + 1e-5);
        }

        let other = SsaoKernel::new(&SsaoConfig {
            seed: 7,
            ..config()
        });
        assert_ne!(a.samples(), other.samples());
    }

    #[test]
    fn reconstruction_recovers_view_depth() {
        let view = view();
        let depth = vec![depth_of(&view, -5.0); 4];
        for p in reconstruct_positions(&depth, 2, 2, &view) {
            assert_relative_eq!(p.unwrap().z, -5.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn flat_wall_is_unoccluded() {
        let view = view();
        let depth = stepped_depth(&view, -5.0);
        let config = config();
        let ao = compute_occlusion(&depth, SIZE, SIZE, &view, &SsaoKernel::new(&config), &config);
        assert!(ao.iter().all(|&a| a == 1.0));
    }

    #[test]
    fn crease_is_darker_than_open_wall() {
        let view = view();
        let depth = stepped_depth(&view, -4.0);
        let config = config();
        let ao = compute_occlusion(&depth, SIZE, SIZE, &view, &SsaoKernel::new(&config), &config);

        let row = (SIZE / 2) as usize * SIZE as usize;
        let near_step = ao[row + SIZE as usize / 2 - 3];
        let open = ao[row + 4];
        assert!(near_step < 1.0);
        assert_eq!(open, 1.0);
    }

    #[test]
    fn blur_skips_background() {
        let depth = [0.5, 0.5, f32::INFINITY, 0.5];
        let ao = [0.0, 1.0, 0.3, 1.0];
        let blurred = blur(&ao, &depth, 4, 1, 1);
        assert_relative_eq!(blurred[0], 0.5);
        assert_relative_eq!(blurred[1], 0.5);
        assert_eq!(blurred[2], 1.0);
        assert_relative_eq!(blurred[3], 1.0);
    }

    #[test]
    fn occlusion_darkens_by_ambient_share() {
        let buffers = FrameBuffers::try_new(2, 1, Color::BLACK).unwrap();
        let fragment = Fragment {
            depth: 0.5,
            color: Color::rgb(120, 120, 120),
            lit: [80.0; 3],
            ambient: [40.0; 3],
        };
        buffers.target().commit(0, 0, fragment);
        buffers.target().commit(1, 0, fragment);

        apply_occlusion(&buffers, &[0.5, 1.0]);
        assert_eq!(buffers.color_at(0, 0), Some(Color::rgb(100, 100, 100)));
        assert_eq!(buffers.color_at(1, 0), Some(Color::rgb(120, 120, 120)));
    }

    #[test]
    fn saturated_pixels_stay_saturated_under_occlusion() {
        let buffers = FrameBuffers::try_new(2, 1, Color::rgb(5, 5, 5)).unwrap();
        buffers.target().commit(
            0,
            0,
            Fragment {
                depth: 0.5,
                color: Color::rgb(255, 255, 220),
                lit: [300.0, 260.0, 180.0],
                ambient: [40.0; 3],
            },
        );

        apply_occlusion(&buffers, &[0.0, 0.0]);
        // Red and green stay clamped; blue loses its ambient share.
        assert_eq!(buffers.color_at(0, 0), Some(Color::rgb(255, 255, 180)));
        assert_eq!(buffers.color_at(1, 0), Some(Color::rgb(5, 5, 5)));
    }
}

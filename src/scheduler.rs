//! Render tasks and the worker pool that executes them.
//!
//! The scene turns every visible, front-facing triangle into a
//! [`RenderTask`] carrying everything the worker needs, then hands the batch
//! to [`Scheduler::dispatch`]. Workers never touch scene state beyond shared
//! references; all matrices are copied into the task.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::clipper::clip_space::ClipSpaceVertex;
use crate::colors::Color;
use crate::config::FramebufferStrategy;
use crate::error::Result;
use crate::geometry::Geometry;
use crate::math::mat3::Mat3;
use crate::math::mat4::Mat4;
use crate::math::vec2::Vec2;
use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;
use crate::render::framebuffer::{FragmentTarget, FrameBuffers, LocalBuffers};
use crate::render::rasterizer::{draw_triangle, BlinnPhongShader, ShadingContext};

/// One triangle ready to rasterize.
#[derive(Clone, Debug)]
pub struct RenderTask {
    /// Index into the geometry slice passed to [`Scheduler::dispatch`].
    pub geometry: usize,
    pub triangle: usize,
    pub model: Mat4,
    pub mvp: Mat4,
    pub normal_matrix: Mat3,
    pub world_normal: Vec3,
    /// Per-light `max(0, N·L)`, `None` where it varies per fragment.
    pub light_dots: Vec<Option<f32>>,
    pub base_color: Color,
}

/// Fixed-size rayon pool for rasterization and the other per-frame passes.
pub struct Scheduler {
    pool: ThreadPool,
    workers: usize,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("workers", &self.workers)
            .finish()
    }
}

impl Scheduler {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("raster-{i}"))
            .build()?;
        log::debug!("scheduler started with {workers} workers");
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `op` inside the pool so nested rayon calls use its threads.
    pub fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }

    /// Rasterizes every task into `buffers`. Returns fragments written.
    ///
    /// Task order carries no meaning; the depth test decides every pixel.
    pub fn dispatch(
        &self,
        tasks: &[RenderTask],
        geometries: &[&Geometry],
        ctx: ShadingContext<'_>,
        buffers: &FrameBuffers,
        strategy: FramebufferStrategy,
    ) -> Result<usize> {
        if tasks.is_empty() {
            return Ok(0);
        }

        match strategy {
            FramebufferStrategy::RowLocked => Ok(self.install(|| {
                tasks
                    .par_iter()
                    .map(|task| execute(task, geometries, ctx, &mut buffers.target()))
                    .sum()
            })),
            FramebufferStrategy::PerWorker => {
                let chunk = tasks.len().div_ceil(self.workers);
                let (width, height) = (buffers.width(), buffers.height());

                let locals = self.install(|| {
                    tasks
                        .par_chunks(chunk)
                        .map(|batch| -> Result<(LocalBuffers, usize)> {
                            let mut local = LocalBuffers::try_new(width, height)?;
                            let written = batch
                                .iter()
                                .map(|task| execute(task, geometries, ctx, &mut local))
                                .sum();
                            Ok((local, written))
                        })
                        .collect::<Result<Vec<_>>>()
                })?;

                // Merge in batch order so ties resolve the same way for any
                // worker count.
                let mut written = 0;
                for (local, count) in &locals {
                    self.install(|| buffers.merge(local));
                    written += count;
                }
                Ok(written)
            }
        }
    }
}

/// Builds the clip-space vertices of one task and draws them.
pub fn execute<T: FragmentTarget>(
    task: &RenderTask,
    geometries: &[&Geometry],
    ctx: ShadingContext<'_>,
    target: &mut T,
) -> usize {
    let Some(geometry) = geometries.get(task.geometry) else {
        return 0;
    };
    let Some(tri) = geometry.triangles().get(task.triangle) else {
        return 0;
    };

    let local = geometry.local_positions(tri);
    let normals = geometry
        .triangle_normals(tri)
        .map(|n| n.map(|n| (task.normal_matrix * n).normalize()))
        .unwrap_or([task.world_normal; 3]);
    let uvs = geometry.triangle_uvs(tri).unwrap_or([Vec2::ZERO; 3]);

    let vertices: [ClipSpaceVertex; 3] = std::array::from_fn(|i| {
        ClipSpaceVertex::new(
            task.mvp * Vec4::point(local[i]),
            task.model.transform_point(local[i]),
            normals[i],
            uvs[i],
        )
    });

    let flat = tri
        .is_flat()
        .then_some((task.world_normal, task.light_dots.as_slice()));
    let shader = BlinnPhongShader::new(ctx, geometry.triangle_material(tri), task.base_color, flat);
    draw_triangle(vertices, &shader, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ShadingConfig, ShadowConfig, TextureMode};
    use crate::light::Light;

    fn tasks_for(geometry: &Geometry, vp: Mat4) -> Vec<RenderTask> {
        let model = geometry.transform().model_matrix();
        geometry
            .triangles()
            .iter()
            .enumerate()
            .map(|(i, tri)| RenderTask {
                geometry: 0,
                triangle: i,
                model,
                mvp: vp * model,
                normal_matrix: geometry.transform().normal_matrix(),
                world_normal: tri.cache().world_normal,
                light_dots: tri.cache().light_dots.clone(),
                base_color: geometry.material().diffuse,
            })
            .collect()
    }

    fn render(workers: usize, strategy: FramebufferStrategy) -> Vec<Color> {
        let lights = [Light::directional("key", Vec3::new(-0.3, -1.0, -0.5))];
        let mut sphere = Geometry::sphere("ball", 1.0, 16, 12);
        sphere.transform_mut().set_position_xyz(0.2, -0.1, -4.0);
        sphere.update();
        sphere.refresh_triangle_caches(&lights, TextureMode::PerTriangle);

        let vp = Mat4::perspective_rh(1.0, 1.0, 0.1, 50.0);
        let tasks = tasks_for(&sphere, vp);
        let (shading, shadow) = (ShadingConfig::default(), ShadowConfig::default());
        let ctx = ShadingContext {
            lights: &lights,
            eye: Vec3::ZERO,
            shading: &shading,
            shadow: &shadow,
            texture_mode: TextureMode::PerTriangle,
        };

        let buffers = FrameBuffers::try_new(40, 40, Color::BLACK).unwrap();
        let scheduler = Scheduler::new(workers).unwrap();
        let written = scheduler
            .dispatch(&tasks, &[&sphere], ctx, &buffers, strategy)
            .unwrap();
        assert!(written > 0);
        buffers.color_snapshot()
    }

    #[test]
    fn strategies_agree_for_any_worker_count() {
        let reference = render(1, FramebufferStrategy::PerWorker);
        assert_eq!(render(3, FramebufferStrategy::PerWorker), reference);
        assert_eq!(render(1, FramebufferStrategy::RowLocked), reference);
        assert_eq!(render(4, FramebufferStrategy::RowLocked), reference);
    }

    #[test]
    fn out_of_range_task_is_ignored() {
        let geometry = Geometry::cube("box", 1.0);
        let task = RenderTask {
            geometry: 3,
            triangle: 0,
            model: Mat4::identity(),
            mvp: Mat4::identity(),
            normal_matrix: Mat3::identity(),
            world_normal: Vec3::UP,
            light_dots: Vec::new(),
            base_color: Color::WHITE,
        };
        let (shading, shadow) = (ShadingConfig::default(), ShadowConfig::default());
        let ctx = ShadingContext {
            lights: &[],
            eye: Vec3::ZERO,
            shading: &shading,
            shadow: &shadow,
            texture_mode: TextureMode::PerTriangle,
        };
        let buffers = FrameBuffers::try_new(4, 4, Color::BLACK).unwrap();
        assert_eq!(execute(&task, &[&geometry], ctx, &mut buffers.target()), 0);
    }
}

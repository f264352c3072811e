//! Root of the per-frame update and render cycle.
//!
//! A [`Scene`] owns the camera, lights, geometry, frame buffers and worker
//! pool. [`Scene::render_frame`] runs the whole pipeline:
//!
//! 1. resolve dirty transforms (camera, geometry, lights)
//! 2. rebuild shadow maps for shadow-casting lights
//! 3. frustum-cull geometry, refresh triangle caches, backface-cull
//! 4. build one [`RenderTask`] per surviving triangle
//! 5. clear the buffers and dispatch the tasks
//! 6. optional SSAO
//!
//! The call returns only after every worker has finished, so snapshots taken
//! afterwards always show a complete frame.

use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::error::Result;
use crate::geometry::Geometry;
use crate::light::Light;
use crate::projection::Projection;
use crate::render::rasterizer::ShadingContext;
use crate::render::renderer::Renderer;
use crate::render::ssao::{self, SsaoKernel, SsaoView};
use crate::scheduler::{RenderTask, Scheduler};

/// Stable handle to a geometry slot. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(usize);

/// Counters for the last rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    /// Triangles of visible geometry considered this frame.
    pub triangles_submitted: usize,
    /// Triangles dropped by the frustum or backface test.
    pub triangles_culled: usize,
    /// Triangles handed to the workers.
    pub triangles_rasterized: usize,
    pub fragments_written: usize,
    pub shadow_texels: usize,
    /// Mean SSAO visibility of covered pixels, when the pass ran.
    pub ambient_occlusion: Option<f32>,
    pub frame_time: Duration,
}

#[derive(Debug)]
pub struct Scene {
    camera: Camera,
    lights: Vec<Light>,
    geometries: Vec<Option<Geometry>>,
    renderer: Renderer,
    scheduler: Scheduler,
    config: RenderConfig,
    ssao_kernel: Option<SsaoKernel>,
    stats: FrameStats,
    frame: u64,
}

impl Scene {
    /// Creates an empty scene with a default camera matching the viewport.
    pub fn new(width: u32, height: u32, config: RenderConfig) -> Result<Self> {
        config.validate()?;
        let renderer = Renderer::new(width, height, config.clear_color)?;
        let scheduler = Scheduler::new(config.workers)?;

        let mut projection = Projection::default();
        projection.set_aspect_ratio(width as f32 / height as f32);

        Ok(Self {
            camera: Camera::new(projection),
            lights: Vec::new(),
            geometries: Vec::new(),
            renderer,
            scheduler,
            config,
            ssao_kernel: None,
            stats: FrameStats::default(),
            frame: 0,
        })
    }

    // =========================================================================
    // Contents
    // =========================================================================

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.push(Some(geometry));
        GeometryId(self.geometries.len() - 1)
    }

    pub fn remove_geometry(&mut self, id: GeometryId) -> Option<Geometry> {
        self.geometries.get_mut(id.0).and_then(Option::take)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id.0).and_then(Option::as_ref)
    }

    pub fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut Geometry> {
        self.geometries.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn geometries(&self) -> impl Iterator<Item = (GeometryId, &Geometry)> {
        self.geometries
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|g| (GeometryId(i), g)))
    }

    /// Adds a light and returns its index.
    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn remove_light(&mut self, index: usize) -> Option<Light> {
        (index < self.lights.len()).then(|| self.lights.remove(index))
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn light_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    // =========================================================================
    // Configuration & output
    // =========================================================================

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replaces the configuration. The worker pool is rebuilt when the worker
    /// count changes.
    pub fn set_config(&mut self, config: RenderConfig) -> Result<()> {
        config.validate()?;
        if config.workers != self.scheduler.workers() {
            self.scheduler = Scheduler::new(config.workers)?;
        }
        self.renderer.set_clear_color(config.clear_color);
        self.ssao_kernel = None;
        self.config = config;
        Ok(())
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn size(&self) -> (u32, u32) {
        self.renderer.size()
    }

    /// Reallocates the buffers and matches the camera aspect ratio. On error
    /// the previous buffers and camera are untouched.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.renderer.resize(width, height)?;
        self.camera.set_aspect_ratio(width as f32 / height as f32);
        Ok(())
    }

    pub fn to_image(&self) -> image::RgbaImage {
        self.renderer.to_image()
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Renders one frame into the buffers.
    pub fn render_frame(&mut self) -> Result<FrameStats> {
        let started = Instant::now();
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };

        // ─────────────────────────────────────────────────────────────────────
        // Step 1: Transforms
        // ─────────────────────────────────────────────────────────────────────
        self.camera.update();
        for geometry in self.geometries.iter_mut().flatten() {
            geometry.update();
        }
        let focus = self.camera.position();
        for light in &mut self.lights {
            if self.config.shadow.enabled && light.ensure_shadow_map(self.config.shadow.map_size)? {
                log::debug!(
                    "light '{}' got a {size}x{size} shadow map",
                    light.name,
                    size = self.config.shadow.map_size
                );
            }
            light.update(&self.config.shadow, focus);
        }

        // ─────────────────────────────────────────────────────────────────────
        // Step 2: Shadow maps
        // ─────────────────────────────────────────────────────────────────────
        if self.config.shadow.enabled {
            let casters: Vec<&Geometry> = self.geometries.iter().flatten().collect();
            for light in &self.lights {
                if let Some(map) = light.active_shadow_map() {
                    stats.shadow_texels += self.scheduler.install(|| map.render(&casters));
                }
            }
        }

        // ─────────────────────────────────────────────────────────────────────
        // Step 3: Culling and per-triangle caches
        // ─────────────────────────────────────────────────────────────────────
        let mut visible_slots = Vec::new();
        for (slot, geometry) in self.geometries.iter_mut().enumerate() {
            let Some(geometry) = geometry.as_mut().filter(|g| g.visible) else {
                continue;
            };
            let count = geometry.triangles().len();
            stats.triangles_submitted += count;
            if !self.camera.is_visible(&geometry.world_bounds()) {
                stats.triangles_culled += count;
                continue;
            }
            geometry.refresh_triangle_caches(&self.lights, self.config.texture_mode);
            visible_slots.push(slot);
        }

        // ─────────────────────────────────────────────────────────────────────
        // Step 4: Render tasks
        // ─────────────────────────────────────────────────────────────────────
        let visible: Vec<&Geometry> = visible_slots
            .iter()
            .filter_map(|&slot| self.geometries[slot].as_ref())
            .collect();
        let eye = self.camera.position();
        let view_projection = self.camera.view_projection();

        let mut tasks = Vec::new();
        for (index, geometry) in visible.iter().enumerate() {
            let model = geometry.transform().model_matrix();
            let mvp = view_projection * model;
            let normal_matrix = geometry.transform().normal_matrix();

            for (t, tri) in geometry.triangles().iter().enumerate() {
                let cache = tri.cache();
                if self.config.backface_culling
                    && (cache.world_centroid - eye).dot(cache.world_normal) > 0.0
                {
                    stats.triangles_culled += 1;
                    continue;
                }
                tasks.push(RenderTask {
                    geometry: index,
                    triangle: t,
                    model,
                    mvp,
                    normal_matrix,
                    world_normal: cache.world_normal,
                    light_dots: cache.light_dots.clone(),
                    base_color: tri
                        .cached_base_color()
                        .unwrap_or_else(|| geometry.triangle_material(tri).diffuse),
                });
            }
        }
        stats.triangles_rasterized = tasks.len();

        // ─────────────────────────────────────────────────────────────────────
        // Step 5: Clear and rasterize
        // ─────────────────────────────────────────────────────────────────────
        let ctx = ShadingContext {
            lights: &self.lights,
            eye,
            shading: &self.config.shading,
            shadow: &self.config.shadow,
            texture_mode: self.config.texture_mode,
        };
        let buffers = self.renderer.buffers();
        let clear_color = self.renderer.clear_color();
        self.scheduler.install(|| buffers.clear(clear_color));
        stats.fragments_written =
            self.scheduler
                .dispatch(&tasks, &visible, ctx, &buffers, self.config.strategy)?;

        // ─────────────────────────────────────────────────────────────────────
        // Step 6: Ambient occlusion
        // ─────────────────────────────────────────────────────────────────────
        if self.config.ssao.enabled {
            let config = &self.config.ssao;
            let kernel = self.ssao_kernel.get_or_insert_with(|| SsaoKernel::new(config));
            let view = SsaoView {
                view: self.camera.cached_view(),
                projection: self.camera.cached_projection(),
            };
            let kernel = &*kernel;
            stats.ambient_occlusion = Some(
                self.scheduler
                    .install(|| ssao::run(&buffers, &view, kernel, config)),
            );
        }
        drop(buffers);

        stats.frame_time = started.elapsed();
        log::debug!(
            "frame {}: {} submitted, {} culled, {} rasterized, {} fragments in {:?}",
            stats.frame,
            stats.triangles_submitted,
            stats.triangles_culled,
            stats.triangles_rasterized,
            stats.fragments_written,
            stats.frame_time,
        );
        log::trace!("frame {} stats: {stats:?}", stats.frame);

        self.stats = stats;
        Ok(stats)
    }
}

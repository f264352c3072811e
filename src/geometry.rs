//! Triangulated geometry owning its vertex data.
//!
//! A [`Geometry`] owns contiguous arenas of positions, normals and UVs;
//! its [`Triangle`]s refer to them by index.

use std::f32::consts::{PI, TAU};

use crate::config::TextureMode;
use crate::error::{RenderError, Result};
use crate::light::Light;
use crate::material::Material;
use crate::math::bounds::BoundingBox;
use crate::math::vec2::Vec2;
use crate::math::vec3::Vec3;
use crate::transform::Transform;
use crate::triangle::Triangle;

#[derive(Clone, Debug)]
pub struct Geometry {
    name: String,
    transform: Transform,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<Triangle>,
    material: Material,
    local_bounds: BoundingBox,
    world_bounds: BoundingBox,
    /// Hidden geometry is neither drawn nor casts shadows.
    pub visible: bool,
}

impl Geometry {
    /// Builds geometry from raw arenas, checking every triangle index.
    pub fn from_raw(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        uvs: Vec<Vec2>,
        triangles: Vec<Triangle>,
    ) -> Result<Self> {
        let name = name.into();
        for (i, tri) in triangles.iter().enumerate() {
            check_indices(&name, i, "position", &tri.positions, positions.len())?;
            if let Some(n) = &tri.normals {
                check_indices(&name, i, "normal", n, normals.len())?;
            }
            if let Some(uv) = &tri.uvs {
                check_indices(&name, i, "uv", uv, uvs.len())?;
            }
        }

        let local_bounds = BoundingBox::from_points(positions.iter().copied());
        let mut geometry = Self {
            name,
            transform: Transform::new(),
            positions,
            normals,
            uvs,
            triangles,
            material: Material::default(),
            local_bounds,
            world_bounds: local_bounds,
            visible: true,
        };
        geometry.update();
        Ok(geometry)
    }

    /// Axis-aligned cube centred on the origin with per-face UVs.
    pub fn cube(name: impl Into<String>, size: f32) -> Self {
        let h = size * 0.5;
        // (normal, u axis, v axis) with u × v = normal.
        let faces = [
            (Vec3::RIGHT, Vec3::FORWARD, Vec3::UP),
            (-Vec3::RIGHT, Vec3::BACK, Vec3::UP),
            (Vec3::UP, Vec3::RIGHT, Vec3::FORWARD),
            (Vec3::DOWN, Vec3::RIGHT, Vec3::BACK),
            (Vec3::BACK, Vec3::RIGHT, Vec3::UP),
            (Vec3::FORWARD, -Vec3::RIGHT, Vec3::UP),
        ];
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut positions = Vec::with_capacity(24);
        let mut triangles = Vec::with_capacity(12);
        for (normal, u, v) in faces {
            let base = positions.len() as u32;
            positions.extend(
                corners
                    .iter()
                    .map(|&(su, sv)| (normal + u * su + v * sv) * h),
            );
            triangles.push(Triangle::new([base, base + 1, base + 2]).with_uvs([0, 1, 2]));
            triangles.push(Triangle::new([base, base + 2, base + 3]).with_uvs([0, 2, 3]));
        }
        let uvs = vec![Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::ONE, Vec2::new(0.0, 1.0)];

        Self::assemble(name, positions, Vec::new(), uvs, triangles)
    }

    /// Flat grid in the XZ plane facing +Y, split into `segments`² quads.
    pub fn plane(name: impl Into<String>, width: f32, depth: f32, segments: u32) -> Self {
        let n = segments.max(1);
        let stride = n + 1;

        let mut positions = Vec::with_capacity((stride * stride) as usize);
        let mut uvs = Vec::with_capacity(positions.capacity());
        for j in 0..=n {
            for i in 0..=n {
                let (s, t) = (i as f32 / n as f32, j as f32 / n as f32);
                positions.push(Vec3::new(-width * 0.5 + s * width, 0.0, depth * 0.5 - t * depth));
                uvs.push(Vec2::new(s, t));
            }
        }

        let mut triangles = Vec::with_capacity((n * n * 2) as usize);
        for j in 0..n {
            for i in 0..n {
                let a = j * stride + i;
                let (b, c, d) = (a + 1, a + stride + 1, a + stride);
                triangles.push(Triangle::new([a, b, c]).with_uvs([a, b, c]));
                triangles.push(Triangle::new([a, c, d]).with_uvs([a, c, d]));
            }
        }

        Self::assemble(name, positions, Vec::new(), uvs, triangles)
    }

    /// UV sphere with smooth vertex normals.
    pub fn sphere(name: impl Into<String>, radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let stride = segments + 1;

        let mut normals = Vec::with_capacity(((rings + 1) * stride) as usize);
        let mut uvs = Vec::with_capacity(normals.capacity());
        for r in 0..=rings {
            let phi = PI * r as f32 / rings as f32;
            for s in 0..=segments {
                let theta = TAU * s as f32 / segments as f32;
                normals.push(Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()));
                uvs.push(Vec2::new(s as f32 / segments as f32, 1.0 - r as f32 / rings as f32));
            }
        }
        let positions = normals.iter().map(|&n| n * radius).collect();

        let mut triangles = Vec::new();
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let (b, c, d) = (a + stride, a + stride + 1, a + 1);
                // Skip the zero-area halves of the pole quads.
                if r + 1 < rings {
                    triangles.push(Triangle::new([a, c, b]).with_normals([a, c, b]).with_uvs([a, c, b]));
                }
                if r > 0 {
                    triangles.push(Triangle::new([a, d, c]).with_normals([a, d, c]).with_uvs([a, d, c]));
                }
            }
        }

        Self::assemble(name, positions, normals, uvs, triangles)
    }

    /// Builders produce valid indices by construction.
    fn assemble(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        uvs: Vec<Vec2>,
        triangles: Vec<Triangle>,
    ) -> Self {
        let local_bounds = BoundingBox::from_points(positions.iter().copied());
        let mut geometry = Self {
            name: name.into(),
            transform: Transform::new(),
            positions,
            normals,
            uvs,
            triangles,
            material: Material::default(),
            local_bounds,
            world_bounds: local_bounds,
            visible: true,
        };
        geometry.update();
        geometry
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.set_material(material);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ============ Transform ============

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Resolves a dirty transform and refreshes the world bounds.
    /// Returns whether anything changed.
    pub fn update(&mut self) -> bool {
        if !self.transform.update_model_matrix() {
            return false;
        }
        self.recompute_world_bounds();
        true
    }

    // ============ Vertex data ============

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Mutable triangles, e.g. to assign per-triangle materials.
    pub fn triangles_mut(&mut self) -> &mut [Triangle] {
        &mut self.triangles
    }

    /// Replaces vertex positions in place. Indices must stay valid, so the
    /// arena length cannot change.
    pub fn set_positions(&mut self, positions: Vec<Vec3>) -> Result<()> {
        if positions.len() != self.positions.len() {
            return Err(RenderError::InvalidGeometry(format!(
                "{}: expected {} positions, got {}",
                self.name,
                self.positions.len(),
                positions.len()
            )));
        }
        self.positions = positions;
        self.recompute_local_bounds();
        Ok(())
    }

    pub fn local_positions(&self, tri: &Triangle) -> [Vec3; 3] {
        tri.positions.map(|i| self.positions[i as usize])
    }

    pub fn triangle_normals(&self, tri: &Triangle) -> Option<[Vec3; 3]> {
        tri.normals.map(|n| n.map(|i| self.normals[i as usize]))
    }

    pub fn triangle_uvs(&self, tri: &Triangle) -> Option<[Vec2; 3]> {
        tri.uvs.map(|uv| uv.map(|i| self.uvs[i as usize]))
    }

    /// Triangle corners in world space using the cached model matrix.
    pub fn world_positions(&self, tri: &Triangle) -> [Vec3; 3] {
        let model = self.transform.model_matrix();
        self.local_positions(tri).map(|p| model.transform_point(p))
    }

    // ============ Material ============

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Replaces the material and drops every cached base color.
    pub fn set_material(&mut self, material: Material) {
        self.material = material;
        self.invalidate_color_caches();
    }

    pub fn triangle_material<'a>(&'a self, tri: &'a Triangle) -> &'a Material {
        tri.material.as_ref().unwrap_or(&self.material)
    }

    pub fn invalidate_color_caches(&mut self) {
        self.triangles
            .iter_mut()
            .for_each(Triangle::invalidate_color_cache);
    }

    // ============ Bounds ============

    pub fn local_bounds(&self) -> BoundingBox {
        self.local_bounds
    }

    /// World-space bounds as of the last [`Geometry::update`].
    pub fn world_bounds(&self) -> BoundingBox {
        self.world_bounds
    }

    pub fn recompute_local_bounds(&mut self) {
        self.local_bounds = BoundingBox::from_points(self.positions.iter().copied());
        self.recompute_world_bounds();
    }

    fn recompute_world_bounds(&mut self) {
        let model = self.transform.model_matrix();
        self.world_bounds =
            BoundingBox::from_points(self.positions.iter().map(|&p| model.transform_point(p)));
    }

    // ============ Per-frame caches ============

    /// Rebuilds world normals and light dots for every triangle and warms the
    /// base color cache.
    pub fn refresh_triangle_caches(&mut self, lights: &[Light], mode: TextureMode) {
        let model = self.transform.model_matrix();
        let Self {
            positions,
            uvs,
            triangles,
            material,
            ..
        } = self;

        for tri in triangles.iter_mut() {
            let world = tri.positions.map(|i| model.transform_point(positions[i as usize]));
            tri.refresh(world, lights);

            let tri_uvs = tri.uvs.map(|idx| idx.map(|i| uvs[i as usize]));
            let tri_material = tri.material.take();
            tri.base_color(tri_material.as_ref().unwrap_or(&*material), tri_uvs, mode);
            tri.material = tri_material;
        }
    }
}

fn check_indices(name: &str, tri: usize, kind: &str, indices: &[u32; 3], len: usize) -> Result<()> {
    match indices.iter().find(|&&i| i as usize >= len) {
        Some(bad) => Err(RenderError::InvalidGeometry(format!(
            "{name}: triangle {tri} references {kind} {bad}, arena holds {len}"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face_normal(g: &Geometry, tri: &Triangle) -> Vec3 {
        let [a, b, c] = g.local_positions(tri);
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn from_raw_rejects_out_of_range_indices() {
        let positions = vec![Vec3::ZERO, Vec3::RIGHT, Vec3::UP];
        let err = Geometry::from_raw("bad", positions.clone(), vec![], vec![], vec![Triangle::new([0, 1, 3])]);
        assert!(matches!(err, Err(RenderError::InvalidGeometry(_))));

        let err = Geometry::from_raw(
            "bad-normals",
            positions,
            vec![Vec3::UP],
            vec![],
            vec![Triangle::new([0, 1, 2]).with_normals([0, 0, 1])],
        );
        assert!(err.is_err());
    }

    #[test]
    fn cube_faces_point_outward() {
        let cube = Geometry::cube("cube", 2.0);
        assert_eq!(cube.triangles().len(), 12);
        for tri in cube.triangles() {
            let [a, b, c] = cube.local_positions(tri);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal(&cube, tri).dot(centroid) > 0.0);
        }
        assert_eq!(cube.local_bounds().max, Vec3::ONE);
    }

    #[test]
    fn plane_faces_up() {
        let plane = Geometry::plane("floor", 4.0, 2.0, 3);
        assert_eq!(plane.triangles().len(), 18);
        for tri in plane.triangles() {
            assert_relative_eq!(face_normal(&plane, tri).y, 1.0, epsilon = 1e-6);
        }
        assert_relative_eq!(plane.local_bounds().size().x, 4.0);
        assert_relative_eq!(plane.local_bounds().size().z, 2.0);
    }

    #[test]
    fn sphere_triangles_face_outward() {
        let sphere = Geometry::sphere("ball", 1.0, 12, 6);
        for tri in sphere.triangles() {
            let [a, b, c] = sphere.local_positions(tri);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal(&sphere, tri).dot(centroid) > 0.0);
        }
    }

    #[test]
    fn world_bounds_follow_transform() {
        let mut cube = Geometry::cube("cube", 2.0);
        cube.transform_mut().set_position_xyz(5.0, 0.0, 0.0);
        assert!(cube.update());
        assert_relative_eq!(cube.world_bounds().center().x, 5.0, epsilon = 1e-6);
        assert!(!cube.update());
    }

    #[test]
    fn set_material_invalidates_caches() {
        let mut plane = Geometry::plane("p", 1.0, 1.0, 1);
        plane.refresh_triangle_caches(&[], TextureMode::PerTriangle);
        assert_eq!(plane.triangles()[0].cached_base_color(), Some(Material::default().diffuse));

        plane.set_material(Material::new("red").with_diffuse(crate::colors::Color::rgb(255, 0, 0)));
        assert_eq!(plane.triangles()[0].cached_base_color(), None);
    }
}

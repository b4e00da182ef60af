//! Id-color picking pass.
//!
//! Every polygon mesh is drawn unlit into an offscreen target with a flat
//! 24-bit color derived from its feature id; reading a pixel back yields the
//! feature id directly, without raycasting.
//!
//! Rasterization notes:
//! - Triangles are double-sided and depth tested (nearest wins).
//! - Triangles with a vertex outside the camera's near/far range are skipped.
//! - Ties at equal depth keep the first triangle drawn.

use std::collections::BTreeMap;

use foundation::math::Vec3;
use tracing::trace;

/// Color value of pixels not covered by any mesh.
pub const BACKGROUND: u32 = 0;

const COLOR_MASK: u32 = 0x00FF_FFFF;

/// Deterministic 24-bit RGB color for `feature_id`. Never [`BACKGROUND`].
pub fn id_color(feature_id: &str) -> u32 {
    let hash = blake3::hash(feature_id.as_bytes());
    let b = hash.as_bytes();
    let rgb = ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | b[2] as u32;
    if rgb == BACKGROUND { 1 } else { rgb }
}

pub fn color_to_rgb(color: u32) -> [u8; 3] {
    [(color >> 16) as u8, (color >> 8) as u8, color as u8]
}

/// Two-way mapping between feature ids and their picking colors.
///
/// Hash collisions are resolved by probing to the next free color.
#[derive(Debug, Clone, Default)]
pub struct IdColorRegistry {
    by_color: BTreeMap<u32, String>,
    by_id: BTreeMap<String, u32>,
}

impl IdColorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_color.clear();
        self.by_id.clear();
    }

    pub fn assign(&mut self, feature_id: &str) -> u32 {
        self.assign_from(feature_id, id_color(feature_id))
    }

    pub fn color_of(&self, feature_id: &str) -> Option<u32> {
        self.by_id.get(feature_id).copied()
    }

    pub fn id_of(&self, color: u32) -> Option<&str> {
        self.by_color.get(&color).map(String::as_str)
    }

    fn assign_from(&mut self, feature_id: &str, seed: u32) -> u32 {
        if let Some(color) = self.by_id.get(feature_id) {
            return *color;
        }
        let mut color = seed & COLOR_MASK;
        while color == BACKGROUND || self.by_color.contains_key(&color) {
            color = (color + 1) & COLOR_MASK;
        }
        if color != seed {
            trace!(feature = feature_id, seed, color, "picking color collision re-probed");
        }
        self.by_color.insert(color, feature_id.to_string());
        self.by_id.insert(feature_id.to_string(), color);
        color
    }
}

/// Perspective camera driving the picking pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera {
    pub fn look_at(position: Vec3, target: Vec3, fov_y_rad: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            up: Vec3::new(0.0, 1.0, 0.0),
            fov_y_rad,
            near,
            far,
        }
    }

    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up;
        self
    }

    /// Projects a world point to `(x_px, y_px, view_depth)` for a
    /// `width` x `height` target (y grows downward).
    pub fn project(&self, p: Vec3, width: u32, height: u32) -> Option<[f64; 3]> {
        let basis = self.basis()?;
        self.project_with(&basis, p, width, height)
    }

    fn basis(&self) -> Option<[Vec3; 3]> {
        let forward = (self.target - self.position).normalized()?;
        let right = forward.cross(self.up).normalized()?;
        let up = right.cross(forward);
        Some([forward, right, up])
    }

    fn project_with(&self, basis: &[Vec3; 3], p: Vec3, width: u32, height: u32) -> Option<[f64; 3]> {
        let [forward, right, up] = *basis;
        let v = p - self.position;
        let z = v.dot(forward);
        if z < self.near || z > self.far || width == 0 || height == 0 {
            return None;
        }
        let f = 1.0 / (self.fov_y_rad * 0.5).tan();
        let aspect = width as f64 / height as f64;
        let ndc_x = v.dot(right) * f / (aspect * z);
        let ndc_y = v.dot(up) * f / z;
        Some([
            (ndc_x + 1.0) * 0.5 * width as f64,
            (1.0 - ndc_y) * 0.5 * height as f64,
            z,
        ])
    }
}

/// Borrowed mesh handed to the picking pass.
#[derive(Debug, Copy, Clone)]
pub struct PickMesh<'a> {
    pub feature_id: &'a str,
    pub positions: &'a [[f32; 3]],
    pub indices: &'a [u32],
}

/// A set of meshes that can be drawn into the picking target.
pub trait PickSource {
    fn visit_pick_meshes(&self, visit: &mut dyn FnMut(PickMesh<'_>));
}

impl PickSource for Vec<PickMesh<'_>> {
    fn visit_pick_meshes(&self, visit: &mut dyn FnMut(PickMesh<'_>)) {
        for mesh in self {
            visit(*mesh);
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Scissor {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

/// Offscreen id-color render target.
#[derive(Debug, Clone)]
pub struct IdPickingPass {
    width: u32,
    height: u32,
    colors: Vec<u32>,
    depth: Vec<f64>,
    registry: IdColorRegistry,
    camera: Option<Camera>,
}

impl IdPickingPass {
    pub fn new(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            colors: vec![BACKGROUND; n],
            depth: vec![f64::INFINITY; n],
            registry: IdColorRegistry::new(),
            camera: None,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self {
            camera: self.camera,
            ..Self::new(width, height)
        };
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Colors assigned by the last draw.
    pub fn registry(&self) -> &IdColorRegistry {
        &self.registry
    }

    /// Clears the target and forgets every assigned color. The camera is kept.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.colors.fill(BACKGROUND);
        self.depth.fill(f64::INFINITY);
    }

    /// Draws `source` into the full target. Does nothing without a camera.
    pub fn render(&mut self, source: &dyn PickSource) {
        let full = Scissor {
            x0: 0,
            y0: 0,
            x1: self.width,
            y1: self.height,
        };
        self.draw(source, full);
    }

    /// Color stored at pixel `(x, y)` by the last draw.
    pub fn read_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.colors[self.pixel_index(x, y)])
    }

    /// Feature id stored at `(x, y)` by the last draw.
    pub fn id_at_pixel(&self, x: u32, y: u32) -> Option<&str> {
        let color = self.read_pixel(x, y)?;
        if color == BACKGROUND {
            return None;
        }
        self.registry.id_of(color)
    }

    /// Renders only pixel `(x, y)` of `source` and reads it back.
    pub fn get_id_at(&mut self, source: &dyn PickSource, x: u32, y: u32) -> Option<&str> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let probe = Scissor {
            x0: x,
            y0: y,
            x1: x + 1,
            y1: y + 1,
        };
        self.draw(source, probe);
        self.id_at_pixel(x, y)
    }

    /// [`Self::get_id_at`] with `u, v` in `[0, 1]` (origin top-left).
    pub fn get_id_at_normalized(&mut self, source: &dyn PickSource, u: f64, v: f64) -> Option<&str> {
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }
        let x = ((u * self.width as f64) as u32).min(self.width.saturating_sub(1));
        let y = ((v * self.height as f64) as u32).min(self.height.saturating_sub(1));
        self.get_id_at(source, x, y)
    }

    fn pixel_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn clear_region(&mut self, s: Scissor) {
        for y in s.y0..s.y1 {
            for x in s.x0..s.x1 {
                let i = self.pixel_index(x, y);
                self.colors[i] = BACKGROUND;
                self.depth[i] = f64::INFINITY;
            }
        }
    }

    // Colors are reassigned on every draw, so they depend only on `source`
    // and its visit order.
    fn draw(&mut self, source: &dyn PickSource, scissor: Scissor) {
        self.clear_region(scissor);
        self.registry.clear();
        let Some(camera) = self.camera else {
            return;
        };
        let Some(basis) = camera.basis() else {
            return;
        };

        let mut meshes: Vec<(u32, Vec<[[f64; 3]; 3]>)> = Vec::new();
        let (width, height) = (self.width, self.height);
        source.visit_pick_meshes(&mut |mesh: PickMesh<'_>| {
            let mut tris: Vec<[[f64; 3]; 3]> = Vec::new();
            for tri in mesh.indices.chunks_exact(3) {
                let mut screen = [[0.0; 3]; 3];
                let mut visible = true;
                for (corner, &idx) in screen.iter_mut().zip(tri) {
                    let Some(p) = mesh.positions.get(idx as usize) else {
                        visible = false;
                        break;
                    };
                    match camera.project_with(&basis, Vec3::from_f32(*p), width, height) {
                        Some(s) => *corner = s,
                        None => {
                            visible = false;
                            break;
                        }
                    }
                }
                if visible {
                    tris.push(screen);
                }
            }
            if !tris.is_empty() {
                meshes.push((self.registry.assign(mesh.feature_id), tris));
            }
        });

        for (color, tris) in meshes {
            for tri in tris {
                self.raster_triangle(&tri, color, scissor);
            }
        }
    }

    fn raster_triangle(&mut self, tri: &[[f64; 3]; 3], color: u32, s: Scissor) {
        let [a, b, c] = *tri;
        let area = edge(a, b, c);
        if area.abs() < 1e-12 {
            return;
        }

        let min_x = a[0].min(b[0]).min(c[0]).floor().max(s.x0 as f64) as u32;
        let max_x = a[0].max(b[0]).max(c[0]).ceil().min(s.x1 as f64) as u32;
        let min_y = a[1].min(b[1]).min(c[1]).floor().max(s.y0 as f64) as u32;
        let max_y = a[1].max(b[1]).max(c[1]).ceil().min(s.y1 as f64) as u32;

        for y in min_y..max_y {
            for x in min_x..max_x {
                let p = [x as f64 + 0.5, y as f64 + 0.5, 0.0];
                let w0 = edge(b, c, p) / area;
                let w1 = edge(c, a, p) / area;
                let w2 = edge(a, b, p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                // Perspective-correct depth: 1/z is linear in screen space.
                let inv_z = w0 / a[2] + w1 / b[2] + w2 / c[2];
                if inv_z <= 0.0 {
                    continue;
                }
                let z = 1.0 / inv_z;
                let i = self.pixel_index(x, y);
                if z < self.depth[i] {
                    self.depth[i] = z;
                    self.colors[i] = color;
                }
            }
        }
    }
}

fn edge(a: [f64; 3], b: [f64; 3], p: [f64; 3]) -> f64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

//! Pick engine
//!
//! Broad phase finds the nearest Object (and triangle) under a ray, either
//! through the render backend or on the CPU. The optional narrow phase then
//! recomputes the hit against the dequantized triangle in the Object's local
//! space and fills in surface detail.

use crate::error::SceneError;
use crate::foundation::math::{normal_matrix, transform_point, Vec2, Vec3};
use crate::geometry::PrimitiveKind;
use crate::scene::{NodeId, Scene};

use super::backend::{BroadPhaseQuery, BroadPhaseResult};
use super::ray::{Ray, Triangle};

const BARYCENTRIC_TOLERANCE: f32 = 1e-4;

/// Where a pick comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickInput {
    /// Canvas pixel, unprojected through the scene camera
    Canvas(Vec2),
    /// Explicit world-space ray
    Ray {
        /// Ray origin
        origin: Vec3,
        /// Ray direction (normalized internally)
        direction: Vec3,
    },
}

/// Pick options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickQuery {
    /// Compute surface detail for triangle geometry
    pub pick_surface: bool,
    /// Restrict picking to these Objects when non-empty
    pub include: Vec<NodeId>,
    /// Never pick these Objects
    pub exclude: Vec<NodeId>,
}

impl PickQuery {
    /// Query with surface detail
    pub fn surface() -> Self {
        Self { pick_surface: true, ..Self::default() }
    }

    /// Builder: restrict to these Objects
    pub fn with_include(mut self, include: Vec<NodeId>) -> Self {
        self.include = include;
        self
    }

    /// Builder: never pick these Objects
    pub fn with_exclude(mut self, exclude: Vec<NodeId>) -> Self {
        self.exclude = exclude;
        self
    }

    fn admits(&self, node: NodeId) -> bool {
        (self.include.is_empty() || self.include.contains(&node)) && !self.exclude.contains(&node)
    }
}

/// Surface detail of a triangle hit
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceHit {
    /// Triangle index within the geometry
    pub triangle: usize,
    /// Vertex indices of the triangle
    pub indices: [u32; 3],
    /// Hit position in the Object's local space
    pub local_pos: Vec3,
    /// Hit position in world space
    pub world_pos: Vec3,
    /// Hit position in camera view space
    pub view_pos: Vec3,
    /// Weights of the three vertices
    pub barycentric: Vec3,
    /// Interpolated world-space normal
    pub normal: Vec3,
    /// Interpolated uv, when the geometry has uvs
    pub uv: Option<Vec2>,
}

/// Result of a successful pick
#[derive(Debug, Clone, PartialEq)]
pub struct PickResult {
    /// Object hit
    pub node: NodeId,
    /// Its string id
    pub node_id: String,
    /// Primitive kind of its geometry
    pub primitive: PrimitiveKind,
    /// World-space ray that was cast
    pub ray: Ray,
    /// Ray parameter of the broad-phase hit
    pub distance: Option<f32>,
    /// Triangle index from the broad phase
    pub triangle: Option<usize>,
    /// Narrow-phase detail, when requested and available
    pub surface: Option<SurfaceHit>,
}

struct Candidate {
    node: NodeId,
    triangle: Option<usize>,
    distance: Option<f32>,
}

impl Scene {
    /// Pick the nearest pickable, visible, non-culled Object under the input.
    ///
    /// Surface detail is computed when the query or the scene config asks
    /// for it and the geometry is made of triangles.
    pub fn pick(&mut self, input: PickInput, query: &PickQuery) -> Option<PickResult> {
        let (ray, canvas_pos) = match input {
            PickInput::Canvas(pos) => {
                if self.viewport.is_degenerate() {
                    let (width, height) = (self.viewport.width, self.viewport.height);
                    self.report_error(None, SceneError::ZeroCanvas { width, height });
                    return None;
                }
                let Some(ray) = self.camera.canvas_to_ray(pos, self.viewport) else {
                    self.report_error(None, SceneError::InvalidValue {
                        field: "camera",
                        message: "camera cannot unproject canvas positions".to_string(),
                    });
                    return None;
                };
                (ray, Some(pos))
            }
            PickInput::Ray { origin, direction } => {
                if direction.norm() <= f32::EPSILON {
                    self.report_error(None, SceneError::InvalidValue {
                        field: "direction",
                        message: "pick ray direction is zero".to_string(),
                    });
                    return None;
                }
                (Ray::new(origin, direction), None)
            }
        };

        let broad_query = BroadPhaseQuery {
            ray,
            canvas_pos,
            include: &query.include,
            exclude: &query.exclude,
        };
        let candidate = match self.backend.pick_candidate(&broad_query) {
            BroadPhaseResult::Unsupported => self.cpu_broad_phase(&ray, query),
            BroadPhaseResult::Miss => None,
            BroadPhaseResult::Hit { node, triangle } => Some(Candidate { node, triangle, distance: None }),
        };
        let Some(candidate) = candidate else {
            log::debug!("Pick missed");
            return None;
        };

        let node_id = self.id_of(candidate.node)?.to_string();
        let primitive = self
            .object_geometry(candidate.node)
            .and_then(|g| self.geometry(g))
            .map_or(PrimitiveKind::Triangles, |g| g.primitive());

        let surface = match candidate.triangle {
            Some(triangle) if (query.pick_surface || self.config.picking.pick_surface) && primitive.is_triangles() => {
                self.narrow_phase(candidate.node, triangle, &ray)
            }
            _ => None,
        };

        log::debug!("Picked '{}' (triangle {:?})", node_id, candidate.triangle);
        Some(PickResult {
            node: candidate.node,
            node_id,
            primitive,
            ray,
            distance: candidate.distance,
            triangle: candidate.triangle,
            surface,
        })
    }

    fn sync_pick_index(&mut self) {
        for node in self.pick_index.stale_ids() {
            match self.aabb(node) {
                Some(aabb) => self.pick_index.update(node, aabb),
                None => self.pick_index.remove(node),
            }
        }
    }

    fn cpu_broad_phase(&mut self, ray: &Ray, query: &PickQuery) -> Option<Candidate> {
        self.sync_pick_index();
        let mut best: Option<Candidate> = None;

        for (entry_t, node) in self.pick_index.query_ray(ray.origin, ray.direction) {
            if best.as_ref().and_then(|b| b.distance).is_some_and(|t| t < entry_t) {
                break;
            }
            let eligible = self.spatial(node).is_some_and(|s| s.is_pick_candidate());
            if !eligible || !query.admits(node) {
                continue;
            }

            let hit = match self.object_geometry(node) {
                Some(geometry) => self.intersect_object(node, geometry, ray),
                None => None,
            };
            let Some((t, triangle)) = hit else { continue };
            if best.as_ref().and_then(|b| b.distance).map_or(true, |bt| t < bt) {
                best = Some(Candidate { node, triangle, distance: Some(t) });
            }
        }
        best
    }

    /// Ray parameter and triangle of the nearest hit on one Object.
    ///
    /// Non-triangle geometry is hit at its boundary entry.
    fn intersect_object(&mut self, node: NodeId, geometry: NodeId, ray: &Ray) -> Option<(f32, Option<usize>)> {
        let primitive = self.geometry(geometry)?.primitive();
        if !primitive.is_triangles() {
            let aabb = self.aabb(node)?;
            return aabb.intersect_ray(ray.origin, ray.direction).map(|t| (t, None));
        }

        let inverse = self.world_matrix(node)?.try_inverse()?;
        let local_ray = ray.transformed(&inverse);
        let soup = self.geometry_mut(geometry)?.pick_triangle_positions();

        soup.chunks_exact(3)
            .enumerate()
            .filter_map(|(i, v)| {
                Triangle::new(v[0], v[1], v[2])
                    .intersect_ray(&local_ray)
                    .map(|(t, _, _)| (t, Some(i)))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn narrow_phase(&mut self, node: NodeId, triangle: usize, ray: &Ray) -> Option<SurfaceHit> {
        let world = self.world_matrix(node)?;
        let inverse = world.try_inverse()?;
        let local_ray = ray.transformed(&inverse);
        let geometry = self.object_geometry(node)?;
        let buffer = self.geometry(geometry)?;

        let Some(indices) = buffer.triangle(triangle) else {
            log::error!(
                "Broad/narrow phase mismatch: triangle {} out of range for '{}' ({} triangles)",
                triangle,
                self.id_of(node).unwrap_or("?"),
                buffer.triangle_count()
            );
            return None;
        };
        let [a, b, c] = indices.map(|i| i as usize);
        let tri = Triangle::new(buffer.position(a)?, buffer.position(b)?, buffer.position(c)?);

        let Some(t) = tri.intersect_plane(&local_ray) else {
            log::error!("Broad/narrow phase mismatch: ray parallel to triangle {} of '{}'", triangle, self.id_of(node).unwrap_or("?"));
            return None;
        };
        let local_pos = local_ray.point_at(t);
        let Some(barycentric) = tri.barycentric(&local_pos) else {
            log::error!("Broad/narrow phase mismatch: triangle {} of '{}' is degenerate", triangle, self.id_of(node).unwrap_or("?"));
            return None;
        };
        let outside = barycentric.iter().any(|w| *w < -BARYCENTRIC_TOLERANCE)
            || (barycentric.sum() - 1.0).abs() > BARYCENTRIC_TOLERANCE;
        if outside {
            log::error!(
                "Broad/narrow phase mismatch on '{}': barycentric {:?} outside triangle {}",
                self.id_of(node).unwrap_or("?"),
                barycentric,
                triangle
            );
        }

        let local_normal = match (buffer.normal(a), buffer.normal(b), buffer.normal(c)) {
            (Some(na), Some(nb), Some(nc)) => na * barycentric.x + nb * barycentric.y + nc * barycentric.z,
            _ => tri.face_normal(),
        };
        let normal = normal_matrix(&world)
            .map(|m| m * local_normal)
            .filter(|n| n.norm() > f32::EPSILON)
            .map_or(local_normal, |n| n.normalize());
        let uv = match (buffer.uv(a), buffer.uv(b), buffer.uv(c)) {
            (Some(ua), Some(ub), Some(uc)) => Some(ua * barycentric.x + ub * barycentric.y + uc * barycentric.z),
            _ => None,
        };

        let world_pos = transform_point(&world, &local_pos);
        let view_pos = self.camera.to_view(&world_pos);
        Some(SurfaceHit {
            triangle,
            indices,
            local_pos,
            world_pos,
            view_pos,
            barycentric,
            normal,
            uv,
        })
    }
}

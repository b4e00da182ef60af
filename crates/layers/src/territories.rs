//! Territory polygons: normalization through mesh synthesis, behind the geometry cache.

use std::sync::Arc;

use cache::{CachedGeometryRecord, ExtrusionKey, GeometryCache, SurfaceKey};
use foundation::math::ProjectionMode;
use foundation::mesh::MeshData;
use formats::{GeoPoint, PolygonFeature, Ring, closed, open_slice};
use scene::{PickMesh, PickSource};
use tracing::debug;

use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink, SkipReason, emit};
use crate::holes::{HoleAssignment, assign_hole};
use crate::mesh::{MeshParams, build_part_mesh};
use crate::options::PipelineOptions;
use crate::projection::{cap_edge_ratio, needs_fallback, select_projection};
use crate::rings::normalize_ring;
use crate::style::{PolygonOffset, Side, SurfaceMaterial};
use crate::validate::validate_ring;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TerritoryOptions {
    pub radius: f64,
    pub elevation: f64,
    /// Shell height; 0 builds flat caps without walls.
    pub thickness: f64,
    pub color: [f32; 3],
    pub opacity: f32,
    pub side: Side,
    pub polygon_offset: Option<PolygonOffset>,
}

impl Default for TerritoryOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            elevation: 0.001,
            thickness: 0.0,
            color: [0.2, 0.5, 0.8],
            opacity: 1.0,
            side: Side::Front,
            polygon_offset: Some(PolygonOffset::default()),
        }
    }
}

/// One renderable part, viewing into a shared cached record.
#[derive(Debug, Clone)]
pub struct MeshPrimitive {
    /// `territory:<id>` for single-part features, `territory:<id>:part<N>` otherwise.
    pub name: String,
    pub feature_id: String,
    record: Arc<CachedGeometryRecord>,
    part: usize,
}

impl MeshPrimitive {
    pub fn mesh(&self) -> &MeshData {
        &self.record.parts[self.part]
    }

    pub fn part(&self) -> usize {
        self.part
    }

    pub fn record(&self) -> &Arc<CachedGeometryRecord> {
        &self.record
    }
}

#[derive(Debug, Clone)]
pub struct MeshGroup {
    pub primitives: Vec<MeshPrimitive>,
    pub material: Arc<SurfaceMaterial>,
}

impl MeshGroup {
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.mesh().vertex_count()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(|p| p.mesh().triangle_count()).sum()
    }

    pub fn find(&self, name: &str) -> Option<&MeshPrimitive> {
        self.primitives.iter().find(|p| p.name == name)
    }
}

impl PickSource for MeshGroup {
    fn visit_pick_meshes(&self, visit: &mut dyn FnMut(PickMesh<'_>)) {
        for primitive in &self.primitives {
            let mesh = primitive.mesh();
            visit(PickMesh {
                feature_id: &primitive.feature_id,
                positions: &mesh.positions,
                indices: &mesh.indices,
            });
        }
    }
}

/// Builds territory meshes for `features`.
///
/// A cache hit skips normalization through synthesis entirely. Features that
/// produce no mesh are skipped (and not cached).
pub fn build_territory_polygons(
    features: &[PolygonFeature],
    options: &TerritoryOptions,
    pipeline: &PipelineOptions,
    cache: &mut GeometryCache,
    mut diagnostics: Option<&mut dyn DiagnosticsSink>,
) -> MeshGroup {
    let material = Arc::new(SurfaceMaterial {
        color: options.color,
        opacity: options.opacity,
        side: options.side,
        polygon_offset: options.polygon_offset,
    });
    // Built geometry must match what the key claims, so thickness comes from the key.
    let extrusion = ExtrusionKey::from_thickness(options.thickness);
    let params = MeshParams {
        radius: options.radius,
        elevation: options.elevation,
        thickness: extrusion.thickness(),
        min_hole_wall_perimeter_deg: pipeline.min_hole_wall_perimeter_deg,
    };
    let surface = SurfaceKey::new(options.radius, options.elevation);

    let mut primitives: Vec<MeshPrimitive> = Vec::new();
    for feature in features {
        let key = cache.key_for(
            &feature.id,
            &feature.rings,
            pipeline.projection_key(),
            extrusion,
            surface,
        );

        let record = match cache.get(&key) {
            Some(hit) => {
                emit(
                    &mut diagnostics,
                    DiagnosticEvent::CacheHit {
                        feature_id: feature.id.clone(),
                    },
                );
                hit
            }
            None => {
                emit(
                    &mut diagnostics,
                    DiagnosticEvent::CacheMiss {
                        feature_id: feature.id.clone(),
                    },
                );
                let parts = build_feature_meshes(feature, &params, pipeline, &mut diagnostics);
                if parts.is_empty() {
                    debug!(feature = %feature.id, "territory produced no mesh");
                    continue;
                }
                cache.insert(key, parts)
            }
        };

        let multi = record.parts.len() > 1;
        for part in 0..record.parts.len() {
            let name = if multi {
                format!("territory:{}:part{part}", feature.id)
            } else {
                format!("territory:{}", feature.id)
            };
            primitives.push(MeshPrimitive {
                name,
                feature_id: feature.id.clone(),
                record: Arc::clone(&record),
                part,
            });
        }
    }

    MeshGroup {
        primitives,
        material,
    }
}

/// Runs the uncached pipeline for one feature: one mesh per surviving outer part.
pub fn build_feature_meshes(
    feature: &PolygonFeature,
    params: &MeshParams,
    pipeline: &PipelineOptions,
    diagnostics: &mut Option<&mut dyn DiagnosticsSink>,
) -> Vec<MeshData> {
    let Some(outer) = feature.outer() else {
        debug!(feature = %feature.id, "polygon without outer ring");
        emit(
            diagnostics,
            DiagnosticEvent::PartSkipped {
                feature_id: feature.id.clone(),
                part: 0,
                reason: SkipReason::NoOuterRing,
            },
        );
        return Vec::new();
    };

    let normalized = normalize_ring(outer);
    let mut outer_parts: Vec<Ring> = Vec::with_capacity(normalized.parts.len());
    for (part, ring) in normalized.parts.iter().enumerate() {
        let ring = clean(feature, 0, part, ring, pipeline, diagnostics);
        if open_slice(&ring).len() < 3 {
            debug!(feature = %feature.id, part, "skipping degenerate outer part");
            emit(
                diagnostics,
                DiagnosticEvent::PartSkipped {
                    feature_id: feature.id.clone(),
                    part,
                    reason: SkipReason::Degenerate,
                },
            );
            continue;
        }
        outer_parts.push(ring);
    }
    if outer_parts.is_empty() {
        return Vec::new();
    }

    let mut holes_by_part: Vec<Vec<Ring>> = vec![Vec::new(); outer_parts.len()];
    for (hole, ring) in feature.holes().iter().enumerate() {
        for hole_part in normalize_ring(ring).parts {
            let hole_part = clean(feature, hole + 1, 0, &hole_part, pipeline, diagnostics);
            if open_slice(&hole_part).len() < 3 {
                continue;
            }
            let assignment = if outer_parts.len() == 1 {
                // A single part owns every hole.
                HoleAssignment {
                    part_index: 0,
                    fallback: false,
                }
            } else {
                assign_hole(&hole_part, &outer_parts)
            };
            if assignment.fallback {
                debug!(feature = %feature.id, hole, "hole not inside any part; assigning to part 0");
                emit(
                    diagnostics,
                    DiagnosticEvent::HoleFallback {
                        feature_id: feature.id.clone(),
                        hole,
                    },
                );
            }
            holes_by_part[assignment.part_index].push(hole_part);
        }
    }

    let auto = pipeline.projection_override.is_none();
    let mode = pipeline.projection_override.unwrap_or_else(|| {
        select_projection(normalized.classification, outer_parts.len(), normalized.span_deg)
    });

    let mut meshes: Vec<MeshData> = Vec::with_capacity(outer_parts.len());
    for (part, (ring, holes)) in outer_parts.iter().zip(&holes_by_part).enumerate() {
        let Some(mut mesh) = build_part_mesh(ring, holes, mode, params) else {
            debug!(feature = %feature.id, part, %mode, "triangulation produced no mesh");
            emit(
                diagnostics,
                DiagnosticEvent::PartSkipped {
                    feature_id: feature.id.clone(),
                    part,
                    reason: SkipReason::TriangulationFailed,
                },
            );
            continue;
        };

        if auto && pipeline.legacy_fallback && needs_fallback(&mesh, pipeline.fallback_edge_ratio) {
            let edge_ratio = cap_edge_ratio(&mesh).unwrap_or(f64::INFINITY);
            if let Some(rebuilt) = build_part_mesh(ring, holes, ProjectionMode::Tangent, params) {
                debug!(feature = %feature.id, part, edge_ratio, "legacy cap stretched; rebuilt on tangent plane");
                emit(
                    diagnostics,
                    DiagnosticEvent::ProjectionFallback {
                        feature_id: feature.id.clone(),
                        part,
                        edge_ratio,
                    },
                );
                mesh = rebuilt;
            }
        }
        meshes.push(mesh);
    }
    meshes
}

fn clean(
    feature: &PolygonFeature,
    ring_index: usize,
    part: usize,
    ring: &[GeoPoint],
    pipeline: &PipelineOptions,
    diagnostics: &mut Option<&mut dyn DiagnosticsSink>,
) -> Ring {
    if !pipeline.validate {
        return closed(ring);
    }
    let (cleaned, report) = validate_ring(ring, pipeline.collinear_epsilon);
    if report.self_intersections > 0 {
        debug!(
            feature = %feature.id,
            ring = ring_index,
            part,
            self_intersections = report.self_intersections,
            "ring self-intersects"
        );
    }
    emit(
        diagnostics,
        DiagnosticEvent::RingValidated {
            feature_id: feature.id.clone(),
            ring: ring_index,
            part,
            report,
        },
    );
    cleaned
}

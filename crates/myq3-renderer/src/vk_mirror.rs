// Copyright (C) 1997-2001 Id Software, Inc.
// GPL-2.0-or-later
//
// vk_mirror.rs — mirrors and portals: secondary views rendered through surfaces

use std::ops::{Deref, DerefMut};

use myq3_common::q_shared::*;

use crate::vk_local::*;
use crate::vk_rmain::{
    r_local_normal_to_world, r_rotate_for_entity, r_rotate_for_viewer, r_transform_model_to_clip,
};
use crate::vk_surface::{r_plane_for_surface, rb_tessellate_surface, Tess};

/// A portal camera entity must sit within this distance of the surface plane.
pub const PORTAL_MATCH_TOLERANCE: f32 = 64.0;

/// Nearest-vertex distance used before any vertex has been seen.
const SHORTEST_UNSET: f32 = 100_000_000.0;

// ============================================================
// Mirror transforms
// ============================================================

/// Map a world point seen relative to `surface` to the same relative
/// position around `camera`.
pub fn r_mirror_point(v: &Vec3, surface: &Orientation, camera: &Orientation) -> Vec3 {
    let local = vector_subtract(v, &surface.origin);
    let mut transformed = VEC3_ORIGIN;
    for i in 0..3 {
        let d = dot_product(&local, &surface.axis[i]);
        transformed = vector_ma(&transformed, d, &camera.axis[i]);
    }
    vector_add(&transformed, &camera.origin)
}

/// Direction-only form of [`r_mirror_point`].
pub fn r_mirror_vector(v: &Vec3, surface: &Orientation, camera: &Orientation) -> Vec3 {
    let mut out = VEC3_ORIGIN;
    for i in 0..3 {
        let d = dot_product(v, &surface.axis[i]);
        out = vector_ma(&out, d, &camera.axis[i]);
    }
    out
}

// ============================================================
// Portal orientations
// ============================================================

/// Orthonormal frame whose first axis is the surface normal.
pub fn r_portal_surface_axes(normal: &Vec3) -> [Vec3; 3] {
    let mut axis1 = VEC3_ORIGIN;
    perpendicular_vector(&mut axis1, normal);
    [*normal, axis1, cross_product(normal, &axis1)]
}

/// Optional roll of a portal camera about its view direction.
///
/// Decoded from the entity animation fields: `oldframe` enables
/// animation, `frame` is a spin speed in degrees per second, and
/// `skin_num` is an angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortalRotation {
    None,
    Fixed(f32),
    Spin { speed: f32 },
    Bob { offset: f32 },
}

impl PortalRotation {
    pub fn from_entity(ent: &RefEntity) -> Self {
        if ent.oldframe != 0 {
            if ent.frame != 0 {
                PortalRotation::Spin { speed: ent.frame as f32 }
            } else {
                PortalRotation::Bob { offset: ent.skin_num as f32 }
            }
        } else if ent.skin_num != 0 {
            PortalRotation::Fixed(ent.skin_num as f32)
        } else {
            PortalRotation::None
        }
    }

    /// Roll in degrees at scene time `time` (milliseconds).
    pub fn angle(&self, time: i32) -> Option<f32> {
        match *self {
            PortalRotation::None => None,
            PortalRotation::Fixed(degrees) => Some(degrees),
            PortalRotation::Spin { speed } => Some((time as f32 / 1000.0) * speed),
            PortalRotation::Bob { offset } => Some(offset + (time as f32 * 0.003).sin() * 4.0),
        }
    }
}

/// The two frames a portal view is built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalOrientations {
    pub surface: Orientation,
    pub camera: Orientation,
    pub pvs_origin: Vec3,
    pub mirror: bool,
}

/// World space plane of a portal surface, plus the plane used to match
/// portal entities (translated by the owning entity but not rotated).
fn r_portal_planes(tr: &TrGlobals, draw_surf: &DrawSurf, entity_num: usize) -> (CPlane, CPlane) {
    let mut original = r_plane_for_surface(&draw_surf.surface);

    let Some(ent) = tr.owning_entity(entity_num) else {
        return (original, original);
    };

    let or = r_rotate_for_entity(ent, &tr.view_parms);
    let normal = r_local_normal_to_world(&original.normal, &or);
    let plane = CPlane::new(normal, original.dist + dot_product(&normal, &or.origin));
    original.dist += dot_product(&original.normal, &or.origin);
    (plane, original)
}

/// First portal surface entity in entity order lying near `plane`.
fn r_find_portal_entity<'a>(tr: &'a TrGlobals, plane: &CPlane) -> Option<&'a RefEntity> {
    tr.refdef.entities.iter().filter(|e| e.is_portal_surface()).find(|e| {
        let d = plane.distance_to(&e.origin);
        !(d > PORTAL_MATCH_TOLERANCE || d < -PORTAL_MATCH_TOLERANCE)
    })
}

/// A portal entity whose camera origin equals its own origin is a mirror.
fn entity_is_mirror(ent: &RefEntity) -> bool {
    vector_compare(&ent.oldorigin, &ent.origin)
}

/// R_GetPortalOrientations
///
/// `entity_num` is the entity the portal surface belongs to, which may be
/// moving and rotating. Returns `None` when no portal entity matches the
/// surface; this happens when prediction shows a portal surface before
/// the server has sent its entity, so nothing is printed.
pub fn r_get_portal_orientations(
    tr: &TrGlobals,
    draw_surf: &DrawSurf,
    entity_num: usize,
) -> Option<PortalOrientations> {
    let (plane, original_plane) = r_portal_planes(tr, draw_surf, entity_num);

    let mut surface = Orientation {
        origin: VEC3_ORIGIN,
        axis: r_portal_surface_axes(&plane.normal),
    };

    let ent = r_find_portal_entity(tr, &original_plane)?;
    let pvs_origin = ent.oldorigin;

    if entity_is_mirror(ent) {
        surface.origin = vector_scale(&plane.normal, plane.dist);
        let camera = Orientation {
            origin: surface.origin,
            axis: [vector_negate(&surface.axis[0]), surface.axis[1], surface.axis[2]],
        };
        return Some(PortalOrientations { surface, camera, pvs_origin, mirror: true });
    }

    // project the origin onto the surface plane to get
    // an origin point we can rotate around
    let d = plane.distance_to(&ent.origin);
    surface.origin = vector_ma(&ent.origin, -d, &surface.axis[0]);

    // the camera looks back the way the portal entity faces
    let mut camera = Orientation {
        origin: ent.oldorigin,
        axis: [vector_negate(&ent.axis[0]), vector_negate(&ent.axis[1]), ent.axis[2]],
    };

    if let Some(degrees) = PortalRotation::from_entity(ent).angle(tr.refdef.time) {
        let forward = camera.axis[0];
        let transformed = camera.axis[1];
        rotate_point_around_vector(&mut camera.axis[1], &forward, &transformed, degrees);
        camera.axis[2] = cross_product(&camera.axis[0], &camera.axis[1]);
    }

    Some(PortalOrientations { surface, camera, pvs_origin, mirror: false })
}

/// Whether the portal entity matching this surface is a mirror.
pub fn is_mirror(tr: &TrGlobals, draw_surf: &DrawSurf, entity_num: usize) -> bool {
    let (_, original_plane) = r_portal_planes(tr, draw_surf, entity_num);
    r_find_portal_entity(tr, &original_plane).is_some_and(entity_is_mirror)
}

// ============================================================
// Offscreen test
// ============================================================

bitflags::bitflags! {
    /// Clip space half-spaces a vertex lies outside of.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ClipFlags: u32 {
        const X_POS = 0x01;
        const X_NEG = 0x02;
        const Y_POS = 0x04;
        const Y_NEG = 0x08;
        const Z_POS = 0x10;
        const Z_NEG = 0x20;
    }
}

pub fn r_clip_flags(clip: &Vec4) -> ClipFlags {
    let mut flags = ClipFlags::empty();
    for j in 0..3 {
        if clip[j] >= clip[3] {
            flags |= ClipFlags::from_bits_retain(1 << (j * 2));
        } else if clip[j] <= -clip[3] {
            flags |= ClipFlags::from_bits_retain(1 << (j * 2 + 1));
        }
    }
    flags
}

/// Clip flags shared by every vertex and seen on any vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipAccum {
    pub point_and: ClipFlags,
    pub point_or: ClipFlags,
}

/// Project the tessellated vertexes into `clip_dest` and accumulate
/// their clip flags.
pub fn r_clip_tess(
    tess: &Tess,
    model_matrix: &[f32; 16],
    projection_matrix: &[f32; 16],
    clip_dest: &mut [Vec4; MAX_PORTAL_VERTEXES],
) -> ClipAccum {
    assert!(
        tess.num_vertexes() < MAX_PORTAL_VERTEXES,
        "portal surface tessellated to {} vertexes",
        tess.num_vertexes()
    );

    let mut accum = ClipAccum { point_and: ClipFlags::all(), point_or: ClipFlags::empty() };
    for (i, xyz) in tess.xyz.iter().enumerate() {
        let (_, clip) = r_transform_model_to_clip(&[xyz[0], xyz[1], xyz[2]], model_matrix, projection_matrix);
        clip_dest[i] = clip;

        let flags = r_clip_flags(&clip);
        accum.point_and &= flags;
        accum.point_or |= flags;
    }
    accum
}

/// SurfIsOffscreen
///
/// Re-tessellates the surface into `tess` and decides whether it can be
/// skipped: entirely outside one clip plane, entirely back facing, or a
/// portal farther away than its shader's portal range. Mirrors are never
/// range culled.
pub fn surf_is_offscreen(
    tr: &TrGlobals,
    draw_surf: &DrawSurf,
    tess: &mut Tess,
    clip_dest: &mut [Vec4; MAX_PORTAL_VERTEXES],
) -> bool {
    // the out of band tessellation would race the smp back end
    if tr.config.smp_active {
        return false;
    }

    let or = r_rotate_for_viewer(&tr.view_parms);
    let key = r_decompose_sort(draw_surf.sort);
    let shader = tr.shader(key.shader_index);

    tess.begin_surface();
    rb_tessellate_surface(&draw_surf.surface, tess);

    let accum = r_clip_tess(tess, &or.model_matrix, &tr.view_parms.projection_matrix, clip_dest);

    // trivially reject
    if !accum.point_and.is_empty() {
        return true;
    }

    // determine if this surface is backfaced and also determine the distance
    // to the nearest vertex so we can cull based on portal range
    let mut shortest = SHORTEST_UNSET;
    let mut num_triangles = tess.num_indexes() / 3;
    for tri in tess.indexes.chunks_exact(3) {
        let first = tri[0] as usize;
        let normal = vector_subtract(&tess.xyz3(first), &tr.view_parms.or.origin);

        let len = vector_length_squared(&normal);
        if len < shortest {
            shortest = len;
        }

        if dot_product(&normal, &tess.normal3(first)) >= 0.0 {
            num_triangles -= 1;
        }
    }
    if num_triangles == 0 {
        return true;
    }

    if is_mirror(tr, draw_surf, key.entity_num) {
        return false;
    }

    shortest > shader.portal_range * shader.portal_range
}

// ============================================================
// Portal views
// ============================================================

/// Holds the renderer while a portal view is installed and puts the
/// enclosing view back when dropped.
pub struct PortalViewScope<'a> {
    tr: &'a mut TrGlobals,
    saved: ViewParms,
}

impl<'a> PortalViewScope<'a> {
    pub fn enter(tr: &'a mut TrGlobals) -> Self {
        let saved = tr.view_parms.clone();
        Self { tr, saved }
    }

    /// The view that will be restored.
    pub fn saved(&self) -> &ViewParms {
        &self.saved
    }
}

impl Deref for PortalViewScope<'_> {
    type Target = TrGlobals;

    fn deref(&self) -> &TrGlobals {
        &*self.tr
    }
}

impl DerefMut for PortalViewScope<'_> {
    fn deref_mut(&mut self) -> &mut TrGlobals {
        &mut *self.tr
    }
}

impl Drop for PortalViewScope<'_> {
    fn drop(&mut self) {
        self.tr.view_parms = std::mem::take(&mut self.saved);
    }
}

/// R_MirrorViewBySurface
///
/// Renders the view seen through a portal or mirror surface.
/// Returns true if another view has been rendered.
pub fn r_mirror_view_by_surface(
    tr: &mut TrGlobals,
    draw_surf: &DrawSurf,
    entity_num: usize,
    renderer: &mut dyn SceneRenderer,
) -> bool {
    // don't recursively mirror
    let Some(depth) = tr.view_parms.depth.descend() else {
        vid_printf(PRINT_DEVELOPER, "WARNING: recursive mirror/portal found\n");
        return false;
    };

    if tr.cvars.r_noportals != 0 || tr.cvars.r_fastsky == 1 {
        return false;
    }

    // trivially reject portal/mirror
    let mut tess = Tess::new();
    let mut clip_dest = [[0.0f32; 4]; MAX_PORTAL_VERTEXES];
    if surf_is_offscreen(tr, draw_surf, &mut tess, &mut clip_dest) {
        return false;
    }

    let mut scope = PortalViewScope::enter(tr);
    let old_parms = scope.saved();

    let Some(orient) = r_get_portal_orientations(&scope, draw_surf, entity_num) else {
        return false; // bad portal, no portal entity
    };
    let (surface, camera) = (&orient.surface, &orient.camera);

    let mut new_parms = old_parms.clone();
    new_parms.depth = depth;
    new_parms.is_mirror = orient.mirror;
    new_parms.pvs_origin = orient.pvs_origin;
    new_parms.or.origin = r_mirror_point(&old_parms.or.origin, surface, camera);

    let normal = vector_negate(&camera.axis[0]);
    new_parms.portal_plane = CPlane::new(normal, dot_product(&camera.origin, &normal));

    for i in 0..3 {
        new_parms.or.axis[i] = r_mirror_vector(&old_parms.or.axis[i], surface, camera);
    }

    scope.view_parms = new_parms;
    renderer.render_view(&mut scope);

    true
}

// ============================================================
// Tests
// ============================================================

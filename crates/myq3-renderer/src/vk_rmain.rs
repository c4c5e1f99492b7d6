// Copyright (C) 1997-2001 Id Software, Inc.
// GPL-2.0-or-later
//
// vk_rmain.rs — view setup, coordinate transforms, draw surface sorting

use myq3_common::common::com_error;
use myq3_common::q_shared::*;

use crate::vk_local::*;
use crate::vk_mirror::r_mirror_view_by_surface;

/// Converts from our coordinate system (looking down X)
/// to OpenGL's coordinate system (looking down -Z).
pub const FLIP_MATRIX: [f32; 16] = [
    0.0, 0.0, -1.0, 0.0,
    -1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

const PLANE_NON_AXIAL: u8 = 3;

/// Result of a bounding volume test against the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cull {
    /// Completely unclipped.
    In,
    /// Clipped by one or more planes.
    Clip,
    /// Completely outside the clipping planes.
    Out,
}

// ============================================================
// Matrix helpers
// ============================================================

/// Column-major 4x4 multiply: `a` applied after `b`.
pub fn my_gl_mult_matrix(a: &[f32; 16], b: &[f32; 16]) -> [f32; 16] {
    let mut out = [0.0f32; 16];
    for i in 0..4 {
        for j in 0..4 {
            out[i * 4 + j] = a[i * 4] * b[j]
                + a[i * 4 + 1] * b[4 + j]
                + a[i * 4 + 2] * b[8 + j]
                + a[i * 4 + 3] * b[12 + j];
        }
    }
    out
}

/// Transform a model space point into eye space and clip space.
pub fn r_transform_model_to_clip(src: &Vec3, model_matrix: &[f32; 16], projection_matrix: &[f32; 16]) -> (Vec4, Vec4) {
    let mut eye = [0.0f32; 4];
    for i in 0..4 {
        eye[i] = src[0] * model_matrix[i]
            + src[1] * model_matrix[i + 4]
            + src[2] * model_matrix[i + 8]
            + model_matrix[i + 12];
    }

    let mut clip = [0.0f32; 4];
    for i in 0..4 {
        clip[i] = eye[0] * projection_matrix[i]
            + eye[1] * projection_matrix[i + 4]
            + eye[2] * projection_matrix[i + 8]
            + eye[3] * projection_matrix[i + 12];
    }
    (eye, clip)
}

pub fn r_local_normal_to_world(local: &Vec3, or: &OrientationR) -> Vec3 {
    let mut world = VEC3_ORIGIN;
    for i in 0..3 {
        world[i] = local[0] * or.axis[0][i] + local[1] * or.axis[1][i] + local[2] * or.axis[2][i];
    }
    world
}

pub fn r_local_point_to_world(local: &Vec3, or: &OrientationR) -> Vec3 {
    let rotated = r_local_normal_to_world(local, or);
    vector_add(&rotated, &or.origin)
}

// ============================================================
// R_RotateForViewer
// Sets up the world-to-eye matrix for the view's orientation.
// ============================================================
pub fn r_rotate_for_viewer(view: &ViewParms) -> OrientationR {
    let origin = view.or.origin;
    let axis = &view.or.axis;

    let mut viewer = [0.0f32; 16];
    for row in 0..3 {
        viewer[row] = axis[row][0];
        viewer[row + 4] = axis[row][1];
        viewer[row + 8] = axis[row][2];
        viewer[row + 12] = -origin[0] * viewer[row] - origin[1] * viewer[row + 4] - origin[2] * viewer[row + 8];
    }
    viewer[15] = 1.0;

    // world space itself sits at the origin; only the viewer moves
    OrientationR {
        origin: VEC3_ORIGIN,
        axis: AXIS_DEFAULT,
        view_origin: origin,
        model_matrix: my_gl_mult_matrix(&viewer, &FLIP_MATRIX),
    }
}

// ============================================================
// R_RotateForEntity
// Only model entities carry their own orientation; everything
// else is drawn in world space.
// ============================================================
pub fn r_rotate_for_entity(ent: &RefEntity, view: &ViewParms) -> OrientationR {
    if ent.re_type != RefEntityType::Model {
        return view.world;
    }

    let axis = ent.axis;
    let origin = ent.origin;
    let gl_matrix = [
        axis[0][0], axis[0][1], axis[0][2], 0.0,
        axis[1][0], axis[1][1], axis[1][2], 0.0,
        axis[2][0], axis[2][1], axis[2][2], 0.0,
        origin[0], origin[1], origin[2], 1.0,
    ];

    // calculate the viewer origin in the model's space
    // needed for fog, specular, and environment mapping
    let delta = vector_subtract(&view.or.origin, &origin);

    // compensate for scale in the axes if necessary
    let axis_length = if ent.non_normalized_axes {
        let len = vector_length(&axis[0]);
        if len != 0.0 { 1.0 / len } else { 1.0 }
    } else {
        1.0
    };

    OrientationR {
        origin,
        axis,
        view_origin: [
            dot_product(&delta, &axis[0]) * axis_length,
            dot_product(&delta, &axis[1]) * axis_length,
            dot_product(&delta, &axis[2]) * axis_length,
        ],
        model_matrix: my_gl_mult_matrix(&gl_matrix, &view.world.model_matrix),
    }
}

// ============================================================
// Projection and frustum
// ============================================================

pub fn r_setup_projection(view: &mut ViewParms, z_near: f32) {
    let z_far = view.z_far;

    let ymax = z_near * (view.fov_y.to_radians() * 0.5).tan();
    let ymin = -ymax;
    let xmax = z_near * (view.fov_x.to_radians() * 0.5).tan();
    let xmin = -xmax;

    let width = xmax - xmin;
    let height = ymax - ymin;
    let depth = z_far - z_near;

    let m = &mut view.projection_matrix;
    m[0] = 2.0 * z_near / width;
    m[4] = 0.0;
    m[8] = (xmax + xmin) / width;
    m[12] = 0.0;

    m[1] = 0.0;
    m[5] = 2.0 * z_near / height;
    m[9] = (ymax + ymin) / height;
    m[13] = 0.0;

    m[2] = 0.0;
    m[6] = 0.0;
    m[10] = -(z_far + z_near) / depth;
    m[14] = -2.0 * z_far * z_near / depth;

    m[3] = 0.0;
    m[7] = 0.0;
    m[11] = -1.0;
    m[15] = 0.0;
}

pub fn signbits_for_plane(out: &CPlane) -> u8 {
    let mut bits = 0u8;
    for j in 0..3 {
        if out.normal[j] < 0.0 {
            bits |= 1 << j;
        }
    }
    bits
}

/// Side planes of the view frustum, normals pointing inward.
pub fn r_setup_frustum(view: &mut ViewParms) {
    let axis = view.or.axis;

    let (xs, xc) = (view.fov_x.to_radians() * 0.5).sin_cos();
    let (ys, yc) = (view.fov_y.to_radians() * 0.5).sin_cos();

    let forward_x = vector_scale(&axis[0], xs);
    let forward_y = vector_scale(&axis[0], ys);
    view.frustum[0].normal = vector_ma(&forward_x, xc, &axis[1]);
    view.frustum[1].normal = vector_ma(&forward_x, -xc, &axis[1]);
    view.frustum[2].normal = vector_ma(&forward_y, yc, &axis[2]);
    view.frustum[3].normal = vector_ma(&forward_y, -yc, &axis[2]);

    for plane in view.frustum.iter_mut() {
        plane.plane_type = PLANE_NON_AXIAL;
        plane.dist = dot_product(&view.or.origin, &plane.normal);
        plane.signbits = signbits_for_plane(plane);
    }
}

/// Everything a scene renderer needs before drawing a view.
pub fn r_setup_view(view: &mut ViewParms, z_near: f32) {
    view.world = r_rotate_for_viewer(view);
    r_setup_frustum(view);
    r_setup_projection(view, z_near);
}

// ============================================================
// Culling against the view
// ============================================================

fn cull_against_plane(plane: &CPlane, pt: &Vec3, radius: f32, might_be_clipped: &mut bool) -> bool {
    let dist = plane.distance_to(pt);
    if dist < -radius {
        return true;
    }
    if dist <= radius {
        *might_be_clipped = true;
    }
    false
}

/// Sphere test against the frustum, and against the portal plane
/// when drawing a portal view.
pub fn r_cull_point_and_radius(view: &ViewParms, pt: &Vec3, radius: f32) -> Cull {
    let mut might_be_clipped = false;

    for plane in &view.frustum {
        if cull_against_plane(plane, pt, radius, &mut might_be_clipped) {
            return Cull::Out;
        }
    }

    if view.is_portal() && cull_against_plane(&view.portal_plane, pt, radius, &mut might_be_clipped) {
        return Cull::Out;
    }

    if might_be_clipped {
        Cull::Clip
    } else {
        Cull::In
    }
}

/// Eye space clip plane equation for the portal plane of a portal view,
/// in the form handed to the back end's user clip plane.
pub fn r_portal_clip_plane(view: &ViewParms) -> Option<[f64; 4]> {
    if !view.is_portal() {
        return None;
    }
    let normal = &view.portal_plane.normal;
    let plane = [
        dot_product(&view.or.axis[0], normal) as f64,
        dot_product(&view.or.axis[1], normal) as f64,
        dot_product(&view.or.axis[2], normal) as f64,
        (dot_product(normal, &view.or.origin) - view.portal_plane.dist) as f64,
    ];
    Some([-plane[1], plane[2], -plane[0], plane[3]])
}

// ============================================================
// R_SortDrawSurfs
// ============================================================

/// What the caller should do with the main view's surfaces after the
/// portal pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePass {
    /// Submit the sorted surfaces as usual.
    Draw,
    /// r_portalOnly is set and a portal view was drawn: skip the main view.
    PortalOnly,
}

/// Sort the view's surfaces and render at most one portal view for the
/// portal surfaces at the front of the list.
pub fn r_sort_draw_surfs(
    tr: &mut TrGlobals,
    draw_surfs: &mut [DrawSurf],
    renderer: &mut dyn SceneRenderer,
) -> SurfacePass {
    if draw_surfs.is_empty() {
        return SurfacePass::Draw;
    }

    draw_surfs.sort_by_key(|surf| surf.sort);

    // check for any pass through drawing, which
    // may cause another view to be rendered first
    for draw_surf in draw_surfs.iter() {
        let key = r_decompose_sort(draw_surf.sort);
        let shader = tr.shader(key.shader_index);

        if shader.sort > SS_PORTAL {
            break;
        }

        // no shader should ever have this sort type
        if shader.sort == SS_BAD {
            com_error(ERR_DROP, &format!("Shader '{}' with sort == SS_BAD", shader.name));
            continue;
        }

        // if the mirror was completely clipped away, we may need to check another surface
        if r_mirror_view_by_surface(tr, draw_surf, key.entity_num, renderer) {
            // this is a debug option to see exactly what is being mirrored
            if tr.cvars.r_portal_only != 0 {
                return SurfacePass::PortalOnly;
            }
            break; // only one mirror view at a time
        }
    }

    SurfacePass::Draw
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vk_surface::{DrawVert, SurfaceGeometry};

    const EPS: f32 = 1e-4;

    fn primary_view() -> ViewParms {
        let mut view = ViewParms::new(VEC3_ORIGIN, AXIS_DEFAULT, 90.0, 90.0, 640, 640);
        r_setup_view(&mut view, 4.0);
        view
    }

    // ============================================================
    // Matrices
    // ============================================================

    #[test]
    fn test_mult_identity() {
        let m = my_gl_mult_matrix(&IDENTITY_MATRIX, &FLIP_MATRIX);
        assert_eq!(m, FLIP_MATRIX);
        let m = my_gl_mult_matrix(&FLIP_MATRIX, &IDENTITY_MATRIX);
        assert_eq!(m, FLIP_MATRIX);
    }

    #[test]
    fn test_viewer_looks_down_negative_z() {
        let view = primary_view();
        let (eye, clip) = r_transform_model_to_clip(&[100.0, 0.0, 0.0], &view.world.model_matrix, &view.projection_matrix);
        assert!((eye[2] + 100.0).abs() < EPS);
        assert!(eye[0].abs() < EPS && eye[1].abs() < EPS);
        assert!((clip[3] - 100.0).abs() < EPS);
    }

    #[test]
    fn test_viewer_eye_space_axes() {
        // left (+Y) maps to -X in eye space, up (+Z) to +Y
        let view = primary_view();
        let (eye, _) = r_transform_model_to_clip(&[0.0, 10.0, 5.0], &view.world.model_matrix, &view.projection_matrix);
        assert!((eye[0] + 10.0).abs() < EPS);
        assert!((eye[1] - 5.0).abs() < EPS);
        assert_eq!(eye[3], 1.0);
    }

    #[test]
    fn test_viewer_translation() {
        let mut view = ViewParms::new([50.0, 0.0, 0.0], AXIS_DEFAULT, 90.0, 90.0, 640, 480);
        r_setup_view(&mut view, 4.0);
        let (eye, _) = r_transform_model_to_clip(&[150.0, 0.0, 0.0], &view.world.model_matrix, &view.projection_matrix);
        assert!((eye[2] + 100.0).abs() < EPS);

        // the world frame stays at the origin, the viewer is only in view_origin
        assert_eq!(view.world.origin, VEC3_ORIGIN);
        assert_eq!(view.world.axis, AXIS_DEFAULT);
        assert_eq!(view.world.view_origin, [50.0, 0.0, 0.0]);
    }

    #[test]
    fn test_projection_edges_at_90_fov() {
        let view = primary_view();
        // 45 degrees to the right sits exactly on the x = w boundary
        let (_, clip) = r_transform_model_to_clip(&[100.0, -100.0, 0.0], &view.world.model_matrix, &view.projection_matrix);
        assert!((clip[0] - clip[3]).abs() < 1e-3);
        // near plane maps to z = -w
        let (_, clip) = r_transform_model_to_clip(&[4.0, 0.0, 0.0], &view.world.model_matrix, &view.projection_matrix);
        assert!((clip[2] + clip[3]).abs() < 1e-3);
    }

    // ============================================================
    // Entities
    // ============================================================

    #[test]
    fn test_rotate_for_entity_non_model_uses_world() {
        let view = primary_view();
        let ent = RefEntity { re_type: RefEntityType::PortalSurface, origin: [5.0, 5.0, 5.0], ..Default::default() };
        assert_eq!(r_rotate_for_entity(&ent, &view), view.world);
    }

    #[test]
    fn test_rotate_for_entity_model() {
        let view = primary_view();
        let ent = RefEntity {
            origin: [10.0, 0.0, 0.0],
            axis: [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            ..Default::default()
        };
        let or = r_rotate_for_entity(&ent, &view);
        assert_eq!(or.origin, [10.0, 0.0, 0.0]);
        // the viewer sits on the model's +Y side
        assert!((or.view_origin[0] - 0.0).abs() < EPS);
        assert!((or.view_origin[1] - 10.0).abs() < EPS);

        // model +X points down world +Y
        let world = r_local_point_to_world(&[1.0, 0.0, 0.0], &or);
        assert!((world[0] - 10.0).abs() < EPS && (world[1] - 1.0).abs() < EPS);

        // model matrix agrees with the local-to-world helpers
        let (eye, _) = r_transform_model_to_clip(&[1.0, 0.0, 0.0], &or.model_matrix, &view.projection_matrix);
        let (eye_world, _) = r_transform_model_to_clip(&world, &view.world.model_matrix, &view.projection_matrix);
        for i in 0..4 {
            assert!((eye[i] - eye_world[i]).abs() < EPS);
        }
    }

    #[test]
    fn test_rotate_for_entity_scaled_axes() {
        let view = primary_view();
        let ent = RefEntity {
            origin: [-4.0, 0.0, 0.0],
            axis: [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]],
            non_normalized_axes: true,
            ..Default::default()
        };
        let or = r_rotate_for_entity(&ent, &view);
        assert!((or.view_origin[0] - 4.0).abs() < EPS);
    }

    #[test]
    fn test_local_normal_to_world() {
        let or = OrientationR {
            axis: [[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]],
            ..Default::default()
        };
        let n = r_local_normal_to_world(&[1.0, 0.0, 0.0], &or);
        assert_eq!(n, [0.0, 0.0, 1.0]);
    }

    // ============================================================
    // Frustum and culling
    // ============================================================

    #[test]
    fn test_frustum_planes_face_inward() {
        let view = primary_view();
        for plane in &view.frustum {
            assert!(plane.distance_to(&[100.0, 0.0, 0.0]) > 0.0);
            assert!((vector_length(&plane.normal) - 1.0).abs() < EPS);
        }
        assert_eq!(r_cull_point_and_radius(&view, &[100.0, 0.0, 0.0], 1.0), Cull::In);
        assert_eq!(r_cull_point_and_radius(&view, &[-100.0, 0.0, 0.0], 1.0), Cull::Out);
        assert_eq!(r_cull_point_and_radius(&view, &[100.0, -100.0, 0.0], 8.0), Cull::Clip);
    }

    #[test]
    fn test_signbits() {
        let plane = CPlane::new([-1.0, 0.5, -0.2], 0.0);
        assert_eq!(signbits_for_plane(&plane), 0b101);
    }

    #[test]
    fn test_portal_plane_culls_only_portal_views() {
        let mut view = primary_view();
        view.portal_plane = CPlane::new([1.0, 0.0, 0.0], 50.0);
        let behind = [20.0, 0.0, 0.0];
        assert_eq!(r_cull_point_and_radius(&view, &behind, 1.0), Cull::In);
        assert!(r_portal_clip_plane(&view).is_none());

        view.depth = ViewDepth::Portal;
        assert_eq!(r_cull_point_and_radius(&view, &behind, 1.0), Cull::Out);
        assert_eq!(r_cull_point_and_radius(&view, &[200.0, 0.0, 0.0], 1.0), Cull::In);
    }

    #[test]
    fn test_portal_clip_plane_matches_world_plane() {
        let mut view = ViewParms::new(
            [10.0, -20.0, 5.0],
            [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            90.0, 73.74, 640, 480,
        );
        r_setup_view(&mut view, 4.0);
        view.depth = ViewDepth::Portal;
        view.portal_plane = CPlane::new([0.0, 0.6, 0.8], 3.0);
        let eq = r_portal_clip_plane(&view).unwrap();

        for p in [[0.0, 0.0, 0.0], [7.0, 30.0, -2.0], [-15.0, 4.0, 40.0]] {
            let (eye, _) = r_transform_model_to_clip(&p, &view.world.model_matrix, &view.projection_matrix);
            let eye_side = eq[0] * eye[0] as f64 + eq[1] * eye[1] as f64 + eq[2] * eye[2] as f64 + eq[3];
            let world_side = view.portal_plane.distance_to(&p) as f64;
            assert!((eye_side - world_side).abs() < 1e-3, "{} vs {}", eye_side, world_side);
        }
    }

    // ============================================================
    // r_sort_draw_surfs
    // ============================================================

    struct CountingRenderer {
        views: usize,
    }

    impl SceneRenderer for CountingRenderer {
        fn render_view(&mut self, tr: &mut TrGlobals) {
            assert!(tr.view_parms.is_portal());
            self.views += 1;
        }
    }

    fn mirror_tr() -> TrGlobals {
        let mut tr = TrGlobals::default();
        tr.view_parms = primary_view();
        tr.shaders.push(Shader { name: "broken".into(), sort: SS_BAD, portal_range: 0.0 });
        tr.shaders.push(Shader::portal("textures/common/mirror", 256.0));
        tr.shaders.push(Shader::default());
        tr.refdef.entities.push(RefEntity {
            re_type: RefEntityType::PortalSurface,
            origin: [100.0, 0.0, 0.0],
            oldorigin: [100.0, 0.0, 0.0],
            ..Default::default()
        });
        tr
    }

    fn mirror_surface() -> SurfaceGeometry {
        let verts = [[100.0, 8.0, -8.0], [100.0, -8.0, -8.0], [100.0, -8.0, 8.0], [100.0, 8.0, 8.0]]
            .iter()
            .map(|p| DrawVert::new(*p, [-1.0, 0.0, 0.0]))
            .collect();
        SurfaceGeometry::Face {
            plane: CPlane::new([-1.0, 0.0, 0.0], -100.0),
            verts,
            indexes: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn test_sort_draw_surfs_renders_one_portal_view() {
        let mut tr = mirror_tr();
        let before = tr.view_parms.clone();
        let mut surfs = vec![
            DrawSurf::new(2, REFENTITYNUM_WORLD, SurfaceGeometry::Bad),
            DrawSurf::new(1, REFENTITYNUM_WORLD, mirror_surface()),
            DrawSurf::new(1, REFENTITYNUM_WORLD, mirror_surface()),
        ];
        let mut renderer = CountingRenderer { views: 0 };
        assert_eq!(r_sort_draw_surfs(&mut tr, &mut surfs, &mut renderer), SurfacePass::Draw);
        assert_eq!(renderer.views, 1);
        assert_eq!(tr.view_parms, before);
        assert_eq!(r_decompose_sort(surfs[0].sort).shader_index, 1);
        assert_eq!(r_decompose_sort(surfs[2].sort).shader_index, 2);
    }

    #[test]
    fn test_sort_draw_surfs_portal_only() {
        let mut tr = mirror_tr();
        tr.cvars.r_portal_only = 1;
        let mut surfs = vec![DrawSurf::new(1, REFENTITYNUM_WORLD, mirror_surface())];
        let mut renderer = CountingRenderer { views: 0 };
        assert_eq!(r_sort_draw_surfs(&mut tr, &mut surfs, &mut renderer), SurfacePass::PortalOnly);
        assert_eq!(renderer.views, 1);
    }

    #[test]
    fn test_sort_draw_surfs_skips_bad_shader() {
        let _console = CONSOLE_LOCK.lock();
        let mut tr = mirror_tr();
        let mut surfs = vec![
            DrawSurf::new(1, REFENTITYNUM_WORLD, mirror_surface()),
            DrawSurf::new(0, REFENTITYNUM_WORLD, mirror_surface()),
        ];
        let mut renderer = CountingRenderer { views: 0 };
        myq3_common::common::com_begin_redirect();
        assert_eq!(r_sort_draw_surfs(&mut tr, &mut surfs, &mut renderer), SurfacePass::Draw);
        let printed = myq3_common::common::com_end_redirect().unwrap();
        assert!(printed.contains("ERROR: Shader 'broken' with sort == SS_BAD"));
        assert_eq!(renderer.views, 1);
    }

    #[test]
    fn test_sort_draw_surfs_stops_at_opaque() {
        let mut tr = mirror_tr();
        // the opaque shader sorts first, ending the walk before the portal
        tr.shaders.swap(1, 2);
        let mut surfs = vec![
            DrawSurf::new(2, REFENTITYNUM_WORLD, mirror_surface()),
            DrawSurf::new(1, REFENTITYNUM_WORLD, mirror_surface()),
        ];
        let mut renderer = CountingRenderer { views: 0 };
        assert_eq!(r_sort_draw_surfs(&mut tr, &mut surfs, &mut renderer), SurfacePass::Draw);
        assert_eq!(renderer.views, 0);
    }

    #[test]
    fn test_sort_draw_surfs_empty() {
        let mut tr = mirror_tr();
        let mut renderer = CountingRenderer { views: 0 };
        assert_eq!(r_sort_draw_surfs(&mut tr, &mut [], &mut renderer), SurfacePass::Draw);
    }
}

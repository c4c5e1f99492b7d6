// Copyright (C) 1997-2001 Id Software, Inc.
// GPL-2.0-or-later
//
// q_shared.rs — foundational types and math shared by the engine and renderer

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];

pub const VEC3_ORIGIN: Vec3 = [0.0, 0.0, 0.0];

/// Identity axis set: forward (+X), left (+Y), up (+Z).
pub const AXIS_DEFAULT: [Vec3; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

// ============================================================
// Print / error levels
// ============================================================

pub const PRINT_ALL: i32 = 0;
pub const PRINT_DEVELOPER: i32 = 1;

pub const ERR_FATAL: i32 = 0;
pub const ERR_DROP: i32 = 1;

// ============================================================
// Cvar flags
// ============================================================

pub const CVAR_ARCHIVE: i32 = 1;
pub const CVAR_INIT: i32 = 16;
pub const CVAR_ROM: i32 = 64;
pub const CVAR_CHEAT: i32 = 512;

// ============================================================
// Plane
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct CPlane {
    pub normal: Vec3,
    pub dist: f32,
    pub plane_type: u8,
    pub signbits: u8,
    pub pad: [u8; 2],
}

impl Default for CPlane {
    fn default() -> Self {
        Self {
            normal: [0.0; 3],
            dist: 0.0,
            plane_type: 0,
            signbits: 0,
            pad: [0; 2],
        }
    }
}

impl CPlane {
    pub fn new(normal: Vec3, dist: f32) -> Self {
        Self { normal, dist, ..Self::default() }
    }

    /// Signed distance from `point` to the plane, positive on the normal side.
    #[inline]
    pub fn distance_to(&self, point: &Vec3) -> f32 {
        dot_product(point, &self.normal) - self.dist
    }
}

// ============================================================
// Orientation
// ============================================================

/// orientation_t — an origin plus three axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub origin: Vec3,
    pub axis: [Vec3; 3],
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            origin: VEC3_ORIGIN,
            axis: AXIS_DEFAULT,
        }
    }
}

// ============================================================
// Render entities (refEntity_t)
// These are shared between the client and the renderer.
// ============================================================

/// refEntityType_t
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum RefEntityType {
    #[default]
    Model = 0,
    Poly = 1,
    Sprite = 2,
    Beam = 3,
    RailCore = 4,
    RailRings = 5,
    Lightning = 6,
    /// Doesn't draw anything, just info for portals.
    PortalSurface = 7,
}

/// refEntity_t — passed to the renderer for drawing.
///
/// Portal surface markers overload a few fields:
/// `oldorigin` is the camera origin (equal to `origin` for a mirror),
/// `oldframe` enables camera roll, `frame` is the roll speed and
/// `skin_num` the roll offset in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefEntity {
    pub re_type: RefEntityType,
    pub origin: Vec3,
    pub oldorigin: Vec3,
    pub axis: [Vec3; 3],
    /// Axis are not normalized, i.e. they have scale.
    pub non_normalized_axes: bool,
    pub frame: i32,
    pub oldframe: i32,
    pub skin_num: i32,
}

impl Default for RefEntity {
    fn default() -> Self {
        Self {
            re_type: RefEntityType::Model,
            origin: VEC3_ORIGIN,
            oldorigin: VEC3_ORIGIN,
            axis: AXIS_DEFAULT,
            non_normalized_axes: false,
            frame: 0,
            oldframe: 0,
            skin_num: 0,
        }
    }
}

impl RefEntity {
    pub fn is_portal_surface(&self) -> bool {
        self.re_type == RefEntityType::PortalSurface
    }
}

// ============================================================
// MATHLIB — Vector operations
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn vector_add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn vector_negate(v: &Vec3) -> Vec3 {
    [-v[0], -v[1], -v[2]]
}

/// veca + scale * vecb
#[inline]
pub fn vector_ma(veca: &Vec3, scale: f32, vecb: &Vec3) -> Vec3 {
    [
        veca[0] + scale * vecb[0],
        veca[1] + scale * vecb[1],
        veca[2] + scale * vecb[2],
    ]
}

#[inline]
pub fn vector_scale(v: &Vec3, scale: f32) -> Vec3 {
    [v[0] * scale, v[1] * scale, v[2] * scale]
}

/// Exact component-wise equality.
pub fn vector_compare(v1: &Vec3, v2: &Vec3) -> bool {
    v1[0] == v2[0] && v1[1] == v2[1] && v1[2] == v2[2]
}

pub fn vector_length(v: &Vec3) -> f32 {
    dot_product(v, v).sqrt()
}

#[inline]
pub fn vector_length_squared(v: &Vec3) -> f32 {
    dot_product(v, v)
}

/// Normalize in place, returns original length.
pub fn vector_normalize(v: &mut Vec3) -> f32 {
    let length = vector_length(v);
    if length != 0.0 {
        let ilength = 1.0 / length;
        v[0] *= ilength;
        v[1] *= ilength;
        v[2] *= ilength;
    }
    length
}

pub fn cross_product(v1: &Vec3, v2: &Vec3) -> Vec3 {
    [
        v1[1] * v2[2] - v1[2] * v2[1],
        v1[2] * v2[0] - v1[0] * v2[2],
        v1[0] * v2[1] - v1[1] * v2[0],
    ]
}

// ============================================================
// Matrix operations
// ============================================================

pub fn r_concat_rotations(in1: &[[f32; 3]; 3], in2: &[[f32; 3]; 3], out: &mut [[f32; 3]; 3]) {
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = in1[i][0] * in2[0][j] + in1[i][1] * in2[1][j] + in1[i][2] * in2[2][j];
        }
    }
}

// ============================================================
// Planes
// ============================================================

/// Plane through three points, or `None` if they are collinear.
/// The normal follows the engine's winding: `(c - a) x (b - a)`.
pub fn plane_from_points(a: &Vec3, b: &Vec3, c: &Vec3) -> Option<CPlane> {
    let d1 = vector_subtract(b, a);
    let d2 = vector_subtract(c, a);
    let mut normal = cross_product(&d2, &d1);
    if vector_normalize(&mut normal) == 0.0 {
        return None;
    }
    Some(CPlane::new(normal, dot_product(a, &normal)))
}

pub fn project_point_on_plane(dst: &mut Vec3, p: &Vec3, normal: &Vec3) {
    let inv_denom = 1.0 / dot_product(normal, normal);
    let d = dot_product(normal, p) * inv_denom;
    let n = vector_scale(normal, inv_denom);
    *dst = vector_ma(p, -d, &n);
}

/// Find a unit vector perpendicular to `src` (assumed normalized).
pub fn perpendicular_vector(dst: &mut Vec3, src: &Vec3) {
    // find the smallest magnitude axially aligned vector
    let mut min_elem: f32 = 1.0;
    let mut pos = 0;
    for (i, &c) in src.iter().enumerate() {
        if c.abs() < min_elem {
            pos = i;
            min_elem = c.abs();
        }
    }
    let mut tempvec = VEC3_ORIGIN;
    tempvec[pos] = 1.0;

    project_point_on_plane(dst, &tempvec, src);
    vector_normalize(dst);
}

/// Rotate `point` about the unit vector `dir` by `degrees`.
pub fn rotate_point_around_vector(dst: &mut Vec3, dir: &Vec3, point: &Vec3, degrees: f32) {
    let vf = *dir;
    let mut vr = VEC3_ORIGIN;
    perpendicular_vector(&mut vr, dir);
    let vup = cross_product(&vr, &vf);

    let mut m = [[0.0f32; 3]; 3];
    for i in 0..3 {
        m[i][0] = vr[i];
        m[i][1] = vup[i];
        m[i][2] = vf[i];
    }

    let mut im = m;
    im[0][1] = m[1][0];
    im[0][2] = m[2][0];
    im[1][0] = m[0][1];
    im[1][2] = m[2][1];
    im[2][0] = m[0][2];
    im[2][1] = m[1][2];

    let (sin, cos) = degrees.to_radians().sin_cos();
    let mut zrot = [[0.0f32; 3]; 3];
    zrot[2][2] = 1.0;
    zrot[0][0] = cos;
    zrot[0][1] = sin;
    zrot[1][0] = -sin;
    zrot[1][1] = cos;

    let mut tmpmat = [[0.0f32; 3]; 3];
    r_concat_rotations(&m, &zrot, &mut tmpmat);
    let mut rot = [[0.0f32; 3]; 3];
    r_concat_rotations(&tmpmat, &im, &mut rot);

    for i in 0..3 {
        dst[i] = rot[i][0] * point[0] + rot[i][1] * point[1] + rot[i][2] * point[2];
    }
}

// ============================================================
// Tests
// ============================================================

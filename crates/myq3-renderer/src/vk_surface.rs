// Copyright (C) 1997-2001 Id Software, Inc.
// GPL-2.0-or-later
//
// vk_surface.rs — surface geometry and back end tessellation

use bytemuck::{Pod, Zeroable};

use myq3_common::q_shared::*;

/// Initial capacity of the tessellation buffers.
pub const SHADER_MAX_VERTEXES: usize = 1000;
pub const SHADER_MAX_INDEXES: usize = 6 * SHADER_MAX_VERTEXES;

// ============================================================================
// Vertex formats
// ============================================================================

/// drawVert_t — vertex layout shared by faces and triangle soups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct DrawVert {
    pub xyz: Vec3,
    pub st: [f32; 2],
    pub lightmap: [f32; 2],
    pub normal: Vec3,
    pub color: [u8; 4],
}

impl DrawVert {
    pub fn new(xyz: Vec3, normal: Vec3) -> Self {
        Self { xyz, normal, ..Self::zeroed() }
    }
}

/// polyVert_t — client-submitted polygon vertex, no normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PolyVert {
    pub xyz: Vec3,
    pub st: [f32; 2],
    pub modulate: [u8; 4],
}

impl PolyVert {
    pub fn new(xyz: Vec3) -> Self {
        Self { xyz, ..Self::zeroed() }
    }
}

// ============================================================================
// Surfaces
// ============================================================================

/// The geometry behind a draw surface, one variant per surface kind.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceGeometry {
    /// Planar BSP face with a precomputed plane.
    Face {
        plane: CPlane,
        verts: Vec<DrawVert>,
        indexes: Vec<u32>,
    },
    /// Indexed triangle soup (misc_model, patches flattened to triangles).
    Triangles {
        verts: Vec<DrawVert>,
        indexes: Vec<u32>,
    },
    /// Convex polygon submitted by the client, drawn as a fan.
    Poly {
        verts: Vec<PolyVert>,
    },
    /// Unknown or missing geometry.
    Bad,
}

/// The plane used for surfaces whose geometry gives no usable plane.
pub fn default_surface_plane() -> CPlane {
    CPlane::new([1.0, 0.0, 0.0], 0.0)
}

/// Plane of a surface in its own (model) space.
///
/// Triangle soups and polys use their first three points; anything without
/// three usable points gets the default plane.
pub fn r_plane_for_surface(surface: &SurfaceGeometry) -> CPlane {
    let plane = match surface {
        SurfaceGeometry::Face { plane, .. } => return *plane,
        SurfaceGeometry::Triangles { verts, indexes } => {
            let corner = |i: usize| indexes.get(i).and_then(|&idx| verts.get(idx as usize));
            match (corner(0), corner(1), corner(2)) {
                (Some(v1), Some(v2), Some(v3)) => plane_from_points(&v1.xyz, &v2.xyz, &v3.xyz),
                _ => None,
            }
        }
        SurfaceGeometry::Poly { verts } => match verts.as_slice() {
            [v1, v2, v3, ..] => plane_from_points(&v1.xyz, &v2.xyz, &v3.xyz),
            _ => None,
        },
        SurfaceGeometry::Bad => None,
    };
    plane.unwrap_or_else(default_surface_plane)
}

// ============================================================================
// Tessellation
// ============================================================================

/// shaderCommands_t — the back end's vertex/index scratch.
#[derive(Debug, Clone)]
pub struct Tess {
    pub xyz: Vec<Vec4>,
    pub normal: Vec<Vec4>,
    pub indexes: Vec<u32>,
}

impl Default for Tess {
    fn default() -> Self {
        Self::new()
    }
}

impl Tess {
    pub fn new() -> Self {
        Self {
            xyz: Vec::with_capacity(SHADER_MAX_VERTEXES),
            normal: Vec::with_capacity(SHADER_MAX_VERTEXES),
            indexes: Vec::with_capacity(SHADER_MAX_INDEXES),
        }
    }

    /// RB_BeginSurface — empty the buffers, keeping their storage.
    pub fn begin_surface(&mut self) {
        self.xyz.clear();
        self.normal.clear();
        self.indexes.clear();
    }

    pub fn num_vertexes(&self) -> usize {
        self.xyz.len()
    }

    pub fn num_indexes(&self) -> usize {
        self.indexes.len()
    }

    fn push_vertex(&mut self, xyz: &Vec3, normal: &Vec3) {
        self.xyz.push([xyz[0], xyz[1], xyz[2], 1.0]);
        self.normal.push([normal[0], normal[1], normal[2], 0.0]);
    }

    /// Append whole triangles. Triangles naming a vertex past `num_verts`
    /// and a trailing partial triangle are dropped.
    fn push_indexes(&mut self, base: u32, indexes: &[u32], num_verts: usize) {
        for tri in indexes.chunks_exact(3) {
            if tri.iter().all(|&i| (i as usize) < num_verts) {
                self.indexes.extend(tri.iter().map(|&i| base + i));
            }
        }
    }

    /// Position of vertex `i` as a Vec3.
    pub fn xyz3(&self, i: usize) -> Vec3 {
        let v = &self.xyz[i];
        [v[0], v[1], v[2]]
    }

    pub fn normal3(&self, i: usize) -> Vec3 {
        let n = &self.normal[i];
        [n[0], n[1], n[2]]
    }
}

/// Append a surface's vertexes, normals and indexes to the tessellator.
pub fn rb_tessellate_surface(surface: &SurfaceGeometry, tess: &mut Tess) {
    let base = tess.num_vertexes() as u32;
    match surface {
        SurfaceGeometry::Face { plane, verts, indexes } => {
            for v in verts {
                tess.push_vertex(&v.xyz, &plane.normal);
            }
            tess.push_indexes(base, indexes, verts.len());
        }
        SurfaceGeometry::Triangles { verts, indexes } => {
            for v in verts {
                tess.push_vertex(&v.xyz, &v.normal);
            }
            tess.push_indexes(base, indexes, verts.len());
        }
        SurfaceGeometry::Poly { verts } => {
            let normal = r_plane_for_surface(surface).normal;
            for v in verts {
                tess.push_vertex(&v.xyz, &normal);
            }
            for i in 2..verts.len() as u32 {
                tess.push_indexes(base, &[0, i - 1, i], verts.len());
            }
        }
        SurfaceGeometry::Bad => {}
    }
}

// ============================================================================
// Tests
// ============================================================================

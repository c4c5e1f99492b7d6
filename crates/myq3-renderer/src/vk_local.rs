// Copyright (C) 1997-2001 Id Software, Inc.
// GPL-2.0-or-later
//
// vk_local.rs — renderer local definitions

use myq3_common::cvar::{with_cvar_ctx, CvarContext};
use myq3_common::q_shared::*;

use crate::vk_surface::SurfaceGeometry;

// ============================================================================
// Limits
// ============================================================================

pub const MAX_SHADERS: usize = 16384;

pub const REFENTITYNUM_BITS: u32 = 10;
pub const REFENTITYNUM_MASK: u32 = (1 << REFENTITYNUM_BITS) - 1;
/// Entity number used for world geometry, which has no owning entity.
pub const REFENTITYNUM_WORLD: usize = REFENTITYNUM_MASK as usize;

/// Upper bound on the tessellated vertex count of a portal surface.
pub const MAX_PORTAL_VERTEXES: usize = 128;

pub const DEFAULT_ZFAR: f32 = 4096.0;
pub const DEFAULT_PORTAL_RANGE: f32 = 256.0;

// ============================================================================
// Shaders
// ============================================================================

// Shader sort classes, in drawing order.
pub const SS_BAD: f32 = 0.0;
/// Mirrors, portals, viewscreens.
pub const SS_PORTAL: f32 = 1.0;
/// Sky box.
pub const SS_ENVIRONMENT: f32 = 2.0;
/// Opaque.
pub const SS_OPAQUE: f32 = 3.0;
/// Scorch marks, etc.
pub const SS_DECAL: f32 = 4.0;
/// Ladders, grates, grills that may have small blended edges.
pub const SS_SEE_THROUGH: f32 = 5.0;
pub const SS_BANNER: f32 = 6.0;
pub const SS_FOG: f32 = 7.0;
/// For items that should be drawn in front of the water plane.
pub const SS_UNDERWATER: f32 = 8.0;
pub const SS_BLEND0: f32 = 9.0;
pub const SS_NEAREST: f32 = 16.0;

/// The part of a shader the portal code looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    pub name: String,
    pub sort: f32,
    /// Distance beyond which a linked portal stops being rendered.
    pub portal_range: f32,
}

impl Default for Shader {
    fn default() -> Self {
        Self {
            name: String::from("<default>"),
            sort: SS_OPAQUE,
            portal_range: DEFAULT_PORTAL_RANGE,
        }
    }
}

impl Shader {
    pub fn portal(name: &str, portal_range: f32) -> Self {
        Self {
            name: name.to_string(),
            sort: SS_PORTAL,
            portal_range,
        }
    }
}

// ============================================================================
// Draw surface sort keys
//
// bits  0..2   dlight map
// bits  2..7   fog number
// bits  7..17  entity number
// bits 17..31  shader index
// ============================================================================

pub const QSORT_FOGNUM_SHIFT: u32 = 2;
pub const QSORT_REFENTITYNUM_SHIFT: u32 = 7;
pub const QSORT_SHADERNUM_SHIFT: u32 = QSORT_REFENTITYNUM_SHIFT + REFENTITYNUM_BITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub shader_index: usize,
    pub entity_num: usize,
    pub fog_num: usize,
    pub dlight_map: u32,
}

pub fn r_compose_sort(shader_index: usize, entity_num: usize, fog_num: usize, dlight_map: u32) -> u32 {
    ((shader_index as u32) << QSORT_SHADERNUM_SHIFT)
        | (((entity_num as u32) & REFENTITYNUM_MASK) << QSORT_REFENTITYNUM_SHIFT)
        | (((fog_num as u32) & 31) << QSORT_FOGNUM_SHIFT)
        | (dlight_map & 3)
}

pub fn r_decompose_sort(sort: u32) -> SortKey {
    SortKey {
        shader_index: ((sort >> QSORT_SHADERNUM_SHIFT) as usize) & (MAX_SHADERS - 1),
        entity_num: ((sort >> QSORT_REFENTITYNUM_SHIFT) & REFENTITYNUM_MASK) as usize,
        fog_num: ((sort >> QSORT_FOGNUM_SHIFT) & 31) as usize,
        dlight_map: sort & 3,
    }
}

/// drawSurf_t — a surface queued for drawing in the current view.
#[derive(Debug, Clone)]
pub struct DrawSurf {
    pub sort: u32,
    pub surface: SurfaceGeometry,
}

impl DrawSurf {
    pub fn new(shader_index: usize, entity_num: usize, surface: SurfaceGeometry) -> Self {
        Self {
            sort: r_compose_sort(shader_index, entity_num, 0, 0),
            surface,
        }
    }
}

// ============================================================================
// Orientation and view parameters
// ============================================================================

pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

/// orientationr_t — an orientation plus the derived model matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationR {
    pub origin: Vec3,
    pub axis: [Vec3; 3],
    /// Viewer origin in local coordinates.
    pub view_origin: Vec3,
    pub model_matrix: [f32; 16],
}

impl Default for OrientationR {
    fn default() -> Self {
        Self {
            origin: VEC3_ORIGIN,
            axis: AXIS_DEFAULT,
            view_origin: VEC3_ORIGIN,
            model_matrix: IDENTITY_MATRIX,
        }
    }
}

/// How deep in portal recursion a view is. Only one portal level exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewDepth {
    #[default]
    Primary,
    Portal,
}

impl ViewDepth {
    /// The depth of a view seen through a portal in this one,
    /// or `None` if this view may not spawn portal views.
    pub fn descend(self) -> Option<ViewDepth> {
        match self {
            ViewDepth::Primary => Some(ViewDepth::Portal),
            ViewDepth::Portal => None,
        }
    }
}

/// viewParms_t
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewParms {
    pub or: OrientationR,
    /// World-to-eye orientation, filled in by r_rotate_for_viewer.
    pub world: OrientationR,
    /// May be different than or.origin for portals.
    pub pvs_origin: Vec3,
    pub depth: ViewDepth,
    pub is_mirror: bool,
    /// Geometry behind this plane is not drawn in a portal view.
    pub portal_plane: CPlane,
    pub viewport_x: i32,
    pub viewport_y: i32,
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub fov_x: f32,
    pub fov_y: f32,
    pub z_far: f32,
    pub projection_matrix: [f32; 16],
    pub frustum: [CPlane; 4],
}

impl ViewParms {
    pub fn new(origin: Vec3, axis: [Vec3; 3], fov_x: f32, fov_y: f32, width: i32, height: i32) -> Self {
        Self {
            or: OrientationR { origin, axis, ..OrientationR::default() },
            pvs_origin: origin,
            viewport_width: width,
            viewport_height: height,
            fov_x,
            fov_y,
            z_far: DEFAULT_ZFAR,
            ..Self::default()
        }
    }

    pub fn is_portal(&self) -> bool {
        self.depth == ViewDepth::Portal
    }
}

// ============================================================================
// Frame state
// ============================================================================

/// The renderer's copy of the client refdef: what to draw this frame.
#[derive(Debug, Clone, Default)]
pub struct TrRefdef {
    /// Scene time in milliseconds.
    pub time: i32,
    pub entities: Vec<RefEntity>,
}

/// glconfig_t — the parts the portal code depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct VkConfig {
    /// Draw commands are being generated on a separate thread.
    pub smp_active: bool,
}

/// Renderer cvar values, loaded once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCvars {
    pub r_noportals: i32,
    pub r_fastsky: i32,
    pub r_portal_only: i32,
    pub r_znear: f32,
}

impl Default for RenderCvars {
    fn default() -> Self {
        Self {
            r_noportals: 0,
            r_fastsky: 0,
            r_portal_only: 0,
            r_znear: 4.0,
        }
    }
}

impl RenderCvars {
    /// Snapshot from the global cvar table, defaults if it is not up.
    pub fn current() -> Self {
        with_cvar_ctx(|cvars| Self::load(cvars)).unwrap_or_default()
    }

    pub fn load(cvars: &CvarContext) -> Self {
        Self {
            r_noportals: cvars.variable_integer("r_noportals"),
            r_fastsky: cvars.variable_integer("r_fastsky"),
            r_portal_only: cvars.variable_integer("r_portalOnly"),
            r_znear: cvars.variable_value("r_znear"),
        }
    }
}

/// Register the renderer cvars in the global table.
pub fn r_init() {
    with_cvar_ctx(r_register);
}

/// Create the renderer cvars with their defaults.
pub fn r_register(cvars: &mut CvarContext) {
    cvars.get("r_noportals", "0", CVAR_CHEAT);
    cvars.get("r_fastsky", "0", CVAR_ARCHIVE);
    cvars.get("r_portalOnly", "0", CVAR_CHEAT);
    cvars.get("r_znear", "4", CVAR_CHEAT);
}

/// trGlobals_t — renderer state threaded through every call.
#[derive(Debug, Clone, Default)]
pub struct TrGlobals {
    pub refdef: TrRefdef,
    pub view_parms: ViewParms,
    pub shaders: Vec<Shader>,
    pub default_shader: Shader,
    pub config: VkConfig,
    pub cvars: RenderCvars,
    /// Incremented for every view rendered, portal views included.
    pub view_count: i32,
}

impl TrGlobals {
    pub fn shader(&self, index: usize) -> &Shader {
        self.shaders.get(index).unwrap_or(&self.default_shader)
    }

    /// Entity owning a surface, `None` for world geometry.
    pub fn owning_entity(&self, entity_num: usize) -> Option<&RefEntity> {
        if entity_num == REFENTITYNUM_WORLD {
            return None;
        }
        self.refdef.entities.get(entity_num)
    }
}

/// The scene renderer entry point (R_RenderView).
///
/// Draws the view currently installed in `tr.view_parms`. Implementations
/// may call back into the portal code for portal surfaces they find.
pub trait SceneRenderer {
    fn render_view(&mut self, tr: &mut TrGlobals);
}

/// Serializes tests that print or touch the global cvar table.
#[cfg(test)]
pub(crate) static CONSOLE_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

pub fn vid_printf(level: i32, msg: &str) {
    if level == PRINT_DEVELOPER {
        myq3_common::common::com_dprintf(msg);
    } else {
        myq3_common::common::com_printf(msg);
    }
}

// ============================================================================
// Tests
// ============================================================================

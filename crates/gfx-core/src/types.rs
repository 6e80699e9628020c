//! Stage masks, resource shapes, variable types and flag sets.

use std::fmt;

use bitflags::bitflags;

// ---------------------------------------------------------------------------
// Shader stages
// ---------------------------------------------------------------------------

bitflags! {
    /// Pipeline stage mask.
    ///
    /// A shader object carries exactly one bit; layout descriptions may carry
    /// several to apply an entry to multiple stages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderType: u32 {
        const VERTEX = 0x01;
        const PIXEL = 0x02;
        const GEOMETRY = 0x04;
        const HULL = 0x08;
        const DOMAIN = 0x10;
        const COMPUTE = 0x20;
        const AMPLIFICATION = 0x40;
        const MESH = 0x80;
    }
}

impl ShaderType {
    /// True when exactly one stage bit is set.
    pub fn is_single_stage(self) -> bool {
        self.bits().count_ones() == 1
    }

    /// Human-readable stage name used in log messages.
    pub fn name(self) -> &'static str {
        if self.is_empty() {
            return "Unknown";
        }
        STAGE_NAMES
            .iter()
            .find(|(stage, _)| *stage == self)
            .map_or("Multiple", |(_, name)| *name)
    }
}

const STAGE_NAMES: [(ShaderType, &str); 8] = [
    (ShaderType::VERTEX, "Vertex"),
    (ShaderType::PIXEL, "Pixel"),
    (ShaderType::GEOMETRY, "Geometry"),
    (ShaderType::HULL, "Hull"),
    (ShaderType::DOMAIN, "Domain"),
    (ShaderType::COMPUTE, "Compute"),
    (ShaderType::AMPLIFICATION, "Amplification"),
    (ShaderType::MESH, "Mesh"),
];

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Resource dimension
// ---------------------------------------------------------------------------

/// Shape of a texture resource.
///
/// Buffers, samplers and atomic counters are [`ResourceDimension::Undefined`]
/// unless they are texel buffers, which report [`ResourceDimension::Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceDimension {
    #[default]
    Undefined,
    Buffer,
    Tex1D,
    Tex1DArray,
    Tex2D,
    Tex2DArray,
    Tex3D,
    TexCube,
    TexCubeArray,
}

impl ResourceDimension {
    pub fn name(self) -> &'static str {
        match self {
            ResourceDimension::Undefined => "Undefined",
            ResourceDimension::Buffer => "Buffer",
            ResourceDimension::Tex1D => "Texture1D",
            ResourceDimension::Tex1DArray => "Texture1DArray",
            ResourceDimension::Tex2D => "Texture2D",
            ResourceDimension::Tex2DArray => "Texture2DArray",
            ResourceDimension::Tex3D => "Texture3D",
            ResourceDimension::TexCube => "TextureCube",
            ResourceDimension::TexCubeArray => "TextureCubeArray",
        }
    }

    /// Only 2D shapes can be multisampled.
    pub fn supports_multisampling(self) -> bool {
        matches!(self, ResourceDimension::Tex2D | ResourceDimension::Tex2DArray)
    }
}

impl fmt::Display for ResourceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Variable types
// ---------------------------------------------------------------------------

/// Rebinding granularity of a shader resource variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum ShaderResourceVariableType {
    /// Bound once through the pipeline and shared by every binding instance.
    #[default]
    Static,
    /// Bound once per binding instance.
    Mutable,
    /// Rebindable on a binding instance at any time.
    Dynamic,
}

impl ShaderResourceVariableType {
    pub const ALL: [ShaderResourceVariableType; 3] = [
        ShaderResourceVariableType::Static,
        ShaderResourceVariableType::Mutable,
        ShaderResourceVariableType::Dynamic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShaderResourceVariableType::Static => "static",
            ShaderResourceVariableType::Mutable => "mutable",
            ShaderResourceVariableType::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for ShaderResourceVariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Flag sets
// ---------------------------------------------------------------------------

bitflags! {
    /// Pipeline creation flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PsoCreateFlags: u32 {
        /// Do not warn about layout variables missing from every stage.
        const IGNORE_MISSING_VARIABLES = 0x01;
        /// Do not warn about immutable samplers missing from every stage.
        const IGNORE_MISSING_IMMUTABLE_SAMPLERS = 0x02;
    }
}

bitflags! {
    /// Controls bulk binding from a resource mapping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindShaderResourcesFlags: u32 {
        const UPDATE_STATIC = 0x01;
        const UPDATE_MUTABLE = 0x02;
        const UPDATE_DYNAMIC = 0x04;
        const UPDATE_ALL = Self::UPDATE_STATIC.bits()
            | Self::UPDATE_MUTABLE.bits()
            | Self::UPDATE_DYNAMIC.bits();
        /// Leave variables that already hold a resource untouched.
        const KEEP_EXISTING = 0x08;
        /// Report every variable that is still unbound after the update.
        const VERIFY_ALL_RESOLVED = 0x10;
    }
}

impl BindShaderResourcesFlags {
    /// Whether variables of `var_type` take part in the update. When no
    /// update bit is set every type is updated.
    pub fn updates(self, var_type: ShaderResourceVariableType) -> bool {
        if !self.intersects(Self::UPDATE_ALL) {
            return true;
        }
        let bit = match var_type {
            ShaderResourceVariableType::Static => Self::UPDATE_STATIC,
            ShaderResourceVariableType::Mutable => Self::UPDATE_MUTABLE,
            ShaderResourceVariableType::Dynamic => Self::UPDATE_DYNAMIC,
        };
        self.contains(bit)
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

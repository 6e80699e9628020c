//! SPIR-V enumerants used by reflection.
//!
//! Only the values the parser acts on are listed; anything else decodes to
//! `None` through [`num_traits::FromPrimitive`].

use gfx_core::ShaderType;
use num_derive::FromPrimitive;

pub const MAGIC: u32 = 0x0723_0203;
pub const HEADER_WORDS: usize = 5;

/// Extension that carries HLSL semantic strings on stage inputs.
pub const HLSL_FUNCTIONALITY_EXTENSION: &str = "SPV_GOOGLE_hlsl_functionality1";

// =====================================================================
// Opcodes
// =====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Op {
    Source = 3,
    Name = 5,
    MemberName = 6,
    Extension = 10,
    EntryPoint = 15,
    TypeVoid = 19,
    TypeBool = 20,
    TypeInt = 21,
    TypeFloat = 22,
    TypeVector = 23,
    TypeMatrix = 24,
    TypeImage = 25,
    TypeSampler = 26,
    TypeSampledImage = 27,
    TypeArray = 28,
    TypeRuntimeArray = 29,
    TypeStruct = 30,
    TypePointer = 32,
    Constant = 43,
    SpecConstant = 50,
    Function = 54,
    Variable = 59,
    Decorate = 71,
    MemberDecorate = 72,
    /// Also `OpDecorateStringGOOGLE`.
    DecorateString = 5632,
}

// =====================================================================
// Decorations
// =====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Decoration {
    Block = 2,
    BufferBlock = 3,
    BuiltIn = 11,
    NonWritable = 24,
    Location = 30,
    Binding = 33,
    DescriptorSet = 34,
    InputAttachmentIndex = 43,
    /// `HlslSemanticGOOGLE` / `UserSemantic`.
    UserSemantic = 5635,
}

impl Decoration {
    pub fn name(self) -> &'static str {
        match self {
            Decoration::Block => "Block",
            Decoration::BufferBlock => "BufferBlock",
            Decoration::BuiltIn => "BuiltIn",
            Decoration::NonWritable => "NonWritable",
            Decoration::Location => "Location",
            Decoration::Binding => "Binding",
            Decoration::DescriptorSet => "DescriptorSet",
            Decoration::InputAttachmentIndex => "InputAttachmentIndex",
            Decoration::UserSemantic => "UserSemantic",
        }
    }
}

// =====================================================================
// Storage classes, image dims, execution models, source languages
// =====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum StorageClass {
    UniformConstant = 0,
    Input = 1,
    Uniform = 2,
    Output = 3,
    Workgroup = 4,
    CrossWorkgroup = 5,
    Private = 6,
    Function = 7,
    Generic = 8,
    PushConstant = 9,
    AtomicCounter = 10,
    Image = 11,
    StorageBuffer = 12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Dim {
    Dim1D = 0,
    Dim2D = 1,
    Dim3D = 2,
    Cube = 3,
    Rect = 4,
    Buffer = 5,
    SubpassData = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ExecutionModel {
    Vertex = 0,
    TessellationControl = 1,
    TessellationEvaluation = 2,
    Geometry = 3,
    Fragment = 4,
    GLCompute = 5,
    Kernel = 6,
    TaskNV = 5267,
    MeshNV = 5268,
    TaskEXT = 5364,
    MeshEXT = 5365,
}

impl ExecutionModel {
    /// Pipeline stage the execution model runs in, if it is a graphics or
    /// compute stage.
    pub fn shader_type(self) -> Option<ShaderType> {
        Some(match self {
            ExecutionModel::Vertex => ShaderType::VERTEX,
            ExecutionModel::TessellationControl => ShaderType::HULL,
            ExecutionModel::TessellationEvaluation => ShaderType::DOMAIN,
            ExecutionModel::Geometry => ShaderType::GEOMETRY,
            ExecutionModel::Fragment => ShaderType::PIXEL,
            ExecutionModel::GLCompute => ShaderType::COMPUTE,
            ExecutionModel::TaskNV | ExecutionModel::TaskEXT => ShaderType::AMPLIFICATION,
            ExecutionModel::MeshNV | ExecutionModel::MeshEXT => ShaderType::MESH,
            ExecutionModel::Kernel => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum SourceLanguage {
    Unknown = 0,
    Essl = 1,
    Glsl = 2,
    OpenClC = 3,
    OpenClCpp = 4,
    Hlsl = 5,
}

/// Image `Sampled` operand value marking a storage (read/write) image.
pub const IMAGE_SAMPLED_STORAGE: u32 = 2;

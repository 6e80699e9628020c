//! Fixed-size resource records stored in a [`ShaderResources`] table.
//!
//! [`ShaderResources`]: crate::ShaderResources

use std::fmt;
use std::num::NonZeroU32;
use std::ops::Deref;

use gfx_core::ResourceDimension;

use crate::string_pool::PoolStr;

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// What a shader resource is, as seen by the binding layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    UniformBuffer,
    ReadOnlyStorageBuffer,
    ReadWriteStorageBuffer,
    UniformTexelBuffer,
    StorageTexelBuffer,
    StorageImage,
    SampledImage,
    AtomicCounter,
    SeparateImage,
    SeparateSampler,
    InputAttachment,
}

impl ResourceKind {
    /// Fixed-width label used by [`crate::ShaderResources::dump`].
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::UniformBuffer => "Uniform Buffer   ",
            ResourceKind::ReadOnlyStorageBuffer => "RO Storage Buffer",
            ResourceKind::ReadWriteStorageBuffer => "RW Storage Buffer",
            ResourceKind::UniformTexelBuffer => "Uniform Txl Buff ",
            ResourceKind::StorageTexelBuffer => "Storage Txl Buff ",
            ResourceKind::StorageImage => "Storage Image    ",
            ResourceKind::SampledImage => "Sampled Image    ",
            ResourceKind::AtomicCounter => "Atomic Cntr      ",
            ResourceKind::SeparateImage => "Separate Img     ",
            ResourceKind::SeparateSampler => "Separate Smpl    ",
            ResourceKind::InputAttachment => "Input Attachment ",
        }
    }

    /// API-level resource type.
    pub fn resource_type(self) -> ShaderResourceType {
        match self {
            ResourceKind::UniformBuffer => ShaderResourceType::ConstantBuffer,
            ResourceKind::ReadOnlyStorageBuffer | ResourceKind::UniformTexelBuffer => {
                ShaderResourceType::BufferSrv
            }
            ResourceKind::ReadWriteStorageBuffer
            | ResourceKind::StorageTexelBuffer
            | ResourceKind::AtomicCounter => ShaderResourceType::BufferUav,
            ResourceKind::StorageImage => ShaderResourceType::TextureUav,
            ResourceKind::SampledImage | ResourceKind::SeparateImage => ShaderResourceType::TextureSrv,
            ResourceKind::SeparateSampler => ShaderResourceType::Sampler,
            ResourceKind::InputAttachment => ShaderResourceType::InputAttachment,
        }
    }

    /// Only separate images and samplers may reference each other.
    pub fn can_be_paired(self) -> bool {
        matches!(self, ResourceKind::SeparateImage | ResourceKind::SeparateSampler)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().trim_end())
    }
}

/// Backend-neutral resource type reported by [`ShaderResourceDesc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderResourceType {
    ConstantBuffer,
    TextureSrv,
    BufferSrv,
    TextureUav,
    BufferUav,
    Sampler,
    InputAttachment,
}

/// Public description of one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResourceDesc {
    pub name: String,
    pub kind: ShaderResourceType,
    pub array_size: u32,
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// Contiguous runs of a reflection table, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceBucket {
    UniformBuffers,
    StorageBuffers,
    StorageImages,
    SampledImages,
    AtomicCounters,
    SeparateSamplers,
    SeparateImages,
    InputAttachments,
}

impl ResourceBucket {
    pub const COUNT: usize = 8;

    pub const ALL: [ResourceBucket; Self::COUNT] = [
        ResourceBucket::UniformBuffers,
        ResourceBucket::StorageBuffers,
        ResourceBucket::StorageImages,
        ResourceBucket::SampledImages,
        ResourceBucket::AtomicCounters,
        ResourceBucket::SeparateSamplers,
        ResourceBucket::SeparateImages,
        ResourceBucket::InputAttachments,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceBucket::UniformBuffers => "uniform buffers",
            ResourceBucket::StorageBuffers => "storage buffers",
            ResourceBucket::StorageImages => "storage images",
            ResourceBucket::SampledImages => "sampled images",
            ResourceBucket::AtomicCounters => "atomic counters",
            ResourceBucket::SeparateSamplers => "separate samplers",
            ResourceBucket::SeparateImages => "separate images",
            ResourceBucket::InputAttachments => "input attachments",
        }
    }

    /// Kinds a record in this bucket may have.
    pub fn accepts(self, kind: ResourceKind) -> bool {
        use ResourceKind as K;
        match self {
            ResourceBucket::UniformBuffers => kind == K::UniformBuffer,
            ResourceBucket::StorageBuffers => {
                matches!(kind, K::ReadOnlyStorageBuffer | K::ReadWriteStorageBuffer)
            }
            ResourceBucket::StorageImages => matches!(kind, K::StorageImage | K::StorageTexelBuffer),
            ResourceBucket::SampledImages => matches!(kind, K::SampledImage | K::UniformTexelBuffer),
            ResourceBucket::AtomicCounters => kind == K::AtomicCounter,
            ResourceBucket::SeparateSamplers => kind == K::SeparateSampler,
            ResourceBucket::SeparateImages => matches!(kind, K::SeparateImage | K::UniformTexelBuffer),
            ResourceBucket::InputAttachments => kind == K::InputAttachment,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoration offsets
// ---------------------------------------------------------------------------

/// Location of a decoration operand inside the SPIR-V binary the table was
/// built from.
///
/// Stored as a word index; the header occupies the first words so a valid
/// offset is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecorationOffset(NonZeroU32);

impl DecorationOffset {
    pub fn from_word_index(word: u32) -> Option<Self> {
        NonZeroU32::new(word).map(Self)
    }

    pub fn word_index(self) -> usize {
        self.0.get() as usize
    }

    pub fn byte_offset(self) -> usize {
        self.word_index() * 4
    }
}

// ---------------------------------------------------------------------------
// Resource record
// ---------------------------------------------------------------------------

/// Packed description of one shader resource.
///
/// Field values are fixed at construction, except for the paired index of a
/// separate image or sampler, which is assigned while the table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct ResourceAttribs {
    pub(crate) name: PoolStr,
    pub(crate) array_size: u32,
    pub(crate) paired_index: u32,
    pub(crate) binding_offset: DecorationOffset,
    pub(crate) descriptor_set_offset: Option<DecorationOffset>,
    pub(crate) kind: ResourceKind,
    pub(crate) dimension: ResourceDimension,
    pub(crate) is_multisampled: bool,
}

const _: () = assert!(std::mem::size_of::<ResourceAttribs>() % std::mem::size_of::<usize>() == 0);

impl ResourceAttribs {
    /// Sentinel stored in `paired_index` when nothing is assigned.
    pub const UNASSIGNED: u32 = u32::MAX;

    pub(crate) fn new(
        name: PoolStr,
        kind: ResourceKind,
        array_size: u32,
        dimension: ResourceDimension,
        is_multisampled: bool,
        binding_offset: DecorationOffset,
        descriptor_set_offset: Option<DecorationOffset>,
    ) -> Self {
        Self {
            name,
            array_size,
            paired_index: Self::UNASSIGNED,
            binding_offset,
            descriptor_set_offset,
            kind,
            dimension,
            is_multisampled,
        }
    }

    /// Link to a record in the opposite separate bucket. Ignored for kinds
    /// that cannot be paired.
    pub(crate) fn assign_pair(&mut self, index: u32) {
        debug_assert!(self.kind.can_be_paired(), "{:?} cannot be paired", self.kind);
        if self.kind.can_be_paired() {
            self.paired_index = index;
        }
    }

    pub fn array_size(&self) -> u32 {
        self.array_size
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn dimension(&self) -> ResourceDimension {
        self.dimension
    }

    pub fn is_multisampled(&self) -> bool {
        self.is_multisampled
    }

    /// For a separate image, the index of its sampler within the separate
    /// sampler bucket; for a separate sampler, the index of its image within
    /// the separate image bucket.
    pub fn paired_index(&self) -> Option<u32> {
        (self.paired_index != Self::UNASSIGNED).then_some(self.paired_index)
    }

    pub fn binding_offset(&self) -> DecorationOffset {
        self.binding_offset
    }

    /// `None` for resources without a descriptor set (e.g. OpenGL atomic
    /// counters).
    pub fn descriptor_set_offset(&self) -> Option<DecorationOffset> {
        self.descriptor_set_offset
    }

    /// Structural compatibility: same array size, kind and pairing. Names,
    /// dimensions and multisampling are not compared.
    pub fn is_compatible_with(&self, other: &ResourceAttribs) -> bool {
        self.array_size == other.array_size
            && self.kind == other.kind
            && self.paired_index == other.paired_index
    }
}

/// A record together with its resolved name.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    pub name: &'a str,
    pub attribs: &'a ResourceAttribs,
}

impl Deref for Resource<'_> {
    type Target = ResourceAttribs;

    fn deref(&self) -> &ResourceAttribs {
        self.attribs
    }
}

impl Resource<'_> {
    pub fn desc(&self) -> ShaderResourceDesc {
        ShaderResourceDesc {
            name: self.name.to_string(),
            kind: self.kind.resource_type(),
            array_size: self.array_size,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage inputs
// ---------------------------------------------------------------------------

/// HLSL semantic of a vertex input and where its `Location` lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct StageInputAttribs {
    pub(crate) semantic: PoolStr,
    pub(crate) location_offset: DecorationOffset,
}

const _: () = assert!(std::mem::size_of::<StageInputAttribs>() % std::mem::size_of::<usize>() == 0);

#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    pub semantic: &'a str,
    pub location_offset: DecorationOffset,
}

// ---------------------------------------------------------------------------
// Name matching
// ---------------------------------------------------------------------------

/// True when `name == prefix + suffix`.
pub fn matches_with_suffix(name: &str, prefix: &str, suffix: &str) -> bool {
    name.len() == prefix.len() + suffix.len() && name.starts_with(prefix) && name.ends_with(suffix)
}

#[cfg(test)]
#[path = "attribs_tests.rs"]
mod attribs_tests;

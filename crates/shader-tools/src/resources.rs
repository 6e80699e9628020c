//! Shader reflection table.
//!
//! [`ShaderResources`] is built once from a SPIR-V binary and is immutable
//! afterwards. Resource records live in one allocation, grouped into eight
//! contiguous buckets in a fixed order:
//!
//! 1. uniform buffers
//! 2. storage buffers
//! 3. storage images (and storage texel buffers)
//! 4. sampled images (and uniform texel buffers)
//! 5. atomic counters
//! 6. separate samplers
//! 7. separate images (and uniform texel buffers)
//! 8. input attachments
//!
//! Every name (resources, stage input semantics, the combined sampler
//! suffix and the shader name) is interned in a [`StringPool`] sized exactly
//! for them up front.
//!
//! The flat index of a resource is its position across all buckets. It is
//! what compatibility checks and the binding layer use to line up two tables.

use thiserror::Error;
use tracing::{debug, error, warn};

use gfx_core::{ResourceDimension, ShaderType};

use crate::attribs::{
    matches_with_suffix, DecorationOffset, Resource, ResourceAttribs, ResourceBucket, ResourceKind,
    ShaderResourceDesc, StageInput, StageInputAttribs,
};
use crate::spirv::consts::HLSL_FUNCTIONALITY_EXTENSION;
use crate::spirv::{is_byte_swapped, Decoration, Dim, EntryPoint, Module, ModuleError, ReflectedResource};
use crate::string_pool::{PoolStr, StringPool, StringPoolError};

// ---------------------------------------------------------------------------
// Description and errors
// ---------------------------------------------------------------------------

/// Inputs to reflection besides the binary itself.
#[derive(Debug, Clone, Default)]
pub struct ShaderDesc {
    /// Display name used in diagnostics.
    pub name: String,
    /// Exactly one stage bit.
    pub shader_type: ShaderType,
    /// When set, a separate image `X` is paired with a separate sampler named
    /// `X` + suffix.
    pub combined_sampler_suffix: Option<String>,
    /// Capture HLSL semantics of stage inputs.
    pub load_stage_inputs: bool,
}

#[derive(Debug, Error)]
pub enum ReflectionError {
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("shader type {0} does not name a single pipeline stage")]
    InvalidShaderType(ShaderType),
    #[error("unable to find entry point of type {stage} in SPIR-V binary for shader '{shader}'")]
    EntryPointNotFound { stage: ShaderType, shader: String },
    #[error("resource '{name}' has no {decoration} decoration")]
    MissingDecoration {
        name: String,
        decoration: &'static str,
    },
    #[error("resource names pool: {0}")]
    NamePool(#[from] StringPoolError),
    #[error("resource names pool must be empty after construction, {remaining} bytes left")]
    NamePoolNotExhausted { remaining: usize },
    #[error("{bucket}: {actual} resources constructed, {expected} expected")]
    CountMismatch {
        bucket: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("resource index {index} is out of range ({total} resources)")]
    IndexOutOfRange { index: usize, total: usize },
    #[error("decoration offset {word} is outside of the {len}-word binary")]
    OffsetOutOfRange { word: usize, len: usize },
}

// ---------------------------------------------------------------------------
// Bucket offsets
// ---------------------------------------------------------------------------

/// Start of every bucket plus the total, computed from per-bucket counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct BucketOffsets([u32; ResourceBucket::COUNT + 1]);

impl BucketOffsets {
    pub(crate) fn compute(counts: &[usize; ResourceBucket::COUNT]) -> Self {
        let mut offsets = [0u32; ResourceBucket::COUNT + 1];
        let mut current = 0u32;
        for (slot, count) in offsets.iter_mut().zip(counts.iter()) {
            *slot = current;
            current += *count as u32;
        }
        offsets[ResourceBucket::COUNT] = current;
        Self(offsets)
    }

    pub(crate) fn start(&self, bucket: ResourceBucket) -> usize {
        self.0[bucket.index()] as usize
    }

    pub(crate) fn count(&self, bucket: ResourceBucket) -> usize {
        (self.0[bucket.index() + 1] - self.0[bucket.index()]) as usize
    }

    pub(crate) fn total(&self) -> usize {
        self.0[ResourceBucket::COUNT] as usize
    }
}

// ---------------------------------------------------------------------------
// ShaderResources
// ---------------------------------------------------------------------------

/// Reflected resource interface of one shader.
#[derive(Debug)]
pub struct ShaderResources {
    resources: Box<[ResourceAttribs]>,
    stage_inputs: Box<[StageInputAttribs]>,
    names: StringPool,
    offsets: BucketOffsets,
    shader_type: ShaderType,
    shader_name: PoolStr,
    combined_sampler_suffix: Option<PoolStr>,
    entry_point: String,
    is_hlsl_source: bool,
}

/// Resolve the uniform buffer name: HLSL compilers name the block type
/// `type_X` and the instance `X`, GLSL compilers only name the block.
fn uniform_buffer_name<'a>(ub: &'a ReflectedResource, is_hlsl: bool) -> &'a str {
    if is_hlsl && !ub.instance_name.is_empty() {
        &ub.instance_name
    } else {
        &ub.name
    }
}

fn resource_dimension(res: &ReflectedResource) -> ResourceDimension {
    let Some(image) = res.image else {
        return ResourceDimension::Undefined;
    };
    match image.dim {
        Some(Dim::Dim1D) if image.arrayed => ResourceDimension::Tex1DArray,
        Some(Dim::Dim1D) => ResourceDimension::Tex1D,
        Some(Dim::Dim2D) if image.arrayed => ResourceDimension::Tex2DArray,
        Some(Dim::Dim2D) => ResourceDimension::Tex2D,
        Some(Dim::Dim3D) => ResourceDimension::Tex3D,
        Some(Dim::Cube) if image.arrayed => ResourceDimension::TexCubeArray,
        Some(Dim::Cube) => ResourceDimension::TexCube,
        Some(Dim::Buffer) => ResourceDimension::Buffer,
        Some(Dim::SubpassData) => ResourceDimension::Tex2D,
        _ => ResourceDimension::Undefined,
    }
}

/// Stage input that will be recorded, with its semantic.
struct PendingStageInput<'a> {
    input: &'a ReflectedResource,
    semantic: &'a str,
}

impl ShaderResources {
    /// Reflect `spirv` for the stage named in `desc`.
    pub fn new(spirv: &[u32], desc: &ShaderDesc) -> Result<Self, ReflectionError> {
        let module = Module::parse(spirv)?;
        Self::from_module(&module, desc)
    }

    /// Reflect an already parsed module.
    pub fn from_module(module: &Module, desc: &ShaderDesc) -> Result<Self, ReflectionError> {
        if !desc.shader_type.is_single_stage() {
            return Err(ReflectionError::InvalidShaderType(desc.shader_type));
        }
        let entry_point = select_entry_point(module, desc)?;
        let is_hlsl_source = module.is_hlsl_source();
        let reflected = module.resources(entry_point);

        let buckets: [(&[ReflectedResource], ResourceBucket); ResourceBucket::COUNT] = [
            (reflected.uniform_buffers.as_slice(), ResourceBucket::UniformBuffers),
            (reflected.storage_buffers.as_slice(), ResourceBucket::StorageBuffers),
            (reflected.storage_images.as_slice(), ResourceBucket::StorageImages),
            (reflected.sampled_images.as_slice(), ResourceBucket::SampledImages),
            (reflected.atomic_counters.as_slice(), ResourceBucket::AtomicCounters),
            (reflected.separate_samplers.as_slice(), ResourceBucket::SeparateSamplers),
            (reflected.separate_images.as_slice(), ResourceBucket::SeparateImages),
            (reflected.subpass_inputs.as_slice(), ResourceBucket::InputAttachments),
        ];

        // ---- Names pool sizing ----------------------------------------------
        let mut pool_size = 0usize;
        for ub in &reflected.uniform_buffers {
            pool_size += uniform_buffer_name(ub, is_hlsl_source).len() + 1;
        }
        for (list, _) in &buckets[1..] {
            pool_size += list.iter().map(|r| r.name.len() + 1).sum::<usize>();
        }
        if let Some(suffix) = &desc.combined_sampler_suffix {
            pool_size += suffix.len() + 1;
        }
        pool_size += desc.name.len() + 1;

        let stage_inputs = collect_stage_inputs(module, desc, is_hlsl_source, &reflected.stage_inputs);
        pool_size += stage_inputs.iter().map(|s| s.semantic.len() + 1).sum::<usize>();

        // ---- Allocation -----------------------------------------------------
        let mut counts = [0usize; ResourceBucket::COUNT];
        for (list, bucket) in &buckets {
            counts[bucket.index()] = list.len();
        }
        let offsets = BucketOffsets::compute(&counts);

        let mut names = StringPool::new();
        names.reserve(pool_size)?;
        let mut resources: Vec<ResourceAttribs> = Vec::with_capacity(offsets.total());

        // ---- Construction, bucket by bucket ---------------------------------
        for (list, bucket) in &buckets {
            let start = resources.len();
            for res in list.iter() {
                let name = match bucket {
                    ResourceBucket::UniformBuffers => uniform_buffer_name(res, is_hlsl_source),
                    _ => res.name.as_str(),
                };
                let kind = resource_kind(*bucket, res);
                let attribs = ResourceAttribs::new(
                    names.copy_str(name)?,
                    kind,
                    res.array_size,
                    resource_dimension(res),
                    res.image.is_some_and(|img| img.multisampled),
                    binding_offset(module, res, name)?,
                    decoration_offset(module, res.id, Decoration::DescriptorSet),
                );
                resources.push(attribs);
            }
            let actual = resources.len() - start;
            if actual != offsets.count(*bucket) || start != offsets.start(*bucket) {
                return Err(ReflectionError::CountMismatch {
                    bucket: bucket.name(),
                    expected: offsets.count(*bucket),
                    actual,
                });
            }
        }

        let combined_sampler_suffix = desc
            .combined_sampler_suffix
            .as_deref()
            .map(|suffix| names.copy_str(suffix))
            .transpose()?;
        let shader_name = names.copy_str(&desc.name)?;

        let mut stage_input_attribs = Vec::with_capacity(stage_inputs.len());
        for pending in &stage_inputs {
            let location_offset = decoration_offset(module, pending.input.id, Decoration::Location)
                .ok_or_else(|| ReflectionError::MissingDecoration {
                    name: pending.input.name.clone(),
                    decoration: Decoration::Location.name(),
                })?;
            stage_input_attribs.push(StageInputAttribs {
                semantic: names.copy_str(pending.semantic)?,
                location_offset,
            });
        }

        if names.remaining_size() != 0 {
            return Err(ReflectionError::NamePoolNotExhausted {
                remaining: names.remaining_size(),
            });
        }

        let mut this = Self {
            resources: resources.into_boxed_slice(),
            stage_inputs: stage_input_attribs.into_boxed_slice(),
            names,
            offsets,
            shader_type: desc.shader_type,
            shader_name,
            combined_sampler_suffix,
            entry_point: entry_point.name.clone(),
            is_hlsl_source,
        };
        this.pair_separate_samplers();

        debug!(
            "Reflected shader '{}': {} resources, {} stage inputs",
            desc.name,
            this.total_resources(),
            this.stage_inputs.len()
        );
        Ok(this)
    }

    /// Link every separate image with the sampler named `<image><suffix>`.
    fn pair_separate_samplers(&mut self) {
        let Some(suffix) = self.combined_sampler_suffix else {
            return;
        };
        let suffix = self.names.get(suffix).to_string();
        let img_start = self.offsets.start(ResourceBucket::SeparateImages);
        let smp_start = self.offsets.start(ResourceBucket::SeparateSamplers);
        let num_samplers = self.offsets.count(ResourceBucket::SeparateSamplers);

        for img in 0..self.offsets.count(ResourceBucket::SeparateImages) {
            let image = self.resources[img_start + img];
            let image_name = self.names.get(image.name);
            let Some(smp) = (0..num_samplers).find(|&s| {
                matches_with_suffix(
                    self.names.get(self.resources[smp_start + s].name),
                    image_name,
                    &suffix,
                )
            }) else {
                continue;
            };

            if image.kind == ResourceKind::UniformTexelBuffer {
                warn!("Combined image sampler assigned to uniform texel buffer '{image_name}' will be ignored");
                continue;
            }

            let sampler = self.resources[smp_start + smp];
            if sampler.array_size != 1 && sampler.array_size != image.array_size {
                error!(
                    "Array size ({}) of separate sampler variable '{}' must be equal to 1 or be the same as the array size ({}) of separate image variable '{}' it is assigned to",
                    sampler.array_size,
                    self.names.get(sampler.name),
                    image.array_size,
                    image_name
                );
            }
            self.resources[img_start + img].assign_pair(smp as u32);
            self.resources[smp_start + smp].assign_pair(img as u32);
        }

        let shader_name = self.names.get(self.shader_name);
        for smp in self.bucket(ResourceBucket::SeparateSamplers) {
            if smp.paired_index().is_none() {
                error!(
                    "Shader '{shader_name}' uses combined texture samplers, but separate sampler '{}' is not assigned to any texture",
                    smp.name
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    fn view<'a>(&'a self, attribs: &'a ResourceAttribs) -> Resource<'a> {
        Resource {
            name: self.names.get(attribs.name),
            attribs,
        }
    }

    pub fn shader_type(&self) -> ShaderType {
        self.shader_type
    }

    pub fn name(&self) -> &str {
        self.names.get(self.shader_name)
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn is_hlsl_source(&self) -> bool {
        self.is_hlsl_source
    }

    pub fn combined_sampler_suffix(&self) -> Option<&str> {
        self.combined_sampler_suffix.map(|s| self.names.get(s))
    }

    pub fn is_using_combined_samplers(&self) -> bool {
        self.combined_sampler_suffix.is_some()
    }

    pub fn total_resources(&self) -> usize {
        self.offsets.total()
    }

    pub fn count(&self, bucket: ResourceBucket) -> usize {
        self.offsets.count(bucket)
    }

    /// Flat index of the first record in `bucket`.
    pub fn bucket_start(&self, bucket: ResourceBucket) -> usize {
        self.offsets.start(bucket)
    }

    /// Resource `index` of `bucket`.
    pub fn get(&self, bucket: ResourceBucket, index: usize) -> Option<Resource<'_>> {
        if index >= self.offsets.count(bucket) {
            return None;
        }
        Some(self.view(&self.resources[self.offsets.start(bucket) + index]))
    }

    /// Resource at a flat index across all buckets.
    pub fn resource(&self, flat_index: usize) -> Option<Resource<'_>> {
        self.resources.get(flat_index).map(|a| self.view(a))
    }

    pub fn resources(&self) -> impl Iterator<Item = Resource<'_>> + '_ {
        self.resources.iter().map(|a| self.view(a))
    }

    pub fn bucket(&self, bucket: ResourceBucket) -> impl Iterator<Item = Resource<'_>> + '_ {
        let start = self.offsets.start(bucket);
        let end = start + self.offsets.count(bucket);
        self.resources[start..end].iter().map(|a| self.view(a))
    }

    /// Flat index of the first resource named `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.resources().position(|r| r.name == name)
    }

    pub fn resource_desc(&self, flat_index: usize) -> Option<ShaderResourceDesc> {
        let res = self.resource(flat_index)?;
        if res.kind == ResourceKind::AtomicCounter {
            warn!("There is no appropriate shader resource type for atomic counter resource '{}'", res.name);
        }
        Some(res.desc())
    }

    /// Flat index of the resource `paired_index` points at, if any.
    pub fn paired_resource(&self, flat_index: usize) -> Option<usize> {
        let res = self.resource(flat_index)?;
        let paired = res.paired_index()? as usize;
        let bucket = match res.kind {
            ResourceKind::SeparateImage => ResourceBucket::SeparateSamplers,
            ResourceKind::SeparateSampler => ResourceBucket::SeparateImages,
            _ => return None,
        };
        (paired < self.count(bucket)).then(|| self.bucket_start(bucket) + paired)
    }

    pub fn num_stage_inputs(&self) -> usize {
        self.stage_inputs.len()
    }

    pub fn stage_inputs(&self) -> impl Iterator<Item = StageInput<'_>> + '_ {
        self.stage_inputs.iter().map(|s| StageInput {
            semantic: self.names.get(s.semantic),
            location_offset: s.location_offset,
        })
    }

    /// Invoke `handler` once per resource, bucket by bucket in storage order.
    /// The second argument is the index within the bucket.
    pub fn process_resources(&self, mut handler: impl FnMut(ResourceBucket, Resource<'_>, usize)) {
        for bucket in ResourceBucket::ALL {
            for (n, res) in self.bucket(bucket).enumerate() {
                handler(bucket, res, n);
            }
        }
    }

    /// Bytes still free in the names pool. Always zero for a constructed
    /// table.
    pub fn names_pool_remaining(&self) -> usize {
        self.names.remaining_size()
    }

    // -----------------------------------------------------------------------
    // Compatibility
    // -----------------------------------------------------------------------

    /// Two tables are compatible when every bucket has the same count and
    /// the records at each flat index agree on array size, kind and pairing.
    pub fn is_compatible_with(&self, other: &ShaderResources) -> bool {
        if ResourceBucket::ALL
            .iter()
            .any(|&b| self.count(b) != other.count(b))
        {
            return false;
        }
        self.resources
            .iter()
            .zip(other.resources.iter())
            .all(|(a, b)| a.is_compatible_with(b))
    }

    // -----------------------------------------------------------------------
    // Binary patching
    // -----------------------------------------------------------------------

    /// Overwrite the `Binding` decoration of resource `flat_index` in the
    /// binary this table was reflected from.
    pub fn patch_binding(&self, spirv: &mut [u32], flat_index: usize, binding: u32) -> Result<(), ReflectionError> {
        let Some(res) = self.resources.get(flat_index) else {
            return Err(ReflectionError::IndexOutOfRange {
                index: flat_index,
                total: self.resources.len(),
            });
        };
        write_word(spirv, res.binding_offset, binding)
    }

    /// Overwrite the `DescriptorSet` decoration of resource `flat_index`.
    pub fn patch_descriptor_set(&self, spirv: &mut [u32], flat_index: usize, set: u32) -> Result<(), ReflectionError> {
        let res = self.resources.get(flat_index);
        let Some(offset) = res.and_then(|r| r.descriptor_set_offset) else {
            return Err(ReflectionError::MissingDecoration {
                name: res.map_or_else(String::new, |r| self.names.get(r.name).to_string()),
                decoration: Decoration::DescriptorSet.name(),
            });
        };
        write_word(spirv, offset, set)
    }
}

/// Store `value` at `offset` in the byte order of `spirv` itself.
fn write_word(spirv: &mut [u32], offset: DecorationOffset, value: u32) -> Result<(), ReflectionError> {
    let value = if is_byte_swapped(spirv) { value.swap_bytes() } else { value };
    let len = spirv.len();
    let word = spirv
        .get_mut(offset.word_index())
        .ok_or(ReflectionError::OffsetOutOfRange {
            word: offset.word_index(),
            len,
        })?;
    *word = value;
    Ok(())
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

fn select_entry_point<'m>(module: &'m Module, desc: &ShaderDesc) -> Result<&'m EntryPoint, ReflectionError> {
    let mut selected: Option<&EntryPoint> = None;
    for ep in module.entry_points() {
        if ep.execution_model.shader_type() != Some(desc.shader_type) {
            continue;
        }
        match selected {
            Some(first) => warn!(
                "More than one entry point of type {} found in SPIR-V binary for shader '{}'. The first one ('{}') will be used.",
                desc.shader_type, desc.name, first.name
            ),
            None => selected = Some(ep),
        }
    }
    selected.ok_or_else(|| ReflectionError::EntryPointNotFound {
            stage: desc.shader_type,
            shader: desc.name.clone(),
        })
}

fn resource_kind(bucket: ResourceBucket, res: &ReflectedResource) -> ResourceKind {
    let is_buffer = res.image_dim() == Some(Dim::Buffer);
    match bucket {
        ResourceBucket::UniformBuffers => ResourceKind::UniformBuffer,
        ResourceBucket::StorageBuffers if res.read_only => ResourceKind::ReadOnlyStorageBuffer,
        ResourceBucket::StorageBuffers => ResourceKind::ReadWriteStorageBuffer,
        ResourceBucket::StorageImages if is_buffer => ResourceKind::StorageTexelBuffer,
        ResourceBucket::StorageImages => ResourceKind::StorageImage,
        ResourceBucket::SampledImages if is_buffer => ResourceKind::UniformTexelBuffer,
        ResourceBucket::SampledImages => ResourceKind::SampledImage,
        ResourceBucket::AtomicCounters => ResourceKind::AtomicCounter,
        ResourceBucket::SeparateSamplers => ResourceKind::SeparateSampler,
        ResourceBucket::SeparateImages if is_buffer => ResourceKind::UniformTexelBuffer,
        ResourceBucket::SeparateImages => ResourceKind::SeparateImage,
        ResourceBucket::InputAttachments => ResourceKind::InputAttachment,
    }
}

fn decoration_offset(module: &Module, id: u32, decoration: Decoration) -> Option<DecorationOffset> {
    module
        .decoration(id, decoration)
        .and_then(|d| DecorationOffset::from_word_index(d.operand_word))
}

fn binding_offset(module: &Module, res: &ReflectedResource, name: &str) -> Result<DecorationOffset, ReflectionError> {
    decoration_offset(module, res.id, Decoration::Binding).ok_or_else(|| ReflectionError::MissingDecoration {
        name: name.to_string(),
        decoration: Decoration::Binding.name(),
    })
}

/// Pick the stage inputs whose semantics will be recorded.
fn collect_stage_inputs<'a>(
    module: &'a Module,
    desc: &ShaderDesc,
    is_hlsl_source: bool,
    inputs: &'a [ReflectedResource],
) -> Vec<PendingStageInput<'a>> {
    if !desc.load_stage_inputs || !is_hlsl_source || inputs.is_empty() {
        return Vec::new();
    }
    if !module.has_extension(HLSL_FUNCTIONALITY_EXTENSION) {
        warn!(
            "SPIR-V byte code of shader '{}' does not use {HLSL_FUNCTIONALITY_EXTENSION} extension. \
             As a result, it is not possible to get semantics of shader inputs and map them to proper locations. \
             The shader will still work correctly if all attributes are declared in ascending order without any gaps. \
             Enable {HLSL_FUNCTIONALITY_EXTENSION} in your compiler to allow proper mapping of vertex shader inputs.",
            desc.name
        );
        return Vec::new();
    }

    let mut pending = Vec::with_capacity(inputs.len());
    for input in inputs {
        match module
            .decoration(input.id, Decoration::UserSemantic)
            .and_then(|d| d.string.as_deref())
        {
            Some(semantic) => pending.push(PendingStageInput { input, semantic }),
            None => error!(
                "Shader input '{}' does not have HlslSemanticGOOGLE decoration, which is unexpected as the shader declares {HLSL_FUNCTIONALITY_EXTENSION} extension",
                input.name
            ),
        }
    }
    pending
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;

//! Classification of module-scope variables into resource categories.
//!
//! Categories follow the usual Vulkan reflection conventions: a uniform
//! block is a `Uniform` struct decorated `Block`, a storage block lives in
//! `StorageBuffer` (or is a `Uniform` struct decorated `BufferBlock`), images
//! split on their `Sampled` operand, and subpass-data images are input
//! attachments. Variables keep their declaration order within a category.

use tracing::warn;

use super::consts::{Decoration, Dim, StorageClass, IMAGE_SAMPLED_STORAGE};
use super::module::{EntryPoint, ImageType, Module, Type, Variable};

/// A variable that reflection recognized as a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedResource {
    /// Variable id.
    pub id: u32,
    /// Element type after stripping the pointer and any array wrappers.
    pub base_type_id: u32,
    /// Resource name. Blocks report their type name, everything else the
    /// variable name.
    pub name: String,
    /// Debug name of the variable itself.
    pub instance_name: String,
    /// Outermost array dimension, 1 for scalars and 0 for runtime arrays.
    pub array_size: u32,
    pub image: Option<ImageType>,
    /// Storage buffers only: every member is `NonWritable`.
    pub read_only: bool,
}

impl ReflectedResource {
    pub fn image_dim(&self) -> Option<Dim> {
        self.image.and_then(|img| img.dim)
    }
}

/// Resources of a module grouped by category.
#[derive(Debug, Default)]
pub struct ModuleResources {
    pub uniform_buffers: Vec<ReflectedResource>,
    pub storage_buffers: Vec<ReflectedResource>,
    pub storage_images: Vec<ReflectedResource>,
    pub sampled_images: Vec<ReflectedResource>,
    pub atomic_counters: Vec<ReflectedResource>,
    pub separate_images: Vec<ReflectedResource>,
    pub separate_samplers: Vec<ReflectedResource>,
    pub subpass_inputs: Vec<ReflectedResource>,
    pub stage_inputs: Vec<ReflectedResource>,
}

impl Module {
    /// Sort the module-scope variables visible to `entry_point` into their
    /// resource categories. Stage inputs outside the entry point's interface
    /// belong to other stages and are skipped.
    pub fn resources(&self, entry_point: &EntryPoint) -> ModuleResources {
        let mut out = ModuleResources::default();
        for var in &self.variables {
            if var.storage_class == Some(StorageClass::Input) && !entry_point.uses(var.id) {
                continue;
            }
            self.classify(var, &mut out);
        }
        out
    }

    fn classify(&self, var: &Variable, out: &mut ModuleResources) {
        let Some(Type::Pointer { pointee, .. }) = self.ty(var.pointer_type) else {
            return;
        };
        let Some(storage_class) = var.storage_class else {
            return;
        };

        let (base_type_id, array_size) = self.strip_arrays(var.id, *pointee);
        let Some(base) = self.ty(base_type_id) else {
            return;
        };

        let image = match base {
            Type::Image(img) => Some(*img),
            Type::SampledImage { image } => match self.ty(*image) {
                Some(Type::Image(img)) => Some(*img),
                _ => None,
            },
            _ => None,
        };

        let mut resource = ReflectedResource {
            id: var.id,
            base_type_id,
            name: self.name(var.id).to_string(),
            instance_name: self.name(var.id).to_string(),
            array_size,
            image,
            read_only: false,
        };

        match (storage_class, base) {
            (StorageClass::Input, _) => {
                if !self.is_builtin(var.id, base_type_id) {
                    out.stage_inputs.push(resource);
                }
            }
            (StorageClass::Uniform, Type::Struct { .. })
                if self.has_decoration(base_type_id, Decoration::Block) =>
            {
                resource.name = self.block_name(var.id, base_type_id);
                out.uniform_buffers.push(resource);
            }
            (StorageClass::Uniform, Type::Struct { members })
                if self.has_decoration(base_type_id, Decoration::BufferBlock) =>
            {
                resource.name = self.block_name(var.id, base_type_id);
                resource.read_only = self.is_read_only(var.id, base_type_id, members.len());
                out.storage_buffers.push(resource);
            }
            (StorageClass::StorageBuffer, Type::Struct { members }) => {
                resource.name = self.block_name(var.id, base_type_id);
                resource.read_only = self.is_read_only(var.id, base_type_id, members.len());
                out.storage_buffers.push(resource);
            }
            (StorageClass::AtomicCounter, _) => out.atomic_counters.push(resource),
            (StorageClass::UniformConstant, Type::Image(img)) => {
                if img.dim == Some(Dim::SubpassData) {
                    out.subpass_inputs.push(resource);
                } else if img.sampled == IMAGE_SAMPLED_STORAGE {
                    out.storage_images.push(resource);
                } else {
                    out.separate_images.push(resource);
                }
            }
            (StorageClass::UniformConstant, Type::SampledImage { .. }) => {
                out.sampled_images.push(resource)
            }
            (StorageClass::UniformConstant, Type::Sampler) => out.separate_samplers.push(resource),
            _ => {}
        }
    }

    /// Peel array wrappers off `type_id`, returning the element type and the
    /// outermost dimension.
    fn strip_arrays(&self, var_id: u32, mut type_id: u32) -> (u32, u32) {
        let mut dims = Vec::new();
        loop {
            match self.ty(type_id) {
                Some(Type::Array { element, length }) => {
                    dims.push(self.constant(*length).unwrap_or(1));
                    type_id = *element;
                }
                Some(Type::RuntimeArray { element }) => {
                    dims.push(0);
                    type_id = *element;
                }
                _ => break,
            }
        }
        if dims.len() > 1 {
            warn!(
                "Variable '{}' is a multi-dimensional array; only the outermost dimension ({}) is reflected",
                self.name(var_id),
                dims[0]
            );
        }
        (type_id, dims.first().copied().unwrap_or(1))
    }

    fn block_name(&self, var_id: u32, block_type_id: u32) -> String {
        let block = self.name(block_type_id);
        if !block.is_empty() {
            return block.to_string();
        }
        let instance = self.name(var_id);
        if !instance.is_empty() {
            return instance.to_string();
        }
        format!("_{var_id}")
    }

    fn is_read_only(&self, var_id: u32, block_type_id: u32, member_count: usize) -> bool {
        if self.has_decoration(var_id, Decoration::NonWritable) {
            return true;
        }
        member_count > 0
            && (0..member_count as u32)
                .all(|m| self.has_member_decoration(block_type_id, m, Decoration::NonWritable))
    }

    fn is_builtin(&self, var_id: u32, base_type_id: u32) -> bool {
        if self.has_decoration(var_id, Decoration::BuiltIn) {
            return true;
        }
        match self.ty(base_type_id) {
            Some(Type::Struct { members }) => (0..members.len() as u32)
                .any(|m| self.has_member_decoration(base_type_id, m, Decoration::BuiltIn)),
            _ => false,
        }
    }
}

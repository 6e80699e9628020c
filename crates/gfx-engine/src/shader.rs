//! Shader objects: a SPIR-V binary plus its reflection table.

use anyhow::{Context, Result};
use tracing::debug;

use gfx_core::ShaderType;
use shader_tools::compile::compile_wgsl;
use shader_tools::spirv::{normalize_words, words_from_bytes};
use shader_tools::{ShaderDesc, ShaderResources};

/// A compiled shader.
///
/// Reflection runs once at creation; a binary that cannot be reflected
/// never produces a `Shader`.
#[derive(Debug)]
pub struct Shader {
    desc: ShaderDesc,
    spirv: Vec<u32>,
    resources: ShaderResources,
}

impl Shader {
    /// Create from SPIR-V words in either byte order. The stored binary is
    /// kept in native order.
    pub fn new(desc: ShaderDesc, mut spirv: Vec<u32>) -> Result<Self> {
        normalize_words(&mut spirv);
        let resources = ShaderResources::new(&spirv, &desc)
            .with_context(|| format!("Failed to reflect shader '{}'", desc.name))?;
        debug!(
            "Created {} shader '{}' with {} resources",
            desc.shader_type,
            desc.name,
            resources.total_resources()
        );
        Ok(Self {
            desc,
            spirv,
            resources,
        })
    }

    /// Create from a SPIR-V file image in either byte order.
    pub fn from_bytes(desc: ShaderDesc, bytes: &[u8]) -> Result<Self> {
        let spirv = words_from_bytes(bytes)
            .with_context(|| format!("Shader '{}' is not a SPIR-V binary", desc.name))?;
        Self::new(desc, spirv)
    }

    /// Compile WGSL source and create the shader from the result.
    pub fn from_wgsl(desc: ShaderDesc, source: &str, entry_point: &str) -> Result<Self> {
        let spirv = compile_wgsl(source, entry_point, desc.shader_type)
            .with_context(|| format!("Failed to compile shader '{}'", desc.name))?;
        Self::new(desc, spirv)
    }

    pub fn desc(&self) -> &ShaderDesc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn shader_type(&self) -> ShaderType {
        self.desc.shader_type
    }

    pub fn resources(&self) -> &ShaderResources {
        &self.resources
    }

    pub fn spirv(&self) -> &[u32] {
        &self.spirv
    }

    /// Rewrite the `DescriptorSet` and `Binding` decorations of resource
    /// `name` in the stored binary.
    pub fn remap_binding(&mut self, name: &str, set: u32, binding: u32) -> Result<()> {
        let index = self
            .resources
            .find(name)
            .ok_or_else(|| anyhow::anyhow!("Resource '{name}' is not found in shader '{}'", self.desc.name))?;
        let has_set = self
            .resources
            .resource(index)
            .is_some_and(|r| r.descriptor_set_offset().is_some());
        if has_set {
            self.resources.patch_descriptor_set(&mut self.spirv, index, set)?;
        }
        self.resources.patch_binding(&mut self.spirv, index, binding)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod shader_tests;

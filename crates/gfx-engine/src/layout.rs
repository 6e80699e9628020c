//! Per-stage resource layout: which variable type every reflected
//! resource has and which immutable sampler, if any, it uses.

use std::sync::Arc;

use gfx_core::{ShaderResourceVariableType, ShaderType};
use shader_tools::{matches_with_suffix, Resource, ResourceKind, ShaderResources};

use crate::object::DeviceObject;
use crate::shader::Shader;

// ---------------------------------------------------------------------------
// Layout description
// ---------------------------------------------------------------------------

/// Overrides the variable type of resource `name` in `shader_stages`.
#[derive(Debug, Clone)]
pub struct ShaderResourceVariableDesc {
    pub shader_stages: ShaderType,
    pub name: String,
    pub var_type: ShaderResourceVariableType,
}

impl ShaderResourceVariableDesc {
    pub fn new(shader_stages: ShaderType, name: impl Into<String>, var_type: ShaderResourceVariableType) -> Self {
        Self {
            shader_stages,
            name: name.into(),
            var_type,
        }
    }
}

/// Sampler baked into the layout for a sampled image or separate sampler.
///
/// With combined samplers, `sampler_or_texture_name` names the texture and
/// matches the separate sampler `<name><suffix>`.
#[derive(Debug, Clone)]
pub struct ImmutableSamplerDesc {
    pub shader_stages: ShaderType,
    pub sampler_or_texture_name: String,
    pub sampler: Arc<DeviceObject>,
}

impl ImmutableSamplerDesc {
    pub fn new(shader_stages: ShaderType, sampler_or_texture_name: impl Into<String>, sampler: Arc<DeviceObject>) -> Self {
        Self {
            shader_stages,
            sampler_or_texture_name: sampler_or_texture_name.into(),
            sampler,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineResourceLayoutDesc {
    /// Type of every resource no entry in `variables` matches.
    pub default_variable_type: ShaderResourceVariableType,
    pub variables: Vec<ShaderResourceVariableDesc>,
    pub immutable_samplers: Vec<ImmutableSamplerDesc>,
}

impl PipelineResourceLayoutDesc {
    /// Type of the first variable enabled for `stage` whose name satisfies
    /// `matches`, or the default type.
    pub fn variable_type(&self, stage: ShaderType, matches: impl Fn(&str) -> bool) -> ShaderResourceVariableType {
        self.variables
            .iter()
            .find(|var| var.shader_stages.intersects(stage) && matches(&var.name))
            .map_or(self.default_variable_type, |var| var.var_type)
    }

    /// First immutable sampler enabled for `stage` with
    /// `resource_name == sampler_or_texture_name + suffix`.
    pub fn find_immutable_sampler(&self, stage: ShaderType, resource_name: &str, suffix: &str) -> Option<&ImmutableSamplerDesc> {
        self.immutable_samplers.iter().find(|sam| {
            sam.shader_stages.intersects(stage)
                && matches_with_suffix(resource_name, &sam.sampler_or_texture_name, suffix)
        })
    }
}

// ---------------------------------------------------------------------------
// Stage layout
// ---------------------------------------------------------------------------

/// Layout information attached to one reflected resource.
#[derive(Debug, Clone)]
pub struct LayoutResource {
    pub var_type: ShaderResourceVariableType,
    pub immutable_sampler: Option<Arc<DeviceObject>>,
    /// Flat index of the separate sampler paired with a separate image.
    pub paired_sampler: Option<usize>,
}

/// Resource layout of one shader stage, indexed like the stage's
/// reflection table.
#[derive(Debug)]
pub struct ShaderResourceLayout {
    shader: Arc<Shader>,
    resources: Vec<LayoutResource>,
}

impl ShaderResourceLayout {
    pub fn new(shader: Arc<Shader>, desc: &PipelineResourceLayoutDesc) -> Self {
        let reflection = shader.resources();
        let stage = reflection.shader_type();
        let suffix = reflection.combined_sampler_suffix();

        let resources = reflection
            .resources()
            .enumerate()
            .map(|(flat, res)| {
                let var_type = match (res.kind(), suffix) {
                    // A sampler takes the type of the texture it is combined with.
                    (ResourceKind::SeparateSampler, Some(suffix)) => {
                        desc.variable_type(stage, |var| matches_with_suffix(res.name, var, suffix))
                    }
                    _ => desc.variable_type(stage, |var| var == res.name),
                };
                let immutable_sampler = match res.kind() {
                    ResourceKind::SampledImage => desc.find_immutable_sampler(stage, res.name, ""),
                    ResourceKind::SeparateSampler => {
                        desc.find_immutable_sampler(stage, res.name, suffix.unwrap_or(""))
                    }
                    _ => None,
                }
                .map(|sam| Arc::clone(&sam.sampler));
                let paired_sampler = match res.kind() {
                    ResourceKind::SeparateImage => reflection.paired_resource(flat),
                    _ => None,
                };
                LayoutResource {
                    var_type,
                    immutable_sampler,
                    paired_sampler,
                }
            })
            .collect();

        Self { shader, resources }
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn shader_type(&self) -> ShaderType {
        self.shader.shader_type()
    }

    pub fn shader_name(&self) -> &str {
        self.shader.name()
    }

    pub fn reflection(&self) -> &ShaderResources {
        self.shader.resources()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Reflected record and layout information of resource `flat`.
    pub fn resource(&self, flat: usize) -> Option<(Resource<'_>, &LayoutResource)> {
        let res = self.reflection().resource(flat)?;
        Some((res, self.resources.get(flat)?))
    }

    pub fn variable_type(&self, flat: usize) -> Option<ShaderResourceVariableType> {
        self.resources.get(flat).map(|r| r.var_type)
    }

    /// Whether resource `flat` is exposed as a shader variable. Separate
    /// samplers are hidden when they are bound through their texture or
    /// are immutable.
    pub fn is_variable(&self, flat: usize) -> bool {
        let Some((res, layout)) = self.resource(flat) else {
            return false;
        };
        !(res.kind() == ResourceKind::SeparateSampler
            && (self.reflection().is_using_combined_samplers() || layout.immutable_sampler.is_some()))
    }

    /// Number of variables of `var_type`.
    pub fn variable_count(&self, var_type: ShaderResourceVariableType) -> usize {
        (0..self.len())
            .filter(|&flat| self.is_variable(flat) && self.resources[flat].var_type == var_type)
            .count()
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod layout_tests;

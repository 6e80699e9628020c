//! Pipeline state: per-stage layouts, static variables and layout
//! compatibility.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, warn};

use gfx_core::{BindShaderResourcesFlags, PsoCreateFlags, ShaderResourceVariableType, ShaderType};
use shader_tools::{matches_with_suffix, ResourceKind};

use crate::binding::ShaderResourceBinding;
use crate::layout::{PipelineResourceLayoutDesc, ShaderResourceLayout};
use crate::mapping::ResourceMapping;
use crate::shader::Shader;
use crate::variable::{ShaderVariable, ShaderVariableManager};

#[derive(Debug, Clone, Default)]
pub struct PipelineStateDesc {
    pub name: String,
    /// At most one shader per stage.
    pub shaders: Vec<Arc<Shader>>,
    pub resource_layout: PipelineResourceLayoutDesc,
    pub flags: PsoCreateFlags,
}

/// Immutable part of a pipeline shared with its binding objects.
#[derive(Debug)]
pub(crate) struct PipelineLayout {
    name: String,
    stages: Vec<Arc<ShaderResourceLayout>>,
}

impl PipelineLayout {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn stages(&self) -> &[Arc<ShaderResourceLayout>] {
        &self.stages
    }

    pub(crate) fn stage_index(&self, stage: ShaderType) -> Option<usize> {
        self.stages.iter().position(|s| s.shader_type() == stage)
    }

    pub(crate) fn shader_types(&self) -> ShaderType {
        self.stages
            .iter()
            .fold(ShaderType::empty(), |acc, s| acc | s.shader_type())
    }

    /// Same active stages, each with compatible resources. Stages are kept
    /// sorted by stage bit, so they can be compared pairwise.
    pub(crate) fn is_compatible_with(&self, other: &PipelineLayout) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.stages.len() == other.stages.len()
            && self.stages.iter().zip(&other.stages).all(|(a, b)| {
                a.shader_type() == b.shader_type() && a.reflection().is_compatible_with(b.reflection())
            })
    }
}

/// Description of the stages a layout entry may apply to, for warnings.
fn allowed_stages(mask: ShaderType, active: ShaderType) -> String {
    mask.iter()
        .map(|stage| {
            if active.contains(stage) {
                format!("{stage}")
            } else {
                format!("{stage} (Not enabled in PSO)")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Warn about layout entries that match nothing in any allowed stage.
fn verify_resource_layout(
    desc: &PipelineResourceLayoutDesc,
    stages: &[Arc<ShaderResourceLayout>],
    flags: PsoCreateFlags,
) {
    let active = stages
        .iter()
        .fold(ShaderType::empty(), |acc, s| acc | s.shader_type());

    if !flags.contains(PsoCreateFlags::IGNORE_MISSING_VARIABLES) {
        for var in &desc.variables {
            if var.shader_stages.is_empty() {
                warn!(
                    "No allowed shader stages are specified for {} variable '{}'.",
                    var.var_type, var.name
                );
                continue;
            }
            let found = stages
                .iter()
                .filter(|s| var.shader_stages.intersects(s.shader_type()))
                .any(|s| s.reflection().find(&var.name).is_some());
            if !found {
                warn!(
                    "{} variable '{}' is not found in any of the designated shader stages: {}",
                    var.var_type,
                    var.name,
                    allowed_stages(var.shader_stages, active)
                );
            }
        }
    }

    if !flags.contains(PsoCreateFlags::IGNORE_MISSING_IMMUTABLE_SAMPLERS) {
        for sam in &desc.immutable_samplers {
            let name = &sam.sampler_or_texture_name;
            if sam.shader_stages.is_empty() {
                warn!("No allowed shader stages are specified for immutable sampler '{name}'.");
                continue;
            }
            let found = stages
                .iter()
                .filter(|s| sam.shader_stages.intersects(s.shader_type()))
                .any(|s| {
                    let reflection = s.reflection();
                    let suffix = reflection.combined_sampler_suffix().unwrap_or("");
                    reflection.resources().any(|res| match res.kind() {
                        ResourceKind::SampledImage => res.name == name.as_str(),
                        ResourceKind::SeparateSampler => matches_with_suffix(res.name, name, suffix),
                        _ => false,
                    })
                });
            if !found {
                warn!(
                    "Immutable sampler '{}' is not found in any of the designated shader stages: {}",
                    name,
                    allowed_stages(sam.shader_stages, active)
                );
            }
        }
    }
}

/// A pipeline state object.
///
/// Owns the per-stage resource layouts and the static variables. Binding
/// objects created from it share the layouts and hold their own mutable and
/// dynamic variables.
#[derive(Debug)]
pub struct PipelineState {
    layout: Arc<PipelineLayout>,
    static_vars: Vec<ShaderVariableManager>,
}

impl PipelineState {
    pub fn new(desc: PipelineStateDesc) -> Result<Self> {
        if desc.shaders.is_empty() {
            bail!("Pipeline '{}' has no shaders", desc.name);
        }

        let mut seen = ShaderType::empty();
        let mut stages = Vec::with_capacity(desc.shaders.len());
        for shader in &desc.shaders {
            let stage = shader.shader_type();
            if seen.intersects(stage) {
                bail!(
                    "Pipeline '{}' has more than one {} shader ('{}')",
                    desc.name,
                    stage,
                    shader.name()
                );
            }
            seen |= stage;
            stages.push(Arc::new(ShaderResourceLayout::new(
                Arc::clone(shader),
                &desc.resource_layout,
            )));
        }

        // Stage order is fixed by the stage bit, not by the order of `shaders`.
        stages.sort_by_key(|s| s.shader_type().bits());

        verify_resource_layout(&desc.resource_layout, &stages, desc.flags);

        let static_vars = stages
            .iter()
            .map(|s| ShaderVariableManager::new(Arc::clone(s), &[ShaderResourceVariableType::Static]))
            .collect();

        debug!("Created pipeline '{}' with stages {}", desc.name, seen);
        Ok(Self {
            layout: Arc::new(PipelineLayout {
                name: desc.name,
                stages,
            }),
            static_vars,
        })
    }

    pub fn name(&self) -> &str {
        self.layout.name()
    }

    /// Union of the active stages.
    pub fn shader_types(&self) -> ShaderType {
        self.layout.shader_types()
    }

    pub fn shader(&self, stage: ShaderType) -> Option<&Arc<Shader>> {
        self.resource_layout(stage).map(ShaderResourceLayout::shader)
    }

    pub fn resource_layout(&self, stage: ShaderType) -> Option<&ShaderResourceLayout> {
        let index = self.layout.stage_index(stage)?;
        Some(&self.layout.stages()[index])
    }

    /// Whether binding objects of `self` can be used with `other`.
    pub fn is_compatible_with(&self, other: &PipelineState) -> bool {
        Arc::ptr_eq(&self.layout, &other.layout) || self.layout.is_compatible_with(&other.layout)
    }

    fn active_stage(&self, stage: ShaderType, variable: &dyn std::fmt::Display) -> Option<usize> {
        let index = self.layout.stage_index(stage);
        if index.is_none() {
            warn!(
                "Unable to find static variable {} in shader stage {} as the stage is inactive in PSO '{}'",
                variable,
                stage,
                self.layout.name()
            );
        }
        index
    }

    pub(crate) fn static_manager(&self, stage: ShaderType) -> Option<&ShaderVariableManager> {
        self.static_vars.get(self.layout.stage_index(stage)?)
    }

    pub fn static_variable_count(&self, stage: ShaderType) -> usize {
        self.layout
            .stage_index(stage)
            .and_then(|i| self.static_vars.get(i))
            .map_or(0, ShaderVariableManager::variable_count)
    }

    pub fn static_variable(&mut self, stage: ShaderType, name: &str) -> Option<ShaderVariable<'_>> {
        let stage_index = self.active_stage(stage, &format_args!("'{name}'"))?;
        let manager = self.static_vars.get_mut(stage_index)?;
        let index = manager.find(name)?;
        manager.variable(index)
    }

    pub fn static_variable_by_index(&mut self, stage: ShaderType, index: usize) -> Option<ShaderVariable<'_>> {
        let stage_index = self.active_stage(stage, &format_args!("#{index}"))?;
        self.static_vars.get_mut(stage_index)?.variable(index)
    }

    /// Bind static variables of the stages in `stages` from `mapping`.
    pub fn bind_static_resources(
        &mut self,
        stages: ShaderType,
        mapping: &ResourceMapping,
        flags: BindShaderResourcesFlags,
    ) {
        for manager in &mut self.static_vars {
            if stages.intersects(manager.layout().shader_type()) {
                manager.bind_resources(mapping, flags);
            }
        }
    }

    /// Create a binding object; optionally copy the static resources into
    /// it right away.
    pub fn create_resource_binding(&self, init_static_resources: bool) -> ShaderResourceBinding {
        let mut binding = ShaderResourceBinding::new(Arc::clone(&self.layout));
        if init_static_resources {
            binding.copy_static_resources(self);
        }
        binding
    }

    pub(crate) fn layout(&self) -> &Arc<PipelineLayout> {
        &self.layout
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod pipeline_tests;

//! Shader resource binding objects.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{error, warn};

use gfx_core::{BindShaderResourcesFlags, ShaderResourceVariableType, ShaderType};
use shader_tools::ResourceKind;

use crate::mapping::ResourceMapping;
use crate::object::DeviceObject;
use crate::pipeline::{PipelineLayout, PipelineState};
use crate::variable::{print_name, ShaderVariable, ShaderVariableManager};

/// Resources of one shader resource binding, one manager per active stage.
///
/// Mutable and dynamic variables are set here directly. Static resources
/// live in the pipeline and are copied in by
/// [`ShaderResourceBinding::initialize_static_resources`].
#[derive(Debug)]
pub struct ShaderResourceBinding {
    pipeline: Arc<PipelineLayout>,
    managers: Vec<ShaderVariableManager>,
    static_resources_initialized: bool,
}

impl ShaderResourceBinding {
    pub(crate) fn new(pipeline: Arc<PipelineLayout>) -> Self {
        let managers = pipeline
            .stages()
            .iter()
            .map(|stage| {
                ShaderVariableManager::new(
                    Arc::clone(stage),
                    &[ShaderResourceVariableType::Mutable, ShaderResourceVariableType::Dynamic],
                )
            })
            .collect();
        Self {
            pipeline,
            managers,
            static_resources_initialized: false,
        }
    }

    /// Name of the pipeline this binding was created from.
    pub fn pipeline_name(&self) -> &str {
        self.pipeline.name()
    }

    pub fn static_resources_initialized(&self) -> bool {
        self.static_resources_initialized
    }

    /// Copy the static resources of `pipeline` into this binding. Only the
    /// first call has an effect.
    pub fn initialize_static_resources(&mut self, pipeline: &PipelineState) -> Result<()> {
        if !self.pipeline.is_compatible_with(pipeline.layout()) {
            bail!(
                "Pipeline '{}' is not compatible with the pipeline '{}' this shader resource binding was created from",
                pipeline.name(),
                self.pipeline.name()
            );
        }
        if self.static_resources_initialized {
            warn!(
                "Static resources have already been initialized in this shader resource binding object. The operation will be ignored."
            );
            return Ok(());
        }
        self.copy_static_resources(pipeline);
        Ok(())
    }

    pub(crate) fn copy_static_resources(&mut self, pipeline: &PipelineState) {
        for manager in &mut self.managers {
            let layout = Arc::clone(manager.layout());
            let Some(statics) = pipeline.static_manager(layout.shader_type()) else {
                continue;
            };
            for flat in 0..layout.len() {
                let Some((res, info)) = layout.resource(flat) else {
                    continue;
                };
                if info.var_type != ShaderResourceVariableType::Static {
                    continue;
                }
                // Immutable samplers are already in place.
                if res.kind() == ResourceKind::SeparateSampler && info.immutable_sampler.is_some() {
                    continue;
                }
                for (array_index, slot) in (0..).zip(statics.slots(flat)) {
                    if slot.is_none() {
                        error!(
                            "No resource is assigned to static shader variable '{}' in shader '{}'.",
                            print_name(res.name, res.array_size(), array_index),
                            layout.shader_name()
                        );
                    }
                }
                manager.copy_slots(statics, flat);
            }
        }
        self.static_resources_initialized = true;
    }

    fn active_stage(&self, stage: ShaderType, variable: &dyn std::fmt::Display) -> Option<usize> {
        let index = self.pipeline.stage_index(stage);
        if index.is_none() {
            warn!(
                "Unable to find mutable/dynamic variable {} in shader stage {} as the stage is inactive in PSO '{}'",
                variable,
                stage,
                self.pipeline.name()
            );
        }
        index
    }

    /// Bind mutable and dynamic variables of the stages in `stages` from
    /// `mapping`.
    pub fn bind_resources(&mut self, stages: ShaderType, mapping: &ResourceMapping, flags: BindShaderResourcesFlags) {
        for manager in &mut self.managers {
            if stages.intersects(manager.layout().shader_type()) {
                manager.bind_resources(mapping, flags);
            }
        }
    }

    pub fn variable(&mut self, stage: ShaderType, name: &str) -> Option<ShaderVariable<'_>> {
        let stage_index = self.active_stage(stage, &format_args!("'{name}'"))?;
        let manager = self.managers.get_mut(stage_index)?;
        let index = manager.find(name)?;
        manager.variable(index)
    }

    pub fn variable_by_index(&mut self, stage: ShaderType, index: usize) -> Option<ShaderVariable<'_>> {
        let stage_index = self.active_stage(stage, &format_args!("#{index}"))?;
        self.managers.get_mut(stage_index)?.variable(index)
    }

    pub fn variable_count(&self, stage: ShaderType) -> usize {
        match self.pipeline.stage_index(stage) {
            Some(stage_index) => self.managers[stage_index].variable_count(),
            None => {
                warn!(
                    "Unable to get the number of mutable/dynamic variables in shader stage {} as the stage is inactive in PSO '{}'",
                    stage,
                    self.pipeline.name()
                );
                0
            }
        }
    }

    /// Check the binding against `pipeline` and snapshot its resources.
    ///
    /// Unbound resources and uninitialized static resources are reported as
    /// errors in the log; an incompatible pipeline fails the commit.
    pub fn commit(&self, pipeline: &PipelineState) -> Result<CommittedResources> {
        if !self.pipeline.is_compatible_with(pipeline.layout()) {
            bail!(
                "Shader resource binding created from pipeline '{}' is not compatible with pipeline '{}'",
                self.pipeline.name(),
                pipeline.name()
            );
        }

        let has_statics = self.managers.iter().any(|m| {
            m.layout()
                .variable_count(ShaderResourceVariableType::Static)
                > 0
        });
        if has_statics && !self.static_resources_initialized {
            error!(
                "Static resources have not been initialized in the shader resource binding object being committed for PSO '{}'. Please call initialize_static_resources().",
                pipeline.name()
            );
        }

        let mut stages = Vec::with_capacity(self.managers.len());
        for manager in &self.managers {
            let layout = manager.layout();
            let mut resources = Vec::with_capacity(layout.len());
            for flat in 0..layout.len() {
                let Some((res, info)) = layout.resource(flat) else {
                    continue;
                };
                let objects = manager.slots(flat).to_vec();
                // Uninitialized static resources were reported above.
                let report_unbound =
                    self.static_resources_initialized || info.var_type != ShaderResourceVariableType::Static;
                for (array_index, slot) in (0..).zip(&objects) {
                    if slot.is_none() && report_unbound {
                        error!(
                            "No resource is bound to {} variable '{}' in shader '{}'",
                            info.var_type,
                            print_name(res.name, res.array_size(), array_index),
                            layout.shader_name()
                        );
                    }
                }
                resources.push(CommittedResource {
                    name: res.name.to_string(),
                    kind: res.kind(),
                    var_type: info.var_type,
                    objects,
                });
            }
            stages.push(CommittedStage {
                shader_type: layout.shader_type(),
                shader_name: layout.shader_name().to_string(),
                resources,
            });
        }

        Ok(CommittedResources {
            pipeline: pipeline.name().to_string(),
            stages,
        })
    }
}

/// Snapshot of one resource at commit time.
#[derive(Debug, Clone)]
pub struct CommittedResource {
    pub name: String,
    pub kind: ResourceKind,
    pub var_type: ShaderResourceVariableType,
    /// One entry per array element.
    pub objects: Vec<Option<Arc<DeviceObject>>>,
}

#[derive(Debug, Clone)]
pub struct CommittedStage {
    pub shader_type: ShaderType,
    pub shader_name: String,
    /// In reflection order.
    pub resources: Vec<CommittedResource>,
}

/// What a draw or dispatch would see after [`ShaderResourceBinding::commit`].
#[derive(Debug, Clone)]
pub struct CommittedResources {
    pub pipeline: String,
    pub stages: Vec<CommittedStage>,
}

impl CommittedResources {
    pub fn stage(&self, stage: ShaderType) -> Option<&CommittedStage> {
        self.stages.iter().find(|s| s.shader_type == stage)
    }

    /// Object bound to `name[array_index]` in `stage`.
    pub fn get(&self, stage: ShaderType, name: &str, array_index: u32) -> Option<&Arc<DeviceObject>> {
        self.stage(stage)?
            .resources
            .iter()
            .find(|r| r.name == name)?
            .objects
            .get(array_index as usize)?
            .as_ref()
    }
}

#[cfg(test)]
#[path = "binding_tests.rs"]
mod binding_tests;

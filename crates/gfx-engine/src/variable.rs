//! Shader variables and the per-stage resource cache behind them.
//!
//! A [`ShaderVariableManager`] owns one cache slot per array element of
//! every resource in a stage layout and exposes the subset of resources
//! whose variable type it manages. Pipelines hold a manager for static
//! variables; binding objects hold one for mutable and dynamic variables.

use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use gfx_core::{BindShaderResourcesFlags, ResourceDimension, ShaderResourceVariableType};
use shader_tools::{Resource, ResourceKind};

use crate::layout::ShaderResourceLayout;
use crate::mapping::ResourceMapping;
use crate::object::{BindFlags, DeviceObject, ObjectKind, ViewType};

/// Why an object could not be bound to a variable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("failed to bind {actual} '{object}' to variable '{variable}': {expected} is expected")]
    KindMismatch {
        variable: String,
        object: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("failed to bind {actual} '{object}' to variable '{variable}': {expected} is expected")]
    WrongViewType {
        variable: String,
        object: String,
        expected: ViewType,
        actual: ViewType,
    },
    #[error("failed to bind buffer '{object}' to uniform buffer variable '{variable}': the buffer was not created with the uniform buffer bind flag")]
    MissingBindFlag { variable: String, object: String },
    #[error("failed to bind texture view '{object}' to variable '{variable}': incorrect resource dimension, {expected} is expected but {actual} is provided")]
    DimensionMismatch {
        variable: String,
        object: String,
        expected: ResourceDimension,
        actual: ResourceDimension,
    },
    #[error("failed to bind texture view '{object}' to variable '{variable}': a {expected} texture is expected")]
    MultisampleMismatch {
        variable: String,
        object: String,
        expected: &'static str,
    },
    #[error("array index {index} is out of range for variable '{variable}' of size {array_size}")]
    ArrayIndexOutOfRange {
        variable: String,
        index: u32,
        array_size: u32,
    },
    #[error("non-null object '{bound}' is already bound to {var_type} variable '{variable}'; attempting to bind another object '{object}' is an error and will be ignored, use another shader resource binding instance or label the variable as dynamic")]
    AlreadyBound {
        variable: String,
        var_type: ShaderResourceVariableType,
        bound: String,
        object: String,
    },
    #[error("variable '{variable}' is assigned an immutable sampler and cannot be rebound")]
    ImmutableSampler { variable: String },
    #[error("resource index {0} does not exist in the layout")]
    UnknownResource(usize),
}

/// `name[index]` for arrays, `name` otherwise.
pub(crate) fn print_name(name: &str, array_size: u32, index: u32) -> String {
    if array_size > 1 {
        format!("{name}[{index}]")
    } else {
        name.to_string()
    }
}

fn verify_texture_view(
    res: &Resource<'_>,
    variable: &str,
    object: &DeviceObject,
    expected_view: ViewType,
) -> Result<(), BindError> {
    let ObjectKind::TextureView(view) = object.kind() else {
        return Err(BindError::KindMismatch {
            variable: variable.to_string(),
            object: object.name().to_string(),
            expected: "texture view",
            actual: object.type_name(),
        });
    };
    if view.view_type != expected_view {
        return Err(BindError::WrongViewType {
            variable: variable.to_string(),
            object: object.name().to_string(),
            expected: expected_view,
            actual: view.view_type,
        });
    }

    let expected_dim = res.dimension();
    if expected_dim != ResourceDimension::Undefined && view.dimension != expected_dim {
        return Err(BindError::DimensionMismatch {
            variable: variable.to_string(),
            object: object.name().to_string(),
            expected: expected_dim,
            actual: view.dimension,
        });
    }

    if view.dimension.supports_multisampling() {
        let view_is_ms = view.sample_count > 1;
        if res.is_multisampled() != view_is_ms {
            return Err(BindError::MultisampleMismatch {
                variable: variable.to_string(),
                object: object.name().to_string(),
                expected: if res.is_multisampled() { "multisample" } else { "single-sample" },
            });
        }
    }
    Ok(())
}

fn verify_buffer_view(
    variable: &str,
    object: &DeviceObject,
    expected_view: ViewType,
) -> Result<(), BindError> {
    match object.kind() {
        ObjectKind::BufferView { view_type } if *view_type == expected_view => Ok(()),
        ObjectKind::BufferView { view_type } => Err(BindError::WrongViewType {
            variable: variable.to_string(),
            object: object.name().to_string(),
            expected: expected_view,
            actual: *view_type,
        }),
        _ => Err(BindError::KindMismatch {
            variable: variable.to_string(),
            object: object.name().to_string(),
            expected: "buffer view",
            actual: object.type_name(),
        }),
    }
}

/// Check that `object` may be bound to a variable of `res`'s kind.
pub(crate) fn verify_binding(res: &Resource<'_>, variable: &str, object: &DeviceObject) -> Result<(), BindError> {
    match res.kind() {
        ResourceKind::UniformBuffer => match object.kind() {
            ObjectKind::Buffer { bind_flags } if bind_flags.contains(BindFlags::UNIFORM_BUFFER) => Ok(()),
            ObjectKind::Buffer { .. } => Err(BindError::MissingBindFlag {
                variable: variable.to_string(),
                object: object.name().to_string(),
            }),
            _ => Err(BindError::KindMismatch {
                variable: variable.to_string(),
                object: object.name().to_string(),
                expected: "buffer",
                actual: object.type_name(),
            }),
        },
        ResourceKind::ReadOnlyStorageBuffer | ResourceKind::UniformTexelBuffer => {
            verify_buffer_view(variable, object, ViewType::ShaderResource)
        }
        ResourceKind::ReadWriteStorageBuffer
        | ResourceKind::StorageTexelBuffer
        | ResourceKind::AtomicCounter => verify_buffer_view(variable, object, ViewType::UnorderedAccess),
        ResourceKind::StorageImage => verify_texture_view(res, variable, object, ViewType::UnorderedAccess),
        ResourceKind::SampledImage | ResourceKind::SeparateImage | ResourceKind::InputAttachment => {
            verify_texture_view(res, variable, object, ViewType::ShaderResource)
        }
        ResourceKind::SeparateSampler => match object.kind() {
            ObjectKind::Sampler => Ok(()),
            _ => Err(BindError::KindMismatch {
                variable: variable.to_string(),
                object: object.name().to_string(),
                expected: "sampler",
                actual: object.type_name(),
            }),
        },
    }
}

// ---------------------------------------------------------------------------
// Variable manager
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct ShaderVariableManager {
    layout: Arc<ShaderResourceLayout>,
    /// One slot per array element, indexed by flat resource index.
    cache: Vec<Vec<Option<Arc<DeviceObject>>>>,
    /// Flat indices of the exposed variables.
    variables: Vec<usize>,
}

impl ShaderVariableManager {
    /// Expose the variables whose type is in `var_types`, ordered by type
    /// and then by resource order.
    pub(crate) fn new(layout: Arc<ShaderResourceLayout>, var_types: &[ShaderResourceVariableType]) -> Self {
        let cache = (0..layout.len())
            .map(|flat| match layout.resource(flat) {
                Some((res, info)) => {
                    let sampler = match res.kind() {
                        ResourceKind::SeparateSampler => info.immutable_sampler.clone(),
                        _ => None,
                    };
                    vec![sampler; res.array_size() as usize]
                }
                None => Vec::new(),
            })
            .collect();

        let mut variables = Vec::new();
        for var_type in ShaderResourceVariableType::ALL {
            if !var_types.contains(&var_type) {
                continue;
            }
            variables.extend(
                (0..layout.len())
                    .filter(|&flat| layout.is_variable(flat) && layout.variable_type(flat) == Some(var_type)),
            );
        }

        Self {
            layout,
            cache,
            variables,
        }
    }

    pub(crate) fn layout(&self) -> &Arc<ShaderResourceLayout> {
        &self.layout
    }

    pub(crate) fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub(crate) fn find(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|&flat| {
            self.layout
                .reflection()
                .resource(flat)
                .is_some_and(|res| res.name == name)
        })
    }

    pub(crate) fn variable(&mut self, index: usize) -> Option<ShaderVariable<'_>> {
        let flat = *self.variables.get(index)?;
        Some(ShaderVariable {
            manager: self,
            index,
            flat,
        })
    }

    pub(crate) fn slot(&self, flat: usize, array_index: u32) -> Option<&Arc<DeviceObject>> {
        self.cache.get(flat)?.get(array_index as usize)?.as_ref()
    }

    pub(crate) fn is_bound(&self, flat: usize, array_index: u32) -> bool {
        self.slot(flat, array_index).is_some()
    }

    /// Cached objects of resource `flat`, one per array element.
    pub(crate) fn slots(&self, flat: usize) -> &[Option<Arc<DeviceObject>>] {
        self.cache.get(flat).map_or(&[], Vec::as_slice)
    }

    /// Copy the cached objects of resource `flat` from `other`. Both
    /// managers must come from the same layout.
    pub(crate) fn copy_slots(&mut self, other: &ShaderVariableManager, flat: usize) {
        if let (Some(dst), Some(src)) = (self.cache.get_mut(flat), other.cache.get(flat)) {
            dst.clone_from(src);
        }
    }

    /// Validate `object` and store it in `flat[array_index]`. Binding a
    /// texture view to a separate image also binds the view's sampler to
    /// the paired separate sampler.
    pub(crate) fn bind_object(
        &mut self,
        flat: usize,
        array_index: u32,
        object: &Arc<DeviceObject>,
    ) -> Result<(), BindError> {
        let layout = Arc::clone(&self.layout);
        let Some((res, info)) = layout.resource(flat) else {
            return Err(BindError::UnknownResource(flat));
        };
        let variable = print_name(res.name, res.array_size(), array_index);

        if array_index >= res.array_size() {
            return Err(BindError::ArrayIndexOutOfRange {
                variable: res.name.to_string(),
                index: array_index,
                array_size: res.array_size(),
            });
        }
        if res.kind() == ResourceKind::SeparateSampler && info.immutable_sampler.is_some() {
            return Err(BindError::ImmutableSampler { variable });
        }

        verify_binding(&res, &variable, object)?;

        if info.var_type != ShaderResourceVariableType::Dynamic {
            if let Some(bound) = self.slot(flat, array_index) {
                if !Arc::ptr_eq(bound, object) {
                    return Err(BindError::AlreadyBound {
                        variable,
                        var_type: info.var_type,
                        bound: bound.name().to_string(),
                        object: object.name().to_string(),
                    });
                }
            }
        }

        if res.kind() == ResourceKind::SampledImage
            && info.immutable_sampler.is_none()
            && object.view_sampler().is_none()
        {
            error!(
                "Error binding texture view '{}' to variable '{}' in shader '{}': no sampler is assigned to the view",
                object.name(),
                variable,
                layout.shader_name()
            );
        }

        if let Some(slot) = self.cache.get_mut(flat).and_then(|s| s.get_mut(array_index as usize)) {
            *slot = Some(Arc::clone(object));
        }

        if let Some(sampler_flat) = info.paired_sampler {
            self.bind_paired_sampler(&layout, sampler_flat, array_index, object);
        }
        Ok(())
    }

    fn bind_paired_sampler(
        &mut self,
        layout: &ShaderResourceLayout,
        sampler_flat: usize,
        image_index: u32,
        view: &Arc<DeviceObject>,
    ) {
        let Some((sampler, info)) = layout.resource(sampler_flat) else {
            return;
        };
        if info.immutable_sampler.is_some() {
            return;
        }
        let sampler_index = if sampler.array_size() == 1 { 0 } else { image_index };
        let sampler_name = print_name(sampler.name, sampler.array_size(), sampler_index);

        let Some(object) = view.view_sampler() else {
            error!(
                "Failed to bind sampler to variable '{}' in shader '{}': no sampler is set in texture view '{}'",
                sampler_name,
                layout.shader_name(),
                view.name()
            );
            return;
        };
        if let Err(e) = self.bind_object(sampler_flat, sampler_index, object) {
            error!("Shader '{}': {e}", layout.shader_name());
        }
    }

    /// Bind every managed variable selected by `flags` from `mapping`.
    /// Failures are logged and do not stop the update.
    pub(crate) fn bind_resources(&mut self, mapping: &ResourceMapping, flags: BindShaderResourcesFlags) {
        let layout = Arc::clone(&self.layout);
        for v in 0..self.variables.len() {
            let flat = self.variables[v];
            let Some((res, info)) = layout.resource(flat) else {
                continue;
            };
            if !flags.updates(info.var_type) {
                continue;
            }

            for array_index in 0..res.array_size() {
                if flags.contains(BindShaderResourcesFlags::KEEP_EXISTING) && self.is_bound(flat, array_index) {
                    continue;
                }
                match mapping.get_resource(res.name, array_index) {
                    Some(object) => {
                        if let Err(e) = self.bind_object(flat, array_index, &object) {
                            error!("Shader '{}': {e}", layout.shader_name());
                        }
                    }
                    None => {
                        if flags.contains(BindShaderResourcesFlags::VERIFY_ALL_RESOLVED)
                            && !self.is_bound(flat, array_index)
                        {
                            error!(
                                "Unable to bind resource to shader variable '{}': resource is not found in the resource mapping. Do not use BIND_SHADER_RESOURCES_VERIFY_ALL_RESOLVED flag to suppress the message if this is not an issue.",
                                print_name(res.name, res.array_size(), array_index)
                            );
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Variable handle
// ---------------------------------------------------------------------------

/// Handle to one shader variable of a pipeline or binding object.
#[derive(Debug)]
pub struct ShaderVariable<'a> {
    manager: &'a mut ShaderVariableManager,
    index: usize,
    flat: usize,
}

impl ShaderVariable<'_> {
    fn resource(&self) -> Option<Resource<'_>> {
        self.manager.layout.reflection().resource(self.flat)
    }

    pub fn name(&self) -> &str {
        self.resource().map_or("", |res| res.name)
    }

    /// Position of the variable within its manager.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn var_type(&self) -> ShaderResourceVariableType {
        self.manager.layout.variable_type(self.flat).unwrap_or_default()
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        self.resource().map(|res| res.kind())
    }

    pub fn array_size(&self) -> u32 {
        self.resource().map_or(0, |res| res.array_size())
    }

    /// Bind `object` to element 0.
    pub fn set(&mut self, object: &Arc<DeviceObject>) -> Result<(), BindError> {
        self.manager.bind_object(self.flat, 0, object)
    }

    /// Bind `objects` to consecutive elements starting at `first_element`.
    /// The whole range is checked before anything is bound.
    pub fn set_array(&mut self, objects: &[Arc<DeviceObject>], first_element: u32) -> Result<(), BindError> {
        let array_size = self.array_size();
        let end = u64::from(first_element) + objects.len() as u64;
        if end > u64::from(array_size) {
            return Err(BindError::ArrayIndexOutOfRange {
                variable: self.name().to_string(),
                index: u32::try_from(end - 1).unwrap_or(u32::MAX),
                array_size,
            });
        }
        for (array_index, object) in (first_element..).zip(objects) {
            self.manager.bind_object(self.flat, array_index, object)?;
        }
        Ok(())
    }

    /// Object bound to `array_index`, if any.
    pub fn get(&self, array_index: u32) -> Option<Arc<DeviceObject>> {
        self.manager.slot(self.flat, array_index).cloned()
    }

    pub fn is_bound(&self, array_index: u32) -> bool {
        self.manager.is_bound(self.flat, array_index)
    }
}

#[cfg(test)]
#[path = "variable_tests.rs"]
mod variable_tests;

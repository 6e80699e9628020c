//! Shader resource binding on top of SPIR-V reflection.
//!
//! This crate ties together [`gfx_core`] (shared vocabulary and logging) and
//! [`shader_tools`] (reflection) into pipeline-level resource management.
//!
//! # Overview
//!
//! - [`Shader`] is a SPIR-V binary plus its reflection table.
//! - [`DeviceObject`] stands in for buffers, views and samplers.
//! - [`ResourceMapping`] maps resource names to objects for bulk binding.
//! - [`PipelineState`] builds a [`ShaderResourceLayout`] per stage from a
//!   [`PipelineResourceLayoutDesc`] and owns the static variables.
//! - [`ShaderResourceBinding`] holds mutable and dynamic variables and
//!   produces [`CommittedResources`] for a draw or dispatch.
//!
//! Binding problems that should not abort the caller are logged with
//! `tracing`; capture them with [`gfx_core::DiagnosticRecorder`].

pub mod binding;
pub mod layout;
pub mod mapping;
pub mod object;
pub mod pipeline;
pub mod shader;
pub mod variable;

// Re-export primary types at crate root for convenience.
pub use binding::{CommittedResource, CommittedResources, CommittedStage, ShaderResourceBinding};
pub use layout::{
    ImmutableSamplerDesc, LayoutResource, PipelineResourceLayoutDesc, ShaderResourceLayout,
    ShaderResourceVariableDesc,
};
pub use mapping::{MappingError, ResourceMapping, ResourceMappingEntry};
pub use object::{BindFlags, DeviceObject, ObjectKind, TextureViewDesc, ViewType};
pub use pipeline::{PipelineState, PipelineStateDesc};
pub use shader::Shader;
pub use variable::{BindError, ShaderVariable};

#[cfg(test)]
mod test_shaders;

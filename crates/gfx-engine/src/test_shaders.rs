//! Shaders and device objects shared by the unit tests.

use std::sync::Arc;

use gfx_core::{ResourceDimension, ShaderType};
use shader_tools::spirv::builder::{ImageDesc, SpirvBuilder};
use shader_tools::spirv::{Dim, ExecutionModel};
use shader_tools::ShaderDesc;

use crate::object::{BindFlags, DeviceObject, TextureViewDesc, ViewType};
use crate::shader::Shader;

pub(crate) fn desc(name: &str, shader_type: ShaderType) -> ShaderDesc {
    ShaderDesc {
        name: name.into(),
        shader_type,
        ..Default::default()
    }
}

pub(crate) fn with_suffix(name: &str, shader_type: ShaderType, suffix: &str) -> ShaderDesc {
    ShaderDesc {
        combined_sampler_suffix: Some(suffix.into()),
        ..desc(name, shader_type)
    }
}

pub(crate) fn builder(model: ExecutionModel) -> SpirvBuilder {
    let mut b = SpirvBuilder::new();
    b.entry_point(model, "main");
    b
}

pub(crate) fn shader(b: &SpirvBuilder, desc: ShaderDesc) -> Arc<Shader> {
    Arc::new(Shader::new(desc, b.build()).unwrap())
}

/// `Constants` (uniform buffer) and `g_Positions` (read-only storage
/// buffer).
pub(crate) fn vertex_shader() -> Arc<Shader> {
    let mut b = builder(ExecutionModel::Vertex);
    b.uniform_buffer("Constants", "", 0);
    b.storage_buffer("g_Positions", "", true, 1);
    shader(&b, desc("VS", ShaderType::VERTEX))
}

/// Combined samplers with suffix `_sampler`:
///
/// | name            | kind             | array |
/// |-----------------|------------------|-------|
/// | `Constants`     | uniform buffer   | 1     |
/// | `g_Output`      | storage image    | 1     |
/// | `g_Tex_sampler` | separate sampler | 1     |
/// | `g_Tex`         | separate image   | 1     |
/// | `g_Lights`      | separate image   | 3     |
pub(crate) fn pixel_shader() -> Arc<Shader> {
    let mut b = builder(ExecutionModel::Fragment);
    b.uniform_buffer("Constants", "", 0);
    b.separate_image("g_Tex", ImageDesc::sampled(Dim::Dim2D), 1, 1);
    b.separate_sampler("g_Tex_sampler", 1, 2);
    b.separate_image("g_Lights", ImageDesc::sampled(Dim::Dim2D), 3, 3);
    b.storage_image("g_Output", Dim::Dim2D, 4);
    shader(&b, with_suffix("PS", ShaderType::PIXEL, "_sampler"))
}

pub(crate) fn uniform_buffer(name: &str) -> Arc<DeviceObject> {
    DeviceObject::buffer(name, BindFlags::UNIFORM_BUFFER)
}

pub(crate) fn structured_buffer(name: &str) -> Arc<DeviceObject> {
    DeviceObject::buffer_view(name, ViewType::ShaderResource)
}

pub(crate) fn texture_2d(name: &str) -> Arc<DeviceObject> {
    DeviceObject::texture_view(name, TextureViewDesc::shader_resource(ResourceDimension::Tex2D))
}

pub(crate) fn sampled_texture_2d(name: &str, sampler: &Arc<DeviceObject>) -> Arc<DeviceObject> {
    DeviceObject::texture_view(
        name,
        TextureViewDesc::shader_resource(ResourceDimension::Tex2D).with_sampler(Arc::clone(sampler)),
    )
}

pub(crate) fn storage_texture_2d(name: &str) -> Arc<DeviceObject> {
    DeviceObject::texture_view(name, TextureViewDesc::unordered_access(ResourceDimension::Tex2D))
}

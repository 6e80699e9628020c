//! Device objects that can be bound to shader variables.
//!
//! The native backend is out of scope, so objects only carry the
//! properties binding validation looks at. They are shared as
//! `Arc<DeviceObject>`; every mapping entry, cache slot and texture view
//! holding one keeps it alive.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use gfx_core::ResourceDimension;

bitflags! {
    /// How a buffer may be bound to the pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindFlags: u32 {
        const VERTEX_BUFFER = 0x01;
        const INDEX_BUFFER = 0x02;
        const UNIFORM_BUFFER = 0x04;
        const SHADER_RESOURCE = 0x08;
        const UNORDERED_ACCESS = 0x10;
    }
}

/// Access mode of a buffer or texture view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewType {
    ShaderResource,
    UnorderedAccess,
    RenderTarget,
    DepthStencil,
}

impl ViewType {
    pub fn name(self) -> &'static str {
        match self {
            ViewType::ShaderResource => "shader resource view",
            ViewType::UnorderedAccess => "unordered access view",
            ViewType::RenderTarget => "render target view",
            ViewType::DepthStencil => "depth stencil view",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Properties of a texture view.
#[derive(Debug, Clone)]
pub struct TextureViewDesc {
    pub view_type: ViewType,
    pub dimension: ResourceDimension,
    pub sample_count: u32,
    /// Sampler used when the view is bound to a separate image paired with
    /// a separate sampler, or to a sampled image.
    pub sampler: Option<Arc<DeviceObject>>,
}

impl TextureViewDesc {
    pub fn shader_resource(dimension: ResourceDimension) -> Self {
        Self {
            view_type: ViewType::ShaderResource,
            dimension,
            sample_count: 1,
            sampler: None,
        }
    }

    pub fn unordered_access(dimension: ResourceDimension) -> Self {
        Self {
            view_type: ViewType::UnorderedAccess,
            ..Self::shader_resource(dimension)
        }
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_sampler(mut self, sampler: Arc<DeviceObject>) -> Self {
        self.sampler = Some(sampler);
        self
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Buffer { bind_flags: BindFlags },
    BufferView { view_type: ViewType },
    TextureView(TextureViewDesc),
    Sampler,
}

/// A named, reference-counted device object.
#[derive(Debug)]
pub struct DeviceObject {
    name: String,
    kind: ObjectKind,
}

impl DeviceObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            kind,
        })
    }

    pub fn buffer(name: impl Into<String>, bind_flags: BindFlags) -> Arc<Self> {
        Self::new(name, ObjectKind::Buffer { bind_flags })
    }

    pub fn buffer_view(name: impl Into<String>, view_type: ViewType) -> Arc<Self> {
        Self::new(name, ObjectKind::BufferView { view_type })
    }

    pub fn texture_view(name: impl Into<String>, desc: TextureViewDesc) -> Arc<Self> {
        Self::new(name, ObjectKind::TextureView(desc))
    }

    pub fn sampler(name: impl Into<String>) -> Arc<Self> {
        Self::new(name, ObjectKind::Sampler)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Human-readable object type, used in binding errors.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ObjectKind::Buffer { .. } => "buffer",
            ObjectKind::BufferView { .. } => "buffer view",
            ObjectKind::TextureView(_) => "texture view",
            ObjectKind::Sampler => "sampler",
        }
    }

    /// Sampler attached to a texture view.
    pub fn view_sampler(&self) -> Option<&Arc<DeviceObject>> {
        match &self.kind {
            ObjectKind::TextureView(desc) => desc.sampler.as_ref(),
            _ => None,
        }
    }
}

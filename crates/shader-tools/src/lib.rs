//! Shader binary reflection.
//!
//! This crate turns a compiled SPIR-V binary into a compact, queryable
//! resource table.
//!
//! # Overview
//!
//! - [`spirv`] parses the binary and classifies module-scope variables.
//! - [`ShaderResources`] is the reflection table: eight resource buckets in
//!   one allocation, names interned in a [`StringPool`], separate
//!   image/sampler pairing, compatibility checks and a text dump.
//! - [`ResourceAttribs`] is the fixed-size record describing one resource,
//!   including where its `Binding` / `DescriptorSet` decorations live in the
//!   binary so they can be patched in place.
//! - [`compile::compile_wgsl`] produces SPIR-V from WGSL source.

pub mod attribs;
pub mod compile;
mod dump;
pub mod resources;
pub mod spirv;
pub mod string_pool;

// Re-export primary types at crate root for convenience.
pub use attribs::{
    matches_with_suffix, DecorationOffset, Resource, ResourceAttribs, ResourceBucket, ResourceKind,
    ShaderResourceDesc, ShaderResourceType, StageInput,
};
pub use resources::{ReflectionError, ShaderDesc, ShaderResources};
pub use string_pool::{PoolStr, StringPool, StringPoolError};

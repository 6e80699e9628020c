//! WGSL front-end.
//!
//! Parses and validates WGSL source with naga and emits a SPIR-V binary for
//! a single entry point, ready for [`crate::ShaderResources::new`].
//!
//! ```rust,ignore
//! use gfx_core::ShaderType;
//! use shader_tools::compile::compile_wgsl;
//!
//! let spirv = compile_wgsl(include_str!("blur.wgsl"), "main", ShaderType::COMPUTE)?;
//! ```

use anyhow::{anyhow, Result};
use gfx_core::ShaderType;
use tracing::debug;

fn to_naga(stage: ShaderType) -> Result<naga::ShaderStage> {
    if stage == ShaderType::VERTEX {
        Ok(naga::ShaderStage::Vertex)
    } else if stage == ShaderType::PIXEL {
        Ok(naga::ShaderStage::Fragment)
    } else if stage == ShaderType::COMPUTE {
        Ok(naga::ShaderStage::Compute)
    } else {
        Err(anyhow!("{stage} shaders are not supported by the WGSL front-end"))
    }
}

/// Compile `entry_point` of a WGSL module to SPIR-V words.
///
/// Debug names are always emitted so reflection can match resources by
/// name.
pub fn compile_wgsl(source: &str, entry_point: &str, stage: ShaderType) -> Result<Vec<u32>> {
    let shader_stage = to_naga(stage)?;

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| anyhow!("Failed to parse WGSL: {}", e.emit_to_string(source)))?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("WGSL validation failed: {e}"))?;

    let mut options = naga::back::spv::Options::default();
    options.flags |= naga::back::spv::WriterFlags::DEBUG;

    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage,
        entry_point: entry_point.to_string(),
    };

    let words = naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options))
        .map_err(|e| anyhow!("SPIR-V generation failed for '{entry_point}': {e}"))?;

    debug!("Compiled WGSL entry point '{entry_point}' to {} SPIR-V words", words.len());
    Ok(words)
}

#[cfg(test)]
#[path = "compile_tests.rs"]
mod compile_tests;

//! Shared vocabulary for the shader reflection and binding crates.
//!
//! This crate holds the small types that every layer agrees on:
//!
//! - [`ShaderType`] identifies pipeline stages (as a bit mask so layouts can
//!   target several stages at once).
//! - [`ResourceDimension`] describes the shape of a texture resource.
//! - [`ShaderResourceVariableType`] is the Static / Mutable / Dynamic
//!   rebinding granularity.
//! - [`PsoCreateFlags`] and [`BindShaderResourcesFlags`] control pipeline
//!   creation and bulk binding.
//!
//! It also owns the logging bootstrap ([`logging::init`]) and the
//! [`DiagnosticRecorder`] hook that captures non-fatal diagnostics.

pub mod diagnostics;
pub mod logging;
pub mod types;

// Re-export primary types at crate root for convenience.
pub use diagnostics::{Diagnostic, DiagnosticRecorder};
pub use types::{
    BindShaderResourcesFlags, PsoCreateFlags, ResourceDimension, ShaderResourceVariableType,
    ShaderType,
};

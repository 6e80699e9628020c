//! SPIR-V module parsing and resource classification.

#[cfg(any(test, feature = "test-utils"))]
pub mod builder;
pub mod consts;
pub mod module;
pub mod reflect;

pub use consts::{Decoration, Dim, ExecutionModel, SourceLanguage, StorageClass};
pub use module::{is_byte_swapped, normalize_words, words_from_bytes, EntryPoint, ImageType, Module, ModuleError};
pub use reflect::{ModuleResources, ReflectedResource};

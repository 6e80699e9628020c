//! SPIR-V binary parser.
//!
//! Walks the logical layout of a module up to the first function and keeps
//! what reflection needs: names, decorations (with the word offset of their
//! first operand), types, integer constants, module-scope variables, the
//! source language, declared extensions and entry points.
//!
//! Function bodies are not decoded.

use std::borrow::Cow;
use std::collections::HashMap;

use num_traits::FromPrimitive;
use thiserror::Error;

use super::consts::{Decoration, Dim, ExecutionModel, Op, SourceLanguage, StorageClass, HEADER_WORDS, MAGIC};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleError {
    #[error("binary size {0} is not a multiple of 4 bytes")]
    UnalignedSize(usize),
    #[error("binary is too short to hold a SPIR-V header ({0} words)")]
    TruncatedHeader(usize),
    #[error("invalid magic: expected 0x07230203, found {0:#010x}")]
    InvalidMagic(u32),
    #[error("instruction at word {offset} has zero word count")]
    ZeroWordCount { offset: usize },
    #[error("instruction at word {offset} runs past the end of the binary")]
    TruncatedInstruction { offset: usize },
    #[error("instruction {opcode} at word {offset} is missing operands")]
    MissingOperands { opcode: u16, offset: usize },
    #[error("string operand at word {offset} is not terminated or not UTF-8")]
    InvalidString { offset: usize },
}

/// A parsed `OpEntryPoint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub execution_model: ExecutionModel,
    pub id: u32,
    pub name: String,
    /// Ids of the `Input`/`Output` (and, from SPIR-V 1.4, all global)
    /// variables the entry point statically uses.
    pub interface: Vec<u32>,
}

impl EntryPoint {
    pub fn uses(&self, var_id: u32) -> bool {
        self.interface.contains(&var_id)
    }
}

/// One decoration applied to an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationEntry {
    pub decoration: Decoration,
    /// Word index of the first decoration operand inside the binary.
    pub operand_word: u32,
    pub literal: Option<u32>,
    pub string: Option<String>,
}

/// Type declarations relevant to resource classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Vector { component: u32, count: u32 },
    Matrix { column: u32, count: u32 },
    Image(ImageType),
    Sampler,
    SampledImage { image: u32 },
    Array { element: u32, length: u32 },
    RuntimeArray { element: u32 },
    Struct { members: Vec<u32> },
    Pointer { storage_class: Option<StorageClass>, pointee: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageType {
    pub sampled_type: u32,
    pub dim: Option<Dim>,
    pub arrayed: bool,
    pub multisampled: bool,
    pub sampled: u32,
}

/// Module-scope `OpVariable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    pub id: u32,
    pub pointer_type: u32,
    pub storage_class: Option<StorageClass>,
}

/// Structured view of a SPIR-V binary.
#[derive(Debug, Default)]
pub struct Module {
    pub(crate) source_language: Option<SourceLanguage>,
    pub(crate) extensions: Vec<String>,
    pub(crate) entry_points: Vec<EntryPoint>,
    pub(crate) names: HashMap<u32, String>,
    pub(crate) decorations: HashMap<u32, Vec<DecorationEntry>>,
    pub(crate) member_decorations: HashMap<u32, Vec<(u32, Decoration)>>,
    pub(crate) types: HashMap<u32, Type>,
    pub(crate) constants: HashMap<u32, u32>,
    pub(crate) variables: Vec<Variable>,
}

/// Reinterpret a byte blob as SPIR-V words, accepting either byte order.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, ModuleError> {
    if bytes.len() % 4 != 0 {
        return Err(ModuleError::UnalignedSize(bytes.len()));
    }
    let mut words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    normalize_words(&mut words);
    Ok(words)
}

/// Whether `words` is a SPIR-V stream in the opposite byte order.
pub fn is_byte_swapped(words: &[u32]) -> bool {
    words.first().is_some_and(|&w| w != MAGIC && w.swap_bytes() == MAGIC)
}

/// Bring a byte-swapped word stream into native order in place.
pub fn normalize_words(words: &mut [u32]) {
    if is_byte_swapped(words) {
        for w in words {
            *w = w.swap_bytes();
        }
    }
}

/// Decode a literal string starting at `words[0]`. Returns the string and the
/// number of words it occupies.
fn decode_string(words: &[u32], offset: usize) -> Result<(String, usize), ModuleError> {
    let mut bytes = Vec::new();
    for (i, word) in words.iter().enumerate() {
        for byte in word.to_le_bytes() {
            if byte == 0 {
                let text = String::from_utf8(bytes)
                    .map_err(|_| ModuleError::InvalidString { offset })?;
                return Ok((text, i + 1));
            }
            bytes.push(byte);
        }
    }
    Err(ModuleError::InvalidString { offset })
}

impl Module {
    /// Parse a word stream. The stream may be in either byte order.
    pub fn parse(words: &[u32]) -> Result<Self, ModuleError> {
        if words.len() < HEADER_WORDS {
            return Err(ModuleError::TruncatedHeader(words.len()));
        }
        let words: Cow<'_, [u32]> = if words[0] == MAGIC {
            Cow::Borrowed(words)
        } else if words[0].swap_bytes() == MAGIC {
            Cow::Owned(words.iter().map(|w| w.swap_bytes()).collect())
        } else {
            return Err(ModuleError::InvalidMagic(words[0]));
        };

        let mut module = Module::default();
        let mut offset = HEADER_WORDS;
        while offset < words.len() {
            let word_count = (words[offset] >> 16) as usize;
            let opcode = (words[offset] & 0xffff) as u16;
            if word_count == 0 {
                return Err(ModuleError::ZeroWordCount { offset });
            }
            let end = offset + word_count;
            if end > words.len() {
                return Err(ModuleError::TruncatedInstruction { offset });
            }

            let Some(op) = Op::from_u16(opcode) else {
                offset = end;
                continue;
            };
            if op == Op::Function {
                break;
            }
            module.parse_instruction(op, &words[offset + 1..end], offset)?;
            offset = end;
        }
        Ok(module)
    }

    fn parse_instruction(&mut self, op: Op, operands: &[u32], offset: usize) -> Result<(), ModuleError> {
        let need = |count: usize| {
            if operands.len() < count {
                Err(ModuleError::MissingOperands {
                    opcode: op as u16,
                    offset,
                })
            } else {
                Ok(())
            }
        };
        // Word index of operand `i` within the whole binary.
        let operand_word = |i: usize| (offset + 1 + i) as u32;

        match op {
            Op::Source => {
                need(2)?;
                self.source_language = SourceLanguage::from_u32(operands[0]);
            }
            Op::Name => {
                need(2)?;
                let (name, _) = decode_string(&operands[1..], offset + 2)?;
                self.names.insert(operands[0], name);
            }
            Op::MemberName => {}
            Op::Extension => {
                need(1)?;
                let (name, _) = decode_string(operands, offset + 1)?;
                self.extensions.push(name);
            }
            Op::EntryPoint => {
                need(3)?;
                let Some(execution_model) = ExecutionModel::from_u32(operands[0]) else {
                    return Ok(());
                };
                let (name, name_words) = decode_string(&operands[2..], offset + 3)?;
                self.entry_points.push(EntryPoint {
                    execution_model,
                    id: operands[1],
                    name,
                    interface: operands[2 + name_words..].to_vec(),
                });
            }
            Op::Decorate | Op::DecorateString => {
                need(2)?;
                let Some(decoration) = Decoration::from_u32(operands[1]) else {
                    return Ok(());
                };
                let (literal, string) = if op == Op::DecorateString {
                    need(3)?;
                    let (text, _) = decode_string(&operands[2..], offset + 3)?;
                    (None, Some(text))
                } else {
                    (operands.get(2).copied(), None)
                };
                self.decorations
                    .entry(operands[0])
                    .or_default()
                    .push(DecorationEntry {
                        decoration,
                        operand_word: operand_word(2),
                        literal,
                        string,
                    });
            }
            Op::MemberDecorate => {
                need(3)?;
                if let Some(decoration) = Decoration::from_u32(operands[2]) {
                    self.member_decorations
                        .entry(operands[0])
                        .or_default()
                        .push((operands[1], decoration));
                }
            }
            Op::TypeVoid => {
                need(1)?;
                self.types.insert(operands[0], Type::Void);
            }
            Op::TypeBool => {
                need(1)?;
                self.types.insert(operands[0], Type::Bool);
            }
            Op::TypeInt => {
                need(3)?;
                self.types.insert(
                    operands[0],
                    Type::Int {
                        width: operands[1],
                        signed: operands[2] != 0,
                    },
                );
            }
            Op::TypeFloat => {
                need(2)?;
                self.types.insert(operands[0], Type::Float { width: operands[1] });
            }
            Op::TypeVector => {
                need(3)?;
                self.types.insert(
                    operands[0],
                    Type::Vector {
                        component: operands[1],
                        count: operands[2],
                    },
                );
            }
            Op::TypeMatrix => {
                need(3)?;
                self.types.insert(
                    operands[0],
                    Type::Matrix {
                        column: operands[1],
                        count: operands[2],
                    },
                );
            }
            Op::TypeImage => {
                need(8)?;
                self.types.insert(
                    operands[0],
                    Type::Image(ImageType {
                        sampled_type: operands[1],
                        dim: Dim::from_u32(operands[2]),
                        arrayed: operands[4] != 0,
                        multisampled: operands[5] != 0,
                        sampled: operands[6],
                    }),
                );
            }
            Op::TypeSampler => {
                need(1)?;
                self.types.insert(operands[0], Type::Sampler);
            }
            Op::TypeSampledImage => {
                need(2)?;
                self.types
                    .insert(operands[0], Type::SampledImage { image: operands[1] });
            }
            Op::TypeArray => {
                need(3)?;
                self.types.insert(
                    operands[0],
                    Type::Array {
                        element: operands[1],
                        length: operands[2],
                    },
                );
            }
            Op::TypeRuntimeArray => {
                need(2)?;
                self.types
                    .insert(operands[0], Type::RuntimeArray { element: operands[1] });
            }
            Op::TypeStruct => {
                need(1)?;
                self.types.insert(
                    operands[0],
                    Type::Struct {
                        members: operands[1..].to_vec(),
                    },
                );
            }
            Op::TypePointer => {
                need(3)?;
                self.types.insert(
                    operands[0],
                    Type::Pointer {
                        storage_class: StorageClass::from_u32(operands[1]),
                        pointee: operands[2],
                    },
                );
            }
            Op::Constant | Op::SpecConstant => {
                need(3)?;
                self.constants.insert(operands[1], operands[2]);
            }
            Op::Variable => {
                need(3)?;
                let storage_class = StorageClass::from_u32(operands[2]);
                if storage_class != Some(StorageClass::Function) {
                    self.variables.push(Variable {
                        id: operands[1],
                        pointer_type: operands[0],
                        storage_class,
                    });
                }
            }
            Op::Function => {}
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_hlsl_source(&self) -> bool {
        self.source_language == Some(SourceLanguage::Hlsl)
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e == name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Debug name of an id, or `""` if none was given.
    pub fn name(&self, id: u32) -> &str {
        self.names.get(&id).map_or("", String::as_str)
    }

    pub fn ty(&self, id: u32) -> Option<&Type> {
        self.types.get(&id)
    }

    pub fn constant(&self, id: u32) -> Option<u32> {
        self.constants.get(&id).copied()
    }

    pub fn decoration(&self, id: u32, decoration: Decoration) -> Option<&DecorationEntry> {
        self.decorations
            .get(&id)?
            .iter()
            .find(|d| d.decoration == decoration)
    }

    pub fn has_decoration(&self, id: u32, decoration: Decoration) -> bool {
        self.decoration(id, decoration).is_some()
    }

    pub fn has_member_decoration(&self, type_id: u32, member: u32, decoration: Decoration) -> bool {
        self.member_decorations
            .get(&type_id)
            .is_some_and(|m| m.iter().any(|&(idx, d)| idx == member && d == decoration))
    }
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod module_tests;

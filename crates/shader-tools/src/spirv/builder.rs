//! Minimal SPIR-V assembler for tests.
//!
//! Emits just enough of a module's logical layout for reflection: source
//! language, extensions, entry points, names, decorations, types, constants,
//! module-scope variables and one empty function per entry point.

use super::consts::{Decoration, Dim, ExecutionModel, Op, SourceLanguage, StorageClass, MAGIC};

const OP_CAPABILITY: u16 = 17;
const OP_MEMORY_MODEL: u16 = 14;
const OP_TYPE_FUNCTION: u16 = 33;
const OP_FUNCTION_END: u16 = 56;
const OP_LABEL: u16 = 248;
const OP_RETURN: u16 = 253;

fn encode(out: &mut Vec<u32>, opcode: u16, operands: &[u32]) {
    out.push(((operands.len() as u32 + 1) << 16) | opcode as u32);
    out.extend_from_slice(operands);
}

/// Pack a literal string into NUL-terminated little-endian words.
pub fn string_words(text: &str) -> Vec<u32> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Image declaration options for [`SpirvBuilder::image_type`].
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    pub dim: Dim,
    pub arrayed: bool,
    pub multisampled: bool,
    /// 1 = sampled, 2 = storage.
    pub sampled: u32,
}

impl ImageDesc {
    pub fn sampled(dim: Dim) -> Self {
        Self {
            dim,
            arrayed: false,
            multisampled: false,
            sampled: 1,
        }
    }

    pub fn storage(dim: Dim) -> Self {
        Self {
            sampled: 2,
            ..Self::sampled(dim)
        }
    }

    pub fn arrayed(mut self) -> Self {
        self.arrayed = true;
        self
    }

    pub fn multisampled(mut self) -> Self {
        self.multisampled = true;
        self
    }
}

#[derive(Debug)]
struct EntryPointDecl {
    model: ExecutionModel,
    function: u32,
    name: String,
    interface: Vec<u32>,
}

#[derive(Debug, Default)]
pub struct SpirvBuilder {
    next_id: u32,
    extensions: Vec<u32>,
    entry_points: Vec<EntryPointDecl>,
    debug: Vec<u32>,
    annotations: Vec<u32>,
    globals: Vec<u32>,
    functions: Vec<u32>,
    float_type: Option<u32>,
    vec4_type: Option<u32>,
    uint_type: Option<u32>,
    void_fn_type: Option<(u32, u32)>,
}

impl SpirvBuilder {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    pub fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // -----------------------------------------------------------------------
    // Module-level declarations
    // -----------------------------------------------------------------------

    pub fn source(&mut self, language: SourceLanguage) -> &mut Self {
        encode(&mut self.debug, Op::Source as u16, &[language as u32, 500]);
        self
    }

    pub fn extension(&mut self, name: &str) -> &mut Self {
        encode(&mut self.extensions, Op::Extension as u16, &string_words(name));
        self
    }

    /// Declare an entry point backed by an empty function. Stage inputs
    /// declared afterwards join its interface.
    pub fn entry_point(&mut self, model: ExecutionModel, name: &str) -> u32 {
        let (void, fn_type) = self.void_fn_type();
        let function = self.id();
        let label = self.id();

        self.entry_points.push(EntryPointDecl {
            model,
            function,
            name: name.to_string(),
            interface: Vec::new(),
        });

        encode(&mut self.functions, Op::Function as u16, &[void, function, 0, fn_type]);
        encode(&mut self.functions, OP_LABEL, &[label]);
        encode(&mut self.functions, OP_RETURN, &[]);
        encode(&mut self.functions, OP_FUNCTION_END, &[]);
        function
    }

    /// Add `var` to the interface of the entry point whose function is
    /// `entry`.
    pub fn interface(&mut self, entry: u32, var: u32) -> &mut Self {
        if let Some(ep) = self.entry_points.iter_mut().find(|ep| ep.function == entry) {
            ep.interface.push(var);
        }
        self
    }

    fn add_to_last_interface(&mut self, var: u32) {
        if let Some(ep) = self.entry_points.last_mut() {
            ep.interface.push(var);
        }
    }

    pub fn name(&mut self, id: u32, name: &str) -> &mut Self {
        let mut operands = vec![id];
        operands.extend(string_words(name));
        encode(&mut self.debug, Op::Name as u16, &operands);
        self
    }

    pub fn decorate(&mut self, id: u32, decoration: Decoration, literals: &[u32]) -> &mut Self {
        let mut operands = vec![id, decoration as u32];
        operands.extend_from_slice(literals);
        encode(&mut self.annotations, Op::Decorate as u16, &operands);
        self
    }

    pub fn decorate_string(&mut self, id: u32, decoration: Decoration, text: &str) -> &mut Self {
        let mut operands = vec![id, decoration as u32];
        operands.extend(string_words(text));
        encode(&mut self.annotations, Op::DecorateString as u16, &operands);
        self
    }

    pub fn member_decorate(&mut self, type_id: u32, member: u32, decoration: Decoration) -> &mut Self {
        encode(
            &mut self.annotations,
            Op::MemberDecorate as u16,
            &[type_id, member, decoration as u32],
        );
        self
    }

    // -----------------------------------------------------------------------
    // Types and constants
    // -----------------------------------------------------------------------

    fn void_fn_type(&mut self) -> (u32, u32) {
        if let Some(types) = self.void_fn_type {
            return types;
        }
        let void = self.id();
        let fn_type = self.id();
        encode(&mut self.globals, Op::TypeVoid as u16, &[void]);
        encode(&mut self.globals, OP_TYPE_FUNCTION, &[fn_type, void]);
        self.void_fn_type = Some((void, fn_type));
        (void, fn_type)
    }

    pub fn float_type(&mut self) -> u32 {
        if let Some(id) = self.float_type {
            return id;
        }
        let id = self.id();
        encode(&mut self.globals, Op::TypeFloat as u16, &[id, 32]);
        self.float_type = Some(id);
        id
    }

    pub fn vec4_type(&mut self) -> u32 {
        if let Some(id) = self.vec4_type {
            return id;
        }
        let float = self.float_type();
        let id = self.id();
        encode(&mut self.globals, Op::TypeVector as u16, &[id, float, 4]);
        self.vec4_type = Some(id);
        id
    }

    pub fn uint_type(&mut self) -> u32 {
        if let Some(id) = self.uint_type {
            return id;
        }
        let id = self.id();
        encode(&mut self.globals, Op::TypeInt as u16, &[id, 32, 0]);
        self.uint_type = Some(id);
        id
    }

    pub fn constant_u32(&mut self, value: u32) -> u32 {
        let uint = self.uint_type();
        let id = self.id();
        encode(&mut self.globals, Op::Constant as u16, &[uint, id, value]);
        id
    }

    pub fn struct_type(&mut self, members: &[u32]) -> u32 {
        let id = self.id();
        let mut operands = vec![id];
        operands.extend_from_slice(members);
        encode(&mut self.globals, Op::TypeStruct as u16, &operands);
        id
    }

    pub fn image_type(&mut self, desc: ImageDesc) -> u32 {
        let float = self.float_type();
        let id = self.id();
        encode(
            &mut self.globals,
            Op::TypeImage as u16,
            &[
                id,
                float,
                desc.dim as u32,
                0,
                desc.arrayed as u32,
                desc.multisampled as u32,
                desc.sampled,
                0,
            ],
        );
        id
    }

    pub fn sampler_type(&mut self) -> u32 {
        let id = self.id();
        encode(&mut self.globals, Op::TypeSampler as u16, &[id]);
        id
    }

    pub fn sampled_image_type(&mut self, image: u32) -> u32 {
        let id = self.id();
        encode(&mut self.globals, Op::TypeSampledImage as u16, &[id, image]);
        id
    }

    pub fn array_type(&mut self, element: u32, length: u32) -> u32 {
        let length = self.constant_u32(length);
        let id = self.id();
        encode(&mut self.globals, Op::TypeArray as u16, &[id, element, length]);
        id
    }

    pub fn runtime_array_type(&mut self, element: u32) -> u32 {
        let id = self.id();
        encode(&mut self.globals, Op::TypeRuntimeArray as u16, &[id, element]);
        id
    }

    pub fn pointer_type(&mut self, storage_class: StorageClass, pointee: u32) -> u32 {
        let id = self.id();
        encode(
            &mut self.globals,
            Op::TypePointer as u16,
            &[id, storage_class as u32, pointee],
        );
        id
    }

    pub fn variable(&mut self, pointee: u32, storage_class: StorageClass) -> u32 {
        let pointer = self.pointer_type(storage_class, pointee);
        let id = self.id();
        encode(
            &mut self.globals,
            Op::Variable as u16,
            &[pointer, id, storage_class as u32],
        );
        id
    }

    fn wrap_array(&mut self, element: u32, array_size: u32) -> u32 {
        if array_size > 1 {
            self.array_type(element, array_size)
        } else {
            element
        }
    }

    fn bind(&mut self, var: u32, set: u32, binding: u32) {
        self.decorate(var, Decoration::DescriptorSet, &[set]);
        self.decorate(var, Decoration::Binding, &[binding]);
    }

    // -----------------------------------------------------------------------
    // Resource helpers
    // -----------------------------------------------------------------------

    /// `Uniform` block with a single `vec4` member.
    pub fn uniform_buffer(&mut self, block_name: &str, instance_name: &str, binding: u32) -> u32 {
        let vec4 = self.vec4_type();
        let block = self.struct_type(&[vec4]);
        self.name(block, block_name);
        self.decorate(block, Decoration::Block, &[]);
        let var = self.variable(block, StorageClass::Uniform);
        if !instance_name.is_empty() {
            self.name(var, instance_name);
        }
        self.bind(var, 0, binding);
        var
    }

    /// `StorageBuffer` block with a `vec4` member and a runtime array.
    pub fn storage_buffer(&mut self, block_name: &str, instance_name: &str, read_only: bool, binding: u32) -> u32 {
        let vec4 = self.vec4_type();
        let data = self.runtime_array_type(vec4);
        let block = self.struct_type(&[vec4, data]);
        self.name(block, block_name);
        self.decorate(block, Decoration::Block, &[]);
        if read_only {
            self.member_decorate(block, 0, Decoration::NonWritable);
            self.member_decorate(block, 1, Decoration::NonWritable);
        }
        let var = self.variable(block, StorageClass::StorageBuffer);
        if !instance_name.is_empty() {
            self.name(var, instance_name);
        }
        self.bind(var, 0, binding);
        var
    }

    /// Legacy `Uniform` + `BufferBlock` storage block.
    pub fn buffer_block(&mut self, block_name: &str, binding: u32) -> u32 {
        let vec4 = self.vec4_type();
        let block = self.struct_type(&[vec4]);
        self.name(block, block_name);
        self.decorate(block, Decoration::BufferBlock, &[]);
        let var = self.variable(block, StorageClass::Uniform);
        self.bind(var, 0, binding);
        var
    }

    pub fn separate_image(&mut self, name: &str, desc: ImageDesc, array_size: u32, binding: u32) -> u32 {
        let image = self.image_type(desc);
        let ty = self.wrap_array(image, array_size);
        let var = self.variable(ty, StorageClass::UniformConstant);
        self.name(var, name);
        self.bind(var, 0, binding);
        var
    }

    pub fn storage_image(&mut self, name: &str, dim: Dim, binding: u32) -> u32 {
        self.separate_image(name, ImageDesc::storage(dim), 1, binding)
    }

    pub fn separate_sampler(&mut self, name: &str, array_size: u32, binding: u32) -> u32 {
        let sampler = self.sampler_type();
        let ty = self.wrap_array(sampler, array_size);
        let var = self.variable(ty, StorageClass::UniformConstant);
        self.name(var, name);
        self.bind(var, 0, binding);
        var
    }

    pub fn sampled_image(&mut self, name: &str, desc: ImageDesc, array_size: u32, binding: u32) -> u32 {
        let image = self.image_type(desc);
        let sampled = self.sampled_image_type(image);
        let ty = self.wrap_array(sampled, array_size);
        let var = self.variable(ty, StorageClass::UniformConstant);
        self.name(var, name);
        self.bind(var, 0, binding);
        var
    }

    pub fn input_attachment(&mut self, name: &str, index: u32, binding: u32) -> u32 {
        let var = self.separate_image(name, ImageDesc::sampled(Dim::SubpassData), 1, binding);
        self.decorate(var, Decoration::InputAttachmentIndex, &[index]);
        var
    }

    pub fn atomic_counter(&mut self, name: &str, binding: u32) -> u32 {
        let uint = self.uint_type();
        let var = self.variable(uint, StorageClass::AtomicCounter);
        self.name(var, name);
        self.decorate(var, Decoration::Binding, &[binding]);
        var
    }

    /// Non-builtin `Input` variable with an optional HLSL semantic.
    pub fn stage_input(&mut self, name: &str, location: u32, semantic: Option<&str>) -> u32 {
        let vec4 = self.vec4_type();
        let var = self.variable(vec4, StorageClass::Input);
        self.add_to_last_interface(var);
        self.name(var, name);
        self.decorate(var, Decoration::Location, &[location]);
        if let Some(semantic) = semantic {
            self.decorate_string(var, Decoration::UserSemantic, semantic);
        }
        var
    }

    pub fn builtin_input(&mut self, name: &str, builtin: u32) -> u32 {
        let vec4 = self.vec4_type();
        let var = self.variable(vec4, StorageClass::Input);
        self.add_to_last_interface(var);
        self.name(var, name);
        self.decorate(var, Decoration::BuiltIn, &[builtin]);
        var
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    pub fn build(&self) -> Vec<u32> {
        let mut words = vec![MAGIC, 0x0001_0000, 0, self.next_id, 0];
        // OpCapability Shader, OpMemoryModel Logical GLSL450.
        encode(&mut words, OP_CAPABILITY, &[1]);
        words.extend_from_slice(&self.extensions);
        encode(&mut words, OP_MEMORY_MODEL, &[0, 1]);
        for ep in &self.entry_points {
            let mut operands = vec![ep.model as u32, ep.function];
            operands.extend(string_words(&ep.name));
            operands.extend_from_slice(&ep.interface);
            encode(&mut words, Op::EntryPoint as u16, &operands);
        }
        words.extend_from_slice(&self.debug);
        words.extend_from_slice(&self.annotations);
        words.extend_from_slice(&self.globals);
        words.extend_from_slice(&self.functions);
        words
    }
}

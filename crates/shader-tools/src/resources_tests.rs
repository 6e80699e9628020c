use gfx_core::{DiagnosticRecorder, ResourceDimension, ShaderType};

use super::*;
use crate::spirv::builder::{ImageDesc, SpirvBuilder};
use crate::spirv::{ExecutionModel, SourceLanguage};

fn desc(name: &str, shader_type: ShaderType) -> ShaderDesc {
    ShaderDesc {
        name: name.into(),
        shader_type,
        ..Default::default()
    }
}

fn with_suffix(name: &str, shader_type: ShaderType, suffix: &str) -> ShaderDesc {
    ShaderDesc {
        combined_sampler_suffix: Some(suffix.into()),
        ..desc(name, shader_type)
    }
}

fn fragment() -> SpirvBuilder {
    let mut b = SpirvBuilder::new();
    b.entry_point(ExecutionModel::Fragment, "main");
    b
}

fn reflect(b: &SpirvBuilder, desc: &ShaderDesc) -> ShaderResources {
    ShaderResources::new(&b.build(), desc).unwrap()
}

fn names(res: &ShaderResources, bucket: ResourceBucket) -> Vec<String> {
    res.bucket(bucket).map(|r| r.name.to_string()).collect()
}

/// One resource of every kind.
fn kitchen_sink() -> SpirvBuilder {
    let mut b = fragment();
    b.uniform_buffer("Globals", "", 0);
    b.storage_buffer("Particles", "", true, 1);
    b.storage_buffer("Counters", "", false, 2);
    b.storage_image("g_RWTex", Dim::Dim2D, 3);
    b.storage_image("g_RWBuf", Dim::Buffer, 4);
    b.sampled_image("g_Combined", ImageDesc::sampled(Dim::Cube), 1, 5);
    b.sampled_image("g_CombinedBuf", ImageDesc::sampled(Dim::Buffer), 1, 6);
    b.atomic_counter("g_Atomic", 7);
    b.separate_sampler("g_Tex_sampler", 1, 8);
    b.separate_image("g_Tex", ImageDesc::sampled(Dim::Dim2D), 1, 9);
    b.separate_image("g_TexBuf", ImageDesc::sampled(Dim::Buffer), 1, 10);
    b.input_attachment("g_Subpass", 0, 11);
    b
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn buckets_are_contiguous_and_exhaustive() {
    let res = reflect(&kitchen_sink(), &with_suffix("sink", ShaderType::PIXEL, "_sampler"));

    let counts: Vec<usize> = ResourceBucket::ALL.iter().map(|&b| res.count(b)).collect();
    assert_eq!(counts, [1, 2, 2, 2, 1, 1, 2, 1]);
    assert_eq!(counts.iter().sum::<usize>(), res.total_resources());

    let mut expected_start = 0;
    for bucket in ResourceBucket::ALL {
        assert_eq!(res.bucket_start(bucket), expected_start);
        for r in res.bucket(bucket) {
            assert!(bucket.accepts(r.kind()), "{bucket:?} holds {:?}", r.kind());
        }
        expected_start += res.count(bucket);
    }
    assert_eq!(res.names_pool_remaining(), 0);
}

#[test]
fn kinds_and_dimensions() {
    let res = reflect(&kitchen_sink(), &desc("sink", ShaderType::PIXEL));
    let kind_of = |name: &str| res.resource(res.find(name).unwrap()).unwrap().kind();
    let dim_of = |name: &str| res.resource(res.find(name).unwrap()).unwrap().dimension();

    assert_eq!(kind_of("Particles"), ResourceKind::ReadOnlyStorageBuffer);
    assert_eq!(kind_of("Counters"), ResourceKind::ReadWriteStorageBuffer);
    assert_eq!(kind_of("g_RWTex"), ResourceKind::StorageImage);
    assert_eq!(kind_of("g_RWBuf"), ResourceKind::StorageTexelBuffer);
    assert_eq!(kind_of("g_Combined"), ResourceKind::SampledImage);
    assert_eq!(kind_of("g_CombinedBuf"), ResourceKind::UniformTexelBuffer);
    assert_eq!(kind_of("g_TexBuf"), ResourceKind::UniformTexelBuffer);
    assert_eq!(kind_of("g_Subpass"), ResourceKind::InputAttachment);

    assert_eq!(dim_of("Globals"), ResourceDimension::Undefined);
    assert_eq!(dim_of("g_Combined"), ResourceDimension::TexCube);
    assert_eq!(dim_of("g_RWBuf"), ResourceDimension::Buffer);
    assert_eq!(dim_of("g_Subpass"), ResourceDimension::Tex2D);
}

#[test]
fn end_to_end_fragment_shader() {
    let mut b = fragment();
    b.uniform_buffer("Test", "", 0);
    b.sampled_image("g_tex2D", ImageDesc::sampled(Dim::Dim2D), 1, 1);
    b.input_attachment("g_SubpassInput", 0, 2);

    let res = reflect(&b, &with_suffix("Test", ShaderType::PIXEL, "_sampler"));
    assert_eq!(res.count(ResourceBucket::UniformBuffers), 1);
    assert_eq!(res.count(ResourceBucket::SampledImages), 1);
    assert_eq!(res.count(ResourceBucket::SeparateSamplers), 0);
    assert_eq!(res.count(ResourceBucket::InputAttachments), 1);
    assert_eq!(res.total_resources(), 3);
    assert_eq!(res.entry_point(), "main");
    assert_eq!(res.name(), "Test");
    assert_eq!(res.combined_sampler_suffix(), Some("_sampler"));
    assert!(res.is_using_combined_samplers());
    assert_eq!(
        res.resources().map(|r| r.name).collect::<Vec<_>>(),
        ["Test", "g_tex2D", "g_SubpassInput"]
    );
}

#[test]
fn arrays_and_image_flags() {
    let mut b = fragment();
    b.separate_image("g_Layers", ImageDesc::sampled(Dim::Dim2D).arrayed(), 4, 0);
    b.separate_image("g_MS", ImageDesc::sampled(Dim::Dim2D).multisampled(), 1, 1);
    b.separate_image("g_Cubes", ImageDesc::sampled(Dim::Cube).arrayed(), 1, 2);

    let res = reflect(&b, &desc("arrays", ShaderType::PIXEL));
    let layers = res.get(ResourceBucket::SeparateImages, 0).unwrap();
    assert_eq!(layers.array_size(), 4);
    assert_eq!(layers.dimension(), ResourceDimension::Tex2DArray);

    let ms = res.get(ResourceBucket::SeparateImages, 1).unwrap();
    assert!(ms.is_multisampled());
    assert_eq!(ms.array_size(), 1);

    let cubes = res.get(ResourceBucket::SeparateImages, 2).unwrap();
    assert_eq!(cubes.dimension(), ResourceDimension::TexCubeArray);
    assert!(res.get(ResourceBucket::SeparateImages, 3).is_none());
}

#[test]
fn uniform_buffer_naming() {
    let mut hlsl = fragment();
    hlsl.source(SourceLanguage::Hlsl);
    hlsl.uniform_buffer("type_Constants", "Constants", 0);
    hlsl.uniform_buffer("type_Anonymous", "", 1);
    let res = reflect(&hlsl, &desc("hlsl", ShaderType::PIXEL));
    assert!(res.is_hlsl_source());
    assert_eq!(names(&res, ResourceBucket::UniformBuffers), ["Constants", "type_Anonymous"]);
    assert_eq!(res.names_pool_remaining(), 0);

    let mut glsl = fragment();
    glsl.source(SourceLanguage::Glsl);
    glsl.uniform_buffer("Constants", "cb", 0);
    let res = reflect(&glsl, &desc("glsl", ShaderType::PIXEL));
    assert!(!res.is_hlsl_source());
    assert_eq!(names(&res, ResourceBucket::UniformBuffers), ["Constants"]);
}

#[test]
fn storage_buffer_names_fall_back() {
    let mut b = fragment();
    b.storage_buffer("", "instance", false, 0);
    b.buffer_block("Legacy", 1);
    let res = reflect(&b, &desc("sb", ShaderType::PIXEL));
    assert_eq!(names(&res, ResourceBucket::StorageBuffers), ["instance", "Legacy"]);
    assert_eq!(
        res.get(ResourceBucket::StorageBuffers, 1).unwrap().kind(),
        ResourceKind::ReadWriteStorageBuffer
    );
}

#[test]
fn missing_binding_is_fatal() {
    let mut b = fragment();
    let sampler = b.sampler_type();
    let var = b.variable(sampler, crate::spirv::StorageClass::UniformConstant);
    b.name(var, "g_Loose");

    let err = ShaderResources::new(&b.build(), &desc("loose", ShaderType::PIXEL)).unwrap_err();
    assert!(matches!(
        err,
        ReflectionError::MissingDecoration { ref name, decoration: "Binding" } if name == "g_Loose"
    ));
}

#[test]
fn atomic_counters_have_no_descriptor_set() {
    let mut b = fragment();
    b.atomic_counter("g_Counter", 3);
    let res = reflect(&b, &desc("ac", ShaderType::PIXEL));
    let counter = res.get(ResourceBucket::AtomicCounters, 0).unwrap();
    assert!(counter.descriptor_set_offset().is_none());

    let (desc, recorder) = DiagnosticRecorder::capture(|| res.resource_desc(0));
    assert_eq!(desc.unwrap().kind, crate::ShaderResourceType::BufferUav);
    assert_eq!(recorder.warnings().len(), 1);
}

#[test]
fn rejects_multi_stage_type() {
    let err = ShaderResources::new(
        &fragment().build(),
        &desc("multi", ShaderType::PIXEL | ShaderType::VERTEX),
    )
    .unwrap_err();
    assert!(matches!(err, ReflectionError::InvalidShaderType(_)));
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

#[test]
fn first_matching_entry_point_wins() {
    let mut b = SpirvBuilder::new();
    b.entry_point(ExecutionModel::Vertex, "mainA");
    b.entry_point(ExecutionModel::Fragment, "ps");
    b.entry_point(ExecutionModel::Vertex, "mainB");

    let (res, recorder) =
        DiagnosticRecorder::capture(|| ShaderResources::new(&b.build(), &desc("vs", ShaderType::VERTEX)));
    assert_eq!(res.unwrap().entry_point(), "mainA");
    assert_eq!(recorder.warnings().len(), 1);
    assert!(recorder.warnings()[0].contains("'mainA'"));
}

#[test]
fn missing_entry_point() {
    let err = ShaderResources::new(&fragment().build(), &desc("cs", ShaderType::COMPUTE)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unable to find entry point of type Compute in SPIR-V binary for shader 'cs'"
    );
}

// ---------------------------------------------------------------------------
// Sampler pairing
// ---------------------------------------------------------------------------

#[test]
fn separate_images_pair_with_suffixed_samplers() {
    let mut b = fragment();
    b.separate_image("g_Normal", ImageDesc::sampled(Dim::Dim2D), 1, 0);
    b.separate_image("g_Tex", ImageDesc::sampled(Dim::Dim2D), 1, 1);
    b.separate_sampler("g_Linear", 1, 2);
    b.separate_sampler("g_Tex_sampler", 1, 3);

    let (res, recorder) = DiagnosticRecorder::capture(|| {
        reflect(&b, &with_suffix("pairs", ShaderType::PIXEL, "_sampler"))
    });

    let tex = res.get(ResourceBucket::SeparateImages, 1).unwrap();
    let sampler = res.get(ResourceBucket::SeparateSamplers, 1).unwrap();
    assert_eq!(tex.paired_index(), Some(1));
    assert_eq!(sampler.paired_index(), Some(1));
    assert_eq!(res.get(ResourceBucket::SeparateImages, 0).unwrap().paired_index(), None);
    assert_eq!(res.get(ResourceBucket::SeparateSamplers, 0).unwrap().paired_index(), None);

    let tex_flat = res.find("g_Tex").unwrap();
    let sampler_flat = res.find("g_Tex_sampler").unwrap();
    assert_eq!(res.paired_resource(tex_flat), Some(sampler_flat));
    assert_eq!(res.paired_resource(sampler_flat), Some(tex_flat));

    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'g_Linear' is not assigned"));
}

#[test]
fn no_pairing_without_suffix() {
    let mut b = fragment();
    b.separate_image("g_Tex", ImageDesc::sampled(Dim::Dim2D), 1, 0);
    b.separate_sampler("g_Tex_sampler", 1, 1);

    let (res, recorder) = DiagnosticRecorder::capture(|| reflect(&b, &desc("plain", ShaderType::PIXEL)));
    assert!(res.resources().all(|r| r.paired_index().is_none()));
    assert!(!res.is_using_combined_samplers());
    assert!(recorder.diagnostics().is_empty());
}

#[test]
fn texel_buffers_are_never_paired() {
    let mut b = fragment();
    b.separate_image("g_Buf", ImageDesc::sampled(Dim::Buffer), 1, 0);
    b.separate_sampler("g_Buf_sampler", 1, 1);

    let (res, recorder) = DiagnosticRecorder::capture(|| {
        reflect(&b, &with_suffix("texel", ShaderType::PIXEL, "_sampler"))
    });
    assert!(res.resources().all(|r| r.paired_index().is_none()));
    assert_eq!(recorder.warnings().len(), 1);
    assert!(recorder.warnings()[0].contains("uniform texel buffer 'g_Buf'"));
    // The sampler is left without an image.
    assert_eq!(recorder.errors().len(), 1);
}

#[test]
fn sampler_array_size_must_match() {
    let mut b = fragment();
    b.separate_image("g_Tex", ImageDesc::sampled(Dim::Dim2D), 4, 0);
    b.separate_sampler("g_Tex_sampler", 2, 1);

    let (res, recorder) = DiagnosticRecorder::capture(|| {
        reflect(&b, &with_suffix("arr", ShaderType::PIXEL, "_sampler"))
    });
    assert_eq!(recorder.errors().len(), 1);
    assert!(recorder.errors()[0].contains("Array size (2)"));
    // Still linked.
    assert_eq!(res.get(ResourceBucket::SeparateImages, 0).unwrap().paired_index(), Some(0));
}

// ---------------------------------------------------------------------------
// Stage inputs
// ---------------------------------------------------------------------------

fn hlsl_vertex(with_extension: bool) -> SpirvBuilder {
    let mut b = SpirvBuilder::new();
    if with_extension {
        b.extension(HLSL_FUNCTIONALITY_EXTENSION);
    }
    b.source(SourceLanguage::Hlsl);
    b.entry_point(ExecutionModel::Vertex, "VSMain");
    b
}

fn vertex_desc() -> ShaderDesc {
    ShaderDesc {
        load_stage_inputs: true,
        ..desc("vs", ShaderType::VERTEX)
    }
}

#[test]
fn stage_input_semantics() {
    let mut b = hlsl_vertex(true);
    b.stage_input("in.var.ATTRIB0", 0, Some("ATTRIB0"));
    b.builtin_input("gl_VertexIndex", 42);
    b.stage_input("in.var.ATTRIB1", 1, Some("ATTRIB1"));
    let words = b.build();

    let res = ShaderResources::new(&words, &vertex_desc()).unwrap();
    assert_eq!(res.num_stage_inputs(), 2);
    let inputs: Vec<_> = res.stage_inputs().collect();
    assert_eq!(inputs[0].semantic, "ATTRIB0");
    assert_eq!(inputs[1].semantic, "ATTRIB1");
    assert_eq!(words[inputs[1].location_offset.word_index()], 1);
    assert_eq!(res.names_pool_remaining(), 0);
}

#[test]
fn stage_inputs_follow_the_entry_point_interface() {
    let mut b = hlsl_vertex(true);
    b.stage_input("in.var.POSITION", 0, Some("POSITION"));
    b.entry_point(ExecutionModel::Fragment, "PSMain");
    b.stage_input("in.var.TEXCOORD", 0, Some("TEXCOORD"));
    let words = b.build();

    let vs = ShaderResources::new(&words, &vertex_desc()).unwrap();
    let semantics: Vec<_> = vs.stage_inputs().map(|i| i.semantic).collect();
    assert_eq!(semantics, ["POSITION"]);
    assert_eq!(vs.names_pool_remaining(), 0);

    let module = Module::parse(&words).unwrap();
    let ps_inputs = module.resources(&module.entry_points()[1]).stage_inputs;
    assert_eq!(ps_inputs.len(), 1);
    assert_eq!(ps_inputs[0].name, "in.var.TEXCOORD");
}

#[test]
fn stage_inputs_need_the_hlsl_extension() {
    let mut b = hlsl_vertex(false);
    b.stage_input("in.var.ATTRIB0", 0, Some("ATTRIB0"));

    let (res, recorder) =
        DiagnosticRecorder::capture(|| ShaderResources::new(&b.build(), &vertex_desc()).unwrap());
    assert_eq!(res.num_stage_inputs(), 0);
    assert_eq!(recorder.warnings().len(), 1);
}

#[test]
fn stage_input_without_semantic_is_skipped() {
    let mut b = hlsl_vertex(true);
    b.stage_input("in.var.ATTRIB0", 0, Some("ATTRIB0"));
    b.stage_input("in.var.Unnamed", 1, None);

    let (res, recorder) =
        DiagnosticRecorder::capture(|| ShaderResources::new(&b.build(), &vertex_desc()).unwrap());
    assert_eq!(res.num_stage_inputs(), 1);
    assert_eq!(recorder.errors().len(), 1);
    assert!(recorder.errors()[0].contains("'in.var.Unnamed'"));
}

#[test]
fn stage_inputs_ignored_unless_requested() {
    let mut b = hlsl_vertex(true);
    b.stage_input("in.var.ATTRIB0", 0, Some("ATTRIB0"));
    let res = ShaderResources::new(&b.build(), &desc("vs", ShaderType::VERTEX)).unwrap();
    assert_eq!(res.num_stage_inputs(), 0);

    let mut glsl = SpirvBuilder::new();
    glsl.source(SourceLanguage::Glsl);
    glsl.entry_point(ExecutionModel::Vertex, "main");
    glsl.stage_input("in_Pos", 0, None);
    let (res, recorder) =
        DiagnosticRecorder::capture(|| ShaderResources::new(&glsl.build(), &vertex_desc()).unwrap());
    assert_eq!(res.num_stage_inputs(), 0);
    assert!(recorder.diagnostics().is_empty());
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[test]
fn process_resources_visits_in_storage_order() {
    let res = reflect(&kitchen_sink(), &desc("sink", ShaderType::PIXEL));
    let mut visited = Vec::new();
    res.process_resources(|bucket, r, n| visited.push((bucket, r.name.to_string(), n)));

    assert_eq!(visited.len(), res.total_resources());
    assert_eq!(visited[0], (ResourceBucket::UniformBuffers, "Globals".to_string(), 0));
    assert_eq!(visited[2], (ResourceBucket::StorageBuffers, "Counters".to_string(), 1));
    let flat: Vec<String> = res.resources().map(|r| r.name.to_string()).collect();
    assert_eq!(visited.iter().map(|v| v.1.clone()).collect::<Vec<_>>(), flat);
}

#[test]
fn compatibility() {
    let a = reflect(&kitchen_sink(), &with_suffix("a", ShaderType::PIXEL, "_sampler"));
    let b = reflect(&kitchen_sink(), &with_suffix("b", ShaderType::PIXEL, "_sampler"));
    assert!(a.is_compatible_with(&a));
    assert!(a.is_compatible_with(&b) && b.is_compatible_with(&a));

    // Pairing is part of the layout.
    let unpaired = reflect(&kitchen_sink(), &desc("c", ShaderType::PIXEL));
    assert!(!a.is_compatible_with(&unpaired));
    assert!(!unpaired.is_compatible_with(&a));

    let mut fewer = fragment();
    fewer.uniform_buffer("Globals", "", 0);
    let fewer = reflect(&fewer, &desc("d", ShaderType::PIXEL));
    assert!(!a.is_compatible_with(&fewer) && !fewer.is_compatible_with(&a));

    // Renamed resources with the same shape are still compatible.
    let mut x = fragment();
    x.separate_image("g_A", ImageDesc::sampled(Dim::Dim2D), 2, 0);
    let mut y = fragment();
    y.separate_image("g_B", ImageDesc::sampled(Dim::Dim3D), 2, 0);
    let mut z = fragment();
    z.separate_image("g_A", ImageDesc::sampled(Dim::Dim2D), 3, 0);
    let (x, y, z) = (
        reflect(&x, &desc("x", ShaderType::PIXEL)),
        reflect(&y, &desc("y", ShaderType::PIXEL)),
        reflect(&z, &desc("z", ShaderType::PIXEL)),
    );
    assert!(x.is_compatible_with(&y) && y.is_compatible_with(&x));
    assert!(!x.is_compatible_with(&z) && !z.is_compatible_with(&x));
}

#[test]
fn patch_decorations_in_place() {
    let mut b = fragment();
    b.uniform_buffer("Globals", "", 0);
    b.separate_image("g_Tex", ImageDesc::sampled(Dim::Dim2D), 1, 5);
    b.atomic_counter("g_Counter", 1);
    let mut words = b.build();
    let res = ShaderResources::new(&words, &desc("patch", ShaderType::PIXEL)).unwrap();

    let tex = res.find("g_Tex").unwrap();
    let binding_word = res.resource(tex).unwrap().binding_offset().word_index();
    assert_eq!(words[binding_word], 5);

    res.patch_binding(&mut words, tex, 9).unwrap();
    res.patch_descriptor_set(&mut words, tex, 2).unwrap();
    let module = Module::parse(&words).unwrap();
    let reflected = module.resources(&module.entry_points()[0]);
    let var = reflected.separate_images[0].id;
    assert_eq!(module.decoration(var, Decoration::Binding).unwrap().literal, Some(9));
    assert_eq!(module.decoration(var, Decoration::DescriptorSet).unwrap().literal, Some(2));

    let counter = res.find("g_Counter").unwrap();
    assert!(matches!(
        res.patch_descriptor_set(&mut words, counter, 0),
        Err(ReflectionError::MissingDecoration { decoration: "DescriptorSet", .. })
    ));
    assert!(matches!(
        res.patch_binding(&mut words, 17, 0),
        Err(ReflectionError::IndexOutOfRange { index: 17, total: 3 })
    ));
    assert!(matches!(
        res.patch_binding(&mut words[..4], tex, 0),
        Err(ReflectionError::OffsetOutOfRange { .. })
    ));
}

#[test]
fn patching_keeps_the_byte_order_of_the_binary() {
    let mut b = fragment();
    b.separate_image("g_Tex", ImageDesc::sampled(Dim::Dim2D), 1, 5);
    let mut swapped: Vec<u32> = b.build().iter().map(|w| w.swap_bytes()).collect();
    let res = ShaderResources::new(&swapped, &desc("swapped", ShaderType::PIXEL)).unwrap();

    let tex = res.find("g_Tex").unwrap();
    res.patch_binding(&mut swapped, tex, 9).unwrap();
    let word = res.resource(tex).unwrap().binding_offset().word_index();
    assert_eq!(swapped[word], 9u32.swap_bytes());

    let reparsed = ShaderResources::new(&swapped, &desc("swapped", ShaderType::PIXEL)).unwrap();
    let module = Module::parse(&swapped).unwrap();
    let var = module.resources(&module.entry_points()[0]).separate_images[0].id;
    assert_eq!(module.decoration(var, Decoration::Binding).unwrap().literal, Some(9));
    assert_eq!(reparsed.find("g_Tex"), Some(tex));
}

#[test]
fn dump_lists_every_resource() {
    let mut b = fragment();
    b.uniform_buffer("Constants", "", 0);
    b.separate_sampler("g_Tex_sampler", 1, 1);
    b.separate_image("g_Tex", ImageDesc::sampled(Dim::Dim2D), 2, 2);
    let res = reflect(&b, &with_suffix("PS", ShaderType::PIXEL, "_sampler"));

    let expected = format!(
        "Shader 'PS' resource stats: total resources: 3:\n\
         UBs: 1; SBs: 0; Imgs: 0; Smpl Imgs: 0; ACs: 0; Sep Imgs: 1; Sep Smpls: 1; Inpt Atchmnts: 0.\n\
         Resources:\
         \n  0 Uniform Buffer   {:>32}\
         \n  1 Separate Smpl    {:>32} Assigned sep image ind: 0\
         \n  2 Separate Img     {:>32} Assigned sep sampler ind: 0",
        "'Constants'", "'g_Tex_sampler'", "'g_Tex[2]'"
    );
    assert_eq!(res.dump(), expected);
    assert_eq!(res.to_string(), expected);
}

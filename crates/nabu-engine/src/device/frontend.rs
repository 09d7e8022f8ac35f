//! WGSL front end shared by every backend.
//!
//! Shader objects are parsed and validated with `naga` on compile; linking
//! checks the vertex → fragment interface and flattens the resources both stages
//! use into GL-style name tables (`name`, `name[i]`, `block.member`, `member`).

use std::collections::HashMap;

use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};

use super::handle::{AttribLocation, ProgramId, ShaderId};
use super::types::{ShaderStage, UniformLocation, UniformShape};

/// A validated WGSL module and the entry point selected for its stage.
pub(crate) struct CompiledModule {
    stage: ShaderStage,
    source: String,
    module: naga::Module,
    info: ModuleInfo,
    entry_index: usize,
}

impl CompiledModule {
    pub(crate) fn compile(stage: ShaderStage, source: &str) -> Result<Self, String> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

        let info = Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .map_err(|e| e.emit_to_string(source))?;

        let wanted = match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        };
        let entry_index = module
            .entry_points
            .iter()
            .position(|ep| ep.stage == wanted)
            .ok_or_else(|| format!("error: module has no @{stage} entry point"))?;

        Ok(Self {
            stage,
            source: source.to_owned(),
            module,
            info,
            entry_index,
        })
    }

    fn entry_point(&self) -> &naga::EntryPoint {
        &self.module.entry_points[self.entry_index]
    }
}

/// WGSL source plus the entry point a pipeline stage should run.
#[derive(Debug, Clone)]
pub(crate) struct StageModule {
    pub source: String,
    pub entry_point: String,
}

impl StageModule {
    fn of(compiled: &CompiledModule) -> Self {
        Self {
            source: compiled.source.clone(),
            entry_point: compiled.entry_point().name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttributeInfo {
    pub name: String,
    pub location: AttribLocation,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ResourceKind {
    /// `var<uniform>`; `size` is the declared byte size.
    Uniform { size: u32 },
    /// `var<storage, read>`; `size` is the minimum byte size.
    Storage { size: u32 },
    Texture,
    Sampler,
}

/// A bound global used by at least one stage of a linked program.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResourceInfo {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
    pub shape: UniformShape,
}

#[derive(Debug, Copy, Clone)]
struct UniformEntry {
    resource: u32,
    offset: u32,
    shape: UniformShape,
}

/// Interface of a successfully linked program.
pub(crate) struct LinkedProgram {
    pub vertex: StageModule,
    pub fragment: StageModule,
    pub attributes: Vec<AttributeInfo>,
    pub resources: Vec<ResourceInfo>,
    uniforms: HashMap<String, UniformEntry>,
}

impl LinkedProgram {
    pub(crate) fn link(vs: &CompiledModule, fs: &CompiledModule) -> Result<Self, String> {
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("error: program needs one vertex and one fragment shader".to_owned());
        }

        let mut errors = Vec::new();

        let outputs = varyings_out(&vs.module, vs.entry_point());
        for input in varyings_in(&fs.module, fs.entry_point()) {
            match outputs.iter().find(|o| o.location == input.location) {
                None => errors.push(format!(
                    "error: fragment input `{}` at @location({}) is not written by the vertex stage",
                    input.name, input.location
                )),
                Some(out) if out.ty != input.ty => errors.push(format!(
                    "error: @location({}) is written as {} but read as {}",
                    input.location, out.ty, input.ty
                )),
                Some(_) => {}
            }
        }

        let attributes = varyings_in(&vs.module, vs.entry_point())
            .into_iter()
            .map(|v| AttributeInfo {
                name: v.name,
                location: v.location,
            })
            .collect();

        let mut resources: Vec<ResourceInfo> = Vec::new();
        let mut uniforms = HashMap::new();

        for compiled in [vs, fs] {
            let module = &compiled.module;
            let used = compiled.info.get_entry_point(compiled.entry_index);

            for (handle, var) in module.global_variables.iter() {
                let Some(binding) = var.binding.as_ref() else { continue };
                // Globals the entry point never touches are inactive, like
                // uniforms a GLSL compiler optimized out.
                if used[handle].is_empty() {
                    continue;
                }

                let shape = shape_of(module, var.ty);
                let size = module.types[var.ty].inner.size(module.to_ctx());
                let kind = match var.space {
                    naga::AddressSpace::Uniform => ResourceKind::Uniform { size },
                    naga::AddressSpace::Storage { .. } => ResourceKind::Storage { size },
                    naga::AddressSpace::Handle => match shape {
                        UniformShape::Texture => ResourceKind::Texture,
                        UniformShape::Sampler => ResourceKind::Sampler,
                        _ => continue,
                    },
                    _ => continue,
                };
                let name = var.name.clone().unwrap_or_default();

                let same_slot = resources
                    .iter()
                    .find(|r| r.group == binding.group && r.binding == binding.binding);
                if let Some(prev) = same_slot {
                    if prev.name != name || prev.kind != kind || prev.shape != shape {
                        errors.push(format!(
                            "error: @group({}) @binding({}) is `{}: {}` in one stage and `{}: {}` in the other",
                            binding.group, binding.binding, prev.name, prev.shape, name, shape
                        ));
                    }
                    continue;
                }
                if resources.iter().any(|r| r.name == name) {
                    errors.push(format!("error: uniform `{name}` is bound to different slots per stage"));
                    continue;
                }

                let index = resources.len() as u32;
                let mut names = Vec::new();
                flatten(module, var.ty, &name, 0, &mut names);
                if let naga::TypeInner::Struct { members, .. } = &module.types[var.ty].inner {
                    // Bare member names, GL default-block style. Qualified names win.
                    for m in members {
                        if let Some(member) = &m.name {
                            flatten(module, m.ty, member, m.offset, &mut names);
                        }
                    }
                }
                for (key, offset, shape) in names {
                    uniforms.entry(key).or_insert(UniformEntry {
                        resource: index,
                        offset,
                        shape,
                    });
                }

                resources.push(ResourceInfo {
                    name,
                    group: binding.group,
                    binding: binding.binding,
                    kind,
                    shape,
                });
            }
        }

        if !errors.is_empty() {
            return Err(errors.join("\n"));
        }

        Ok(Self {
            vertex: StageModule::of(vs),
            fragment: StageModule::of(fs),
            attributes,
            resources,
            uniforms,
        })
    }

    pub(crate) fn attrib_location(&self, name: &str) -> Option<AttribLocation> {
        self.attributes.iter().find(|a| a.name == name).map(|a| a.location)
    }

    pub(crate) fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).map(|u| UniformLocation {
            program,
            resource: u.resource,
            offset: u.offset,
            shape: u.shape,
        })
    }
}

// ── type inspection ───────────────────────────────────────────────────────

struct Varying {
    name: String,
    location: u32,
    ty: String,
}

fn varyings_in(module: &naga::Module, ep: &naga::EntryPoint) -> Vec<Varying> {
    let mut out = Vec::new();
    for arg in &ep.function.arguments {
        collect_varyings(module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut out);
    }
    out
}

fn varyings_out(module: &naga::Module, ep: &naga::EntryPoint) -> Vec<Varying> {
    let mut out = Vec::new();
    if let Some(result) = &ep.function.result {
        collect_varyings(module, None, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

fn collect_varyings(
    module: &naga::Module,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<Varying>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.push(Varying {
            name: name.unwrap_or_default().to_owned(),
            location: *location,
            ty: io_type(module, ty),
        }),
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    collect_varyings(module, m.name.as_deref(), m.ty, m.binding.as_ref(), out);
                }
            }
        }
    }
}

/// Arena-independent spelling of an inter-stage type.
fn io_type(module: &naga::Module, ty: naga::Handle<naga::Type>) -> String {
    match &module.types[ty].inner {
        naga::TypeInner::Scalar(s) => format!("{:?}{}", s.kind, s.width * 8),
        naga::TypeInner::Vector { size, scalar } => {
            format!("vec{}<{:?}{}>", *size as u8, scalar.kind, scalar.width * 8)
        }
        other => format!("{other:?}"),
    }
}

fn shape_of(module: &naga::Module, ty: naga::Handle<naga::Type>) -> UniformShape {
    match &module.types[ty].inner {
        naga::TypeInner::Scalar(s) => match s.kind {
            naga::ScalarKind::Float if s.width == 4 => UniformShape::Float,
            naga::ScalarKind::Sint | naga::ScalarKind::Uint => UniformShape::Int,
            _ => UniformShape::Opaque,
        },
        naga::TypeInner::Vector { size, scalar } if scalar.kind == naga::ScalarKind::Float => {
            match size {
                naga::VectorSize::Bi => UniformShape::Vec2,
                naga::VectorSize::Tri => UniformShape::Vec3,
                naga::VectorSize::Quad => UniformShape::Vec4,
            }
        }
        naga::TypeInner::Array { base, size, stride } => match float_lanes(module, *base) {
            Some(components) => UniformShape::FloatArray {
                components,
                len: constant_len(size),
                stride: *stride,
            },
            None => UniformShape::Opaque,
        },
        naga::TypeInner::Image { .. } => UniformShape::Texture,
        naga::TypeInner::Sampler { .. } => UniformShape::Sampler,
        _ => UniformShape::Opaque,
    }
}

fn float_lanes(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Option<u32> {
    match &module.types[ty].inner {
        naga::TypeInner::Scalar(s) if s.kind == naga::ScalarKind::Float => Some(1),
        naga::TypeInner::Vector { size, scalar } if scalar.kind == naga::ScalarKind::Float => {
            Some(*size as u32)
        }
        _ => None,
    }
}

fn constant_len(size: &naga::ArraySize) -> Option<u32> {
    match size {
        naga::ArraySize::Constant(n) => Some(n.get()),
        _ => None,
    }
}

/// Emits every addressable name under `prefix` with its byte offset.
fn flatten(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    prefix: &str,
    offset: u32,
    out: &mut Vec<(String, u32, UniformShape)>,
) {
    let shape = shape_of(module, ty);
    out.push((prefix.to_owned(), offset, shape));

    match &module.types[ty].inner {
        naga::TypeInner::Array { size, stride, .. } => {
            let UniformShape::FloatArray { components, len, .. } = shape else { return };
            for i in 0..len.unwrap_or(1) {
                out.push((
                    format!("{prefix}[{i}]"),
                    offset + i * stride,
                    UniformShape::FloatArray {
                        components,
                        len: constant_len(size).map(|n| n - i),
                        stride: *stride,
                    },
                ));
            }
        }
        naga::TypeInner::Struct { members, .. } => {
            for m in members {
                if let Some(member) = &m.name {
                    flatten(module, m.ty, &format!("{prefix}.{member}"), offset + m.offset, out);
                }
            }
        }
        _ => {}
    }
}

// ── object tables ─────────────────────────────────────────────────────────

struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: Option<CompiledModule>,
    log: String,
    delete_pending: bool,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<ShaderId>,
    linked: Option<LinkedProgram>,
    log: String,
}

/// Shader and program object tables with GL lifetime rules: a deleted shader
/// stays alive while a program still has it attached.
#[derive(Default)]
pub(crate) struct ShaderFrontend {
    shaders: HashMap<ShaderId, ShaderObject>,
    programs: HashMap<ProgramId, ProgramObject>,
}

impl ShaderFrontend {
    pub(crate) fn create_shader(&mut self, id: ShaderId, stage: ShaderStage) {
        self.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: None,
                log: String::new(),
                delete_pending: false,
            },
        );
    }

    pub(crate) fn shader_source(&mut self, id: ShaderId, source: &str) {
        match self.shaders.get_mut(&id) {
            Some(shader) => shader.source = source.to_owned(),
            None => log::warn!("shader_source on unknown {id}"),
        }
    }

    /// Compiles a shader object; returns the status, `None` for an unknown id.
    pub(crate) fn compile_shader(&mut self, id: ShaderId) -> Option<bool> {
        let Some(shader) = self.shaders.get_mut(&id) else {
            log::warn!("compile_shader on unknown {id}");
            return None;
        };
        match CompiledModule::compile(shader.stage, &shader.source) {
            Ok(compiled) => {
                shader.compiled = Some(compiled);
                shader.log.clear();
            }
            Err(log) => {
                shader.compiled = None;
                shader.log = log;
            }
        }
        Some(shader.compiled.is_some())
    }

    pub(crate) fn compile_status(&self, id: ShaderId) -> bool {
        self.shaders.get(&id).is_some_and(|s| s.compiled.is_some())
    }

    pub(crate) fn shader_log(&self, id: ShaderId) -> String {
        self.shaders.get(&id).map(|s| s.log.clone()).unwrap_or_default()
    }

    pub(crate) fn shader_exists(&self, id: ShaderId) -> bool {
        self.shaders.get(&id).is_some_and(|s| !s.delete_pending)
    }

    pub(crate) fn delete_shader(&mut self, id: ShaderId) {
        let attached = self.programs.values().any(|p| p.attached.contains(&id));
        if attached {
            if let Some(shader) = self.shaders.get_mut(&id) {
                shader.delete_pending = true;
            }
        } else {
            self.shaders.remove(&id);
        }
    }

    pub(crate) fn create_program(&mut self, id: ProgramId) {
        self.programs.insert(id, ProgramObject::default());
    }

    pub(crate) fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        if !self.shader_exists(shader) {
            log::warn!("attach_shader: unknown {shader}");
            return;
        }
        match self.programs.get_mut(&program) {
            Some(p) if !p.attached.contains(&shader) => p.attached.push(shader),
            Some(_) => log::warn!("{shader} is already attached to {program}"),
            None => log::warn!("attach_shader: unknown {program}"),
        }
    }

    /// Links a program; returns the status, `None` for an unknown id.
    pub(crate) fn link_program(&mut self, id: ProgramId) -> Option<bool> {
        let Some(program) = self.programs.get(&id) else {
            log::warn!("link_program on unknown {id}");
            return None;
        };

        let find = |stage: ShaderStage| {
            let mut matching = program
                .attached
                .iter()
                .filter_map(|s| self.shaders.get(s))
                .filter(|s| s.stage == stage);
            match (matching.next(), matching.next()) {
                (Some(only), None) => only.compiled.as_ref(),
                _ => None,
            }
        };

        let result = match (find(ShaderStage::Vertex), find(ShaderStage::Fragment)) {
            (Some(vs), Some(fs)) => LinkedProgram::link(vs, fs),
            _ => Err(
                "error: program needs exactly one compiled vertex and one compiled fragment shader"
                    .to_owned(),
            ),
        };

        let program = self.programs.get_mut(&id)?;
        match result {
            Ok(linked) => {
                program.linked = Some(linked);
                program.log.clear();
            }
            Err(log) => {
                program.linked = None;
                program.log = log;
            }
        }
        Some(program.linked.is_some())
    }

    pub(crate) fn link_status(&self, id: ProgramId) -> bool {
        self.linked(id).is_some()
    }

    pub(crate) fn program_log(&self, id: ProgramId) -> String {
        self.programs.get(&id).map(|p| p.log.clone()).unwrap_or_default()
    }

    pub(crate) fn program_exists(&self, id: ProgramId) -> bool {
        self.programs.contains_key(&id)
    }

    pub(crate) fn delete_program(&mut self, id: ProgramId) {
        let Some(program) = self.programs.remove(&id) else { return };
        for shader in program.attached {
            let still_attached = self.programs.values().any(|p| p.attached.contains(&shader));
            let pending = self.shaders.get(&shader).is_some_and(|s| s.delete_pending);
            if pending && !still_attached {
                self.shaders.remove(&shader);
            }
        }
    }

    pub(crate) fn linked(&self, id: ProgramId) -> Option<&LinkedProgram> {
        self.programs.get(&id).and_then(|p| p.linked.as_ref())
    }

    pub(crate) fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        self.linked(program)?.attrib_location(name)
    }

    pub(crate) fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.linked(program)?.uniform_location(program, name)
    }

    #[cfg(test)]
    pub(crate) fn shader_count(&self) -> usize {
        self.shaders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
};

@vertex
fn vs_main(@location(0) a_position: vec2<f32>, @location(1) a_texcoord: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.position = vec4<f32>(a_position, 0.0, 1.0);
    out.texcoord = a_texcoord;
    return out;
}
"#;

    const FS: &str = r#"
struct Params {
    tint: vec4<f32>,
    weights: array<vec4<f32>, 3>,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<uniform> unused: f32;

@fragment
fn fs_main(@location(0) texcoord: vec2<f32>) -> @location(0) vec4<f32> {
    return params.tint * params.weights[0].x + vec4<f32>(texcoord, 0.0, 0.0);
}
"#;

    fn compiled(stage: ShaderStage, src: &str) -> CompiledModule {
        CompiledModule::compile(stage, src).unwrap()
    }

    #[test]
    fn syntax_error_reports_diagnostic() {
        let err = CompiledModule::compile(ShaderStage::Vertex, "fn vs_main( {").err().unwrap();
        assert!(!err.is_empty());
    }

    #[test]
    fn missing_entry_point_fails_compile() {
        let err = CompiledModule::compile(ShaderStage::Fragment, VS).err().unwrap();
        assert!(err.contains("@fragment"));
    }

    #[test]
    fn link_reflects_attributes() {
        let linked = LinkedProgram::link(
            &compiled(ShaderStage::Vertex, VS),
            &compiled(ShaderStage::Fragment, FS),
        )
        .unwrap();
        assert_eq!(linked.attrib_location("a_position"), Some(0));
        assert_eq!(linked.attrib_location("a_texcoord"), Some(1));
        assert_eq!(linked.attrib_location("a_color"), None);
    }

    #[test]
    fn link_flattens_struct_uniforms() {
        let linked = LinkedProgram::link(
            &compiled(ShaderStage::Vertex, VS),
            &compiled(ShaderStage::Fragment, FS),
        )
        .unwrap();
        let p = ProgramId(7);

        let tint = linked.uniform_location(p, "params.tint").unwrap();
        assert_eq!(tint.shape, UniformShape::Vec4);
        assert_eq!(tint.offset, 0);
        assert_eq!(linked.uniform_location(p, "tint"), Some(tint));

        let w1 = linked.uniform_location(p, "params.weights[1]").unwrap();
        assert_eq!(w1.offset, 32);
        assert_eq!(
            w1.shape,
            UniformShape::FloatArray { components: 4, len: Some(2), stride: 16 }
        );
    }

    #[test]
    fn unused_uniform_is_inactive() {
        let linked = LinkedProgram::link(
            &compiled(ShaderStage::Vertex, VS),
            &compiled(ShaderStage::Fragment, FS),
        )
        .unwrap();
        assert!(linked.uniform_location(ProgramId(1), "unused").is_none());
        assert_eq!(linked.resources.len(), 1);
    }

    #[test]
    fn unwritten_varying_fails_link() {
        let fs = r#"
@fragment
fn fs_main(@location(3) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;
        let err = LinkedProgram::link(
            &compiled(ShaderStage::Vertex, VS),
            &compiled(ShaderStage::Fragment, fs),
        )
        .err()
        .unwrap();
        assert!(err.contains("@location(3)"));
    }

    #[test]
    fn deleted_shader_survives_while_attached() {
        let mut fe = ShaderFrontend::default();
        fe.create_shader(ShaderId(1), ShaderStage::Vertex);
        fe.create_program(ProgramId(2));
        fe.attach_shader(ProgramId(2), ShaderId(1));

        fe.delete_shader(ShaderId(1));
        assert_eq!(fe.shader_count(), 1);

        fe.delete_program(ProgramId(2));
        assert_eq!(fe.shader_count(), 0);
    }
}

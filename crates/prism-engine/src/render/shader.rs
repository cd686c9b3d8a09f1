//! Shader compilation, linking and symbol resolution.
//!
//! Each stage is WGSL, parsed and validated offline by naga (the compiler wgpu
//! runs internally), so compile and link diagnostics are available before any
//! GPU object exists. Linking checks the vertex→fragment interface and the
//! shared resource bindings, then exposes attribute and uniform locations by
//! name.

use std::collections::BTreeMap;
use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::assets::AssetSource;
use crate::error::SetupError;

use super::backend::{AttributeLocation, GraphicsBackend, ProgramHandle, UniformLocation, VertexLayout};
use super::geometry::Vertex;

/// Attribute and uniform names the pipeline binds against.
pub mod symbols {
    pub const POSITION: &str = "Position";
    pub const SOURCE_COLOR: &str = "SourceColor";
    pub const TEX_COORD_IN: &str = "TexCoordIn";
    pub const PROJECTION: &str = "Projection";
    pub const MODELVIEW: &str = "Modelview";
    pub const TEXTURE: &str = "Texture";
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Kind of a bound shader resource, as far as the pipeline cares.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// `var<uniform> _: mat4x4<f32>`
    Matrix4,
    /// `texture_2d<f32>`
    Texture,
    Sampler,
    /// Anything else; rejected at link time.
    Unsupported,
}

/// A uniform resource declared by one or both stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResource {
    pub name: String,
    pub location: UniformLocation,
    pub kind: ResourceKind,
    pub vertex_visible: bool,
    pub fragment_visible: bool,
}

/// A vertex input resolved at link time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderAttribute {
    pub name: String,
    pub location: AttributeLocation,
}

/// One successfully compiled stage.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    stage: ShaderStage,
    source: String,
    entry_point: String,
    inputs: Vec<(Option<String>, u32)>,
    outputs: Vec<u32>,
    resources: Vec<ShaderResource>,
}

impl CompiledStage {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

/// Compiles one WGSL stage.
///
/// The source must contain exactly one entry point for `stage`.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<CompiledStage, SetupError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| SetupError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| SetupError::Compile {
            stage,
            log: e.emit_to_string(source),
        })?;

    let mut entries = module.entry_points.iter().filter(|ep| ep.stage == stage.naga());
    let entry = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        (None, _) => {
            return Err(SetupError::Compile {
                stage,
                log: format!("no @{stage} entry point found"),
            });
        }
        (Some(_), Some(_)) => {
            return Err(SetupError::Compile {
                stage,
                log: format!("more than one @{stage} entry point found"),
            });
        }
    };

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_locations(&module, arg.name.as_ref(), arg.ty, arg.binding.as_ref(), &mut inputs);
    }

    let mut outputs = Vec::new();
    if let Some(result) = entry.function.result.as_ref() {
        let mut named = Vec::new();
        collect_locations(&module, None, result.ty, result.binding.as_ref(), &mut named);
        outputs.extend(named.into_iter().map(|(_, location)| location));
    }

    let resources = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref()?;
            Some(ShaderResource {
                name: var.name.clone().unwrap_or_default(),
                location: UniformLocation::new(binding.group, binding.binding),
                kind: resource_kind(&module, var),
                vertex_visible: stage == ShaderStage::Vertex,
                fragment_visible: stage == ShaderStage::Fragment,
            })
        })
        .collect();

    log::debug!("compiled {stage} stage `{}`", entry.name);

    Ok(CompiledStage {
        stage,
        source: source.to_owned(),
        entry_point: entry.name.clone(),
        inputs,
        outputs,
        resources,
    })
}

/// Flattens `@location` bindings of an argument or result, including struct members.
fn collect_locations(
    module: &naga::Module,
    name: Option<&String>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<(Option<String>, u32)>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.push((name.cloned(), *location)),
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    if let Some(naga::Binding::Location { location, .. }) = member.binding.as_ref() {
                        out.push((member.name.clone(), *location));
                    }
                }
            }
        }
    }
}

fn resource_kind(module: &naga::Module, var: &naga::GlobalVariable) -> ResourceKind {
    let inner = &module.types[var.ty].inner;
    match (var.space, inner) {
        (
            naga::AddressSpace::Uniform,
            naga::TypeInner::Matrix {
                columns: naga::VectorSize::Quad,
                rows: naga::VectorSize::Quad,
                scalar,
            },
        ) if scalar.kind == naga::ScalarKind::Float && scalar.width == 4 => ResourceKind::Matrix4,
        (
            naga::AddressSpace::Handle,
            naga::TypeInner::Image {
                dim: naga::ImageDimension::D2,
                arrayed: false,
                class:
                    naga::ImageClass::Sampled {
                        kind: naga::ScalarKind::Float,
                        multi: false,
                    },
            },
        ) => ResourceKind::Texture,
        (naga::AddressSpace::Handle, naga::TypeInner::Sampler { .. }) => ResourceKind::Sampler,
        _ => ResourceKind::Unsupported,
    }
}

/// A vertex + fragment pair whose interface and bindings agree.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    vertex: CompiledStage,
    fragment: CompiledStage,
    attributes: Vec<ShaderAttribute>,
    resources: Vec<ShaderResource>,
}

impl LinkedProgram {
    /// Links two compiled stages. All problems found are reported in one log.
    pub fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<Self, SetupError> {
        let mut problems = Vec::new();

        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            problems.push("stages must be attached as (vertex, fragment)".to_owned());
        }

        for (name, location) in &fragment.inputs {
            if !vertex.outputs.contains(location) {
                problems.push(format!(
                    "fragment input `{}` at location {location} is not written by the vertex stage",
                    name.as_deref().unwrap_or("<unnamed>")
                ));
            }
        }

        let mut by_name: BTreeMap<String, ShaderResource> = BTreeMap::new();
        for res in vertex.resources.iter().chain(fragment.resources.iter()) {
            match by_name.get_mut(&res.name) {
                Some(existing) => {
                    if existing.location != res.location || existing.kind != res.kind {
                        problems.push(format!(
                            "`{}` is declared differently in the two stages",
                            res.name
                        ));
                    }
                    existing.vertex_visible |= res.vertex_visible;
                    existing.fragment_visible |= res.fragment_visible;
                }
                None => {
                    by_name.insert(res.name.clone(), res.clone());
                }
            }
        }

        let mut by_location: BTreeMap<UniformLocation, &str> = BTreeMap::new();
        for res in by_name.values() {
            if res.kind == ResourceKind::Unsupported {
                problems.push(format!("uniform `{}` has an unsupported type", res.name));
            }
            if let Some(other) = by_location.insert(res.location, &res.name) {
                problems.push(format!(
                    "`{other}` and `{}` share @group({}) @binding({})",
                    res.name, res.location.group, res.location.binding
                ));
            }
        }

        if !problems.is_empty() {
            return Err(SetupError::Link {
                log: problems.join("\n"),
            });
        }

        let attributes = vertex
            .inputs
            .iter()
            .filter_map(|(name, location)| {
                Some(ShaderAttribute {
                    name: name.clone()?,
                    location: AttributeLocation(*location),
                })
            })
            .collect();

        let mut resources: Vec<ShaderResource> = by_name.into_values().collect();
        resources.sort_by_key(|r| r.location);

        Ok(Self {
            vertex,
            fragment,
            attributes,
            resources,
        })
    }

    pub fn vertex(&self) -> &CompiledStage {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledStage {
        &self.fragment
    }

    pub fn attributes(&self) -> &[ShaderAttribute] {
        &self.attributes
    }

    /// Resources sorted by `(group, binding)`.
    pub fn resources(&self) -> &[ShaderResource] {
        &self.resources
    }

    pub fn attribute_location(&self, name: &str) -> Option<AttributeLocation> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.location)
    }

    pub fn uniform(&self, name: &str) -> Option<&ShaderResource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniform(name).map(|r| r.location)
    }
}

/// Compiles both stages and links them.
pub fn compile(vertex_source: &str, fragment_source: &str) -> Result<LinkedProgram, SetupError> {
    let vertex = compile_stage(ShaderStage::Vertex, vertex_source)?;
    let fragment = compile_stage(ShaderStage::Fragment, fragment_source)?;
    LinkedProgram::link(vertex, fragment)
}

/// Locations the pipeline binds every frame, resolved once after linking.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProgramLocations {
    pub position: AttributeLocation,
    pub source_color: AttributeLocation,
    pub tex_coord: Option<AttributeLocation>,
    pub projection: UniformLocation,
    pub modelview: UniformLocation,
    pub texture: Option<UniformLocation>,
}

impl ProgramLocations {
    pub fn resolve(program: &LinkedProgram) -> Result<Self, SetupError> {
        let attribute = |name: &'static str| {
            program
                .attribute_location(name)
                .ok_or(SetupError::MissingSymbol(name))
        };
        let matrix = |name: &'static str| match program.uniform(name) {
            Some(res) if res.kind == ResourceKind::Matrix4 => Ok(res.location),
            Some(_) => Err(SetupError::Link {
                log: format!("uniform `{name}` must be a mat4x4<f32>"),
            }),
            None => Err(SetupError::MissingSymbol(name)),
        };

        let texture = match program.uniform(symbols::TEXTURE) {
            Some(res) if res.kind == ResourceKind::Texture => Some(res.location),
            Some(_) => {
                return Err(SetupError::Link {
                    log: format!("uniform `{}` must be a texture_2d<f32>", symbols::TEXTURE),
                });
            }
            None => None,
        };

        Ok(Self {
            position: attribute(symbols::POSITION)?,
            source_color: attribute(symbols::SOURCE_COLOR)?,
            tex_coord: program.attribute_location(symbols::TEX_COORD_IN),
            projection: matrix(symbols::PROJECTION)?,
            modelview: matrix(symbols::MODELVIEW)?,
            texture,
        })
    }

    /// Attribute pointers matching [`Vertex`].
    pub fn vertex_layout(&self) -> VertexLayout {
        Vertex::layout(self.position, self.source_color, self.tex_coord)
    }
}

/// Linked program plus its GPU object and cached locations.
#[derive(Debug)]
pub struct ShaderProgram {
    handle: ProgramHandle,
    linked: LinkedProgram,
    locations: ProgramLocations,
    layout: VertexLayout,
}

impl ShaderProgram {
    /// Compiles, links and creates the program on `backend`.
    ///
    /// No backend object is created unless both compilation and symbol
    /// resolution succeed.
    pub fn build<B: GraphicsBackend>(
        backend: &mut B,
        vertex_source: &str,
        fragment_source: &str,
        depth_test: bool,
    ) -> Result<Self, SetupError> {
        let linked = compile(vertex_source, fragment_source)?;
        let locations = ProgramLocations::resolve(&linked)?;
        let layout = locations.vertex_layout();
        let handle = backend.create_program(&linked, &layout, depth_test)?;

        log::info!(
            "linked shader program ({} attributes, {} uniforms)",
            linked.attributes().len(),
            linked.resources().len()
        );

        Ok(Self {
            handle,
            linked,
            locations,
            layout,
        })
    }

    /// Reads `shaders/<name>.wgsl` for both stages from `assets` and builds the program.
    pub fn from_assets<B: GraphicsBackend>(
        backend: &mut B,
        assets: &dyn AssetSource,
        vertex_name: &str,
        fragment_name: &str,
        depth_test: bool,
    ) -> Result<Self, SetupError> {
        let vertex = load_source(assets, ShaderStage::Vertex, vertex_name)?;
        let fragment = load_source(assets, ShaderStage::Fragment, fragment_name)?;
        Self::build(backend, &vertex, &fragment, depth_test)
    }

    /// Makes this the active program for subsequent uniform uploads and draws.
    pub fn use_program<B: GraphicsBackend>(&self, backend: &mut B) {
        backend.use_program(self.handle);
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn linked(&self) -> &LinkedProgram {
        &self.linked
    }

    pub fn locations(&self) -> &ProgramLocations {
        &self.locations
    }

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.layout
    }
}

fn load_source(assets: &dyn AssetSource, stage: ShaderStage, name: &str) -> Result<String, SetupError> {
    let bytes = assets.load(&format!("shaders/{name}.wgsl"))?;
    String::from_utf8(bytes).map_err(|e| SetupError::Compile {
        stage,
        log: format!("`{name}` is not valid UTF-8: {e}"),
    })
}

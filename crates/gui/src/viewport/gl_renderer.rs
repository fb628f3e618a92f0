use std::collections::HashMap;

use glam::{Mat4, Vec3};
use glow::HasContext;

use super::camera::ArcBallCamera;
use super::mesh::{self, LineMeshData, TriMesh};
use meshview_gui_lib::render::{DisplayMode, DrawerAttributes, Presentation, RenderableHandle};
use meshview_gui_lib::settings::{AxisSettings, GridSettings};

// ── Render parameters ────────────────────────────────────────

/// Parameters for one paint of the viewport
pub struct FrameParams {
    /// Viewport rectangle [x, y, width, height] in pixels
    pub viewport: [f32; 4],
    pub grid_visible: bool,
    pub axes_visible: bool,
    pub bg_color: [u8; 3],
}

// ── GPU mesh handles ─────────────────────────────────────────

struct GpuMesh {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ibo: glow::Buffer,
    index_count: i32,
}

struct GpuLines {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    vertex_count: i32,
}

/// Everything uploaded for one renderable. Rebuilt when the data source
/// revision or the draw attributes change.
struct GpuObject {
    revision: u64,
    attributes: DrawerAttributes,
    faces: Option<GpuMesh>,
    links: Option<GpuLines>,
    nodes: Option<GpuLines>,
}

// ── Main GL renderer ─────────────────────────────────────────

pub struct GlRenderer {
    mesh_program: glow::Program,
    line_program: glow::Program,
    grid: Option<GpuLines>,
    axes: Option<GpuLines>,
    cached_grid_settings: Option<(i32, f32, f32)>,
    cached_axes_length: Option<f32>,
    objects: HashMap<RenderableHandle, GpuObject>,
}

impl GlRenderer {
    pub fn new(gl: &glow::Context) -> Result<Self, String> {
        let mesh_program = compile_program(gl, MESH_VERT, MESH_FRAG)?;
        let line_program = compile_program(gl, LINE_VERT, LINE_FRAG)?;

        Ok(Self {
            mesh_program,
            line_program,
            grid: None,
            axes: None,
            cached_grid_settings: None,
            cached_axes_length: None,
            objects: HashMap::new(),
        })
    }

    pub fn update_grid(&mut self, gl: &glow::Context, settings: &GridSettings) -> Result<(), String> {
        let new_settings = (settings.range, settings.size, settings.opacity);
        if self.cached_grid_settings == Some(new_settings) {
            return Ok(());
        }
        if let Some(old) = self.grid.take() {
            delete_lines(gl, &old);
        }
        let grid_data = mesh::grid(settings.range, settings.size, settings.opacity);
        self.grid = Some(upload_lines(gl, &grid_data)?);
        self.cached_grid_settings = Some(new_settings);
        Ok(())
    }

    pub fn update_axes(&mut self, gl: &glow::Context, settings: &AxisSettings) -> Result<(), String> {
        if self.cached_axes_length == Some(settings.length) {
            return Ok(());
        }
        if let Some(old) = self.axes.take() {
            delete_lines(gl, &old);
        }
        self.axes = Some(upload_lines(gl, &mesh::axes(settings.length))?);
        self.cached_axes_length = Some(settings.length);
        Ok(())
    }

    /// Bring the GPU copies in line with `presentations`. Entries for
    /// handles no longer displayed are freed.
    pub fn sync(&mut self, gl: &glow::Context, presentations: &[Presentation]) -> Result<(), String> {
        self.objects.retain(|handle, object| {
            let alive = presentations.iter().any(|p| p.handle == *handle);
            if !alive {
                delete_object(gl, object);
            }
            alive
        });

        for p in presentations {
            let stale = self
                .objects
                .get(&p.handle)
                .map_or(true, |o| o.revision != p.revision || o.attributes != p.attributes);
            if !stale {
                continue;
            }
            if let Some(old) = self.objects.remove(&p.handle) {
                delete_object(gl, &old);
            }
            let object = upload_object(gl, p)?;
            self.objects.insert(p.handle, object);
        }
        Ok(())
    }

    pub fn paint(
        &self,
        gl: &glow::Context,
        camera: &ArcBallCamera,
        params: &FrameParams,
        presentations: &[Presentation],
    ) {
        let aspect = params.viewport[2] / params.viewport[3].max(1.0);
        let vp = camera.view_projection(aspect);

        unsafe {
            let [x, y, w, h] = params.viewport.map(|v| v as i32);
            gl.viewport(x, y, w, h);
            gl.scissor(x, y, w, h);
            gl.enable(glow::SCISSOR_TEST);

            gl.clear_color(
                params.bg_color[0] as f32 / 255.0,
                params.bg_color[1] as f32 / 255.0,
                params.bg_color[2] as f32 / 255.0,
                1.0,
            );
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LESS);

            gl.use_program(Some(self.line_program));
            set_uniform_mat4(gl, self.line_program, "u_mvp", &vp);
            set_uniform_f32(gl, self.line_program, "u_point_size", 5.0);
            if params.grid_visible {
                if let Some(grid) = &self.grid {
                    draw_lines(gl, grid, glow::LINES);
                }
            }
            if params.axes_visible {
                if let Some(axes) = &self.axes {
                    draw_lines(gl, axes, glow::LINES);
                }
            }

            let light_dir = Vec3::new(0.3, 0.8, 0.5).normalize();
            for p in presentations {
                let Some(object) = self.objects.get(&p.handle) else {
                    continue;
                };
                let model = Mat4::from(p.location);
                let mvp = vp * model;

                if let Some(faces) = &object.faces {
                    gl.use_program(Some(self.mesh_program));
                    set_uniform_mat4(gl, self.mesh_program, "u_mvp", &mvp);
                    set_uniform_mat4(gl, self.mesh_program, "u_model", &model);
                    set_uniform_vec3(gl, self.mesh_program, "u_light_dir", &light_dir);
                    set_uniform_color(gl, self.mesh_program, "u_color", p.attributes.interior.to_f32());
                    set_uniform_color(gl, self.mesh_program, "u_back_color", p.attributes.back_interior.to_f32());
                    if p.display_mode == DisplayMode::Wireframe {
                        gl.polygon_mode(glow::FRONT_AND_BACK, glow::LINE);
                        draw_mesh(gl, faces);
                        gl.polygon_mode(glow::FRONT_AND_BACK, glow::FILL);
                    } else {
                        draw_mesh(gl, faces);
                    }
                }

                gl.use_program(Some(self.line_program));
                set_uniform_mat4(gl, self.line_program, "u_mvp", &mvp);
                if let Some(links) = &object.links {
                    gl.line_width(p.attributes.line_width);
                    draw_lines(gl, links, glow::LINES);
                    gl.line_width(1.0);
                }
                if let Some(nodes) = &object.nodes {
                    set_uniform_f32(gl, self.line_program, "u_point_size", p.attributes.point_size);
                    gl.enable(glow::PROGRAM_POINT_SIZE);
                    draw_lines(gl, nodes, glow::POINTS);
                    gl.disable(glow::PROGRAM_POINT_SIZE);
                }
            }

            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::SCISSOR_TEST);
            gl.use_program(None);
        }
    }

    pub fn destroy(&mut self, gl: &glow::Context) {
        unsafe {
            gl.delete_program(self.mesh_program);
            gl.delete_program(self.line_program);
        }
        if let Some(grid) = self.grid.take() {
            delete_lines(gl, &grid);
        }
        if let Some(axes) = self.axes.take() {
            delete_lines(gl, &axes);
        }
        for (_, object) in self.objects.drain() {
            delete_object(gl, &object);
        }
    }
}

// ── Vertex data ──────────────────────────────────────────────

/// Interleaved [pos, normal] per vertex plus indices. Flat shading
/// unshares vertices so each triangle carries its own normal.
fn face_vertices(mesh: &TriMesh, smooth: bool) -> (Vec<f32>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    if smooth {
        let normals = mesh.vertex_normals();
        for (p, n) in mesh.points.iter().zip(&normals) {
            vertices.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z]);
        }
        indices.extend(mesh.triangles.iter().flatten());
    } else {
        for face in 0..mesh.triangle_count() {
            let Some(corners) = mesh.triangle(mesh::FaceId(face as u32)) else {
                continue;
            };
            let n = (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize_or_zero();
            for p in corners {
                indices.push((vertices.len() / 6) as u32);
                vertices.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z]);
            }
        }
    }
    (vertices, indices)
}

fn upload_object(gl: &glow::Context, p: &Presentation) -> Result<GpuObject, String> {
    let source = &p.data_source;
    let mesh = source.mesh();
    let attrs = p.attributes;

    let faces = if source.element_count() > 0 {
        let (vertices, indices) = face_vertices(mesh, attrs.smooth_shading);
        Some(upload_mesh(gl, &vertices, &indices)?)
    } else {
        None
    };

    // Feature edges replace the triangle wireframe and follow the edges toggle
    let mut edge_data = LineMeshData { vertices: Vec::new() };
    let edge_color = attrs.edge.to_f32();
    if !source.has_feature_edges() || attrs.show_edges {
        for [a, b] in source.links() {
            if let (Some(pa), Some(pb)) = (mesh.points.get(*a as usize), mesh.points.get(*b as usize)) {
                mesh::push_line_vert(&mut edge_data.vertices, *pa, edge_color);
                mesh::push_line_vert(&mut edge_data.vertices, *pb, edge_color);
            }
        }
    }
    if attrs.show_edges && !source.has_feature_edges() {
        for tri in &mesh.triangles {
            for k in 0..3 {
                let (a, b) = (tri[k] as usize, tri[(k + 1) % 3] as usize);
                if let (Some(pa), Some(pb)) = (mesh.points.get(a), mesh.points.get(b)) {
                    mesh::push_line_vert(&mut edge_data.vertices, *pa, edge_color);
                    mesh::push_line_vert(&mut edge_data.vertices, *pb, edge_color);
                }
            }
        }
    }
    let links = if edge_data.vertices.is_empty() {
        None
    } else {
        Some(upload_lines(gl, &edge_data)?)
    };

    // Point clouds always show their nodes
    let nodes = if attrs.display_nodes || (source.element_count() == 0 && source.link_count() == 0) {
        let node_color = attrs.node.to_f32();
        let mut data = LineMeshData { vertices: Vec::new() };
        for id in source.point_nodes() {
            if let Some(p) = mesh.points.get(id as usize) {
                mesh::push_line_vert(&mut data.vertices, *p, node_color);
            }
        }
        if data.vertices.is_empty() {
            None
        } else {
            Some(upload_lines(gl, &data)?)
        }
    } else {
        None
    };

    Ok(GpuObject {
        revision: p.revision,
        attributes: attrs,
        faces,
        links,
        nodes,
    })
}

// ── GPU upload ───────────────────────────────────────────────

fn upload_mesh(gl: &glow::Context, vertices: &[f32], indices: &[u32]) -> Result<GpuMesh, String> {
    unsafe {
        let vao = gl.create_vertex_array()?;
        gl.bind_vertex_array(Some(vao));

        let vbo = gl.create_buffer()?;
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, cast_slice(vertices), glow::STATIC_DRAW);

        let stride = 6 * 4;
        // position: location 0
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
        // normal: location 1
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 3 * 4);

        let ibo = gl.create_buffer()?;
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
        gl.buffer_data_u8_slice(glow::ELEMENT_ARRAY_BUFFER, cast_slice(indices), glow::STATIC_DRAW);

        gl.bind_vertex_array(None);

        Ok(GpuMesh {
            vao,
            vbo,
            ibo,
            index_count: indices.len() as i32,
        })
    }
}

fn upload_lines(gl: &glow::Context, data: &LineMeshData) -> Result<GpuLines, String> {
    unsafe {
        let vao = gl.create_vertex_array()?;
        gl.bind_vertex_array(Some(vao));

        let vbo = gl.create_buffer()?;
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, cast_slice(&data.vertices), glow::STATIC_DRAW);

        let stride = 7 * 4;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 4, glow::FLOAT, false, stride, 3 * 4);

        gl.bind_vertex_array(None);

        Ok(GpuLines {
            vao,
            vbo,
            vertex_count: (data.vertices.len() / 7) as i32,
        })
    }
}

fn delete_lines(gl: &glow::Context, lines: &GpuLines) {
    unsafe {
        gl.delete_vertex_array(lines.vao);
        gl.delete_buffer(lines.vbo);
    }
}

fn delete_object(gl: &glow::Context, object: &GpuObject) {
    if let Some(faces) = &object.faces {
        unsafe {
            gl.delete_vertex_array(faces.vao);
            gl.delete_buffer(faces.vbo);
            gl.delete_buffer(faces.ibo);
        }
    }
    for lines in [&object.links, &object.nodes].into_iter().flatten() {
        delete_lines(gl, lines);
    }
}

// ── Draw calls ───────────────────────────────────────────────

unsafe fn draw_mesh(gl: &glow::Context, mesh: &GpuMesh) {
    gl.bind_vertex_array(Some(mesh.vao));
    gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(mesh.ibo));
    gl.draw_elements(glow::TRIANGLES, mesh.index_count, glow::UNSIGNED_INT, 0);
    gl.bind_vertex_array(None);
}

unsafe fn draw_lines(gl: &glow::Context, lines: &GpuLines, mode: u32) {
    gl.bind_vertex_array(Some(lines.vao));
    gl.draw_arrays(mode, 0, lines.vertex_count);
    gl.bind_vertex_array(None);
}

// ── Shader compilation ───────────────────────────────────────

fn compile_program(gl: &glow::Context, vert_src: &str, frag_src: &str) -> Result<glow::Program, String> {
    unsafe {
        let program = gl.create_program()?;

        let mut shaders = Vec::with_capacity(2);
        for (kind, src) in [(glow::VERTEX_SHADER, vert_src), (glow::FRAGMENT_SHADER, frag_src)] {
            let shader = gl.create_shader(kind)?;
            gl.shader_source(shader, src);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                tracing::error!("Shader compile error: {log}");
            }
            gl.attach_shader(program, shader);
            shaders.push(shader);
        }

        gl.link_program(program);
        let linked = gl.get_program_link_status(program);
        for shader in shaders {
            gl.delete_shader(shader);
        }
        if !linked {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(format!("program link error: {log}"));
        }
        Ok(program)
    }
}

// ── Uniform setters ──────────────────────────────────────────

fn set_uniform_mat4(gl: &glow::Context, program: glow::Program, name: &str, mat: &Mat4) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_matrix_4_f32_slice(loc.as_ref(), false, &mat.to_cols_array());
    }
}

fn set_uniform_vec3(gl: &glow::Context, program: glow::Program, name: &str, v: &Vec3) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_3_f32(loc.as_ref(), v.x, v.y, v.z);
    }
}

fn set_uniform_f32(gl: &glow::Context, program: glow::Program, name: &str, v: f32) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_1_f32(loc.as_ref(), v);
    }
}

fn set_uniform_color(gl: &glow::Context, program: glow::Program, name: &str, c: [f32; 4]) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_4_f32(loc.as_ref(), c[0], c[1], c[2], c[3]);
    }
}

// ── Byte cast helper ─────────────────────────────────────────

fn cast_slice<T: Copy>(slice: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, std::mem::size_of_val(slice)) }
}

// ── Shaders ──────────────────────────────────────────────────

const MESH_VERT: &str = r#"#version 330 core
uniform mat4 u_mvp;
uniform mat4 u_model;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;

out vec3 v_normal;

void main() {
    gl_Position = u_mvp * vec4(a_position, 1.0);
    v_normal = mat3(u_model) * a_normal;
}
"#;

const MESH_FRAG: &str = r#"#version 330 core
uniform vec3 u_light_dir;
uniform vec4 u_color;
uniform vec4 u_back_color;

in vec3 v_normal;

out vec4 frag_color;

void main() {
    vec3 n = normalize(v_normal);
    vec4 base = u_color;
    if (!gl_FrontFacing) {
        n = -n;
        base = u_back_color;
    }
    float diffuse = max(dot(n, u_light_dir), 0.0);
    float light = 0.25 + diffuse * 0.75;
    frag_color = vec4(base.rgb * light, base.a);
}
"#;

const LINE_VERT: &str = r#"#version 330 core
uniform mat4 u_mvp;
uniform float u_point_size;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec4 a_color;

out vec4 v_color;

void main() {
    gl_Position = u_mvp * vec4(a_position, 1.0);
    gl_PointSize = u_point_size;
    v_color = a_color;
}
"#;

const LINE_FRAG: &str = r#"#version 330 core
in vec4 v_color;
out vec4 frag_color;

void main() {
    frag_color = v_color;
}
"#;

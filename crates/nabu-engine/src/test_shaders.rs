//! WGSL fixtures for unit tests.

pub(crate) const QUAD_VS: &str = r#"
@vertex
fn vs_main(@location(0) a_position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(a_position, 0.0, 1.0);
}
"#;

pub(crate) const SOLID_FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.5, 1.0);
}
"#;

pub(crate) const RESOLUTION_FS: &str = r#"
@group(0) @binding(0) var<uniform> r: vec2<f32>;

@fragment
fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(frag.xy / r, 0.0, 1.0);
}
"#;

pub(crate) const TEXCOORD_VS: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
};

@vertex
fn vs_main(@location(0) a_position: vec2<f32>, @location(1) a_texcoords: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.position = vec4<f32>(a_position, 0.0, 1.0);
    out.texcoord = a_texcoords;
    return out;
}
"#;

pub(crate) const CONVOLUTION_FS: &str = r#"
struct Convolution {
    u_kernel: array<vec4<f32>, 3>,
    u_textureSize: vec2<f32>,
    u_kernelWeight: f32,
};

@group(0) @binding(0) var<uniform> conv: Convolution;
@group(0) @binding(1) var<uniform> r: vec2<f32>;
@group(0) @binding(2) var u_texture: texture_2d<f32>;
@group(0) @binding(3) var u_sampler: sampler;

@fragment
fn fs_main(@builtin(position) frag: vec4<f32>, @location(0) texcoord: vec2<f32>) -> @location(0) vec4<f32> {
    let one_pixel = vec2<f32>(1.0, 1.0) / conv.u_textureSize;
    var sum = vec4<f32>(0.0);
    for (var i = 0; i < 9; i += 1) {
        let offset = vec2<f32>(f32(i % 3 - 1), f32(i / 3 - 1));
        let weight = conv.u_kernel[i / 4][i % 4];
        sum += textureSampleLevel(u_texture, u_sampler, texcoord + one_pixel * offset, 0.0) * weight;
    }
    let inside = step(frag.x, r.x) * step(frag.y, r.y);
    return vec4<f32>((sum / conv.u_kernelWeight).rgb * inside, 1.0);
}
"#;

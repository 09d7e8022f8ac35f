//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use nabu_engine::device::HeadlessDevice;
use nabu_engine::render::RenderContext;

pub const POSITION_VS: &str = r#"
@vertex
fn vs_main(@location(0) a_position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(a_position, 0.0, 1.0);
}
"#;

pub const FLAT_FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.2, 0.4, 0.6, 1.0);
}
"#;

pub const TINT_FS: &str = r#"
@group(0) @binding(0) var<uniform> u_tint: f32;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(u_tint, u_tint, u_tint, 1.0);
}
"#;

/// Reads a varying no vertex shader here writes.
pub const ORPHAN_VARYING_FS: &str = r#"
@fragment
fn fs_main(@location(2) shade: vec4<f32>) -> @location(0) vec4<f32> {
    return shade;
}
"#;

pub const TEXCOORD_VS: &str = r#"
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

pub const FILTER_FS: &str = r#"
struct Convolution {
    u_kernel: array<vec4<f32>, 3>,
    u_textureSize: vec2<f32>,
    u_kernelWeight: f32,
};

@group(0) @binding(0) var<uniform> conv: Convolution;
@group(0) @binding(1) var u_texture: texture_2d<f32>;
@group(0) @binding(2) var u_sampler: sampler;

@fragment
fn fs_main(@location(0) texcoord: vec2<f32>) -> @location(0) vec4<f32> {
    let step_uv = vec2<f32>(1.0, 1.0) / conv.u_textureSize;
    var acc = vec4<f32>(0.0);
    for (var i = 0; i < 9; i += 1) {
        let at = texcoord + step_uv * vec2<f32>(f32(i % 3 - 1), f32(i / 3 - 1));
        acc += textureSampleLevel(u_texture, u_sampler, at, 0.0) * conv.u_kernel[i / 4][i % 4];
    }
    return vec4<f32>((acc / conv.u_kernelWeight).rgb, 1.0);
}
"#;

pub fn headless() -> RenderContext<HeadlessDevice> {
    RenderContext::new(HeadlessDevice::new())
}

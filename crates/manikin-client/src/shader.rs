//! Embedded WGSL for the forward pass.

/// Forward mesh shader: one directional sun plus ambient, flat color per
/// draw. Bind group 0 is the camera uniform, bind group 1 the per-draw
/// uniform (dynamic offset).
pub fn forward_wgsl() -> &'static str {
    r#"
struct CameraUniform {
    view_projection: mat4x4<f32>,
    position: vec4<f32>,
    sun_direction: vec4<f32>,
    ambient: vec4<f32>,
};
@group(0) @binding(0) var<uniform> camera: CameraUniform;

struct DrawUniform {
    model: mat4x4<f32>,
    color: vec4<f32>,
};
@group(1) @binding(0) var<uniform> draw: DrawUniform;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    let world_position = draw.model * vec4<f32>(position, 1.0);
    out.clip_position = camera.view_projection * world_position;
    out.world_normal = normalize((draw.model * vec4<f32>(normal, 0.0)).xyz);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let sun = normalize(-camera.sun_direction.xyz);
    let n_dot_l = max(dot(normalize(in.world_normal), sun), 0.0);
    let lit = min(camera.ambient.xyz + vec3<f32>(n_dot_l), vec3<f32>(1.0));
    return vec4<f32>(draw.color.rgb * lit, draw.color.a);
}
"#
}

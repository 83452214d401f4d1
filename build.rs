/// Build script for d3d_sandbox
///
/// # Shader Compilation Strategy:
/// - D3D11 / D3D12: HLSL sources are embedded with `include_str!` and compiled at runtime via D3DCompile
fn main() {
    // Trigger rebuild if shader files change
    println!("cargo:rerun-if-changed=src/renderer/shaders");
}

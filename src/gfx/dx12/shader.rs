//! 着色器编译
//!
//! 使用 Fxc（`D3DCompile`）把内置 HLSL 编译为 `vs_5_0` / `ps_5_0`。
//! D3D11 后端使用同一个编译函数。

use tracing::debug;
use windows::core::{s, PCSTR};
use windows::Win32::Graphics::Direct3D::Fxc::*;
use windows::Win32::Graphics::Direct3D::ID3DBlob;

use crate::core::error::{GraphicsError, Result, SandboxError};
use crate::renderer::shaders::ShaderKind;

/// 着色器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

impl ShaderStage {
    fn entry(&self) -> PCSTR {
        match self {
            ShaderStage::Vertex => s!("VSMain"),
            ShaderStage::Pixel => s!("PSMain"),
        }
    }

    fn target(&self) -> PCSTR {
        match self {
            ShaderStage::Vertex => s!("vs_5_0"),
            ShaderStage::Pixel => s!("ps_5_0"),
        }
    }
}

/// 编译好的顶点和像素着色器
pub struct CompiledShaders {
    pub vs: ID3DBlob,
    pub ps: ID3DBlob,
}

impl CompiledShaders {
    pub fn vs_bytes(&self) -> &[u8] {
        blob_bytes(&self.vs)
    }

    pub fn ps_bytes(&self) -> &[u8] {
        blob_bytes(&self.ps)
    }
}

/// Blob 的内容
pub fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()) }
}

/// 编译器错误 blob 中的文本
pub fn blob_text(blob: &ID3DBlob) -> String {
    String::from_utf8_lossy(blob_bytes(blob))
        .trim_end_matches('\0')
        .trim_end()
        .to_string()
}

/// 编译一个阶段
pub fn compile_stage(kind: ShaderKind, stage: ShaderStage) -> Result<ID3DBlob> {
    let source = kind.source();
    let flags = if cfg!(debug_assertions) {
        D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
    } else {
        D3DCOMPILE_OPTIMIZATION_LEVEL3
    } | D3DCOMPILE_ENABLE_STRICTNESS;

    unsafe {
        let mut code: Option<ID3DBlob> = None;
        let mut errors: Option<ID3DBlob> = None;

        let result = D3DCompile(
            source.as_ptr() as _,
            source.len(),
            None,
            None,
            None,
            stage.entry(),
            stage.target(),
            flags,
            0,
            &mut code,
            Some(&mut errors),
        );

        if let Err(e) = result {
            let message = errors.as_ref().map(blob_text).unwrap_or_default();
            return Err(SandboxError::Graphics(GraphicsError::ShaderCompilation(format!(
                "{} {:?}: {} {:?}",
                kind.name(),
                stage,
                message,
                e
            ))));
        }

        code.ok_or_else(|| {
            SandboxError::Graphics(GraphicsError::ShaderCompilation(format!(
                "{} {:?}: compiler returned no bytecode",
                kind.name(),
                stage
            )))
        })
    }
}

/// 编译顶点和像素着色器
pub fn compile(kind: ShaderKind) -> Result<CompiledShaders> {
    let vs = compile_stage(kind, ShaderStage::Vertex)?;
    let ps = compile_stage(kind, ShaderStage::Pixel)?;

    debug!(
        shader = kind.name(),
        vs_bytes = unsafe { vs.GetBufferSize() },
        ps_bytes = unsafe { ps.GetBufferSize() },
        "Shaders compiled"
    );

    Ok(CompiledShaders { vs, ps })
}

//! DirectX 11 图形 API 实现模块
//!
//! 与 DX12 后端绘制同样的绘制集，但使用 immediate context：
//! - Context：设备、交换链、渲染目标、预先创建的光栅化状态和 MVP 常量缓冲
//! - DrawSet：每个绘制项的着色器、输入布局、缓冲和纹理
//! - Backend：把以上部分组合成 `RenderBackend`
//!
//! 着色器与 DX12 共用 `dx12::shader` 的 Fxc 编译。

pub mod backend;
pub mod context;
pub mod draw_set;

use windows::core::Error as WinError;

use crate::core::error::{GraphicsError, SandboxError};

pub use backend::Dx11Backend;
pub use context::Dx11Context;
pub use draw_set::Dx11DrawSet;

/// 资源创建失败
pub(crate) fn creation_error(what: &str, e: WinError) -> SandboxError {
    SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
        "Failed to create {}: {:?}",
        what, e
    )))
}

/// 创建函数成功但没有写出对象
pub(crate) fn created<T>(value: Option<T>, what: &str) -> Result<T, SandboxError> {
    value.ok_or_else(|| {
        SandboxError::Graphics(GraphicsError::ResourceCreation(format!("{} is null", what)))
    })
}

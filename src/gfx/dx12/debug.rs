//! D3D12 调试层
//!
//! 调试层必须在创建设备之前打开。消息的收集与 D3D11 共用 `gfx::dxgi::InfoQueue`。

use tracing::{info, warn};
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D12::*;

use crate::core::error::{GraphicsError, Result, SandboxError};

pub use crate::gfx::dxgi::{report_live_objects, InfoQueue};

/// 打开 D3D12 调试层，可选地打开 GPU-based validation
pub fn enable_debug_layer(gpu_validation: bool) -> Result<()> {
    unsafe {
        let mut debug: Option<ID3D12Debug> = None;
        D3D12GetDebugInterface(&mut debug).map_err(|e| {
            SandboxError::Graphics(GraphicsError::DeviceCreation(format!(
                "Failed to get D3D12 debug interface: {:?}",
                e
            )))
        })?;

        let debug = debug.ok_or_else(|| {
            SandboxError::Graphics(GraphicsError::DeviceCreation(
                "D3D12 debug interface is null".to_string(),
            ))
        })?;
        debug.EnableDebugLayer();
        info!("DX12 Debug Layer enabled");

        if gpu_validation {
            match debug.cast::<ID3D12Debug1>() {
                Ok(debug1) => {
                    debug1.SetEnableGPUBasedValidation(true);
                    info!("GPU-based validation enabled");
                }
                Err(e) => warn!("GPU-based validation unavailable: {:?}", e),
            }
        }
    }

    Ok(())
}

//! DXGI 公共部分
//!
//! D3D11 与 D3D12 共用的 DXGI 对象：工厂、硬件适配器、flip-discard 交换链、
//! Present 标志，以及调试消息队列（`IDXGIInfoQueue`）。

use std::ffi::c_void;

use tracing::{debug, error, info, warn};
use windows::core::{Interface, Param, IUnknown};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::Window;

use crate::core::error::{GraphicsError, Result, SandboxError};
use crate::geometry::{Topology, VertexFormat};

/// 渲染目标格式，与位图的 BGRA 字节序一致
pub const RTV_FORMAT: DXGI_FORMAT = DXGI_FORMAT_B8G8R8A8_UNORM;
/// 深度缓冲格式
pub const DSV_FORMAT: DXGI_FORMAT = DXGI_FORMAT_D32_FLOAT;

/// 顶点属性格式对应的 DXGI 格式
pub fn vertex_format(format: VertexFormat) -> DXGI_FORMAT {
    match format {
        VertexFormat::Float1 => DXGI_FORMAT_R32_FLOAT,
        VertexFormat::Float2 => DXGI_FORMAT_R32G32_FLOAT,
        VertexFormat::Float3 => DXGI_FORMAT_R32G32B32_FLOAT,
        VertexFormat::Float4 => DXGI_FORMAT_R32G32B32A32_FLOAT,
        VertexFormat::Half2 => DXGI_FORMAT_R16G16_FLOAT,
        VertexFormat::Half4 => DXGI_FORMAT_R16G16B16A16_FLOAT,
    }
}

/// 输入装配阶段的图元拓扑，两个后端共用
pub fn primitive_topology(topology: Topology) -> D3D_PRIMITIVE_TOPOLOGY {
    match topology {
        Topology::LineList => D3D_PRIMITIVE_TOPOLOGY_LINELIST,
        Topology::TriangleList => D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        Topology::PointList => D3D_PRIMITIVE_TOPOLOGY_POINTLIST,
        Topology::LineStrip => D3D_PRIMITIVE_TOPOLOGY_LINESTRIP,
        Topology::TriangleStrip => D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
    }
}

/// 从 winit 窗口取出 HWND
pub fn window_hwnd(window: &Window) -> Result<HWND> {
    let handle = window.window_handle().map_err(|e| {
        SandboxError::Initialization(format!("Failed to get window handle: {}", e))
    })?;

    match handle.as_raw() {
        RawWindowHandle::Win32(win32) => Ok(HWND(win32.hwnd.get() as *mut c_void)),
        other => Err(SandboxError::Initialization(format!(
            "Expected a Win32 window handle, got {:?}",
            other
        ))),
    }
}

/// 创建 DXGI 工厂
pub fn create_factory(debug: bool) -> Result<IDXGIFactory6> {
    let flags = if debug {
        DXGI_CREATE_FACTORY_DEBUG
    } else {
        DXGI_CREATE_FACTORY_FLAGS(0)
    };

    unsafe { CreateDXGIFactory2(flags) }.map_err(|e| {
        SandboxError::Graphics(GraphicsError::DeviceCreation(format!(
            "Failed to create DXGI factory: {:?}",
            e
        )))
    })
}

/// 按高性能优先的顺序枚举适配器，跳过软件适配器
pub fn select_hardware_adapter(factory: &IDXGIFactory6) -> Result<IDXGIAdapter1> {
    for index in 0u32.. {
        let adapter: IDXGIAdapter1 = match unsafe {
            factory.EnumAdapterByGpuPreference(index, DXGI_GPU_PREFERENCE_HIGH_PERFORMANCE)
        } {
            Ok(adapter) => adapter,
            Err(_) => break,
        };

        let desc = unsafe { adapter.GetDesc1() }.map_err(|e| {
            SandboxError::Graphics(GraphicsError::DeviceCreation(format!(
                "Failed to query adapter description: {:?}",
                e
            )))
        })?;

        let name = adapter_name(&desc.Description);
        if (desc.Flags & DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32) != 0 {
            debug!(adapter = %name, "Skipping software adapter");
            continue;
        }

        info!(
            adapter = %name,
            vram_mb = desc.DedicatedVideoMemory / (1024 * 1024),
            "Hardware adapter selected"
        );
        return Ok(adapter);
    }

    Err(SandboxError::Graphics(GraphicsError::DeviceCreation(
        "No hardware adapter found".to_string(),
    )))
}

fn adapter_name(description: &[u16]) -> String {
    let len = description.iter().position(|&c| c == 0).unwrap_or(description.len());
    String::from_utf16_lossy(&description[..len])
}

/// 显示器是否支持撕裂（可变刷新率）
pub fn tearing_supported(factory: &IDXGIFactory6) -> bool {
    let mut allow: i32 = 0;
    let supported = unsafe {
        factory.CheckFeatureSupport(
            DXGI_FEATURE_PRESENT_ALLOW_TEARING,
            &mut allow as *mut i32 as *mut c_void,
            std::mem::size_of::<i32>() as u32,
        )
    };

    supported.is_ok() && allow != 0
}

/// 交换链参数
#[derive(Debug, Clone, Copy)]
pub struct SwapChainSpec {
    pub width: u32,
    pub height: u32,
    pub buffer_count: u32,
    pub allow_tearing: bool,
    pub background: [f32; 4],
}

impl SwapChainSpec {
    /// 创建和 ResizeBuffers 时使用的交换链标志
    pub fn flags(&self) -> u32 {
        if self.allow_tearing {
            DXGI_SWAP_CHAIN_FLAG_ALLOW_TEARING.0 as u32
        } else {
            0
        }
    }
}

/// 创建 flip-discard 交换链
///
/// `device` 对 D3D12 是命令队列，对 D3D11 是设备。
pub fn create_swap_chain<P>(
    factory: &IDXGIFactory6,
    device: P,
    hwnd: HWND,
    spec: &SwapChainSpec,
) -> Result<IDXGISwapChain1>
where
    P: Param<IUnknown>,
{
    let desc = DXGI_SWAP_CHAIN_DESC1 {
        Width: spec.width,
        Height: spec.height,
        Format: RTV_FORMAT,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
        BufferCount: spec.buffer_count,
        Scaling: DXGI_SCALING_NONE,
        SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
        AlphaMode: DXGI_ALPHA_MODE_IGNORE,
        Flags: spec.flags(),
        ..Default::default()
    };

    let swap_chain = unsafe { factory.CreateSwapChainForHwnd(device, hwnd, &desc, None, None) }
        .map_err(|e| {
            SandboxError::Graphics(GraphicsError::SwapchainError(format!(
                "Failed to create swap chain: {:?}",
                e
            )))
        })?;

    let [r, g, b, a] = spec.background;
    if let Err(e) = unsafe { swap_chain.SetBackgroundColor(&DXGI_RGBA { r, g, b, a }) } {
        crate::engine_warn!("Failed to set swap chain background color: {:?}", e);
    }

    info!(
        width = spec.width,
        height = spec.height,
        buffers = spec.buffer_count,
        tearing = spec.allow_tearing,
        "Swap chain created"
    );

    Ok(swap_chain)
}

/// 以交换链当前的窗口大小重建后台缓冲
pub fn resize_buffers(swap_chain: &IDXGISwapChain1, spec: &SwapChainSpec) -> Result<()> {
    unsafe {
        swap_chain.ResizeBuffers(
            0,
            0,
            0,
            DXGI_FORMAT_UNKNOWN,
            DXGI_SWAP_CHAIN_FLAG(spec.flags() as i32),
        )
    }
    .map_err(|e| {
        SandboxError::Graphics(GraphicsError::SwapchainError(format!(
            "Failed to resize swap chain buffers: {:?}",
            e
        )))
    })
}

/// Present
///
/// 同步间隔为 0 且允许撕裂时带上 `DXGI_PRESENT_ALLOW_TEARING`。
pub fn present(swap_chain: &IDXGISwapChain1, sync_interval: u32, allow_tearing: bool) -> Result<()> {
    let flags = if sync_interval == 0 && allow_tearing {
        DXGI_PRESENT_ALLOW_TEARING
    } else {
        DXGI_PRESENT(0)
    };

    unsafe { swap_chain.Present(sync_interval, flags) }
        .ok()
        .map_err(|e| {
            SandboxError::Graphics(GraphicsError::SwapchainError(format!(
                "Failed to present: {:?}",
                e
            )))
        })
}

/// DXGI 调试消息队列
///
/// 所有生产者（D3D11、D3D12、DXGI）的消息都会进入这个队列。
pub struct InfoQueue {
    queue: IDXGIInfoQueue,
}

impl InfoQueue {
    /// 调试层不可用时返回 `None`
    pub fn new() -> Option<Self> {
        match unsafe { DXGIGetDebugInterface1::<IDXGIInfoQueue>(0) } {
            Ok(queue) => Some(Self { queue }),
            Err(e) => {
                warn!("DXGI info queue unavailable: {:?}", e);
                None
            }
        }
    }

    /// 取出并记录队列中的全部消息，然后清空队列
    ///
    /// `stop` 为真时遇到 Error / Corruption 级别的消息返回 `GraphicsError::DebugLayer`。
    pub fn drain(&self, location: &str, stop: bool) -> Result<()> {
        let mut fatal: Option<String> = None;

        unsafe {
            let count = self.queue.GetNumStoredMessages(DXGI_DEBUG_ALL);
            for index in 0..count {
                let mut length = 0usize;
                if self
                    .queue
                    .GetMessage(DXGI_DEBUG_ALL, index, None, &mut length)
                    .is_err()
                    || length == 0
                {
                    continue;
                }

                // u64 保证消息结构体的对齐
                let mut storage = vec![0u64; length.div_ceil(8)];
                let message = storage.as_mut_ptr() as *mut DXGI_INFO_QUEUE_MESSAGE;
                if self
                    .queue
                    .GetMessage(DXGI_DEBUG_ALL, index, Some(message), &mut length)
                    .is_err()
                {
                    continue;
                }

                let message = &*message;
                let text = message_text(message.pDescription, message.DescriptionByteLength);

                match message.Severity {
                    DXGI_INFO_QUEUE_MESSAGE_SEVERITY_CORRUPTION
                    | DXGI_INFO_QUEUE_MESSAGE_SEVERITY_ERROR => {
                        error!(location, id = message.ID, "{}", text);
                        if fatal.is_none() {
                            fatal = Some(text);
                        }
                    }
                    DXGI_INFO_QUEUE_MESSAGE_SEVERITY_WARNING => warn!(location, id = message.ID, "{}", text),
                    DXGI_INFO_QUEUE_MESSAGE_SEVERITY_INFO => info!(location, id = message.ID, "{}", text),
                    _ => debug!(location, id = message.ID, "{}", text),
                }
            }

            self.queue.ClearStoredMessages(DXGI_DEBUG_ALL);
        }

        match fatal {
            Some(message) if stop => Err(SandboxError::Graphics(GraphicsError::DebugLayer {
                location: location.to_string(),
                message,
            })),
            _ => Ok(()),
        }
    }
}

unsafe fn message_text(description: *const u8, length: usize) -> String {
    if description.is_null() || length == 0 {
        return String::new();
    }

    let bytes = std::slice::from_raw_parts(description, length);
    let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// 报告仍然存活的 DXGI / D3D 对象
///
/// 在设备释放之前调用，结果通过调试输出窗口和信息队列给出。
pub fn report_live_objects(location: &str) {
    match unsafe { DXGIGetDebugInterface1::<IDXGIDebug1>(0) } {
        Ok(debug) => {
            debug!(location, "Reporting live objects");
            if let Err(e) = unsafe {
                debug.ReportLiveObjects(
                    DXGI_DEBUG_ALL,
                    DXGI_DEBUG_RLO_FLAGS(DXGI_DEBUG_RLO_DETAIL.0 | DXGI_DEBUG_RLO_IGNORE_INTERNAL.0),
                )
            } {
                warn!("ReportLiveObjects failed: {:?}", e);
            }
        }
        Err(e) => debug!("IDXGIDebug1 unavailable: {:?}", e),
    }
}

/// 交换链 `Interface` 转换的便捷封装
pub fn cast_swap_chain<T: Interface>(swap_chain: &IDXGISwapChain1) -> Result<T> {
    swap_chain.cast::<T>().map_err(|e| {
        SandboxError::Graphics(GraphicsError::SwapchainError(format!(
            "Failed to query swap chain interface: {:?}",
            e
        )))
    })
}

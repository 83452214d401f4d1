//! DirectX 11 上下文
//!
//! 设备和 immediate context、flip-discard 交换链、渲染目标和深度缓冲，
//! 以及所有绘制项共用的对象：四种渲染模式各一个光栅化状态、
//! b0 上的 MVP 动态常量缓冲和 s0 上的点采样器。

use tracing::{debug, info, trace, warn};
use windows::Win32::Foundation::HMODULE;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use winit::window::Window;

use super::{created, creation_error};
use crate::core::config::GraphicsConfig;
use crate::core::error::{GraphicsError, Result, SandboxError};
use crate::geometry::render_mode::{CullMode, FillMode};
use crate::geometry::RenderMode;
use crate::gfx::dxgi::{self, InfoQueue, SwapChainSpec, DSV_FORMAT};
use crate::math::Matrix4;
use crate::renderer::shaders::{MVP_REGISTER_B, SAMPLER_REGISTER_S};

/// DirectX 11 上下文
pub struct Dx11Context {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    swap_chain: IDXGISwapChain1,
    swap_chain_spec: SwapChainSpec,
    render_target: Option<ID3D11RenderTargetView>,
    depth_stencil: Option<ID3D11DepthStencilView>,
    viewport: D3D11_VIEWPORT,

    /// 按 `RenderMode::index()` 排列
    rasterizers: Vec<ID3D11RasterizerState>,
    mvp_buffer: ID3D11Buffer,
    sampler: ID3D11SamplerState,

    clear_color: [f32; 4],
    sync_interval: u32,
    info_queue: Option<InfoQueue>,
    stop_on_error: bool,
}

impl Dx11Context {
    pub fn new(window: &Window, config: &GraphicsConfig) -> Result<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let factory = dxgi::create_factory(config.debug_layer)?;
        let adapter = dxgi::select_hardware_adapter(&factory)?;

        // 指定适配器时驱动类型必须是 UNKNOWN
        let mut flags = D3D11_CREATE_DEVICE_BGRA_SUPPORT;
        if config.debug_layer {
            flags |= D3D11_CREATE_DEVICE_DEBUG;
        }
        let feature_levels = [D3D_FEATURE_LEVEL_12_0, D3D_FEATURE_LEVEL_11_1, D3D_FEATURE_LEVEL_11_0];

        let mut device: Option<ID3D11Device> = None;
        let mut context: Option<ID3D11DeviceContext> = None;
        let mut feature_level = D3D_FEATURE_LEVEL_11_0;
        unsafe {
            D3D11CreateDevice(
                &adapter,
                D3D_DRIVER_TYPE_UNKNOWN,
                HMODULE::default(),
                flags,
                Some(&feature_levels),
                D3D11_SDK_VERSION,
                Some(&mut device),
                Some(&mut feature_level),
                Some(&mut context),
            )
        }
        .map_err(|e| {
            SandboxError::Graphics(GraphicsError::DeviceCreation(format!(
                "Failed to create D3D11 device: {:?}",
                e
            )))
        })?;
        let device = created(device, "D3D11 device")?;
        let context = created(context, "D3D11 immediate context")?;
        debug!(?feature_level, "D3D11 Device created successfully");

        let info_queue = if config.debug_layer { InfoQueue::new() } else { None };

        let swap_chain_spec = SwapChainSpec {
            width,
            height,
            buffer_count: config.back_buffer_count,
            allow_tearing: config.allow_tearing && dxgi::tearing_supported(&factory),
            background: config.clear_color,
        };
        let hwnd = dxgi::window_hwnd(window)?;
        let swap_chain = dxgi::create_swap_chain(&factory, &device, hwnd, &swap_chain_spec)?;

        let rasterizers = RenderMode::ALL
            .iter()
            .map(|mode| create_rasterizer(&device, *mode))
            .collect::<Result<Vec<_>>>()?;
        let mvp_buffer = create_mvp_buffer(&device)?;
        let sampler = create_point_sampler(&device)?;

        let mut dx11 = Self {
            device,
            context,
            swap_chain,
            swap_chain_spec,
            render_target: None,
            depth_stencil: None,
            viewport: D3D11_VIEWPORT::default(),
            rasterizers,
            mvp_buffer,
            sampler,
            clear_color: config.clear_color,
            sync_interval: config.sync_interval,
            info_queue,
            stop_on_error: config.debug_layer,
        };

        dx11.create_targets(width, height)?;
        dx11.check_debug_messages("Dx11Context::new")?;

        info!(width, height, "DX11 Backend initialization complete");
        Ok(dx11)
    }

    pub fn device(&self) -> &ID3D11Device {
        &self.device
    }

    pub fn context(&self) -> &ID3D11DeviceContext {
        &self.context
    }

    pub fn sampler(&self) -> &ID3D11SamplerState {
        &self.sampler
    }

    /// 渲染模式对应的光栅化状态
    pub fn rasterizer(&self, mode: RenderMode) -> &ID3D11RasterizerState {
        &self.rasterizers[mode.index()]
    }

    fn create_targets(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let back_buffer: ID3D11Texture2D = self.swap_chain.GetBuffer(0).map_err(|e| {
                SandboxError::Graphics(GraphicsError::SwapchainError(format!(
                    "Failed to get back buffer: {:?}",
                    e
                )))
            })?;

            let mut render_target = None;
            self.device
                .CreateRenderTargetView(&back_buffer, None, Some(&mut render_target))
                .map_err(|e| creation_error("render target view", e))?;
            self.render_target = Some(created(render_target, "render target view")?);

            let depth_desc = D3D11_TEXTURE2D_DESC {
                Width: width,
                Height: height,
                MipLevels: 1,
                ArraySize: 1,
                Format: DSV_FORMAT,
                SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                Usage: D3D11_USAGE_DEFAULT,
                BindFlags: D3D11_BIND_DEPTH_STENCIL.0 as u32,
                CPUAccessFlags: 0,
                MiscFlags: 0,
            };
            let mut depth_buffer = None;
            self.device
                .CreateTexture2D(&depth_desc, None, Some(&mut depth_buffer))
                .map_err(|e| creation_error("depth buffer", e))?;
            let depth_buffer = created(depth_buffer, "depth buffer")?;

            let mut depth_stencil = None;
            self.device
                .CreateDepthStencilView(&depth_buffer, None, Some(&mut depth_stencil))
                .map_err(|e| creation_error("depth stencil view", e))?;
            self.depth_stencil = Some(created(depth_stencil, "depth stencil view")?);
        }

        self.viewport = D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width as f32,
            Height: height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };

        Ok(())
    }

    /// 写入 MVP 并绑定到 b0
    pub fn upload_mvp(&self, mvp: &Matrix4) -> Result<()> {
        let data = crate::math::matrix::to_gpu_matrix(mvp);

        unsafe {
            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            self.context
                .Map(&self.mvp_buffer, 0, D3D11_MAP_WRITE_DISCARD, 0, Some(&mut mapped))
                .map_err(|e| {
                    SandboxError::Graphics(GraphicsError::CommandExecution(format!(
                        "Failed to map MVP buffer: {:?}",
                        e
                    )))
                })?;
            std::ptr::copy_nonoverlapping(
                data.as_ptr() as *const u8,
                mapped.pData as *mut u8,
                std::mem::size_of_val(&data),
            );
            self.context.Unmap(&self.mvp_buffer, 0);

            self.context
                .VSSetConstantBuffers(MVP_REGISTER_B, Some(&[Some(self.mvp_buffer.clone())]));
        }

        Ok(())
    }

    /// 绑定 s0 上的点采样器
    pub fn bind_sampler(&self) {
        unsafe {
            self.context
                .PSSetSamplers(SAMPLER_REGISTER_S, Some(&[Some(self.sampler.clone())]));
        }
    }

    /// 开始一帧：绑定目标、设置视口并清除颜色和深度
    pub fn begin_frame(&mut self) -> Result<()> {
        unsafe {
            self.context
                .OMSetRenderTargets(Some(&[self.render_target.clone()]), self.depth_stencil.as_ref());
            self.context.RSSetViewports(Some(&[self.viewport]));

            if let Some(rtv) = &self.render_target {
                self.context.ClearRenderTargetView(rtv, &self.clear_color);
            }
            if let Some(dsv) = &self.depth_stencil {
                self.context
                    .ClearDepthStencilView(dsv, D3D11_CLEAR_DEPTH.0 as u32, 1.0, 0);
            }
        }

        trace!("Frame begun");
        Ok(())
    }

    /// 结束一帧：解绑目标并 Present
    pub fn end_frame(&mut self) -> Result<()> {
        unsafe {
            self.context.OMSetRenderTargets(None, None);
        }

        dxgi::present(
            &self.swap_chain,
            self.sync_interval,
            self.swap_chain_spec.allow_tearing,
        )?;
        self.check_debug_messages("Dx11Context::end_frame")?;

        trace!("Frame presented");
        Ok(())
    }

    /// 窗口大小改变
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            debug!("Window minimized, skipping resize");
            return Ok(());
        }

        debug!("Resizing swapchain...");

        // 交换链的缓冲不能再被任何视图引用
        unsafe {
            self.context.OMSetRenderTargets(None, None);
            self.context.Flush();
        }
        self.render_target = None;
        self.depth_stencil = None;

        self.swap_chain_spec.width = width;
        self.swap_chain_spec.height = height;
        dxgi::resize_buffers(&self.swap_chain, &self.swap_chain_spec)?;
        self.create_targets(width, height)?;

        debug!(width, height, "Resize completed");
        Ok(())
    }

    /// immediate context 没有显式 Fence，Flush 后交给驱动
    pub fn wait_for_gpu(&mut self) -> Result<()> {
        unsafe { self.context.Flush() };
        Ok(())
    }

    /// 输出调试层消息
    pub fn check_debug_messages(&self, location: &str) -> Result<()> {
        match &self.info_queue {
            Some(queue) => queue.drain(location, self.stop_on_error),
            None => Ok(()),
        }
    }
}

impl Drop for Dx11Context {
    fn drop(&mut self) {
        unsafe {
            self.context.ClearState();
            self.context.Flush();
        }

        if let Some(queue) = &self.info_queue {
            if let Err(e) = queue.drain("Dx11Context::drop", false) {
                warn!("Debug messages on release: {}", e);
            }
        }
    }
}

fn create_rasterizer(device: &ID3D11Device, mode: RenderMode) -> Result<ID3D11RasterizerState> {
    let spec = mode.rasterizer();
    let desc = D3D11_RASTERIZER_DESC {
        FillMode: match spec.fill {
            FillMode::Solid => D3D11_FILL_SOLID,
            FillMode::Wireframe => D3D11_FILL_WIREFRAME,
        },
        CullMode: match spec.cull {
            CullMode::None => D3D11_CULL_NONE,
            CullMode::Front => D3D11_CULL_FRONT,
            CullMode::Back => D3D11_CULL_BACK,
        },
        DepthClipEnable: spec.depth_clip.into(),
        ..Default::default()
    };

    let mut state = None;
    unsafe { device.CreateRasterizerState(&desc, Some(&mut state)) }
        .map_err(|e| creation_error("rasterizer state", e))?;
    created(state, "rasterizer state")
}

fn create_mvp_buffer(device: &ID3D11Device) -> Result<ID3D11Buffer> {
    let desc = D3D11_BUFFER_DESC {
        ByteWidth: std::mem::size_of::<[f32; 16]>() as u32,
        Usage: D3D11_USAGE_DYNAMIC,
        BindFlags: D3D11_BIND_CONSTANT_BUFFER.0 as u32,
        CPUAccessFlags: D3D11_CPU_ACCESS_WRITE.0 as u32,
        MiscFlags: 0,
        StructureByteStride: 0,
    };

    let mut buffer = None;
    unsafe { device.CreateBuffer(&desc, None, Some(&mut buffer)) }
        .map_err(|e| creation_error("MVP constant buffer", e))?;
    created(buffer, "MVP constant buffer")
}

fn create_point_sampler(device: &ID3D11Device) -> Result<ID3D11SamplerState> {
    let desc = D3D11_SAMPLER_DESC {
        Filter: D3D11_FILTER_MIN_MAG_MIP_POINT,
        AddressU: D3D11_TEXTURE_ADDRESS_WRAP,
        AddressV: D3D11_TEXTURE_ADDRESS_WRAP,
        AddressW: D3D11_TEXTURE_ADDRESS_WRAP,
        MipLODBias: 0.0,
        MaxAnisotropy: 1,
        ComparisonFunc: D3D11_COMPARISON_NEVER,
        BorderColor: [0.0, 0.0, 0.0, 0.0],
        MinLOD: 0.0,
        MaxLOD: f32::MAX,
    };

    let mut sampler = None;
    unsafe { device.CreateSamplerState(&desc, Some(&mut sampler)) }
        .map_err(|e| creation_error("sampler state", e))?;
    created(sampler, "sampler state")
}

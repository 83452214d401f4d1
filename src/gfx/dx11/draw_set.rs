//! DirectX 11 绘制集
//!
//! 与 DX12 绘制集共享同样的描述和着色器源码。渲染模式只是切换预先创建的
//! 光栅化状态，不需要重建任何对象。

use tracing::{debug, info};
use windows::core::PCSTR;
use windows::Win32::Graphics::Direct3D::D3D_PRIMITIVE_TOPOLOGY;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::context::Dx11Context;
use super::{created, creation_error};
use crate::component::OrbitCamera;
use crate::core::error::{DataError, Result};
use crate::geometry::vertex::InputClass;
use crate::geometry::{Bitmap, InputElement, RenderMode, VERTEX_SLOT};
use crate::gfx::dx12::shader;
use crate::gfx::dxgi::{self, RTV_FORMAT};
use crate::math::{matrix, Vector3};
use crate::renderer::draw_set::{DrawItem, DrawSetDesc};
use crate::renderer::shaders::{ShaderKind, TEXTURE_REGISTER_T};

fn input_elements(elements: &[InputElement]) -> Vec<D3D11_INPUT_ELEMENT_DESC> {
    elements
        .iter()
        .map(|e| D3D11_INPUT_ELEMENT_DESC {
            SemanticName: PCSTR::from_raw(e.semantic.c_name().as_ptr() as *const u8),
            SemanticIndex: e.semantic_index,
            Format: dxgi::vertex_format(e.format),
            InputSlot: e.slot,
            AlignedByteOffset: e.aligned_offset,
            InputSlotClass: match e.class {
                InputClass::PerVertex => D3D11_INPUT_PER_VERTEX_DATA,
                InputClass::PerInstance => D3D11_INPUT_PER_INSTANCE_DATA,
            },
            InstanceDataStepRate: e.step_rate,
        })
        .collect()
}

fn immutable_buffer(device: &ID3D11Device, bytes: &[u8], bind: D3D11_BIND_FLAG, what: &str) -> Result<ID3D11Buffer> {
    let desc = D3D11_BUFFER_DESC {
        ByteWidth: bytes.len() as u32,
        Usage: D3D11_USAGE_IMMUTABLE,
        BindFlags: bind.0 as u32,
        CPUAccessFlags: 0,
        MiscFlags: 0,
        StructureByteStride: 0,
    };
    let data = D3D11_SUBRESOURCE_DATA {
        pSysMem: bytes.as_ptr() as *const _,
        SysMemPitch: 0,
        SysMemSlicePitch: 0,
    };

    let mut buffer = None;
    unsafe { device.CreateBuffer(&desc, Some(&data), Some(&mut buffer)) }
        .map_err(|e| creation_error(what, e))?;
    created(buffer, what)
}

fn create_texture_view(device: &ID3D11Device, bitmap: &Bitmap) -> Result<ID3D11ShaderResourceView> {
    let desc = D3D11_TEXTURE2D_DESC {
        Width: bitmap.width,
        Height: bitmap.height,
        MipLevels: 1,
        ArraySize: 1,
        Format: RTV_FORMAT,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        Usage: D3D11_USAGE_IMMUTABLE,
        BindFlags: D3D11_BIND_SHADER_RESOURCE.0 as u32,
        CPUAccessFlags: 0,
        MiscFlags: 0,
    };
    let data = D3D11_SUBRESOURCE_DATA {
        pSysMem: bitmap.bytes.as_ptr() as *const _,
        SysMemPitch: bitmap.row_pitch(),
        SysMemSlicePitch: 0,
    };

    unsafe {
        let mut texture = None;
        device
            .CreateTexture2D(&desc, Some(&data), Some(&mut texture))
            .map_err(|e| creation_error("texture", e))?;
        let texture: ID3D11Texture2D = created(texture, "texture")?;

        let mut view = None;
        device
            .CreateShaderResourceView(&texture, None, Some(&mut view))
            .map_err(|e| creation_error("shader resource view", e))?;
        created(view, "shader resource view")
    }
}

/// 一个已经上传到 GPU 的绘制项
struct Dx11DrawItem {
    shader: ShaderKind,
    vertex_shader: ID3D11VertexShader,
    pixel_shader: ID3D11PixelShader,
    input_layout: ID3D11InputLayout,
    topology: D3D_PRIMITIVE_TOPOLOGY,
    render_mode: RenderMode,
    translation: Vector3,
    uses_mvp: bool,

    vertex_buffers: Vec<Option<ID3D11Buffer>>,
    strides: Vec<u32>,
    offsets: Vec<u32>,
    index_buffer: Option<ID3D11Buffer>,
    texture: Option<ID3D11ShaderResourceView>,

    vertex_count: u32,
    index_count: u32,
    instance_count: u32,
}

impl Dx11DrawItem {
    fn new(device: &ID3D11Device, item: &DrawItem) -> Result<Self> {
        let layout = item.layout()?;
        item.mesh.topology.pipeline_type()?;
        let shaders = shader::compile(item.shader)?;

        let (vertex_shader, pixel_shader, input_layout) = unsafe {
            let mut vs = None;
            device
                .CreateVertexShader(shaders.vs_bytes(), None, Some(&mut vs))
                .map_err(|e| creation_error("vertex shader", e))?;

            let mut ps = None;
            device
                .CreatePixelShader(shaders.ps_bytes(), None, Some(&mut ps))
                .map_err(|e| creation_error("pixel shader", e))?;

            let descs = input_elements(&layout.elements());
            let mut input_layout = None;
            device
                .CreateInputLayout(&descs, shaders.vs_bytes(), Some(&mut input_layout))
                .map_err(|e| creation_error("input layout", e))?;

            (
                created(vs, "vertex shader")?,
                created(ps, "pixel shader")?,
                created(input_layout, "input layout")?,
            )
        };

        let mut vertex_buffers = Vec::new();
        let mut strides = Vec::new();
        for stream in item.mesh.streams() {
            let buffer = immutable_buffer(device, stream.bytes(), D3D11_BIND_VERTEX_BUFFER, "vertex buffer")?;
            vertex_buffers.push(Some(buffer));
            strides.push(stream.stride());
        }
        let offsets = vec![0; vertex_buffers.len()];

        let index_buffer = match &item.mesh.indices {
            Some(indices) => Some(immutable_buffer(
                device,
                bytemuck::cast_slice(indices),
                D3D11_BIND_INDEX_BUFFER,
                "index buffer",
            )?),
            None => None,
        };

        let texture = match &item.texture {
            Some(bitmap) => Some(create_texture_view(device, bitmap)?),
            None => None,
        };

        debug!(
            shader = item.shader.name(),
            ?layout,
            buffers = vertex_buffers.len(),
            indexed = index_buffer.is_some(),
            textured = texture.is_some(),
            "Draw item created"
        );

        Ok(Self {
            shader: item.shader,
            vertex_shader,
            pixel_shader,
            input_layout,
            topology: dxgi::primitive_topology(item.mesh.topology),
            render_mode: item.render_mode,
            translation: item.translation,
            uses_mvp: item.shader.required_bindings().mvp,
            vertex_buffers,
            strides,
            offsets,
            index_buffer,
            texture,
            vertex_count: item.mesh.vertex_count(),
            index_count: item.mesh.index_count(),
            instance_count: item.mesh.instance_count(),
        })
    }

    fn draw(&self, context: &Dx11Context, camera: &OrbitCamera) -> Result<()> {
        let ctx = context.context();

        unsafe {
            ctx.IASetInputLayout(&self.input_layout);
            ctx.VSSetShader(&self.vertex_shader, None);
            ctx.PSSetShader(&self.pixel_shader, None);
            ctx.RSSetState(context.rasterizer(self.render_mode));

            ctx.IASetPrimitiveTopology(self.topology);
            ctx.IASetVertexBuffers(
                VERTEX_SLOT,
                self.vertex_buffers.len() as u32,
                Some(self.vertex_buffers.as_ptr()),
                Some(self.strides.as_ptr()),
                Some(self.offsets.as_ptr()),
            );
            if let Some(index_buffer) = &self.index_buffer {
                ctx.IASetIndexBuffer(index_buffer, DXGI_FORMAT_R16_UINT, 0);
            }
        }

        if self.uses_mvp {
            let model = matrix::translation(&self.translation);
            context.upload_mvp(&camera.mvp(&model))?;
        }

        if let Some(texture) = &self.texture {
            unsafe {
                ctx.PSSetShaderResources(TEXTURE_REGISTER_T, Some(&[Some(texture.clone())]));
            }
            context.bind_sampler();
        }

        unsafe {
            if self.index_buffer.is_some() {
                ctx.DrawIndexedInstanced(self.index_count, self.instance_count, 0, 0, 0);
            } else {
                ctx.DrawInstanced(self.vertex_count, self.instance_count, 0, 0);
            }
        }

        Ok(())
    }
}

/// DX11 绘制集
pub struct Dx11DrawSet {
    items: Vec<Dx11DrawItem>,
}

impl Dx11DrawSet {
    /// 校验描述并创建全部 GPU 对象
    pub fn new(context: &Dx11Context, desc: &DrawSetDesc) -> Result<Self> {
        desc.validate()?;

        let items = desc
            .items
            .iter()
            .map(|item| Dx11DrawItem::new(context.device(), item))
            .collect::<Result<Vec<_>>>()?;

        context.check_debug_messages("Dx11DrawSet::new")?;
        info!(items = items.len(), level = ?desc.level(), "DX11 draw set created");

        Ok(Self { items })
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut Dx11DrawItem> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or_else(|| DataError::IndexOutOfRange { index, len }.into())
    }

    pub fn draw(&self, context: &Dx11Context, camera: &OrbitCamera) -> Result<()> {
        for item in &self.items {
            item.draw(context, camera)?;
        }
        Ok(())
    }

    pub fn set_render_mode(&mut self, index: usize, mode: RenderMode) -> Result<()> {
        let item = self.item_mut(index)?;
        item.render_mode = mode;
        debug!(shader = item.shader.name(), index, ?mode, "Render mode changed");
        Ok(())
    }

    pub fn set_translation(&mut self, index: usize, translation: Vector3) -> Result<()> {
        self.item_mut(index)?.translation = translation;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{InputLayoutKind, VertexFormat};

    #[test]
    fn test_input_elements_separate_buffers() {
        let layout = InputLayoutKind::A1B2I3(VertexFormat::Float3, VertexFormat::Float2, VertexFormat::Float3);
        let descs = input_elements(&layout.elements());

        let slots: Vec<u32> = descs.iter().map(|d| d.InputSlot).collect();
        assert_eq!(slots, vec![VERTEX_SLOT, VERTEX_SLOT + 1, VERTEX_SLOT + 2]);
        assert_eq!(descs[2].InputSlotClass, D3D11_INPUT_PER_INSTANCE_DATA);
        assert_eq!(descs[0].InputSlotClass, D3D11_INPUT_PER_VERTEX_DATA);
    }
}

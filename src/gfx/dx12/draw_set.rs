//! DirectX 12 绘制集
//!
//! 由 `DrawSetDesc` 创建：每个绘制项拥有自己的 PSO、顶点 / 索引缓冲和可选纹理。
//! 根签名按种类在绘制集内共享；所有纹理的 SRV 放在绘制集共用的一个
//! 着色器可见堆里，每帧只绑定一次。

use std::collections::HashMap;
use std::ffi::c_void;

use tracing::{debug, info};
use windows::Win32::Graphics::Direct3D::D3D_PRIMITIVE_TOPOLOGY;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::context::Dx12Context;
use super::descriptor::{DescriptorKind, Dx12DescriptorHeap};
use super::pipeline::{create_pipeline_state, PipelineDesc};
use super::root_signature::{create_root_signature, MVP_CONSTANTS, MVP_PARAMETER, TEXTURE_PARAMETER};
use super::shader::{self, CompiledShaders};
use crate::component::OrbitCamera;
use crate::core::error::{DataError, GraphicsError, Result};
use crate::geometry::{Bitmap, InputElement, PrimitiveTopologyType, RenderMode, VERTEX_SLOT};
use crate::gfx::dxgi::{self, RTV_FORMAT};
use crate::math::{matrix, Vector3};
use crate::renderer::draw_set::{DrawItem, DrawSetDesc, RootSignatureKind};
use crate::renderer::shaders::ShaderKind;

/// 纹理及其在共享 SRV 堆中的描述符表
struct Dx12Texture {
    _resource: ID3D12Resource,
    srv_table: D3D12_GPU_DESCRIPTOR_HANDLE,
}

impl Dx12Texture {
    fn new(context: &mut Dx12Context, bitmap: &Bitmap, srv_heap: &Dx12DescriptorHeap, slot: u32) -> Result<Self> {
        let srv_table = srv_heap.gpu_handle(slot).ok_or_else(|| {
            GraphicsError::ResourceCreation(format!("SRV slot {} is not available in the draw set heap", slot))
        })?;
        let resource = context.create_texture_and_upload(bitmap)?;

        let srv_desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
            Format: RTV_FORMAT,
            ViewDimension: D3D12_SRV_DIMENSION_TEXTURE2D,
            Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
            Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                Texture2D: D3D12_TEX2D_SRV {
                    MipLevels: 1,
                    ..Default::default()
                },
            },
        };

        unsafe {
            context
                .device()
                .CreateShaderResourceView(&resource, Some(&srv_desc), srv_heap.cpu_handle(slot));
        }

        Ok(Self {
            _resource: resource,
            srv_table,
        })
    }
}

/// 一个已经上传到 GPU 的绘制项
struct Dx12DrawItem {
    shader: ShaderKind,
    shaders: CompiledShaders,
    root_signature: ID3D12RootSignature,
    elements: Vec<InputElement>,
    pipeline_type: PrimitiveTopologyType,
    topology: D3D_PRIMITIVE_TOPOLOGY,
    pso: ID3D12PipelineState,
    render_mode: RenderMode,
    translation: Vector3,
    uses_mvp: bool,

    _vertex_buffers: Vec<ID3D12Resource>,
    vertex_views: Vec<D3D12_VERTEX_BUFFER_VIEW>,
    index_buffer: Option<(ID3D12Resource, D3D12_INDEX_BUFFER_VIEW)>,
    texture: Option<Dx12Texture>,

    vertex_count: u32,
    index_count: u32,
    instance_count: u32,
}

impl Dx12DrawItem {
    fn new(
        context: &mut Dx12Context,
        item: &DrawItem,
        root_signature: ID3D12RootSignature,
        srv: Option<(&Dx12DescriptorHeap, u32)>,
    ) -> Result<Self> {
        let layout = item.layout()?;
        let elements = layout.elements();
        let pipeline_type = item.mesh.topology.pipeline_type()?;
        let shaders = shader::compile(item.shader)?;

        let pso = create_pipeline_state(
            context.device(),
            &PipelineDesc {
                root_signature: &root_signature,
                shaders: &shaders,
                elements: &elements,
                topology: pipeline_type,
                rasterizer: item.render_mode.rasterizer(),
            },
        )?;

        // 每个数据流一个缓冲，槽位从 VERTEX_SLOT 开始连续排列
        let mut vertex_buffers = Vec::new();
        let mut vertex_views = Vec::new();
        for stream in item.mesh.streams() {
            let buffer = context.create_buffer_and_upload(stream.bytes())?;
            vertex_views.push(D3D12_VERTEX_BUFFER_VIEW {
                BufferLocation: unsafe { buffer.GetGPUVirtualAddress() },
                SizeInBytes: stream.bytes().len() as u32,
                StrideInBytes: stream.stride(),
            });
            vertex_buffers.push(buffer);
        }

        let index_buffer = match &item.mesh.indices {
            Some(indices) => {
                let bytes: &[u8] = bytemuck::cast_slice(indices);
                let buffer = context.create_buffer_and_upload(bytes)?;
                let view = D3D12_INDEX_BUFFER_VIEW {
                    BufferLocation: unsafe { buffer.GetGPUVirtualAddress() },
                    SizeInBytes: bytes.len() as u32,
                    Format: DXGI_FORMAT_R16_UINT,
                };
                Some((buffer, view))
            }
            None => None,
        };

        let texture = match (&item.texture, srv) {
            (Some(bitmap), Some((heap, slot))) => Some(Dx12Texture::new(context, bitmap, heap, slot)?),
            _ => None,
        };

        debug!(
            shader = item.shader.name(),
            ?layout,
            buffers = vertex_views.len(),
            indexed = index_buffer.is_some(),
            textured = texture.is_some(),
            "Draw item created"
        );

        Ok(Self {
            shader: item.shader,
            shaders,
            root_signature,
            elements,
            pipeline_type,
            topology: dxgi::primitive_topology(item.mesh.topology),
            pso,
            render_mode: item.render_mode,
            translation: item.translation,
            uses_mvp: item.shader.required_bindings().mvp,
            _vertex_buffers: vertex_buffers,
            vertex_views,
            index_buffer,
            texture,
            vertex_count: item.mesh.vertex_count(),
            index_count: item.mesh.index_count(),
            instance_count: item.mesh.instance_count(),
        })
    }

    fn rebuild_pipeline(&mut self, device: &ID3D12Device) -> Result<()> {
        self.pso = create_pipeline_state(
            device,
            &PipelineDesc {
                root_signature: &self.root_signature,
                shaders: &self.shaders,
                elements: &self.elements,
                topology: self.pipeline_type,
                rasterizer: self.render_mode.rasterizer(),
            },
        )?;
        Ok(())
    }

    fn draw(&self, command_list: &ID3D12GraphicsCommandList, camera: &OrbitCamera) {
        unsafe {
            command_list.SetGraphicsRootSignature(&self.root_signature);
            command_list.SetPipelineState(&self.pso);

            if let Some(texture) = &self.texture {
                command_list.SetGraphicsRootDescriptorTable(TEXTURE_PARAMETER, texture.srv_table);
            }

            command_list.IASetPrimitiveTopology(self.topology);
            command_list.IASetVertexBuffers(VERTEX_SLOT, Some(&self.vertex_views));
            if let Some((_, view)) = &self.index_buffer {
                command_list.IASetIndexBuffer(Some(view));
            }

            if self.uses_mvp {
                let model = matrix::translation(&self.translation);
                let mvp = matrix::to_gpu_matrix(&camera.mvp(&model));
                command_list.SetGraphicsRoot32BitConstants(
                    MVP_PARAMETER,
                    MVP_CONSTANTS,
                    mvp.as_ptr() as *const c_void,
                    0,
                );
            }

            if self.index_buffer.is_some() {
                command_list.DrawIndexedInstanced(self.index_count, self.instance_count, 0, 0, 0);
            } else {
                command_list.DrawInstanced(self.vertex_count, self.instance_count, 0, 0);
            }
        }
    }
}

/// 按顺序给带纹理的绘制项分配 SRV 堆槽位
fn srv_slots(has_texture: impl IntoIterator<Item = bool>) -> Vec<Option<u32>> {
    let mut next = 0u32;
    has_texture
        .into_iter()
        .map(|textured| {
            textured.then(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

/// DX12 绘制集
pub struct Dx12DrawSet {
    items: Vec<Dx12DrawItem>,
    /// 绘制集内全部纹理的 SRV，没有纹理时为 `None`
    srv_heap: Option<Dx12DescriptorHeap>,
}

impl Dx12DrawSet {
    /// 校验描述并创建全部 GPU 对象
    pub fn new(context: &mut Dx12Context, desc: &DrawSetDesc) -> Result<Self> {
        desc.validate()?;

        let mut root_signatures: HashMap<RootSignatureKind, ID3D12RootSignature> = HashMap::new();
        let mut items = Vec::with_capacity(desc.len());

        let slots = srv_slots(desc.items.iter().map(|item| item.texture.is_some()));
        let texture_count = slots.iter().flatten().count() as u32;
        let srv_heap = if texture_count > 0 {
            Some(Dx12DescriptorHeap::new(
                context.device(),
                DescriptorKind::ShaderResource,
                texture_count,
            )?)
        } else {
            None
        };
        for (item, slot) in desc.items.iter().zip(slots) {
            let kind = item.root_signature_kind();
            let root_signature = match root_signatures.get(&kind) {
                Some(rs) => rs.clone(),
                None => {
                    let rs = create_root_signature(context.device(), kind)?;
                    root_signatures.insert(kind, rs.clone());
                    rs
                }
            };

            let srv = srv_heap.as_ref().zip(slot);

            items.push(Dx12DrawItem::new(context, item, root_signature, srv)?);
        }

        context.check_debug_messages("Dx12DrawSet::new")?;
        info!(
            items = items.len(),
            level = ?desc.level(),
            root_signatures = root_signatures.len(),
            textures = texture_count,
            "DX12 draw set created"
        );

        Ok(Self { items, srv_heap })
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut Dx12DrawItem> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or_else(|| DataError::IndexOutOfRange { index, len }.into())
    }

    /// 录制全部绘制项
    ///
    /// 共享的 SRV 堆在绘制集开头绑定一次。
    pub fn draw(&self, command_list: &ID3D12GraphicsCommandList, camera: &OrbitCamera) {
        if let Some(heap) = &self.srv_heap {
            unsafe {
                command_list.SetDescriptorHeaps(&[Some(heap.heap().clone())]);
            }
        }

        for item in &self.items {
            item.draw(command_list, camera);
        }
    }

    /// 切换渲染模式并重建 PSO
    ///
    /// 旧 PSO 可能还被在途的帧引用，先等待 GPU 空闲。
    pub fn set_render_mode(&mut self, context: &mut Dx12Context, index: usize, mode: RenderMode) -> Result<()> {
        let item = self.item_mut(index)?;
        if item.render_mode == mode {
            return Ok(());
        }

        context.wait_for_gpu()?;
        let item = self.item_mut(index)?;
        item.render_mode = mode;
        item.rebuild_pipeline(context.device())?;

        debug!(shader = item.shader.name(), index, ?mode, "Render mode changed");
        Ok(())
    }

    /// 修改模型平移，下一帧生效
    pub fn set_translation(&mut self, index: usize, translation: Vector3) -> Result<()> {
        self.item_mut(index)?.translation = translation;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srv_slots_are_dense() {
        assert_eq!(
            srv_slots([true, false, true, true, false]),
            vec![Some(0), None, Some(1), Some(2), None]
        );
        assert!(srv_slots([false, false]).iter().all(Option::is_none));
        assert!(srv_slots(std::iter::empty()).is_empty());
    }
}

//! 图形管线状态对象
//!
//! PSO 由根签名、编译好的着色器、输入布局、拓扑类别和渲染模式决定。
//! 渲染模式改变时需要重新创建 PSO。

use windows::core::PCSTR;
use windows::Win32::Graphics::Direct3D12::*;

use super::borrow_com;
use super::shader::CompiledShaders;
use crate::core::error::{GraphicsError, Result, SandboxError};
use crate::geometry::render_mode::{CullMode, FillMode};
use crate::geometry::vertex::InputClass;
use crate::geometry::{InputElement, PrimitiveTopologyType, RasterizerSpec};
use crate::gfx::dxgi::{self, DSV_FORMAT, RTV_FORMAT};

/// 平台无关的输入元素转成 D3D12 描述
///
/// `SemanticName` 指向 `'static` 字符串，返回值可以随意保存。
pub fn input_elements(elements: &[InputElement]) -> Vec<D3D12_INPUT_ELEMENT_DESC> {
    elements
        .iter()
        .map(|e| D3D12_INPUT_ELEMENT_DESC {
            SemanticName: PCSTR::from_raw(e.semantic.c_name().as_ptr() as *const u8),
            SemanticIndex: e.semantic_index,
            Format: dxgi::vertex_format(e.format),
            InputSlot: e.slot,
            AlignedByteOffset: e.aligned_offset,
            InputSlotClass: match e.class {
                InputClass::PerVertex => D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                InputClass::PerInstance => D3D12_INPUT_CLASSIFICATION_PER_INSTANCE_DATA,
            },
            InstanceDataStepRate: e.step_rate,
        })
        .collect()
}

fn rasterizer_desc(spec: RasterizerSpec) -> D3D12_RASTERIZER_DESC {
    D3D12_RASTERIZER_DESC {
        FillMode: match spec.fill {
            FillMode::Solid => D3D12_FILL_MODE_SOLID,
            FillMode::Wireframe => D3D12_FILL_MODE_WIREFRAME,
        },
        CullMode: match spec.cull {
            CullMode::None => D3D12_CULL_MODE_NONE,
            CullMode::Front => D3D12_CULL_MODE_FRONT,
            CullMode::Back => D3D12_CULL_MODE_BACK,
        },
        DepthClipEnable: spec.depth_clip.into(),
        ..Default::default()
    }
}

fn topology_type(kind: PrimitiveTopologyType) -> D3D12_PRIMITIVE_TOPOLOGY_TYPE {
    match kind {
        PrimitiveTopologyType::Line => D3D12_PRIMITIVE_TOPOLOGY_TYPE_LINE,
        PrimitiveTopologyType::Triangle => D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
    }
}

/// 创建 PSO 所需的全部输入
pub struct PipelineDesc<'a> {
    pub root_signature: &'a ID3D12RootSignature,
    pub shaders: &'a CompiledShaders,
    pub elements: &'a [InputElement],
    pub topology: PrimitiveTopologyType,
    pub rasterizer: RasterizerSpec,
}

/// 创建图形管线状态对象
pub fn create_pipeline_state(device: &ID3D12Device, desc: &PipelineDesc) -> Result<ID3D12PipelineState> {
    let input_element_descs = input_elements(desc.elements);

    let mut pso_desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC::default();
    pso_desc.pRootSignature = unsafe { borrow_com(desc.root_signature) };
    pso_desc.VS = D3D12_SHADER_BYTECODE {
        pShaderBytecode: unsafe { desc.shaders.vs.GetBufferPointer() },
        BytecodeLength: unsafe { desc.shaders.vs.GetBufferSize() },
    };
    pso_desc.PS = D3D12_SHADER_BYTECODE {
        pShaderBytecode: unsafe { desc.shaders.ps.GetBufferPointer() },
        BytecodeLength: unsafe { desc.shaders.ps.GetBufferSize() },
    };
    pso_desc.BlendState.RenderTarget[0].RenderTargetWriteMask = D3D12_COLOR_WRITE_ENABLE_ALL.0 as u8;
    pso_desc.RasterizerState = rasterizer_desc(desc.rasterizer);
    pso_desc.DepthStencilState = D3D12_DEPTH_STENCIL_DESC {
        DepthEnable: true.into(),
        DepthWriteMask: D3D12_DEPTH_WRITE_MASK_ALL,
        DepthFunc: D3D12_COMPARISON_FUNC_LESS,
        StencilEnable: false.into(),
        StencilReadMask: 0xFF,
        StencilWriteMask: 0xFF,
        FrontFace: D3D12_DEPTH_STENCILOP_DESC::default(),
        BackFace: D3D12_DEPTH_STENCILOP_DESC::default(),
    };
    pso_desc.SampleMask = u32::MAX;
    pso_desc.DSVFormat = DSV_FORMAT;
    pso_desc.InputLayout = D3D12_INPUT_LAYOUT_DESC {
        pInputElementDescs: input_element_descs.as_ptr(),
        NumElements: input_element_descs.len() as u32,
    };
    pso_desc.PrimitiveTopologyType = topology_type(desc.topology);
    pso_desc.NumRenderTargets = 1;
    pso_desc.RTVFormats[0] = RTV_FORMAT;
    pso_desc.SampleDesc.Count = 1;

    unsafe { device.CreateGraphicsPipelineState(&pso_desc) }.map_err(|e| {
        SandboxError::Graphics(GraphicsError::ResourceCreation(format!(
            "Failed to create pipeline state ({:?}, {:?}): {:?}",
            desc.topology, desc.rasterizer, e
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{InputLayoutKind, VertexFormat, VERTEX_SLOT};
    use crate::geometry::RenderMode;

    #[test]
    fn test_input_elements_instance_slot() {
        let layout = InputLayoutKind::A1B1I2(VertexFormat::Float3, VertexFormat::Float2, VertexFormat::Float3);
        let descs = input_elements(&layout.elements());

        assert_eq!(descs.len(), 3);
        assert_eq!(descs[0].InputSlot, VERTEX_SLOT);
        assert_eq!(descs[1].AlignedByteOffset, D3D12_APPEND_ALIGNED_ELEMENT);
        assert_eq!(descs[2].InputSlot, VERTEX_SLOT + 1);
        assert_eq!(descs[2].InputSlotClass, D3D12_INPUT_CLASSIFICATION_PER_INSTANCE_DATA);
        assert_eq!(descs[2].InstanceDataStepRate, 1);
    }

    #[test]
    fn test_rasterizer_desc() {
        let wire = rasterizer_desc(RenderMode::Wireframe.rasterizer());
        assert_eq!(wire.FillMode, D3D12_FILL_MODE_WIREFRAME);
        assert_eq!(wire.CullMode, D3D12_CULL_MODE_NONE);

        let back_only = rasterizer_desc(RenderMode::SolidBackOnly.rasterizer());
        assert_eq!(back_only.CullMode, D3D12_CULL_MODE_FRONT);
        assert!(back_only.DepthClipEnable.as_bool());
    }
}

//! Fixed-function state and vertex layouts for the two render pipelines.

use std::mem::size_of;

use super::instances::{AtomStyle, BondEndpoints, BondStyle};
use super::mesh::MeshVertex;
use crate::gpu::texture::DEPTH_FORMAT;
use crate::gpu::PipelineKind;

const MESH_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
const ATOM_STYLE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![2 => Float32x3, 3 => Float32];
const ATOM_POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![4 => Float32x3];
const BOND_STYLE_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![2 => Float32x3, 3 => Float32, 4 => Float32x3];
const BOND_ENDPOINT_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![5 => Float32x3, 6 => Float32x3];

fn layout(
    stride: usize,
    step_mode: wgpu::VertexStepMode,
    attributes: &'static [wgpu::VertexAttribute],
) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: stride as wgpu::BufferAddress,
        step_mode,
        attributes,
    }
}

/// Buffer layouts for slots 0 (mesh), 1 (static instance data) and
/// 2 (dynamic instance data).
pub fn vertex_layouts(kind: PipelineKind) -> [wgpu::VertexBufferLayout<'static>; 3] {
    let mesh = layout(
        size_of::<MeshVertex>(),
        wgpu::VertexStepMode::Vertex,
        &MESH_ATTRIBUTES,
    );
    match kind {
        PipelineKind::AtomSpheres => [
            mesh,
            layout(
                size_of::<AtomStyle>(),
                wgpu::VertexStepMode::Instance,
                &ATOM_STYLE_ATTRIBUTES,
            ),
            layout(
                size_of::<[f32; 3]>(),
                wgpu::VertexStepMode::Instance,
                &ATOM_POSITION_ATTRIBUTES,
            ),
        ],
        PipelineKind::BondCylinders => [
            mesh,
            layout(
                size_of::<BondStyle>(),
                wgpu::VertexStepMode::Instance,
                &BOND_STYLE_ATTRIBUTES,
            ),
            layout(
                size_of::<BondEndpoints>(),
                wgpu::VertexStepMode::Instance,
                &BOND_ENDPOINT_ATTRIBUTES,
            ),
        ],
    }
}

/// Standard depth-stencil state used by both pipelines.
pub fn depth_stencil_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Back-face culled triangle lists.
pub fn primitive_state() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: Some(wgpu::Face::Back),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_cover_attributes() {
        for kind in [PipelineKind::AtomSpheres, PipelineKind::BondCylinders] {
            for layout in vertex_layouts(kind) {
                for attr in layout.attributes {
                    assert!(attr.offset + attr.format.size() <= layout.array_stride);
                }
            }
        }
    }

    #[test]
    fn shader_locations_are_unique() {
        for kind in [PipelineKind::AtomSpheres, PipelineKind::BondCylinders] {
            let mut locations: Vec<u32> = vertex_layouts(kind)
                .iter()
                .flat_map(|l| l.attributes.iter().map(|a| a.shader_location))
                .collect();
            let n = locations.len();
            locations.sort_unstable();
            locations.dedup();
            assert_eq!(locations.len(), n);
        }
    }
}

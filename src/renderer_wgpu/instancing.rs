use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::geometry::{SpriteSize, SpriteVertex, SPRITE_INDICES};
use crate::garden_core::placement::PlacedInstance;

/// Plants keep soft petal edges; grass blades need a hard cut.
pub const PLANT_ALPHA_CUTOFF: f32 = 0.1;
pub const GROUND_COVER_ALPHA_CUTOFF: f32 = 0.7;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
pub struct InstanceData {
    pub position: [f32; 3],
    pub rotation_y: f32,
    pub scale: [f32; 3],
    /// Roll in radians, rewritten every frame.
    pub sway: f32,
    pub alpha_cutoff: f32,
    pub _pad: [f32; 3],
}

pub struct SpriteMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

pub struct GpuInstanceBatch {
    pub instance_buffer: wgpu::Buffer,
    pub instance_count: u32,
}

pub fn build_instances(placed: &[PlacedInstance], alpha_cutoff: f32) -> Vec<InstanceData> {
    placed
        .iter()
        .map(|p| InstanceData {
            position: p.position.to_array(),
            rotation_y: p.rotation_y,
            scale: p.scale.to_array(),
            sway: 0.0,
            alpha_cutoff,
            _pad: [0.0; 3],
        })
        .collect()
}

/// Overwrites the sway of each instance in order; extra values are ignored.
pub fn write_sway<I>(instances: &mut [InstanceData], sway: I)
where
    I: IntoIterator<Item = f32>,
{
    for (instance, angle) in instances.iter_mut().zip(sway) {
        instance.sway = angle;
    }
}

pub fn upload_sprite(device: &wgpu::Device, size: SpriteSize, label: &str) -> SpriteMesh {
    let vertices: [SpriteVertex; 4] = size.vertices();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label}-vb")),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label}-ib")),
        contents: bytemuck::cast_slice(&SPRITE_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });
    SpriteMesh {
        vertex_buffer,
        index_buffer,
        index_count: SPRITE_INDICES.len() as u32,
    }
}

pub fn upload_instances(
    device: &wgpu::Device,
    instances: &[InstanceData],
    label: &str,
) -> Option<GpuInstanceBatch> {
    if instances.is_empty() {
        return None;
    }
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label}-instance-buf")),
        contents: bytemuck::cast_slice(instances),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });
    Some(GpuInstanceBatch {
        instance_buffer: buffer,
        instance_count: instances.len() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::{build_instances, write_sway, InstanceData, PLANT_ALPHA_CUTOFF};
    use crate::garden_core::placement::PlacedInstance;
    use glam::Vec3;

    fn placed(x: f32) -> PlacedInstance {
        PlacedInstance {
            position: Vec3::new(x, 0.0, 1.0),
            scale: Vec3::new(0.9, 1.2, 0.9),
            rotation_y: 0.5,
            wind_phase: 0.0,
            wind_speed: 1.0,
        }
    }

    #[test]
    fn instance_layout_is_three_vec4s() {
        assert_eq!(std::mem::size_of::<InstanceData>(), 48);
    }

    #[test]
    fn instances_copy_static_attributes() {
        let data = build_instances(&[placed(1.0), placed(2.0)], PLANT_ALPHA_CUTOFF);
        assert_eq!(data.len(), 2);
        assert_eq!(data[1].position, [2.0, 0.0, 1.0]);
        assert_eq!(data[0].scale, [0.9, 1.2, 0.9]);
        assert_eq!(data[0].rotation_y, 0.5);
        assert_eq!(data[0].sway, 0.0);
        assert_eq!(data[0].alpha_cutoff, PLANT_ALPHA_CUTOFF);
    }

    #[test]
    fn sway_only_touches_the_sway_lane() {
        let mut data = build_instances(&[placed(1.0), placed(2.0)], PLANT_ALPHA_CUTOFF);
        let before = data.clone();
        write_sway(&mut data, [0.01, -0.02, 0.5]);
        assert_eq!(data[0].sway, 0.01);
        assert_eq!(data[1].sway, -0.02);
        assert_eq!(data[0].position, before[0].position);
        assert_eq!(data[1].scale, before[1].scale);
    }
}

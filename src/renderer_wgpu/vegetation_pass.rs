use std::collections::HashMap;

use super::geometry::{SpriteVertex, GROUND_COVER_QUAD, PLANT_QUAD};
use super::instancing::{
    build_instances, upload_instances, upload_sprite, write_sway, GpuInstanceBatch, InstanceData,
    SpriteMesh, GROUND_COVER_ALPHA_CUTOFF, PLANT_ALPHA_CUTOFF,
};
use super::material::SpriteMaterial;
use super::pipeline::{create_render_pipeline, PipelineOptions};
use super::texture::GpuTexture;
use crate::garden_core::placement::{PlacedInstance, Placement};
use crate::garden_core::species::{SpeciesCatalog, SpeciesId};
use crate::garden_core::wind::InstanceAnimator;
use crate::garden_runtime::assets::TextureData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BatchKey {
    Species(SpeciesId),
    GroundCover,
}

/// One instanced draw: every instance shares a texture and a sprite shape.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan<'a> {
    pub key: BatchKey,
    pub texture: &'a str,
    pub placed: &'a [PlacedInstance],
}

/// Groups a placement into draws, species first in catalog order, ground
/// cover last. Empty groups and species missing from the catalog are skipped.
pub fn plan_batches<'a>(
    placement: &'a Placement,
    catalog: &'a SpeciesCatalog,
    ground_cover_texture: &'a str,
) -> Vec<BatchPlan<'a>> {
    let mut plans: Vec<BatchPlan<'a>> = placement
        .species
        .iter()
        .filter(|group| !group.instances.is_empty())
        .filter_map(|group| {
            let species = catalog.get(group.species)?;
            Some(BatchPlan {
                key: BatchKey::Species(group.species),
                texture: species.texture.as_str(),
                placed: group.instances.as_slice(),
            })
        })
        .collect();
    plans.sort_by_key(|plan| plan.key);
    if !placement.ground_cover.is_empty() {
        plans.push(BatchPlan {
            key: BatchKey::GroundCover,
            texture: ground_cover_texture,
            placed: placement.ground_cover.as_slice(),
        });
    }
    plans
}

/// Pairs each batch with its loaded texture, keeping batch order and
/// skipping batches whose texture has not arrived.
fn with_textures<'a, B, T, F>(
    batches: &'a [B],
    textures: &'a HashMap<String, T>,
    texture_of: F,
) -> impl Iterator<Item = (&'a B, &'a T)> + 'a
where
    F: 'a + Fn(&B) -> &str,
{
    batches
        .iter()
        .filter_map(move |batch| textures.get(texture_of(batch)).map(|t| (batch, t)))
}

struct Batch {
    key: BatchKey,
    texture: String,
    placed: Vec<PlacedInstance>,
    instances: Vec<InstanceData>,
    gpu: GpuInstanceBatch,
}

pub struct VegetationPass {
    pipeline: wgpu::RenderPipeline,
    material: SpriteMaterial,
    plant_sprite: SpriteMesh,
    ground_sprite: SpriteMesh,
    textures: HashMap<String, GpuTexture>,
    /// Only the latest generation; `replace_batches` swaps the whole list.
    batches: Vec<Batch>,
}

impl VegetationPass {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        frame_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let material = SpriteMaterial::new(device);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vegetation-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/vegetation.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vegetation-pipeline-layout"),
            bind_group_layouts: &[frame_layout, &material.layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        };

        let instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 28,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: 32,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        };

        let pipeline = create_render_pipeline(
            device,
            config,
            &pipeline_layout,
            &shader,
            &[vertex_layout, instance_layout],
            "vegetation-pipeline",
            PipelineOptions::cutout(),
        );

        Self {
            pipeline,
            plant_sprite: upload_sprite(device, PLANT_QUAD, "plant-sprite"),
            ground_sprite: upload_sprite(device, GROUND_COVER_QUAD, "ground-cover-sprite"),
            material,
            textures: HashMap::new(),
            batches: Vec::new(),
        }
    }

    /// Drops every batch of the previous generation and uploads the new one.
    /// Textures are kept; batches whose texture has not arrived yet stay
    /// hidden until `insert_texture` supplies it.
    pub fn replace_batches(
        &mut self,
        device: &wgpu::Device,
        generation: u64,
        placement: &Placement,
        catalog: &SpeciesCatalog,
        ground_cover_texture: &str,
    ) {
        self.batches.clear();

        for plan in plan_batches(placement, catalog, ground_cover_texture) {
            let cutoff = match plan.key {
                BatchKey::Species(_) => PLANT_ALPHA_CUTOFF,
                BatchKey::GroundCover => GROUND_COVER_ALPHA_CUTOFF,
            };
            let instances = build_instances(plan.placed, cutoff);
            let Some(gpu) = upload_instances(device, &instances, plan.texture) else {
                continue;
            };
            self.batches.push(Batch {
                key: plan.key,
                texture: plan.texture.to_string(),
                placed: plan.placed.to_vec(),
                instances,
                gpu,
            });
        }
        log::debug!(
            "generation {generation}: {} vegetation batches",
            self.batches.len()
        );
    }

    /// Adds or replaces a texture; a replacement takes effect on the next draw.
    pub fn insert_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &TextureData) {
        let texture = GpuTexture::upload(device, queue, data, &self.material);
        if self.textures.insert(data.key.clone(), texture).is_some() {
            log::info!("reloaded texture {}", data.key);
        }
    }

    pub fn release_textures(&mut self, keys: &[String]) {
        for key in keys {
            self.textures.remove(key);
        }
    }

    /// Rewrites the sway lane of every live batch and uploads it.
    pub fn update_sway(&mut self, queue: &wgpu::Queue, animator: &InstanceAnimator, elapsed: f64) {
        for batch in &mut self.batches {
            write_sway(&mut batch.instances, animator.animate(elapsed, &batch.placed));
            queue.write_buffer(
                &batch.gpu.instance_buffer,
                0,
                bytemuck::cast_slice(&batch.instances),
            );
        }
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn drawable_batch_count(&self) -> usize {
        self.drawable().count()
    }

    fn drawable(&self) -> impl Iterator<Item = (&Batch, &GpuTexture)> {
        with_textures(&self.batches, &self.textures, |batch| batch.texture.as_str())
    }

    pub fn render<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_pipeline(&self.pipeline);
        for (batch, texture) in self.drawable() {
            let sprite = match batch.key {
                BatchKey::Species(_) => &self.plant_sprite,
                BatchKey::GroundCover => &self.ground_sprite,
            };
            pass.set_bind_group(1, &texture.bind_group, &[]);
            pass.set_vertex_buffer(0, sprite.vertex_buffer.slice(..));
            pass.set_vertex_buffer(1, batch.gpu.instance_buffer.slice(..));
            pass.set_index_buffer(sprite.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..sprite.index_count, 0, 0..batch.gpu.instance_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{plan_batches, with_textures, BatchKey};
    use std::collections::HashMap;
    use crate::garden_core::placement::{PlacedInstance, Placement, SpeciesPlacement};
    use crate::garden_core::species::{SpeciesCatalog, SpeciesId};
    use glam::Vec3;

    fn instance() -> PlacedInstance {
        PlacedInstance {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation_y: 0.0,
            wind_phase: 0.0,
            wind_speed: 1.0,
        }
    }

    #[test]
    fn batches_follow_species_then_ground_cover() {
        let placement = Placement {
            seed: 1,
            species: vec![
                SpeciesPlacement {
                    species: SpeciesId(2),
                    instances: vec![instance(); 3],
                },
                SpeciesPlacement {
                    species: SpeciesId(0),
                    instances: vec![instance()],
                },
                SpeciesPlacement {
                    species: SpeciesId(1),
                    instances: Vec::new(),
                },
            ],
            ground_cover: vec![instance(); 5],
            claimed: Vec::new(),
        };
        let catalog = SpeciesCatalog::default();
        let plans = plan_batches(&placement, &catalog, "20/Poa_pratensis.png");

        let keys: Vec<BatchKey> = plans.iter().map(|p| p.key).collect();
        assert_eq!(
            keys,
            vec![
                BatchKey::Species(SpeciesId(0)),
                BatchKey::Species(SpeciesId(2)),
                BatchKey::GroundCover
            ]
        );
        assert_eq!(plans[1].placed.len(), 3);
        assert_eq!(plans[0].texture, catalog.get(SpeciesId(0)).unwrap().texture);
        assert_eq!(plans[2].texture, "20/Poa_pratensis.png");
    }

    #[test]
    fn only_batches_with_loaded_textures_are_drawn() {
        let batches = vec![
            (BatchKey::Species(SpeciesId(0)), "1/a.png"),
            (BatchKey::Species(SpeciesId(3)), "4/d.png"),
            (BatchKey::GroundCover, "20/Poa_pratensis.png"),
        ];
        let mut textures: HashMap<String, u32> = HashMap::new();
        assert_eq!(with_textures(&batches, &textures, |b| b.1).count(), 0);

        textures.insert("20/Poa_pratensis.png".to_string(), 7);
        textures.insert("1/a.png".to_string(), 1);
        textures.insert("unused.png".to_string(), 9);
        let drawn: Vec<(BatchKey, u32)> = with_textures(&batches, &textures, |b| b.1)
            .map(|(b, t)| (b.0, *t))
            .collect();
        assert_eq!(
            drawn,
            vec![(BatchKey::Species(SpeciesId(0)), 1), (BatchKey::GroundCover, 7)]
        );

        textures.remove("1/a.png");
        assert_eq!(with_textures(&batches, &textures, |b| b.1).count(), 1);
    }

    #[test]
    fn unknown_species_and_empty_placements_plan_nothing() {
        let placement = Placement {
            seed: 1,
            species: vec![SpeciesPlacement {
                species: SpeciesId(400),
                instances: vec![instance()],
            }],
            ..Placement::default()
        };
        assert!(plan_batches(&placement, &SpeciesCatalog::default(), "g.png").is_empty());
        assert!(plan_batches(&Placement::default(), &SpeciesCatalog::default(), "g.png").is_empty());
    }
}

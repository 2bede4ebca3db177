pub mod pass;
pub mod set_layouts;
pub mod shader_types;
pub mod targets;

use std::path::PathBuf;
use std::sync::Arc;

use ash::vk;
use ultraviolet::Vec3;

use crate::camera::Camera;
use crate::kernel::SampleKernel;
use crate::params::TuningParams;
use crate::scene::Scene;
use crate::transform::Transform;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::context::Context;
use crate::vulkan::descriptor_set::{DescriptorSet, WriteDescriptorSet};
use crate::vulkan::swapchain::SwapchainContainer;

use self::pass::geometry::{DrawItem, GeometryPass};
use self::pass::ssao::SsaoPass;
use self::set_layouts::DescriptorSetLayoutCache;
use self::shader_types::{CameraBlock, DrawPushConstants, SamplePointsBlock, SsaoParamsBlock};

pub struct CameraDescriptorSet {
    pub buffer: Buffer<shader_types::CameraBlock>,
    pub descriptor_set: DescriptorSet,
}

/// Scalar parameters plus the immutable sample-points block, bound together
/// as one set in the occlusion program.
pub struct SsaoDescriptorSet {
    pub params_buffer: Buffer<shader_types::SsaoParamsBlock>,
    pub points_buffer: Buffer<shader_types::SamplePointsBlock>,
    pub descriptor_set: DescriptorSet,
}

pub struct MainRenderer {
    geometry_pass: GeometryPass,
    ssao_pass: SsaoPass,

    camera_descriptor_set: CameraDescriptorSet,
    ssao_descriptor_set: SsaoDescriptorSet,

    shader_dir: PathBuf,
    context: Arc<Context>,
}

impl MainRenderer {
    pub fn new(
        context: Arc<Context>,
        descriptor_pool: vk::DescriptorPool,
        set_layout_cache: &DescriptorSetLayoutCache,
        swapchain: &SwapchainContainer,
        scene: &Scene,
        kernel: &SampleKernel,
        shader_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let camera_descriptor_set = {
            let buffer = Buffer::new(
                context.clone(),
                std::mem::size_of::<CameraBlock>() as u64,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            );

            let descriptor_set = DescriptorSet::new(
                context.clone(),
                descriptor_pool,
                set_layout_cache.camera(),
                &[WriteDescriptorSet::buffer(0, &buffer)],
            );

            CameraDescriptorSet {
                buffer,
                descriptor_set,
            }
        };

        let ssao_descriptor_set = {
            let params_buffer = Buffer::new(
                context.clone(),
                std::mem::size_of::<SsaoParamsBlock>() as u64,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            );

            // Uploaded once; re-randomizing would mean regenerating and
            // re-uploading the whole block.
            let points_buffer = Buffer::new(
                context.clone(),
                std::mem::size_of::<SamplePointsBlock>() as u64,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            );
            points_buffer.copy_data(&SamplePointsBlock::from(kernel));

            let descriptor_set = DescriptorSet::new(
                context.clone(),
                descriptor_pool,
                set_layout_cache.ssao(),
                &[
                    WriteDescriptorSet::buffer(0, &params_buffer),
                    WriteDescriptorSet::buffer(1, &points_buffer),
                ],
            );

            SsaoDescriptorSet {
                params_buffer,
                points_buffer,
                descriptor_set,
            }
        };

        let geometry_pass = GeometryPass::new(
            context.clone(),
            descriptor_pool,
            set_layout_cache.camera(),
            &scene.object,
            &shader_dir,
        )?;

        let ssao_pass = SsaoPass::new(
            context.clone(),
            swapchain,
            geometry_pass.targets(),
            set_layout_cache.ssao(),
            &shader_dir,
        )?;

        Ok(MainRenderer {
            geometry_pass,
            ssao_pass,

            camera_descriptor_set,
            ssao_descriptor_set,

            shader_dir,
            context,
        })
    }

    /// Writes the per-frame uniform data: projection matrix and the
    /// occlusion parameters derived from the current toggles.
    pub fn update_uniforms(&self, camera: &Camera, params: &TuningParams, viewport_width: u32) {
        let camera_block = CameraBlock {
            proj_matrix: camera.projection_matrix(),
        };
        self.camera_descriptor_set.buffer.copy_data(&camera_block);

        let params_block = SsaoParamsBlock {
            ssao_radius: params.scaled_radius(viewport_width),
            ssao_level: params.ssao_level * params.occlusion_level(),
            object_level: params.shading_level(),
            weight_by_angle: params.weight_by_angle as u32,
            randomize_points: params.randomize_points as u32,
            point_count: params.point_count,
        };
        self.ssao_descriptor_set
            .params_buffer
            .copy_data(&params_block);
    }

    pub fn render(
        &self,
        scene: &Scene,
        params: &TuningParams,
        animation_seconds: f32,
        command_buffer: vk::CommandBuffer,
        camera: &Camera,
        swapchain: &SwapchainContainer,
        swapchain_image_index: usize,
        viewport: vk::Viewport,
    ) {
        let view = camera.view_matrix();
        let shading_level = params.shading_level();
        let angle = (animation_seconds * 5.0).to_radians();

        // Model spins in place; the floor is the unit cube flattened and
        // stretched out, spinning with it.
        let object_mv = view
            * ultraviolet::Mat4::from(Transform::spinning(
                Vec3::new(0.0, -5.0, 0.0),
                angle,
                Vec3::one(),
            ));
        let floor_mv = view
            * ultraviolet::Mat4::from(Transform::spinning(
                Vec3::new(0.0, -4.5, 0.0),
                angle,
                Vec3::new(4000.0, 0.1, 4000.0),
            ));

        let draws = [
            DrawItem {
                mesh: &scene.object,
                push_constants: DrawPushConstants {
                    mv_matrix: object_mv,
                    shading_level,
                },
            },
            DrawItem {
                mesh: &scene.floor,
                push_constants: DrawPushConstants {
                    mv_matrix: floor_mv,
                    shading_level,
                },
            },
        ];

        self.geometry_pass
            .render(command_buffer, &self.camera_descriptor_set, &draws, viewport);

        self.ssao_pass.render(
            command_buffer,
            self.geometry_pass.targets(),
            &self.ssao_descriptor_set,
            swapchain,
            swapchain_image_index,
            viewport,
        );
    }

    /// Rebuilds both pipelines from the shader binaries on disk. Any failure
    /// leaves the previous pipelines in place so the next frame still
    /// renders.
    pub fn reload_shaders(&mut self) {
        unsafe { self.context.device.device_wait_idle() }
            .expect("Could not wait for device idle");

        match self.geometry_pass.rebuild_pipeline(&self.shader_dir) {
            Ok(()) => log::info!("geometry shaders reloaded"),
            Err(err) => log::error!("geometry shader reload failed: {err:#}"),
        }
        match self.ssao_pass.rebuild_pipeline(&self.shader_dir) {
            Ok(()) => log::info!("ssao shaders reloaded"),
            Err(err) => log::error!("ssao shader reload failed: {err:#}"),
        }
    }

    pub fn resize(&mut self, swapchain: &SwapchainContainer) {
        self.ssao_pass.resize(swapchain);
    }
}

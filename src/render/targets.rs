use std::sync::Arc;

use crate::vulkan::context::Context;
use crate::vulkan::descriptor_set::{DescriptorSet, WriteDescriptorSet};
use crate::vulkan::image::Image;
use crate::vulkan::image_view::ImageView;
use crate::vulkan::sampler::Sampler;
use ash::vk::{self, ImageAspectFlags};

/// The off-screen images both passes share. Their size is fixed and
/// independent of the window: the geometry pass writes them with the
/// window-sized viewport, the occlusion pass samples them by fragment
/// coordinate.
pub struct FrameTargets {
    pub color: Arc<ImageView>,
    pub normal_depth: Arc<ImageView>,
    pub depth: Arc<ImageView>,

    pub descriptor_set: DescriptorSet,
    pub sampler: Arc<Sampler>,
    pub descriptor_set_layout: vk::DescriptorSetLayout,

    context: Arc<Context>,
}

impl Drop for FrameTargets {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device
                .destroy_descriptor_set_layout(self.descriptor_set_layout, None)
        };
    }
}

impl FrameTargets {
    pub const SIZE: u32 = 2048;

    pub const COLOR_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;
    pub const NORMAL_DEPTH_FORMAT: vk::Format = vk::Format::R32G32B32A32_SFLOAT;
    pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

    pub fn extent() -> vk::Extent2D {
        vk::Extent2D {
            width: Self::SIZE,
            height: Self::SIZE,
        }
    }

    pub fn new(context: Arc<Context>, descriptor_pool: vk::DescriptorPool) -> Self {
        let color_image = {
            let create_info = Image::attachment_create_info(
                Self::extent(),
                Self::COLOR_FORMAT,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            );
            Arc::new(Image::new(context.clone(), &create_info))
        };
        let color = Arc::new(ImageView::new_default(
            context.clone(),
            color_image,
            ImageAspectFlags::COLOR,
        ));

        let normal_depth_image = {
            let create_info = Image::attachment_create_info(
                Self::extent(),
                Self::NORMAL_DEPTH_FORMAT,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            );
            Arc::new(Image::new(context.clone(), &create_info))
        };
        let normal_depth = Arc::new(ImageView::new_default(
            context.clone(),
            normal_depth_image,
            ImageAspectFlags::COLOR,
        ));

        let depth_image = {
            let create_info = Image::attachment_create_info(
                Self::extent(),
                Self::DEPTH_FORMAT,
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            );
            Arc::new(Image::new(context.clone(), &create_info))
        };
        let depth = Arc::new(ImageView::new_default(
            context.clone(),
            depth_image,
            ImageAspectFlags::DEPTH,
        ));

        let descriptor_set_layout = {
            let bindings = [
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(0)
                    .descriptor_count(1)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                    .build(),
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(1)
                    .descriptor_count(1)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                    .build(),
            ];

            let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

            unsafe {
                context
                    .device
                    .create_descriptor_set_layout(&create_info, None)
            }
            .expect("Could not create frame targets descriptor set layout")
        };

        // Nearest/clamp sampling; the occlusion pass reads exact texels.
        let sampler = {
            let create_info = vk::SamplerCreateInfo::builder()
                .mag_filter(vk::Filter::NEAREST)
                .min_filter(vk::Filter::NEAREST)
                .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
                .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .mip_lod_bias(0.0)
                .anisotropy_enable(false)
                .compare_enable(false)
                .min_lod(0.0)
                .max_lod(vk::LOD_CLAMP_NONE);

            let sampler = unsafe { context.device.create_sampler(&create_info, None) }
                .expect("Could not create frame targets sampler");

            Arc::new(Sampler::new(sampler, context.clone()))
        };

        let descriptor_set = {
            let writes = [
                WriteDescriptorSet::image_view_sampler_with_layout(
                    0,
                    &color,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    &sampler,
                ),
                WriteDescriptorSet::image_view_sampler_with_layout(
                    1,
                    &normal_depth,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    &sampler,
                ),
            ];

            DescriptorSet::new(
                context.clone(),
                descriptor_pool,
                descriptor_set_layout,
                &writes,
            )
        };

        FrameTargets {
            color,
            normal_depth,
            depth,
            descriptor_set,
            sampler,
            descriptor_set_layout,

            context,
        }
    }

    /// Makes the color and normal+depth images readable by the occlusion
    /// pass; they are attachments and sampled textures within one frame but
    /// never both at once.
    pub fn barrier_for_sampling(&self, command_buffer: vk::CommandBuffer) {
        self.color.image.barrier_for_sampling(command_buffer);
        self.normal_depth.image.barrier_for_sampling(command_buffer);
    }
}

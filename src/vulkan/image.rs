use std::sync::Arc;

use crate::vulkan::context::Context;
use crate::vulkan::find_memorytype_index;
use ash::vk::{
    self, AccessFlags2, Extent3D, ImageCreateFlags, ImageLayout, ImageMemoryBarrier2,
    ImageSubresourceRange, ImageTiling, ImageType, PipelineStageFlags2, SampleCountFlags,
    SharingMode,
};

pub struct Image {
    pub inner: vk::Image,
    pub memory: vk::DeviceMemory,

    pub format: vk::Format,
    pub extent: vk::Extent3D,

    context: Arc<Context>,
}

impl Image {
    pub fn new(context: Arc<Context>, create_info: &vk::ImageCreateInfo) -> Image {
        let device = &context.device;

        let format = create_info.format;
        let extent = create_info.extent;

        let image =
            unsafe { device.create_image(create_info, None) }.expect("Could not create image");

        let memory_requirements = unsafe { device.get_image_memory_requirements(image) };

        let image_memorytype_index = find_memorytype_index(
            &memory_requirements,
            &context.device_memory_properties,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )
        .expect("Could not find memorytype for image");

        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(memory_requirements.size)
            .memory_type_index(image_memorytype_index);

        let memory = unsafe { device.allocate_memory(&allocate_info, None) }
            .expect("Could not allocate memory for image");

        unsafe { device.bind_image_memory(image, memory, 0) }.expect("Could not bind image memory");

        Self {
            inner: image,
            memory,
            format,
            extent,
            context,
        }
    }

    pub fn insert_image_memory_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        src_stage_mask: PipelineStageFlags2,
        dst_stage_mask: PipelineStageFlags2,
        src_access_mask: vk::AccessFlags2,
        dst_access_mask: vk::AccessFlags2,
        subresource_range: ImageSubresourceRange,
    ) {
        let barrier = vk::ImageMemoryBarrier2 {
            old_layout,
            new_layout,
            src_stage_mask,
            dst_stage_mask,
            src_access_mask,
            dst_access_mask,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image: self.inner,
            subresource_range,
            ..ImageMemoryBarrier2::default()
        };

        let dependency_info =
            vk::DependencyInfo::builder().image_memory_barriers(std::slice::from_ref(&barrier));

        unsafe {
            self.context
                .synchronisation2_loader
                .cmd_pipeline_barrier2(command_buffer, &dependency_info)
        };
    }

    pub fn full_subresource_range(
        &self,
        aspect_mask: vk::ImageAspectFlags,
    ) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    // Unused fields default to values the frame targets share.
    pub fn attachment_create_info(
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> vk::ImageCreateInfo {
        vk::ImageCreateInfo {
            flags: ImageCreateFlags::empty(),
            image_type: ImageType::TYPE_2D,
            format,
            extent: Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: SampleCountFlags::TYPE_1,
            tiling: ImageTiling::OPTIMAL,
            usage,
            sharing_mode: SharingMode::EXCLUSIVE,
            initial_layout: ImageLayout::UNDEFINED,
            ..Default::default()
        }
    }

    /// Transition + sampled-read barrier used between the two passes.
    pub fn barrier_for_sampling(&self, command_buffer: vk::CommandBuffer) {
        self.insert_image_memory_barrier(
            command_buffer,
            ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            PipelineStageFlags2::FRAGMENT_SHADER,
            AccessFlags2::COLOR_ATTACHMENT_WRITE,
            AccessFlags2::SHADER_READ,
            self.full_subresource_range(vk::ImageAspectFlags::COLOR),
        );
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_image(self.inner, None) };
        unsafe { self.context.device.free_memory(self.memory, None) };
    }
}

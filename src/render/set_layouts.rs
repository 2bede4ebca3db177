use std::sync::Arc;

use ash::vk;

use crate::vulkan::context::Context;

/// The descriptor set layouts shared between pipeline creation and
/// descriptor set allocation.
pub struct DescriptorSetLayoutCache {
    camera_descriptor_set_layout: vk::DescriptorSetLayout,
    ssao_descriptor_set_layout: vk::DescriptorSetLayout,

    context: Arc<Context>,
}

impl DescriptorSetLayoutCache {
    pub fn new(context: Arc<Context>) -> Self {
        let device = &context.device;

        let camera_descriptor_set_layout = {
            let bindings = [vk::DescriptorSetLayoutBinding::builder()
                .binding(0)
                .descriptor_count(1)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .stage_flags(vk::ShaderStageFlags::VERTEX)
                .build()];

            let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

            unsafe { device.create_descriptor_set_layout(&create_info, None) }
                .expect("Could not create camera descriptor set layout")
        };

        // binding 0: scalar parameters, binding 1: sample-points block
        let ssao_descriptor_set_layout = {
            let bindings = [
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(0)
                    .descriptor_count(1)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                    .build(),
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(1)
                    .descriptor_count(1)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                    .build(),
            ];

            let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

            unsafe { device.create_descriptor_set_layout(&create_info, None) }
                .expect("Could not create ssao descriptor set layout")
        };

        Self {
            camera_descriptor_set_layout,
            ssao_descriptor_set_layout,
            context,
        }
    }

    pub fn camera(&self) -> vk::DescriptorSetLayout {
        self.camera_descriptor_set_layout
    }

    pub fn ssao(&self) -> vk::DescriptorSetLayout {
        self.ssao_descriptor_set_layout
    }
}

impl Drop for DescriptorSetLayoutCache {
    fn drop(&mut self) {
        let device = &self.context.device;

        unsafe { device.destroy_descriptor_set_layout(self.camera_descriptor_set_layout, None) };
        unsafe { device.destroy_descriptor_set_layout(self.ssao_descriptor_set_layout, None) };
    }
}

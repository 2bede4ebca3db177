use std::path::Path;
use std::sync::Arc;

use ash::vk;

use crate::render::targets::FrameTargets;
use crate::render::SsaoDescriptorSet;
use crate::shaders;
use crate::vulkan::context::Context;
use crate::vulkan::swapchain::SwapchainContainer;

/// The full-screen occlusion pass: reads the frame targets, writes the
/// swapchain image. The quad is generated entirely in the vertex stage, so
/// the pipeline has no vertex input at all.
pub struct SsaoPass {
    render_pass: vk::RenderPass,
    pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,
    framebuffers: Vec<vk::Framebuffer>,

    targets_set_layout: vk::DescriptorSetLayout,
    ssao_set_layout: vk::DescriptorSetLayout,

    context: Arc<Context>,
}

impl SsaoPass {
    pub fn new(
        context: Arc<Context>,
        swapchain: &SwapchainContainer,
        targets: &FrameTargets,
        ssao_set_layout: vk::DescriptorSetLayout,
        shader_dir: &Path,
    ) -> anyhow::Result<Self> {
        let render_pass = create_render_pass(&context, swapchain.format);

        let (pipeline, pipeline_layout) = create_pipeline(
            context.clone(),
            render_pass,
            targets.descriptor_set_layout,
            ssao_set_layout,
            shader_dir,
        )?;

        let framebuffers = create_framebuffers(&context, swapchain, render_pass);

        Ok(SsaoPass {
            render_pass,
            pipeline,
            pipeline_layout,
            framebuffers,
            targets_set_layout: targets.descriptor_set_layout,
            ssao_set_layout,
            context,
        })
    }

    pub fn render(
        &self,
        command_buffer: vk::CommandBuffer,
        targets: &FrameTargets,
        ssao_descriptor_set: &SsaoDescriptorSet,
        swapchain: &SwapchainContainer,
        swapchain_image_index: usize,
        viewport: vk::Viewport,
    ) {
        targets.barrier_for_sampling(command_buffer);

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 0.0],
            },
        }];

        let render_pass_begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass)
            .framebuffer(self.framebuffers[swapchain_image_index])
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: swapchain.extent,
            })
            .clear_values(&clear_values);

        unsafe {
            self.context.device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_begin_info,
                vk::SubpassContents::INLINE,
            )
        };

        unsafe {
            self.context.device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline,
            )
        };

        unsafe {
            self.context
                .device
                .cmd_set_viewport(command_buffer, 0, std::slice::from_ref(&viewport))
        };

        let descriptor_sets = [
            targets.descriptor_set.inner,
            ssao_descriptor_set.descriptor_set.inner,
        ];

        unsafe {
            self.context.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                0,
                &descriptor_sets,
                &[],
            )
        };

        // 4 vertices, triangle strip, no attributes.
        unsafe { self.context.device.cmd_draw(command_buffer, 4, 1, 0, 0) };

        unsafe { self.context.device.cmd_end_render_pass(command_buffer) };
    }

    pub fn resize(&mut self, swapchain: &SwapchainContainer) {
        let device = &self.context.device;

        for &framebuffer in self.framebuffers.iter() {
            unsafe { device.destroy_framebuffer(framebuffer, None) };
        }

        self.framebuffers = create_framebuffers(&self.context, swapchain, self.render_pass);
    }

    pub fn rebuild_pipeline(&mut self, shader_dir: &Path) -> anyhow::Result<()> {
        let (pipeline, pipeline_layout) = create_pipeline(
            self.context.clone(),
            self.render_pass,
            self.targets_set_layout,
            self.ssao_set_layout,
            shader_dir,
        )?;

        let device = &self.context.device;
        unsafe { device.destroy_pipeline(self.pipeline, None) };
        unsafe { device.destroy_pipeline_layout(self.pipeline_layout, None) };

        self.pipeline = pipeline;
        self.pipeline_layout = pipeline_layout;
        Ok(())
    }
}

impl Drop for SsaoPass {
    fn drop(&mut self) {
        let device = &self.context.device;

        for &framebuffer in self.framebuffers.iter() {
            unsafe { device.destroy_framebuffer(framebuffer, None) };
        }
        unsafe { device.destroy_pipeline(self.pipeline, None) };
        unsafe { device.destroy_pipeline_layout(self.pipeline_layout, None) };

        unsafe { device.destroy_render_pass(self.render_pass, None) };
    }
}

fn create_pipeline(
    context: Arc<Context>,
    render_pass: vk::RenderPass,
    targets_set_layout: vk::DescriptorSetLayout,
    ssao_set_layout: vk::DescriptorSetLayout,
    shader_dir: &Path,
) -> anyhow::Result<(vk::Pipeline, vk::PipelineLayout)> {
    let device = &context.device;

    let (vertex_shader, fragment_shader) =
        shaders::load_program(&context, shader_dir, "ssao.vert.spv", "ssao.frag.spv")?;

    let shader_stages = [
        vertex_shader.stage_create_info(vk::ShaderStageFlags::VERTEX),
        fragment_shader.stage_create_info(vk::ShaderStageFlags::FRAGMENT),
    ];

    let vertex_input_state_create_info = vk::PipelineVertexInputStateCreateInfo::builder();

    let input_assembly_state_create_info = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_STRIP);

    let scissors = [vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: vk::Extent2D {
            // Evaluation of (offset.x + extent.width) must not cause a ***signed*** integer addition overflow
            width: i32::MAX as u32,
            height: i32::MAX as u32,
        },
    }];

    let viewport_state_create_info = vk::PipelineViewportStateCreateInfo::builder()
        .viewport_count(1)
        .scissors(&scissors);

    let rasterization_state_create_info = vk::PipelineRasterizationStateCreateInfo::builder()
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .line_width(1.0)
        .polygon_mode(vk::PolygonMode::FILL);

    let multisample_state_create_info = vk::PipelineMultisampleStateCreateInfo::builder()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let stencil_state = vk::StencilOpState {
        fail_op: vk::StencilOp::KEEP,
        pass_op: vk::StencilOp::KEEP,
        depth_fail_op: vk::StencilOp::KEEP,
        compare_op: vk::CompareOp::ALWAYS,
        compare_mask: 0,
        write_mask: 0,
        reference: 0,
    };

    // Depth testing is disabled for the screen-space pass.
    let depth_stencil_state_create_info = vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(false)
        .depth_write_enable(false)
        .depth_compare_op(vk::CompareOp::NEVER)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false)
        .front(stencil_state)
        .back(stencil_state)
        .max_depth_bounds(1.0)
        .min_depth_bounds(0.0);

    let color_blend_attachment_states = [vk::PipelineColorBlendAttachmentState {
        blend_enable: 0,
        src_color_blend_factor: vk::BlendFactor::SRC_COLOR,
        dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_DST_COLOR,
        color_blend_op: vk::BlendOp::ADD,
        src_alpha_blend_factor: vk::BlendFactor::ZERO,
        dst_alpha_blend_factor: vk::BlendFactor::ZERO,
        alpha_blend_op: vk::BlendOp::ADD,
        color_write_mask: vk::ColorComponentFlags::RGBA,
    }];

    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op(vk::LogicOp::CLEAR)
        .attachments(&color_blend_attachment_states);

    let descriptor_set_layouts = [targets_set_layout, ssao_set_layout];

    let layout_create_info =
        vk::PipelineLayoutCreateInfo::builder().set_layouts(&descriptor_set_layouts);

    let layout = unsafe { device.create_pipeline_layout(&layout_create_info, None) }
        .expect("Could not create pipeline layout");

    let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder()
        .dynamic_states(std::slice::from_ref(&vk::DynamicState::VIEWPORT));

    let create_info = vk::GraphicsPipelineCreateInfo::builder()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_state_create_info)
        .input_assembly_state(&input_assembly_state_create_info)
        .viewport_state(&viewport_state_create_info)
        .rasterization_state(&rasterization_state_create_info)
        .multisample_state(&multisample_state_create_info)
        .depth_stencil_state(&depth_stencil_state_create_info)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass);

    let pipeline = unsafe {
        device.create_graphics_pipelines(
            vk::PipelineCache::null(),
            std::slice::from_ref(&create_info),
            None,
        )
    }
    .map_err(|(_, err)| {
        unsafe { device.destroy_pipeline_layout(layout, None) };
        anyhow::anyhow!("could not create ssao pipeline: {err}")
    })?;

    Ok((pipeline[0], layout))
}

fn create_framebuffers(
    context: &Arc<Context>,
    swapchain: &SwapchainContainer,
    render_pass: vk::RenderPass,
) -> Vec<vk::Framebuffer> {
    swapchain
        .imageviews
        .iter()
        .map(|&swapchain_image| {
            let image_views = [swapchain_image];

            let create_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&image_views)
                .width(swapchain.extent.width)
                .height(swapchain.extent.height)
                .layers(1);

            unsafe { context.device.create_framebuffer(&create_info, None) }
                .expect("Could not create framebuffer")
        })
        .collect::<Vec<_>>()
}

fn create_render_pass(context: &Arc<Context>, swapchain_format: vk::Format) -> vk::RenderPass {
    let color_attachment = vk::AttachmentDescription {
        flags: vk::AttachmentDescriptionFlags::empty(),
        format: swapchain_format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
    };

    let color_attachment_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };

    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(std::slice::from_ref(&color_attachment_ref));

    let dependencies = [vk::SubpassDependency {
        src_subpass: vk::SUBPASS_EXTERNAL,
        src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_READ
            | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ..Default::default()
    }];

    let attachments = [color_attachment];

    let create_info = vk::RenderPassCreateInfo::builder()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(&dependencies);

    unsafe { context.device.create_render_pass(&create_info, None) }
        .expect("Could not create render pass")
}

use std::path::Path;
use std::sync::Arc;

use ash::vk;

use crate::mesh::MeshAsset;
use crate::render::shader_types::DrawPushConstants;
use crate::render::targets::FrameTargets;
use crate::render::CameraDescriptorSet;
use crate::shaders;
use crate::vulkan::context::Context;

/// One object drawn this frame.
pub struct DrawItem<'a> {
    pub mesh: &'a MeshAsset,
    pub push_constants: DrawPushConstants,
}

/// Renders the scene into the off-screen frame targets.
pub struct GeometryPass {
    render_pass: vk::RenderPass,
    pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,
    framebuffer: vk::Framebuffer,

    targets: FrameTargets,
    camera_set_layout: vk::DescriptorSetLayout,

    // Kept for pipeline rebuilds on shader reload.
    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,

    context: Arc<Context>,
}

impl GeometryPass {
    pub fn new(
        context: Arc<Context>,
        descriptor_pool: vk::DescriptorPool,
        camera_set_layout: vk::DescriptorSetLayout,
        mesh: &MeshAsset,
        shader_dir: &Path,
    ) -> anyhow::Result<Self> {
        let render_pass = create_render_pass(&context.device);

        let vertex_bindings = mesh.vertex_bindings().to_vec();
        let vertex_attributes = mesh.vertex_attributes().to_vec();

        let (pipeline, pipeline_layout) = create_pipeline(
            context.clone(),
            render_pass,
            camera_set_layout,
            &vertex_bindings,
            &vertex_attributes,
            shader_dir,
        )?;

        let targets = FrameTargets::new(context.clone(), descriptor_pool);

        let framebuffer = create_framebuffer(&context, &targets, render_pass);

        Ok(GeometryPass {
            render_pass,
            pipeline,
            pipeline_layout,
            framebuffer,
            targets,
            camera_set_layout,
            vertex_bindings,
            vertex_attributes,
            context,
        })
    }

    pub fn render(
        &self,
        command_buffer: vk::CommandBuffer,
        camera_descriptor_set: &CameraDescriptorSet,
        draws: &[DrawItem],
        viewport: vk::Viewport,
    ) {
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 0.0],
                },
            },
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 0.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        let render_pass_begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass)
            .framebuffer(self.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: FrameTargets::extent(),
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

        unsafe {
            self.context.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                0,
                std::slice::from_ref(&camera_descriptor_set.descriptor_set.inner),
                &[],
            )
        };

        for draw in draws {
            unsafe {
                self.context.device.cmd_push_constants(
                    command_buffer,
                    self.pipeline_layout,
                    vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                    0,
                    bytemuck::bytes_of(&draw.push_constants),
                );
            }
            draw.mesh.record_draw(command_buffer);
        }

        unsafe { self.context.device.cmd_end_render_pass(command_buffer) };
    }

    /// Builds fresh pipelines from the shader binaries on disk. The old
    /// pipeline is destroyed only after the new one exists, so a failed
    /// reload leaves the pass fully usable.
    pub fn rebuild_pipeline(&mut self, shader_dir: &Path) -> anyhow::Result<()> {
        let (pipeline, pipeline_layout) = create_pipeline(
            self.context.clone(),
            self.render_pass,
            self.camera_set_layout,
            &self.vertex_bindings,
            &self.vertex_attributes,
            shader_dir,
        )?;

        let device = &self.context.device;
        unsafe { device.destroy_pipeline(self.pipeline, None) };
        unsafe { device.destroy_pipeline_layout(self.pipeline_layout, None) };

        self.pipeline = pipeline;
        self.pipeline_layout = pipeline_layout;
        Ok(())
    }

    pub fn targets(&self) -> &FrameTargets {
        &self.targets
    }
}

impl Drop for GeometryPass {
    fn drop(&mut self) {
        let device = &self.context.device;

        unsafe { device.destroy_framebuffer(self.framebuffer, None) };
        unsafe { device.destroy_pipeline(self.pipeline, None) };
        unsafe { device.destroy_pipeline_layout(self.pipeline_layout, None) };

        unsafe { device.destroy_render_pass(self.render_pass, None) };
    }
}

fn create_framebuffer(
    context: &Arc<Context>,
    targets: &FrameTargets,
    render_pass: vk::RenderPass,
) -> vk::Framebuffer {
    let image_views = [
        targets.color.inner,
        targets.normal_depth.inner,
        targets.depth.inner,
    ];

    let create_info = vk::FramebufferCreateInfo::builder()
        .render_pass(render_pass)
        .attachments(&image_views)
        .width(FrameTargets::SIZE)
        .height(FrameTargets::SIZE)
        .layers(1);

    unsafe { context.device.create_framebuffer(&create_info, None) }
        .expect("Could not create geometry framebuffer")
}

fn create_pipeline(
    context: Arc<Context>,
    render_pass: vk::RenderPass,
    camera_set_layout: vk::DescriptorSetLayout,
    vertex_bindings: &[vk::VertexInputBindingDescription],
    vertex_attributes: &[vk::VertexInputAttributeDescription],
    shader_dir: &Path,
) -> anyhow::Result<(vk::Pipeline, vk::PipelineLayout)> {
    let device = &context.device;

    let (vertex_shader, fragment_shader) =
        shaders::load_program(&context, shader_dir, "render.vert.spv", "render.frag.spv")?;

    let shader_stages = [
        vertex_shader.stage_create_info(vk::ShaderStageFlags::VERTEX),
        fragment_shader.stage_create_info(vk::ShaderStageFlags::FRAGMENT),
    ];

    let vertex_input_state_create_info = vk::PipelineVertexInputStateCreateInfo::builder()
        .vertex_binding_descriptions(vertex_bindings)
        .vertex_attribute_descriptions(vertex_attributes);

    let input_assembly_state_create_info = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

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
        .cull_mode(vk::CullModeFlags::BACK)
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

    let depth_stencil_state_create_info = vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL)
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
    }; 2];

    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op(vk::LogicOp::CLEAR)
        .attachments(&color_blend_attachment_states);

    let push_constants_range = vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        offset: 0,
        size: std::mem::size_of::<DrawPushConstants>() as u32,
    };

    let layout_create_info = vk::PipelineLayoutCreateInfo::builder()
        .set_layouts(std::slice::from_ref(&camera_set_layout))
        .push_constant_ranges(std::slice::from_ref(&push_constants_range));

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
        anyhow::anyhow!("could not create geometry pipeline: {err}")
    })?;

    Ok((pipeline[0], layout))
}

fn create_render_pass(device: &ash::Device) -> vk::RenderPass {
    let color_attachment = vk::AttachmentDescription {
        flags: vk::AttachmentDescriptionFlags::empty(),
        format: FrameTargets::COLOR_FORMAT,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };

    let normal_depth_attachment = vk::AttachmentDescription {
        flags: vk::AttachmentDescriptionFlags::empty(),
        format: FrameTargets::NORMAL_DEPTH_FORMAT,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };

    let depth_attachment = vk::AttachmentDescription {
        flags: vk::AttachmentDescriptionFlags::empty(),
        format: FrameTargets::DEPTH_FORMAT,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::DONT_CARE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };

    let color_attachment_refs = [
        vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        },
        vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        },
    ];

    let depth_attachment_ref = vk::AttachmentReference {
        attachment: 2,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };

    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_attachment_refs)
        .depth_stencil_attachment(&depth_attachment_ref);

    let attachments = [color_attachment, normal_depth_attachment, depth_attachment];

    let dependencies = [vk::SubpassDependency {
        src_subpass: vk::SUBPASS_EXTERNAL,
        src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_READ
            | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ..Default::default()
    }];

    let create_info = vk::RenderPassCreateInfo::builder()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(&dependencies);

    unsafe { device.create_render_pass(&create_info, None) }.expect("Could not create render pass")
}

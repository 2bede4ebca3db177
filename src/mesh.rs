//! GPU mesh assets built from the chunked binary format.
//!
//! One buffer holds vertex bytes with the index region packed behind them;
//! each declared attribute becomes its own vertex input binding addressing
//! that buffer at the attribute's byte offset.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use ash::vk;

use crate::mesh_file::{AttributeDecl, ComponentType, IndexType, MeshFile, SubObject};
use crate::vulkan::buffer::Buffer;
use crate::vulkan::command_pool::CommandPool;
use crate::vulkan::context::Context;

struct MeshIndices {
    ty: vk::IndexType,
    byte_offset: vk::DeviceSize,
}

pub struct MeshAsset {
    buffer: Buffer<u8>,

    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    /// Byte offset into `buffer` for each vertex input binding.
    attribute_offsets: Vec<vk::DeviceSize>,

    indices: Option<MeshIndices>,
    sub_objects: Vec<SubObject>,

    context: Arc<Context>,
}

impl MeshAsset {
    /// Reads, parses and uploads a mesh. The returned asset fully owns its
    /// GPU buffer; reloading a path means building a new asset and dropping
    /// the old one.
    pub fn load(
        context: Arc<Context>,
        command_pool: &CommandPool,
        path: &Path,
    ) -> anyhow::Result<MeshAsset> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("could not open mesh file {}", path.display()))?;
        let file = MeshFile::parse(&bytes)
            .with_context(|| format!("could not parse mesh file {}", path.display()))?;
        anyhow::ensure!(
            !file.attributes.is_empty(),
            "mesh file {} declares no vertex attributes",
            path.display()
        );

        log::info!(
            "loaded {}: {} vertices, {} attributes, {} sub-objects, {} byte buffer",
            path.display(),
            file.total_vertices,
            file.attributes.len(),
            file.sub_objects.len(),
            file.buffer.len(),
        );

        Self::upload(context, command_pool, &file)
    }

    fn upload(
        context: Arc<Context>,
        command_pool: &CommandPool,
        file: &MeshFile,
    ) -> anyhow::Result<MeshAsset> {
        let device = &context.device;

        let staging = Buffer::<u8>::new(
            context.clone(),
            file.buffer.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        );
        staging.copy_data(&file.buffer);

        let buffer = Buffer::<u8>::new(
            context.clone(),
            file.buffer.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_DST
                | vk::BufferUsageFlags::VERTEX_BUFFER
                | vk::BufferUsageFlags::INDEX_BUFFER,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        );

        // One-shot upload; the staging buffer stays alive until the queue
        // has drained.
        let command_buffer = {
            let allocate_info = vk::CommandBufferAllocateInfo::builder()
                .command_buffer_count(1)
                .command_pool(**command_pool)
                .level(vk::CommandBufferLevel::PRIMARY);

            unsafe { device.allocate_command_buffers(&allocate_info) }
                .context("could not allocate upload command buffer")?[0]
        };

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
            .context("could not begin upload command buffer")?;

        buffer.record_copy_from(command_buffer, &staging, file.buffer.len() as vk::DeviceSize);

        unsafe { device.end_command_buffer(command_buffer) }
            .context("could not end upload command buffer")?;

        let submit_info = vk::SubmitInfo::builder()
            .command_buffers(std::slice::from_ref(&command_buffer))
            .build();
        unsafe { device.queue_submit(context.queue, &[submit_info], vk::Fence::null()) }
            .context("could not submit mesh upload")?;
        unsafe { device.device_wait_idle() }.context("could not wait for mesh upload")?;
        unsafe { device.free_command_buffers(**command_pool, &[command_buffer]) };

        let mut vertex_bindings = Vec::with_capacity(file.attributes.len());
        let mut vertex_attributes = Vec::with_capacity(file.attributes.len());
        let mut attribute_offsets = Vec::with_capacity(file.attributes.len());
        for (slot, attribute) in file.attributes.iter().enumerate() {
            vertex_bindings.push(vk::VertexInputBindingDescription {
                binding: slot as u32,
                stride: attribute.effective_stride(),
                input_rate: vk::VertexInputRate::VERTEX,
            });
            vertex_attributes.push(vk::VertexInputAttributeDescription {
                location: slot as u32,
                binding: slot as u32,
                format: attribute_format(attribute)?,
                offset: 0,
            });
            attribute_offsets.push(attribute.data_offset as vk::DeviceSize);
        }

        let indices = file.index.map(|info| MeshIndices {
            ty: match info.ty {
                IndexType::U16 => vk::IndexType::UINT16,
                IndexType::U8 => vk::IndexType::UINT8_EXT,
            },
            byte_offset: info.byte_offset as vk::DeviceSize,
        });

        Ok(MeshAsset {
            buffer,
            vertex_bindings,
            vertex_attributes,
            attribute_offsets,
            indices,
            sub_objects: file.sub_objects.clone(),
            context,
        })
    }

    pub fn vertex_bindings(&self) -> &[vk::VertexInputBindingDescription] {
        &self.vertex_bindings
    }

    pub fn vertex_attributes(&self) -> &[vk::VertexInputAttributeDescription] {
        &self.vertex_attributes
    }

    /// Draws sub-object 0.
    pub fn record_draw(&self, command_buffer: vk::CommandBuffer) {
        self.record_draw_sub_object(command_buffer, 0, 1, 0);
    }

    /// Binds this asset's buffers (nothing is restored afterwards) and
    /// issues one instanced triangle draw over the named range.
    pub fn record_draw_sub_object(
        &self,
        command_buffer: vk::CommandBuffer,
        sub_object_index: usize,
        instance_count: u32,
        base_instance: u32,
    ) {
        let Some(sub_object) = self.sub_objects.get(sub_object_index) else {
            log::warn!("sub-object {sub_object_index} out of range, skipping draw");
            return;
        };

        let device = &self.context.device;

        let buffers = vec![self.buffer.inner; self.attribute_offsets.len()];
        unsafe {
            device.cmd_bind_vertex_buffers(command_buffer, 0, &buffers, &self.attribute_offsets)
        };

        match &self.indices {
            Some(indices) => {
                unsafe {
                    device.cmd_bind_index_buffer(
                        command_buffer,
                        self.buffer.inner,
                        indices.byte_offset,
                        indices.ty,
                    )
                };
                unsafe {
                    device.cmd_draw_indexed(
                        command_buffer,
                        sub_object.count,
                        instance_count,
                        sub_object.first,
                        0,
                        base_instance,
                    )
                };
            }
            None => unsafe {
                device.cmd_draw(
                    command_buffer,
                    sub_object.count,
                    instance_count,
                    sub_object.first,
                    base_instance,
                )
            },
        }
    }
}

fn attribute_format(attribute: &AttributeDecl) -> anyhow::Result<vk::Format> {
    let format = match (
        attribute.component_type,
        attribute.component_count,
        attribute.normalized,
    ) {
        (ComponentType::F32, 1, _) => vk::Format::R32_SFLOAT,
        (ComponentType::F32, 2, _) => vk::Format::R32G32_SFLOAT,
        (ComponentType::F32, 3, _) => vk::Format::R32G32B32_SFLOAT,
        (ComponentType::F32, 4, _) => vk::Format::R32G32B32A32_SFLOAT,
        (ComponentType::U8, 4, true) => vk::Format::R8G8B8A8_UNORM,
        (ComponentType::U8, 4, false) => vk::Format::R8G8B8A8_UINT,
        (ComponentType::U16, 2, true) => vk::Format::R16G16_UNORM,
        (ComponentType::U16, 4, true) => vk::Format::R16G16B16A16_UNORM,
        (ty, count, normalized) => anyhow::bail!(
            "unsupported vertex attribute layout: {ty:?} x{count} (normalized: {normalized})"
        ),
    };
    Ok(format)
}

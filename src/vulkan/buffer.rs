use std::sync::Arc;
use std::{marker::PhantomData, ops::Deref};

use ash::vk;

use crate::vulkan::context::Context;
use crate::vulkan::find_memorytype_index;

pub trait IntoSlice<T> {
    fn as_sliced(&self) -> &[T];
}

impl<T> IntoSlice<T> for T {
    fn as_sliced(&self) -> &[T] {
        std::slice::from_ref(self)
    }
}

impl<T> IntoSlice<T> for [T] {
    fn as_sliced(&self) -> &[T] {
        self
    }
}

impl<T> IntoSlice<T> for Vec<T> {
    fn as_sliced(&self) -> &[T] {
        self
    }
}

/// A typed GPU buffer owning its memory. Each buffer has exactly one owner
/// and is released on drop.
pub struct Buffer<T> {
    pub inner: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    context: Arc<Context>,
    _marker: PhantomData<T>,
}

impl<T> Buffer<T> {
    pub fn new(
        context: Arc<Context>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory_property_flags: vk::MemoryPropertyFlags,
    ) -> Buffer<T> {
        let device = &context.device;

        let create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer =
            unsafe { device.create_buffer(&create_info, None) }.expect("Could not create buffer");

        let buffer_memory_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let buffer_memorytype_index = find_memorytype_index(
            &buffer_memory_requirements,
            &context.device_memory_properties,
            memory_property_flags,
        )
        .expect("Could not find memorytype for buffer");

        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(buffer_memory_requirements.size)
            .memory_type_index(buffer_memorytype_index);

        let memory = unsafe { device.allocate_memory(&allocate_info, None) }
            .expect("Could not allocate memory for buffer");

        unsafe { device.bind_buffer_memory(buffer, memory, 0) }
            .expect("Could not bind buffer memory for buffer");

        Buffer {
            inner: buffer,
            memory,
            size: buffer_memory_requirements.size,
            context,
            _marker: PhantomData,
        }
    }

    /// Host-visible buffers only.
    pub fn copy_data<U: IntoSlice<T> + ?Sized>(&self, data: &U) {
        let data = data.as_sliced();
        let device = &self.context.device;

        let buffer_ptr = unsafe {
            device.map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
        }
        .expect("Could not map memory") as *mut T;

        unsafe { buffer_ptr.copy_from_nonoverlapping(data.as_ptr(), data.len()) };

        unsafe { device.unmap_memory(self.memory) };
    }

    /// Records a full copy out of `src`; the caller owns submission and
    /// keeps `src` alive until the copy has executed.
    pub fn record_copy_from(
        &self,
        command_buffer: vk::CommandBuffer,
        src: &Buffer<T>,
        size: vk::DeviceSize,
    ) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            self.context.device.cmd_copy_buffer(
                command_buffer,
                src.inner,
                self.inner,
                std::slice::from_ref(&region),
            )
        };
    }
}

impl<T> Drop for Buffer<T> {
    fn drop(&mut self) {
        let device = &self.context.device;
        unsafe { device.destroy_buffer(self.inner, None) };
        unsafe { device.free_memory(self.memory, None) };
    }
}

impl<T> Deref for Buffer<T> {
    type Target = vk::Buffer;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

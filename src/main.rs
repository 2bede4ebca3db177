mod camera;
mod config;
mod kernel;
mod mesh;
mod mesh_file;
mod params;
mod render;
mod scene;
mod shaders;
mod time;
mod transform;
mod vulkan;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use ash::vk;
use winit::dpi::{self, PhysicalSize};
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use camera::Camera;
use config::ConfigFileLoader;
use kernel::SampleKernel;
use mesh::MeshAsset;
use params::{KeyAction, TuningParams};
use render::{set_layouts::DescriptorSetLayoutCache, MainRenderer};
use scene::Scene;
use time::Time;
use vulkan::command_pool::CommandPool;
use vulkan::context::Context;
use vulkan::swapchain::SwapchainContainer;

// Fields drop top to bottom; everything holding GPU resources goes before
// the context.
struct SsaoDemo {
    renderer: MainRenderer,
    scene: Scene,

    params: TuningParams,
    camera: Camera,
    time: Time,

    descriptor_set_pool: vk::DescriptorPool,
    _set_layout_cache: DescriptorSetLayoutCache,
    command_pool: CommandPool,

    command_buffers: Vec<vk::CommandBuffer>,
    should_recreate_swapchain: bool,

    /// wait semaphore
    present_complete_semaphore: vk::Semaphore,
    /// signal semaphore
    rendering_complete_semaphore: vk::Semaphore,
    draw_fence: vk::Fence,

    swapchain: SwapchainContainer,
    context: Arc<Context>,

    window: Window,
}

impl SsaoDemo {
    pub fn new(event_loop: &EventLoop<()>) -> anyhow::Result<Self> {
        let config = ConfigFileLoader::new("ssao-demo.json").load_config();

        let window = WindowBuilder::new()
            .with_title("SSAO")
            .with_inner_size(dpi::LogicalSize {
                width: config.window_width,
                height: config.window_height,
            })
            .build(event_loop)
            .context("could not create window")?;

        let context = Arc::new(Context::new(event_loop, &window));

        let swapchain = SwapchainContainer::new(
            context.clone(),
            window.inner_size(),
            config.present_mode.into(),
        );

        let device = &context.device;

        let command_pool = CommandPool::new(context.clone());

        let descriptor_pool = {
            let pool_sizes = [
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: 16,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: 16,
                },
            ];

            let create_info = vk::DescriptorPoolCreateInfo::builder()
                .max_sets(16)
                .pool_sizes(&pool_sizes);

            unsafe { device.create_descriptor_pool(&create_info, None) }
                .expect("Could not create descriptor pool")
        };

        let command_buffers = {
            let allocate_info = vk::CommandBufferAllocateInfo::builder()
                .command_buffer_count(swapchain.images.len() as u32)
                .command_pool(*command_pool)
                .level(vk::CommandBufferLevel::PRIMARY);

            unsafe { device.allocate_command_buffers(&allocate_info) }
                .expect("Could not allocate command buffers")
        };

        let set_layout_cache = DescriptorSetLayoutCache::new(context.clone());

        let scene = Scene {
            object: MeshAsset::load(
                context.clone(),
                &command_pool,
                config.object_path.as_ref(),
            )?,
            floor: MeshAsset::load(context.clone(), &command_pool, config.floor_path.as_ref())?,
        };

        let kernel = SampleKernel::generate(config.kernel_seed);
        log::info!(
            "generated sample kernel: {} points, seed {:#010x}",
            kernel::KERNEL_SIZE,
            config.kernel_seed
        );

        let shader_dir = config
            .shader_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(shaders::default_shader_dir);

        let renderer = MainRenderer::new(
            context.clone(),
            descriptor_pool,
            &set_layout_cache,
            &swapchain,
            &scene,
            &kernel,
            shader_dir,
        )?;

        let fence = {
            let create_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

            unsafe { device.create_fence(&create_info, None) }.expect("Could not create fence")
        };

        let (present_complete_semaphore, rendering_complete_semaphore) = {
            let create_info = vk::SemaphoreCreateInfo::builder();

            let present_complete_semaphore = unsafe { device.create_semaphore(&create_info, None) }
                .expect("Could not create present semaphore");

            let rendering_complete_semaphore =
                unsafe { device.create_semaphore(&create_info, None) }
                    .expect("Could not create rendering complete semaphore");

            (present_complete_semaphore, rendering_complete_semaphore)
        };

        let window_size = window.inner_size();
        let camera = Camera::new(window_size.width as f32 / window_size.height as f32);

        Ok(Self {
            renderer,
            scene,

            params: TuningParams::default(),
            camera,
            time: Time::new(),

            descriptor_set_pool: descriptor_pool,
            _set_layout_cache: set_layout_cache,
            command_pool,

            command_buffers,
            should_recreate_swapchain: false,

            present_complete_semaphore,
            rendering_complete_semaphore,
            draw_fence: fence,

            swapchain,
            context,

            window,
        })
    }

    pub fn main_loop(mut self, event_loop: EventLoop<()>) {
        event_loop.run(move |event, _, control_flow| {
            control_flow.set_poll();

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(PhysicalSize { width, height }) => {
                        if width > 0 && height > 0 {
                            self.camera.update_aspect_ratio(width as f32 / height as f32);
                        }
                        self.should_recreate_swapchain = true;
                    }
                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                virtual_keycode: Some(keycode),
                                state: ElementState::Pressed,
                                ..
                            },
                        ..
                    } => match keycode {
                        VirtualKeyCode::Escape => control_flow.set_exit(),
                        keycode => match self.params.handle_key(keycode) {
                            KeyAction::TogglePause => self.time.toggle_pause(),
                            KeyAction::ReloadShaders => self.renderer.reload_shaders(),
                            KeyAction::None => {}
                        },
                    },
                    _ => {}
                },
                Event::MainEventsCleared => {
                    self.window.request_redraw();
                }
                Event::RedrawRequested(_window_id) => {
                    self.time.update();
                    self.draw_frame();
                }
                _ => (),
            }
        });
    }

    fn draw_frame(&mut self) {
        let window_size = self.window.inner_size();
        if window_size.width == 0 || window_size.height == 0 {
            return;
        }

        unsafe {
            self.context.device.wait_for_fences(
                std::slice::from_ref(&self.draw_fence),
                true,
                u64::MAX,
            )
        }
        .expect("Could not wait for fences");
        unsafe {
            self.context
                .device
                .reset_fences(std::slice::from_ref(&self.draw_fence))
        }
        .expect("Could not reset fences");

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: window_size.width as f32,
            height: window_size.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        if self.should_recreate_swapchain {
            self.swapchain.recreate(window_size);
            self.renderer.resize(&self.swapchain);
            self.should_recreate_swapchain = false;
        }

        let acquire_result = unsafe {
            self.swapchain.loader.acquire_next_image(
                self.swapchain.inner,
                u64::MAX,
                self.present_complete_semaphore,
                vk::Fence::null(),
            )
        };

        let present_index = match acquire_result {
            Ok((index, suboptimal)) => {
                if suboptimal {
                    self.should_recreate_swapchain = true;
                }
                index
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.should_recreate_swapchain = true;
                return;
            }
            Err(err) => panic!("Could not acquire next image: {err}"),
        };

        self.renderer
            .update_uniforms(&self.camera, &self.params, window_size.width);

        let command_buffer = self.command_buffers[present_index as usize];
        unsafe {
            self.context
                .device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
        }
        .expect("Could not reset command buffer");

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.context
                .device
                .begin_command_buffer(command_buffer, &begin_info)
        }
        .expect("Could not begin command buffer");

        self.renderer.render(
            &self.scene,
            &self.params,
            self.time.total_seconds(),
            command_buffer,
            &self.camera,
            &self.swapchain,
            present_index as usize,
            viewport,
        );

        unsafe { self.context.device.end_command_buffer(command_buffer) }
            .expect("Could not end command buffer");

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(std::slice::from_ref(&self.present_complete_semaphore))
            .wait_dst_stage_mask(std::slice::from_ref(
                &vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            ))
            .command_buffers(std::slice::from_ref(&command_buffer))
            .signal_semaphores(std::slice::from_ref(&self.rendering_complete_semaphore))
            .build();

        unsafe {
            self.context.device.queue_submit(
                self.context.queue,
                std::slice::from_ref(&submit_info),
                self.draw_fence,
            )
        }
        .expect("Could not submit to queue");

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(std::slice::from_ref(&self.rendering_complete_semaphore))
            .swapchains(std::slice::from_ref(&self.swapchain.inner))
            .image_indices(std::slice::from_ref(&present_index));

        let result = unsafe {
            self.swapchain
                .loader
                .queue_present(self.context.queue, &present_info)
        };
        match result {
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.should_recreate_swapchain = true;
            }
            Ok(false) => {}
            Err(err) => panic!("Could not present queue: {err}"),
        };
    }
}

impl Drop for SsaoDemo {
    fn drop(&mut self) {
        let device = &self.context.device;

        unsafe { device.device_wait_idle() }.expect("Could not wait for device idle");

        unsafe { device.destroy_semaphore(self.present_complete_semaphore, None) };
        unsafe { device.destroy_semaphore(self.rendering_complete_semaphore, None) };
        unsafe { device.destroy_fence(self.draw_fence, None) };

        unsafe { device.free_command_buffers(*self.command_pool, &self.command_buffers) };
        unsafe { device.destroy_descriptor_pool(self.descriptor_set_pool, None) };
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new();

    match SsaoDemo::new(&event_loop) {
        Ok(demo) => demo.main_loop(event_loop),
        Err(err) => log::error!("startup failed: {err:#}"),
    }
}

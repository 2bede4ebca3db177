//! Runtime SPIR-V loading.
//!
//! Shader binaries are read from disk every time a pipeline is (re)built so
//! the reload key picks up recompiled files. Failures carry the diagnostic
//! up to the caller, which keeps the previous pipeline alive instead of
//! rendering with an invalid one.

use std::ffi::CStr;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use ash::vk;

use crate::vulkan::context::Context;

pub const SHADER_ENTRY_NAME: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Where compiled shaders live unless the config overrides it: the build
/// script drops them into the build output directory.
pub fn default_shader_dir() -> PathBuf {
    PathBuf::from(env!("OUT_DIR"))
}

pub struct ShaderModule {
    pub inner: vk::ShaderModule,
    context: Arc<Context>,
}

impl ShaderModule {
    pub fn load(context: Arc<Context>, path: &Path) -> anyhow::Result<ShaderModule> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("could not read shader {}", path.display()))?;

        let code = ash::util::read_spv(&mut Cursor::new(&bytes))
            .with_context(|| format!("{} is not valid SPIR-V", path.display()))?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe { context.device.create_shader_module(&create_info, None) }
            .with_context(|| format!("could not create shader module from {}", path.display()))?;

        Ok(ShaderModule {
            inner: module,
            context,
        })
    }

    pub fn stage_create_info(
        &self,
        stage: vk::ShaderStageFlags,
    ) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .module(self.inner)
            .name(SHADER_ENTRY_NAME)
            .stage(stage)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device
                .destroy_shader_module(self.inner, None);
        }
    }
}

/// Loads the vertex + fragment pair for one program.
pub fn load_program(
    context: &Arc<Context>,
    shader_dir: &Path,
    vert_name: &str,
    frag_name: &str,
) -> anyhow::Result<(ShaderModule, ShaderModule)> {
    let vert = ShaderModule::load(context.clone(), &shader_dir.join(vert_name))?;
    let frag = ShaderModule::load(context.clone(), &shader_dir.join(frag_name))?;
    Ok((vert, frag))
}

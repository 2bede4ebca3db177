use std::path::PathBuf;
use std::process::Command;
use std::{env, fs};

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();

    let input_path = PathBuf::from("assets/shaders/");
    let paths = fs::read_dir(&input_path).unwrap();
    println!("cargo:rerun-if-changed={}", input_path.to_string_lossy());

    compile_shaders(paths, out_dir);
}

fn compile_shaders(paths: fs::ReadDir, out_dir: String) {
    for entry in paths {
        let entry = match entry {
            Ok(path) => path,
            Err(_) => continue,
        };
        let shader_file_name = entry.file_name();
        let shader_path = entry.path();
        if !shader_path.is_file() {
            continue;
        }

        let mut output_file_name = shader_file_name.clone();
        output_file_name.push(".spv");
        let mut output_path = PathBuf::from(&out_dir);
        output_path.push(&output_file_name);

        let shader_file_name = shader_file_name.to_string_lossy();
        let shader_compile_result = match Command::new("glslc")
            .arg(&shader_path)
            .arg("-o")
            .arg(&output_path)
            .status()
        {
            Ok(status) => status,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                println!(
                    "cargo:warning=glslc not found; skipping shader compilation for {}",
                    shader_file_name
                );
                continue;
            }
            Err(e) => panic!("failed to invoke glslc for {}: {}", shader_file_name, e),
        };

        if !shader_compile_result.success() {
            panic!(
                "Shader compilation for {} failed: {}",
                shader_file_name, shader_compile_result
            );
        }
    }
}

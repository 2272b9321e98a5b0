use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
    ShaderType,
};

use super::context::{GpuError, PipelineKind};

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Consuming shaders
/// use `#import molscope::module_name` to pull in shared code. The composer
/// produces `naga::Module` IR directly, skipping WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: (source, file_path)
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Shared modules in dependency order.
const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/camera.wgsl"),
        file_path: "modules/camera.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/lighting.wgsl"),
        file_path: "modules/lighting.wgsl",
    },
];

/// WGSL source and file path of the shader behind a pipeline.
pub fn pipeline_source(kind: PipelineKind) -> (&'static str, &'static str) {
    match kind {
        PipelineKind::AtomSpheres => (
            include_str!("../../assets/shaders/raster/sphere.wgsl"),
            "raster/sphere.wgsl",
        ),
        PipelineKind::BondCylinders => (
            include_str!("../../assets/shaders/raster/bond.wgsl"),
            "raster/bond.wgsl",
        ),
    }
}

impl ShaderComposer {
    /// Composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// [`GpuError::Shader`] if a shared module fails to parse.
    pub fn new() -> Result<Self, GpuError> {
        let mut composer = Composer::default();

        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    GpuError::Shader(format!(
                        "failed to register shader module '{}': {e}",
                        m.file_path
                    ))
                })?;
        }

        Ok(Self { composer })
    }

    /// Compose the shader for `kind` into a `wgpu::ShaderModule` ready for
    /// pipeline creation.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        kind: PipelineKind,
    ) -> Result<wgpu::ShaderModule, GpuError> {
        let (source, file_path) = pipeline_source(kind);
        let naga_module = self.compose_naga(source, file_path)?;

        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(file_path),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu
    /// shader module. Useful for testing shader composition without a GPU
    /// device.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, GpuError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| {
                GpuError::Shader(format!("failed to compose '{file_path}': {e}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_shaders_compose() {
        let mut composer = ShaderComposer::new().unwrap();
        for kind in [PipelineKind::AtomSpheres, PipelineKind::BondCylinders] {
            let (source, file_path) = pipeline_source(kind);
            let module = composer
                .compose_naga(source, file_path)
                .unwrap_or_else(|e| panic!("{file_path} failed to compose: {e}"));
            let entry_points: Vec<_> =
                module.entry_points.iter().map(|e| e.name.as_str()).collect();
            assert!(entry_points.contains(&"vs_main"), "{file_path}");
            assert!(entry_points.contains(&"fs_main"), "{file_path}");
        }
    }

    #[test]
    fn composed_shaders_validate() {
        let mut composer = ShaderComposer::new().unwrap();
        for kind in [PipelineKind::AtomSpheres, PipelineKind::BondCylinders] {
            let (source, file_path) = pipeline_source(kind);
            let module = composer.compose_naga(source, file_path).unwrap();
            let mut validator = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::default(),
            );
            let _ = validator
                .validate(&module)
                .unwrap_or_else(|e| panic!("{file_path} failed validation: {e:?}"));
        }
    }

    #[test]
    fn broken_source_is_a_shader_error() {
        let mut composer = ShaderComposer::new().unwrap();
        let err = composer
            .compose_naga("fn broken( {", "broken.wgsl")
            .unwrap_err();
        assert!(matches!(err, GpuError::Shader(_)));
    }
}

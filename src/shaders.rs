//! Shader compilation through [`glow`], with `#include` resolution.
//!
//! Sources are flattened on the CPU with an [`IncludeResolver`] before being
//! handed to `glShaderSource`, so shaders written against
//! `GL_ARB_shading_language_include` compile on drivers without the
//! extension.

use glow::HasContext;

use crate::error::ShaderError;
use crate::include::{IncludeResolver, ResolveOptions};
use crate::named_strings::NamedStringSource;

/// A programmable pipeline stage.
///
/// | Variant          | GL enum                      | Minimum GL |
/// |------------------|------------------------------|------------|
/// | `Vertex`         | `GL_VERTEX_SHADER`           | 2.0        |
/// | `Fragment`       | `GL_FRAGMENT_SHADER`         | 2.0        |
/// | `Geometry`       | `GL_GEOMETRY_SHADER`         | 3.2        |
/// | `TessControl`    | `GL_TESS_CONTROL_SHADER`     | 4.0        |
/// | `TessEvaluation` | `GL_TESS_EVALUATION_SHADER`  | 4.0        |
/// | `Compute`        | `GL_COMPUTE_SHADER`          | 4.3        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
    /// Geometry shader.
    Geometry,
    /// Tessellation control shader.
    TessControl,
    /// Tessellation evaluation shader.
    TessEvaluation,
    /// Compute shader.
    Compute,
}

impl ShaderStage {
    /// The GL enum passed to `glCreateShader`.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
            Self::Geometry => glow::GEOMETRY_SHADER,
            Self::TessControl => glow::TESS_CONTROL_SHADER,
            Self::TessEvaluation => glow::TESS_EVALUATION_SHADER,
            Self::Compute => glow::COMPUTE_SHADER,
        }
    }
}

/// Compiles shaders whose sources may `#include` named strings.
pub struct ShaderCompiler<'a, S: ?Sized> {
    gl: &'a glow::Context,
    resolver: IncludeResolver<'a, S>,
}

impl<'a, S: NamedStringSource + ?Sized> ShaderCompiler<'a, S> {
    /// Creates a compiler that resolves includes against `strings`.
    pub fn new(gl: &'a glow::Context, strings: &'a S) -> Self {
        Self::with_options(gl, strings, ResolveOptions::default())
    }

    /// Creates a compiler with explicit resolution options.
    pub fn with_options(gl: &'a glow::Context, strings: &'a S, options: ResolveOptions) -> Self {
        Self {
            gl,
            resolver: IncludeResolver::with_options(strings, options),
        }
    }

    /// The resolver used to flatten sources.
    pub fn resolver(&self) -> &IncludeResolver<'a, S> {
        &self.resolver
    }

    /// Compile a single shader stage from source.
    ///
    /// Includes are resolved with a fresh visited set, so each stage sees
    /// every named string once.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::Create`] if the driver cannot allocate the
    /// shader and [`ShaderError::Compile`] if compilation fails. A failed
    /// shader object is deleted before returning.
    pub unsafe fn compile_shader(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<glow::Shader, ShaderError> {
        let flattened = self.resolver.resolve(source).source;
        log::debug!("Flattened {stage:?} shader:\n{flattened}");

        unsafe {
            let shader = self
                .gl
                .create_shader(stage.gl_enum())
                .map_err(ShaderError::Create)?;
            self.gl.shader_source(shader, &flattened);
            self.gl.compile_shader(shader);

            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                log::error!("Compiler error:\n{flattened}\n{log}");
                return Err(ShaderError::Compile { log, flattened });
            }

            Ok(shader)
        }
    }

    /// Compile a shader program from vertex and fragment source strings.
    ///
    /// The compiled shader objects are detached and deleted after linking,
    /// so only the program handle needs to be cleaned up by the caller.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns the first compile error, or [`ShaderError::Link`] if linking
    /// fails.
    pub unsafe fn compile_program(
        &self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<glow::Program, ShaderError> {
        let vs = unsafe { self.compile_shader(ShaderStage::Vertex, vertex_src) }?;
        let fs = match unsafe { self.compile_shader(ShaderStage::Fragment, fragment_src) } {
            Ok(fs) => fs,
            Err(err) => {
                unsafe { self.gl.delete_shader(vs) };
                return Err(err);
            }
        };

        unsafe { self.link_program(&[vs, fs]) }
    }

    /// Link already compiled stages into a program.
    ///
    /// Takes ownership of `shaders`: they are deleted whether or not linking
    /// succeeds.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context, and every shader must be a
    /// live object of that context.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::Create`] if the program cannot be allocated and
    /// [`ShaderError::Link`] with the driver log if linking fails.
    pub unsafe fn link_program(&self, shaders: &[glow::Shader]) -> Result<glow::Program, ShaderError> {
        let gl = self.gl;

        unsafe {
            let program = match gl.create_program() {
                Ok(program) => program,
                Err(err) => {
                    for &shader in shaders {
                        gl.delete_shader(shader);
                    }
                    return Err(ShaderError::Create(err));
                }
            };

            for &shader in shaders {
                gl.attach_shader(program, shader);
            }
            gl.link_program(program);

            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                for &shader in shaders {
                    gl.delete_shader(shader);
                }
                log::error!("Linker error:\n{log}");
                return Err(ShaderError::Link { log });
            }

            // Stages can be detached and deleted after successful linking.
            for &shader in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }

            Ok(program)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stages_map_to_distinct_gl_enums() {
        let stages = [
            ShaderStage::Vertex,
            ShaderStage::Fragment,
            ShaderStage::Geometry,
            ShaderStage::TessControl,
            ShaderStage::TessEvaluation,
            ShaderStage::Compute,
        ];

        let mut enums: Vec<u32> = stages.iter().map(|stage| stage.gl_enum()).collect();
        enums.sort_unstable();
        enums.dedup();
        assert_eq!(enums.len(), stages.len());
        assert_eq!(ShaderStage::Vertex.gl_enum(), glow::VERTEX_SHADER);
        assert_eq!(ShaderStage::Fragment.gl_enum(), glow::FRAGMENT_SHADER);
    }

    #[test]
    fn compile_error_reports_driver_log() {
        let err = ShaderError::Compile {
            log: "0:3(1): error: syntax error".to_owned(),
            flattened: "#version 330\n".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "shader compile error: 0:3(1): error: syntax error"
        );
    }
}

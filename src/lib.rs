//! `#include` resolution for GLSL shaders, with compilation helpers for
//! OpenGL via [glow].
//!
//! Shaders written for `GL_ARB_shading_language_include` reference shared
//! code through *named strings*: virtual files keyed by absolute paths such as
//! `/lighting/brdf.glsl`. This crate flattens such sources on the CPU so they
//! compile on any driver.
//!
//! # Overview
//!
//! - [`NamedStrings`] holds the virtual files. It can be filled by hand or
//!   loaded from a directory with [`NamedStrings::from_dir`].
//! - [`resolve_includes`] and [`IncludeResolver`] replace every
//!   `#include </path>` line with the referenced text, recursively. Each path
//!   is expanded once per resolution, so cyclic and diamond-shaped include
//!   graphs are fine.
//! - `ShaderCompiler` (behind the default `glow` feature) resolves and
//!   compiles shader stages and links programs.
//!
//! Malformed directives never abort resolution. They are logged through the
//! [`log`] facade, reported in [`Resolved::warnings`], and the offending line
//! is dropped.
//!
//! # Safety
//!
//! All `ShaderCompiler` methods are `unsafe` because they issue raw GL calls
//! and require a valid, current OpenGL context.
//!
//! [glow]: https://docs.rs/glow
//! [`log`]: https://docs.rs/log

mod error;
mod include;
mod named_strings;
#[cfg(feature = "glow")]
mod shaders;

pub use error::NamedStringError;
#[cfg(feature = "glow")]
pub use error::ShaderError;
pub use include::{
    resolve, resolve_includes, DirectiveMatching, IncludeResolver, IncludeWarning, ResolveOptions,
    Resolved, DEFAULT_MAX_DEPTH, INCLUDE_EXTENSION,
};
pub use named_strings::{NamedStringSource, NamedStrings};
#[cfg(feature = "glow")]
pub use shaders::{ShaderCompiler, ShaderStage};

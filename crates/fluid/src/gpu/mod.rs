//! Thin owned wrappers around the `wgpu` objects every pass needs.
//!
//! - `context` creates the device, probes required capabilities, and routes
//!   device-lost notifications through a channel.
//! - `program` wraps GLSL pass bodies with the shared header and compiles them
//!   into render pipelines inside validation error scopes.
//! - `texture` owns field textures, uploads texels, and reads them back.
//! - `uniforms` mirrors the per-pass uniform block and stages it on the encoder.
//! - `pass` records full-screen draws with a four-slot input bind group.

mod context;
mod pass;
mod program;
mod quad;
mod texture;
mod uniforms;

pub use context::GpuContext;
pub use texture::{FieldTexture, TexelFormat, TextureSpec};

pub(crate) use pass::{PassEncoder, PassResources};
pub(crate) use program::{compile_module, Program};
pub(crate) use texture::InputView;
pub(crate) use uniforms::PassUniforms;

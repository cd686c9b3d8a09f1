//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - implementing the pipeline's [`GraphicsBackend`](crate::render::GraphicsBackend) on wgpu

mod backend;
mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use backend::WgpuBackend;
pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;

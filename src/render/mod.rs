//! CPU reference implementation of the render context.

pub(crate) mod raster;

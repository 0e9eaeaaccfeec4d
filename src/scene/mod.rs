pub(crate) mod list;
pub(crate) mod model;
pub(crate) mod position;
pub(crate) mod save;
pub(crate) mod shader;

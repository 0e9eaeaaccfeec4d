pub(crate) mod command;
pub(crate) mod context;
pub(crate) mod dispatch;
pub(crate) mod op;
pub(crate) mod queue;

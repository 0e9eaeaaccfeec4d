pub(crate) mod benchmark;
pub(crate) mod bootstrap;
pub(crate) mod cancel;
pub(crate) mod exit;
pub(crate) mod grid;
pub(crate) mod lm;
pub(crate) mod minimizer;
pub(crate) mod oracle;
pub(crate) mod report;

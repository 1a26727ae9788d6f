pub(crate) mod fixtures;
pub(crate) mod memory;

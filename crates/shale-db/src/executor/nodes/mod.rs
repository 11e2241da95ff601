pub(crate) mod count;
pub(crate) mod distinct;
pub(crate) mod filter;
pub(crate) mod limit;
pub(crate) mod projection;
pub(crate) mod sort;
pub(crate) mod values;

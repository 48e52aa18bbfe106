mod cluster_extension;

pub use cluster_extension::*;

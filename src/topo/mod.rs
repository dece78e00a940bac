//! 拓扑构建

pub mod bridged_lans;

pub use crate::net::TopologyError;

pub mod app;
pub mod net;
pub mod scenario;
pub mod sim;
pub mod timeline;
pub mod topo;

#[cfg(test)]
mod test;

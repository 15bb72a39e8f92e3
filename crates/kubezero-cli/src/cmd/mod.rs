pub mod bootstrap;
pub mod cleanup;
pub mod list;
pub mod regions;
pub mod status;

pub mod description;
pub mod discovery;
pub mod service;
pub mod soap;
pub mod ssdp;

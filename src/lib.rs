pub mod config;
pub mod controller;
pub mod protocol;
pub mod transport;

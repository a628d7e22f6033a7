// Library surface exists for the integration tests; the kiosk ships as a binary.
pub mod catalog;
pub mod cli;
pub mod config;
pub mod console;
pub mod gateway;
pub mod intent;
pub mod logging;
pub mod registry;
pub mod session;
pub mod verify;

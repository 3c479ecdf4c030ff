pub mod color;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod output_pin_wapper;
pub mod policy;
pub mod poll_loop;
pub mod registry;
pub mod sensor;
pub mod shell;
pub mod telemetry;

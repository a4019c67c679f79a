pub mod config;
pub mod evaluate;
pub mod prepare;
pub mod telemetry;
pub mod terms;
pub mod util;

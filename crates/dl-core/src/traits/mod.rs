//! Capability traits injected into the agent

mod driver;
mod system;

pub use driver::PinDriver;
pub use system::SystemInfoProvider;

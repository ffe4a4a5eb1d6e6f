/// Application name
pub const APP_NAME: &str = "Beacon";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the bus created by [`Application::new`](crate::kernel::Application::new)
pub const DEFAULT_BUS_NAME: &str = "server";

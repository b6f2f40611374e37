pub mod bugreport;
pub mod classify;
pub mod server;
pub mod version;

pub const SERVER_SUBCOMMAND: &str = "server";
pub const SERVER_DESCRIPTION: &str = "Run the upload form server";

pub const CLASSIFY_SUBCOMMAND: &str = "classify";
pub const CLASSIFY_DESCRIPTION: &str = "Label a local image and archive the result";

pub const VERSION_SUBCOMMAND: &str = "version";
pub const VERSION_DESCRIPTION: &str = "Display the version and build information";

pub const BUGREPORT_SUBCOMMAND: &str = "bugreport";
pub const BUGREPORT_DESCRIPTION: &str = "Collect information about the system and the environment for bug reports";

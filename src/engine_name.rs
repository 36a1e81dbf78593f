pub const ENGINE_NAME: &str = "heron";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ENGINE_AUTHORS: &str = "the heron developers";

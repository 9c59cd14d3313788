pub mod ci_provider;
pub mod code_host;

pub use ci_provider::CiProvider;
pub use code_host::CodeHost;

pub mod extension;
pub mod terminal;

pub use extension::{Extension, Host, SimpleSshExtension};

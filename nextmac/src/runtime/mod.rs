pub mod layout;
pub(crate) mod lock;
pub mod options;

pub use layout::{FilesystemLayout, PoolFilesLayout};

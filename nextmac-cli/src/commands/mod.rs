pub mod allocate;
pub mod list;
pub mod remove;
pub mod reserved;
pub mod swap;

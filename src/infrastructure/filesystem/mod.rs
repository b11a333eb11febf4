//! Local filesystem directory access

mod handle;
mod picker;

pub use handle::FsDirectoryHandle;
pub use picker::{expand_home, FsDirectoryPicker};

//! Utility functions for vidscan

pub mod format;
pub mod mime;
pub mod url;

pub use self::format::*;
pub use self::mime::*;
pub use self::url::*;

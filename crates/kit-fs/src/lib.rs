//! File helpers for kit.
//!
//! Every operation takes a [`CancelToken`](kit_sync::CancelToken) that is
//! checked before any I/O starts; [`wait_until_file_exists`] and
//! [`pend_file_delete`] also honour it while they sleep. Relative paths are
//! resolved against the current directory first.

pub mod error;
pub mod ops;
pub mod sniff;

pub use error::{FsError, FsResult};
pub use ops::{
    create_file, overwrite_file, pend_file_delete, read_file, wait_until_file_exists,
    DEFAULT_POLL_INTERVAL,
};
pub use sniff::{content_type_of, content_type_of_file, sniff_content_type, SNIFF_LEN};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kk-transfer: moving bytes between the agent host and the stores.
//!
//! - [`artifacts`]: build artifacts over FTP
//! - [`cache`]: tar.gz directory caches in an S3-compatible store
//! - [`package`]: versioned tool packages from the object store

pub mod artifacts;
pub mod cache;
mod error;
pub mod ftp;
pub mod package;
pub mod pumper;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use artifacts::{UploadItem, Visibility};
pub use error::TransferError;
pub use ftp::{FtpClient, FtpError};
pub use package::PackageCache;
pub use pumper::Pumper;
pub use store::StoreConfig;

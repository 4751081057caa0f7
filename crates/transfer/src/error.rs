// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::step::FieldError;

use crate::ftp::FtpError;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Ftp(#[from] FtpError),

    #[error("object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path '{0}' does not exist")]
    MissingPath(String),

    #[error("file {0} not found for upload")]
    NotFoundForUpload(String),

    #[error("{0}")]
    Download(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("bad zip package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("bad cache metadata: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("installing requirements failed: {0}")]
    Install(#[from] kk_exec::ExecError),

    #[error("timed out waiting for lock {0}")]
    Lock(String),

    #[error(transparent)]
    Field(#[from] FieldError),
}

//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{AdmissionError, ValueObjectError};

/// 接続受付のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// トークンが無い、または無効
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AdmissionError),

    /// ルーム名が不正
    #[error("invalid room name: {0}")]
    InvalidRoom(#[from] ValueObjectError),
}

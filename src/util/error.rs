//! エラー分類ユーティリティ。
//!
//! 外部ルックアップの失敗を「再試行してよいか」で区別する。分類結果は
//! ログの注釈と再試行判断にのみ使い、呼び出し側へ例外として伝播させる
//! ことはない。
use anyhow::Error;
use reqwest::StatusCode;

/// エラーの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 一時的なネットワーク障害・タイムアウト・5xx
    Retryable,
    /// リクエスト自体が不正（4xxなど）
    NonRetryable,
    /// 認証・設定の誤り。再試行しても直らない
    Fatal,
}

#[must_use]
pub fn classify_error(error: &Error) -> ErrorKind {
    if let Some(reqwest_err) = error.downcast_ref::<reqwest::Error>() {
        if reqwest_err.is_timeout() || reqwest_err.is_connect() {
            return ErrorKind::Retryable;
        }

        if let Some(status) = reqwest_err.status() {
            match status {
                StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS => return ErrorKind::Retryable,
                StatusCode::BAD_REQUEST
                | StatusCode::NOT_FOUND
                | StatusCode::UNPROCESSABLE_ENTITY => return ErrorKind::NonRetryable,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return ErrorKind::Fatal,
                _ => {}
            }
        }
    }

    ErrorKind::NonRetryable
}

#[must_use]
pub fn is_retryable(error: &Error) -> bool {
    matches!(classify_error(error), ErrorKind::Retryable)
}

#[must_use]
pub fn is_fatal(error: &Error) -> bool {
    matches!(classify_error(error), ErrorKind::Fatal)
}

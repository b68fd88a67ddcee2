//! 外部ルックアップ向けの再試行ポリシー。
//!
//! 指数バックオフにFull Jitterを重ねる。待ち時間は `base * 2^(attempt-1)`
//! を上限でキャップし、その範囲から一様に引く。
use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// 最大試行回数（初回を含む）
    pub max_attempts: usize,
    /// ベース遅延（ミリ秒）
    pub base_delay_ms: u64,
    /// 遅延の上限（ミリ秒）
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn new(max_attempts: usize, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// 試行回数（0始まり）に対する待ち時間。初回は待たない。
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }

        let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX);
        let factor = 1_u64.checked_shl(shift).unwrap_or(u64::MAX);
        let exponential = self.base_delay_ms.saturating_mul(factor);
        let capped = exponential.min(self.max_delay_ms);

        let jittered = if capped > 0 {
            rand::rng().random_range(0..=capped)
        } else {
            0
        };

        Duration::from_millis(jittered)
    }

    #[must_use]
    pub const fn can_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}

/// 一時的な失敗かどうか。接続・タイムアウト・5xx・429を再試行対象とする。
#[must_use]
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }

    if let Some(status) = error.status() {
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return true;
        }
    }

    false
}

use anyhow::{Error, Result};
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Tracing サブスクライバを一度だけ初期化する。
///
/// `RUST_LOG` でフィルタを、`LOG_FORMAT=json` で構造化出力を制御する。
///
/// # Errors
/// サブスクライバの初期化に失敗した場合はエラーを返す。
pub fn init() -> Result<()> {
    TRACING_INIT.get_or_try_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

        if json_logs {
            let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).json();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e: tracing_subscriber::util::TryInitError| Error::msg(e.to_string()))?;
        } else {
            let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e: tracing_subscriber::util::TryInitError| Error::msg(e.to_string()))?;
        }

        info!(json_logs, "tracing initialized");
        Ok::<(), Error>(())
    })?;
    Ok(())
}

//! 설정 핫 리로드 — mtime 감시와 재적용
//!
//! SIGHUP 또는 mtime 변경으로 리로드가 트리거됩니다. 리로드 실패는
//! 로그만 남기고 이전 레지스트리를 유지합니다. 원자적 커밋/보존은
//! 체인의 `update_config`가 보장합니다.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use metrics::counter;
use tokio::fs;
use tracing::{error, info};

use logyard_chain::ModuleChain;
use logyard_core::config::ChainConfig;

/// 설정 파일 mtime 감시자
///
/// 첫 조회는 기준 시각만 기록하고 변경으로 치지 않습니다.
pub struct ConfigWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    /// 새 감시자를 생성합니다.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_modified: None,
        }
    }

    /// 파일의 mtime이 마지막 조회 이후 변했는지 확인합니다.
    ///
    /// 파일을 읽을 수 없으면 false를 반환합니다 (일시적 교체 중일 수
    /// 있으므로 다음 폴링에서 다시 확인합니다).
    pub async fn changed(&mut self) -> bool {
        let Ok(modified) = fs::metadata(&self.path)
            .await
            .and_then(|meta| meta.modified())
        else {
            return false;
        };

        match self.last_modified.replace(modified) {
            None => false,
            Some(previous) => previous != modified,
        }
    }
}

/// 설정 파일을 다시 읽어 체인에 적용합니다.
///
/// 실패 시 이전 설정이 유지됩니다. 성공 여부를 반환합니다.
pub async fn reload_config(chain: &mut ModuleChain, path: &Path, debug: bool) -> bool {
    info!(path = %path.display(), "reloading configuration");

    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            counter!("logyard_reload_failures_total").increment(1);
            error!(error = %e, "failed to read config file, keeping previous configuration");
            return false;
        }
    };

    match ChainConfig::parse(&raw).and_then(|doc| chain.update_config(&doc, debug)) {
        Ok(()) => {
            info!("configuration reloaded");
            true
        }
        Err(e) => {
            counter!("logyard_reload_failures_total").increment(1);
            error!(error = %e, "config reload failed, keeping previous configuration");
            false
        }
    }
}

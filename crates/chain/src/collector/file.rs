//! 파일 테일러 — 경로 기준 추적(follow-by-path)과 로테이션 감지
//!
//! `tail -F`와 유사하게 동작합니다. 파일을 주기적으로 폴링하여 새로
//! 추가된 라인을 읽고, 다음 경우를 로테이션으로 판정하여 파일 처음부터
//! 다시 읽습니다:
//!
//! - inode 변경 (logrotate 등, Unix 전용)
//! - 파일 크기가 추적 오프셋보다 작아짐 (truncation)
//!
//! 개행으로 끝나지 않은 꼬리 조각은 다음 폴링까지 보류됩니다.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logyard_core::error::LogyardError;

/// 파일 테일러 설정
#[derive(Debug, Clone)]
pub struct FileTailerConfig {
    /// 추적할 파일 경로
    pub path: PathBuf,
    /// 파일 상태 체크 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// true면 파일 처음부터, false면 현재 끝에서부터 읽기 시작
    pub read_from_start: bool,
    /// 최대 라인 길이 (바이트, 초과분은 잘림)
    pub max_line_length: usize,
}

impl Default for FileTailerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/log/syslog"),
            poll_interval_ms: 1000,
            read_from_start: false,
            max_line_length: 64 * 1024,
        }
    }
}

/// 파일 테일러
///
/// [`run`](FileTailer::run)은 취소될 때까지 실행되며, 읽어낸 라인을
/// 채널로 전달합니다. 수신측이 닫히면 스스로 종료합니다.
pub struct FileTailer {
    config: FileTailerConfig,
    tx: mpsc::Sender<String>,
    /// 마지막 읽기 위치 (바이트 오프셋)
    offset: u64,
    /// 현재 추적 중인 파일의 inode (Unix 전용)
    #[cfg(unix)]
    inode: Option<u64>,
    /// 개행을 기다리는 꼬리 조각
    pending: Vec<u8>,
}

impl FileTailer {
    /// 새 파일 테일러를 생성합니다.
    pub fn new(config: FileTailerConfig, tx: mpsc::Sender<String>) -> Self {
        Self {
            config,
            tx,
            offset: 0,
            #[cfg(unix)]
            inode: None,
            pending: Vec::new(),
        }
    }

    /// 테일링 루프를 실행합니다.
    ///
    /// `tokio::spawn`으로 별도 태스크에서 호출하세요. 취소 토큰이
    /// 취소되거나 라인 수신측이 닫히면 정상 종료합니다. 개별 폴링
    /// 에러(일시적 I/O 실패 등)는 경고 후 계속합니다.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), LogyardError> {
        if !self.config.read_from_start {
            if let Ok(meta) = fs::metadata(&self.config.path).await {
                self.offset = meta.len();
                #[cfg(unix)]
                {
                    self.inode = Some(unix_inode(&meta));
                }
            }
        }

        info!(
            path = %self.config.path.display(),
            from_start = self.config.read_from_start,
            "file tailer started"
        );

        let mut ticker = interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(path = %self.config.path.display(), "file tailer cancelled");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(true) => {}
                        Ok(false) => {
                            info!("line receiver closed, file tailer exiting");
                            return Ok(());
                        }
                        Err(e) => {
                            warn!(path = %self.config.path.display(), error = %e, "tail poll failed");
                        }
                    }
                }
            }
        }
    }

    /// 한 번의 폴링을 수행합니다.
    ///
    /// `Ok(false)`는 수신측이 닫혔음을 의미합니다.
    async fn poll_once(&mut self) -> Result<bool, std::io::Error> {
        let meta = match fs::metadata(&self.config.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // 파일이 사라짐 (로테이션 도중) — 다시 나타나면 처음부터
                self.reset();
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        #[cfg(unix)]
        {
            let current = unix_inode(&meta);
            if self.inode.is_some_and(|tracked| tracked != current) {
                debug!(path = %self.config.path.display(), "inode changed, file rotated");
                self.reset();
            }
            self.inode = Some(current);
        }

        if meta.len() < self.offset {
            debug!(path = %self.config.path.display(), "file truncated, restarting from top");
            self.reset();
            #[cfg(unix)]
            {
                self.inode = Some(unix_inode(&meta));
            }
        }

        if meta.len() == self.offset {
            return Ok(true);
        }

        let mut file = fs::File::open(&self.config.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;

        let available = meta.len() - self.offset;
        let mut buf = Vec::with_capacity(available.min(1024 * 1024) as usize);
        (&mut file).take(available).read_to_end(&mut buf).await?;
        self.offset += buf.len() as u64;
        self.pending.extend_from_slice(&buf);

        self.drain_lines().await
    }

    /// 보류 버퍼에서 완성된 라인을 모두 전달합니다.
    async fn drain_lines(&mut self) -> Result<bool, std::io::Error> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut raw: Vec<u8> = self.pending.drain(..=pos).collect();
            raw.pop(); // '\n'
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            if raw.len() > self.config.max_line_length {
                warn!(
                    length = raw.len(),
                    max = self.config.max_line_length,
                    "line exceeds max length, truncating"
                );
                raw.truncate(self.config.max_line_length);
            }

            let line = String::from_utf8_lossy(&raw).into_owned();
            if self.tx.send(line).await.is_err() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// 추적 상태를 초기화합니다 (로테이션/삭제 후 재시작).
    fn reset(&mut self) {
        self.offset = 0;
        self.pending.clear();
        #[cfg(unix)]
        {
            self.inode = None;
        }
    }
}

#[cfg(unix)]
fn unix_inode(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

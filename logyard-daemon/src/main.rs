//! logyard-daemon — 파일 테일러와 모듈 체인을 잇는 실행 바이너리
//!
//! 하나의 select 루프가 체인을 소유하며 라인 처리(`handle`)와 설정
//! 리로드(`update_config`)를 직렬화합니다. 프로세서의 런타임 에러는
//! 여기서 로그로 남기고 다음 라인으로 계속합니다.

mod cli;
mod logging;
mod reload;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use logyard_chain::{FileTailer, FileTailerConfig, ModuleChain};
use logyard_core::config::ChainConfig;

use crate::cli::DaemonCli;
use crate::reload::{ConfigWatcher, reload_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 로깅 초기화
    logging::init_tracing(&cli.log_format, cli.debug)?;
    info!("logyard-daemon starting");

    // 초기 설정 로드 — 시작 시점의 설정 오류는 치명적입니다
    let raw = tokio::fs::read_to_string(&cli.config)
        .await
        .with_context(|| format!("failed to read config file {}", cli.config.display()))?;
    let doc = ChainConfig::parse(&raw)
        .with_context(|| format!("failed to parse config file {}", cli.config.display()))?;

    let mut chain = ModuleChain::with_defaults();
    chain
        .update_config(&doc, cli.debug)
        .context("initial configuration rejected")?;

    if cli.validate {
        info!("configuration is valid");
        chain.stop();
        return Ok(());
    }

    // 파일 테일러 스폰
    let (line_tx, mut line_rx) = mpsc::channel(1024);
    let cancel = CancellationToken::new();
    let tailer = FileTailer::new(
        FileTailerConfig {
            path: cli.file.clone(),
            poll_interval_ms: cli.poll_interval_ms,
            read_from_start: cli.from_start,
            ..FileTailerConfig::default()
        },
        line_tx,
    );
    let tail_task = tokio::spawn(tailer.run(cancel.clone()));

    // 리로드 트리거: SIGHUP (unix) + mtime 폴링
    #[cfg(unix)]
    let mut sighup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;

    let mut watcher = ConfigWatcher::new(cli.config.clone());
    let mut ticker = interval(Duration::from_secs(cli.watch_config_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        file = %cli.file.display(),
        config = %cli.config.display(),
        "logyard-daemon running"
    );

    loop {
        #[cfg(unix)]
        let hup = sighup.recv();
        #[cfg(not(unix))]
        let hup = std::future::pending::<Option<()>>();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            _ = hup => {
                info!("SIGHUP received");
                reload_config(&mut chain, &cli.config, cli.debug).await;
            }
            _ = ticker.tick(), if cli.watch_config_secs > 0 => {
                if watcher.changed().await {
                    reload_config(&mut chain, &cli.config, cli.debug).await;
                }
            }
            maybe_line = line_rx.recv() => {
                match maybe_line {
                    Some(line) => {
                        // 프로세서 에러는 체인이 분류하지 않습니다.
                        // 호스트 정책: 로그 후 다음 라인으로 계속.
                        if let Err(e) = chain.handle(&line) {
                            counter!("logyard_line_errors_total").increment(1);
                            warn!(error = %e, "processor error, continuing with next line");
                        }
                    }
                    None => {
                        warn!("line source closed unexpectedly");
                        break;
                    }
                }
            }
        }
    }

    // 우아한 종료: 테일러 정지 후 체인 정지
    cancel.cancel();
    match tail_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "file tailer exited with error"),
        Err(e) => warn!(error = %e, "file tailer task join failed"),
    }
    chain.stop();

    info!("logyard-daemon shut down");
    Ok(())
}

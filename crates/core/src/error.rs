//! 에러 타입 — 도메인별 에러 정의
//!
//! 설정 경로의 모든 실패는 [`ConfigError`] 하나로 수렴합니다. 메시지는
//! 문제가 된 모듈 이름과 옵션 경로를 항상 포함합니다.
//!
//! 프로세서의 `process()` 내부에서 발생하는 런타임 에러는 [`ProcessError`]로
//! 표현되며, 체인은 이를 잡지 않고 호스트까지 그대로 전파합니다.

/// Logyard 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogyardError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 프로세서 런타임 에러
    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 검증 경로의 단일 에러 종류
///
/// `update_config`가 동기적으로 반환하며, 어떤 변형이든 이전 레지스트리
/// 상태는 보존됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 문서 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 알 수 없는 최상위 섹션
    #[error("unknown top-level config section '{section}' (expected 'processors' or 'parsers')")]
    UnknownSection { section: String },

    /// 모듈 설정 조각이 객체가 아님
    #[error("module '{module}': config fragment must be a JSON object")]
    InvalidFragment { module: String },

    /// 알 수 없는 모듈 class
    #[error("module '{module}': unknown class '{class}'")]
    UnknownClass { module: String, class: String },

    /// 필수 옵션 누락
    #[error("module '{module}': missing required option '{option}'")]
    MissingOption { module: String, option: String },

    /// 유효하지 않은 옵션 값 (타입 불일치 포함)
    #[error("module '{module}': invalid value for option '{option}': {reason}")]
    InvalidOption {
        module: String,
        option: String,
        reason: String,
    },

    /// 레지스트리에 없는 프로세서 참조 (파서 바인딩 또는 composite 자식)
    #[error("module '{module}': references unknown processor '{processor}'")]
    UnknownProcessor { module: String, processor: String },

    /// composite 프로세서의 순환 참조
    #[error("composite processor '{module}': cyclic child reference")]
    CompositeCycle { module: String },

    /// 프로세서가 파서 바인딩의 processParams를 거부함
    #[error("parser '{parser}' -> processor '{processor}': {reason}")]
    InvalidBinding {
        parser: String,
        processor: String,
        reason: String,
    },

    /// processParams 계약 위반 (프로세서 구현이 반환, 체인이 InvalidBinding으로 감쌈)
    #[error("invalid processParams: {reason}")]
    InvalidProcessParams { reason: String },

    /// 모듈 setUp 실패
    #[error("module '{module}': setup failed: {reason}")]
    SetupFailed { module: String, reason: String },

    /// 동일 인스턴스에 대한 중복 setUp
    #[error("module '{module}': set_up called twice")]
    DoubleSetup { module: String },
}

/// 프로세서 런타임 에러
///
/// `process()`에서 탈출한 에러는 체인이 분류하지 않고 그대로 전파합니다.
/// 재시도/억제 정책은 호스트의 몫입니다.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// setUp 이전에 process가 호출됨 (계약 위반)
    #[error("processor '{processor}' is not set up")]
    NotReady { processor: String },

    /// I/O 실패 (UDP 전송, stdout 플러시 등)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_module_and_option() {
        let err = ConfigError::MissingOption {
            module: "pa1".to_owned(),
            option: "regex".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pa1"));
        assert!(msg.contains("regex"));
    }

    #[test]
    fn unknown_class_display() {
        let err = ConfigError::UnknownClass {
            module: "pr1".to_owned(),
            class: "nope".to_owned(),
        };
        assert_eq!(err.to_string(), "module 'pr1': unknown class 'nope'");
    }

    #[test]
    fn invalid_binding_wraps_reason() {
        let inner = ConfigError::InvalidProcessParams {
            reason: "placeholder key 'host' is not produced by the parser".to_owned(),
        };
        let err = ConfigError::InvalidBinding {
            parser: "pa1".to_owned(),
            processor: "pr1".to_owned(),
            reason: inner.to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pa1"));
        assert!(msg.contains("pr1"));
        assert!(msg.contains("host"));
    }

    #[test]
    fn config_error_converts_to_logyard_error() {
        let err: LogyardError = ConfigError::UnknownSection {
            section: "parser".to_owned(),
        }
        .into();
        assert!(matches!(err, LogyardError::Config(_)));
        assert!(err.to_string().contains("parser"));
    }

    #[test]
    fn process_error_converts_to_logyard_error() {
        let err: LogyardError = ProcessError::NotReady {
            processor: "pr1".to_owned(),
        }
        .into();
        assert!(matches!(err, LogyardError::Process(_)));
    }
}

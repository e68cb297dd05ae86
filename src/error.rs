use std::path::PathBuf;

use remote_tray_core::StateError;

/// Startup failures of the tray harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("menu stage failed: no menu helper could be built (tried: {})", tried(.attempted))]
    NoMenuHelper { attempted: Vec<String> },

    #[error("tray stage failed: no tray backend available (tried: {})", tried(.attempted))]
    NoTrayBackend { attempted: Vec<String> },

    #[error("invalid client state: {0}")]
    State(#[from] StateError),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn tried(attempted: &[String]) -> String {
    if attempted.is_empty() {
        "no candidates".to_string()
    } else {
        attempted.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_stage() {
        let menu = HarnessError::NoMenuHelper {
            attempted: Vec::new(),
        };
        assert_eq!(
            menu.to_string(),
            "menu stage failed: no menu helper could be built (tried: no candidates)"
        );

        let tray = HarnessError::NoTrayBackend {
            attempted: vec!["sni: no bus".to_string(), "status-window: no display".to_string()],
        };
        assert_eq!(
            tray.to_string(),
            "tray stage failed: no tray backend available \
             (tried: sni: no bus; status-window: no display)"
        );
    }
}

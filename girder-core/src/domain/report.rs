//! Exit report emitted by trap-wrapped scripts

use serde::{Deserialize, Serialize};

/// Last line printed by a trap-wrapped script
///
/// Wire form: `{"command_exit_code": <int>, "script": "<string>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapExitReport {
    pub command_exit_code: i32,
    pub script: String,
}

impl TrapExitReport {
    pub fn new(command_exit_code: i32, script: impl Into<String>) -> Self {
        Self {
            command_exit_code,
            script: script.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.command_exit_code == 0
    }
}

impl std::fmt::Display for TrapExitReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{\"command_exit_code\": {}, \"script\": {}}}",
            self.command_exit_code,
            serde_json::Value::String(self.script.clone())
        )
    }
}

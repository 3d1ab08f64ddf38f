use serde::{Deserialize, Serialize};

/// RunStatus - 生成ランの状態を表す列挙型
///
/// `Pending` から `Succeeded` / `Failed` のいずれかへ一度だけ遷移する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Succeeded,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Pending)
    }

    pub(crate) fn from_db(value: &str) -> anyhow::Result<Self> {
        match value {
            "pending" => Ok(RunStatus::Pending),
            "succeeded" => Ok(RunStatus::Succeeded),
            "failed" => Ok(RunStatus::Failed),
            other => anyhow::bail!("unknown run status '{other}'"),
        }
    }
}

impl AsRef<str> for RunStatus {
    fn as_ref(&self) -> &str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }
}

/// RunTrigger - ランの起動元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunTrigger {
    #[default]
    Scheduled,
    Manual,
}

impl RunTrigger {
    pub(crate) fn from_db(value: &str) -> anyhow::Result<Self> {
        match value {
            "scheduled" => Ok(RunTrigger::Scheduled),
            "manual" => Ok(RunTrigger::Manual),
            other => anyhow::bail!("unknown run trigger '{other}'"),
        }
    }
}

impl AsRef<str> for RunTrigger {
    fn as_ref(&self) -> &str {
        match self {
            RunTrigger::Scheduled => "scheduled",
            RunTrigger::Manual => "manual",
        }
    }
}

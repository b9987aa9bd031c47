use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    // rejected / cancelled / completed からはどこへも遷移できない
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReservationStatus::Rejected | ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }

    // rejected / cancelled の予約はスペースの時間帯を占有しない
    pub fn is_blocking(self) -> bool {
        !matches!(
            self,
            ReservationStatus::Rejected | ReservationStatus::Cancelled
        )
    }

    // 許可される遷移の一覧
    pub fn can_transition_to(self, to: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, to),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Cancelled)
                | (Approved, Completed)
        )
    }

    pub fn validate_transition(self, to: ReservationStatus) -> AppResult<()> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(AppError::InvalidTransitionError(format!(
                "予約ステータスを {} から {} へは変更できません。",
                self, to
            )))
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Approved => "approved",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "approved" => Ok(ReservationStatus::Approved),
            "rejected" => Ok(ReservationStatus::Rejected),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            "completed" => Ok(ReservationStatus::Completed),
            _ => Err(AppError::ConversionEntityError(format!(
                "不明な予約ステータスです: {s}"
            ))),
        }
    }
}

/// Outcome of one adapter `send` attempt.
#[derive(Debug, Clone)]
pub struct SendResult {
    pub success: bool,
    pub detail: Option<String>,
}

impl SendResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: Some(detail.into()),
        }
    }
}

/// Rendered notification content for one (channel, recipient) pair.
#[derive(Debug, Clone)]
pub struct RenderedContent {
    pub subject: Option<String>,
    pub body: String,
    pub html_body: Option<String>,
}

/// Everything an adapter needs about who and what it is notifying,
/// independent of which channel will carry it.
#[derive(Debug, Clone)]
pub struct NotificationTarget {
    pub numero: equiwatch_core::EventNumber,
    pub status: equiwatch_core::EventStatus,
    pub url: String,
    pub push_token: Option<String>,
    pub email: String,
}

/// The per-plan notification delay table the dispatch worker logs against
/// (spec §6 `DELAY_FREE`/`DELAY_PREMIUM`/`DELAY_PRO`). Kept as its own
/// value here rather than depending on `equiwatch-config` directly, so
/// this crate stays agnostic of how the engine binary is configured.
#[derive(Debug, Clone, Copy)]
pub struct PlanDelays {
    pub free_secs: u64,
    pub premium_secs: u64,
    pub pro_secs: u64,
}

impl PlanDelays {
    pub fn for_plan(&self, plan: equiwatch_core::Plan) -> u64 {
        match plan {
            equiwatch_core::Plan::Free => self.free_secs,
            equiwatch_core::Plan::Premium => self.premium_secs,
            equiwatch_core::Plan::Pro => self.pro_secs,
        }
    }
}

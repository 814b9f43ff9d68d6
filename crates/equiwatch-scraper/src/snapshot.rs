use equiwatch_core::EventStatus;

/// Fields scraped from a single event page at one point in time.
///
/// A `Snapshot` with every field `None`, `status = previsional` and
/// `is_open = false` is the failure-path default: the scraper never
/// propagates network or HTTP errors to its caller, it degrades to this
/// empty snapshot instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub name: Option<String>,
    pub venue: Option<String>,
    pub organisateur: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub discipline: Option<String>,
    pub status: EventStatus,
    pub is_open: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            name: None,
            venue: None,
            organisateur: None,
            start_date: None,
            end_date: None,
            discipline: None,
            status: EventStatus::Previsional,
            is_open: false,
        }
    }
}

/// A completed fetch attempt: the (possibly empty, on failure) snapshot
/// plus whether the underlying request actually succeeded.
///
/// A network/TLS/HTTP error and a genuinely-closed, field-empty page both
/// produce the same default [`Snapshot`], but the caller still needs to
/// tell them apart to record `check_history.success` correctly (spec §4.2,
/// §4.6, §8 invariant 6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub snapshot: Snapshot,
    pub success: bool,
}

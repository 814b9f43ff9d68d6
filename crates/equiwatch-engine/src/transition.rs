//! Pure comparison between a pre-poll and post-poll event status, deciding
//! what (if anything) the scheduler needs to act on. Kept side-effect free
//! so it can be table-tested without a repository or scraper in the loop.

use equiwatch_core::{EventStatus, Transition};

/// Compares the status *before* a poll against the status *after* it.
///
/// An event transitions to [`Transition::Opened`] the moment it becomes
/// open, regardless of which closed status it came from — spec §4.5 treats
/// `previsional -> engagement` and `cloture -> demande` alike. Any other
/// status change that isn't an opening is reported as
/// [`Transition::StatusChanged`] so it can still be recorded in check
/// history, and anything unchanged is [`Transition::NoChange`].
pub fn detect(pre_status: EventStatus, pre_is_open: bool, post_status: EventStatus) -> Transition {
    let post_is_open = post_status.is_open();

    if post_is_open && !pre_is_open {
        return Transition::Opened;
    }
    if post_status != pre_status {
        return Transition::StatusChanged;
    }
    Transition::NoChange
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_to_open_is_opened() {
        let t = detect(EventStatus::Previsional, false, EventStatus::Engagement);
        assert_eq!(t, Transition::Opened);
    }

    #[test]
    fn cloture_to_demande_is_opened() {
        let t = detect(EventStatus::Cloture, false, EventStatus::Demande);
        assert_eq!(t, Transition::Opened);
    }

    #[test]
    fn open_to_open_with_different_status_is_status_changed_not_opened() {
        let t = detect(EventStatus::Engagement, true, EventStatus::Demande);
        assert_eq!(t, Transition::StatusChanged);
    }

    #[test]
    fn unrelated_status_change_is_status_changed() {
        let t = detect(EventStatus::Previsional, false, EventStatus::Cancelled);
        assert_eq!(t, Transition::StatusChanged);
    }

    #[test]
    fn identical_status_is_no_change() {
        let t = detect(EventStatus::Previsional, false, EventStatus::Previsional);
        assert_eq!(t, Transition::NoChange);
    }

    #[test]
    fn already_open_event_reported_again_as_open_is_no_change() {
        let t = detect(EventStatus::Engagement, true, EventStatus::Engagement);
        assert_eq!(t, Transition::NoChange);
    }
}

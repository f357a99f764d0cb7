//! Decides whether a run has anything to apply and whether it needs a
//! human to approve it first.

use crate::diff::ComparisonSummary;

/// True iff any of the four entity collections has an entry.
pub fn is_changed(summary: &ComparisonSummary) -> bool {
    !summary.classes.is_empty()
        || !summary.models.is_empty()
        || !summary.dependencies.is_empty()
        || !summary.files.is_empty()
}

pub fn requires_approval(summary: &ComparisonSummary, ignore_approval: bool) -> bool {
    is_changed(summary) && !ignore_approval
}

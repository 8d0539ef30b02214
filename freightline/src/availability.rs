//! Freight availability predicate.
//!
//! Approval and verification are different trust levels. Verification is an
//! automated attestation that Freight is fit for a Stage; approval is a
//! manual override for one Stage and is not transitive. Callers deciding
//! whether Freight may move onward from a Stage pass an empty approval
//! Stage so only verification counts.

use crate::core::Freight;

/// Returns true if `freight` is approved for `approved_for_stage` (when
/// non-empty) or verified in any of `verified_in_stages`.
///
/// Missing status maps count as empty.
#[must_use]
pub fn is_freight_available<S: AsRef<str>>(
    freight: &Freight,
    approved_for_stage: &str,
    verified_in_stages: &[S],
) -> bool {
    if !approved_for_stage.is_empty() && freight.status.is_approved_for(approved_for_stage) {
        return true;
    }
    verified_in_stages
        .iter()
        .any(|stage| freight.status.is_verified_in(stage.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_nothing_requested_is_unavailable() {
        let freight = Freight::new("p", "f").approved_for("dev").verified_in("dev");
        assert!(!is_freight_available(&freight, "", &NONE));
    }

    #[test]
    fn test_approval_only() {
        let freight = Freight::new("p", "f").approved_for("uat");
        assert!(is_freight_available(&freight, "uat", &NONE));
        assert!(!is_freight_available(&freight, "prod", &NONE));
    }

    #[test]
    fn test_verification_only_ignores_approval() {
        let freight = Freight::new("p", "f").approved_for("dev");
        assert!(!is_freight_available(&freight, "", &["dev"]));

        let verified = Freight::new("p", "f").verified_in("dev");
        assert!(is_freight_available(&verified, "", &["dev"]));
    }

    #[test]
    fn test_either_condition() {
        let freight = Freight::new("p", "f").verified_in("qa");
        assert!(is_freight_available(&freight, "uat", &["dev", "qa"]));
        assert!(!is_freight_available(&freight, "uat", &["dev"]));
    }

    #[test]
    fn test_missing_status_maps() {
        let freight = Freight::new("p", "f");
        assert!(freight.status.approved_for.is_none());
        assert!(!is_freight_available(&freight, "dev", &["dev".to_string()]));
    }
}

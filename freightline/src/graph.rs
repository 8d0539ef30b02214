//! Stage subscription graph.
//!
//! Edges run from an upstream Stage to the Stages that list it in their
//! subscriptions. Only direct (one-hop) downstream neighbours are resolved.

use crate::core::Stage;

/// Returns the Stages that subscribe directly to `upstream`, in input order.
///
/// A Stage listing the same upstream more than once is returned once.
#[must_use]
pub fn direct_subscribers<'a, I>(upstream: &str, stages: I) -> Vec<Stage>
where
    I: IntoIterator<Item = &'a Stage>,
{
    stages
        .into_iter()
        .filter(|s| s.subscribes_to(upstream))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Resource;

    fn names(stages: &[Stage]) -> Vec<&str> {
        stages.iter().map(Resource::name).collect()
    }

    #[test]
    fn test_one_hop_only() {
        let all = vec![
            Stage::new("p", "dev").with_warehouse("images"),
            Stage::new("p", "qa").with_upstream("dev"),
            Stage::new("p", "uat").with_upstream("dev"),
            Stage::new("p", "prod").with_upstream("uat"),
        ];
        assert_eq!(names(&direct_subscribers("dev", &all)), vec!["qa", "uat"]);
        assert_eq!(names(&direct_subscribers("uat", &all)), vec!["prod"]);
        assert!(direct_subscribers("prod", &all).is_empty());
    }

    #[test]
    fn test_duplicate_upstream_entries_collapse() {
        let all = vec![Stage::new("p", "qa").with_upstream("dev").with_upstream("dev")];
        assert_eq!(direct_subscribers("dev", &all).len(), 1);
    }

    #[test]
    fn test_self_named_stage_is_not_its_own_subscriber() {
        let all = vec![Stage::new("p", "dev")];
        assert!(direct_subscribers("dev", &all).is_empty());
    }
}

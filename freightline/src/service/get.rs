//! Single-object reads.

use super::validation::require;
use super::{traced, FreightService};
use crate::core::{ObjectKey, Promotion};
use crate::errors::{FreightlineError, Result};
use crate::store::get_object;

impl FreightService {
    /// Fetches one Promotion.
    pub async fn get_promotion(&self, project: &str, name: &str) -> Result<Promotion> {
        traced("get_promotion", project, self.get_promotion_inner(project, name)).await
    }

    async fn get_promotion_inner(&self, project: &str, name: &str) -> Result<Promotion> {
        require("project", project)?;
        require("name", name)?;
        self.validate_project_exists(project).await?;
        get_object::<Promotion>(self.store(), &ObjectKey::new(project, name))
            .await?
            .ok_or_else(|| FreightlineError::not_found(format!("promotion {name:?} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stage;
    use crate::errors::ErrorCode;
    use crate::service::ServicePorts;
    use crate::testing::{assert_error_code, Fixture, PROJECT};

    #[tokio::test]
    async fn test_get_promotion() {
        let fixture = Fixture::pipeline().unwrap();
        let promotion = Promotion::for_stage(&Stage::new(PROJECT, "uat"), "f-verified", 212);
        let stored = fixture.store.insert(&promotion).unwrap();

        let svc = FreightService::new(ServicePorts::new(fixture.store.clone()));
        let got = svc
            .get_promotion(PROJECT, &stored.metadata.name)
            .await
            .unwrap();
        assert_eq!(got, stored);

        let result = svc.get_promotion(PROJECT, "missing").await;
        let err = assert_error_code(result, ErrorCode::NotFound);
        assert_eq!(err.to_string(), "not found: promotion \"missing\" not found");
    }
}

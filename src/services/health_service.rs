use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the theme store and report `degraded` when it cannot be read.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.themes().find_all().await {
        Ok(_) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::room_service::tests::test_state;

    #[tokio::test]
    async fn healthy_store_reports_ok() {
        let state = test_state().await;
        assert_eq!(health_status(&state).await.status, "ok");
    }
}

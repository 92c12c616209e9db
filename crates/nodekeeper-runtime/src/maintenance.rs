//! Privileged maintenance actions.
//!
//! `restart_managed_stack` holds the restart permit across the image
//! pre-fetch and every unit restart. Concurrent restarts queue on the
//! permit and each one runs the full sequence; nothing is coalesced.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::actions::{SharedFetcher, SharedRestarter};
use crate::coordinator::RestartCoordinator;
use crate::error::{MaintenanceActionError, MaintenanceResult};

/// What a stack restart does on this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceSettings {
    /// Units restarted in order.
    pub units: Vec<String>,
    /// Pre-fetched before the units restart; also the default fetch target.
    pub stack_image: Option<String>,
    /// Pass `--insecure-options=all` to the fetcher.
    pub insecure_fetch: bool,
}

/// Outcome of a successful stack restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestartSummary {
    pub image: Option<String>,
    pub units: Vec<String>,
    pub elapsed_ms: u64,
}

#[derive(Clone)]
pub struct MaintenanceService {
    coordinator: RestartCoordinator,
    fetcher: SharedFetcher,
    restarter: SharedRestarter,
    settings: Arc<MaintenanceSettings>,
}

impl MaintenanceService {
    pub fn new(
        coordinator: RestartCoordinator,
        fetcher: SharedFetcher,
        restarter: SharedRestarter,
        settings: MaintenanceSettings,
    ) -> Self {
        Self {
            coordinator,
            fetcher,
            restarter,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &MaintenanceSettings {
        &self.settings
    }

    /// Fetch `image_ref` into the local image store.
    ///
    /// Does not touch the running stack, so it takes no permit.
    pub async fn fetch_image(&self, image_ref: &str, insecure: bool) -> MaintenanceResult<()> {
        let image_ref = image_ref.trim();
        if image_ref.is_empty() {
            return Err(MaintenanceActionError::InvalidRequest(
                "image reference is empty".to_string(),
            ));
        }

        self.fetcher
            .fetch(image_ref, insecure)
            .await
            .map_err(|source| MaintenanceActionError::Fetch {
                image: image_ref.to_string(),
                source,
            })?;

        info!(image = image_ref, "image fetched");
        Ok(())
    }

    /// Restart the managed stack under the exclusive restart permit.
    pub async fn restart_managed_stack(&self) -> MaintenanceResult<RestartSummary> {
        let _permit = self.coordinator.acquire_for_restart().await;
        let started = Instant::now();
        info!(units = ?self.settings.units, "managed stack restart started");

        if let Some(image) = &self.settings.stack_image {
            self.fetch_image(image, self.settings.insecure_fetch)
                .await
                .inspect_err(|e| warn!(error = %e, "stack image pre-fetch failed"))?;
        }

        for unit in &self.settings.units {
            self.restarter
                .restart(unit)
                .await
                .map_err(|source| MaintenanceActionError::Restart {
                    unit: unit.clone(),
                    source,
                })
                .inspect_err(|e| error!(error = %e, "managed stack restart failed"))?;
        }

        let summary = RestartSummary {
            image: self.settings.stack_image.clone(),
            units: self.settings.units.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(elapsed_ms = summary.elapsed_ms, "managed stack restart finished");
        Ok(summary)
    }
}

impl std::fmt::Debug for MaintenanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

//! One pass over one campaign's log.
//!
//! Only snapshot events (those carrying a `system_id`) are validated or
//! replayed; generic events are counted and skipped. Every pass pages
//! through the log with an [`EventCursor`], so a campaign never has to fit
//! in memory at once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use lorekeep_daggerheart::DaggerheartAdapter;
use lorekeep_ledger::{EventCursor, EventStore};
use lorekeep_projection::{Applier, MemoryProjectionStore, ProjectionStore, SystemAdapter};
use lorekeep_types::{CampaignId, Event};

use crate::error::MaintenanceError;
use crate::options::{CampaignSelection, Mode, Options};
use crate::report::{CampaignResult, IntegrityReport, Report, ScanReport};

/// What a pass produced before warnings are capped.
struct Outcome {
    report: Report,
    warnings: Vec<String>,
}

/// Runs maintenance passes against an event log and its live projections.
pub struct Maintenance {
    events: Arc<dyn EventStore>,
    projections: Arc<dyn ProjectionStore>,
    systems: Vec<Arc<dyn SystemAdapter>>,
    options: Options,
}

impl core::fmt::Debug for Maintenance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let systems: Vec<&str> = self.systems.iter().map(|s| s.system_id()).collect();
        f.debug_struct("Maintenance")
            .field("systems", &systems)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Maintenance {
    /// Create a runner with the Daggerheart module registered.
    pub fn new(
        events: Arc<dyn EventStore>,
        projections: Arc<dyn ProjectionStore>,
        options: Options,
    ) -> Self {
        Self {
            events,
            projections,
            systems: vec![Arc::new(DaggerheartAdapter::new())],
            options,
        }
    }

    /// Register another game system module.
    #[must_use]
    pub fn with_system(mut self, adapter: Arc<dyn SystemAdapter>) -> Self {
        self.systems.push(adapter);
        self
    }

    /// The options this runner was built with.
    pub const fn options(&self) -> &Options {
        &self.options
    }

    fn applier(&self, store: Arc<dyn ProjectionStore>) -> Applier {
        self.systems
            .iter()
            .fold(Applier::new(store), |applier, system| {
                applier.with_system(Arc::clone(system))
            })
    }

    fn system(&self, system_id: &str) -> Option<&Arc<dyn SystemAdapter>> {
        self.systems
            .iter()
            .find(|s| s.system_id() == system_id.trim())
    }

    fn cursor(&self, campaign_id: CampaignId, after_seq: u64) -> EventCursor {
        EventCursor::resume(campaign_id, after_seq).with_page_size(self.options.page_size)
    }

    /// Expand a selection into campaign ids.
    ///
    /// # Errors
    ///
    /// [`MaintenanceError::Ledger`] if listing campaigns fails.
    pub async fn campaign_ids(
        &self,
        selection: &CampaignSelection,
    ) -> Result<Vec<CampaignId>, MaintenanceError> {
        match selection {
            CampaignSelection::Ids(ids) => Ok(ids.clone()),
            CampaignSelection::All => Ok(self.events.campaign_ids().await?),
        }
    }

    /// Run the configured pass over one campaign.
    ///
    /// Failures are recorded in the result rather than returned, so one bad
    /// campaign does not stop a multi-campaign run.
    pub async fn run_campaign(&self, campaign_id: CampaignId) -> CampaignResult {
        let mode = self.options.mode;
        let mut result = CampaignResult::new(campaign_id, mode, self.options.after_seq);
        info!(campaign_id = %campaign_id, mode = %mode, after_seq = self.options.after_seq, "maintenance pass starting");

        let outcome = match mode {
            Mode::Scan => self.scan(campaign_id, false).await,
            Mode::Validate => self.scan(campaign_id, true).await,
            Mode::Replay => self.replay(campaign_id).await,
            Mode::Integrity => self.integrity(campaign_id).await,
        };

        match outcome {
            Ok(outcome) => {
                if let Some(err) = self.check_invalid_limit(&outcome.report) {
                    warn!(campaign_id = %campaign_id, error = %err, "maintenance pass failed");
                    result.error = Some(err.to_string());
                }
                result.report = Some(outcome.report);
                result.set_warnings(outcome.warnings, self.options.warnings_cap);
            }
            Err(err) => {
                warn!(campaign_id = %campaign_id, error = %err, kind = ?err.kind(), "maintenance pass failed");
                result.error = Some(err.to_string());
            }
        }
        result
    }

    fn check_invalid_limit(&self, report: &Report) -> Option<MaintenanceError> {
        let (Some(max), Report::Scan(scan)) = (self.options.max_invalid, report) else {
            return None;
        };
        (scan.invalid_events > max).then_some(MaintenanceError::TooManyInvalid {
            invalid: scan.invalid_events,
            max,
        })
    }

    /// Check one snapshot event against its system's rules.
    fn check(&self, event: &Event) -> Result<(), String> {
        let Some(system) = self.system(&event.system_id) else {
            return Err(format!("no module registered for system {:?}", event.system_id));
        };
        system.validate(event).map_err(|err| err.to_string())
    }

    async fn scan(&self, campaign_id: CampaignId, validate: bool) -> Result<Outcome, MaintenanceError> {
        let mut report = ScanReport::default();
        let mut warnings = Vec::new();
        let mut cursor = self.cursor(campaign_id, self.options.after_seq);

        loop {
            let page = cursor.next_page(self.events.as_ref()).await?;
            if page.is_empty() {
                break;
            }
            for event in &page {
                report.total_events = report.total_events.saturating_add(1);
                if !event.is_system_event() {
                    continue;
                }
                report.snapshot_events = report.snapshot_events.saturating_add(1);
                if !validate {
                    continue;
                }
                if let Err(reason) = self.check(event) {
                    report.invalid_events = report.invalid_events.saturating_add(1);
                    warnings.push(format!("seq {} {}: {reason}", event.seq, event.event_type));
                }
            }
        }

        report.last_seq = self.events.last_seq(campaign_id).await?;
        debug!(
            campaign_id = %campaign_id,
            total = report.total_events,
            snapshot = report.snapshot_events,
            invalid = report.invalid_events,
            "scan finished"
        );
        Ok(Outcome {
            report: Report::Scan(report),
            warnings,
        })
    }

    /// Force a replay of snapshot events into the live projections.
    ///
    /// From the start of the log the system rows are cleared first, so the
    /// result is exactly what the log implies.
    async fn replay(&self, campaign_id: CampaignId) -> Result<Outcome, MaintenanceError> {
        let after_seq = self.options.after_seq;
        if after_seq == 0 {
            for system in &self.systems {
                self.projections
                    .clear_system_state(campaign_id, system.system_id())
                    .await?;
            }
        }

        let applier = self.applier(Arc::clone(&self.projections));
        let mut report = ScanReport::default();
        let mut cursor = self.cursor(campaign_id, after_seq);
        loop {
            let page = cursor.next_page(self.events.as_ref()).await?;
            if page.is_empty() {
                break;
            }
            for event in &page {
                report.total_events = report.total_events.saturating_add(1);
                if !event.is_system_event() {
                    continue;
                }
                report.snapshot_events = report.snapshot_events.saturating_add(1);
                applier.apply(event).await?;
                report.applied_events = report.applied_events.saturating_add(1);
            }
        }

        report.last_seq = self.events.last_seq(campaign_id).await?;
        info!(
            campaign_id = %campaign_id,
            after_seq,
            applied = report.applied_events,
            last_seq = report.last_seq,
            "replay finished"
        );
        Ok(Outcome {
            report: Report::Scan(report),
            warnings: Vec::new(),
        })
    }

    /// Replay every snapshot event into a scratch store and diff it
    /// against the live projections. Nothing live is written.
    async fn integrity(&self, campaign_id: CampaignId) -> Result<Outcome, MaintenanceError> {
        let replica: Arc<dyn ProjectionStore> = Arc::new(MemoryProjectionStore::new());
        let applier = self.applier(Arc::clone(&replica));
        let mut cursor = self.cursor(campaign_id, 0);
        loop {
            let page = cursor.next_page(self.events.as_ref()).await?;
            if page.is_empty() {
                break;
            }
            for event in page.iter().filter(|e| e.is_system_event()) {
                applier.apply(event).await?;
            }
        }

        let mut report = IntegrityReport {
            last_seq: self.events.last_seq(campaign_id).await?,
            ..IntegrityReport::default()
        };
        let mut warnings = Vec::new();
        let mut mismatched = BTreeSet::new();

        for system in &self.systems {
            let system_id = system.system_id();
            let live: BTreeMap<_, _> = self
                .projections
                .list_system_states(campaign_id, system_id)
                .await?
                .into_iter()
                .map(|row| (row.character_id, row.data))
                .collect();
            let replayed: BTreeMap<_, _> = replica
                .list_system_states(campaign_id, system_id)
                .await?
                .into_iter()
                .map(|row| (row.character_id, row.data))
                .collect();

            let characters: BTreeSet<_> = live.keys().chain(replayed.keys()).copied().collect();
            for character_id in characters {
                report.characters_checked = report.characters_checked.saturating_add(1);
                match (live.get(&character_id), replayed.get(&character_id)) {
                    (None, Some(_)) => {
                        report.missing_states = report.missing_states.saturating_add(1);
                        warnings.push(format!("{system_id} character {character_id}: no live state"));
                    }
                    (Some(_), None) => {
                        report.character_mismatches = report.character_mismatches.saturating_add(1);
                        warnings.push(format!(
                            "{system_id} character {character_id}: live state has no events behind it"
                        ));
                    }
                    (Some(l), Some(r)) if l != r => {
                        report.character_mismatches = report.character_mismatches.saturating_add(1);
                        warnings.push(format!(
                            "{system_id} character {character_id}: live state differs from replay"
                        ));
                    }
                    _ => continue,
                }
                mismatched.insert(character_id);
            }
        }
        report.mismatched_character_ids = mismatched.into_iter().collect();

        report.gm_fear_live = self.projections.get_gm_fear(campaign_id).await?.unwrap_or(0);
        report.gm_fear_replay = replica.get_gm_fear(campaign_id).await?.unwrap_or(0);
        report.gm_fear_match = report.gm_fear_live == report.gm_fear_replay;
        if !report.gm_fear_match {
            warnings.push(format!(
                "gm fear: live {} but replay {}",
                report.gm_fear_live, report.gm_fear_replay
            ));
        }

        if report.is_clean() {
            info!(campaign_id = %campaign_id, characters = report.characters_checked, "integrity check clean");
        } else {
            warn!(
                campaign_id = %campaign_id,
                mismatches = report.character_mismatches,
                missing = report.missing_states,
                gm_fear_match = report.gm_fear_match,
                "integrity check found drift"
            );
        }
        Ok(Outcome {
            report: Report::Integrity(report),
            warnings,
        })
    }
}

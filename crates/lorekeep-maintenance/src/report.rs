//! Per-campaign results and their text and JSON renderings.

use std::io::{self, Write};

use serde::Serialize;

use lorekeep_types::{CampaignId, CharacterId};

use crate::options::Mode;

/// Counts from a scan, validate, or replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Last sequence number in the campaign's log.
    pub last_seq: u64,
    /// Events read after the resume point.
    pub total_events: u64,
    /// Events read that carry a `system_id`.
    pub snapshot_events: u64,
    /// Snapshot events that failed validation.
    pub invalid_events: u64,
    /// Snapshot events re-applied to the live projections.
    pub applied_events: u64,
}

/// Differences between the live projections and a fresh replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Last sequence number in the campaign's log.
    pub last_seq: u64,
    /// Characters with a state row on either side.
    pub characters_checked: u64,
    /// Characters whose live state differs from the replay.
    pub character_mismatches: u64,
    /// Characters the replay produced that have no live state.
    pub missing_states: u64,
    /// Every character counted as a mismatch or a missing state.
    pub mismatched_character_ids: Vec<CharacterId>,
    /// Whether live and replayed GM Fear agree.
    pub gm_fear_match: bool,
    /// GM Fear in the live projections.
    pub gm_fear_live: i32,
    /// GM Fear produced by the replay.
    pub gm_fear_replay: i32,
}

impl IntegrityReport {
    /// Whether the live projections match the replay.
    pub fn is_clean(&self) -> bool {
        self.gm_fear_match && self.mismatched_character_ids.is_empty()
    }
}

/// The report body of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Report {
    /// Scan, validate, or replay counts.
    Scan(ScanReport),
    /// Integrity diff.
    Integrity(IntegrityReport),
}

/// The outcome of one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignResult {
    /// The campaign.
    pub campaign_id: CampaignId,
    /// What was done.
    pub mode: Mode,
    /// Resume point of the run.
    pub after_seq: u64,
    /// The report, when the run got far enough to produce one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    /// Warnings kept after capping.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Warnings produced before capping.
    pub warnings_total: usize,
    /// Why the run failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CampaignResult {
    /// An empty result for `campaign_id`.
    pub const fn new(campaign_id: CampaignId, mode: Mode, after_seq: u64) -> Self {
        Self {
            campaign_id,
            mode,
            after_seq,
            report: None,
            warnings: Vec::new(),
            warnings_total: 0,
            error: None,
        }
    }

    /// Whether the run failed.
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Keep at most `cap` warnings, remembering how many there were.
    pub fn set_warnings(&mut self, warnings: Vec<String>, cap: usize) {
        let (kept, total) = cap_warnings(warnings, cap);
        self.warnings = kept;
        self.warnings_total = total;
    }

    /// Write the result as one line of JSON.
    ///
    /// # Errors
    ///
    /// Propagates write and encode failures.
    pub fn write_json<W: Write>(&self, out: &mut W) -> io::Result<()> {
        serde_json::to_writer(&mut *out, self)?;
        writeln!(out)
    }

    /// Write the result for a human. The report goes to `out`; errors and
    /// warnings go to `diag`. Every line starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_text<W: Write, D: Write>(
        &self,
        out: &mut W,
        diag: &mut D,
        prefix: &str,
    ) -> io::Result<()> {
        if let Some(error) = &self.error {
            writeln!(diag, "{prefix}Error: {error}")?;
        }
        for warning in &self.warnings {
            writeln!(diag, "{prefix}Warning: {warning}")?;
        }
        let suppressed = self.warnings_total.saturating_sub(self.warnings.len());
        if suppressed > 0 {
            writeln!(diag, "{prefix}{suppressed} more warnings suppressed")?;
        }

        match &self.report {
            None => Ok(()),
            Some(Report::Integrity(r)) => {
                writeln!(out, "{prefix}Integrity check (last seq {}):", r.last_seq)?;
                writeln!(out, "{prefix}  Characters checked: {}", r.characters_checked)?;
                writeln!(out, "{prefix}  Character state mismatches: {}", r.character_mismatches)?;
                writeln!(out, "{prefix}  Missing states: {}", r.missing_states)?;
                writeln!(
                    out,
                    "{prefix}  GM fear match: {} (live {}, replay {})",
                    r.gm_fear_match, r.gm_fear_live, r.gm_fear_replay
                )
            }
            Some(Report::Scan(r)) => match self.mode {
                Mode::Validate => writeln!(
                    out,
                    "{prefix}Validated snapshot-related events (last seq {}): {} total, {} snapshot, {} invalid",
                    r.last_seq, r.total_events, r.snapshot_events, r.invalid_events
                ),
                Mode::Replay => writeln!(
                    out,
                    "{prefix}Replayed snapshot-related events after seq {} (last seq {}): {} applied",
                    self.after_seq, r.last_seq, r.applied_events
                ),
                Mode::Scan | Mode::Integrity => writeln!(
                    out,
                    "{prefix}Scanned snapshot-related events (last seq {}): {} total, {} snapshot",
                    r.last_seq, r.total_events, r.snapshot_events
                ),
            },
        }
    }
}

/// Keep the first `cap` warnings. A cap of zero keeps everything.
///
/// Returns the kept warnings and the total before capping.
pub fn cap_warnings(mut warnings: Vec<String>, cap: usize) -> (Vec<String>, usize) {
    let total = warnings.len();
    if cap > 0 {
        warnings.truncate(cap);
    }
    (warnings, total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text(result: &CampaignResult, prefix: &str) -> (String, String) {
        let mut out = Vec::new();
        let mut diag = Vec::new();
        result.write_text(&mut out, &mut diag, prefix).unwrap();
        (String::from_utf8(out).unwrap(), String::from_utf8(diag).unwrap())
    }

    fn warnings(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("w{i}")).collect()
    }

    #[test]
    fn cap_zero_keeps_everything() {
        let (kept, total) = cap_warnings(warnings(3), 0);
        assert_eq!((kept.len(), total), (3, 3));
        let (kept, total) = cap_warnings(warnings(3), 2);
        assert_eq!(kept, vec!["w1", "w2"]);
        assert_eq!(total, 3);
    }

    #[test]
    fn suppressed_warnings_are_summarized() {
        let mut result = CampaignResult::new(CampaignId::new(), Mode::Validate, 0);
        result.set_warnings(warnings(5), 2);
        let (out, diag) = text(&result, "");
        assert!(out.is_empty());
        assert!(diag.contains("Warning: w1"));
        assert!(diag.contains("Warning: w2"));
        assert!(!diag.contains("Warning: w3"));
        assert!(diag.contains("3 more warnings suppressed"));
    }

    #[test]
    fn errors_go_to_diagnostics_with_prefix() {
        let mut result = CampaignResult::new(CampaignId::new(), Mode::Scan, 0);
        result.error = Some("oops".to_owned());
        let (out, diag) = text(&result, "[c1] ");
        assert!(out.is_empty());
        assert!(diag.contains("[c1] Error: oops"));
    }

    #[test]
    fn integrity_report_text() {
        let mut result = CampaignResult::new(CampaignId::new(), Mode::Integrity, 0);
        result.report = Some(Report::Integrity(IntegrityReport {
            last_seq: 100,
            characters_checked: 4,
            character_mismatches: 2,
            missing_states: 1,
            gm_fear_match: true,
            gm_fear_live: 5,
            gm_fear_replay: 5,
            ..IntegrityReport::default()
        }));
        let (out, _) = text(&result, "");
        assert!(out.contains("Integrity check"));
        assert!(out.contains("Character state mismatches: 2"));
        assert!(out.contains("Missing states: 1"));
        assert!(out.contains("GM fear match: true"));
    }

    #[test]
    fn scan_family_text_names_the_mode() {
        let report = Report::Scan(ScanReport {
            last_seq: 50,
            total_events: 100,
            snapshot_events: 10,
            invalid_events: 3,
            applied_events: 10,
        });
        for (mode, heading) in [
            (Mode::Scan, "Scanned snapshot-related events"),
            (Mode::Validate, "Validated snapshot-related events"),
            (Mode::Replay, "Replayed snapshot-related events"),
        ] {
            let mut result = CampaignResult::new(CampaignId::new(), mode, 0);
            result.report = Some(report.clone());
            let (out, _) = text(&result, "");
            assert!(out.contains(heading), "{mode}: {out}");
        }
    }

    #[test]
    fn json_is_one_line_with_snake_case_fields() {
        let campaign_id = CampaignId::new();
        let mut result = CampaignResult::new(campaign_id, Mode::Validate, 0);
        result.report = Some(Report::Scan(ScanReport {
            last_seq: 9,
            invalid_events: 1,
            ..ScanReport::default()
        }));
        result.set_warnings(warnings(5), 1);

        let mut out = Vec::new();
        result.write_json(&mut out).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert_eq!(line.lines().count(), 1);

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["campaign_id"], campaign_id.to_string());
        assert_eq!(value["mode"], "validate");
        assert_eq!(value["warnings_total"], 5);
        assert_eq!(value["report"]["invalid_events"], 1);
        assert!(value.get("error").is_none());
    }
}

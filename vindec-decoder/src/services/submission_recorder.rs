//! Submission Recorder
//!
//! Looks for a VIN in a posted contact form, decodes it through the
//! orchestrator and links the submission to the stored decode. A form
//! without a usable VIN is not an error; it simply yields no receipt.

use super::decode_orchestrator::DecodeOrchestrator;
use super::vin_formatter::format_record;
use crate::db::{decodes, submissions};
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

/// Substrings that mark a form field as carrying a VIN
pub const VIN_FIELD_KEYWORDS: &[&str] = &["vin", "vehicle", "chassis"];

/// Posted form plus request metadata
#[derive(Debug, Clone, Default)]
pub struct FormSubmission {
    pub form_id: String,
    /// Posted fields in form order
    pub fields: Map<String, Value>,
    pub user_ip: String,
    pub user_agent: String,
}

/// Result of a recorded submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    /// `None` if the submission row could not be written
    pub submission_id: Option<i64>,
    pub decode_id: i64,
    pub vin: String,
    pub vin_field: String,
    /// Sectioned vehicle text for the notification e-mail
    pub formatted_text: String,
}

/// First field whose lowercased name contains a VIN keyword and whose value
/// is a non-empty string
pub fn find_vin_field(fields: &Map<String, Value>) -> Option<(&str, &str)> {
    fields.iter().find_map(|(name, value)| {
        let lowered = name.to_lowercase();
        let value = value.as_str().map(str::trim).filter(|v| !v.is_empty())?;
        VIN_FIELD_KEYWORDS
            .iter()
            .any(|keyword| lowered.contains(keyword))
            .then_some((name.as_str(), value))
    })
}

pub struct SubmissionRecorder {
    db: SqlitePool,
    orchestrator: Arc<DecodeOrchestrator>,
}

impl SubmissionRecorder {
    pub fn new(db: SqlitePool, orchestrator: Arc<DecodeOrchestrator>) -> Self {
        Self { db, orchestrator }
    }

    /// Decode the form's VIN and record the submission
    pub async fn record(&self, form: &FormSubmission) -> Option<SubmissionReceipt> {
        let Some((vin_field, raw_vin)) = find_vin_field(&form.fields) else {
            debug!(form_id = %form.form_id, "No VIN field in submission");
            return None;
        };

        let outcome = match self.orchestrator.decode(raw_vin).await {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(form_id = %form.form_id, vin_field, error = %e, "Submission VIN not decoded");
                return None;
            }
        };

        let decode_id = match outcome.decode_id {
            Some(id) => id,
            None => match decodes::get_by_vin(&self.db, outcome.vin.as_str()).await {
                Ok(Some(stored)) => stored.id,
                Ok(None) => return None,
                Err(e) => {
                    warn!(vin = %outcome.vin, error = %e, "Decode lookup for submission failed");
                    return None;
                }
            },
        };

        let new_submission = submissions::NewSubmission {
            vin_id: decode_id,
            form_id: form.form_id.clone(),
            submission_data: json!({
                "form_data": form.fields,
                "vin_field": vin_field,
                "vin_decoded": true,
            }),
            user_ip: form.user_ip.clone(),
            user_agent: form.user_agent.clone(),
        };

        let submission_id = match submissions::insert(&self.db, &new_submission).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(vin = %outcome.vin, error = %e, "Failed to store submission");
                None
            }
        };

        Some(SubmissionReceipt {
            submission_id,
            decode_id,
            vin: outcome.vin.to_string(),
            vin_field: vin_field.to_string(),
            formatted_text: format_record(&outcome.record),
        })
    }
}

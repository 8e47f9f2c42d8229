use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::codec::{RawRecord, RawResult};
use crate::job::JobState;
use crate::request::RequestId;
use super::outcome::{FailureReason, Outcome, ResultMap};
use super::parser::OutputParser;

/// Which artifact a result line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Output,
    Error,
}

/// A result that could not be matched to a submitted request. Always
/// unrecoverable.
///
/// Output-artifact line numbers run on across the output artifacts of a job,
/// in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unassignable {
    pub artifact: ArtifactKind,
    pub line: usize,
    pub request_id: Option<RequestId>,
    pub reason: FailureReason,
}

/// A result that was replaced by a later one for the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superseded {
    pub request_id: RequestId,
    pub artifact: ArtifactKind,
    pub line: usize,
    pub by_line: usize,
}

/// Everything reconciliation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation<T> {
    /// Exactly one outcome per submitted id.
    pub outcomes: ResultMap<T>,
    pub unassignable: Vec<Unassignable>,
    pub superseded: Vec<Superseded>,
}

/// # reconcile
///
/// Matches the raw results of a terminal job back to the submitted ids.
///
/// Every id starts out `Missing`. Output-artifact results are applied in
/// artifact order, a later result for an id replacing an earlier one (the
/// replaced line is recorded in `superseded`). Error-artifact results then
/// apply the same way, but only to ids the output artifacts never answered.
/// Whatever is left becomes an
/// unrecoverable error whose reason depends on `state`: `no_result_returned`
/// when the job produced output, the job's own failure otherwise.
///
/// Results for ids outside `ids`, or without any id, never enter the map;
/// they are reported in `unassignable`.
pub fn reconcile<P>(
    ids: &[RequestId],
    results: &[RawResult],
    error_results: &[RawResult],
    state: JobState,
    parser: &P,
) -> Reconciliation<P::Output>
where
    P: OutputParser + ?Sized,
{
    let mut outcomes: BTreeMap<RequestId, Outcome<P::Output>> =
        ids.iter().map(|id| (id.clone(), Outcome::Missing)).collect();
    let mut answered_at: BTreeMap<RequestId, usize> = BTreeMap::new();
    let mut unassignable = Vec::new();
    let mut superseded = Vec::new();

    for result in results {
        let Some(id) = assignable_id(result, ArtifactKind::Output, &outcomes, &mut unassignable) else {
            continue;
        };
        if let Some(previous) = answered_at.insert(id.clone(), result.line) {
            warn!(request_id = %id, line = previous, by_line = result.line, "duplicate result, keeping the later one");
            superseded.push(Superseded {
                request_id: id.clone(),
                artifact: ArtifactKind::Output,
                line: previous,
                by_line: result.line,
            });
        }
        outcomes.insert(id.clone(), classify(&result.record, parser));
    }

    let mut failed_at: BTreeMap<RequestId, usize> = BTreeMap::new();
    for result in error_results {
        let Some(id) = assignable_id(result, ArtifactKind::Error, &outcomes, &mut unassignable) else {
            continue;
        };
        if answered_at.contains_key(id) {
            debug!(request_id = %id, line = result.line, "error artifact entry for an answered request ignored");
            continue;
        }
        if let Some(previous) = failed_at.insert(id.clone(), result.line) {
            warn!(request_id = %id, line = previous, by_line = result.line, "duplicate error entry, keeping the later one");
            superseded.push(Superseded {
                request_id: id.clone(),
                artifact: ArtifactKind::Error,
                line: previous,
                by_line: result.line,
            });
        }
        outcomes.insert(id.clone(), classify(&result.record, parser));
    }

    let unanswered = FailureReason::for_unanswered(state);
    let mut missing = 0usize;
    for outcome in outcomes.values_mut() {
        if let Outcome::Missing = outcome {
            *outcome = Outcome::UnrecoverableError(unanswered.clone());
            missing += 1;
        }
    }
    if missing > 0 {
        warn!(missing, reason = unanswered.tag(), "requests without a result");
    }

    Reconciliation {
        outcomes: ResultMap::new(outcomes),
        unassignable,
        superseded,
    }
}

/// The id `result` belongs to, or `None` after recording it as unassignable.
fn assignable_id<'r, T>(
    result: &'r RawResult,
    artifact: ArtifactKind,
    outcomes: &BTreeMap<RequestId, Outcome<T>>,
    unassignable: &mut Vec<Unassignable>,
) -> Option<&'r RequestId> {
    let reason = match &result.request_id {
        Some(id) if outcomes.contains_key(id) => return Some(id),
        Some(id) => {
            warn!(request_id = %id, line = result.line, ?artifact, "result for an id that was never submitted");
            FailureReason::Protocol {
                detail: format!("result for unknown request id `{id}`"),
            }
        }
        None => {
            let detail = match &result.record {
                RawRecord::Undecodable(detail) => detail.clone(),
                _ => "result line has no request id".to_string(),
            };
            warn!(line = result.line, ?artifact, %detail, "result without a request id");
            FailureReason::DecodeFailure { detail }
        }
    };
    unassignable.push(Unassignable {
        artifact,
        line: result.line,
        request_id: result.request_id.clone(),
        reason,
    });
    None
}

fn classify<P>(record: &RawRecord, parser: &P) -> Outcome<P::Output>
where
    P: OutputParser + ?Sized,
{
    match record {
        RawRecord::Output(output) => match parser.parse(output) {
            Ok(value) => Outcome::Success(value),
            Err(failure) => failure.into_outcome(),
        },
        RawRecord::Error(error) if error.is_recoverable() => Outcome::RecoverableError(error.clone().into()),
        RawRecord::Error(error) => Outcome::UnrecoverableError(error.clone().into()),
        RawRecord::Undecodable(detail) => Outcome::UnrecoverableError(FailureReason::DecodeFailure {
            detail: detail.clone(),
        }),
    }
}

use crate::codec::Manifest;
use crate::job::BatchJob;
use crate::reconcile::{Outcome, OutcomeCounts, Reconciliation, ResultMap, Superseded, Unassignable};
use crate::request::Request;

/// What a finished batch returns.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResults<T> {
    /// The job, in its terminal state.
    pub job: BatchJob,
    /// One outcome per submitted request.
    pub outcomes: ResultMap<T>,
    /// Results that matched no submitted request.
    pub unassignable: Vec<Unassignable>,
    /// Results replaced by a later one for the same request.
    pub superseded: Vec<Superseded>,
    /// The service's job statistics, when it wrote any.
    pub manifest: Option<Manifest>,
}

impl<T> BatchResults<T> {
    pub(crate) fn new(job: BatchJob, reconciliation: Reconciliation<T>, manifest: Option<Manifest>) -> Self {
        Self {
            job,
            outcomes: reconciliation.outcomes,
            unassignable: reconciliation.unassignable,
            superseded: reconciliation.superseded,
            manifest,
        }
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.outcomes.counts()
    }

    pub fn get(&self, id: &str) -> Option<&Outcome<T>> {
        self.outcomes.get(id)
    }

    /// The requests from `requests` whose outcome is recoverable, in their
    /// original order, ready to go into a follow-up batch.
    pub fn retry_requests(&self, requests: &[Request]) -> Vec<Request> {
        requests
            .iter()
            .filter(|r| self.outcomes.get(r.id().as_str()).is_some_and(Outcome::is_recoverable))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::codec::{RawResult, RecordError};
    use crate::job::{JobId, JobState};
    use crate::reconcile::{reconcile, TextOutput};
    use crate::request::{Message, ModelInput, RequestId};

    #[test]
    fn test_retry_requests_keeps_only_recoverable_in_order() {
        let requests: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| Request::new(*id, ModelInput::new(vec![Message::user(*id)])))
            .collect();
        let ids: Vec<RequestId> = requests.iter().map(|r| r.id().clone()).collect();
        let results = vec![
            RawResult::error("d", RecordError::new(Some(429), "throttled")),
            RawResult::error("a", RecordError::new(Some(503), "unavailable")),
            RawResult::error("b", RecordError::new(Some(400), "bad request")),
        ];
        let rec = reconcile(&ids, &results, &[], JobState::PartiallyCompleted, &TextOutput);
        let results = BatchResults::new(BatchJob::resumed(JobId::from("job-1"), Utc::now()), rec, None);

        let retry: Vec<_> = results.retry_requests(&requests).iter().map(|r| r.id().to_string()).collect();
        assert_eq!(retry, vec!["a", "d"]);
        assert_eq!(results.counts().unrecoverable, 2);
    }
}

use std::pin::Pin;
use std::task::{Context, Poll};
use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::sync::mpsc;
use super::state::{JobId, JobState};

/// One observed state change of a watched job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub from: JobState,
    pub to: JobState,
    pub observed_at: DateTime<Utc>,
}

/// # JobUpdates
///
/// The state changes of a watched job, in the order they were observed.
///
/// Backed by an unbounded channel fed by the watch loop, so a slow consumer
/// never stalls polling. The stream ends when the loop exits, whether the job
/// reached a terminal state, the wait failed, or the watch was stopped.
pub struct JobUpdates {
    receiver: mpsc::UnboundedReceiver<JobUpdate>,
}

impl JobUpdates {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<JobUpdate>) -> Self {
        Self { receiver }
    }
}

impl Stream for JobUpdates {
    type Item = JobUpdate;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().receiver).poll_recv(cx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::mpsc::unbounded_channel;

    fn update(from: JobState, to: JobState) -> JobUpdate {
        JobUpdate {
            job_id: JobId::from("job-1"),
            from,
            to,
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_receives_updates_in_order() {
        let (tx, rx) = unbounded_channel();
        let mut stream = JobUpdates::new(rx);

        tx.send(update(JobState::Created, JobState::InProgress)).unwrap();
        tx.send(update(JobState::InProgress, JobState::Completed)).unwrap();
        drop(tx);

        let states: Vec<_> = stream.by_ref().map(|u| u.to).collect().await;
        assert_eq!(states, vec![JobState::InProgress, JobState::Completed]);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_empty_stream_ends() {
        let (tx, rx) = unbounded_channel::<JobUpdate>();
        let mut stream = JobUpdates::new(rx);
        drop(tx);
        assert_eq!(stream.next().await, None);
    }
}

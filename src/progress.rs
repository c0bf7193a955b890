// advisory-report-service/src/progress.rs
//
// In-process progress bus. One broadcast channel per in-flight report id;
// any number of subscribers (UI sessions polling the same report) observe
// the same events the local callback sees.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::ReportProgress;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Default)]
pub struct ProgressBroker {
    channels: Mutex<HashMap<String, broadcast::Sender<ReportProgress>>>,
}

impl ProgressBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a report's progress stream. Dropping the receiver
    /// unsubscribes. Subscribing before generation starts is fine; the
    /// channel is created on first use from either side.
    pub fn subscribe(&self, report_id: &str) -> broadcast::Receiver<ReportProgress> {
        let mut channels = self.channels.lock().expect("progress broker lock poisoned");
        channels
            .entry(report_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Fire-and-forget publish. A send error only means nobody is
    /// listening, which is normal for unobserved reports.
    pub fn publish(&self, progress: &ReportProgress) {
        let mut channels = self.channels.lock().expect("progress broker lock poisoned");
        if let Some(sender) = channels.get(&progress.report_id) {
            if sender.send(progress.clone()).is_err() {
                debug!(report_id = %progress.report_id, "progress published with no subscribers");
            }
        }
        // Terminal stages end the stream; drop the channel so ids don't
        // accumulate across the life of the process.
        if progress.stage.is_terminal() {
            channels.remove(&progress.report_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportStage;

    fn progress(report_id: &str, stage: ReportStage, percent: u8) -> ReportProgress {
        ReportProgress {
            report_id: report_id.to_string(),
            stage,
            percent_complete: percent,
            message: stage.as_str().to_string(),
            estimated_ms_remaining: None,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let broker = ProgressBroker::new();
        let mut rx = broker.subscribe("report-1");

        broker.publish(&progress("report-1", ReportStage::Initializing, 0));
        broker.publish(&progress("report-1", ReportStage::GatheringData, 10));

        assert_eq!(rx.recv().await.unwrap().percent_complete, 0);
        assert_eq!(rx.recv().await.unwrap().percent_complete, 10);
    }

    #[tokio::test]
    async fn report_ids_are_isolated() {
        let broker = ProgressBroker::new();
        let mut rx_a = broker.subscribe("report-a");
        let _rx_b = broker.subscribe("report-b");

        broker.publish(&progress("report-b", ReportStage::GatheringData, 10));

        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn terminal_stage_drops_the_channel() {
        let broker = ProgressBroker::new();
        let mut rx = broker.subscribe("report-1");

        broker.publish(&progress("report-1", ReportStage::Complete, 100));
        assert_eq!(rx.recv().await.unwrap().stage, ReportStage::Complete);

        let channels = broker.channels.lock().unwrap();
        assert!(channels.is_empty());
    }
}

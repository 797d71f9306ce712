/// Progress record for long-running infrastructure operations
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Encapsulates progress related information for an operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationProgress {
    /// Percent completion of the operation, in the range 0..=100
    pub progress_percent: i32,

    /// Time the request was received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// If set, the time at which this operation failed or was completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl OperationProgress {
    /// Progress for an operation starting now
    pub fn started() -> Self {
        Self {
            progress_percent: 0,
            start_time: Some(Utc::now()),
            end_time: None,
        }
    }

    /// Record `done` of `total` steps complete
    pub fn record(&mut self, done: usize, total: usize) {
        self.progress_percent = if total == 0 {
            100
        } else {
            ((done.min(total) * 100) / total) as i32
        };
    }

    /// Mark the operation as ended, successfully or not
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        self.end_time.is_some()
    }
}

impl std::fmt::Display for OperationProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.progress_percent)?;
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            write!(f, " in {}s", (end - start).num_seconds())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_percent() {
        let mut progress = OperationProgress::started();
        assert_eq!(progress.progress_percent, 0);
        assert!(progress.start_time.is_some());

        progress.record(1, 3);
        assert_eq!(progress.progress_percent, 33);

        progress.record(3, 3);
        assert_eq!(progress.progress_percent, 100);

        // Overshooting never goes past 100
        progress.record(5, 3);
        assert_eq!(progress.progress_percent, 100);
    }

    #[test]
    fn test_nothing_to_do_is_complete() {
        let mut progress = OperationProgress::started();
        progress.record(0, 0);
        assert_eq!(progress.progress_percent, 100);
        assert!(!progress.is_done());

        progress.finish();
        assert!(progress.is_done());
    }

    #[test]
    fn test_json_field_names() {
        let progress = OperationProgress {
            progress_percent: 42,
            start_time: None,
            end_time: None,
        };
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json, serde_json::json!({ "progressPercent": 42 }));

        let parsed: OperationProgress = serde_json::from_str(
            r#"{"progressPercent":100,"startTime":"2024-01-01T00:00:00Z","endTime":"2024-01-01T00:00:10Z"}"#,
        )
        .unwrap();
        assert_eq!(parsed.to_string(), "100% in 10s");
    }
}

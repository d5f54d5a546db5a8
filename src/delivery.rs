//! Simulated delivery tracking.
//!
//! Nothing about delivery is stored except `orders.delivery_started_at`. The
//! status shown to a customer is recomputed from the elapsed time on every
//! read, so there is no job that advances orders.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Processing,
    EnRoute,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Processing => "PROCESSING",
            DeliveryStatus::EnRoute => "EN_ROUTE",
            DeliveryStatus::Delivered => "DELIVERED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryProgress {
    pub delivery_status: DeliveryStatus,
    /// Seconds until the next transition; zero once delivered.
    pub seconds_remaining: i64,
    /// Share of the whole timeline that has elapsed, 0..=100.
    pub progress: u8,
    pub is_delivered: bool,
}

/// Lengths of the two phases before an order counts as delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryTimeline {
    processing: Duration,
    en_route: Duration,
}

impl Default for DeliveryTimeline {
    fn default() -> Self {
        DeliveryTimeline::from_seconds(60, 60)
    }
}

impl DeliveryTimeline {
    pub fn from_seconds(processing: i64, en_route: i64) -> Self {
        DeliveryTimeline {
            processing: Duration::seconds(processing.max(1)),
            en_route: Duration::seconds(en_route.max(1)),
        }
    }

    pub fn total(&self) -> Duration {
        self.processing + self.en_route
    }

    pub fn progress(
        &self,
        started_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DeliveryProgress {
        let Some(started_at) = started_at else {
            return DeliveryProgress {
                delivery_status: DeliveryStatus::Processing,
                seconds_remaining: self.processing.num_seconds(),
                progress: 0,
                is_delivered: false,
            };
        };

        // A start in the future (clock skew between hosts) counts as just started.
        let elapsed = (now - started_at).max(Duration::zero());
        let total = self.total();

        let (delivery_status, remaining) = if elapsed < self.processing {
            (DeliveryStatus::Processing, self.processing - elapsed)
        } else if elapsed < total {
            (DeliveryStatus::EnRoute, total - elapsed)
        } else {
            (DeliveryStatus::Delivered, Duration::zero())
        };

        let progress = if delivery_status == DeliveryStatus::Delivered {
            100
        } else {
            let pct = elapsed.num_milliseconds() * 100 / total.num_milliseconds();
            pct.clamp(0, 100) as u8
        };

        DeliveryProgress {
            delivery_status,
            seconds_remaining: remaining.num_seconds(),
            progress,
            is_delivered: delivery_status == DeliveryStatus::Delivered,
        }
    }

    pub fn status(&self, started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DeliveryStatus {
        self.progress(started_at, now).delivery_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 20, 9, 0, 0).unwrap()
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        start() + Duration::seconds(seconds)
    }

    #[test]
    fn untracked_order_is_processing_with_no_progress() {
        let timeline = DeliveryTimeline::default();
        let p = timeline.progress(None, at(500));
        assert_eq!(p.delivery_status, DeliveryStatus::Processing);
        assert_eq!(p.progress, 0);
        assert_eq!(p.seconds_remaining, 60);
        assert!(!p.is_delivered);
    }

    #[test]
    fn freshly_started_order_is_processing() {
        let timeline = DeliveryTimeline::default();
        let p = timeline.progress(Some(start()), at(0));
        assert_eq!(p.delivery_status, DeliveryStatus::Processing);
        assert!(p.seconds_remaining > 0 && p.seconds_remaining <= 60);
        assert_eq!(p.progress, 0);
    }

    #[test]
    fn passes_through_en_route_after_processing_window() {
        let timeline = DeliveryTimeline::default();
        let p = timeline.progress(Some(start()), at(70));
        assert_eq!(p.delivery_status, DeliveryStatus::EnRoute);
        assert_eq!(p.seconds_remaining, 50);
        assert_eq!(p.progress, 58);
    }

    #[test]
    fn boundaries_belong_to_the_later_phase() {
        let timeline = DeliveryTimeline::default();
        assert_eq!(timeline.status(Some(start()), at(59)), DeliveryStatus::Processing);
        assert_eq!(timeline.status(Some(start()), at(60)), DeliveryStatus::EnRoute);
        assert_eq!(timeline.status(Some(start()), at(119)), DeliveryStatus::EnRoute);
        assert_eq!(timeline.status(Some(start()), at(120)), DeliveryStatus::Delivered);
    }

    #[test]
    fn delivered_order_is_complete() {
        let timeline = DeliveryTimeline::default();
        let p = timeline.progress(Some(start()), at(150));
        assert_eq!(p.delivery_status, DeliveryStatus::Delivered);
        assert_eq!(p.seconds_remaining, 0);
        assert_eq!(p.progress, 100);
        assert!(p.is_delivered);
    }

    #[test]
    fn clock_behind_start_counts_as_zero_elapsed() {
        let timeline = DeliveryTimeline::from_seconds(30, 90);
        let p = timeline.progress(Some(start()), at(-20));
        assert_eq!(p.delivery_status, DeliveryStatus::Processing);
        assert_eq!(p.seconds_remaining, 30);
        assert_eq!(p.progress, 0);
    }

    #[test]
    fn serializes_with_wire_names() {
        let timeline = DeliveryTimeline::default();
        let json = serde_json::to_value(timeline.progress(Some(start()), at(61))).unwrap();
        assert_eq!(json["delivery_status"], "EN_ROUTE");
        assert_eq!(json["is_delivered"], false);
    }
}

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const RECENT_CALLS: usize = 4;
pub const DAILY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallOutcome {
    Success,
    Failed,
    #[default]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: String,
    #[serde(default)]
    pub owner: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    /// Whole seconds.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub outcome: CallOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_data: Option<Value>,
    #[serde(default)]
    pub ai_suggestions_used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    pub title: Option<String>,
    pub contact_name: Option<String>,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub outcome: CallOutcome,
    pub score: Option<f64>,
    pub performance_data: Option<Value>,
    #[serde(default)]
    pub ai_suggestions_used: bool,
}

impl Call {
    pub fn new(owner: String, title: String, request: CreateCallRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner,
            title,
            contact_name: request.contact_name,
            duration: request.duration,
            outcome: request.outcome,
            score: request.score,
            performance_data: request.performance_data,
            ai_suggestions_used: request.ai_suggestions_used,
            created_at: Utc::now(),
        }
    }
}

/// `{ success, data }` wrapper used by the call and analytics endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CallList {
    #[serde(default)]
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCallData {
    pub date: NaiveDate,
    pub calls: u64,
    pub successful: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsData {
    pub total_calls: u64,
    /// Percentage, 0-100.
    pub success_rate: f64,
    /// Seconds, rounded.
    pub average_duration: u64,
    /// Percentage, 0-100.
    pub ai_suggestions_used_rate: f64,
    pub daily_call_data: Vec<DailyCallData>,
    pub recent_calls: Vec<Call>,
}

impl AnalyticsData {
    /// Headline figures only; no daily breakdown, recent calls as given.
    pub fn summarize(calls: &[Call]) -> Self {
        let total = calls.len() as u64;
        if total == 0 {
            return Self::default();
        }

        let successful = calls.iter().filter(|c| c.outcome == CallOutcome::Success).count();
        let assisted = calls.iter().filter(|c| c.ai_suggestions_used).count();
        let duration: u64 = calls.iter().map(|c| c.duration).sum();

        Self {
            total_calls: total,
            success_rate: percentage(successful as u64, total),
            average_duration: (duration as f64 / total as f64).round() as u64,
            ai_suggestions_used_rate: percentage(assisted as u64, total),
            daily_call_data: Vec::new(),
            recent_calls: calls.to_vec(),
        }
    }

    /// Full analytics over an owner's calls, which must be newest first.
    pub fn compute(calls: &[Call], today: NaiveDate) -> Self {
        let mut analytics = Self::summarize(calls);
        analytics.recent_calls = calls.iter().take(RECENT_CALLS).cloned().collect();
        analytics.daily_call_data = (0..DAILY_WINDOW_DAYS)
            .rev()
            .map(|back| {
                let date = today - Duration::days(back);
                let day: Vec<&Call> = calls
                    .iter()
                    .filter(|c| c.created_at.date_naive() == date)
                    .collect();
                DailyCallData {
                    date,
                    calls: day.len() as u64,
                    successful: day
                        .iter()
                        .filter(|c| c.outcome == CallOutcome::Success)
                        .count() as u64,
                }
            })
            .collect();
        analytics
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    let raw = part as f64 * 100.0 / total as f64;
    (raw * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(outcome: CallOutcome, duration: u64, ai: bool, created_at: DateTime<Utc>) -> Call {
        Call {
            id: Uuid::new_v4().to_string(),
            owner: "alice".into(),
            title: "Discovery".into(),
            contact_name: None,
            duration,
            outcome,
            score: None,
            performance_data: None,
            ai_suggestions_used: ai,
            created_at,
        }
    }

    #[test]
    fn empty_history_is_all_zero() {
        let analytics = AnalyticsData::compute(&[], Utc::now().date_naive());
        assert_eq!(analytics.total_calls, 0);
        assert_eq!(analytics.success_rate, 0.0);
        assert_eq!(analytics.daily_call_data.len(), DAILY_WINDOW_DAYS as usize);
        assert!(analytics.daily_call_data.iter().all(|d| d.calls == 0));
    }

    #[test]
    fn aggregates_rates_and_days() {
        let now = Utc::now();
        let calls = vec![
            call(CallOutcome::Success, 120, true, now),
            call(CallOutcome::Failed, 60, false, now),
            call(CallOutcome::Success, 30, false, now - Duration::days(2)),
            call(CallOutcome::Pending, 10, true, now - Duration::days(3)),
            call(CallOutcome::Success, 80, false, now - Duration::days(30)),
        ];

        let analytics = AnalyticsData::compute(&calls, now.date_naive());

        assert_eq!(analytics.total_calls, 5);
        assert_eq!(analytics.success_rate, 60.0);
        assert_eq!(analytics.average_duration, 60);
        assert_eq!(analytics.ai_suggestions_used_rate, 40.0);
        assert_eq!(analytics.recent_calls.len(), RECENT_CALLS);

        let today = analytics.daily_call_data.last().unwrap();
        assert_eq!(today.date, now.date_naive());
        assert_eq!(today.calls, 2);
        assert_eq!(today.successful, 1);
        let total_in_window: u64 = analytics.daily_call_data.iter().map(|d| d.calls).sum();
        assert_eq!(total_in_window, 4);
    }

    #[test]
    fn envelope_without_data_deserializes() {
        let env: ApiEnvelope<AnalyticsData> =
            serde_json::from_str(r#"{"success":false,"message":"nope"}"#).unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());
    }
}

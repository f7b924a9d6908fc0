//! Terminal dashboard: headline call analytics, a seven-day breakdown and the
//! most recent calls.
//!
//! Loading never fails. If the analytics endpoint is unavailable the view is
//! rebuilt from the plain calls list, and if that fails too it shows zeroes.

use crate::call_models::{AnalyticsData, ApiEnvelope, Call, CallList, RECENT_CALLS};
use anyhow::Result;
use async_trait::async_trait;
use prettytable::{Cell, Row, Table};
use serde_json::Value;
use tracing::warn;

pub const LOADING_MESSAGE: &str = "Loading dashboard...";
pub const EMPTY_MESSAGE: &str = "No calls yet. Logged calls will show up here.";

/// Where the dashboard gets its numbers from.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn analytics(&self) -> Result<ApiEnvelope<AnalyticsData>>;
    async fn recent_calls(&self, limit: usize) -> Result<ApiEnvelope<CallList>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Analytics,
    CallsList,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub data: AnalyticsData,
    pub origin: DataOrigin,
}

impl Dashboard {
    pub fn is_empty(&self) -> bool {
        self.data.recent_calls.is_empty()
    }
}

/// Issues the analytics request and, only if that fails, one calls-list request.
pub async fn load<S>(source: &S) -> Dashboard
where
    S: DashboardSource + ?Sized,
{
    match source.analytics().await {
        Ok(ApiEnvelope {
            success: true,
            data: Some(data),
            ..
        }) => {
            return Dashboard {
                data,
                origin: DataOrigin::Analytics,
            }
        }
        Ok(envelope) => warn!(
            reason = envelope.message.as_deref().unwrap_or("no data"),
            "analytics request reported failure, falling back to calls list"
        ),
        Err(e) => warn!(error = %format!("{e:#}"), "analytics request failed, falling back to calls list"),
    }

    match source.recent_calls(RECENT_CALLS).await {
        Ok(ApiEnvelope {
            success: true,
            data: Some(list),
            ..
        }) => Dashboard {
            data: AnalyticsData::summarize(&list.calls),
            origin: DataOrigin::CallsList,
        },
        Ok(envelope) => {
            warn!(
                reason = envelope.message.as_deref().unwrap_or("no data"),
                "calls list reported failure"
            );
            unavailable()
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "calls list request failed");
            unavailable()
        }
    }
}

fn unavailable() -> Dashboard {
    Dashboard {
        data: AnalyticsData::default(),
        origin: DataOrigin::Unavailable,
    }
}

/// A call's score as shown to the rep. Calls nobody scored stay unscored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayScore {
    Scored(f64),
    Unscored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
    Neutral,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Neutral => "neutral",
        }
    }

    fn style(self) -> &'static str {
        match self {
            Severity::Success => "Fg",
            Severity::Warning => "Fy",
            Severity::Error => "Fr",
            Severity::Neutral => "",
        }
    }
}

impl DisplayScore {
    pub fn severity(self) -> Severity {
        match self {
            DisplayScore::Scored(score) => severity_for(score),
            DisplayScore::Unscored => Severity::Neutral,
        }
    }
}

impl std::fmt::Display for DisplayScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayScore::Scored(score) => write!(f, "{}", score.round() as i64),
            DisplayScore::Unscored => f.write_str("unscored"),
        }
    }
}

pub fn severity_for(score: f64) -> Severity {
    if score >= 80.0 {
        Severity::Success
    } else if score >= 70.0 {
        Severity::Warning
    } else {
        Severity::Error
    }
}

/// The call's own score, else one recorded in its performance data.
pub fn display_score(call: &Call) -> DisplayScore {
    call.score
        .or_else(|| call.performance_data.as_ref().and_then(performance_score))
        .map(DisplayScore::Scored)
        .unwrap_or(DisplayScore::Unscored)
}

fn performance_score(data: &Value) -> Option<f64> {
    ["overallScore", "score"].iter().find_map(|key| match data.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else {
        format!("{}m", seconds / 60)
    }
}

pub fn stats_table(data: &AnalyticsData) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Total Calls"),
        Cell::new("Success Rate"),
        Cell::new("Avg Duration"),
        Cell::new("AI Suggestions Used"),
    ]));
    table.add_row(Row::new(vec![
        Cell::new(&data.total_calls.to_string()),
        Cell::new(&format!("{:.1}%", data.success_rate)),
        Cell::new(&format_duration(data.average_duration)),
        Cell::new(&format!("{:.1}%", data.ai_suggestions_used_rate)),
    ]));
    table
}

pub fn daily_table(data: &AnalyticsData) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Date"),
        Cell::new("Calls"),
        Cell::new("Successful"),
    ]));
    for day in &data.daily_call_data {
        table.add_row(Row::new(vec![
            Cell::new(&day.date.format("%a %b %d").to_string()),
            Cell::new(&day.calls.to_string()),
            Cell::new(&day.successful.to_string()),
        ]));
    }
    table
}

pub fn recent_calls_table(calls: &[Call]) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Call"),
        Cell::new("Contact"),
        Cell::new("Duration"),
        Cell::new("Score"),
        Cell::new("When"),
    ]));
    for call in calls {
        let score = display_score(call);
        table.add_row(Row::new(vec![
            Cell::new(&call.title),
            Cell::new(call.contact_name.as_deref().unwrap_or("-")),
            Cell::new(&format_duration(call.duration)),
            Cell::new(&score.to_string()).style_spec(score.severity().style()),
            Cell::new(&call.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]));
    }
    table
}

pub fn print(dashboard: &Dashboard) {
    if dashboard.origin == DataOrigin::Unavailable {
        println!("⚠️  Call data is unavailable right now.");
    }

    println!("\n📊 Call Overview\n");
    stats_table(&dashboard.data).printstd();

    if !dashboard.data.daily_call_data.is_empty() {
        println!("\n📅 Last {} Days\n", dashboard.data.daily_call_data.len());
        daily_table(&dashboard.data).printstd();
    }

    println!("\n📞 Recent Calls\n");
    if dashboard.is_empty() {
        println!("{EMPTY_MESSAGE}");
    } else {
        recent_calls_table(&dashboard.data.recent_calls).printstd();
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_models::CallOutcome;
    use anyhow::anyhow;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn call(title: &str, score: Option<f64>, performance_data: Option<Value>) -> Call {
        Call {
            id: title.to_string(),
            owner: "alice".into(),
            title: title.to_string(),
            contact_name: None,
            duration: 95,
            outcome: CallOutcome::Success,
            score,
            performance_data,
            ai_suggestions_used: false,
            created_at: Utc::now(),
        }
    }

    struct FakeSource {
        analytics: fn() -> Result<ApiEnvelope<AnalyticsData>>,
        calls: fn() -> Result<ApiEnvelope<CallList>>,
        analytics_requests: AtomicUsize,
        calls_requests: AtomicUsize,
    }

    impl FakeSource {
        fn new(
            analytics: fn() -> Result<ApiEnvelope<AnalyticsData>>,
            calls: fn() -> Result<ApiEnvelope<CallList>>,
        ) -> Self {
            Self {
                analytics,
                calls,
                analytics_requests: AtomicUsize::new(0),
                calls_requests: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DashboardSource for FakeSource {
        async fn analytics(&self) -> Result<ApiEnvelope<AnalyticsData>> {
            self.analytics_requests.fetch_add(1, Ordering::SeqCst);
            (self.analytics)()
        }

        async fn recent_calls(&self, limit: usize) -> Result<ApiEnvelope<CallList>> {
            assert_eq!(limit, RECENT_CALLS);
            self.calls_requests.fetch_add(1, Ordering::SeqCst);
            (self.calls)()
        }
    }

    fn two_calls() -> Result<ApiEnvelope<CallList>> {
        Ok(ApiEnvelope::ok(CallList {
            calls: vec![call("a", Some(90.0), None), call("b", None, None)],
        }))
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(60), "1m");
        assert_eq!(format_duration(125), "2m");
    }

    #[test]
    fn severity_bands() {
        assert_eq!(severity_for(80.0), Severity::Success);
        assert_eq!(severity_for(79.9), Severity::Warning);
        assert_eq!(severity_for(70.0), Severity::Warning);
        assert_eq!(severity_for(69.0), Severity::Error);
        assert_eq!(DisplayScore::Unscored.severity(), Severity::Neutral);
    }

    #[test]
    fn score_sources_in_order() {
        let own = call("a", Some(72.0), Some(json!({ "overallScore": 95 })));
        assert_eq!(display_score(&own), DisplayScore::Scored(72.0));

        let embedded = call("b", None, Some(json!({ "overallScore": "88" })));
        assert_eq!(display_score(&embedded), DisplayScore::Scored(88.0));

        let plain = call("c", None, Some(json!({ "score": 64.5 })));
        assert_eq!(display_score(&plain), DisplayScore::Scored(64.5));

        let none = call("d", None, Some(json!({ "talkRatio": 0.4 })));
        assert_eq!(display_score(&none), DisplayScore::Unscored);
        assert_eq!(display_score(&none).to_string(), "unscored");
    }

    #[tokio::test]
    async fn analytics_success_skips_fallback() {
        let source = FakeSource::new(
            || {
                Ok(ApiEnvelope::ok(AnalyticsData {
                    total_calls: 3,
                    ..Default::default()
                }))
            },
            two_calls,
        );

        let dashboard = load(&source).await;

        assert_eq!(dashboard.origin, DataOrigin::Analytics);
        assert_eq!(dashboard.data.total_calls, 3);
        assert_eq!(source.calls_requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_analytics_falls_back_once() {
        let source = FakeSource::new(|| Err(anyhow!("connection refused")), two_calls);

        let dashboard = load(&source).await;

        assert_eq!(source.analytics_requests.load(Ordering::SeqCst), 1);
        assert_eq!(source.calls_requests.load(Ordering::SeqCst), 1);
        assert_eq!(dashboard.origin, DataOrigin::CallsList);
        assert_eq!(dashboard.data.recent_calls.len(), 2);
        assert_eq!(dashboard.data.total_calls, 2);
        assert_eq!(dashboard.data.success_rate, 100.0);
    }

    #[tokio::test]
    async fn unsuccessful_envelope_also_falls_back() {
        let source = FakeSource::new(
            || {
                Ok(ApiEnvelope {
                    success: false,
                    data: None,
                    message: Some("analytics offline".into()),
                })
            },
            two_calls,
        );

        let dashboard = load(&source).await;
        assert_eq!(dashboard.origin, DataOrigin::CallsList);
        assert_eq!(source.calls_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_failing_degrades_to_zeroes() {
        let source = FakeSource::new(|| Err(anyhow!("down")), || Err(anyhow!("still down")));

        let dashboard = load(&source).await;

        assert_eq!(dashboard.origin, DataOrigin::Unavailable);
        assert_eq!(dashboard.data, AnalyticsData::default());
        assert!(dashboard.is_empty());
        assert_eq!(source.calls_requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn recent_calls_table_shows_formatted_values() {
        let rendered = recent_calls_table(&[call("Acme renewal", None, None)]).to_string();
        assert!(rendered.contains("Acme renewal"));
        assert!(rendered.contains("1m"));
        assert!(rendered.contains("unscored"));

        let stats = stats_table(&AnalyticsData::default()).to_string();
        assert!(stats.contains("0s"));
        assert!(stats.contains("0.0%"));
    }
}

//! Out-of-band notification when a learner exhausts a topic's sentence pool.
//!
//! Delivery is fire-and-forget: the dispatcher spawns the send and only logs
//! the result.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use drill_core::Clock;
use drill_core::model::FilterAxis;

use crate::config::NotifierConfig;
use crate::error::NotifierError;
use crate::sessions::CompletionNotice;

/// Receiver of pool-exhaustion notices.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    /// Deliver one notice.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError` if delivery fails; callers only log it.
    async fn notify(&self, notice: &CompletionNotice) -> Result<(), NotifierError>;
}

//
// ─── HTTP ──────────────────────────────────────────────────────────────────────
//

/// Posts notices as JSON to a configured endpoint.
#[derive(Clone)]
pub struct HttpCompletionNotifier {
    client: Client,
    config: Option<NotifierConfig>,
    clock: Clock,
}

impl HttpCompletionNotifier {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(NotifierConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<NotifierConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl CompletionNotifier for HttpCompletionNotifier {
    async fn notify(&self, notice: &CompletionNotice) -> Result<(), NotifierError> {
        let config = self.config.as_ref().ok_or(NotifierError::Disabled)?;
        let payload = NotificationPayload::new(notice, self.clock.now());

        let response = self
            .client
            .post(&config.endpoint)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifierError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

/// Wire body; filter axes are comma-joined and omitted for unfiltered topics.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct NotificationPayload {
    category: String,
    subcategory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    case_filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    number_filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    definiteness_filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exemplar_filters: Option<String>,
    completed_at: String,
}

impl NotificationPayload {
    fn new(notice: &CompletionNotice, completed_at: DateTime<Utc>) -> Self {
        let axis = |axis: FilterAxis| notice.filters.as_ref().map(|f| f.joined(axis));
        Self {
            category: notice.topic.word_category().to_owned(),
            subcategory: notice.topic.subcategory().to_owned(),
            case_filters: axis(FilterAxis::Case),
            number_filters: axis(FilterAxis::Number),
            definiteness_filters: axis(FilterAxis::Definiteness),
            exemplar_filters: axis(FilterAxis::Exemplar),
            completed_at: completed_at.to_rfc3339(),
        }
    }
}

//
// ─── DISPATCH ──────────────────────────────────────────────────────────────────
//

/// Sends notices in the background so the session never waits on them.
#[derive(Default)]
pub struct NotificationDispatcher {
    notifier: Option<Arc<dyn CompletionNotifier>>,
    in_flight: Vec<JoinHandle<()>>,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(notifier: Arc<dyn CompletionNotifier>) -> Self {
        Self {
            notifier: Some(notifier),
            in_flight: Vec::new(),
        }
    }

    /// A dispatcher that drops every notice.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Spawn delivery of `notice` on the current tokio runtime.
    pub fn dispatch(&mut self, notice: CompletionNotice) {
        let Some(notifier) = self.notifier.clone() else {
            debug!(topic = %notice.topic, "no notifier configured; dropping notice");
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!(topic = %notice.topic, "no async runtime; completion notice not sent");
            return;
        };

        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.push(runtime.spawn(async move {
            match notifier.notify(&notice).await {
                Ok(()) => debug!(topic = %notice.topic, "completion notice sent"),
                Err(NotifierError::Disabled) => {
                    debug!(topic = %notice.topic, "notifier disabled; notice skipped");
                }
                Err(err) => warn!(topic = %notice.topic, error = %err, "completion notice failed"),
            }
        }));
    }

    /// Wait for every notice sent so far to settle.
    pub async fn flush(&mut self) {
        for handle in self.in_flight.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "completion notice task aborted");
            }
        }
    }
}

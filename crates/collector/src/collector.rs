//! The per-visit collector instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use tracking_core::limits::{
    MAX_BATCH_EVENTS, MAX_CATEGORY_LEN, MAX_CLICK_TEXT_LEN, MAX_ELEMENT_ID_LEN,
    MAX_FIELD_NAME_LEN, MAX_FIELD_VALUE_LEN, MAX_INPUT_TYPE_LEN, MAX_PATH_LEN, MAX_TAG_LEN,
    MAX_TITLE_LEN,
};
use tracking_core::{
    event_types, ClickDetails, DeviceInfo, FieldChangeDetails, FinalizeRequest, FormSubmitDetails,
    InteractionSubmission, MetricSubmission, PageExitDetails, PageVisitDetails,
    SelectionSubmission, SnapshotSubmission, TriggerEvent,
};

use crate::batch::InteractionBuffer;
use crate::config::CollectorConfig;
use crate::debounce::Debouncer;
use crate::error::DeliveryError;
use crate::inflight::InFlight;
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, Payload, Transport};

/// Visit attributes stamped on every interaction.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub session_id: String,
    /// Landing URL, used server-side for `utm_source`.
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub device: DeviceInfo,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }
}

/// Configuration state attached to the exit beacon.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalConfiguration {
    pub data: Value,
    pub total_price: i64,
}

#[derive(Debug)]
struct PageState {
    path: Option<String>,
    entered_at: Instant,
}

struct Shared {
    context: SessionContext,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    debouncer: Debouncer,
    buffer: Mutex<InteractionBuffer>,
    flush_interval: Duration,
    in_flight: InFlight,
    page: Mutex<PageState>,
    finalized: AtomicBool,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Truncate to the server's field limit. A batch with one oversized field
/// is rejected whole.
fn clamp(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

fn clamp_opt(value: Option<&str>, max_chars: usize) -> Option<String> {
    value.map(|v| clamp(v, max_chars))
}

fn to_value<T: Serialize>(details: &T) -> Value {
    serde_json::to_value(details).unwrap_or(Value::Null)
}

impl Shared {
    fn submission(
        &self,
        event_type: &str,
        category: &str,
        element_id: Option<String>,
        details: Value,
    ) -> InteractionSubmission {
        InteractionSubmission {
            session_id: self.context.session_id.clone(),
            event_type: event_type.to_string(),
            category: clamp(category, MAX_CATEGORY_LEN),
            element_id: element_id.map(|id| clamp(&id, MAX_ELEMENT_ID_LEN)),
            selection_value: None,
            previous_value: None,
            time_spent: None,
            device_info: self.context.device.clone(),
            timestamp: Some(now_ms()),
            url: self.context.url.clone(),
            referrer: self.context.referrer.clone(),
            utm_source: self.context.utm_source.clone(),
            additional_data: details,
        }
    }

    fn time_on_page(&self) -> Duration {
        self.page.lock().entered_at.elapsed()
    }

    fn enqueue(&self, submission: InteractionSubmission) {
        let full = self.buffer.lock().push(submission);
        if let Some(batch) = full {
            self.dispatch(Payload::Interactions(batch));
        }
    }

    fn flush(&self) {
        let batch = self.buffer.lock().take();
        if !batch.is_empty() {
            self.dispatch(Payload::Interactions(batch));
        }
    }

    fn flush_aged(&self) {
        let aged = self.buffer.lock().take_aged(self.flush_interval);
        if let Some(batch) = aged {
            self.dispatch(Payload::Interactions(batch));
        }
    }

    /// Deliver in the background. Failures are logged, never surfaced.
    fn dispatch(&self, payload: Payload) {
        let guard = self.in_flight.track();
        let transport = self.transport.clone();
        let retry = self.retry.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = retry.run(|| transport.send(&payload)).await {
                warn!(kind = payload.kind(), error = %e, "Delivery failed");
            }
        });
    }

    fn finalize_request(&self, configuration: Option<FinalConfiguration>) -> FinalizeRequest {
        let (configuration_data, total_price) = match configuration {
            Some(c) => (Some(c.data), Some(c.total_price)),
            None => (None, None),
        };
        FinalizeRequest {
            session_id: self.context.session_id.clone(),
            configuration_data,
            total_price,
            timestamp: Some(now_ms()),
        }
    }
}

/// Observes one visit and ships its interactions.
///
/// Must be created and used inside a Tokio runtime: deliveries, debounce
/// windows and the periodic flush run as tasks.
pub struct Collector {
    shared: Arc<Shared>,
    flusher: JoinHandle<()>,
}

impl Collector {
    pub fn new(config: &CollectorConfig, context: SessionContext, transport: Arc<dyn Transport>) -> Self {
        let shared = Arc::new(Shared {
            context,
            transport,
            retry: config.retry.clone(),
            debouncer: Debouncer::new(config.debounce_window()),
            buffer: Mutex::new(InteractionBuffer::new(config.batch_limit())),
            flush_interval: config.flush_interval(),
            in_flight: InFlight::new(),
            page: Mutex::new(PageState {
                path: None,
                entered_at: Instant::now(),
            }),
            finalized: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&shared);
        let interval = config.flush_interval();
        let flusher = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(shared) => shared.flush_aged(),
                    None => break,
                }
            }
        });

        debug!(session_id = %shared.context.session_id, "Collector started");
        Self { shared, flusher }
    }

    /// Collector delivering over HTTP to `config.endpoint`.
    pub fn with_http(config: &CollectorConfig, context: SessionContext) -> Result<Self, DeliveryError> {
        let transport = HttpTransport::new(&config.endpoint, config.request_timeout())?;
        Ok(Self::new(config, context, Arc::new(transport)))
    }

    pub fn session_id(&self) -> &str {
        &self.shared.context.session_id
    }

    /// Interactions not yet handed to the transport.
    pub fn buffered(&self) -> usize {
        self.shared.buffer.lock().len() + self.shared.debouncer.open_windows()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.len()
    }

    /// The visitor moved to `path`. Emits a `page_visit` carrying the time
    /// spent on the previous page.
    pub fn observe_navigation(&self, path: &str, title: Option<&str>) {
        let path = clamp(path, MAX_PATH_LEN);
        let (previous_path, spent) = {
            let mut page = self.shared.page.lock();
            let spent = page.entered_at.elapsed().as_millis() as i64;
            page.entered_at = Instant::now();
            (page.path.replace(path.clone()), spent)
        };
        let previous_page_time_ms = previous_path.as_ref().map(|_| spent);

        let details = PageVisitDetails {
            path,
            title: clamp_opt(title, MAX_TITLE_LEN),
            previous_path,
            previous_page_time_ms,
        };
        let mut submission =
            self.shared
                .submission(event_types::PAGE_VISIT, "navigation", None, to_value(&details));
        submission.time_spent = previous_page_time_ms;
        self.shared.enqueue(submission);
    }

    /// A click on `element_id`. Repeats inside the debounce window fold into
    /// one event.
    pub fn observe_click(&self, element_id: &str, category: &str, tag: Option<&str>, text: Option<&str>) {
        let details = ClickDetails {
            tag: clamp_opt(tag, MAX_TAG_LEN),
            text: clamp_opt(text, MAX_CLICK_TEXT_LEN),
            click_count: 1,
        };
        let key = clamp(element_id, MAX_ELEMENT_ID_LEN);
        let submission = self.shared.submission(
            event_types::CLICK,
            category,
            Some(key.clone()),
            Value::Null,
        );

        if let Some(token) = self
            .shared
            .debouncer
            .observe(&key, submission, details, now_ms())
        {
            let shared = self.shared.clone();
            tokio::spawn(async move {
                tokio::time::sleep(shared.debouncer.window()).await;
                if let Some(event) = shared.debouncer.close(&key, token) {
                    shared.enqueue(event);
                }
            });
        }
    }

    pub fn observe_field_change(
        &self,
        field_name: &str,
        value: &str,
        previous: Option<&str>,
        form_id: Option<&str>,
        input_type: Option<&str>,
    ) {
        let field_name = clamp(field_name, MAX_FIELD_NAME_LEN);
        let details = FieldChangeDetails {
            field_name: Some(field_name.clone()),
            form_id: clamp_opt(form_id, MAX_FIELD_NAME_LEN),
            input_type: clamp_opt(input_type, MAX_INPUT_TYPE_LEN),
        };
        let mut submission = self.shared.submission(
            event_types::FIELD_CHANGE,
            "form",
            Some(field_name),
            to_value(&details),
        );
        submission.selection_value = Some(clamp(value, MAX_FIELD_VALUE_LEN));
        submission.previous_value = clamp_opt(previous, MAX_FIELD_VALUE_LEN);
        self.shared.enqueue(submission);
    }

    /// A form was submitted. The buffer is flushed right away.
    pub fn observe_form_submit(&self, form_id: &str, field_count: Option<u32>) {
        let form_id = clamp(form_id, MAX_FIELD_NAME_LEN);
        let details = FormSubmitDetails {
            form_id: form_id.clone(),
            field_count,
        };
        let mut submission = self.shared.submission(
            event_types::FORM_SUBMIT,
            "form",
            Some(form_id),
            to_value(&details),
        );
        submission.time_spent = Some(self.shared.time_on_page().as_millis() as i64);
        self.shared.enqueue(submission);
        self.shared.flush();
    }

    /// A configuration field changed. Sent immediately.
    pub fn track_selection(
        &self,
        category: &str,
        selection: &str,
        previous: Option<&str>,
        total_price: i64,
        price_change: i64,
    ) {
        self.shared.dispatch(Payload::Selection(SelectionSubmission {
            session_id: self.shared.context.session_id.clone(),
            category: clamp(category, MAX_CATEGORY_LEN),
            selection: clamp(selection, MAX_FIELD_VALUE_LEN),
            previous_selection: clamp_opt(previous, MAX_FIELD_VALUE_LEN),
            total_price,
            price_change,
            timestamp: Some(now_ms()),
            time_spent_ms: self.shared.time_on_page().as_millis() as i64,
        }));
    }

    /// Store the full configuration. The server derives the completion
    /// percentage.
    pub fn save_snapshot(&self, configuration: Value, total_price: i64, trigger: TriggerEvent) {
        self.shared.dispatch(Payload::Snapshot(SnapshotSubmission {
            session_id: self.shared.context.session_id.clone(),
            configuration_data: configuration,
            total_price,
            trigger_event: trigger,
            timestamp: Some(now_ms()),
        }));
    }

    pub fn record_metric(&self, name: &str, value: f64, endpoint: Option<&str>) {
        self.shared.dispatch(Payload::Metric(MetricSubmission {
            session_id: Some(self.shared.context.session_id.clone()),
            metric_name: name.to_string(),
            value,
            endpoint: endpoint.map(str::to_string),
            timestamp: Some(now_ms()),
            additional_data: Default::default(),
        }));
    }

    /// Close open debounce windows, flush the buffer, and wait for every
    /// delivery (including retries) to settle.
    pub async fn drain(&self) {
        for event in self.shared.debouncer.close_all() {
            self.shared.enqueue(event);
        }
        self.shared.flush();
        self.shared.in_flight.wait_idle().await;
    }

    /// End the visit: record the exit, drain, then send one beacon.
    /// Later calls and the drop hook do nothing.
    pub async fn finalize(&self, configuration: Option<FinalConfiguration>) {
        if self.shared.finalized.swap(true, Ordering::SeqCst) {
            return;
        }

        let details = PageExitDetails {
            time_on_page_ms: self.shared.time_on_page().as_millis() as i64,
            scroll_depth: None,
        };
        let exit = self.shared.submission(
            event_types::PAGE_EXIT,
            "navigation",
            None,
            to_value(&details),
        );
        self.shared.enqueue(exit);
        self.drain().await;

        let request = self.shared.finalize_request(configuration);
        self.shared.transport.beacon(Payload::Finalize(request));
        info!(session_id = %self.shared.context.session_id, "Collector finalized");
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.flusher.abort();
        if self.shared.finalized.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut pending = self.shared.debouncer.close_all();
        pending.extend(self.shared.buffer.lock().take());
        while !pending.is_empty() {
            let rest = pending.split_off(pending.len().min(MAX_BATCH_EVENTS));
            self.shared.transport.beacon(Payload::Interactions(pending));
            pending = rest;
        }

        let request = self.shared.finalize_request(None);
        self.shared.transport.beacon(Payload::Finalize(request));
        debug!(session_id = %self.shared.context.session_id, "Collector dropped without finalize");
    }
}

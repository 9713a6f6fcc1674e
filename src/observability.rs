use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("citeline.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("citeline.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("citeline.client.request_duration_seconds");

pub(crate) static TOKEN_REFRESHES: Counter = Counter::new("citeline.auth.refreshes");
pub(crate) static TOKEN_REFRESH_COALESCED: Counter =
    Counter::new("citeline.auth.refreshes_coalesced");
pub(crate) static TOKEN_REFRESH_FAILURES: Counter = Counter::new("citeline.auth.refresh_failures");

pub(crate) static CHAT_SUBMITS: Counter = Counter::new("citeline.chat.submits");
pub(crate) static CHAT_SUBMITS_DROPPED: Counter = Counter::new("citeline.chat.submits_dropped");
pub(crate) static CHAT_SEND_FAILURES: Counter = Counter::new("citeline.chat.send_failures");
pub(crate) static FEEDBACK_FAILURES: Counter = Counter::new("citeline.chat.feedback_failures");
pub(crate) static REVEAL_TICKS: Counter = Counter::new("citeline.chat.reveal_ticks");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&TOKEN_REFRESHES);
    collector.register_counter(&TOKEN_REFRESH_COALESCED);
    collector.register_counter(&TOKEN_REFRESH_FAILURES);

    collector.register_counter(&CHAT_SUBMITS);
    collector.register_counter(&CHAT_SUBMITS_DROPPED);
    collector.register_counter(&CHAT_SEND_FAILURES);
    collector.register_counter(&FEEDBACK_FAILURES);
    collector.register_counter(&REVEAL_TICKS);
}

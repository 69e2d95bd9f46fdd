//! Notification / confirmation gateway.
//!
//! The engine never talks to a UI directly. Shells implement this trait to
//! show messages, answer yes/no questions and play sounds.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use crate::sound::Sound;

/// Boxed future returned by [`NotificationGateway::confirm`].
pub type ConfirmFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

pub trait NotificationGateway: Send + Sync {
    /// Fire-and-forget message to the user.
    fn notify(&self, message: &str);

    /// Ask the user a yes/no question. The engine waits for the answer
    /// without a timeout.
    fn confirm(&self, question: &str) -> ConfirmFuture<'_>;

    /// Play a notification sound at `volume` (0.0 ..= 1.0).
    fn play_sound(&self, _sound: Sound, _volume: f64) {
        // default no-op
    }
}

/// What a [`RecordingGateway`] saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Notify(String),
    Confirm(String),
    PlaySound(Sound),
}

/// Gateway that records every call and answers confirmations from a
/// scripted queue (defaulting to `false` when the queue is empty).
///
/// Useful for tests and headless embedding.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    answers: Mutex<Vec<bool>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue answers for upcoming `confirm` calls, first in first out.
    pub fn with_answers(answers: impl IntoIterator<Item = bool>) -> Self {
        let mut queued: Vec<bool> = answers.into_iter().collect();
        queued.reverse();
        Self {
            calls: Mutex::new(Vec::new()),
            answers: Mutex::new(queued),
        }
    }

    pub fn push_answer(&self, answer: bool) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.insert(0, answer);
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Messages passed to `notify`, in order.
    pub fn notifications(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Notify(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn sounds_played(&self) -> Vec<Sound> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::PlaySound(sound) => Some(sound),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl NotificationGateway for RecordingGateway {
    fn notify(&self, message: &str) {
        self.record(GatewayCall::Notify(message.to_string()));
    }

    fn confirm(&self, question: &str) -> ConfirmFuture<'_> {
        self.record(GatewayCall::Confirm(question.to_string()));
        let answer = self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop())
            .unwrap_or(false);
        Box::pin(async move { answer })
    }

    fn play_sound(&self, sound: Sound, _volume: f64) {
        self.record(GatewayCall::PlaySound(sound));
    }
}

// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! In-process stand-ins for the storage, HTTP, analytics and notification
//! collaborators.

use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use async_trait::async_trait;
use futures_util::lock::Mutex as AsyncMutex;
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::{
    analytics::{Event, Sink},
    clock::Clock,
    command::Context,
    error::{Error, Result},
    notify::Notifier,
    password::{self, Prompt},
    storage::{Memory, Storage},
    transport::{Method, Request, Transport},
};

/// Epoch milliseconds for 2024-06-01T12:00:00Z.
pub(crate) const NOW_MS: i64 = 1_717_243_200_000;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn shared(storage: &Memory) -> Arc<AsyncMutex<Box<dyn Storage>>> {
    Arc::new(AsyncMutex::new(Box::new(storage.clone())))
}

#[derive(Clone, Debug)]
pub(crate) enum Reply {
    Json(Value),
    Status(u16, Option<&'static str>),
    Unreachable,
}

/// A transport answering from per-route reply queues. The last queued reply
/// for a route repeats once the queue drains.
#[derive(Default)]
pub(crate) struct FakeTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<(Request, Option<String>)>>,
    bearer: Mutex<Option<SecretString>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Holds every response until a permit is added to `gate`.
    pub(crate) fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(crate) fn reply(self, method: Method, path: &str, reply: Reply) -> Self {
        lock(&self.replies)
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn count(&self, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|(req, _)| req.path() == path)
            .count()
    }

    /// The bearer token that accompanied each request to `path`.
    pub(crate) fn bearers(&self, path: &str) -> Vec<Option<String>> {
        lock(&self.requests)
            .iter()
            .filter(|(req, _)| req.path() == path)
            .map(|(_, bearer)| bearer.clone())
            .collect()
    }

    pub(crate) fn last(&self, path: &str) -> Option<Request> {
        lock(&self.requests)
            .iter()
            .rev()
            .find(|(req, _)| req.path() == path)
            .map(|(req, _)| req.clone())
    }

    pub(crate) fn current_bearer(&self) -> Option<String> {
        lock(&self.bearer)
            .as_ref()
            .map(|token| token.expose_secret().clone())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, req: Request) -> Result<Value> {
        let bearer = if req.authenticated {
            self.current_bearer()
        } else {
            None
        };
        let key = (req.method, req.path());
        lock(&self.requests).push((req, bearer));

        if let Some(gate) = self.gate.as_ref() {
            gate.acquire()
                .await
                .map_err(|_| Error::Cancelled)?
                .forget();
        }

        let reply = {
            let mut replies = lock(&self.replies);
            match replies.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Json(body)) => Ok(body),
            Some(Reply::Status(status, message)) => Err(Error::Status {
                status,
                message: message.map(str::to_owned),
            }),
            Some(Reply::Unreachable) => Err(Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            None => Err(Error::Status {
                status: 404,
                message: None,
            }),
        }
    }

    async fn set_bearer(&self, token: Option<SecretString>) {
        *lock(&self.bearer) = token;
    }

    async fn bearer(&self) -> Option<SecretString> {
        lock(&self.bearer).clone()
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    pub(crate) fn named(&self, name: &str) -> Vec<Event> {
        lock(&self.events)
            .iter()
            .filter(|event| event.name == name)
            .cloned()
            .collect()
    }
}

impl Sink for RecordingSink {
    fn track(&self, event: &Event) {
        lock(&self.events).push(event.clone());
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    messages: Mutex<Vec<(bool, String)>>,
}

impl RecordingNotifier {
    pub(crate) fn successes(&self) -> Vec<String> {
        lock(&self.messages)
            .iter()
            .filter(|(ok, _)| *ok)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        lock(&self.messages)
            .iter()
            .filter(|(ok, _)| !*ok)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        lock(&self.messages).push((true, message.to_owned()));
    }

    fn error(&self, message: &str) {
        lock(&self.messages).push((false, message.to_owned()));
    }
}

pub(crate) struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub(crate) fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub(crate) fn advance(&self, ms: i64) {
        let _previous = self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A prompt answering from a fixed list of secrets, then declining.
#[derive(Default)]
pub(crate) struct ScriptedPrompt {
    answers: Mutex<VecDeque<&'static str>>,
    seen: Mutex<Vec<password::Request>>,
}

impl ScriptedPrompt {
    pub(crate) fn new(answers: &[&'static str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            seen: Mutex::default(),
        }
    }

    pub(crate) fn seen(&self) -> Vec<password::Request> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn prompt(&self, req: password::Request) -> Result<Option<SecretString>> {
        lock(&self.seen).push(req);
        Ok(lock(&self.answers)
            .pop_front()
            .map(|answer| SecretString::new(answer.to_owned())))
    }
}

/// A command context over fakes. The clock reads [`NOW_MS`].
pub(crate) fn context(
    storage: &Memory,
    transport: &Arc<FakeTransport>,
    prompt: &Arc<ScriptedPrompt>,
) -> Context {
    Context {
        storage: shared(storage),
        transport: Arc::clone(transport) as Arc<dyn Transport>,
        sink: Arc::new(RecordingSink::default()),
        notifier: Arc::new(RecordingNotifier::default()),
        clock: Arc::new(FixedClock::new(NOW_MS)),
        prompt: Arc::clone(prompt) as Arc<dyn Prompt>,
    }
}

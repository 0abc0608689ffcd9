//! Test doubles for the store and synthesizer capabilities.

#![allow(dead_code)]

use async_trait::async_trait;
use speech_cache::store::{ContainerDescriptor, MemoryStore, ObjectStore};
use speech_cache::tts::ensure_api;
use speech_cache::{
    AudioArtifact, Error, ErrorContext, Result, SpeechCache, SpeechCacheConfig, SpeechRequest,
    Synthesizer,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const API: &str = "provider-x";
pub const BUCKET: &str = "test-bucket";

/// Memory store that counts calls and can be told to fail.
pub struct CountingStore {
    pub inner: MemoryStore,
    pub lists: AtomicUsize,
    pub creates: AtomicUsize,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
    /// Number of upcoming `list_containers` calls that fail.
    pub failing_lists: AtomicUsize,
    /// When set, `get_object` fails with a store error.
    pub failing_gets: AtomicBool,
    pub list_delay: Duration,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new().with_region("us-west-1"),
            lists: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            failing_lists: AtomicUsize::new(0),
            failing_gets: AtomicBool::new(false),
            list_delay: Duration::ZERO,
        }
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    pub fn fail_next_lists(self, n: usize) -> Self {
        self.failing_lists.store(n, Ordering::SeqCst);
        self
    }

    pub fn io_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
            + self.creates.load(Ordering::SeqCst)
            + self.gets.load(Ordering::SeqCst)
            + self.puts.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }
}

fn injected(msg: &str) -> Error {
    Error::store_with_context(msg, ErrorContext::new().with_source("counting_store"))
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        let fail = self
            .failing_lists
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(injected("access denied"));
        }
        self.inner.list_containers().await
    }

    async fn create_container(&self, name: &str, location: Option<&str>) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_container(name, location).await
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing_gets.load(Ordering::SeqCst) {
            return Err(injected("connection reset"));
        }
        self.inner.get_object(container, key).await
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_object(container, key, body).await
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_object(container, key).await
    }

    fn region(&self) -> Option<&str> {
        self.inner.region()
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Synthesizer that encodes the request text as the audio payload.
pub struct ScriptedSynth {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl ScriptedSynth {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynth {
    fn api(&self) -> &str {
        API
    }

    async fn speak(&self, request: &SpeechRequest) -> Result<AudioArtifact> {
        ensure_api(request, API)?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::provider_with_context(
                "quota exceeded",
                ErrorContext::new().with_source("scripted_synth"),
            ));
        }
        Ok(AudioArtifact::from_bytes("audio/mpeg", request.text.as_bytes()))
    }

    fn usage(&self) -> u64 {
        self.calls() as u64
    }
}

pub fn speech_cache(store: &Arc<CountingStore>, synth: &Arc<ScriptedSynth>) -> SpeechCache {
    SpeechCache::builder()
        .config(SpeechCacheConfig::defaults().with_bucket(BUCKET))
        .store(store.clone())
        .synthesizer(synth.clone())
        .build()
        .expect("build speech cache")
}

pub fn hello() -> SpeechRequest {
    SpeechRequest::new(API, "hello", "mp3")
        .with_voice("Amy")
        .with_language("en-GB")
}

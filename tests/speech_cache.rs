//! End-to-end behavior of `SpeechCache` over an in-memory store.

mod common;

use common::{hello, speech_cache, CountingStore, ScriptedSynth, API, BUCKET};
use speech_cache::{
    AudioArtifact, CacheEntry, CacheStats, ErrorKind, Fingerprinter, InitState, ObjectStore,
    SpeechRequest, StorageKey,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn fixtures() -> (Arc<CountingStore>, Arc<ScriptedSynth>) {
    (Arc::new(CountingStore::new()), Arc::new(ScriptedSynth::new()))
}

#[tokio::test]
async fn test_miss_then_hit() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);

    let first = cache.speak(&hello()).await.unwrap();
    assert_eq!(first.request, hello());
    assert_eq!(first.response.decode().unwrap(), b"hello".to_vec());
    let s = cache.stats();
    assert_eq!((s.hits, s.misses, s.reads, s.writes), (0, 1, 1, 1));

    let second = cache.speak(&hello()).await.unwrap();
    assert_eq!(second, first);
    let s = cache.stats();
    assert_eq!((s.hits, s.misses, s.reads, s.writes), (1, 1, 2, 1));
    assert_eq!(synth.calls(), 1);
}

#[tokio::test]
async fn test_ignore_cache_then_serve_from_cache() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    cache.set_ignore_cache(true);

    let res1 = cache.speak(&hello()).await.unwrap();
    let res2 = cache.speak(&hello()).await.unwrap();
    assert_eq!(synth.calls(), 2);
    assert_eq!(cache.stats().reads, 0);
    assert_eq!(cache.stats().writes, 2);

    cache.set_ignore_cache(false);
    let res3 = cache.speak(&hello()).await.unwrap();
    assert_eq!(res3, res1);
    assert_eq!(res2, res1);
    let s = cache.stats();
    assert_eq!((s.hits, s.misses), (1, 2));
}

#[tokio::test]
async fn test_scenario_key_layout() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let entry = cache.speak(&hello()).await.unwrap();

    let hash = Fingerprinter::new().hash(&hello()).unwrap();
    let expected = format!("en-GB/Amy/{}/{}.json", &hash[..2], hash);
    assert_eq!(entry.storage_key.as_str(), expected);
    assert_eq!(cache.storage_key(&hello()).as_str(), expected);
    assert!(store.inner.get_object(BUCKET, &expected).await.is_ok());
}

#[tokio::test]
async fn test_stored_document_shape() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let entry = cache.speak(&hello()).await.unwrap();
    let body = store
        .inner
        .get_object(BUCKET, entry.storage_key.as_str())
        .await
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let mut keys: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["request", "response", "storageKey"]);
    assert_eq!(doc["storageKey"], entry.storage_key.as_str());
}

#[tokio::test]
async fn test_explicit_guid_pins_key() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let pinned = hello().with_guid("00c6495507e72cd16a6f992c15b92c95");
    let key = cache.storage_key(&pinned);
    assert_eq!(
        key.as_str(),
        "en-GB/Amy/00/00c6495507e72cd16a6f992c15b92c95.json"
    );
    let mut other_text = pinned.clone();
    other_text.text = "different".into();
    assert_eq!(cache.storage_key(&other_text), key);
}

#[tokio::test]
async fn test_preload_is_idempotent() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let audio = AudioArtifact::from_bytes("audio/mpeg", b"preloaded");

    let first = cache.preload(&hello(), audio.clone()).await.unwrap();
    assert!(first.updated);
    let writes = cache.stats().writes;
    let second = cache.preload(&hello(), audio.clone()).await.unwrap();
    assert!(!second.updated);
    assert_eq!(second.storage_key, first.storage_key);
    assert_eq!(cache.stats().writes, writes);
    assert_eq!(store.puts.load(Ordering::SeqCst), 1);

    let changed = cache
        .preload(&hello(), AudioArtifact::from_bytes("audio/mpeg", b"new"))
        .await
        .unwrap();
    assert!(changed.updated);
}

#[tokio::test]
async fn test_preload_then_speak_hits() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let audio = AudioArtifact::from_bytes("audio/mpeg", b"preloaded");
    cache.preload(&hello(), audio.clone()).await.unwrap();

    let entry = cache.speak(&hello()).await.unwrap();
    assert_eq!(entry.response, audio);
    let s = cache.stats();
    assert_eq!((s.hits, s.misses), (1, 0));
    assert_eq!(synth.calls(), 0);
}

#[tokio::test]
async fn test_put_then_get_round_trip() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let key = cache.storage_key(&hello());
    let entry = CacheEntry::new(
        hello(),
        key.clone(),
        AudioArtifact::from_bytes("audio/ogg", b"ogg"),
    );
    assert!(cache.put_entry(&key, &entry).await.unwrap().updated);
    assert_eq!(cache.get_entry(&key).await.unwrap(), Some(entry));
}

#[tokio::test]
async fn test_delete_then_regenerate() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let stored = cache.speak(&hello()).await.unwrap();

    let deleted = cache.delete_entry(&stored.storage_key).await.unwrap();
    assert_eq!(deleted, Some(stored.clone()));
    assert_eq!(cache.delete_entry(&stored.storage_key).await.unwrap(), None);

    let before = cache.stats();
    let again = cache.speak(&hello()).await.unwrap();
    let after = cache.stats();
    assert_eq!(after.misses, before.misses + 1);
    assert_eq!(after.hits, before.hits);
    assert_eq!(synth.calls(), 2);
    assert_eq!(again, stored);
}

#[tokio::test]
async fn test_get_missing_entry_is_none() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let key = StorageKey::new("any-lang/any-voice/ff/ff00.json");
    assert_eq!(cache.get_entry(&key).await.unwrap(), None);
    assert_eq!(cache.stats().errors, 0);
}

#[tokio::test]
async fn test_not_found_during_speak_is_a_miss() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    cache.speak(&hello()).await.unwrap();
    let s = cache.stats();
    assert_eq!((s.misses, s.errors), (1, 0));
}

#[tokio::test]
async fn test_store_read_failure_is_fatal() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    cache.initialize().await.unwrap();
    store.failing_gets.store(true, Ordering::SeqCst);

    let err = cache.speak(&hello()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(synth.calls(), 0);
    let s = cache.stats();
    assert_eq!((s.errors, s.misses, s.hits), (1, 0, 0));
}

#[tokio::test]
async fn test_malformed_stored_entry_is_fatal() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    cache.initialize().await.unwrap();
    let key = cache.storage_key(&hello());
    store
        .inner
        .put_object(BUCKET, key.as_str(), b"{\"request\":".to_vec())
        .await
        .unwrap();

    let err = cache.speak(&hello()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
    assert_eq!(cache.stats().errors, 1);
    assert_eq!(synth.calls(), 0);
}

#[tokio::test]
async fn test_delete_clears_malformed_entry() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    cache.initialize().await.unwrap();
    let key = cache.storage_key(&hello());
    store
        .inner
        .put_object(BUCKET, key.as_str(), b"{\"request\":".to_vec())
        .await
        .unwrap();

    assert_eq!(cache.delete_entry(&key).await.unwrap(), None);
    assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
    let err = store.inner.get_object(BUCKET, key.as_str()).await.unwrap_err();
    assert!(err.is_not_found());

    let entry = cache.speak(&hello()).await.unwrap();
    assert_eq!(entry.request, hello());
    let s = cache.stats();
    assert_eq!((s.misses, s.hits), (1, 0));
    assert_eq!(synth.calls(), 1);
}

#[tokio::test]
async fn test_delete_runs_when_read_fails() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let stored = cache.speak(&hello()).await.unwrap();
    store.failing_gets.store(true, Ordering::SeqCst);

    let err = cache.delete_entry(&stored.storage_key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.object_count(BUCKET), Some(0));
}

#[tokio::test]
async fn test_provider_failure_counts_error() {
    let (store, synth) = fixtures();
    synth.fail.store(true, Ordering::SeqCst);
    let cache = speech_cache(&store, &synth);

    let err = cache.speak(&hello()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider);
    let s = cache.stats();
    assert_eq!((s.errors, s.misses, s.writes), (1, 0, 0));
}

#[tokio::test]
async fn test_wrong_provider_is_rejected() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let err = cache
        .speak(&SpeechRequest::new("aws-polly", "hello", "mp3"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(synth.calls(), 0);
}

#[tokio::test]
async fn test_absent_request_rejected_without_io() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);

    let err = cache.speak_value(serde_json::Value::Null).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(cache.init_state(), InitState::Uninitialized);
    assert_eq!(cache.stats(), CacheStats::default());
    assert_eq!(store.io_calls(), 0);
}

#[tokio::test]
async fn test_extra_member_cannot_shadow_text() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);

    let err = hello()
        .with_field("text", serde_json::json!("goodbye"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut shadowed = hello();
    shadowed
        .extra
        .insert("text".to_string(), serde_json::json!("goodbye"));
    let err = cache.speak(&shadowed).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = cache
        .preload(&shadowed, AudioArtifact::from_bytes("audio/mpeg", b"x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(store.io_calls(), 0);
    assert_eq!(synth.calls(), 0);

    let mut other = hello();
    other.text = "goodbye".to_string();
    assert_ne!(cache.storage_key(&hello()), cache.storage_key(&other));
}

#[tokio::test]
async fn test_speak_value_accepts_json_request() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let entry = cache
        .speak_value(serde_json::json!({
            "api": API,
            "text": "hello",
            "voice": "Amy",
            "language": "en-GB",
            "audioFormat": "mp3",
        }))
        .await
        .unwrap();
    assert_eq!(entry.storage_key, cache.storage_key(&hello()));
}

#[tokio::test]
async fn test_put_with_mismatched_key_does_no_io() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let entry = CacheEntry::new(
        hello(),
        cache.storage_key(&hello()),
        AudioArtifact::from_bytes("audio/mpeg", b"x"),
    );
    let err = cache
        .put_entry(&StorageKey::new("en-GB/Amy/zz/zz.json"), &entry)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(store.io_calls(), 0);
    assert_eq!(cache.stats(), CacheStats::default());
}

#[tokio::test]
async fn test_hash_ignores_top_level_guid() {
    let (store, synth) = fixtures();
    let cache = speech_cache(&store, &synth);
    let pinned = hello().with_guid("abc");
    let h = cache.hash(&pinned).unwrap();
    assert_ne!(h, "abc");
    assert_eq!(h.len(), 64);
}

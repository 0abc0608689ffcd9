//! Directory-backed caches loaded from configuration files.

mod common;

use common::{hello, ScriptedSynth};
use speech_cache::{ConfigOptions, ErrorKind, ObjectStore, SpeechCache, SpeechCacheConfig};
use std::path::PathBuf;
use std::sync::Arc;

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("speech-cache-it-{}", uuid::Uuid::new_v4()))
}

fn cache_at(root: &PathBuf, synth: &Arc<ScriptedSynth>) -> SpeechCache {
    SpeechCache::builder()
        .config(SpeechCacheConfig::defaults().with_store_root(root.clone()))
        .synthesizer(synth.clone())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_entries_survive_new_instances() {
    let root = scratch_dir();
    let synth = Arc::new(ScriptedSynth::new());

    let first = cache_at(&root, &synth);
    let stored = first.speak(&hello()).await.unwrap();
    assert!(root
        .join("say-again.say-again")
        .join(stored.storage_key.as_str())
        .is_file());

    let second = cache_at(&root, &synth);
    assert_ne!(first.name(), second.name());
    let again = second.speak(&hello()).await.unwrap();
    assert_eq!(again, stored);
    assert_eq!(second.stats().hits, 1);
    assert_eq!(synth.calls(), 1);

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_yaml_config_file_selects_bucket_and_root() {
    let dir = scratch_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let root = dir.join("objects");
    let config_path = dir.join("speech-cache.yaml");
    std::fs::write(
        &config_path,
        format!(
            "region: eu-west-1\ncontainer:\n  bucket: narrations\nstore:\n  root: {}\n",
            root.display()
        ),
    )
    .unwrap();

    let synth = Arc::new(ScriptedSynth::new());
    let cache = SpeechCache::builder()
        .config_path(&config_path)
        .synthesizer(synth.clone())
        .build()
        .unwrap();
    let ready = cache.initialize().await.unwrap();
    assert_eq!(ready.container(), "narrations");
    assert_eq!(ready.store().region(), Some("eu-west-1"));
    let listed = ready.store().list_containers().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].location.as_deref(), Some("eu-west-1"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_explicit_options_override_file() {
    let dir = scratch_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let config_path = dir.join("speech-cache.json");
    std::fs::write(
        &config_path,
        r#"{"container": {"bucket": "from-file"}, "store": {"root": "unused"}}"#,
    )
    .unwrap();

    let cache = SpeechCache::builder()
        .config_path(&config_path)
        .options(ConfigOptions::new().bucket("explicit").store_root(dir.join("objects")))
        .synthesizer(Arc::new(ScriptedSynth::new()))
        .build()
        .unwrap();
    let ready = cache.initialize().await.unwrap();
    assert_eq!(ready.container(), "explicit");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_malformed_config_file_is_rejected() {
    let dir = scratch_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let config_path = dir.join("speech-cache.json");
    std::fs::write(&config_path, r#"{"container": {"bukket": "typo"}}"#).unwrap();

    let err = SpeechCache::builder()
        .config_path(&config_path)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let _ = std::fs::remove_dir_all(&dir);
}

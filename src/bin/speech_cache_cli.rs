//! speech-cache CLI — 语音合成缓存命令行工具
//!
//! Usage:
//!   speech-cache speak --text <text> [--voice V] [--language L] [--out file]
//!   speech-cache key <request.json|->
//!   speech-cache get <storage-key>
//!   speech-cache delete <storage-key>
//!   speech-cache preload <request.json> <audio-file> [--mime M]
//!   speech-cache hash <file.json|->

use anyhow::{bail, Context};
use speech_cache::{AudioArtifact, ConfigOptions, SpeechCache, SpeechRequest, StorageKey};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let rest = &args[2..];
    let result = match args[1].as_str() {
        "speak" => cmd_speak(rest).await,
        "key" => cmd_key(rest),
        "get" => cmd_get(rest).await,
        "delete" => cmd_delete(rest).await,
        "preload" => cmd_preload(rest).await,
        "hash" => cmd_hash(rest),
        "version" | "--version" | "-V" => {
            println!("speech-cache {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"speech-cache — text-to-speech cache backed by an object store

USAGE:
    speech-cache <COMMAND> [OPTIONS]

COMMANDS:
    speak --text <text> [--voice V] [--language L] [--format F] [--api A]
          [--out <file>] [--ignore-cache]
                                 Synthesize (or fetch cached) audio
    key <request.json|->         Print the storage key for a request
    get <storage-key>            Print a cached entry
    delete <storage-key>         Delete a cached entry and print it
    preload <request.json> <audio-file> [--mime M]
                                 Store audio for a request without synthesis
    hash <file.json|->           Print the canonical hash of a JSON document
    version                      Show version information
    help                         Show this help message

GLOBAL OPTIONS:
    --config <path>              Config file (JSON or YAML)
    --bucket <name>              Container name override
    --store-root <dir>           Object store directory override

ENVIRONMENT:
    SPEECH_CACHE_CONFIG          Config file path
    SPEECH_CACHE_REGION          Default region
    SPEECH_CACHE_ACCESS_KEY_ID   Default access key id
    SPEECH_CACHE_SECRET_ACCESS_KEY
                                 Default secret (bearer key for the synthesizer)
    SPEECH_CACHE_BUCKET          Container name
    RUST_LOG                     Log filter (default: info)"#
    );
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

/// Positional arguments, skipping flags and their values.
fn positionals(args: &[String]) -> Vec<&str> {
    const BOOLEAN_FLAGS: &[&str] = &["--ignore-cache"];
    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let a = &args[i];
        if a.starts_with("--") && a.len() > 2 {
            i += if BOOLEAN_FLAGS.contains(&a.as_str()) { 1 } else { 2 };
            continue;
        }
        out.push(a.as_str());
        i += 1;
    }
    out
}

fn build_cache(args: &[String]) -> anyhow::Result<SpeechCache> {
    let mut options = ConfigOptions::new();
    if let Some(bucket) = flag_value(args, "--bucket") {
        options = options.bucket(bucket);
    }
    if let Some(root) = flag_value(args, "--store-root") {
        options = options.store_root(root);
    }
    let mut builder = SpeechCache::builder()
        .options(options)
        .ignore_cache(has_flag(args, "--ignore-cache"));
    if let Some(path) = flag_value(args, "--config") {
        builder = builder.config_path(path);
    }
    Ok(builder.build()?)
}

fn read_json(source: &str) -> anyhow::Result<serde_json::Value> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("cannot read {source}"))?
    };
    serde_json::from_str(&content).with_context(|| format!("{source} is not valid JSON"))
}

fn read_request(source: &str) -> anyhow::Result<SpeechRequest> {
    Ok(SpeechRequest::from_value(read_json(source)?)?)
}

fn one_positional<'a>(args: &'a [String], what: &str) -> anyhow::Result<&'a str> {
    match positionals(args).as_slice() {
        [one] => Ok(*one),
        _ => bail!("expected exactly one {what}"),
    }
}

async fn cmd_speak(args: &[String]) -> anyhow::Result<()> {
    let text = flag_value(args, "--text").context("--text is required")?;
    let format = flag_value(args, "--format").unwrap_or("mp3");
    let api = flag_value(args, "--api").unwrap_or(speech_cache::tts::DEFAULT_API);
    let mut request = SpeechRequest::new(api, text, format);
    if let Some(voice) = flag_value(args, "--voice") {
        request = request.with_voice(voice);
    }
    if let Some(language) = flag_value(args, "--language") {
        request = request.with_language(language);
    }

    let cache = build_cache(args)?;
    let entry = cache.speak(&request).await?;
    println!("{}", entry.storage_key);
    if let Some(out) = flag_value(args, "--out") {
        let audio = entry.response.decode()?;
        std::fs::write(out, &audio).with_context(|| format!("cannot write {out}"))?;
        eprintln!("wrote {} bytes ({}) to {out}", audio.len(), entry.response.mime);
    }
    let stats = cache.stats();
    eprintln!("hits:{} misses:{}", stats.hits, stats.misses);
    Ok(())
}

fn cmd_key(args: &[String]) -> anyhow::Result<()> {
    let request = read_request(one_positional(args, "request file")?)?;
    println!("{}", speech_cache::KeyDeriver::new().derive(&request));
    Ok(())
}

async fn cmd_get(args: &[String]) -> anyhow::Result<()> {
    let key = StorageKey::new(one_positional(args, "storage key")?);
    let cache = build_cache(args)?;
    match cache.get_entry(&key).await? {
        Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
        None => bail!("no entry at {key}"),
    }
    Ok(())
}

async fn cmd_delete(args: &[String]) -> anyhow::Result<()> {
    let key = StorageKey::new(one_positional(args, "storage key")?);
    let cache = build_cache(args)?;
    match cache.delete_entry(&key).await? {
        Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
        None => eprintln!("nothing stored at {key}"),
    }
    Ok(())
}

async fn cmd_preload(args: &[String]) -> anyhow::Result<()> {
    let (request_src, audio_path) = match positionals(args).as_slice() {
        [r, a] => (r.to_string(), PathBuf::from(*a)),
        _ => bail!("expected <request.json> <audio-file>"),
    };
    let request = read_request(&request_src)?;
    let audio = std::fs::read(&audio_path)
        .with_context(|| format!("cannot read {}", audio_path.display()))?;
    let mime = flag_value(args, "--mime")
        .map(str::to_string)
        .unwrap_or_else(|| request.format().mime_type().to_string());

    let cache = build_cache(args)?;
    let outcome = cache
        .preload(&request, AudioArtifact::from_bytes(mime, &audio))
        .await?;
    println!("{} updated:{}", outcome.storage_key, outcome.updated);
    Ok(())
}

fn cmd_hash(args: &[String]) -> anyhow::Result<()> {
    let value = read_json(one_positional(args, "JSON file")?)?;
    println!("{}", speech_cache::Fingerprinter::new().hash_value_untagged(&value));
    Ok(())
}

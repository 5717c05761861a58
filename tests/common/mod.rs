//! Common test utilities: in-memory collaborators and temp-dir configs

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use repocast::assets::AssetExtractor;
use repocast::channels::{Channel, ChannelError, ChannelResult};
use repocast::classifier::Classifier;
use repocast::config::Config;
use repocast::content::ContentGenerator;
use repocast::error::{Error, Result};
use repocast::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};
use repocast::metadata::MetadataFetcher;
use repocast::models::{
    ArchiveRecord, Asset, Candidate, Category, ChannelReceipt, FullRecord, GeneratedContent,
    PostDraft,
};
use repocast::notifications::{Notification, Notifier};
use repocast::pipeline::Publisher;
use repocast::sources::CandidateSource;
use repocast::storage::{Archiver, JekyllArchiver, StateFiles};
use repocast::utils::error::FetchError;
use repocast::utils::retry::RetryConfig;

/// Config whose state and archive paths all live in `dir`
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.paths.queue_file = dir.path().join("queue.txt");
    config.paths.history_file = dir.path().join("history.txt");
    config.paths.posts_dir = dir.path().join("docs/_posts");
    config.paths.images_dir = dir.path().join("docs/assets/images");
    config.site.base_url = String::from("https://site.example");
    config.discovery.shuffle_seed = Some(7);
    config
}

pub fn write_file(dir: &TempDir, name: &str, content: &str) {
    std::fs::write(dir.path().join(name), content).unwrap();
}

pub fn read_file(dir: &TempDir, name: &str) -> String {
    std::fs::read_to_string(dir.path().join(name)).unwrap_or_default()
}

pub fn lines(dir: &TempDir, name: &str) -> Vec<String> {
    read_file(dir, name)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

pub fn posts(dir: &TempDir) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir.path().join("docs/_posts")) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

pub fn record(url: &str, popularity: u64, category: Category) -> FullRecord {
    let name = url.rsplit('/').next().unwrap_or("item").to_string();
    FullRecord {
        url: url.to_string(),
        owner: String::from("octo"),
        name: name.clone(),
        full_name: format!("octo/{name}"),
        description: format!("{name} does useful things"),
        popularity,
        language: String::from("Rust"),
        default_branch: String::from("main"),
        category: Some(category),
        ..Default::default()
    }
}

pub fn content() -> GeneratedContent {
    GeneratedContent {
        summary: String::from("A useful tool"),
        hashtags: vec!["Rust".into(), "CLI".into(), "OpenSource".into()],
        body: String::from("It does things.\n\nMany things."),
        first_paragraph: String::from("It does things."),
        category: Some(Category::General),
    }
}

/// Oracle answering by the first matching prompt fragment
pub struct RuleLlm {
    rules: Vec<(String, String)>,
    default: Option<String>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl RuleLlm {
    /// Answers `answer` to every prompt
    pub fn always(answer: &str) -> Self {
        Self {
            rules: Vec::new(),
            default: Some(answer.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with a server error
    pub fn failing() -> Self {
        Self {
            rules: Vec::new(),
            default: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn when(mut self, fragment: &str, answer: &str) -> Self {
        self.rules.push((fragment.to_string(), answer.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for RuleLlm {
    fn provider(&self) -> &str {
        "test"
    }

    fn model(&self) -> &str {
        "rule"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        let answer = self
            .rules
            .iter()
            .find(|(fragment, _)| request.prompt.contains(fragment.as_str()))
            .map(|(_, answer)| answer.clone())
            .or_else(|| self.default.clone());

        match answer {
            Some(text) => Ok(CompletionResponse {
                text,
                usage: LlmUsage::default(),
                model: String::from("rule"),
            }),
            None => Err(LlmError::Api {
                status: 503,
                message: String::from("overloaded"),
            }),
        }
    }
}

pub fn classifier(llm: Arc<RuleLlm>, config: &Config) -> Classifier {
    Classifier::new(llm, config).with_retry(RetryConfig::immediate(1))
}

/// Source returning a fixed batch and counting calls
pub struct StaticSource {
    candidates: Vec<Candidate>,
    pub calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Vec<Candidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.candidates.clone()
    }
}

pub fn candidate(url: &str, popularity: u64) -> Candidate {
    Candidate::new(url, url.rsplit('/').next().unwrap_or("item"))
        .with_description("A project with a clear purpose")
        .with_popularity(popularity)
        .with_language("Rust")
}

/// Metadata fetcher backed by a map; unknown URLs are not found
#[derive(Default)]
pub struct StaticFetcher {
    records: HashMap<String, FullRecord>,
    pub calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn with(mut self, record: FullRecord) -> Self {
        self.records.insert(record.url.clone(), record);
        self
    }
}

#[async_trait]
impl MetadataFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _category: Category) -> std::result::Result<FullRecord, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

pub struct NoAsset;

#[async_trait]
impl AssetExtractor for NoAsset {
    async fn extract(&self, _record: &FullRecord) -> Option<Asset> {
        None
    }
}

/// Generator returning fixed content, or failing
pub struct StaticGenerator(pub Option<GeneratedContent>);

#[async_trait]
impl ContentGenerator for StaticGenerator {
    async fn generate(&self, _record: &FullRecord) -> Result<GeneratedContent> {
        self.0
            .clone()
            .ok_or_else(|| Error::other("generator unavailable"))
    }
}

pub struct FailingArchiver;

#[async_trait]
impl Archiver for FailingArchiver {
    async fn write(
        &self,
        _record: &FullRecord,
        _content: &GeneratedContent,
        _asset: Option<&Asset>,
    ) -> Result<ArchiveRecord> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only archive",
        )))
    }
}

/// Channel recording every draft it receives
pub struct RecordingChannel {
    name: String,
    fail: bool,
    pub drafts: Mutex<Vec<PostDraft>>,
}

impl RecordingChannel {
    pub fn ok(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            drafts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::ok(name)
        }
    }

    pub fn attempts(&self) -> usize {
        self.drafts.lock().unwrap().len()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, draft: &PostDraft, _asset: Option<&Asset>) -> ChannelResult<ChannelReceipt> {
        self.drafts.lock().unwrap().push(draft.clone());
        if self.fail {
            return Err(ChannelError::Unavailable(format!("{} is down", self.name)));
        }
        Ok(ChannelReceipt {
            channel: self.name.clone(),
            url: format!("https://{}.example/post/1", self.name),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

impl RecordingNotifier {
    /// Records every notification but reports none as delivered
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notification: &Notification) -> bool {
        self.sent.lock().unwrap().push(notification.clone());
        !self.fail
    }
}

/// Publisher over real state files and a real archive in `config`'s paths
pub fn publisher(
    config: &Config,
    fetcher: Arc<StaticFetcher>,
    generator: StaticGenerator,
) -> Publisher {
    let files = StateFiles::from_config(config);
    let archiver = JekyllArchiver::from_config(config).unwrap();
    Publisher::new(
        files.queue,
        files.history,
        fetcher,
        Arc::new(NoAsset),
        Arc::new(generator),
        Arc::new(archiver),
        config,
    )
}

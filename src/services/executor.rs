//! Scan execution.
//!
//! Drives one plan through `Planned → Resolving → Opening → Reading` and
//! ends in `Succeeded` or `Failed`. Credentials are resolved and the store is
//! touched only here. Every failure is reported once, as a `ComputeError`
//! with the root message, and no partial result follows it.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::auto_provider_registry::AutoProviderRegistry;
use super::credential_boundary::resolve_now;
use super::retry::{Backoff, RetryError};
use crate::domain::errors::{ExecutionFailure, ScanError, ScanResult};
use crate::domain::models::{
    Config, CredentialSet, ExecutionState, FileFormat, ObjectMeta, PathDescriptor, RetryPolicy,
    RowBatch, ScanPlanNode,
};
use crate::domain::ports::{BatchDecoder, ObjectStoreClient, ObjectStoreFactory, StoreError};
use crate::infrastructure::credentials::environment_registry;
use crate::infrastructure::decoders::NdjsonDecoder;
use crate::infrastructure::logging::scrub_secrets;
use crate::infrastructure::object_store::CloudStoreFactory;

/// Lazy, finite, single-pass sequence of batches from one scan.
pub type BatchStream = BoxStream<'static, ScanResult<RowBatch>>;

/// Runs scan plans against an object store.
///
/// Holds no per-scan state: concurrent executions share only the store
/// factory, the decoder and the auto-provider registry.
pub struct Executor {
    store_factory: Arc<dyn ObjectStoreFactory>,
    providers: Arc<AutoProviderRegistry>,
    decoder: Arc<dyn BatchDecoder>,
    backoff: Backoff,
}

impl Executor {
    pub fn new(
        store_factory: Arc<dyn ObjectStoreFactory>,
        providers: Arc<AutoProviderRegistry>,
        decoder: Arc<dyn BatchDecoder>,
        backoff: Backoff,
    ) -> Self {
        Self {
            store_factory,
            providers,
            decoder,
            backoff,
        }
    }

    /// Executor backed by the `object_store` crate and environment-probing
    /// auto providers.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(CloudStoreFactory::new()),
            Arc::new(environment_registry(config.credentials.cache_auto_providers)),
            Arc::new(NdjsonDecoder),
            Backoff::from_config(&config.retry),
        )
    }

    pub fn with_store_factory(mut self, store_factory: Arc<dyn ObjectStoreFactory>) -> Self {
        self.store_factory = store_factory;
        self
    }

    pub fn with_auto_providers(mut self, providers: Arc<AutoProviderRegistry>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn BatchDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Execute `plan`, returning its batches lazily.
    pub async fn execute(&self, plan: &ScanPlanNode) -> ScanResult<BatchStream> {
        self.execute_with_cancellation(plan, CancellationToken::new())
            .await
    }

    /// Execute and materialize every batch.
    pub async fn collect(&self, plan: &ScanPlanNode) -> ScanResult<Vec<RowBatch>> {
        self.execute(plan).await?.try_collect().await
    }

    /// Execute `plan`, stopping as soon as `cancel` fires.
    ///
    /// Resolution and opening complete before this returns; reading happens
    /// as the stream is polled.
    pub async fn execute_with_cancellation(
        &self,
        plan: &ScanPlanNode,
        cancel: CancellationToken,
    ) -> ScanResult<BatchStream> {
        let span = info_span!(
            "scan",
            scan_id = %plan.id(),
            path = %plan.path(),
            format = %plan.format(),
        );

        async {
            let mut tracker = ExecutionTracker::new(plan.id());

            tracker.advance(ExecutionState::Resolving);
            let resolved = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(ExecutionFailure::Cancelled),
                resolved = resolve_now(plan.credential_provider(), &self.providers) => {
                    resolved.map_err(ExecutionFailure::from)
                }
            };
            let credentials = resolved.map_err(|failure| tracker.fail(failure))?;

            tracker.advance(ExecutionState::Opening);
            let (client, objects) = self
                .open(plan, &credentials, &cancel)
                .await
                .map_err(|failure| tracker.fail(failure))?;
            info!(objects = objects.len(), "scan opened");

            tracker.advance(ExecutionState::Reading);
            let reader = Reader {
                tracker,
                client,
                decoder: Arc::clone(&self.decoder),
                backoff: self.backoff.clone(),
                policy: plan.retry_policy(),
                format: plan.format(),
                path: plan.path().to_string(),
                cancel,
                objects: objects.into(),
                pending: VecDeque::new(),
            };
            Ok(reader.into_stream(Span::current()))
        }
        .instrument(span)
        .await
    }

    async fn open(
        &self,
        plan: &ScanPlanNode,
        credentials: &CredentialSet,
        cancel: &CancellationToken,
    ) -> Result<(Arc<dyn ObjectStoreClient>, Vec<ObjectMeta>), ExecutionFailure> {
        let path = plan.path();
        if !path.scheme().is_recognized() {
            let err = StoreError::UnsupportedScheme(path.scheme().to_string());
            return Err(access_failure(path, &err));
        }

        let options = plan.storage_options().merged_with(credentials.options());
        let client = self
            .store_factory
            .connect(path, &options)
            .map_err(|err| access_failure(path, &err))?;

        let policy = plan.retry_policy();
        let objects = if path.is_prefix() {
            let prefix = path.listing_prefix();
            let listed = self
                .backoff
                .retry(policy, cancel, || client.list(prefix))
                .await
                .map_err(|err| retry_failure(path, err))?;
            let matched = match_glob(path, listed)?;
            if matched.is_empty() {
                return Err(ExecutionFailure::Access(format!(
                    "failed to open '{path}': no objects found"
                )));
            }
            matched
        } else {
            let key = path.key();
            let object = self
                .backoff
                .retry(policy, cancel, || client.head(key))
                .await
                .map_err(|err| retry_failure(path, err))?;
            vec![object]
        };

        Ok((client, objects))
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("providers", &self.providers)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// State of one execution, with logged transitions.
struct ExecutionTracker {
    scan_id: Uuid,
    state: ExecutionState,
}

impl ExecutionTracker {
    fn new(scan_id: Uuid) -> Self {
        Self {
            scan_id,
            state: ExecutionState::Planned,
        }
    }

    fn state(&self) -> ExecutionState {
        self.state
    }

    fn advance(&mut self, next: ExecutionState) {
        if !self.state.can_transition_to(next) {
            error!(
                scan_id = %self.scan_id,
                from = self.state.as_str(),
                to = next.as_str(),
                "illegal scan state transition"
            );
            debug_assert!(false, "illegal transition {:?} -> {:?}", self.state, next);
        }
        debug!(
            scan_id = %self.scan_id,
            from = self.state.as_str(),
            to = next.as_str(),
            "scan state transition"
        );
        self.state = next;
    }

    fn fail(&mut self, failure: ExecutionFailure) -> ScanError {
        warn!(
            scan_id = %self.scan_id,
            phase = self.state.as_str(),
            error = %scrub_secrets(&failure.to_string()),
            "scan failed"
        );
        self.advance(ExecutionState::Failed);
        failure.into()
    }
}

/// The `Reading` phase, one object at a time.
struct Reader {
    tracker: ExecutionTracker,
    client: Arc<dyn ObjectStoreClient>,
    decoder: Arc<dyn BatchDecoder>,
    backoff: Backoff,
    policy: RetryPolicy,
    format: FileFormat,
    path: String,
    cancel: CancellationToken,
    objects: VecDeque<ObjectMeta>,
    pending: VecDeque<RowBatch>,
}

impl Reader {
    fn into_stream(self, span: Span) -> BatchStream {
        stream::unfold(self, move |mut reader| {
            let span = span.clone();
            async move {
                let next = reader.next_batch().await?;
                Some((next, reader))
            }
            .instrument(span)
        })
        .boxed()
    }

    async fn next_batch(&mut self) -> Option<ScanResult<RowBatch>> {
        if self.tracker.state().is_terminal() {
            return None;
        }

        loop {
            if let Some(batch) = self.pending.pop_front() {
                return Some(Ok(batch));
            }
            let Some(object) = self.objects.pop_front() else {
                self.tracker.advance(ExecutionState::Succeeded);
                return None;
            };
            match self.read_object(&object).await {
                Ok(batches) => self.pending.extend(batches),
                Err(failure) => return Some(Err(self.tracker.fail(failure))),
            }
        }
    }

    async fn read_object(&self, object: &ObjectMeta) -> Result<Vec<RowBatch>, ExecutionFailure> {
        let client = &self.client;
        let location = object.location.as_str();
        let bytes = self
            .backoff
            .retry(self.policy, &self.cancel, || client.get(location))
            .await
            .map_err(|err| match err {
                RetryError::Permanent(err) => {
                    ExecutionFailure::Access(format!("failed to read '{location}': {err}"))
                }
                RetryError::Exhausted { last, attempts } => ExecutionFailure::Transient {
                    message: format!("failed to read '{location}': {last}"),
                    attempts,
                },
                RetryError::Cancelled => ExecutionFailure::Cancelled,
            })?;

        debug!(location, bytes = bytes.len(), scan = %self.path, "object read");
        self.decoder
            .decode(self.format, object, bytes)
            .map_err(|err| ExecutionFailure::Decode(err.to_string()))
    }
}

fn access_failure(path: &PathDescriptor, err: &StoreError) -> ExecutionFailure {
    ExecutionFailure::Access(format!("failed to open '{path}': {err}"))
}

fn retry_failure(path: &PathDescriptor, err: RetryError) -> ExecutionFailure {
    match err {
        RetryError::Permanent(err) => access_failure(path, &err),
        RetryError::Exhausted { last, attempts } => ExecutionFailure::Transient {
            message: format!("failed to open '{path}': {last}"),
            attempts,
        },
        RetryError::Cancelled => ExecutionFailure::Cancelled,
    }
}

/// Keep listed objects matching the path's wildcard, if it has one.
fn match_glob(
    path: &PathDescriptor,
    listed: Vec<ObjectMeta>,
) -> Result<Vec<ObjectMeta>, ExecutionFailure> {
    let Some(glob) = path.glob() else {
        return Ok(listed);
    };
    let matcher = glob_to_regex(glob).map_err(|err| {
        ExecutionFailure::Access(format!("failed to open '{path}': invalid glob: {err}"))
    })?;
    Ok(listed
        .into_iter()
        .filter(|object| matcher.is_match(&object.location))
        .collect())
}

/// `*` matches within one path segment, `**` across segments, `?` one character.
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                pattern.push_str(".*");
            }
            '*' => pattern.push_str("[^/]*"),
            '?' => pattern.push_str("[^/]"),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use crate::domain::models::{CredentialProviderArg, ScanArgs, StorageOptions};
    use crate::infrastructure::object_store::InMemoryStoreFactory;
    use crate::services::scan_builder::{build, scan_parquet};
    use bytes::Bytes;
    use std::time::Duration;

    fn executor(store: Arc<InMemoryStoreFactory>) -> Executor {
        Executor::new(
            store,
            Arc::new(AutoProviderRegistry::new(true)),
            Arc::new(NdjsonDecoder),
            Backoff::new(1, 5, Duration::from_secs(5)),
        )
    }

    #[test]
    fn test_glob_to_regex() {
        let single = glob_to_regex("year=2024/*.parquet").unwrap();
        assert!(single.is_match("year=2024/part-0.parquet"));
        assert!(!single.is_match("year=2024/month=1/part-0.parquet"));
        assert!(!single.is_match("year=2024/part-0.csv"));

        let deep = glob_to_regex("data/**/*.csv").unwrap();
        assert!(deep.is_match("data/a/b/c.csv"));
    }

    #[tokio::test]
    async fn test_collect_reads_single_object() {
        let store = Arc::new(InMemoryStoreFactory::new());
        store.put("bucket/data.parquet", Bytes::from_static(b"PAR1"));

        let lazy = scan_parquet("s3://bucket/data.parquet", ScanArgs::new()).unwrap();
        let batches = lazy.collect(&executor(store)).await.unwrap();

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].source, "data.parquet");
        assert_eq!(batches[0].byte_len(), Some(4));
    }

    #[tokio::test]
    async fn test_missing_object_is_compute_error() {
        let store = Arc::new(InMemoryStoreFactory::new());
        let lazy = scan_parquet("s3://bucket/missing.parquet", ScanArgs::new()).unwrap();

        let err = lazy.collect(&executor(store)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComputeError);
        assert!(err.message().contains("missing.parquet"));
    }

    #[tokio::test]
    async fn test_unrecognized_scheme_fails_at_open() {
        let store = Arc::new(InMemoryStoreFactory::new());
        let lazy = scan_parquet("nosuch://bucket/data.parquet", ScanArgs::new()).unwrap();

        let err = lazy.collect(&executor(store.clone())).await.unwrap_err();
        assert!(err.is_compute_error());
        assert!(err.message().contains("unrecognized scheme 'nosuch'"));
        assert_eq!(store.connections(), 0);
    }

    #[tokio::test]
    async fn test_glob_selects_matching_objects() {
        let store = Arc::new(InMemoryStoreFactory::new());
        store.put("bucket/year=2024/a.csv", Bytes::from_static(b"x\n1\n"));
        store.put("bucket/year=2024/b.csv", Bytes::from_static(b"x\n2\n"));
        store.put("bucket/year=2024/c.json", Bytes::from_static(b"{}"));

        let plan = build(
            FileFormat::Csv,
            "s3://bucket/year=2024/*.csv",
            ScanArgs::new(),
        )
        .unwrap();
        let batches = executor(store).collect(&plan).await.unwrap();

        let sources: Vec<_> = batches.iter().map(|b| b.source.as_str()).collect();
        assert_eq!(sources, vec!["year=2024/a.csv", "year=2024/b.csv"]);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_within_budget() {
        let store = Arc::new(InMemoryStoreFactory::new());
        store.put("bucket/data.parquet", Bytes::from_static(b"PAR1"));
        store.fail_next_transient(2);

        let lazy =
            scan_parquet("s3://bucket/data.parquet", ScanArgs::new().with_retries(2)).unwrap();
        let batches = lazy.collect(&executor(store)).await.unwrap();
        assert_eq!(batches.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_is_compute_error() {
        let store = Arc::new(InMemoryStoreFactory::new());
        store.put("bucket/data.parquet", Bytes::from_static(b"PAR1"));
        store.fail_next_transient(5);

        let lazy =
            scan_parquet("s3://bucket/data.parquet", ScanArgs::new().with_retries(1)).unwrap();
        let err = lazy.collect(&executor(store)).await.unwrap_err();

        assert!(err.is_compute_error());
        assert!(err.message().contains("gave up after 2 attempts"));
    }

    #[tokio::test]
    async fn test_credentials_merge_over_storage_options() {
        let store = Arc::new(InMemoryStoreFactory::new());
        store.put("bucket/data.parquet", Bytes::from_static(b"PAR1"));

        let args = ScanArgs::new()
            .without_credential_provider()
            .with_storage_options([("aws_region", "us-east-1")].into_iter().collect());
        let lazy = scan_parquet("s3://bucket/data.parquet", args).unwrap();
        lazy.collect(&executor(store.clone())).await.unwrap();

        let seen = store.last_options().unwrap();
        assert_eq!(seen.get("aws_region"), Some("us-east-1"));
    }

    #[tokio::test]
    async fn test_user_function_credentials_reach_store() {
        let store = Arc::new(InMemoryStoreFactory::new());
        store.put("bucket/data.parquet", Bytes::from_static(b"PAR1"));

        let args = ScanArgs::new().with_credential_provider(CredentialProviderArg::function(|| {
            let options: StorageOptions =
                [("aws_session_token", "FwoG")].into_iter().collect();
            Ok(CredentialSet::from_options(options))
        }));
        let lazy = scan_parquet("s3://bucket/data.parquet", args).unwrap();
        lazy.collect(&executor(store.clone())).await.unwrap();

        assert_eq!(
            store.last_options().unwrap().get("aws_session_token"),
            Some("FwoG")
        );
    }

    #[tokio::test]
    async fn test_cancelled_execution_is_compute_error() {
        let store = Arc::new(InMemoryStoreFactory::new());
        store.put("bucket/data.parquet", Bytes::from_static(b"PAR1"));
        let plan = build(FileFormat::Parquet, "s3://bucket/data.parquet", ScanArgs::new()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = executor(store)
            .execute_with_cancellation(&plan, cancel)
            .await
            .err()
            .unwrap();

        assert!(err.is_compute_error());
        assert_eq!(err.message(), "scan cancelled");
    }

    #[tokio::test]
    async fn test_stream_stops_after_failure() {
        let store = Arc::new(InMemoryStoreFactory::new());
        store.put("bucket/dir/a.ndjson", Bytes::from_static(b"{\"a\":1}\n"));
        store.put("bucket/dir/b.ndjson", Bytes::from_static(b"not json\n"));
        store.put("bucket/dir/c.ndjson", Bytes::from_static(b"{\"a\":3}\n"));

        let plan = build(FileFormat::Ndjson, "s3://bucket/dir/", ScanArgs::new()).unwrap();
        let mut stream = executor(store).execute(&plan).await.unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.is_compute_error());
        assert!(stream.next().await.is_none());
    }
}

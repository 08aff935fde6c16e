//! Word list loading and caching.
//!
//! The word list lives in a spreadsheet and is pulled as a CSV export. A
//! [`CatalogCache`] keeps the last normalized [`Catalog`] and refreshes it
//! once the configured interval has elapsed.

use std::{
    future::Future,
    ops::Deref,
    sync::Arc,
    time::{Duration, Instant},
};

use csv::{ReaderBuilder, StringRecord, Trim};
use tokio::sync::Mutex;
use tracing::instrument;
use url::Url;

use crate::error::FetchError;

pub const TERM_COLUMN: &str = "Phrasal verb/ Vocab";
pub const MEANING_COLUMN: &str = "Meaning";
pub const TYPE_COLUMN: &str = "Type";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WordEntry {
    pub term: String,
    pub word_type: String,
    pub meaning: String,
}

impl WordEntry {
    pub fn new(
        term: impl Into<String>,
        word_type: impl Into<String>,
        meaning: impl Into<String>,
    ) -> Self {
        Self {
            term: term.into(),
            word_type: word_type.into(),
            meaning: meaning.into(),
        }
    }
}

/// Normalized word list. Clones share the same allocation.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Arc<[WordEntry]>,
}

impl Catalog {
    pub fn new(entries: Vec<WordEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[WordEntry] {
        &self.entries
    }

    /// True when both handles come from the same load.
    pub fn ptr_eq(&self, other: &Catalog) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Deref for Catalog {
    type Target = [WordEntry];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Catalog {}

/// Parses a CSV export into a catalog.
///
/// Every cell is trimmed; rows missing any of the term, meaning or type are
/// dropped. The three header names are required.
pub fn parse_catalog(data: &[u8]) -> Result<Catalog, FetchError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let term_idx = column(&headers, TERM_COLUMN)?;
    let meaning_idx = column(&headers, MEANING_COLUMN)?;
    let type_idx = column(&headers, TYPE_COLUMN)?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |idx: usize| record.get(idx).map(str::trim).filter(|s| !s.is_empty());

        if let (Some(term), Some(word_type), Some(meaning)) =
            (cell(term_idx), cell(type_idx), cell(meaning_idx))
        {
            entries.push(WordEntry::new(term, word_type, meaning));
        }
    }

    Ok(Catalog::new(entries))
}

fn column(headers: &StringRecord, name: &'static str) -> Result<usize, FetchError> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or(FetchError::MissingColumn(name))
}

/// Where the word list comes from.
pub trait CatalogSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Catalog, FetchError>> + Send;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// CSV export of one spreadsheet tab.
#[derive(Debug, Clone)]
pub struct SheetSource {
    client: reqwest::Client,
    url: Url,
}

impl SheetSource {
    pub fn new(sheet_id: &str, sheet_gid: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: export_url(sheet_id, sheet_gid)?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Export link for one tab. The sheet id is percent-encoded as a single path segment.
pub fn export_url(sheet_id: &str, sheet_gid: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse("https://docs.google.com/spreadsheets/d")?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .push(sheet_id)
        .push("export");
    url.query_pairs_mut()
        .append_pair("format", "csv")
        .append_pair("gid", sheet_gid);
    Ok(url)
}

impl CatalogSource for SheetSource {
    async fn fetch(&self) -> Result<Catalog, FetchError> {
        let body = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        parse_catalog(&body)
    }
}

#[derive(Debug)]
struct Cached {
    catalog: Catalog,
    fetched_at: Instant,
}

/// Memoizes the catalog and refreshes it after `refresh_interval`.
///
/// Callers that miss the cache at the same time share one fetch: the slot
/// stays locked while the source is being read.
pub struct CatalogCache<S, C = SystemClock> {
    source: S,
    clock: C,
    refresh_interval: Duration,
    fetch_timeout: Duration,
    slot: Mutex<Option<Cached>>,
}

impl<S: CatalogSource> CatalogCache<S> {
    pub fn new(source: S, refresh_interval: Duration, fetch_timeout: Duration) -> Self {
        Self::with_clock(source, SystemClock, refresh_interval, fetch_timeout)
    }
}

impl<S: CatalogSource, C: Clock> CatalogCache<S, C> {
    pub fn with_clock(
        source: S,
        clock: C,
        refresh_interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            refresh_interval,
            fetch_timeout,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached catalog, fetching a new one if it is missing or stale.
    ///
    /// A failed refresh is reported to the caller; the stale entry is not
    /// served in its place.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self) -> Result<Catalog, FetchError> {
        let mut slot = self.slot.lock().await;
        let now = self.clock.now();

        if let Some(cached) = slot.as_ref() {
            if now.saturating_duration_since(cached.fetched_at) <= self.refresh_interval {
                return Ok(cached.catalog.clone());
            }
        }

        let catalog = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::Timeout(self.fetch_timeout)),
        };
        log::info!("Word list refreshed: {} entries", catalog.len());

        *slot = Some(Cached {
            catalog: catalog.clone(),
            fetched_at: now,
        });
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    const SAMPLE: &str = "\
Phrasal verb/ Vocab,Meaning,Type,Notes
  give up , stop trying ,phrasal,
look after,take care of,phrasal,extra
,no term,phrasal,
sturdy,   ,adjective,
resilient,able to recover,
keen,eager,adjective
";

    #[test]
    fn parses_and_normalizes_rows() {
        let catalog = parse_catalog(SAMPLE.as_bytes()).unwrap();

        assert_eq!(
            catalog.entries(),
            &[
                WordEntry::new("give up", "phrasal", "stop trying"),
                WordEntry::new("look after", "phrasal", "take care of"),
                WordEntry::new("keen", "adjective", "eager"),
            ]
        );
    }

    #[test]
    fn tolerates_short_rows() {
        let csv = "Type,Meaning,Phrasal verb/ Vocab\nnoun,a dog\nnoun,a cat,cat\n";
        let catalog = parse_catalog(csv.as_bytes()).unwrap();
        assert_eq!(catalog.entries(), &[WordEntry::new("cat", "noun", "a cat")]);
    }

    #[test]
    fn missing_header_is_an_error() {
        let csv = "Word,Meaning,Type\nkeen,eager,adjective\n";
        let err = parse_catalog(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, FetchError::MissingColumn(TERM_COLUMN)));
    }

    #[test]
    fn builds_export_url() {
        let url = export_url("abc123", "987").unwrap();
        assert_eq!(
            url.as_str(),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv&gid=987"
        );
    }

    #[test]
    fn sheet_id_stays_inside_its_path_segment() {
        let url = export_url("a/b?c#d", "0").unwrap();
        assert_eq!(
            url.as_str(),
            "https://docs.google.com/spreadsheets/d/a%2Fb%3Fc%23d/export?format=csv&gid=0"
        );
        assert_eq!(url.query(), Some("format=csv&gid=0"));
        assert_eq!(url.fragment(), None);
    }

    struct FakeSource {
        calls: Arc<AtomicUsize>,
        delay: Duration,
        fail: bool,
    }

    impl FakeSource {
        fn new(calls: Arc<AtomicUsize>) -> Self {
            Self {
                calls,
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    impl CatalogSource for FakeSource {
        async fn fetch(&self) -> Result<Catalog, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(FetchError::MissingColumn(MEANING_COLUMN));
            }
            parse_catalog(SAMPLE.as_bytes())
        }
    }

    #[derive(Clone)]
    struct ManualClock {
        start: Instant,
        offset_secs: Arc<AtomicU64>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset_secs: Arc::new(AtomicU64::new(0)),
            }
        }

        fn advance(&self, secs: u64) {
            self.offset_secs.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + Duration::from_secs(self.offset_secs.load(Ordering::SeqCst))
        }
    }

    fn cache(source: FakeSource, clock: ManualClock) -> CatalogCache<FakeSource, ManualClock> {
        CatalogCache::with_clock(source, clock, Duration::from_secs(300), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn returns_same_catalog_within_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = ManualClock::new();
        let cache = cache(FakeSource::new(calls.clone()), clock.clone());

        let first = cache.get().await.unwrap();
        clock.advance(300);
        let second = cache.get().await.unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refreshes_after_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = ManualClock::new();
        let cache = cache(FakeSource::new(calls.clone()), clock.clone());

        let first = cache.get().await.unwrap();
        clock.advance(301);
        let second = cache.get().await.unwrap();

        assert!(!first.ptr_eq(&second));
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FakeSource {
            delay: Duration::from_millis(200),
            ..FakeSource::new(calls.clone())
        };
        let cache = cache(source, ManualClock::new());

        let (a, b) = tokio::join!(cache.get(), cache.get());

        assert!(a.unwrap().ptr_eq(&b.unwrap()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_surfaced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FakeSource {
            fail: true,
            ..FakeSource::new(calls.clone())
        };
        let cache = cache(source, ManualClock::new());

        assert!(matches!(cache.get().await, Err(FetchError::MissingColumn(_))));
        assert!(cache.get().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FakeSource {
            delay: Duration::from_secs(60),
            ..FakeSource::new(calls)
        };
        let cache = cache(source, ManualClock::new());

        assert!(matches!(
            cache.get().await,
            Err(FetchError::Timeout(timeout)) if timeout == Duration::from_secs(5)
        ));
    }
}

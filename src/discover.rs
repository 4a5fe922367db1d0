//! Enumerates a collection of numbered resources that has no directory
//! listing. IDs are requested in fixed-size batches: every ID in a batch is
//! fetched concurrently, the batch settles completely, and a 404 anywhere in
//! the batch ends discovery.
//!
//! Two behaviours are configurable because they are known to be coarse:
//!
//! * [`StopRule`]: by default a batch containing a 404 still contributes every
//!   resource it found, including those numbered above the gap.
//! * [`FailurePolicy`]: by default transport failures are dropped from the
//!   result and do not stop discovery, so a failed fetch is indistinguishable
//!   from a missing resource except that it never halts the walk.

use crate::fetch::{Error as FetchError, FetchOutcome, Result as FetchResult};
use crate::id::{batch, ResourceId};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

/// Decides which resources a batch containing a 404 contributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopRule {
    /// Keep every resource found in the batch, even those numbered above
    /// the 404.
    AnyNotFound,

    /// Keep only resources numbered below the lowest 404 in the batch.
    FirstNotFound,
}

impl Default for StopRule {
    fn default() -> Self {
        StopRule::AnyNotFound
    }
}

/// Decides what happens to transport failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Log and drop the failed resource; discovery carries on.
    Discard,

    /// Fail discovery with the lowest-numbered failure once its batch has
    /// settled.
    Propagate,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Discard
    }
}

/// Discovery parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// The number of IDs fetched concurrently per round.
    pub batch_size: usize,

    /// IDs at or above this bound are never fetched.
    pub max_id: u32,

    /// Which resources a round containing a 404 contributes.
    pub stop_rule: StopRule,

    /// What transport failures do to the run.
    pub on_fetch_error: FailurePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            batch_size: 15,
            max_id: 1000,
            stop_rule: StopRule::default(),
            on_fetch_error: FailurePolicy::default(),
        }
    }
}

/// A resource tagged with the ID it was requested under. Payloads don't carry
/// their own ID, so the ID is serialized alongside the resource's fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Discovered<R> {
    pub id: ResourceId,

    #[serde(flatten)]
    pub resource: R,
}

/// The settled outcomes of one batch, in request order.
pub struct Round<R> {
    pub outcomes: Vec<(ResourceId, FetchResult<FetchOutcome<R>>)>,
}

impl<R> Round<R> {
    /// The lowest ID in the round that came back 404.
    pub fn first_not_found(&self) -> Option<ResourceId> {
        self.outcomes
            .iter()
            .find(|(_, outcome)| matches!(outcome, Ok(FetchOutcome::NotFound)))
            .map(|(id, _)| *id)
    }

    /// Splits the round into the resources it contributes under `stop_rule`
    /// and the transport failures it produced. Both keep request order, and
    /// both skip IDs that `stop_rule` places past the end of the collection.
    pub fn settle(
        self,
        stop_rule: StopRule,
    ) -> (Vec<Discovered<R>>, Vec<FetchError>) {
        let cutoff = match stop_rule {
            StopRule::AnyNotFound => None,
            StopRule::FirstNotFound => self.first_not_found(),
        };

        let mut found = Vec::new();
        let mut failures = Vec::new();
        for (id, outcome) in self.outcomes {
            if matches!(cutoff, Some(cutoff) if id > cutoff) {
                continue;
            }
            match outcome {
                Ok(FetchOutcome::Found(resource)) => {
                    found.push(Discovered { id, resource })
                }
                Ok(FetchOutcome::NotFound) => {}
                Err(err) => failures.push(err),
            }
        }
        (found, failures)
    }
}

/// Fetches every ID in `ids` concurrently and waits for all of them,
/// whatever their outcome.
pub async fn run_round<R, F, Fut>(fetch_one: &F, ids: Vec<ResourceId>) -> Round<R>
where
    F: Fn(ResourceId) -> Fut,
    Fut: Future<Output = FetchResult<FetchOutcome<R>>>,
{
    let outcomes = join_all(ids.iter().map(|&id| fetch_one(id))).await;
    Round {
        outcomes: ids.into_iter().zip(outcomes).collect(),
    }
}

/// Discovers resources `1, 2, ...` by calling `fetch_one` for batches of
/// `settings.batch_size` IDs, one batch at a time, until a batch contains a
/// 404 or the IDs reach `settings.max_id`. The result is in ascending ID
/// order.
///
/// `fetch_one` is called concurrently for distinct IDs within a batch.
pub async fn discover_all<R, F, Fut>(
    fetch_one: F,
    settings: &Settings,
) -> Result<Vec<Discovered<R>>>
where
    F: Fn(ResourceId) -> Fut,
    Fut: Future<Output = FetchResult<FetchOutcome<R>>>,
{
    if settings.batch_size == 0 {
        return Err(Error::InvalidBatchSize);
    }

    let mut discovered = Vec::new();
    let mut rounds = 0usize;
    let mut next = Some(ResourceId::FIRST);
    while let Some(start) = next.filter(|start| start.get() < settings.max_id) {
        let ids = batch(start, settings.batch_size, settings.max_id);
        let attempted = ids.len();
        let round = run_round(&fetch_one, ids).await;
        rounds += 1;

        let gap = round.first_not_found();
        let (found, failures) = round.settle(settings.stop_rule);
        debug!(
            %start,
            attempted,
            found = found.len(),
            failed = failures.len(),
            gap = gap.map(ResourceId::get),
            "discovery round settled"
        );

        match settings.on_fetch_error {
            FailurePolicy::Propagate => {
                if let Some(err) = failures.into_iter().next() {
                    return Err(Error::Fetch(err));
                }
            }
            FailurePolicy::Discard => {
                for err in &failures {
                    warn!(error = %err, "dropping resource that failed to fetch");
                }
            }
        }

        discovered = concat(discovered, found);

        if let Some(gap) = gap {
            info!(
                count = discovered.len(),
                rounds,
                gap = gap.get(),
                "discovery stopped at missing resource"
            );
            return Ok(discovered);
        }

        next = u32::try_from(settings.batch_size)
            .ok()
            .and_then(|size| start.get().checked_add(size))
            .and_then(|id| ResourceId::new(id).ok());
    }

    info!(
        count = discovered.len(),
        rounds,
        max_id = settings.max_id,
        "discovery stopped at the ID bound"
    );
    Ok(discovered)
}

fn concat<T>(mut acc: Vec<T>, round: Vec<T>) -> Vec<T> {
    acc.extend(round);
    acc
}

/// The result of a discovery run.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed discovery run.
#[derive(Debug)]
pub enum Error {
    /// Returned when the batch size is zero, before any fetch.
    InvalidBatchSize,

    /// Returned under [`FailurePolicy::Propagate`] for the first transport
    /// failure in a round.
    Fetch(FetchError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidBatchSize => {
                write!(f, "discovery batch size must be at least 1")
            }
            Error::Fetch(err) => write!(f, "discovering resources: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidBatchSize => None,
            Error::Fetch(err) => Some(err),
        }
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Error {
        Error::Fetch(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use reqwest::StatusCode;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use url::Url;

    /// An in-memory host. IDs not listed are 404s.
    #[derive(Default)]
    struct Host {
        resources: HashSet<u32>,
        failing: HashSet<u32>,
        requested: Mutex<Vec<u32>>,
    }

    impl Host {
        fn dense(last: u32) -> Host {
            Host {
                resources: (1..=last).collect(),
                ..Host::default()
            }
        }

        fn failing(mut self, id: u32) -> Host {
            self.failing.insert(id);
            self
        }

        fn with(mut self, id: u32) -> Host {
            self.resources.insert(id);
            self
        }

        async fn fetch(&self, id: ResourceId) -> FetchResult<FetchOutcome<String>> {
            self.requested.lock().unwrap().push(id.get());
            tokio::task::yield_now().await;
            if self.failing.contains(&id.get()) {
                return Err(FetchError::Status {
                    id,
                    url: Url::parse("http://localhost/").unwrap(),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                });
            }
            Ok(match self.resources.contains(&id.get()) {
                true => FetchOutcome::Found(format!("post {}", id)),
                false => FetchOutcome::NotFound,
            })
        }

        fn requested(&self) -> Vec<u32> {
            let mut v = self.requested.lock().unwrap().clone();
            v.sort_unstable();
            v
        }
    }

    fn settings(batch_size: usize) -> Settings {
        Settings {
            batch_size,
            ..Settings::default()
        }
    }

    async fn discover(host: &Host, settings: &Settings) -> Result<Vec<u32>> {
        let found = discover_all(move |id| host.fetch(id), settings).await?;
        Ok(found.into_iter().map(|d| d.id.get()).collect())
    }

    #[tokio::test]
    async fn test_stops_in_batch_containing_gap() {
        let host = Host::dense(20);
        let found = discover(&host, &settings(15)).await.unwrap();
        assert_eq!((1..=20).collect::<Vec<u32>>(), found);
        // Rounds 1..=15 and 16..=30; 31 is never attempted.
        assert_eq!((1..=30).collect::<Vec<u32>>(), host.requested());
    }

    #[tokio::test]
    async fn test_first_batch_gap() {
        // IDs 1-3 exist, 4 is missing, batch size 5.
        let host = Host::dense(3);
        let found = discover(&host, &settings(5)).await.unwrap();
        assert_eq!(vec![1, 2, 3], found);
        assert_eq!(vec![1, 2, 3, 4, 5], host.requested());
    }

    #[tokio::test]
    async fn test_any_not_found_keeps_ids_past_gap() {
        let host = Host::dense(3).with(5);
        let found = discover(&host, &settings(5)).await.unwrap();
        assert_eq!(vec![1, 2, 3, 5], found);
        assert_eq!(vec![1, 2, 3, 4, 5], host.requested());
    }

    #[tokio::test]
    async fn test_first_not_found_drops_ids_past_gap() {
        let host = Host::dense(3).with(5);
        let settings = Settings {
            stop_rule: StopRule::FirstNotFound,
            ..settings(5)
        };
        let found = discover(&host, &settings).await.unwrap();
        assert_eq!(vec![1, 2, 3], found);
    }

    #[tokio::test]
    async fn test_first_not_found_ignores_failures_past_gap() {
        // 4 is missing and 5 fails; 5 is past the end under this rule.
        let host = Host::dense(3).failing(5);
        let settings = Settings {
            stop_rule: StopRule::FirstNotFound,
            on_fetch_error: FailurePolicy::Propagate,
            ..settings(5)
        };
        let found = discover(&host, &settings).await.unwrap();
        assert_eq!(vec![1, 2, 3], found);
    }

    #[tokio::test]
    async fn test_any_not_found_propagates_failures_past_gap() {
        let host = Host::dense(3).failing(5);
        let settings = Settings {
            on_fetch_error: FailurePolicy::Propagate,
            ..settings(5)
        };
        match discover(&host, &settings).await {
            Err(Error::Fetch(err)) => {
                assert_eq!(Some(5), err.id().map(ResourceId::get))
            }
            other => panic!("wanted a fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_exist_stops_below_max_id() {
        let host = Host::dense(2000);
        let settings = Settings {
            max_id: 100,
            ..settings(15)
        };
        let found = discover(&host, &settings).await.unwrap();
        assert_eq!(99, found.len());
        assert!(host.requested().len() <= 100);
        assert_eq!(Some(&99), host.requested().last());
    }

    #[tokio::test]
    async fn test_batch_larger_than_max_id_runs_one_round() {
        let host = Host::dense(2000);
        let settings = Settings {
            max_id: 10,
            ..settings(15)
        };
        let found = discover(&host, &settings).await.unwrap();
        assert_eq!((1..10).collect::<Vec<u32>>(), found);
        assert_eq!((1..10).collect::<Vec<u32>>(), host.requested());
    }

    #[tokio::test]
    async fn test_batch_size_does_not_change_result() {
        for last in [0, 1, 14, 15, 16, 44] {
            let one = discover(&Host::dense(last), &settings(1)).await.unwrap();
            let fifteen = discover(&Host::dense(last), &settings(15)).await.unwrap();
            let twenty_five =
                discover(&Host::dense(last), &settings(25)).await.unwrap();
            assert_eq!(one, fifteen, "collection of {}", last);
            assert_eq!(one, twenty_five, "collection of {}", last);
            assert_eq!(last as usize, one.len());
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed_and_does_not_halt() {
        // ID 7 fails; it is neither reported nor treated as the end.
        let host = Host::dense(20).failing(7);
        let found = discover(&host, &settings(5)).await.unwrap();
        let wanted: Vec<u32> = (1..=20).filter(|&id| id != 7).collect();
        assert_eq!(wanted, found);
        assert!(host.requested().contains(&21));
    }

    #[tokio::test]
    async fn test_propagate_reports_lowest_failure() {
        let host = Host::dense(20).failing(9).failing(7);
        let settings = Settings {
            on_fetch_error: FailurePolicy::Propagate,
            ..settings(5)
        };
        match discover(&host, &settings).await {
            Err(Error::Fetch(err)) => {
                assert_eq!(Some(7), err.id().map(ResourceId::get))
            }
            other => panic!("wanted a fetch error, got {:?}", other),
        }
        // The failing round settled in full; nothing after it ran.
        assert_eq!((1..=10).collect::<Vec<u32>>(), host.requested());
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected_before_fetching() {
        let host = Host::dense(5);
        assert!(matches!(
            discover(&host, &settings(0)).await,
            Err(Error::InvalidBatchSize)
        ));
        assert!(host.requested().is_empty());
    }

    #[tokio::test]
    async fn test_round_preserves_request_order() {
        // Later IDs answer first; the round still lists them in ID order.
        let fetch = |id: ResourceId| async move {
            let delay = 30 - u64::from(id.get()) * 5;
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            FetchResult::Ok(FetchOutcome::Found(id.get()))
        };
        let ids = batch(ResourceId::FIRST, 5, 1000);
        let round = run_round(&fetch, ids).await;
        let order: Vec<u32> = round.outcomes.iter().map(|(id, _)| id.get()).collect();
        assert_eq!(vec![1, 2, 3, 4, 5], order);
    }

    #[test]
    fn test_discovered_serializes_id_with_fields() {
        let mut fields = HashMap::new();
        fields.insert("title".to_owned(), "Hello".to_owned());
        let discovered = Discovered {
            id: ResourceId::new(4).unwrap(),
            resource: fields,
        };
        let json: serde_json::Value = serde_json::to_value(&discovered).unwrap();
        assert_eq!(Some(4), json["id"].as_u64());
        assert_eq!(Some("Hello"), json["title"].as_str());
    }
}

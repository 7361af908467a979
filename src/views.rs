//! View models: one task per open view, fed by store subscriptions and
//! publishing its latest state through a watch channel.

use crate::models::{CompanyId, DriverStats, Record, VehicleStats};
use crate::normalize::{normalize_drivers, normalize_vehicles};
use crate::routes::RouteBoard;
use crate::stats::{self, BucketTable};
use crate::store::{CancelToken, DataPath, SharedStore};
use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState<T> {
    pub loading: bool,
    pub error: Option<String>,
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ViewState<T> {
    pub fn loading(data: T) -> Self {
        Self {
            loading: true,
            error: None,
            updated_at: None,
            data,
        }
    }

    pub fn ready(data: T) -> Self {
        Self {
            loading: false,
            error: None,
            updated_at: Some(Local::now().to_rfc3339()),
            data,
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Owner side of an open view. Dropping it tears the view down.
#[derive(Debug)]
pub struct ViewHandle<T> {
    state: watch::Receiver<ViewState<T>>,
    cancel: CancelToken,
}

impl<T: Clone> ViewHandle<T> {
    pub(crate) fn new(state: watch::Receiver<ViewState<T>>, cancel: CancelToken) -> Self {
        Self { state, cancel }
    }

    pub fn current(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    /// Waits until the first snapshot or error has been applied.
    pub async fn settled(&mut self) -> ViewState<T> {
        if let Ok(state) = self.state.wait_for(|state| !state.loading).await {
            return state.clone();
        }
        self.current()
    }

    /// Waits for the next published state; `None` once the view has stopped.
    pub async fn changed(&mut self) -> Option<ViewState<T>> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl<T> Drop for ViewHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Runs a view over a single path: every snapshot is rebuilt into `T`, the
/// first error ends the view.
pub(crate) fn spawn_single<T, F>(
    store: &SharedStore,
    path: DataPath,
    what: &'static str,
    initial: T,
    build: F,
) -> ViewHandle<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(Option<&Value>) -> T + Send + 'static,
{
    let cancel = CancelToken::new();
    let (tx, rx) = watch::channel(ViewState::loading(initial));
    let mut subscription = store.subscribe(&path, &cancel);
    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = task_cancel.cancelled() => break,
                event = subscription.next() => match event {
                    Some(Ok(snapshot)) => {
                        debug!(%path, present = snapshot.is_some(), "applying snapshot");
                        tx.send_replace(ViewState::ready(build(snapshot.as_ref())));
                    }
                    Some(Err(err)) => {
                        warn!(%path, error = %err, "subscription failed");
                        tx.send_modify(|state| state.fail(format!("Failed to fetch {what}.")));
                        break;
                    }
                    None => break,
                },
            }
        }
        subscription.unsubscribe();
    });
    ViewHandle::new(rx, cancel)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverBoard {
    pub drivers: Vec<Record>,
    pub found: bool,
    pub stats: DriverStats,
    pub availability: BucketTable,
    pub initials: BucketTable,
}

impl Default for DriverBoard {
    fn default() -> Self {
        Self::from_snapshot(None)
    }
}

impl DriverBoard {
    pub fn from_snapshot(snapshot: Option<&Value>) -> Self {
        let normalized = normalize_drivers(snapshot);
        let drivers = normalized.records;
        Self {
            stats: stats::driver_stats(&drivers),
            availability: stats::availability(&drivers),
            initials: stats::name_initials(&drivers),
            found: normalized.found,
            drivers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VehicleBoard {
    pub vehicles: Vec<Record>,
    pub found: bool,
    pub stats: VehicleStats,
    pub types: BucketTable,
    pub owners: BucketTable,
}

impl VehicleBoard {
    pub fn from_snapshot(snapshot: Option<&Value>) -> Self {
        let normalized = normalize_vehicles(snapshot);
        let vehicles = normalized.records;
        let types = stats::vehicle_types(&vehicles);
        let owners = stats::owner_prefixes(&vehicles);
        Self {
            stats: stats::vehicle_stats(&vehicles, &types, &owners),
            found: normalized.found,
            vehicles,
            types,
            owners,
        }
    }
}

pub fn driver_view(store: &SharedStore) -> ViewHandle<DriverBoard> {
    spawn_single(
        store,
        DataPath::drivers(),
        "drivers",
        DriverBoard::default(),
        DriverBoard::from_snapshot,
    )
}

pub fn vehicle_view(store: &SharedStore) -> ViewHandle<VehicleBoard> {
    spawn_single(
        store,
        DataPath::vehicles(),
        "vehicles",
        VehicleBoard::default(),
        VehicleBoard::from_snapshot,
    )
}

pub fn routes_view(store: &SharedStore, company: &CompanyId) -> ViewHandle<RouteBoard> {
    let company_id = company.to_string();
    spawn_single(
        store,
        DataPath::routes(company),
        "routes",
        RouteBoard::empty(&company_id),
        move |snapshot| RouteBoard::from_snapshot(&company_id, snapshot),
    )
}

pub fn dispatched_view(store: &SharedStore, company: &CompanyId) -> ViewHandle<RouteBoard> {
    let company_id = company.to_string();
    spawn_single(
        store,
        DataPath::departed(company),
        "dispatched routes",
        RouteBoard::empty(&company_id),
        move |snapshot| RouteBoard::from_snapshot(&company_id, snapshot),
    )
}

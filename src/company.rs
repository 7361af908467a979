//! Company-scoped vehicle resolution.
//!
//! Vehicles for a company live either directly under `vehicles/{company}` or
//! somewhere in the full `vehicles` tree, filed under the company id or tagged
//! with a `companyId` field. The direct path wins whenever it holds data; the
//! full tree is only watched while it does not.

use crate::models::{Company, CompanyId, Record, VehicleStats};
use crate::normalize::{filter_company_vehicles, normalize_owner_vehicles};
use crate::stats::{self, BucketTable};
use crate::store::{CancelToken, DataPath, SharedStore, SnapshotEvent, Subscription};
use crate::views::{ViewHandle, ViewState};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleSource {
    Direct,
    Fallback,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    pub vehicles: Vec<Record>,
    pub source: VehicleSource,
}

pub fn resolve_company_vehicles(
    company: &CompanyId,
    direct: Option<&Value>,
    full_tree: Option<&Value>,
) -> Resolution {
    let direct = normalize_owner_vehicles(company.as_str(), direct);
    if direct.found {
        return Resolution {
            vehicles: direct.records,
            source: VehicleSource::Direct,
        };
    }
    let scanned = filter_company_vehicles(company.as_str(), full_tree);
    if scanned.records.is_empty() {
        return Resolution::default();
    }
    Resolution {
        vehicles: scanned.records,
        source: VehicleSource::Fallback,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyVehicleBoard {
    pub company_id: String,
    pub company: Option<Company>,
    pub vehicles: Vec<Record>,
    pub source: VehicleSource,
    pub stats: VehicleStats,
    pub types: BucketTable,
}

impl CompanyVehicleBoard {
    fn empty(company: &CompanyId) -> Self {
        Self {
            company_id: company.to_string(),
            company: None,
            vehicles: Vec::new(),
            source: VehicleSource::None,
            stats: VehicleStats::default(),
            types: BucketTable::default(),
        }
    }
}

/// Latest snapshot per path. `None` means the path has not reported yet.
#[derive(Debug)]
struct Tracker {
    company_id: CompanyId,
    company: Option<Option<Company>>,
    direct: Option<Option<Value>>,
    full_tree: Option<Option<Value>>,
    settled: bool,
}

impl Tracker {
    fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            company: None,
            direct: None,
            full_tree: None,
            settled: false,
        }
    }

    fn direct_has_data(&self) -> bool {
        normalize_owner_vehicles(
            self.company_id.as_str(),
            self.direct.as_ref().and_then(Option::as_ref),
        )
        .found
    }

    /// Direct path empty and the full tree not reported yet.
    fn fallback_pending(&self) -> bool {
        self.direct.is_some() && !self.direct_has_data() && self.full_tree.is_none()
    }

    /// Only the vehicle paths decide; the company name fills in whenever it
    /// arrives.
    fn is_settled(&self) -> bool {
        self.direct.is_some() && !self.fallback_pending()
    }

    fn board(&self) -> CompanyVehicleBoard {
        let resolution = resolve_company_vehicles(
            &self.company_id,
            self.direct.as_ref().and_then(Option::as_ref),
            self.full_tree.as_ref().and_then(Option::as_ref),
        );
        let types = stats::vehicle_types(&resolution.vehicles);
        let owners = stats::owner_prefixes(&resolution.vehicles);
        CompanyVehicleBoard {
            company_id: self.company_id.to_string(),
            company: self.company.clone().flatten(),
            stats: stats::vehicle_stats(&resolution.vehicles, &types, &owners),
            vehicles: resolution.vehicles,
            source: resolution.source,
            types,
        }
    }

    /// State to publish next; `None` while a settled view waits for the
    /// re-opened fallback.
    fn next_state(&mut self) -> Option<ViewState<CompanyVehicleBoard>> {
        if self.settled && self.fallback_pending() {
            return None;
        }
        self.settled = self.settled || self.is_settled();
        let mut state = ViewState::ready(self.board());
        state.loading = !self.settled;
        Some(state)
    }
}

enum Feed {
    Company(Option<SnapshotEvent>),
    Direct(Option<SnapshotEvent>),
    FullTree(Option<SnapshotEvent>),
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<SnapshotEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

pub fn company_vehicle_view(store: &SharedStore, company: &CompanyId) -> ViewHandle<CompanyVehicleBoard> {
    let cancel = CancelToken::new();
    let (tx, rx) = watch::channel(ViewState::loading(CompanyVehicleBoard::empty(company)));
    let mut company_sub = store.subscribe(&DataPath::company(company), &cancel);
    let mut direct_sub = store.subscribe(&DataPath::company_vehicles(company), &cancel);
    let store = store.clone();
    let task_cancel = cancel.clone();
    let mut tracker = Tracker::new(company.clone());
    tokio::spawn(async move {
        let mut full_tree_sub: Option<Subscription> = None;
        loop {
            let feed = tokio::select! {
                _ = task_cancel.cancelled() => break,
                event = company_sub.next() => Feed::Company(event),
                event = direct_sub.next() => Feed::Direct(event),
                event = next_event(&mut full_tree_sub) => Feed::FullTree(event),
            };
            match feed {
                Feed::Company(Some(Ok(snapshot))) => {
                    tracker.company = Some(Company::from_snapshot(
                        tracker.company_id.as_str(),
                        snapshot.as_ref(),
                    ));
                }
                Feed::Direct(Some(Ok(snapshot))) => {
                    tracker.direct = Some(snapshot);
                    if tracker.direct_has_data() {
                        if let Some(subscription) = full_tree_sub.take() {
                            debug!(company = %tracker.company_id, "direct vehicles present, releasing full tree");
                            subscription.unsubscribe();
                        }
                        tracker.full_tree = None;
                    } else if full_tree_sub.is_none() {
                        debug!(company = %tracker.company_id, "no direct vehicles, scanning full tree");
                        full_tree_sub = Some(store.subscribe(&DataPath::vehicles(), &task_cancel));
                    }
                }
                Feed::FullTree(Some(Ok(snapshot))) => tracker.full_tree = Some(snapshot),
                Feed::Company(Some(Err(err)))
                | Feed::Direct(Some(Err(err)))
                | Feed::FullTree(Some(Err(err))) => {
                    warn!(company = %tracker.company_id, error = %err, "subscription failed");
                    tx.send_modify(|state| state.fail("Failed to fetch company vehicles."));
                    break;
                }
                Feed::Company(None) | Feed::Direct(None) | Feed::FullTree(None) => break,
            }
            if let Some(state) = tracker.next_state() {
                tx.send_replace(state);
            }
        }
        company_sub.unsubscribe();
        direct_sub.unsubscribe();
        if let Some(subscription) = full_tree_sub {
            subscription.unsubscribe();
        }
    });
    ViewHandle::new(rx, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::UNSPECIFIED;
    use crate::store::{MemoryStore, StalledStore};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn acme() -> CompanyId {
        CompanyId::parse("acme").unwrap()
    }

    fn ids(vehicles: &[Record]) -> Vec<&str> {
        vehicles.iter().map(|vehicle| vehicle.id.as_str()).collect()
    }

    #[test]
    fn direct_path_wins_over_full_tree() {
        let direct = json!({ "V1": { "type": "van" } });
        let tree = json!({ "acme": { "V1": {} }, "u1": { "V9": { "companyId": "acme" } } });
        let resolution = resolve_company_vehicles(&acme(), Some(&direct), Some(&tree));
        assert_eq!(resolution.source, VehicleSource::Direct);
        assert_eq!(ids(&resolution.vehicles), ["V1"]);
        assert_eq!(resolution.vehicles[0].owner_id.as_deref(), Some("acme"));
    }

    #[test]
    fn fallback_finds_owner_key_entries() {
        let tree = json!({
            "acme": { "V1": { "name": "one" }, "V2": { "name": "two" } },
            "other": { "V3": {} }
        });
        let resolution = resolve_company_vehicles(&acme(), None, Some(&tree));
        assert_eq!(resolution.source, VehicleSource::Fallback);
        assert_eq!(resolution.vehicles.len(), 2);
        assert!(
            resolution
                .vehicles
                .iter()
                .all(|vehicle| vehicle.owner_id.as_deref() == Some("acme"))
        );
    }

    #[test]
    fn nothing_anywhere_is_empty_not_error() {
        let resolution = resolve_company_vehicles(&acme(), None, None);
        assert_eq!(resolution, Resolution::default());
        let tree = json!({ "other": { "V3": {} } });
        let resolution = resolve_company_vehicles(&acme(), Some(&json!({})), Some(&tree));
        assert_eq!(resolution.source, VehicleSource::None);
        assert!(resolution.vehicles.is_empty());
    }

    #[tokio::test]
    async fn view_uses_direct_path_and_company_name() {
        let store = MemoryStore::new(json!({
            "company": { "acme": { "name": "Acme Logistics" } },
            "vehicles": {
                "acme": { "V1": { "type": "van" }, "V2": {} },
                "u1": { "V9": { "companyId": "acme" } }
            }
        }));
        let shared: SharedStore = Arc::new(store.clone());
        let mut view = company_vehicle_view(&shared, &acme());
        let state = view.settled().await;
        assert_eq!(state.data.source, VehicleSource::Direct);
        assert_eq!(ids(&state.data.vehicles), ["V1", "V2"]);
        assert_eq!(state.data.types.get(UNSPECIFIED), 1);

        let mut state = state;
        timeout(Duration::from_secs(1), async {
            while state.data.company.is_none() {
                state = view.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
        assert_eq!(
            state.data.company.as_ref().map(Company::display_name),
            Some("Acme Logistics")
        );
        // company and vehicles paths only; the full tree is never opened
        assert_eq!(store.listener_count(), 2);
    }

    #[tokio::test]
    async fn view_settles_without_company_name() {
        let inner = MemoryStore::new(json!({
            "company": { "acme": { "name": "Acme Logistics" } },
            "vehicles": { "acme": { "V1": {} } }
        }));
        let shared: SharedStore = Arc::new(StalledStore::new(inner, &["company/"]));
        let mut view = company_vehicle_view(&shared, &acme());
        let state = timeout(Duration::from_millis(500), view.settled())
            .await
            .unwrap();
        assert!(!state.loading);
        assert_eq!(ids(&state.data.vehicles), ["V1"]);
        assert!(state.data.company.is_none());
    }

    #[test]
    fn tracker_loads_until_a_vehicle_path_reports() {
        let mut tracker = Tracker::new(acme());
        let state = tracker.next_state().unwrap();
        assert!(state.loading);
        assert!(state.data.vehicles.is_empty());

        tracker.company = Some(Company::from_snapshot("acme", Some(&json!({ "name": "Acme" }))));
        assert!(tracker.next_state().unwrap().loading);
    }

    #[test]
    fn tracker_waits_for_fallback_when_direct_is_empty() {
        let mut tracker = Tracker::new(acme());
        tracker.direct = Some(None);
        let state = tracker.next_state().unwrap();
        assert!(state.loading);
        assert_eq!(state.data.source, VehicleSource::None);

        tracker.full_tree = Some(Some(json!({ "u1": { "V9": { "companyId": "acme" } } })));
        let state = tracker.next_state().unwrap();
        assert!(!state.loading);
        assert_eq!(state.data.source, VehicleSource::Fallback);
        assert_eq!(ids(&state.data.vehicles), ["V9"]);
    }

    #[test]
    fn settled_tracker_holds_while_fallback_reopens() {
        let mut tracker = Tracker::new(acme());
        tracker.direct = Some(Some(json!({ "V1": {} })));
        assert!(!tracker.next_state().unwrap().loading);

        tracker.direct = Some(None);
        tracker.full_tree = None;
        assert!(tracker.next_state().is_none());

        tracker.full_tree = Some(None);
        let state = tracker.next_state().unwrap();
        assert!(!state.loading);
        assert_eq!(state.data.source, VehicleSource::None);
        assert!(state.data.vehicles.is_empty());
    }

    #[tokio::test]
    async fn removing_direct_vehicles_switches_to_fallback_without_gap() {
        let store = MemoryStore::new(json!({
            "vehicles": {
                "acme": { "V1": {} },
                "u1": { "V9": { "companyId": "acme" } }
            }
        }));
        let shared: SharedStore = Arc::new(store.clone());
        let mut view = company_vehicle_view(&shared, &acme());
        assert_eq!(view.settled().await.data.source, VehicleSource::Direct);

        store.set(&DataPath::company_vehicles(&acme()), Value::Null);
        let state = timeout(Duration::from_secs(1), async {
            loop {
                let state = view.changed().await.unwrap();
                assert_ne!(state.data.source, VehicleSource::None);
                if state.data.source == VehicleSource::Fallback {
                    return state;
                }
            }
        })
        .await
        .unwrap();
        assert!(!state.loading);
        assert_eq!(ids(&state.data.vehicles), ["V9"]);
    }

    #[tokio::test]
    async fn view_falls_back_then_switches_to_direct() {
        let store = MemoryStore::new(json!({
            "vehicles": {
                "u1": { "V9": { "companyId": "acme" }, "V8": { "companyId": "zeta" } }
            }
        }));
        let shared: SharedStore = Arc::new(store.clone());
        let mut view = company_vehicle_view(&shared, &acme());
        let state = view.settled().await;
        assert_eq!(state.data.source, VehicleSource::Fallback);
        assert_eq!(ids(&state.data.vehicles), ["V9"]);
        assert!(state.data.company.is_none());

        store.set(
            &DataPath::company_vehicles(&acme()),
            json!({ "V1": { "type": "truck" } }),
        );
        let state = timeout(Duration::from_secs(1), async {
            loop {
                let state = view.changed().await.unwrap();
                if state.data.source == VehicleSource::Direct {
                    return state;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(ids(&state.data.vehicles), ["V1"]);
    }

    #[tokio::test]
    async fn company_lookup_failure_ends_view() {
        let store = MemoryStore::default();
        store.fail(&DataPath::company(&acme()), "permission denied");
        let shared: SharedStore = Arc::new(store);
        let mut view = company_vehicle_view(&shared, &acme());
        let state = timeout(Duration::from_secs(1), async {
            loop {
                if view.current().is_failed() || view.changed().await.is_none() {
                    return view.current();
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(state.error.as_deref(), Some("Failed to fetch company vehicles."));
        assert!(!state.loading);
    }
}

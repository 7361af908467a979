use crate::company::{CompanyVehicleBoard, company_vehicle_view};
use crate::errors::StoreError;
use crate::models::{Company, CompanyId};
use crate::routes::RouteBoard;
use crate::store::{DataPath, SharedStore, read_once};
use crate::views::{self, DriverBoard, VehicleBoard, ViewHandle};
use serde_json::Value;

/// Connection handle passed to whoever opens views. Each call opens an
/// independent view with its own cancel token.
#[derive(Clone)]
pub struct FleetClient {
    store: SharedStore,
}

impl FleetClient {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn drivers(&self) -> ViewHandle<DriverBoard> {
        views::driver_view(&self.store)
    }

    pub fn vehicles(&self) -> ViewHandle<VehicleBoard> {
        views::vehicle_view(&self.store)
    }

    pub fn company_vehicles(&self, company: &CompanyId) -> ViewHandle<CompanyVehicleBoard> {
        company_vehicle_view(&self.store, company)
    }

    pub fn routes(&self, company: &CompanyId) -> ViewHandle<RouteBoard> {
        views::routes_view(&self.store, company)
    }

    pub fn dispatched(&self, company: &CompanyId) -> ViewHandle<RouteBoard> {
        views::dispatched_view(&self.store, company)
    }

    /// Companies listed under `company`, in stored order.
    pub async fn companies(&self) -> Result<Vec<Company>, StoreError> {
        let snapshot = read_once(self.store.as_ref(), &DataPath::companies()).await?;
        let Some(Value::Object(entries)) = snapshot else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .filter_map(|(id, fields)| Company::from_snapshot(id, Some(fields)))
            .collect())
    }
}

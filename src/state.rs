use crate::client::FleetClient;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub client: FleetClient,
    pub view_timeout: Duration,
}

impl AppState {
    pub fn new(client: FleetClient, view_timeout: Duration) -> Self {
        Self {
            client,
            view_timeout,
        }
    }
}

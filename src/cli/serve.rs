use std::sync::Arc;

use tokio::net::TcpListener;

use crate::{
    Res,
    config::WarehouseConfig,
    error, info,
    management::{CredentialStore, Materialized},
    server::{self, AppState},
    success,
    warehouse::{BigQueryWarehouse, MemoryWarehouse, Warehouse},
    warning,
};

use super::load_config;

pub async fn serve(open: bool, in_memory: bool) {
    let config = load_config();

    let warehouse: Arc<dyn Warehouse> = if in_memory {
        info!("Using the in-memory warehouse; rows are lost on exit.");
        Arc::new(MemoryWarehouse::default())
    } else {
        match connect_warehouse(&config.warehouse).await {
            Ok(warehouse) => warehouse,
            Err(e) => error!("Cannot set up the warehouse: {}", e),
        }
    };

    let addr = config.server_addr;
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => error!("Failed to bind {}: {}", addr, e),
    };

    let url = format!("http://{}/", addr);
    success!("Listening on {}", url);

    if open && webbrowser::open(&url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            url
        )
    }

    if let Err(e) = server::serve(listener, AppState::new(config, warehouse)).await {
        error!("Server stopped: {}", e);
    }
}

async fn connect_warehouse(config: &WarehouseConfig) -> Res<Arc<dyn Warehouse>> {
    let store = CredentialStore::new(config.credentials_path.clone());
    if store.materialize(config.credentials_blob.as_deref()).await? == Materialized::Written {
        success!("Warehouse credentials materialized.");
    }

    let key = store.load_service_account().await?;
    info!("Authenticating to the warehouse as {}.", key.client_email);

    let warehouse = BigQueryWarehouse::from_key(config, key)?;
    info!("Using warehouse project {}.", warehouse.project_id());
    Ok(Arc::new(warehouse))
}

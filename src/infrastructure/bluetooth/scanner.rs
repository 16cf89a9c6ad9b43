//! BLE Scanner Module
//!
//! Standalone discovery probe: scans continuously and reports each device
//! the first time it is seen. Diagnostic only, no sessions and no decoding.

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::Manager;
use chrono::Local;
use futures::StreamExt;
use std::collections::HashMap;

/// Scan until Ctrl+C, printing devices on first sight and a summary of
/// first-seen timestamps on exit.
pub async fn run_discovery_probe() -> anyhow::Result<()> {
    let manager = Manager::new().await?;
    let adapter = manager
        .adapters()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No Bluetooth adapter found"))?;

    let mut events = adapter.events().await?;
    adapter.start_scan(ScanFilter::default()).await?;
    println!("Starting continuous BLE scan (Ctrl+C to stop)...");

    let mut first_seen: HashMap<String, String> = HashMap::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.next() => {
                let Some(event) = event else { break };
                let CentralEvent::DeviceDiscovered(id) = event else { continue };
                let Ok(peripheral) = adapter.peripheral(&id).await else { continue };

                let address = peripheral.address().to_string();
                if first_seen.contains_key(&address) {
                    continue;
                }

                let props = peripheral.properties().await.ok().flatten();
                let name = props
                    .as_ref()
                    .and_then(|p| p.local_name.clone())
                    .unwrap_or_else(|| "Unknown".to_string());
                let rssi = props
                    .as_ref()
                    .and_then(|p| p.rssi)
                    .map(|r| format!("{} dBm", r))
                    .unwrap_or_else(|| "N/A".to_string());

                let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
                println!("[{timestamp}] NEW DEVICE: {address} | Name={name} | RSSI={rssi}");
                first_seen.insert(address, timestamp);
            }
        }
    }

    adapter.stop_scan().await?;

    println!("\nSummary (first seen timestamps):");
    for (address, timestamp) in &first_seen {
        println!("{address} first seen at {timestamp}");
    }

    Ok(())
}

//! Simbus Demo - Simulated Power Supply
//!
//! Serves a small simulated power supply over Modbus TCP:
//! - Coil 0: power switch (writable)
//! - Holding register 0: target voltage, mV (writable)
//! - Holding register 1: target current, mA (writable)
//! - Input register 0: measured voltage, mV (ramps toward the target)
//! - Input register 1: measured current, mA (ramps toward the target)
//! - Discrete input 0: "output stable" flag
//!
//! Point any Modbus TCP client at it, flip coil 0 on, write a setpoint
//! into holding register 0 and watch input register 0 ramp.
//!
//! Usage: cargo run --bin demo [bind_address]
//! Example: cargo run --bin demo 127.0.0.1:5020

use std::sync::Arc;
use std::time::Duration;

use simbus::{DataStore, ModbusResult, ModbusTcpServer};
use tokio::time::interval;
use tracing::{debug, info};

/// One mV/mA step per tick toward the setpoint
const RAMP_STEP: u16 = 250;
const TICK: Duration = Duration::from_millis(100);

fn step_toward(current: u16, target: u16) -> u16 {
    if current < target {
        current.saturating_add(RAMP_STEP).min(target)
    } else {
        current.saturating_sub(RAMP_STEP).max(target)
    }
}

/// Advance the simulated physics by one tick.
fn update(store: &DataStore) -> ModbusResult<()> {
    let switch = store.coils.get(0, 1)?[0];
    let targets = store.holding_registers.get(0, 2)?;
    let measured = store.input_registers.get(0, 2)?;

    // Switched off: the output collapses to zero regardless of setpoints
    let (target_v, target_i) = if switch {
        (targets[0], targets[1])
    } else {
        (0, 0)
    };

    let next_v = step_toward(measured[0], target_v);
    let next_i = step_toward(measured[1], target_i);
    store.input_registers.set(0, &[next_v, next_i])?;

    let stable = switch && next_v == target_v && next_i == target_i;
    store.discrete_inputs.set(0, &[stable])?;

    if (next_v, next_i) != (measured[0], measured[1]) {
        debug!(
            "PSU tick: switch={} V={}mV->{} I={}mA->{}",
            switch, measured[0], next_v, measured[1], next_i
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ModbusResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let bind_address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5020".to_string());

    let store = Arc::new(DataStore::new());
    // Modest defaults so a fresh client sees something to read
    store.holding_registers.set(0, &[12_000, 1_500])?;

    info!("Simulated power supply starting on {}", bind_address);
    let server = ModbusTcpServer::bind(&bind_address, Arc::clone(&store)).await?;

    // Simulation loop runs beside the server, mutating only the
    // device-owned banks (input registers, discrete inputs).
    let sim_store = Arc::clone(&store);
    tokio::spawn(async move {
        let mut ticker = interval(TICK);
        loop {
            ticker.tick().await;
            if let Err(e) = update(&sim_store) {
                tracing::error!("Simulation tick failed: {}", e);
                break;
            }
        }
    });

    server.serve().await
}

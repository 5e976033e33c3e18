//! Example: Enter and leave AOD, with auto idle mode in between.
//!
//! Run with: `RUST_LOG=debug cargo run --example aod_cycle`

use nt37290_core::{LP_MODE, MODE_120HZ, MockHost, PanelConfig, PanelController, PanelError};
use std::time::Instant;

fn main() -> Result<(), PanelError> {
    // Initialize logging (optional)
    env_logger::init();

    let host = MockHost::new();
    let panel = PanelController::new(host.clone(), PanelConfig::default());

    // Power on at 120Hz
    panel.select_mode(&MODE_120HZ);
    panel.enable()?;

    // Let the panel idle at 10Hz while the compositor self-refreshes
    host.set_self_refresh(true);
    panel.set_min_vrefresh(10);
    panel.set_self_refresh(true)?;
    panel.update_te2()?;

    let state = panel.state();
    println!(
        "Idle: {}Hz, features: {:?}",
        state.panel_idle_vrefresh, state.shadow.committed.features
    );

    // A new frame arrives
    host.set_self_refresh(false);
    panel.set_self_refresh(false)?;
    panel.commit_done(Instant::now())?;

    // Into AOD and back
    panel.set_lp_mode(&LP_MODE)?;
    println!("Mode: {:?}", panel.state().mode);
    panel.set_nolp_mode(&MODE_120HZ)?;
    println!("Mode: {:?}", panel.state().mode);

    println!("Sent {} command batches", host.sent().len());

    panel.disable()?;
    Ok(())
}

#![allow(dead_code)]

pub mod gated_service;
pub mod wiremock_helpers;

use idcts_portal::WorkflowState;
use std::time::Duration;
use tokio::sync::watch;

/// Wait until the published state satisfies `pred`, failing the test after 10s.
pub async fn wait_for_state<F>(rx: &mut watch::Receiver<WorkflowState>, mut pred: F) -> WorkflowState
where
    F: FnMut(&WorkflowState) -> bool,
{
    let state = tokio::time::timeout(Duration::from_secs(10), rx.wait_for(|s| pred(s)))
        .await
        .expect("timed out waiting for workflow state")
        .expect("controller dropped");
    state.clone()
}

/// Let spawned tasks run without moving the clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

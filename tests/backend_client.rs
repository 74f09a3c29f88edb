mod common;

use common::MockBackend;
use inspection_panel::backend_client::{BackendClient, PanelBackend};
use inspection_panel::models::Decision;
use inspection_panel::Error;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn client_for(mock: &MockBackend) -> BackendClient {
    BackendClient::new(mock.http_base(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_nok_list_sends_limit() {
    let mock = MockBackend::start().await;
    mock.state.set_nok(20);
    let client = client_for(&mock);

    let items = client.nok_list(12).await.unwrap();
    assert_eq!(items.len(), 12);
    assert_eq!(items[0].name, "detected_001.jpg");
    assert_eq!(*mock.state.list_limits.lock().unwrap(), vec![12]);
}

#[tokio::test]
async fn test_nok_list_error_status() {
    let mock = MockBackend::start().await;
    mock.state.fail_list.store(true, Ordering::Relaxed);
    let client = client_for(&mock);

    let err = client.nok_list(12).await.unwrap_err();
    assert!(err.is_transport());
    match err {
        Error::Status { endpoint, status } => {
            assert_eq!(endpoint, "/api/nok/list");
            assert_eq!(status.as_u16(), 503);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_plc_status_probe() {
    let mock = MockBackend::start().await;
    let client = client_for(&mock);

    let status = client.plc_status().await.unwrap();
    assert!(status.online);
    assert!(!status.request);
    assert_eq!(status.last_decision, Some(Decision::Ok));
}

#[tokio::test]
async fn test_conveyor_command_accepted_and_rejected() {
    let mock = MockBackend::start().await;
    let client = client_for(&mock);

    client.set_conveyor_state(true).await.unwrap();

    mock.state.reject_conveyor.store(true, Ordering::Relaxed);
    let err = client.set_conveyor_state(false).await.unwrap_err();
    assert!(matches!(err, Error::CommandRejected(_)));

    assert_eq!(*mock.state.conveyor_commands.lock().unwrap(), vec![true, false]);
}

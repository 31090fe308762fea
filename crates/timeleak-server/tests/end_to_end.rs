//! Runs the HTTP attack against a live practice target on loopback.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use timeleak_core::{
    Attack, AttackConfig, AttackPlan, HttpTransport, SilentObserver, StageParams, TargetConfig,
    Transport,
};
use timeleak_server::TargetSettings;

/// Start a target in the background and return its address.
fn spawn_target(secret: &str, step: Duration) -> SocketAddr {
    let settings = TargetSettings {
        secret: Some(secret.to_string()),
        step,
        ..Default::default()
    };
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            timeleak_server::serve(listener, settings).await.unwrap();
        });
    });
    rx.recv_timeout(Duration::from_secs(10)).unwrap()
}

fn target_for(addr: SocketAddr) -> TargetConfig {
    TargetConfig {
        base_url: format!("http://{addr}"),
        timeout_ms: 5_000,
        ..TargetConfig::new("student42")
    }
}

#[test]
fn verify_against_live_target() {
    let addr = spawn_target("cab", Duration::ZERO);
    let transport = HttpTransport::new(&target_for(addr)).unwrap();
    assert!(transport.verify("cab"));
    assert!(!transport.verify("cba"));
    assert!(transport.probe("xyz").is_some());
}

#[test]
fn full_attack_recovers_secret_over_http() {
    let addr = spawn_target("cab", Duration::from_millis(3));
    let transport = HttpTransport::new(&target_for(addr)).unwrap();
    let config = AttackConfig {
        alphabet: "abc".to_string(),
        max_length: 5,
        length_stage: StageParams::new(5, 5),
        quick: StageParams::new(3, 3),
        full: StageParams::new(5, 5),
        top_k: 2,
        ..Default::default()
    };

    let mut attack = Attack::new(&transport, config).unwrap();
    let report = attack.run(AttackPlan::Full, &mut SilentObserver).unwrap();

    assert_eq!(report.estimated_length, Some(3));
    assert_eq!(report.secret.as_deref(), Some("cab"));
    assert_eq!(report.verified, Some(true));
    assert!(!report.interrupted);
}

use std::time::Duration;

use timeleak_server::{MAX_DIFFICULTY, TargetSettings};

use super::fail;

pub fn run(
    host: &str,
    port: u16,
    secret: Option<String>,
    secret_length: usize,
    alphabet: &str,
    step_ms: u64,
) {
    if alphabet.is_empty() && secret.is_none() {
        fail("--alphabet cannot be empty when secrets are generated");
    }
    if let Some(s) = &secret
        && s.is_empty()
    {
        fail("--secret cannot be empty");
    }

    let base = format!("http://{host}:{port}");
    let fixed = secret.is_some();
    let settings = TargetSettings {
        secret,
        secret_length,
        alphabet: alphabet.to_string(),
        step: Duration::from_millis(step_ms),
    };

    println!("⏱  timeleak practice target v{}", timeleak_core::VERSION);
    println!("   {base}");
    if fixed {
        println!("   one fixed secret for every user");
    } else {
        println!("   {secret_length}-character secret per user, drawn from {alphabet:?}");
    }
    println!("   {step_ms} ms per unit of comparison work at difficulty 1");
    println!();
    println!("   Endpoints:");
    println!("     GET /?user=<id>&password=<guess>&difficulty=<1-{MAX_DIFFICULTY}>");
    println!("                           1 if the guess is the secret, 0 otherwise");
    println!("     GET /health           Server status");
    println!();
    println!("   Example:");
    println!("     timeleak attack --url {base} --user student42");
    println!();

    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| fail(e));
    if let Err(e) = rt.block_on(timeleak_server::run_server(settings, host, port)) {
        fail(e);
    }
}

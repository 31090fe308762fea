//! `timeleak verify`: one confirmation request for a candidate secret.

use timeleak_core::{HttpTransport, Transport};

use super::{build_target, fail};
use crate::TargetArgs;

pub fn run(secret: &str, target_args: &TargetArgs) {
    if secret.is_empty() {
        fail("secret cannot be empty");
    }
    let target = build_target(target_args).unwrap_or_else(|e| fail(e));
    let transport = HttpTransport::new(&target).unwrap_or_else(|e| fail(e));

    if transport.verify(secret) {
        println!("✓ {secret:?} accepted by {}", target.base_url);
    } else {
        println!("✗ {secret:?} rejected by {}", target.base_url);
        std::process::exit(2);
    }
}

//! Example: Walk through the attempt schedule of a retry configuration
//!
//! This example demonstrates:
//! 1. Exponential backoff against the primary host only
//! 2. Primary/secondary alternation for a read request
//! 3. Secondary being disabled after it returns 404
//!
//! Run with:
//! ```bash
//! cargo run -p geostore-core --example retry_example
//! ```

use geostore_core::prelude::*;
use std::time::Duration;

fn print_schedule(title: &str, options: &RetryOptions, read_only: bool, secondary_404_on: Option<u32>) {
    println!("\n=== {} ===\n", title);

    let mut context = AttemptContext::new(read_only, options);
    loop {
        let endpoint = context.endpoint();
        let delay = options.delay_for(&context, endpoint);
        println!(
            "  attempt {} -> {:<9} (primary try {}, wait {:?})",
            context.attempt(),
            endpoint,
            context.primary_try(),
            delay
        );

        if context.is_exhausted(options.max_tries()) {
            break;
        }

        let status = match (endpoint, secondary_404_on) {
            (Endpoint::Secondary, Some(n)) if n == context.attempt() => 404,
            _ => 503,
        };
        let classification = classify_status(status, endpoint);
        println!("    status {} -> {:?}", status, classification);
        context.advance(endpoint, classification.disables_secondary());
    }
}

fn main() -> Result<(), InvalidConfiguration> {
    let primary_only = RetryOptions::builder()
        .max_tries(4)
        .retry_delay(Duration::from_secs(4))
        .max_retry_delay(Duration::from_secs(120))
        .build()?;
    print_schedule("Exponential, primary only", &primary_only, true, None);

    let failover = RetryOptions::builder()
        .max_tries(5)
        .secondary_host("myaccount-secondary.blob.core.windows.net")
        .build()?;
    print_schedule("Read with secondary failover", &failover, true, None);
    print_schedule("Write ignores secondary", &failover, false, None);
    print_schedule("Secondary returns 404 on attempt 2", &failover, true, Some(2));

    Ok(())
}

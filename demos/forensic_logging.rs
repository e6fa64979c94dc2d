use palisade_validation::{
    LogLevel, RingBufferSink, SecurityToken, ValidationOutcome, ValidationParameters,
    validate_token_issuer,
};
use std::sync::Arc;

struct Jwt(String);

impl SecurityToken for Jwt {
    fn issuer(&self) -> Option<&str> {
        Some(&self.0)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("--- Forensic Ring Buffer Example ---\n");

    // Max 10 entries, max 160 bytes per entry, informational and above
    let sink = RingBufferSink::new(10, 160, LogLevel::Informational);
    let params = ValidationParameters::new()
        .with_valid_issuers(["", "https://login.example"])
        .with_log_sink(Arc::new(sink.clone()));

    println!("1. Replaying 50 tokens from rotating forged issuers...");

    let mut rejected = 0;
    for i in 1..=50 {
        let token = Jwt(format!("https://login.example.attacker-{}.test", i));
        let result = validate_token_issuer(&token, &params)
            .await
            .expect("token and parameters are present");

        // Bulk checks read only the verdict; no error is ever built.
        if !result.is_valid() {
            rejected += 1;
        }
    }

    println!("2. Replay finished. {} rejected.", rejected);
    println!("   Total Evictions (Dropped logs): {}", sink.eviction_count());
    println!("   Current Buffer Size: {}", sink.len());
    println!("   Buffer Capacity:     {}", sink.capacity());

    println!("\n3. Dumping remaining log lines (newest first):");
    println!("{:<10} | {:<13} | {}", "Time", "Level", "Message");
    println!("{:-<10}-|-{:-<13}-|-{:-<20}", "", "", "");

    for entry in sink.get_recent(10) {
        println!(
            "{:<10} | {:<13} | {}",
            entry.timestamp % 10000,
            entry.level,
            entry.message
        );
    }

    println!("\nOnly the skip notices for the empty list entry were logged; mismatches stay silent until their error is read.");
}

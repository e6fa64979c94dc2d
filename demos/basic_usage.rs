use palisade_validation::{
    SecurityToken, StaticConfigurationProvider, TracingSink, ValidationOutcome,
    ValidationParameters, validate_token_issuer,
};
use std::sync::Arc;

struct Jwt {
    iss: &'static str,
}

impl SecurityToken for Jwt {
    fn issuer(&self) -> Option<&str> {
        Some(self.iss)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("palisade_validation=debug")
        .init();

    println!("--- Issuer Validation Example ---\n");

    let params = ValidationParameters::new()
        .with_valid_issuer("https://login.example")
        .with_valid_issuers(["https://tenant-a.example", "", "https://tenant-b.example"])
        .with_configuration_provider(Arc::new(StaticConfigurationProvider::new(
            "https://metadata.example",
        )))
        .with_log_sink(Arc::new(TracingSink::default()));

    for iss in [
        "https://metadata.example",
        "https://tenant-b.example",
        "https://LOGIN.example",
        "   ",
    ] {
        let result = validate_token_issuer(&Jwt { iss }, &params)
            .await
            .expect("token and parameters are present");

        println!("issuer {:?}", iss);
        println!("  valid:        {}", result.is_valid());
        println!("  failure type: {}", result.failure_type());

        // The error does not exist until this line asks for it.
        if let Some(error) = result.error() {
            println!("  error:        {}", error);
            if let Some(trace) = error.as_invalid_issuer().and_then(|e| e.stack_trace()) {
                print!("  trace:\n{}", trace);
            }
        }
        println!();
    }
}

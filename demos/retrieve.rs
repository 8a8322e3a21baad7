//! Syncs the mailbox named by the `POP3_*` environment variables and prints the result as JSON.
//!
//! ```bash
//! POP3_HOST=pop.example.com POP3_USER=post_office@example.com POP3_PASSWORD=secret \
//!     RUST_LOG=postoffice=debug cargo run --example retrieve
//! ```

use postoffice::{MailboxConfig, MailboxSync};

fn main() {
    // logs go to stderr so stdout stays pure JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match MailboxConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!(
                "{}",
                serde_json::json!({ "success": false, "emails": [], "count": 0, "errors": [e.to_string()] })
            );
            std::process::exit(1);
        }
    };

    let result = MailboxSync::new(&config).run();
    println!("{}", result.to_json());
    if !result.success() {
        std::process::exit(1);
    }
}

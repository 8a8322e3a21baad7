//! Reads a `{to, subject, body, from?}` JSON request on stdin and sends it.
//!
//! With `SMTP_HOST` set the letter is relayed through that server (`SMTP_PORT`, default 25);
//! otherwise it goes to the local `sendmail`. `MAIL_FROM` sets the default sender.
//!
//! ```bash
//! echo '{"to":"player@example.com","subject":"Hi","body":"Hello"}' | cargo run --example send
//! ```

use std::io::Read;

use postoffice::outbound::Mailer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut payload = String::new();
    std::io::stdin().read_to_string(&mut payload)?;

    let from = std::env::var("MAIL_FROM").unwrap_or_else(|_| "post_office@localhost".to_string());
    let outcome = match std::env::var("SMTP_HOST") {
        Ok(host) => {
            let port = std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "25".to_string())
                .parse()?;
            Mailer::smtp(&host, port, from).send_json(&payload)
        }
        Err(_) => Mailer::sendmail(from).send_json(&payload),
    };

    println!("{}", outcome.to_json());
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

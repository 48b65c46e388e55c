use hyphen_toggle::{CacheConfig, ClientConfig, TelemetryPayload, User};

pub fn main() {
    env_logger::init();

    let public_key = std::env::var("HYPHEN_PUBLIC_KEY").unwrap();
    let config = ClientConfig::from_public_key(public_key)
        .application(std::env::var("HYPHEN_APPLICATION").unwrap_or_else(|_| "demo".to_owned()))
        .environment(std::env::var("HYPHEN_ENVIRONMENT").unwrap_or_else(|_| "development".to_owned()))
        .horizon_urls(std::env::var("HYPHEN_HORIZON_URL").ok())
        .cache(CacheConfig::from_env());

    let context = config
        .context("test-subject")
        .user(User::new("test-subject").email("test@example.com"))
        .custom_attribute("plan", "premium");

    let client = config.to_client().unwrap();

    let toggle = match client.evaluate(&context) {
        Ok(response) => response.get("a-boolean-toggle").cloned(),
        Err(err) => {
            eprintln!("Evaluation failed: {err} ({})", err.last_error());
            None
        }
    };

    let enabled = toggle
        .as_ref()
        .and_then(|toggle| toggle.as_boolean())
        // default value
        .unwrap_or(false);
    println!("Enabled: {:?}", enabled);

    if let Some(toggle) = toggle {
        if let Err(err) = client.post_telemetry(&TelemetryPayload::new(context, toggle)) {
            eprintln!("Telemetry failed: {err}");
        }
    }
}

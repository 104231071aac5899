use std::time::Duration;

use reqrelay::{
    ClientOptions, Controller, Encoding, MemorySurface, Method, Outcome, RelayClient,
    RequestDescriptor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = RelayClient::from_env()
        .or_else(|_| RelayClient::new(reqrelay::DEFAULT_BASE_URL))?
        .with_options(ClientOptions {
            timeout_ms: Some(30_000),
            ..ClientOptions::default()
        });

    let descriptor = RequestDescriptor::from_form([
        ("url", "https://httpbin.org/anything"),
        ("method", "POST"),
        ("encoding", "utf-8"),
        ("data", "hello=world"),
        ("custom-headers", "X-Demo: 1"),
    ])?;

    // Direct call: returns the envelope or the final error.
    match client.send(&descriptor).await {
        Ok(envelope) => println!("envelope: {envelope:?}"),
        Err(err) => println!("send failed: {err}"),
    }

    // Controller: results land on a surface instead.
    let surface = MemorySurface::new();
    let controller = Controller::spawn(client, surface.clone());
    let handle = controller.submit(descriptor.method(Method::Get).encoding(Encoding::Utf8));

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("phase: {:?}", handle.phase());

    match handle.join().await {
        Outcome::Success(_) => println!("rendered:\n{}", surface.snapshot().text),
        Outcome::Exhausted(err) => println!("notice raised: {err}"),
        Outcome::Cancelled => println!("cancelled"),
    }
    controller.shutdown().await?;

    Ok(())
}

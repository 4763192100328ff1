//! Async usage examples for ResourcePool

use esox_resourcepool::{factory_fn, CreationParameters, PoolConfiguration, ResourcePool};
use std::convert::Infallible;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== EsoxSolutions.ResourcePool - Async Examples ===\n");

    let config = PoolConfiguration::new()
        .with_max_resources(2)
        .with_default_timeout(Duration::from_secs(2))
        .with_creation_parameters(CreationParameters::new().with("label", "session"));

    let factory = factory_fn(|params| {
        // Simulate slow setup work
        std::thread::sleep(Duration::from_millis(50));
        Ok::<_, Infallible>(params.get("label").unwrap_or("resource").to_string())
    });

    let pool = ResourcePool::new_async(factory, config).await.unwrap();
    println!("1. Pool started with {} resources", pool.available_count());

    println!("\n2. Concurrent tasks:");
    let mut handles = Vec::new();
    for task in 0..5 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let resource = pool.acquire_async(None).await?;
            tokio::time::sleep(Duration::from_millis(20)).await;
            println!("   Task {task} used {} #{}", *resource, resource.id());
            Ok::<_, esox_resourcepool::PoolError>(())
        }));
    }
    for handle in handles {
        if let Ok(Err(err)) = handle.await {
            println!("   Task failed: {err}");
        }
    }

    println!("\n3. Timeout:");
    let _a = pool.acquire(None).unwrap();
    let _b = pool.acquire(None).unwrap();
    match pool.acquire_async(Some(Duration::from_millis(100))).await {
        Ok(_) => println!("   Unexpected success"),
        Err(err) => println!("   {err}"),
    }
}

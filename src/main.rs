// EsoxSolutions.ResourcePool
// Bounded, thread-safe resource pool with parallel startup

// This is just a binary wrapper - the actual library is in lib.rs
// Run demos with: cargo run --example basic

use esox_resourcepool::{factory_fn, CreationParameters, PoolConfiguration, ResourcePool};
use std::convert::Infallible;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== EsoxSolutions.ResourcePool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    println!("Quick Demo:");
    let config = PoolConfiguration::new()
        .with_max_resources(3)
        .with_creation_parameters(CreationParameters::new().with("name", "demo"));
    let factory = factory_fn(|params| {
        Ok::<_, Infallible>(format!("{}-resource", params.get("name").unwrap_or("anon")))
    });

    let pool = match ResourcePool::new(factory, config) {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("  Pool failed to start: {err}");
            std::process::exit(1);
        }
    };

    match pool.acquire(Some(Duration::from_millis(100))) {
        Ok(resource) => println!("  Got resource #{}: {}", resource.id(), *resource),
        Err(err) => println!("  Acquire failed: {err}"),
    }

    println!("  Available after return: {}", pool.available_count());
}

//! Basic usage examples for ResourcePool

use esox_resourcepool::{factory_fn, PoolConfiguration, ResourcePool};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn main() {
    println!("=== EsoxSolutions.ResourcePool - Basic Examples ===\n");

    // Example 1: Simple pool of counters
    simple_pool();

    // Example 2: Timeouts
    timeouts();

    // Example 3: Scoped acquisition
    scoped();

    // Example 4: Metrics and health
    metrics_and_health();
}

fn numbered_pool(capacity: usize) -> ResourcePool<impl esox_resourcepool::ResourceFactory<Resource = usize>> {
    let next = AtomicUsize::new(1);
    let factory = factory_fn(move |_| Ok::<_, Infallible>(next.fetch_add(1, Ordering::SeqCst)));
    ResourcePool::new(factory, PoolConfiguration::new().with_max_resources(capacity)).unwrap()
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = numbered_pool(3);

    {
        let resource = pool.acquire(None).unwrap();
        println!("   Got resource: {}", *resource);
        // Resource automatically returned when dropped
    }

    println!("   Available after return: {}\n", pool.available_count());
}

fn timeouts() {
    println!("2. Timeouts:");
    let pool = numbered_pool(1);

    let held = pool.acquire(None).unwrap();
    println!("   Holding resource {}", *held);

    match pool.acquire(Some(Duration::from_millis(50))) {
        Ok(_) => println!("   Unexpected success"),
        Err(err) => println!("   Second acquire: {err}"),
    }

    drop(held);

    let again = pool.try_acquire();
    println!("   After release: {}\n", if again.is_some() { "Success" } else { "None" });
}

fn scoped() {
    println!("3. Scoped Acquisition:");
    let pool = numbered_pool(2);

    let doubled = pool.with_resource(None, |value| *value * 2).unwrap();
    println!("   Doubled: {doubled}");

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pool.with_resource(None, |_| -> usize { panic!("work failed") })
    }));
    println!("   Work panicked: {}", outcome.is_err());
    println!("   Available afterwards: {}\n", pool.available_count());
}

fn metrics_and_health() {
    println!("4. Metrics and Health:");
    let pool = numbered_pool(5);

    {
        let _first = pool.acquire(None).unwrap();
        let _second = pool.acquire(None).unwrap();

        let health = pool.get_health_status();
        println!("   Health: {}", if health.is_healthy { "Healthy" } else { "Unhealthy" });
        println!("   Utilization: {:.1}%", health.utilization * 100.0);
        println!("   Checked out: {}, Available: {}", health.checked_out, health.available);
    }

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }
}

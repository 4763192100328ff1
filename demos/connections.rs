//! Connection-style resources with a custom factory and cleanup

use esox_resourcepool::{CreationParameters, PoolConfiguration, PoolError, ResourceFactory, ResourcePool};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Connection {
    session: u32,
    endpoint: String,
    pending: Vec<String>,
}

impl Connection {
    fn send(&mut self, message: &str) {
        self.pending.push(message.to_string());
    }
}

#[derive(Default)]
struct ConnectionFactory {
    sessions: AtomicU32,
}

impl ResourceFactory for ConnectionFactory {
    type Resource = Connection;
    type Error = io::Error;

    fn create(&self, params: &CreationParameters) -> Result<Connection, io::Error> {
        let host = params
            .get("host")
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "missing host"))?;
        let port = params
            .get_parsed::<u16>("port")
            .unwrap_or(Ok(5432))
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

        // Simulate a handshake
        thread::sleep(Duration::from_millis(25));

        Ok(Connection {
            session: self.sessions.fetch_add(1, Ordering::SeqCst),
            endpoint: format!("{host}:{port}"),
            pending: Vec::new(),
        })
    }

    fn cleanup(&self, connection: &mut Connection) -> Result<(), io::Error> {
        connection.pending.clear();
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    println!("=== EsoxSolutions.ResourcePool - Connection Examples ===\n");

    missing_configuration();
    shared_across_threads();
}

fn missing_configuration() {
    println!("1. Startup failure:");
    match ResourcePool::new(ConnectionFactory::default(), PoolConfiguration::default()) {
        Ok(_) => println!("   Unexpected success"),
        Err(PoolError::Initialization { slot, reason, .. }) => {
            println!("   Slot {:?} failed: {}\n", slot, reason)
        }
        Err(err) => println!("   {err}\n"),
    }
}

fn shared_across_threads() {
    println!("2. Shared across threads:");
    let config = PoolConfiguration::new()
        .with_max_resources(4)
        .with_creation_parameters(CreationParameters::new().with("host", "db.internal").with("port", "6543"));
    let pool = ResourcePool::new(ConnectionFactory::default(), config).unwrap();

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let pool = pool.clone();
            thread::spawn(move || {
                pool.with_resource(Some(Duration::from_secs(1)), |conn| {
                    conn.send(&format!("hello from {worker}"));
                    format!("worker {worker} -> session {} at {}", conn.session, conn.endpoint)
                })
            })
        })
        .collect();

    for worker in workers {
        match worker.join() {
            Ok(Ok(line)) => println!("   {line}"),
            Ok(Err(err)) => println!("   {err}"),
            Err(_) => println!("   worker panicked"),
        }
    }

    let mut tags = HashMap::new();
    tags.insert("service".to_string(), "demo".to_string());
    println!("\n{}", pool.export_metrics_prometheus("connections", Some(&tags)));
}

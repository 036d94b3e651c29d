//! Development seeder for S3 Link.
//!
//! Registers one S3 storage policy and its config map, read from environment
//! variables, so a local MinIO bucket can be browsed right away. Also prints a
//! bearer token for a development user, signed with the configured JWT secret.
//!
//! Usage: cargo run --bin seeder
//!
//! | variable | default |
//! |----------|---------|
//! | `DATABASE_URL` | required |
//! | `SEED_POLICY_NAME` | `minio` |
//! | `SEED_S3_ENDPOINT` | `127.0.0.1:9000` |
//! | `SEED_S3_ENDPOINT_PROTOCOL` | `http` |
//! | `SEED_S3_PROTOCOL` | `http` |
//! | `SEED_S3_BUCKET` | `media` |
//! | `SEED_S3_REGION` | `auto` |
//! | `SEED_S3_ACCESS_KEY` | `minioadmin` |
//! | `SEED_S3_SECRET_KEY` | `minioadmin` |
//! | `SEED_S3_PATH_STYLE` | `true` |
//! | `SEED_S3_LOCATION` | unset |
//! | `SEED_S3_DOMAIN` | unset |
//! | `SEED_USERNAME` | `admin` |

use std::collections::BTreeMap;

use s3link_core::extension::{
    ConfigMap, Extension, ExtensionError, ExtensionStore, Metadata, Policy, PolicySpec,
    S3_TEMPLATE_NAME,
};
use s3link_core::storage::S3Properties;
use s3link_db::ExtensionRepository;
use s3link_shared::{AppConfig, JwtConfig, JwtService};

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = s3link_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    let repo = ExtensionRepository::new(db);

    let policy_name = env_or("SEED_POLICY_NAME", "minio");
    let config_map_name = format!("{policy_name}-settings");

    let settings = serde_json::json!({
        "endpoint": env_or("SEED_S3_ENDPOINT", "127.0.0.1:9000"),
        "endpointProtocol": env_or("SEED_S3_ENDPOINT_PROTOCOL", "http"),
        "protocol": env_or("SEED_S3_PROTOCOL", "http"),
        "bucket": env_or("SEED_S3_BUCKET", "media"),
        "region": env_or("SEED_S3_REGION", "auto"),
        "accessKey": env_or("SEED_S3_ACCESS_KEY", "minioadmin"),
        "accessSecret": env_or("SEED_S3_SECRET_KEY", "minioadmin"),
        "enablePathStyleAccess": env_or("SEED_S3_PATH_STYLE", "true") == "true",
        "location": std::env::var("SEED_S3_LOCATION").ok(),
        "domain": std::env::var("SEED_S3_DOMAIN").ok(),
    })
    .to_string();

    // Refuse to seed settings the link service could not use.
    let properties = S3Properties::from_json(&settings).expect("Seed settings are invalid");
    println!("  Settings: {properties:?}");

    println!("Seeding config map...");
    seed(
        &repo,
        ConfigMap {
            metadata: Metadata::named(&config_map_name),
            data: BTreeMap::from([("default".to_string(), settings)]),
        },
    )
    .await;

    println!("Seeding storage policy...");
    seed(
        &repo,
        Policy {
            metadata: Metadata::named(&policy_name),
            spec: PolicySpec {
                display_name: format!("S3 ({})", properties.bucket),
                template_name: S3_TEMPLATE_NAME.to_string(),
                config_map_name: Some(config_map_name),
            },
        },
    )
    .await;

    println!("Issuing development token...");
    issue_token(&env_or("SEED_USERNAME", "admin"));

    println!("Seeding complete!");
}

/// Prints a bearer token accepted by the server's auth middleware.
fn issue_token(username: &str) {
    let config = AppConfig::load().expect("Failed to load configuration");
    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret,
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .unwrap_or(i64::MAX),
    });

    match jwt_service.generate_access_token(username, "admin") {
        Ok(token) => println!("  Bearer token for {username}: {token}"),
        Err(e) => eprintln!("Failed to issue token: {e}"),
    }
}

async fn seed<E: Extension>(repo: &ExtensionRepository, record: E) {
    let name = record.name().to_string();
    match repo.create(record).await {
        Ok(_) => println!("  Created {} {name}", E::KIND),
        Err(ExtensionError::AlreadyExists { .. }) => {
            println!("  {} {name} already exists, skipping...", E::KIND);
        }
        Err(e) => eprintln!("Failed to insert {} {name}: {e}", E::KIND),
    }
}

use std::env;
use std::io::Write;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use sierra_cli::commands::doctor;

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

const ENV_KEYS: &[&str] = &["SIERRA_CONFIG", "SIERRA_CATALOG_PATH", "SIERRA_ORDERS_PATH"];

fn with_env(vars: &[(&str, &str)], body: impl FnOnce()) {
    let _guard = env_lock().lock().expect("env lock");

    let saved: Vec<(String, Option<String>)> =
        ENV_KEYS.iter().map(|key| (key.to_string(), env::var(key).ok())).collect();
    for key in ENV_KEYS {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    body();

    for (key, value) in saved {
        match value {
            Some(value) => env::set_var(&key, value),
            None => env::remove_var(&key),
        }
    }
}

fn demo_files() -> (tempfile::NamedTempFile, tempfile::NamedTempFile) {
    let mut catalog = tempfile::NamedTempFile::new().expect("temp catalog");
    write!(
        catalog,
        r#"[{{"ProductName":"Backcountry Blaze Backpack","SKU":"SOBP001","Inventory":12,
            "Description":"A rugged pack.","Tags":["Hiking"]}}]"#
    )
    .expect("write catalog");

    let mut orders = tempfile::NamedTempFile::new().expect("temp orders");
    write!(
        orders,
        r##"[{{"CustomerName":"Val Kane","Email":"val@example.com","OrderNumber":"#W001",
            "ProductsOrdered":["SOBP001"],"Status":"delivered","TrackingNumber":"TRK123456789"}}]"##
    )
    .expect("write orders");

    (catalog, orders)
}

#[test]
fn doctor_passes_with_valid_data_files() {
    let (catalog, orders) = demo_files();
    let catalog_path = catalog.path().to_string_lossy().to_string();
    let orders_path = orders.path().to_string_lossy().to_string();

    with_env(
        &[
            ("SIERRA_CATALOG_PATH", catalog_path.as_str()),
            ("SIERRA_ORDERS_PATH", orders_path.as_str()),
        ],
        || {
            let output = doctor::run(true);
            let payload: Value = serde_json::from_str(&output).expect("valid doctor json");

            assert_eq!(payload["overall_status"], "pass");
            let checks = payload["checks"].as_array().expect("checks array");
            assert_eq!(checks.len(), 4);
            assert!(checks.iter().all(|check| check["status"] == "pass"));
        },
    );
}

#[test]
fn doctor_fails_when_data_files_are_missing() {
    with_env(
        &[
            ("SIERRA_CATALOG_PATH", "no-such-dir/ProductCatalog.json"),
            ("SIERRA_ORDERS_PATH", "no-such-dir/CustomerOrders.json"),
        ],
        || {
            let output = doctor::run(true);
            let payload: Value = serde_json::from_str(&output).expect("valid doctor json");

            assert_eq!(payload["overall_status"], "fail");
            let checks = payload["checks"].as_array().expect("checks array");
            let catalog_check = checks
                .iter()
                .find(|check| check["name"] == "catalog_data")
                .expect("catalog check present");
            assert_eq!(catalog_check["status"], "fail");
            // config itself is still valid, the failure is the data files
            let config_check = checks
                .iter()
                .find(|check| check["name"] == "config_validation")
                .expect("config check present");
            assert_eq!(config_check["status"], "pass");
        },
    );
}

#[test]
fn doctor_human_output_lists_every_check() {
    let (catalog, orders) = demo_files();
    let catalog_path = catalog.path().to_string_lossy().to_string();
    let orders_path = orders.path().to_string_lossy().to_string();

    with_env(
        &[
            ("SIERRA_CATALOG_PATH", catalog_path.as_str()),
            ("SIERRA_ORDERS_PATH", orders_path.as_str()),
        ],
        || {
            let output = doctor::run(false);
            assert!(output.starts_with("doctor: all readiness checks passed"));
            for name in ["config_validation", "catalog_data", "orders_data", "llm_readiness"] {
                assert!(output.contains(name), "missing check `{name}` in: {output}");
            }
        },
    );
}

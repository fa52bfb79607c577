use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Matibabu";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn default_log_filter() -> &'static str {
    "info,matibabu=debug"
}

/// Get the application data directory (~/Matibabu/)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Matibabu")
}

/// Billing policy. These were business literals scattered through the
/// original workflows; they are injected configuration here.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Flat fee per unpaid appointment, integer shillings.
    pub consultation_fee: i64,
    /// Flat fee per completed, unbilled lab test, integer shillings.
    pub test_fee: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            consultation_fee: 50_000,
            test_fee: 30_000,
        }
    }
}

/// Organization identity printed on receipts, prescriptions, lab reports.
#[derive(Debug, Clone)]
pub struct OrganizationInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl Default for OrganizationInfo {
    fn default() -> Self {
        Self {
            name: "Matibabu Medical Centre".into(),
            address: "Plot 12, Kampala Road, Kampala".into(),
            phone: "+256 700 000 000".into(),
            email: "info@matibabu.example".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub billing: BillingConfig,
    pub organization: OrganizationInfo,
    /// Inventory items below this quantity count as low stock.
    pub low_stock_threshold: i64,
    /// Fraction of pending tests flagged urgent on the lab dashboard.
    pub urgent_test_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8700".into(),
            database_path: app_data_dir().join("matibabu.db"),
            billing: BillingConfig::default(),
            organization: OrganizationInfo::default(),
            low_stock_threshold: 20,
            urgent_test_ratio: 0.05,
        }
    }
}

impl Config {
    /// Load from environment, falling back to defaults per field.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(addr) = std::env::var("MATIBABU_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(path) = std::env::var("MATIBABU_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(fee) = env_i64("MATIBABU_CONSULTATION_FEE") {
            config.billing.consultation_fee = fee;
        }
        if let Some(fee) = env_i64("MATIBABU_TEST_FEE") {
            config.billing.test_fee = fee;
        }
        if let Some(threshold) = env_i64("MATIBABU_LOW_STOCK_THRESHOLD") {
            config.low_stock_threshold = threshold;
        }
        if let Ok(name) = std::env::var("MATIBABU_ORG_NAME") {
            config.organization.name = name;
        }
        if let Ok(address) = std::env::var("MATIBABU_ORG_ADDRESS") {
            config.organization.address = address;
        }
        if let Ok(phone) = std::env::var("MATIBABU_ORG_PHONE") {
            config.organization.phone = phone;
        }
        if let Ok(email) = std::env::var("MATIBABU_ORG_EMAIL") {
            config.organization.email = email;
        }

        config
    }
}

fn env_i64(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Matibabu"));
    }

    #[test]
    fn default_billing_fees() {
        let billing = BillingConfig::default();
        assert_eq!(billing.consultation_fee, 50_000);
        assert_eq!(billing.test_fee, 30_000);
    }

    #[test]
    fn default_thresholds() {
        let config = Config::default();
        assert_eq!(config.low_stock_threshold, 20);
        assert!((config.urgent_test_ratio - 0.05).abs() < f64::EPSILON);
    }
}

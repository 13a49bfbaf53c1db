//! Biller catalog.
//!
//! The engine only reads biller configuration; writes happen through
//! administrative tooling outside the request path. The in-memory
//! implementation ships the reference data set used by the simulation.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::types::biller::{BillerCategory, BillerConfig};

/// Read-mostly lookup of biller configuration by code.
#[async_trait]
pub trait BillerCatalog: Send + Sync {
    /// Configuration for a biller code, if one exists.
    async fn get(&self, biller_code: &str) -> Option<BillerConfig>;

    /// Every configured biller, in no particular order.
    async fn all(&self) -> Vec<BillerConfig>;

    /// Inserts or replaces a biller entry.
    async fn upsert(&self, config: BillerConfig);
}

/// In-memory catalog backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryBillerCatalog {
    billers: DashMap<String, BillerConfig>,
}

impl InMemoryBillerCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        InMemoryBillerCatalog {
            billers: DashMap::new(),
        }
    }

    /// Catalog pre-loaded with the reference biller set: five bill-payment
    /// utilities and four telecom operators, each with its validation
    /// format and simulated latency/error profile.
    pub fn seeded() -> Self {
        let catalog = InMemoryBillerCatalog::new();

        for biller in [
            BillerConfig::bill_payment(
                "EGY-ELECTRICITY",
                "Électricité d'Égypte",
                BillerCategory::Electricity,
            )
            .with_reference_format("^[0-9]{8,12}$")
            .with_delay_ms(500)
            .with_error_rate(5),
            BillerConfig::bill_payment(
                "EGY-WATER",
                "Compagnie des Eaux d'Égypte",
                BillerCategory::Water,
            )
            .with_reference_format("^[A-Z]{2}[0-9]{6,10}$")
            .with_delay_ms(700)
            .with_error_rate(8),
            BillerConfig::bill_payment("EGY-GAS", "Gaz d'Égypte", BillerCategory::Gas)
                .with_reference_format("^GZ[0-9]{7,11}$")
                .with_delay_ms(600)
                .with_error_rate(5),
            BillerConfig::bill_payment("EGY-TELECOM", "Télécom Égypte", BillerCategory::Phone)
                .with_reference_format("^TEL[0-9]{8,10}$")
                .with_delay_ms(300)
                .with_error_rate(3),
            BillerConfig::bill_payment("EGY-INTERNET", "Internet Égypte", BillerCategory::Internet)
                .with_reference_format("^NET[0-9]{7,9}$")
                .with_delay_ms(400)
                .with_error_rate(4),
            BillerConfig::telecom_recharge("EGY-ORANGE", "Orange Égypte")
                .with_phone_format("^(010|012)[0-9]{8}$")
                .with_amounts(&[10, 20, 50, 100, 200, 500])
                .with_delay_ms(200)
                .with_error_rate(3),
            BillerConfig::telecom_recharge("EGY-VODAFONE", "Vodafone Égypte")
                .with_phone_format("^(010|011)[0-9]{8}$")
                .with_amounts(&[10, 25, 50, 100, 200, 500])
                .with_delay_ms(250)
                .with_error_rate(4),
            BillerConfig::telecom_recharge("EGY-ETISALAT", "Etisalat Égypte")
                .with_phone_format("^(011|015)[0-9]{8}$")
                .with_amounts(&[10, 20, 30, 50, 100, 200])
                .with_delay_ms(300)
                .with_error_rate(5),
            BillerConfig::telecom_recharge("EGY-WE", "WE Égypte")
                .with_phone_format("^(015)[0-9]{8}$")
                .with_amounts(&[10, 25, 50, 75, 100, 150, 200])
                .with_delay_ms(200)
                .with_error_rate(4),
        ] {
            catalog.billers.insert(biller.biller_code.clone(), biller);
        }

        catalog
    }
}

#[async_trait]
impl BillerCatalog for InMemoryBillerCatalog {
    async fn get(&self, biller_code: &str) -> Option<BillerConfig> {
        self.billers.get(biller_code).map(|entry| entry.clone())
    }

    async fn all(&self) -> Vec<BillerConfig> {
        self.billers.iter().map(|entry| entry.clone()).collect()
    }

    async fn upsert(&self, config: BillerConfig) {
        self.billers.insert(config.biller_code.clone(), config);
    }
}

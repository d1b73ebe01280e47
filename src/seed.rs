//! Demo catalogue for trying the server out.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::auth::CredentialHasher;
use crate::error::Result;
use crate::store::Store;
use crate::types::{Money, NewBatch, NewCategory, NewMedicine, NewUser, Role};

struct DemoMedicine {
    name: &'static str,
    sku: &'static str,
    category: usize,
    description: &'static str,
    dosage: &'static str,
    manufacturer: &'static str,
    price: i64,
    requires_prescription: bool,
}

const CATEGORIES: [(&str, &str); 4] = [
    ("Pain Relief", "Medications for pain management"),
    ("Antibiotics", "Medications for bacterial infections"),
    ("Vitamins & Supplements", "Nutritional supplements and vitamins"),
    ("Cold & Flu", "Medications for cold and flu symptoms"),
];

const MEDICINES: [DemoMedicine; 5] = [
    DemoMedicine {
        name: "Paracetamol 500mg",
        sku: "MED001",
        category: 0,
        description: "Pain reliever and fever reducer",
        dosage: "500mg",
        manufacturer: "Generic Pharma",
        price: 25_000,
        requires_prescription: false,
    },
    DemoMedicine {
        name: "Ibuprofen 400mg",
        sku: "MED002",
        category: 0,
        description: "Anti-inflammatory pain reliever",
        dosage: "400mg",
        manufacturer: "Generic Pharma",
        price: 35_000,
        requires_prescription: false,
    },
    DemoMedicine {
        name: "Amoxicillin 500mg",
        sku: "MED003",
        category: 1,
        description: "Broad-spectrum antibiotic",
        dosage: "500mg",
        manufacturer: "BioPharma",
        price: 120_000,
        requires_prescription: true,
    },
    DemoMedicine {
        name: "Vitamin C 1000mg",
        sku: "MED004",
        category: 2,
        description: "Immune system support",
        dosage: "1000mg",
        manufacturer: "VitaHealth",
        price: 45_000,
        requires_prescription: false,
    },
    DemoMedicine {
        name: "Cough Syrup",
        sku: "MED005",
        category: 3,
        description: "Relief for dry and productive cough",
        dosage: "5ml",
        manufacturer: "MediCare",
        price: 65_000,
        requires_prescription: false,
    },
];

const DEMO_MIN_STOCK: i64 = 20;

/// What a seed run created.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub medicines: usize,
    pub batches: usize,
    pub users: usize,
}

impl SeedReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Loads the demo catalogue and the two demo accounts.
///
/// The catalogue is only loaded into a database without categories, and each
/// demo account is only created when its username is free, so running this
/// twice is harmless.
pub fn seed_demo_data(
    store: &dyn Store,
    hasher: &CredentialHasher,
    now: DateTime<Utc>,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    if store.list_categories()?.is_empty() {
        seed_catalogue(store, now, &mut report)?;
    } else {
        tracing::info!("Catalogue already present, skipping");
    }

    let accounts = [
        NewUser {
            username: "pharmacist1".to_string(),
            password_hash: String::new(),
            email: "pharmacist@dispensary.local".to_string(),
            full_name: "Dr. Nguyen Van A".to_string(),
            phone: Some("+84123456789".to_string()),
            address: Some("123 Pharmacy Street, Ho Chi Minh City".to_string()),
            role: Role::Pharmacist,
        },
        NewUser {
            username: "customer1".to_string(),
            password_hash: String::new(),
            email: "customer@example.com".to_string(),
            full_name: "Tran Thi B".to_string(),
            phone: Some("+84987654321".to_string()),
            address: Some("456 Customer Street, Ho Chi Minh City".to_string()),
            role: Role::Customer,
        },
    ];
    let passwords = ["pharm123", "cust123"];

    for (mut account, password) in accounts.into_iter().zip(passwords) {
        if store.get_user_by_username(&account.username)?.is_some() {
            continue;
        }
        account.password_hash = hasher.hash(password)?;
        store.create_user(&account)?;
        tracing::info!(username = %account.username, role = %account.role, "Created demo account");
        report.users += 1;
    }

    Ok(report)
}

fn seed_catalogue(store: &dyn Store, now: DateTime<Utc>, report: &mut SeedReport) -> Result<()> {
    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (name, description) in CATEGORIES {
        let category = store.create_category(&NewCategory {
            name: name.to_string(),
            description: Some(description.to_string()),
        })?;
        category_ids.push(category.id);
        report.categories += 1;
    }

    let mut rng = rand::thread_rng();
    for demo in &MEDICINES {
        let price = Money::from_cents(demo.price * 100);
        let medicine = store.create_medicine(&NewMedicine {
            name: demo.name.to_string(),
            sku: demo.sku.to_string(),
            category_id: category_ids.get(demo.category).copied(),
            description: Some(demo.description.to_string()),
            dosage: Some(demo.dosage.to_string()),
            manufacturer: Some(demo.manufacturer.to_string()),
            price,
            requires_prescription: demo.requires_prescription,
            is_active: true,
        })?;
        report.medicines += 1;

        store.create_batch(&NewBatch {
            medicine_id: medicine.id,
            batch_number: format!("BATCH{}001", medicine.id),
            quantity: rng.gen_range(50..=150),
            min_stock_level: DEMO_MIN_STOCK,
            expiry_date: now + Duration::days(365),
            cost_price: price.scale(7, 10),
        })?;
        report.batches += 1;
    }

    tracing::info!(
        categories = report.categories,
        medicines = report.medicines,
        "Seeded demo catalogue"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;

    fn setup() -> (TempDir, SqliteStore, CredentialHasher) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store, CredentialHasher::new())
    }

    #[test]
    fn test_seed_loads_catalogue_and_accounts() {
        let (_temp, store, hasher) = setup();
        let report = seed_demo_data(&store, &hasher, Utc::now()).unwrap();

        assert_eq!(
            report,
            SeedReport {
                categories: 4,
                medicines: 5,
                batches: 5,
                users: 2,
            }
        );

        let amoxicillin = store.get_medicine_by_sku("MED003").unwrap().unwrap();
        assert!(amoxicillin.requires_prescription);
        assert_eq!(amoxicillin.price, Money::from_cents(12_000_000));

        let batches = store.list_batches(Some(amoxicillin.id)).unwrap();
        assert_eq!(batches.len(), 1);
        assert!((50..=150).contains(&batches[0].quantity));
        assert_eq!(batches[0].cost_price, Money::from_cents(8_400_000));

        let pharmacist = store.get_user_by_username("pharmacist1").unwrap().unwrap();
        assert_eq!(pharmacist.role, Role::Pharmacist);
        assert!(hasher.verify("pharm123", &pharmacist.password_hash).unwrap());
    }

    #[test]
    fn test_seed_twice_is_a_no_op() {
        let (_temp, store, hasher) = setup();
        seed_demo_data(&store, &hasher, Utc::now()).unwrap();
        let second = seed_demo_data(&store, &hasher, Utc::now()).unwrap();

        assert!(second.is_empty());
        assert_eq!(store.list_medicines(false).unwrap().len(), 5);
        assert_eq!(store.list_categories().unwrap().len(), 4);
    }
}

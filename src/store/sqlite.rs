use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Params, Row, params, params_from_iter};

use super::schema::SCHEMA;
use super::{PrescriptionFilter, SaleFilter, StatusChange, Store, checkout};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub(super) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub(super) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(parse_datetime(&row.get::<_, String>(idx)?))
}

fn get_opt_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row.get::<_, Option<String>>(idx)?.map(|s| parse_datetime(&s)))
}

fn day_bounds(day: NaiveDate) -> (String, String) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1);
    (format_datetime(&start), format_datetime(&end))
}

pub(super) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Maps a unique-constraint failure to a conflict carrying `message`.
pub(super) fn unique_conflict(message: &'static str) -> impl FnOnce(rusqlite::Error) -> Error {
    move |e| {
        if is_unique_violation(&e) {
            Error::conflict(message)
        } else {
            Error::from(e)
        }
    }
}

pub(super) fn query_one<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Option<T>> {
    conn.query_row(sql, params, map)
        .optional()
        .map_err(Error::from)
}

pub(super) fn query_all<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn count<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<i64> {
    conn.query_row(sql, params, |row| row.get(0))
        .map_err(Error::from)
}

// Row mappers. Column order matches the *_COLUMNS constants.

const USER_COLUMNS: &str =
    "id, username, password_hash, email, full_name, phone, address, role, is_active, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        email: row.get(3)?,
        full_name: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        role: row.get(7)?,
        is_active: row.get(8)?,
        created_at: get_datetime(row, 9)?,
    })
}

const SESSION_COLUMNS: &str =
    "id, user_id, key_lookup, key_hash, created_at, expires_at, last_seen_at";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        key_lookup: row.get(2)?,
        key_hash: row.get(3)?,
        created_at: get_datetime(row, 4)?,
        expires_at: get_datetime(row, 5)?,
        last_seen_at: get_opt_datetime(row, 6)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

pub(super) const MEDICINE_COLUMNS: &str = "id, name, sku, category_id, description, dosage, manufacturer, \
     price, requires_prescription, is_active, created_at";

pub(super) fn medicine_from_row(row: &Row<'_>) -> rusqlite::Result<Medicine> {
    Ok(Medicine {
        id: row.get(0)?,
        name: row.get(1)?,
        sku: row.get(2)?,
        category_id: row.get(3)?,
        description: row.get(4)?,
        dosage: row.get(5)?,
        manufacturer: row.get(6)?,
        price: row.get(7)?,
        requires_prescription: row.get(8)?,
        is_active: row.get(9)?,
        created_at: get_datetime(row, 10)?,
    })
}

pub(super) const BATCH_COLUMNS: &str =
    "id, medicine_id, batch_number, quantity, min_stock_level, expiry_date, cost_price, created_at";

pub(super) fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<InventoryBatch> {
    Ok(InventoryBatch {
        id: row.get(0)?,
        medicine_id: row.get(1)?,
        batch_number: row.get(2)?,
        quantity: row.get(3)?,
        min_stock_level: row.get(4)?,
        expiry_date: get_datetime(row, 5)?,
        cost_price: row.get(6)?,
        created_at: get_datetime(row, 7)?,
    })
}

pub(super) const PRESCRIPTION_COLUMNS: &str = "id, customer_id, pharmacist_id, prescription_number, \
     doctor_name, status, notes, issued_date, verified_at, dispensed_at, created_at";

pub(super) fn prescription_from_row(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        pharmacist_id: row.get(2)?,
        prescription_number: row.get(3)?,
        doctor_name: row.get(4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
        issued_date: get_datetime(row, 7)?,
        verified_at: get_opt_datetime(row, 8)?,
        dispensed_at: get_opt_datetime(row, 9)?,
        created_at: get_datetime(row, 10)?,
    })
}

pub(super) const PRESCRIPTION_ITEM_COLUMNS: &str =
    "id, prescription_id, medicine_id, quantity, dosage_instructions, dispensed_quantity";

pub(super) fn prescription_item_from_row(row: &Row<'_>) -> rusqlite::Result<PrescriptionItem> {
    Ok(PrescriptionItem {
        id: row.get(0)?,
        prescription_id: row.get(1)?,
        medicine_id: row.get(2)?,
        quantity: row.get(3)?,
        dosage_instructions: row.get(4)?,
        dispensed_quantity: row.get(5)?,
    })
}

pub(super) const SALE_COLUMNS: &str = "id, customer_id, pharmacist_id, prescription_id, sale_number, \
     subtotal, discount_amount, tax_amount, total_amount, payment_method, status, discount_id, created_at";

pub(super) fn sale_from_row(row: &Row<'_>) -> rusqlite::Result<Sale> {
    Ok(Sale {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        pharmacist_id: row.get(2)?,
        prescription_id: row.get(3)?,
        sale_number: row.get(4)?,
        subtotal: row.get(5)?,
        discount_amount: row.get(6)?,
        tax_amount: row.get(7)?,
        total_amount: row.get(8)?,
        payment_method: row.get(9)?,
        status: row.get(10)?,
        discount_id: row.get(11)?,
        created_at: get_datetime(row, 12)?,
    })
}

pub(super) const SALE_ITEM_COLUMNS: &str =
    "id, sale_id, medicine_id, inventory_id, quantity, unit_price, total_price";

pub(super) fn sale_item_from_row(row: &Row<'_>) -> rusqlite::Result<SaleItem> {
    Ok(SaleItem {
        id: row.get(0)?,
        sale_id: row.get(1)?,
        medicine_id: row.get(2)?,
        inventory_id: row.get(3)?,
        quantity: row.get(4)?,
        unit_price: row.get(5)?,
        total_price: row.get(6)?,
    })
}

pub(super) const DISCOUNT_COLUMNS: &str = "id, name, kind, value, applicable_to_medicine_id, \
     min_order_amount, max_discount_amount, valid_from, valid_to, is_active";

pub(super) fn discount_from_row(row: &Row<'_>) -> rusqlite::Result<Discount> {
    Ok(Discount {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        value: row.get(3)?,
        applicable_to_medicine_id: row.get(4)?,
        min_order_amount: row.get(5)?,
        max_discount_amount: row.get(6)?,
        valid_from: get_datetime(row, 7)?,
        valid_to: get_datetime(row, 8)?,
        is_active: row.get(9)?,
    })
}

pub(super) fn load_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
}

pub(super) fn load_medicine(conn: &Connection, id: i64) -> Result<Option<Medicine>> {
    query_one(
        conn,
        &format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?1"),
        params![id],
        medicine_from_row,
    )
}

pub(super) fn load_batch(conn: &Connection, id: i64) -> Result<Option<InventoryBatch>> {
    query_one(
        conn,
        &format!("SELECT {BATCH_COLUMNS} FROM inventory WHERE id = ?1"),
        params![id],
        batch_from_row,
    )
}

pub(super) fn load_prescription(conn: &Connection, id: i64) -> Result<Option<Prescription>> {
    query_one(
        conn,
        &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"),
        params![id],
        prescription_from_row,
    )
}

pub(super) fn load_prescription_items(
    conn: &Connection,
    prescription_id: i64,
) -> Result<Vec<PrescriptionItem>> {
    query_all(
        conn,
        &format!(
            "SELECT {PRESCRIPTION_ITEM_COLUMNS} FROM prescription_items
             WHERE prescription_id = ?1 ORDER BY id"
        ),
        params![prescription_id],
        prescription_item_from_row,
    )
}

pub(super) fn load_sale(conn: &Connection, id: i64) -> Result<Option<Sale>> {
    query_one(
        conn,
        &format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"),
        params![id],
        sale_from_row,
    )
}

pub(super) fn load_sale_items(conn: &Connection, sale_id: i64) -> Result<Vec<SaleItem>> {
    query_all(
        conn,
        &format!("SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY id"),
        params![sale_id],
        sale_item_from_row,
    )
}

pub(super) fn load_discount(conn: &Connection, id: i64) -> Result<Option<Discount>> {
    query_one(
        conn,
        &format!("SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE id = ?1"),
        params![id],
        discount_from_row,
    )
}

fn save_prescription_fields(conn: &Connection, prescription: &Prescription) -> Result<()> {
    let rows = conn.execute(
        "UPDATE prescriptions SET doctor_name = ?1, notes = ?2, issued_date = ?3
         WHERE id = ?4 AND status = ?5",
        params![
            prescription.doctor_name,
            prescription.notes,
            format_datetime(&prescription.issued_date),
            prescription.id,
            PrescriptionStatus::Pending,
        ],
    )?;

    if rows == 0 {
        return match load_prescription(conn, prescription.id)? {
            Some(_) => Err(Error::conflict("Only pending prescriptions can be edited")),
            None => Err(Error::not_found("Prescription")),
        };
    }
    Ok(())
}

/// Moves a prescription to `change.to`, guarded on the status it was read with.
fn apply_prescription_transition(
    conn: &Connection,
    id: i64,
    change: StatusChange,
) -> Result<Prescription> {
    let StatusChange { to, actor_id, at } = change;
    let current = load_prescription(conn, id)?.ok_or_else(|| Error::not_found("Prescription"))?;
    if !current.status.can_transition_to(to) {
        return Err(Error::invalid_transition(current.status, to));
    }

    let at = format_datetime(&at);
    let rows = match to {
        PrescriptionStatus::Verified => conn.execute(
            "UPDATE prescriptions SET status = ?1, verified_at = ?2, pharmacist_id = ?3
             WHERE id = ?4 AND status = ?5",
            params![to, at, actor_id, id, current.status],
        )?,
        PrescriptionStatus::Dispensed => conn.execute(
            "UPDATE prescriptions SET status = ?1, dispensed_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![to, at, id, current.status],
        )?,
        _ => conn.execute(
            "UPDATE prescriptions SET status = ?1, pharmacist_id = COALESCE(pharmacist_id, ?2)
             WHERE id = ?3 AND status = ?4",
            params![to, actor_id, id, current.status],
        )?,
    };
    if rows == 0 {
        return Err(Error::invalid_transition(current.status, to));
    }

    load_prescription(conn, id)?.ok_or_else(|| Error::not_found("Prescription"))
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (username, password_hash, email, full_name, phone, address, role, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
            params![
                user.username,
                user.password_hash,
                user.email,
                user.full_name,
                user.phone,
                user.address,
                user.role,
                format_datetime(&Utc::now()),
            ],
        )
        .map_err(unique_conflict("Username or email already exists"))?;

        load_user(&conn, conn.last_insert_rowid())?.ok_or_else(|| Error::not_found("User"))
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        load_user(&self.conn(), id)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        query_one(
            &self.conn(),
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        query_one(
            &self.conn(),
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
    }

    fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        query_all(
            &self.conn(),
            &format!("SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY full_name, id"),
            params![role],
            user_from_row,
        )
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE users SET password_hash = ?1, email = ?2, full_name = ?3, phone = ?4,
                     address = ?5, role = ?6, is_active = ?7
                 WHERE id = ?8",
                params![
                    user.password_hash,
                    user.email,
                    user.full_name,
                    user.phone,
                    user.address,
                    user.role,
                    user.is_active,
                    user.id,
                ],
            )
            .map_err(unique_conflict("Email already exists"))?;

        if rows == 0 {
            return Err(Error::not_found("User"));
        }
        Ok(())
    }

    fn set_user_active(&self, id: i64, is_active: bool) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE users SET is_active = ?1 WHERE id = ?2",
            params![is_active, id],
        )?;
        Ok(rows > 0)
    }

    fn has_manager(&self) -> Result<bool> {
        let managers = count(
            &self.conn(),
            "SELECT COUNT(*) FROM users WHERE role = ?1",
            params![Role::Manager],
        )?;
        Ok(managers > 0)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO sessions (id, user_id, key_lookup, key_hash, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id,
                session.user_id,
                session.key_lookup,
                session.key_hash,
                format_datetime(&session.created_at),
                format_datetime(&session.expires_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::SessionLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        query_one(
            &self.conn(),
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE key_lookup = ?1"),
            params![lookup],
            session_from_row,
        )
    }

    fn touch_session(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sessions SET last_seen_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn delete_user_sessions(&self, user_id: i64) -> Result<usize> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
        Ok(rows)
    }

    fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![format_datetime(&now)],
        )?;
        Ok(rows)
    }

    // Category operations

    fn create_category(&self, category: &NewCategory) -> Result<Category> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO categories (name, description) VALUES (?1, ?2)",
            params![category.name, category.description],
        )
        .map_err(unique_conflict("Category already exists"))?;

        Ok(Category {
            id: conn.last_insert_rowid(),
            name: category.name.clone(),
            description: category.description.clone(),
        })
    }

    fn get_category(&self, id: i64) -> Result<Option<Category>> {
        query_one(
            &self.conn(),
            "SELECT id, name, description FROM categories WHERE id = ?1",
            params![id],
            category_from_row,
        )
    }

    fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        query_one(
            &self.conn(),
            "SELECT id, name, description FROM categories WHERE name = ?1",
            params![name],
            category_from_row,
        )
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        query_all(
            &self.conn(),
            "SELECT id, name, description FROM categories ORDER BY name",
            [],
            category_from_row,
        )
    }

    // Medicine operations

    fn create_medicine(&self, medicine: &NewMedicine) -> Result<Medicine> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO medicines (name, sku, category_id, description, dosage, manufacturer,
                 price, requires_prescription, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                medicine.name,
                medicine.sku,
                medicine.category_id,
                medicine.description,
                medicine.dosage,
                medicine.manufacturer,
                medicine.price,
                medicine.requires_prescription,
                medicine.is_active,
                format_datetime(&Utc::now()),
            ],
        )
        .map_err(unique_conflict("SKU already exists"))?;

        load_medicine(&conn, conn.last_insert_rowid())?.ok_or_else(|| Error::not_found("Medicine"))
    }

    fn get_medicine(&self, id: i64) -> Result<Option<Medicine>> {
        load_medicine(&self.conn(), id)
    }

    fn get_medicine_by_sku(&self, sku: &str) -> Result<Option<Medicine>> {
        query_one(
            &self.conn(),
            &format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE sku = ?1"),
            params![sku],
            medicine_from_row,
        )
    }

    fn list_medicines(&self, active_only: bool) -> Result<Vec<Medicine>> {
        let sql = if active_only {
            format!(
                "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE is_active = 1
                 ORDER BY created_at DESC, id DESC"
            )
        } else {
            format!("SELECT {MEDICINE_COLUMNS} FROM medicines ORDER BY created_at DESC, id DESC")
        };
        query_all(&self.conn(), &sql, [], medicine_from_row)
    }

    fn update_medicine(&self, medicine: &Medicine) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE medicines SET name = ?1, sku = ?2, category_id = ?3, description = ?4,
                     dosage = ?5, manufacturer = ?6, price = ?7, requires_prescription = ?8,
                     is_active = ?9
                 WHERE id = ?10",
                params![
                    medicine.name,
                    medicine.sku,
                    medicine.category_id,
                    medicine.description,
                    medicine.dosage,
                    medicine.manufacturer,
                    medicine.price,
                    medicine.requires_prescription,
                    medicine.is_active,
                    medicine.id,
                ],
            )
            .map_err(unique_conflict("SKU already exists"))?;

        if rows == 0 {
            return Err(Error::not_found("Medicine"));
        }
        Ok(())
    }

    fn delete_medicine(&self, id: i64) -> Result<bool> {
        let conn = self.conn();
        let references = count(
            &conn,
            "SELECT (SELECT COUNT(*) FROM inventory WHERE medicine_id = ?1)
                  + (SELECT COUNT(*) FROM prescription_items WHERE medicine_id = ?1)
                  + (SELECT COUNT(*) FROM sale_items WHERE medicine_id = ?1)
                  + (SELECT COUNT(*) FROM discounts WHERE applicable_to_medicine_id = ?1)",
            params![id],
        )?;
        if references > 0 {
            return Err(Error::conflict(
                "Medicine is referenced by inventory, prescriptions, sales or discounts; deactivate it instead",
            ));
        }

        let rows = conn.execute("DELETE FROM medicines WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Inventory operations

    fn create_batch(&self, batch: &NewBatch) -> Result<InventoryBatch> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO inventory (medicine_id, batch_number, quantity, min_stock_level,
                 expiry_date, cost_price, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                batch.medicine_id,
                batch.batch_number,
                batch.quantity,
                batch.min_stock_level,
                format_datetime(&batch.expiry_date),
                batch.cost_price,
                format_datetime(&Utc::now()),
            ],
        )
        .map_err(unique_conflict("Batch number already exists for this medicine"))?;

        load_batch(&conn, conn.last_insert_rowid())?.ok_or_else(|| Error::not_found("Inventory batch"))
    }

    fn get_batch(&self, id: i64) -> Result<Option<InventoryBatch>> {
        load_batch(&self.conn(), id)
    }

    fn list_batches(&self, medicine_id: Option<i64>) -> Result<Vec<InventoryBatch>> {
        let conn = self.conn();
        match medicine_id {
            Some(medicine_id) => query_all(
                &conn,
                &format!(
                    "SELECT {BATCH_COLUMNS} FROM inventory WHERE medicine_id = ?1
                     ORDER BY created_at DESC, id DESC"
                ),
                params![medicine_id],
                batch_from_row,
            ),
            None => query_all(
                &conn,
                &format!("SELECT {BATCH_COLUMNS} FROM inventory ORDER BY created_at DESC, id DESC"),
                [],
                batch_from_row,
            ),
        }
    }

    fn update_batch(&self, batch: &InventoryBatch) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE inventory SET batch_number = ?1, quantity = ?2, min_stock_level = ?3,
                     expiry_date = ?4, cost_price = ?5
                 WHERE id = ?6",
                params![
                    batch.batch_number,
                    batch.quantity,
                    batch.min_stock_level,
                    format_datetime(&batch.expiry_date),
                    batch.cost_price,
                    batch.id,
                ],
            )
            .map_err(unique_conflict("Batch number already exists for this medicine"))?;

        if rows == 0 {
            return Err(Error::not_found("Inventory batch"));
        }
        Ok(())
    }

    fn adjust_batch_quantity(&self, id: i64, delta: i64) -> Result<InventoryBatch> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE inventory SET quantity = quantity + ?1 WHERE id = ?2 AND quantity + ?1 >= 0",
            params![delta, id],
        )?;

        let batch = load_batch(&conn, id)?.ok_or_else(|| Error::not_found("Inventory batch"))?;
        if rows == 0 {
            return Err(Error::conflict("Adjustment would make stock negative"));
        }
        Ok(batch)
    }

    fn list_low_stock(&self) -> Result<Vec<InventoryBatch>> {
        query_all(
            &self.conn(),
            &format!(
                "SELECT {BATCH_COLUMNS} FROM inventory WHERE quantity <= min_stock_level
                 ORDER BY quantity, id"
            ),
            [],
            batch_from_row,
        )
    }

    fn list_expiring(&self, now: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<InventoryBatch>> {
        query_all(
            &self.conn(),
            &format!(
                "SELECT {BATCH_COLUMNS} FROM inventory
                 WHERE quantity > 0 AND expiry_date > ?1 AND expiry_date <= ?2
                 ORDER BY expiry_date, id"
            ),
            params![format_datetime(&now), format_datetime(&until)],
            batch_from_row,
        )
    }

    // Prescription operations

    fn create_prescription(&self, prescription: &NewPrescription) -> Result<PrescriptionDetail> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let customer =
            load_user(&tx, prescription.customer_id)?.ok_or_else(|| Error::not_found("Customer"))?;
        if customer.role != Role::Customer {
            return Err(Error::bad_request("Prescriptions can only be issued to customers"));
        }

        tx.execute(
            "INSERT INTO prescriptions (customer_id, prescription_number, doctor_name, status,
                 notes, issued_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                prescription.customer_id,
                prescription.prescription_number,
                prescription.doctor_name,
                PrescriptionStatus::Pending,
                prescription.notes,
                format_datetime(&prescription.issued_date),
                format_datetime(&Utc::now()),
            ],
        )
        .map_err(unique_conflict("Prescription number already exists"))?;
        let id = tx.last_insert_rowid();

        for item in &prescription.items {
            if load_medicine(&tx, item.medicine_id)?.is_none() {
                return Err(Error::not_found(format!("Medicine {}", item.medicine_id)));
            }
            tx.execute(
                "INSERT INTO prescription_items (prescription_id, medicine_id, quantity, dosage_instructions)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, item.medicine_id, item.quantity, item.dosage_instructions],
            )?;
        }

        let created = load_prescription(&tx, id)?.ok_or_else(|| Error::not_found("Prescription"))?;
        let items = load_prescription_items(&tx, id)?;
        tx.commit()?;

        Ok(PrescriptionDetail {
            prescription: created,
            items,
        })
    }

    fn get_prescription(&self, id: i64) -> Result<Option<Prescription>> {
        load_prescription(&self.conn(), id)
    }

    fn list_prescriptions(&self, filter: PrescriptionFilter) -> Result<Vec<Prescription>> {
        let mut sql = format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE 1 = 1");
        let mut args: Vec<Value> = Vec::new();

        if let Some(status) = filter.status {
            args.push(Value::Text(status.as_str().to_string()));
            sql.push_str(&format!(" AND status = ?{}", args.len()));
        }
        if let Some(customer_id) = filter.customer_id {
            args.push(Value::Integer(customer_id));
            sql.push_str(&format!(" AND customer_id = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        query_all(&self.conn(), &sql, params_from_iter(args), prescription_from_row)
    }

    fn list_prescription_items(&self, prescription_id: i64) -> Result<Vec<PrescriptionItem>> {
        load_prescription_items(&self.conn(), prescription_id)
    }

    fn update_prescription(
        &self,
        prescription: &Prescription,
        change: Option<StatusChange>,
    ) -> Result<Prescription> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        save_prescription_fields(&tx, prescription)?;
        let updated = match change {
            Some(change) => apply_prescription_transition(&tx, prescription.id, change)?,
            None => load_prescription(&tx, prescription.id)?
                .ok_or_else(|| Error::not_found("Prescription"))?,
        };
        tx.commit()?;
        Ok(updated)
    }

    fn transition_prescription(
        &self,
        id: i64,
        to: PrescriptionStatus,
        actor_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Prescription> {
        apply_prescription_transition(&self.conn(), id, StatusChange { to, actor_id, at })
    }

    // Sale operations

    fn record_sale(&self, sale: &NewSale) -> Result<SaleDetail> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let detail = checkout::record_sale(&tx, sale)?;
        tx.commit()?;
        Ok(detail)
    }

    fn get_sale(&self, id: i64) -> Result<Option<Sale>> {
        load_sale(&self.conn(), id)
    }

    fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>> {
        let mut sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE 1 = 1");
        let mut args: Vec<Value> = Vec::new();

        if let Some(day) = filter.date {
            let (start, end) = day_bounds(day);
            args.push(Value::Text(start));
            args.push(Value::Text(end));
            sql.push_str(&format!(
                " AND created_at >= ?{} AND created_at < ?{}",
                args.len() - 1,
                args.len()
            ));
        }
        if let Some(customer_id) = filter.customer_id {
            args.push(Value::Integer(customer_id));
            sql.push_str(&format!(" AND customer_id = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        query_all(&self.conn(), &sql, params_from_iter(args), sale_from_row)
    }

    fn list_sale_items(&self, sale_id: i64) -> Result<Vec<SaleItem>> {
        load_sale_items(&self.conn(), sale_id)
    }

    fn transition_sale(&self, id: i64, to: SaleStatus) -> Result<Sale> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let updated = checkout::transition_sale(&tx, id, to)?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_sale(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let deleted = checkout::delete_sale(&tx, id)?;
        tx.commit()?;
        Ok(deleted)
    }

    // Discount operations

    fn create_discount(&self, discount: &NewDiscount) -> Result<Discount> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO discounts (name, kind, value, applicable_to_medicine_id, min_order_amount,
                 max_discount_amount, valid_from, valid_to, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                discount.name,
                discount.kind,
                discount.value,
                discount.applicable_to_medicine_id,
                discount.min_order_amount,
                discount.max_discount_amount,
                format_datetime(&discount.valid_from),
                format_datetime(&discount.valid_to),
                discount.is_active,
            ],
        )?;

        load_discount(&conn, conn.last_insert_rowid())?.ok_or_else(|| Error::not_found("Discount"))
    }

    fn get_discount(&self, id: i64) -> Result<Option<Discount>> {
        load_discount(&self.conn(), id)
    }

    fn list_discounts(&self) -> Result<Vec<Discount>> {
        query_all(
            &self.conn(),
            &format!("SELECT {DISCOUNT_COLUMNS} FROM discounts ORDER BY valid_from DESC, id DESC"),
            [],
            discount_from_row,
        )
    }

    fn list_active_discounts(&self, now: DateTime<Utc>) -> Result<Vec<Discount>> {
        query_all(
            &self.conn(),
            &format!(
                "SELECT {DISCOUNT_COLUMNS} FROM discounts
                 WHERE is_active = 1 AND valid_from <= ?1 AND valid_to >= ?1
                 ORDER BY valid_from DESC, id DESC"
            ),
            params![format_datetime(&now)],
            discount_from_row,
        )
    }

    fn update_discount(&self, discount: &Discount) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE discounts SET name = ?1, kind = ?2, value = ?3, applicable_to_medicine_id = ?4,
                 min_order_amount = ?5, max_discount_amount = ?6, valid_from = ?7, valid_to = ?8,
                 is_active = ?9
             WHERE id = ?10",
            params![
                discount.name,
                discount.kind,
                discount.value,
                discount.applicable_to_medicine_id,
                discount.min_order_amount,
                discount.max_discount_amount,
                format_datetime(&discount.valid_from),
                format_datetime(&discount.valid_to),
                discount.is_active,
                discount.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("Discount"));
        }
        Ok(())
    }

    fn delete_discount(&self, id: i64) -> Result<bool> {
        let conn = self.conn();
        let uses = count(
            &conn,
            "SELECT COUNT(*) FROM sales WHERE discount_id = ?1",
            params![id],
        )?;
        if uses > 0 {
            return Err(Error::conflict("Discount is referenced by a sale"));
        }

        let rows = conn.execute("DELETE FROM discounts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let conn = self.conn();
        let (today, tomorrow) = day_bounds(now.date_naive());
        let now_text = format_datetime(&now);
        let horizon = format_datetime(&(now + Duration::days(30)));

        let total_medicines = count(&conn, "SELECT COUNT(*) FROM medicines WHERE is_active = 1", [])?;
        let low_stock_items = count(
            &conn,
            "SELECT COUNT(*) FROM inventory WHERE quantity <= min_stock_level",
            [],
        )?;
        let todays_sales: Money = conn.query_row(
            "SELECT COALESCE(SUM(total_amount), 0) FROM sales
             WHERE status = ?1 AND created_at >= ?2 AND created_at < ?3",
            params![SaleStatus::Completed, today, tomorrow],
            |row| row.get(0),
        )?;
        let todays_prescriptions = count(
            &conn,
            "SELECT COUNT(*) FROM prescriptions WHERE created_at >= ?1 AND created_at < ?2",
            params![today, tomorrow],
        )?;
        let pending_prescriptions = count(
            &conn,
            "SELECT COUNT(*) FROM prescriptions WHERE status = ?1",
            params![PrescriptionStatus::Pending],
        )?;
        let expiring_batches = count(
            &conn,
            "SELECT COUNT(*) FROM inventory
             WHERE quantity > 0 AND expiry_date > ?1 AND expiry_date <= ?2",
            params![now_text, horizon],
        )?;

        Ok(DashboardStats {
            total_medicines,
            low_stock_items,
            todays_sales,
            todays_prescriptions,
            pending_prescriptions,
            expiring_batches,
        })
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            email: format!("{username}@example.com"),
            full_name: username.to_string(),
            phone: None,
            address: None,
            role,
        }
    }

    fn new_medicine(sku: &str, price: i64) -> NewMedicine {
        NewMedicine {
            name: format!("Medicine {sku}"),
            sku: sku.to_string(),
            category_id: None,
            description: None,
            dosage: None,
            manufacturer: None,
            price: Money::from_cents(price),
            requires_prescription: false,
            is_active: true,
        }
    }

    fn new_batch(medicine_id: i64, batch_number: &str, quantity: i64, expires_in_days: i64) -> NewBatch {
        NewBatch {
            medicine_id,
            batch_number: batch_number.to_string(),
            quantity,
            min_stock_level: 5,
            expiry_date: Utc::now() + Duration::days(expires_in_days),
            cost_price: Money::from_cents(100),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = open_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "users",
            "sessions",
            "categories",
            "medicines",
            "inventory",
            "prescriptions",
            "prescription_items",
            "sales",
            "sale_items",
            "discounts",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_temp, store) = open_store();
        store.initialize().unwrap();
    }

    #[test]
    fn test_user_crud() {
        let (_temp, store) = open_store();

        let user = store.create_user(&new_user("alice", Role::Pharmacist)).unwrap();
        assert!(user.is_active);
        assert_eq!(user.role, Role::Pharmacist);

        let by_name = store.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        let by_email = store.get_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let mut updated = user.clone();
        updated.full_name = "Alice Nguyen".to_string();
        store.update_user(&updated).unwrap();
        assert_eq!(store.get_user(user.id).unwrap().unwrap().full_name, "Alice Nguyen");

        assert!(store.set_user_active(user.id, false).unwrap());
        assert!(!store.get_user(user.id).unwrap().unwrap().is_active);
        assert!(!store.set_user_active(999, false).unwrap());
    }

    #[test]
    fn test_duplicate_username_is_conflict() {
        let (_temp, store) = open_store();
        store.create_user(&new_user("bob", Role::Customer)).unwrap();

        let result = store.create_user(&new_user("bob", Role::Customer));
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_list_users_by_role_and_has_manager() {
        let (_temp, store) = open_store();
        assert!(!store.has_manager().unwrap());

        store.create_user(&new_user("c1", Role::Customer)).unwrap();
        store.create_user(&new_user("c2", Role::Customer)).unwrap();
        store.create_user(&new_user("boss", Role::Manager)).unwrap();

        assert_eq!(store.list_users_by_role(Role::Customer).unwrap().len(), 2);
        assert_eq!(store.list_users_by_role(Role::Pharmacist).unwrap().len(), 0);
        assert!(store.has_manager().unwrap());
    }

    #[test]
    fn test_session_lookup_collision() {
        let (_temp, store) = open_store();
        let user = store.create_user(&new_user("carol", Role::Customer)).unwrap();

        let session = Session {
            id: "session-1".to_string(),
            user_id: user.id,
            key_lookup: "lookup12".to_string(),
            key_hash: "hash1".to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(1),
            last_seen_at: None,
        };
        store.create_session(&session).unwrap();

        let clash = Session {
            id: "session-2".to_string(),
            key_hash: "hash2".to_string(),
            ..session.clone()
        };
        let result = store.create_session(&clash);
        assert!(matches!(result, Err(Error::SessionLookupCollision)));

        let fetched = store.get_session_by_lookup("lookup12").unwrap().unwrap();
        assert_eq!(fetched.id, "session-1");
        assert!(fetched.last_seen_at.is_none());

        store.touch_session("session-1").unwrap();
        let touched = store.get_session_by_lookup("lookup12").unwrap().unwrap();
        assert!(touched.last_seen_at.is_some());
    }

    #[test]
    fn test_purge_expired_sessions() {
        let (_temp, store) = open_store();
        let user = store.create_user(&new_user("dave", Role::Customer)).unwrap();
        let now = Utc::now();

        for (id, lookup, offset) in [("old", "lookupAA", -1), ("live", "lookupBB", 1)] {
            store
                .create_session(&Session {
                    id: id.to_string(),
                    user_id: user.id,
                    key_lookup: lookup.to_string(),
                    key_hash: "hash".to_string(),
                    created_at: now,
                    expires_at: now + Duration::hours(offset),
                    last_seen_at: None,
                })
                .unwrap();
        }

        assert_eq!(store.purge_expired_sessions(now).unwrap(), 1);
        assert!(store.get_session_by_lookup("lookupAA").unwrap().is_none());
        assert_eq!(store.delete_user_sessions(user.id).unwrap(), 1);
    }

    #[test]
    fn test_category_and_medicine_crud() {
        let (_temp, store) = open_store();

        let category = store
            .create_category(&NewCategory {
                name: "Antibiotics".to_string(),
                description: None,
            })
            .unwrap();
        let dup = store.create_category(&NewCategory {
            name: "Antibiotics".to_string(),
            description: None,
        });
        assert!(matches!(dup, Err(Error::Conflict(_))));

        let mut input = new_medicine("AMX500", 1250);
        input.category_id = Some(category.id);
        let medicine = store.create_medicine(&input).unwrap();
        assert_eq!(medicine.price, Money::from_cents(1250));
        assert_eq!(store.get_medicine_by_sku("AMX500").unwrap().unwrap().id, medicine.id);

        let mut inactive = medicine.clone();
        inactive.is_active = false;
        store.update_medicine(&inactive).unwrap();
        assert_eq!(store.list_medicines(false).unwrap().len(), 1);
        assert!(store.list_medicines(true).unwrap().is_empty());

        assert!(store.delete_medicine(medicine.id).unwrap());
        assert!(store.get_medicine(medicine.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_referenced_medicine_is_refused() {
        let (_temp, store) = open_store();
        let medicine = store.create_medicine(&new_medicine("PARA", 500)).unwrap();
        store.create_batch(&new_batch(medicine.id, "B1", 10, 90)).unwrap();

        let result = store.delete_medicine(medicine.id);
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert!(store.get_medicine(medicine.id).unwrap().is_some());
    }

    #[test]
    fn test_batch_adjust_never_goes_negative() {
        let (_temp, store) = open_store();
        let medicine = store.create_medicine(&new_medicine("IBU", 800)).unwrap();
        let batch = store.create_batch(&new_batch(medicine.id, "B1", 10, 90)).unwrap();

        let dup = store.create_batch(&new_batch(medicine.id, "B1", 3, 90));
        assert!(matches!(dup, Err(Error::Conflict(_))));

        let adjusted = store.adjust_batch_quantity(batch.id, -4).unwrap();
        assert_eq!(adjusted.quantity, 6);

        let result = store.adjust_batch_quantity(batch.id, -7);
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(store.get_batch(batch.id).unwrap().unwrap().quantity, 6);

        let missing = store.adjust_batch_quantity(999, 1);
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_low_stock_and_expiring_lists() {
        let (_temp, store) = open_store();
        let medicine = store.create_medicine(&new_medicine("VITC", 300)).unwrap();
        store.create_batch(&new_batch(medicine.id, "LOW", 5, 200)).unwrap();
        store.create_batch(&new_batch(medicine.id, "SOON", 50, 10)).unwrap();
        store.create_batch(&new_batch(medicine.id, "EMPTY", 0, 10)).unwrap();

        let low: Vec<String> = store
            .list_low_stock()
            .unwrap()
            .into_iter()
            .map(|b| b.batch_number)
            .collect();
        assert_eq!(low, vec!["EMPTY", "LOW"]);

        let now = Utc::now();
        let expiring = store.list_expiring(now, now + Duration::days(30)).unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].batch_number, "SOON");

        let stats = store.dashboard_stats(now).unwrap();
        assert_eq!(stats.total_medicines, 1);
        assert_eq!(stats.low_stock_items, 2);
        assert_eq!(stats.expiring_batches, 1);
    }

    #[test]
    fn test_prescription_lifecycle() {
        let (_temp, store) = open_store();
        let customer = store.create_user(&new_user("pat", Role::Customer)).unwrap();
        let pharmacist = store.create_user(&new_user("pharm", Role::Pharmacist)).unwrap();
        let medicine = store.create_medicine(&new_medicine("AMX", 1000)).unwrap();

        let detail = store
            .create_prescription(&NewPrescription {
                customer_id: customer.id,
                prescription_number: "RX-1".to_string(),
                doctor_name: "Dr. Tran".to_string(),
                notes: None,
                issued_date: Utc::now(),
                items: vec![NewPrescriptionItem {
                    medicine_id: medicine.id,
                    quantity: 2,
                    dosage_instructions: "twice daily".to_string(),
                }],
            })
            .unwrap();
        assert_eq!(detail.prescription.status, PrescriptionStatus::Pending);
        assert_eq!(detail.items.len(), 1);

        let id = detail.prescription.id;
        let bad = store.transition_prescription(id, PrescriptionStatus::Dispensed, pharmacist.id, Utc::now());
        assert!(matches!(bad, Err(Error::InvalidTransition { .. })));

        let mut edited = detail.prescription.clone();
        edited.doctor_name = "Dr. Le".to_string();
        let rejected = store.update_prescription(
            &edited,
            Some(StatusChange {
                to: PrescriptionStatus::Dispensed,
                actor_id: pharmacist.id,
                at: Utc::now(),
            }),
        );
        assert!(matches!(rejected, Err(Error::InvalidTransition { .. })));
        let unchanged = store.get_prescription(id).unwrap().unwrap();
        assert_eq!(unchanged.doctor_name, "Dr. Tran");
        assert_eq!(unchanged.status, PrescriptionStatus::Pending);

        let verified = store
            .transition_prescription(id, PrescriptionStatus::Verified, pharmacist.id, Utc::now())
            .unwrap();
        assert_eq!(verified.status, PrescriptionStatus::Verified);
        assert_eq!(verified.pharmacist_id, Some(pharmacist.id));
        assert!(verified.verified_at.is_some());

        let edit = store.update_prescription(&verified, None);
        assert!(matches!(edit, Err(Error::Conflict(_))));

        let filter = PrescriptionFilter {
            status: Some(PrescriptionStatus::Verified),
            customer_id: Some(customer.id),
        };
        assert_eq!(store.list_prescriptions(filter).unwrap().len(), 1);
        assert!(
            store
                .list_prescriptions(PrescriptionFilter {
                    status: Some(PrescriptionStatus::Pending),
                    ..Default::default()
                })
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_prescription_requires_customer_role() {
        let (_temp, store) = open_store();
        let pharmacist = store.create_user(&new_user("pharm", Role::Pharmacist)).unwrap();

        let result = store.create_prescription(&NewPrescription {
            customer_id: pharmacist.id,
            prescription_number: "RX-2".to_string(),
            doctor_name: "Dr. Le".to_string(),
            notes: None,
            issued_date: Utc::now(),
            items: vec![],
        });
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_discount_crud_and_active_window() {
        let (_temp, store) = open_store();
        let now = Utc::now();

        let current = store
            .create_discount(&NewDiscount {
                name: "Spring".to_string(),
                kind: DiscountKind::Percentage,
                value: Money::from_cents(1000),
                applicable_to_medicine_id: None,
                min_order_amount: None,
                max_discount_amount: None,
                valid_from: now - Duration::days(1),
                valid_to: now + Duration::days(1),
                is_active: true,
            })
            .unwrap();
        store
            .create_discount(&NewDiscount {
                name: "Expired".to_string(),
                kind: DiscountKind::Fixed,
                value: Money::from_cents(500),
                applicable_to_medicine_id: None,
                min_order_amount: None,
                max_discount_amount: None,
                valid_from: now - Duration::days(10),
                valid_to: now - Duration::days(5),
                is_active: true,
            })
            .unwrap();

        assert_eq!(store.list_discounts().unwrap().len(), 2);
        let active = store.list_active_discounts(now).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, current.id);

        assert!(store.delete_discount(current.id).unwrap());
        assert!(!store.delete_discount(current.id).unwrap());
    }
}

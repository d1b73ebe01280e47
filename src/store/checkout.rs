//! Multi-table sale writes. Every function here runs on an open transaction
//! owned by the caller, so a failure at any step leaves stock untouched.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::sqlite::{
    format_datetime, load_batch, load_discount, load_medicine, load_prescription,
    load_prescription_items, load_sale, load_sale_items, load_user, unique_conflict,
};
use crate::error::{Error, Result};
use crate::pricing::{self, PricedLine};
use crate::types::*;

/// A sale line after its batch has been chosen and its stock taken.
struct ReservedLine {
    priced: PricedLine,
    inventory_id: i64,
}

pub(super) fn record_sale(conn: &Connection, sale: &NewSale) -> Result<SaleDetail> {
    if sale.lines.is_empty() {
        return Err(Error::bad_request("Sale must contain at least one item"));
    }
    if let Some(line) = sale.lines.iter().find(|l| l.quantity <= 0) {
        return Err(Error::bad_request(format!(
            "Quantity for medicine {} must be positive",
            line.medicine_id
        )));
    }

    let mut customer_id = sale.customer_id;
    if let Some(id) = customer_id {
        load_user(conn, id)?.ok_or_else(|| Error::not_found("Customer"))?;
    }

    let prescribed = match sale.prescription_id {
        Some(id) => {
            let prescription = load_prescription(conn, id)?.ok_or_else(|| Error::not_found("Prescription"))?;
            if prescription.status != PrescriptionStatus::Verified {
                return Err(Error::bad_request(format!(
                    "Prescription {} is {}, only verified prescriptions can be dispensed",
                    prescription.prescription_number, prescription.status
                )));
            }
            match customer_id {
                Some(c) if c != prescription.customer_id => {
                    return Err(Error::bad_request("Prescription belongs to a different customer"));
                }
                _ => customer_id = Some(prescription.customer_id),
            }
            let medicines: HashSet<i64> = load_prescription_items(conn, id)?
                .into_iter()
                .map(|item| item.medicine_id)
                .collect();
            Some((prescription, medicines))
        }
        None => None,
    };

    let discount = match sale.discount_id {
        Some(id) => {
            let discount = load_discount(conn, id)?.ok_or_else(|| Error::not_found("Discount"))?;
            if !discount.is_active_at(sale.created_at) {
                return Err(Error::bad_request("Discount is not active"));
            }
            Some(discount)
        }
        None => None,
    };

    let mut reserved = Vec::with_capacity(sale.lines.len());
    for line in &sale.lines {
        let medicine = load_medicine(conn, line.medicine_id)?
            .ok_or_else(|| Error::not_found(format!("Medicine {}", line.medicine_id)))?;
        if !medicine.is_active {
            return Err(Error::bad_request(format!("Medicine {} is not active", medicine.name)));
        }
        if medicine.requires_prescription {
            let covered = prescribed
                .as_ref()
                .is_some_and(|(_, medicines)| medicines.contains(&medicine.id));
            if !covered {
                return Err(Error::bad_request(format!(
                    "{} requires a verified prescription",
                    medicine.name
                )));
            }
        }

        let inventory_id = match line.inventory_id {
            Some(id) => {
                let batch = load_batch(conn, id)?.ok_or_else(|| Error::not_found("Inventory batch"))?;
                if batch.medicine_id != medicine.id {
                    return Err(Error::bad_request(format!(
                        "Batch {} does not belong to {}",
                        batch.batch_number, medicine.name
                    )));
                }
                if batch.is_expired_at(sale.created_at) {
                    return Err(Error::bad_request(format!("Batch {} is expired", batch.batch_number)));
                }
                batch.id
            }
            None => first_expiring_batch(conn, medicine.id, line.quantity, sale.created_at)?
                .ok_or(Error::InsufficientStock {
                    medicine_id: medicine.id,
                })?,
        };

        take_stock(conn, inventory_id, medicine.id, line.quantity)?;

        reserved.push(ReservedLine {
            priced: PricedLine {
                medicine_id: medicine.id,
                quantity: line.quantity,
                unit_price: medicine.price,
            },
            inventory_id,
        });
    }

    let priced: Vec<PricedLine> = reserved.iter().map(|r| r.priced).collect();
    let totals = pricing::compute_totals(&priced, discount.as_ref(), sale.tax_rate_bps)?;

    conn.execute(
        "INSERT INTO sales (customer_id, pharmacist_id, prescription_id, sale_number, subtotal,
             discount_amount, tax_amount, total_amount, payment_method, status, discount_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            customer_id,
            sale.pharmacist_id,
            sale.prescription_id,
            sale.sale_number,
            totals.subtotal,
            totals.discount,
            totals.tax,
            totals.total,
            sale.payment_method,
            sale.status,
            sale.discount_id,
            format_datetime(&sale.created_at),
        ],
    )
    .map_err(unique_conflict("Sale number already exists"))?;
    let sale_id = conn.last_insert_rowid();

    for line in &reserved {
        conn.execute(
            "INSERT INTO sale_items (sale_id, medicine_id, inventory_id, quantity, unit_price, total_price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                sale_id,
                line.priced.medicine_id,
                line.inventory_id,
                line.priced.quantity,
                line.priced.unit_price,
                line.priced.total()?,
            ],
        )?;
    }

    if let Some((prescription, medicines)) = &prescribed {
        for line in reserved.iter().filter(|r| medicines.contains(&r.priced.medicine_id)) {
            conn.execute(
                "UPDATE prescription_items SET dispensed_quantity = dispensed_quantity + ?1
                 WHERE prescription_id = ?2 AND medicine_id = ?3",
                params![line.priced.quantity, prescription.id, line.priced.medicine_id],
            )?;
        }
        dispense(conn, prescription.id, sale.created_at)?;
    }

    tracing::info!(
        sale_number = %sale.sale_number,
        items = reserved.len(),
        total = %totals.total,
        "Recorded sale"
    );

    let created = load_sale(conn, sale_id)?.ok_or_else(|| Error::not_found("Sale"))?;
    let items = load_sale_items(conn, sale_id)?;
    Ok(SaleDetail { sale: created, items })
}

/// FEFO: the unexpired batch with enough stock that expires soonest.
fn first_expiring_batch(
    conn: &Connection,
    medicine_id: i64,
    quantity: i64,
    at: DateTime<Utc>,
) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM inventory
         WHERE medicine_id = ?1 AND quantity >= ?2 AND expiry_date > ?3
         ORDER BY expiry_date, id
         LIMIT 1",
        params![medicine_id, quantity, format_datetime(&at)],
        |row| row.get(0),
    )
    .optional()
    .map_err(Error::from)
}

fn take_stock(conn: &Connection, inventory_id: i64, medicine_id: i64, quantity: i64) -> Result<()> {
    let rows = conn.execute(
        "UPDATE inventory SET quantity = quantity - ?1 WHERE id = ?2 AND quantity >= ?1",
        params![quantity, inventory_id],
    )?;
    if rows == 0 {
        return Err(Error::InsufficientStock { medicine_id });
    }
    Ok(())
}

fn restock(conn: &Connection, sale_id: i64) -> Result<()> {
    for item in load_sale_items(conn, sale_id)? {
        conn.execute(
            "UPDATE inventory SET quantity = quantity + ?1 WHERE id = ?2",
            params![item.quantity, item.inventory_id],
        )?;
    }
    Ok(())
}

fn dispense(conn: &Connection, prescription_id: i64, at: DateTime<Utc>) -> Result<()> {
    let rows = conn.execute(
        "UPDATE prescriptions SET status = ?1, dispensed_at = ?2 WHERE id = ?3 AND status = ?4",
        params![
            PrescriptionStatus::Dispensed,
            format_datetime(&at),
            prescription_id,
            PrescriptionStatus::Verified,
        ],
    )?;
    if rows == 0 {
        return Err(Error::invalid_transition(
            PrescriptionStatus::Verified,
            PrescriptionStatus::Dispensed,
        ));
    }
    Ok(())
}

pub(super) fn transition_sale(conn: &Connection, id: i64, to: SaleStatus) -> Result<Sale> {
    let current = load_sale(conn, id)?.ok_or_else(|| Error::not_found("Sale"))?;
    if !current.status.can_transition_to(to) {
        return Err(Error::invalid_transition(current.status, to));
    }

    let rows = conn.execute(
        "UPDATE sales SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![to, id, current.status],
    )?;
    if rows == 0 {
        return Err(Error::invalid_transition(current.status, to));
    }

    if current.status.holds_stock() && !to.holds_stock() {
        restock(conn, id)?;
    }

    tracing::info!(sale_number = %current.sale_number, from = %current.status, to = %to, "Sale status changed");

    load_sale(conn, id)?.ok_or_else(|| Error::not_found("Sale"))
}

pub(super) fn delete_sale(conn: &Connection, id: i64) -> Result<bool> {
    let Some(sale) = load_sale(conn, id)? else {
        return Ok(false);
    };

    if sale.status.holds_stock() {
        restock(conn, id)?;
    }
    conn.execute("DELETE FROM sale_items WHERE sale_id = ?1", params![id])?;
    let rows = conn.execute("DELETE FROM sales WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

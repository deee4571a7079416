use crate::core::ledger::MovementLedger;
use crate::domain::model::{InboundMovement, OutboundMovement};
use crate::domain::ports::ListStore;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "direction", rename_all = "lowercase")]
pub enum Movement {
    Inbound(InboundMovement),
    Outbound(OutboundMovement),
}

impl Movement {
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Movement::Inbound(m) => m.recorded_at,
            Movement::Outbound(m) => m.recorded_at,
        }
    }

    /// Positive for stock received, negative for stock issued.
    pub fn signed_quantity(&self) -> f64 {
        match self {
            Movement::Inbound(m) => m.quantity,
            Movement::Outbound(m) => -m.quantity,
        }
    }
}

/// Inbound and outbound movements of one product, oldest first. Movements
/// without a timestamp go last, keeping their fetch order.
pub async fn history<S: ListStore + ?Sized>(
    ledger: &MovementLedger<S>,
    factory_code: &str,
) -> Result<Vec<Movement>> {
    let (inbound, outbound) = tokio::try_join!(
        ledger.inbound_movements(factory_code),
        ledger.outbound_movements(factory_code)
    )?;

    let mut movements: Vec<Movement> = inbound
        .into_iter()
        .map(Movement::Inbound)
        .chain(outbound.into_iter().map(Movement::Outbound))
        .collect();
    movements.sort_by_key(|m| (m.recorded_at().is_none(), m.recorded_at()));
    Ok(movements)
}

#[derive(Serialize)]
struct CsvRow<'a> {
    recorded_at: String,
    direction: &'static str,
    factory_code: &'a str,
    description: &'a str,
    quantity: f64,
    unit_value: Option<f64>,
    total_value: Option<f64>,
    invoice_ref: &'a str,
    truck_plate: &'a str,
    recipient: &'a str,
    running_balance: f64,
}

/// Writes `movements` as CSV with a running balance column.
pub fn write_csv<W: Write>(movements: &[Movement], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut running_balance = 0.0;

    for movement in movements {
        running_balance += movement.signed_quantity();
        let recorded_at = movement
            .recorded_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        let row = match movement {
            Movement::Inbound(m) => CsvRow {
                recorded_at,
                direction: "inbound",
                factory_code: &m.factory_code,
                description: &m.description,
                quantity: m.quantity,
                unit_value: Some(m.unit_value),
                total_value: Some(m.total_value),
                invoice_ref: &m.invoice_ref,
                truck_plate: "",
                recipient: "",
                running_balance,
            },
            Movement::Outbound(m) => CsvRow {
                recorded_at,
                direction: "outbound",
                factory_code: &m.factory_code,
                description: &m.description,
                quantity: m.quantity,
                unit_value: None,
                total_value: None,
                invoice_ref: "",
                truck_plate: &m.truck_plate,
                recipient: &m.recipient,
                running_balance,
            },
        };
        csv_writer.serialize(row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

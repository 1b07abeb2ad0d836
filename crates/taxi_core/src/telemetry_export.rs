use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, UInt32Array, UInt64Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::error::Result;
use crate::taxi::TaxiState;
use crate::telemetry::{SimSnapshots, SimTelemetry};

pub fn write_completed_fares_parquet<P: AsRef<Path>>(path: P, telemetry: &SimTelemetry) -> Result<()> {
    let records = &telemetry.completed_fares;
    let schema = Schema::new(vec![
        Field::new("taxi", DataType::UInt32, false),
        Field::new("origin_x", DataType::Int32, false),
        Field::new("origin_y", DataType::Int32, false),
        Field::new("destination_x", DataType::Int32, false),
        Field::new("destination_y", DataType::Int32, false),
        Field::new("call_time", DataType::UInt64, false),
        Field::new("picked_up_at", DataType::UInt64, false),
        Field::new("completed_at", DataType::UInt64, false),
        Field::new("price", DataType::Float64, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from_iter_values(records.iter().map(|r| r.taxi.0))),
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.origin.x))),
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.origin.y))),
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.destination.x))),
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.destination.y))),
        Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.call_time))),
        Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.picked_up_at))),
        Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.completed_at))),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.price))),
    ];

    write_record_batch(path, schema, arrays)
}

/// One row per snapshot.
pub fn write_snapshot_summary_parquet<P: AsRef<Path>>(path: P, snapshots: &SimSnapshots) -> Result<()> {
    let rows = &snapshots.snapshots;
    let schema = Schema::new(vec![
        Field::new("minute", DataType::UInt64, false),
        Field::new("dispatcher_revenue", DataType::Float64, false),
        Field::new("open_fares", DataType::UInt64, false),
        Field::new("completed_fares", DataType::UInt64, false),
        Field::new("taxis_on_duty", DataType::UInt64, false),
        Field::new("total_balance", DataType::Int64, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|s| s.minute))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|s| s.dispatcher_revenue))),
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|s| s.open_fares as u64))),
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|s| s.completed_fares as u64))),
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|s| s.on_duty() as u64))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|s| s.total_balance()))),
    ];

    write_record_batch(path, schema, arrays)
}

/// One row per taxi per snapshot.
pub fn write_taxi_snapshots_parquet<P: AsRef<Path>>(path: P, snapshots: &SimSnapshots) -> Result<()> {
    let mut minute = Vec::new();
    let mut taxi = Vec::new();
    let mut balance = Vec::new();
    let mut on_duty = Vec::new();
    let mut state = Vec::new();

    for snapshot in &snapshots.snapshots {
        for t in &snapshot.taxis {
            minute.push(snapshot.minute);
            taxi.push(t.number.0);
            balance.push(t.balance);
            on_duty.push(t.on_duty);
            state.push(taxi_state_code(t.state));
        }
    }

    let schema = Schema::new(vec![
        Field::new("minute", DataType::UInt64, false),
        Field::new("taxi", DataType::UInt32, false),
        Field::new("balance", DataType::Int64, false),
        Field::new("on_duty", DataType::Boolean, false),
        Field::new("state", DataType::UInt8, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(minute)),
        Arc::new(UInt32Array::from(taxi)),
        Arc::new(Int64Array::from(balance)),
        Arc::new(BooleanArray::from(on_duty)),
        Arc::new(UInt8Array::from(state)),
    ];

    write_record_batch(path, schema, arrays)
}

fn write_record_batch<P: AsRef<Path>>(path: P, schema: Schema, arrays: Vec<ArrayRef>) -> Result<()> {
    let schema = Arc::new(schema);
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn taxi_state_code(state: TaxiState) -> u8 {
    match state {
        TaxiState::OffDuty => 0,
        TaxiState::Idle => 1,
        TaxiState::EnRouteToPickup => 2,
        TaxiState::Carrying => 3,
    }
}

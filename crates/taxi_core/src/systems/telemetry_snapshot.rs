use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{EventKind, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::taxi::Taxi;
use crate::telemetry::{MetricsSnapshot, SimSnapshotConfig, SimSnapshots, SimTelemetry, TaxiSnapshot};

/// Records dispatcher revenue, open fares and every taxi's balance, then
/// books the next snapshot one interval later.
pub fn capture_snapshot_system(
    mut clock: ResMut<SimulationClock>,
    config: Res<SimSnapshotConfig>,
    mut snapshots: ResMut<SimSnapshots>,
    telemetry: Res<SimTelemetry>,
    dispatcher: Res<Dispatcher>,
    taxis: Query<&Taxi>,
) {
    let now = clock.now();
    let mut fleet: Vec<TaxiSnapshot> = taxis
        .iter()
        .map(|taxi| TaxiSnapshot {
            number: taxi.number,
            balance: taxi.account,
            on_duty: taxi.on_duty,
            state: taxi.state(),
        })
        .collect();
    fleet.sort_by_key(|t| t.number);

    snapshots.push(
        MetricsSnapshot {
            minute: now,
            dispatcher_revenue: dispatcher.revenue(),
            open_fares: dispatcher.open_fares(),
            completed_fares: telemetry.completed(),
            taxis: fleet,
        },
        config.max_snapshots,
    );
    clock.schedule_in(config.interval_minutes.max(1), EventKind::Snapshot);
}

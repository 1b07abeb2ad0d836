//! Movement: every on-duty taxi drives one minute along its planned path.
//!
//! A taxi asked to leave its own map, or to use a street its map lacks, is a
//! fatal fault. The fault is raised on [SimFault] and the rest of the fleet
//! stays put for this minute.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::ecs::SimFault;
use crate::network::RoadNetwork;
use crate::taxi::Taxi;

pub fn movement_system(
    network: Res<RoadNetwork>,
    mut fault: ResMut<SimFault>,
    mut taxis: Query<&mut Taxi>,
) {
    let mut fleet: Vec<_> = taxis.iter_mut().collect();
    fleet.sort_by_key(|taxi| taxi.number);
    for mut taxi in fleet {
        if let Err(error) = taxi.drive(&network) {
            tracing::error!(taxi = %taxi.number, %error, "taxi fault");
            fault.raise(error);
            return;
        }
    }
}

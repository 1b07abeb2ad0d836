//! World-level resources shared by the systems that are not owned by a
//! single concern.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;

use crate::error::SimError;
use crate::fare::FareAnnouncement;
use crate::network::NodeId;

/// Requests submitted from outside the simulation: announcements are
/// validated and posted on the next tick, cancellations withdraw every fare
/// waiting at an origin.
#[derive(Debug, Default, Resource)]
pub struct FareInbox {
    pub announcements: VecDeque<FareAnnouncement>,
    pub cancellations: VecDeque<NodeId>,
}

impl FareInbox {
    pub fn push(&mut self, announcement: FareAnnouncement) {
        self.announcements.push_back(announcement);
    }

    pub fn cancel(&mut self, origin: NodeId) {
        self.cancellations.push_back(origin);
    }

    pub fn is_empty(&self) -> bool {
        self.announcements.is_empty() && self.cancellations.is_empty()
    }
}

/// First fatal fault raised during a schedule run. The runner takes it and
/// stops.
#[derive(Debug, Default, Resource)]
pub struct SimFault(pub Option<SimError>);

impl SimFault {
    pub fn raise(&mut self, error: SimError) {
        if self.0.is_none() {
            self.0 = Some(error);
        }
    }

    pub fn take(&mut self) -> Option<SimError> {
        self.0.take()
    }
}
